use core::fmt;

use virtualist::{Anchor, LayoutEngine, Reconciler, SlotFactory, SlotKey};

/// A scroll anchor identified by item key rather than index.
///
/// Index anchors go stale when records are inserted or removed before them. Capturing the key
/// before a data change and restoring it afterwards keeps the same record under the viewport's
/// leading edge, e.g. when older messages are prepended to a timeline.
#[derive(Clone, PartialEq)]
pub struct ScrollAnchor<K> {
    pub key: K,
    /// Distance from the anchor item's start to the scroll position.
    pub offset: f64,
}

impl<K: fmt::Debug> fmt::Debug for ScrollAnchor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollAnchor")
            .field("key", &self.key)
            .field("offset", &self.offset)
            .finish()
    }
}

/// Captures the layout's current anchor by the key of the item it points at.
///
/// Returns `None` before the first reflow or when the list is empty.
pub fn capture_anchor<T, F, K, L>(
    layout: &L,
    reconciler: &Reconciler<T, F, K>,
) -> Option<ScrollAnchor<K>>
where
    F: SlotFactory<T>,
    K: SlotKey,
    L: LayoutEngine + ?Sized,
{
    let anchor = layout.anchor()?;
    if anchor.index >= reconciler.items().len() {
        return None;
    }
    Some(ScrollAnchor {
        key: reconciler.key_for(anchor.index),
        offset: anchor.offset,
    })
}

/// Pins the layout to the item that now carries `anchor.key`.
///
/// Returns `false` when no item has that key anymore.
pub fn apply_anchor<T, F, K, L>(
    layout: &mut L,
    reconciler: &Reconciler<T, F, K>,
    anchor: &ScrollAnchor<K>,
) -> bool
where
    F: SlotFactory<T>,
    K: SlotKey,
    L: LayoutEngine + ?Sized,
{
    let Some(index) = (0..reconciler.items().len()).find(|&i| reconciler.key_for(i) == anchor.key)
    else {
        return false;
    };
    layout.restore_anchor(Anchor {
        index,
        offset: anchor.offset,
    });
    true
}
