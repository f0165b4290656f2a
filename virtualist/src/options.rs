use alloc::sync::Arc;

use crate::{Direction, Extent, ItemKey};

/// Default extent assumed for items that have not been measured yet.
pub const DEFAULT_ITEM_EXTENT: f64 = 50.0;

/// Default overhang, in pixels, materialized on each side of the viewport.
pub const DEFAULT_OVERHANG: f64 = 150.0;

/// Where unmeasured item extents come from.
#[derive(Clone)]
pub enum ExtentSource {
    /// Every item is estimated at the same primary extent.
    Fixed(f64),
    /// A per-index estimator.
    Estimator(Arc<dyn Fn(usize) -> Extent + Send + Sync>),
}

impl ExtentSource {
    pub(crate) fn estimate(&self, index: usize) -> Extent {
        match self {
            Self::Fixed(v) => Extent::new(*v),
            Self::Estimator(f) => f(index),
        }
    }
}

impl Default for ExtentSource {
    fn default() -> Self {
        Self::Fixed(DEFAULT_ITEM_EXTENT)
    }
}

impl core::fmt::Debug for ExtentSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            Self::Estimator(_) => f.write_str("Estimator(..)"),
        }
    }
}

/// Configuration for [`crate::FlowLayout`].
#[derive(Clone, Debug)]
pub struct LayoutOptions {
    pub total_items: usize,
    pub direction: Direction,
    /// Extra pixels materialized before and after the viewport.
    pub overhang: f64,
    pub item_extent: ExtentSource,
}

impl LayoutOptions {
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items,
            direction: Direction::Vertical,
            overhang: DEFAULT_OVERHANG,
            item_extent: ExtentSource::default(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_overhang(mut self, overhang: f64) -> Self {
        self.overhang = overhang;
        self
    }

    pub fn with_fixed_extent(mut self, extent: f64) -> Self {
        self.item_extent = ExtentSource::Fixed(extent);
        self
    }

    pub fn with_estimator(mut self, f: impl Fn(usize) -> Extent + Send + Sync + 'static) -> Self {
        self.item_extent = ExtentSource::Estimator(Arc::new(f));
        self
    }
}

/// Maps an item (and its index) to the identity used for slot recycling.
pub type KeyFn<T, K> = Arc<dyn Fn(&T, usize) -> K + Send + Sync>;

/// Configuration for [`crate::Reconciler`].
pub struct ReconcilerOptions<T, K = ItemKey> {
    pub key_fn: KeyFn<T, K>,
    /// When set, deactivated slots are pooled for reuse instead of removed.
    pub recycling: bool,
}

impl<T, K> Clone for ReconcilerOptions<T, K> {
    fn clone(&self) -> Self {
        Self {
            key_fn: Arc::clone(&self.key_fn),
            recycling: self.recycling,
        }
    }
}

impl<T: 'static> ReconcilerOptions<T, ItemKey> {
    /// Options keyed by item index.
    pub fn new() -> Self {
        Self {
            key_fn: Arc::new(|_: &T, i: usize| i as u64),
            recycling: false,
        }
    }
}

impl<T: 'static> Default for ReconcilerOptions<T, ItemKey> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static, K: 'static> ReconcilerOptions<T, K> {
    /// Options with a custom key over the item.
    ///
    /// Use a stable identity (e.g. a record id) so slots follow items across reordering.
    pub fn new_with_key(key_fn: impl Fn(&T) -> K + Send + Sync + 'static) -> Self {
        Self {
            key_fn: Arc::new(move |item: &T, _: usize| key_fn(item)),
            recycling: false,
        }
    }

    pub fn with_recycling(mut self, recycling: bool) -> Self {
        self.recycling = recycling;
        self
    }
}

impl<T, K> core::fmt::Debug for ReconcilerOptions<T, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReconcilerOptions")
            .field("recycling", &self.recycling)
            .finish_non_exhaustive()
    }
}
