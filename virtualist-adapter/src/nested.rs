//! Explicit parent links between nested lists.
//!
//! A list rendered inside a slot of another list holds a [`ParentLink`]: a non-owning
//! back-reference to the parent's inbox plus the index of the slot it lives in. Notifying the
//! link queues that slot for remeasurement on the parent's next pass.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};

static NEXT_LIST_ID: AtomicUsize = AtomicUsize::new(1);

/// Process-unique identity of a coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListId(usize);

impl ListId {
    pub(crate) fn next() -> Self {
        Self(NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
pub(crate) struct ChildInbox {
    pending: Vec<(ListId, usize)>,
}

pub(crate) type SharedInbox = Rc<RefCell<ChildInbox>>;

/// Takes every queued notification, dropping those that originate from `receiver` itself.
pub(crate) fn drain(inbox: &SharedInbox, receiver: ListId) -> Vec<usize> {
    let pending = core::mem::take(&mut inbox.borrow_mut().pending);
    let mut indexes: Vec<usize> = pending
        .into_iter()
        .filter(|&(origin, _)| origin != receiver)
        .map(|(_, index)| index)
        .collect();
    indexes.sort_unstable();
    indexes.dedup();
    indexes
}

/// A child's handle on the list that hosts it.
#[derive(Clone, Debug)]
pub struct ParentLink {
    parent: ListId,
    index: usize,
    inbox: Weak<RefCell<ChildInbox>>,
}

impl ParentLink {
    pub(crate) fn new(parent: ListId, index: usize, inbox: &SharedInbox) -> Self {
        Self {
            parent,
            index,
            inbox: Rc::downgrade(inbox),
        }
    }

    pub fn parent(&self) -> ListId {
        self.parent
    }

    /// The parent item index whose slot contains the child.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Asks the parent to remeasure the hosting slot.
    ///
    /// Returns `false` when the parent no longer exists.
    pub fn notify(&self, origin: ListId) -> bool {
        let Some(inbox) = self.inbox.upgrade() else {
            return false;
        };
        inbox.borrow_mut().pending.push((origin, self.index));
        true
    }
}
