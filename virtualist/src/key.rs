#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "std")]
pub(crate) type KeyMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub(crate) type KeyMap<K, V> = BTreeMap<K, V>;

/// Bound for item keys used by the reconciler's key↔slot maps.
#[cfg(feature = "std")]
pub trait SlotKey: core::hash::Hash + Eq + Clone {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq + Clone> SlotKey for K {}

/// Bound for item keys used by the reconciler's key↔slot maps.
#[cfg(not(feature = "std"))]
pub trait SlotKey: Ord + Clone {}
#[cfg(not(feature = "std"))]
impl<K: Ord + Clone> SlotKey for K {}
