//! A headless windowing and reconciliation engine for virtualized lists.
//!
//! For the coordinator that drives both halves against a host container, see the
//! `virtualist-adapter` crate.
//!
//! This crate contains the two pieces that do not touch any UI object:
//! - [`FlowLayout`] (behind the [`LayoutEngine`] trait): prefix sums over estimated or measured
//!   item extents, overhang-padded range search, per-item offsets and scroll anchoring.
//! - [`Reconciler`]: an arena of host slots bound to item indexes, recycled by key, kept in
//!   index order with the fewest possible moves.
//!
//! The host provides slot creation and binding through [`SlotFactory`] and the container
//! through [`SlotContainer`].
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod error;
mod fenwick;
mod key;
mod layout;
mod options;
mod reconciler;
mod types;


pub use error::{Error, HostError};
pub use key::SlotKey;
pub use layout::{EXTENT_EPSILON, FlowLayout, LayoutEngine, LayoutState};
pub use options::{
    DEFAULT_ITEM_EXTENT, DEFAULT_OVERHANG, ExtentSource, KeyFn, LayoutOptions, ReconcilerOptions,
};
pub use reconciler::{RenderReport, Reconciler, SlotContainer, SlotFactory, SlotId};
pub use types::{
    Align, Anchor, Diagnostic, Direction, Extent, ItemKey, LayoutFact, Position, Range,
    RangeChange,
};
