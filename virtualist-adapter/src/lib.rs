//! Host wiring for the `virtualist` crate.
//!
//! `virtualist` computes ranges and reconciles slots but never touches a UI object. This crate
//! adds the [`Coordinator`], which connects both halves to a [`Host`]:
//!
//! - reads the viewport from the host and feeds it to the layout
//! - turns layout facts into slot renders, position writes and scroll corrections
//! - measures freshly bound slots and feeds their sizes back
//! - schedules its passes through an injectable [`Scheduler`]
//!
//! Lists nested inside another list's slots talk to their parent through an explicit
//! [`ParentLink`].
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod anchor;
mod config;
mod coordinator;
mod error;
mod host;
mod nested;
mod scheduler;

#[cfg(test)]
mod tests;

pub use anchor::{ScrollAnchor, apply_anchor, capture_anchor};
pub use config::{CallbackFactory, FactoryFn, ListConfig, RecycleFn, RemoveFn, UpdateFn};
pub use coordinator::Coordinator;
pub use error::Error;
pub use host::{Host, Measurement, Rect, ViewBounds};
pub use nested::{ListId, ParentLink};
pub use scheduler::{Dispatch, ImmediateScheduler, QueuedScheduler, Scheduler, Task, Timing};
