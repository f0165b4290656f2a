//! Pass scheduling.
//!
//! The coordinator never runs a pass on its own initiative: it asks a [`Scheduler`] whether the
//! pass should run now or later. Deferred passes are run by the host through
//! [`crate::Coordinator::run`].

use alloc::collections::VecDeque;

/// A unit of work the coordinator schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Task {
    /// Reflow the layout and reconcile slots.
    Render,
    /// Read the geometry of freshly bound slots and feed it back into the layout.
    Measure,
}

/// When a deferred task expects to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timing {
    /// Right after the current turn of work.
    Microtask,
    /// On the next frame, once freshly attached slots have been laid out by the host.
    Frame,
}

impl Task {
    pub fn timing(self) -> Timing {
        match self {
            Self::Render => Timing::Microtask,
            Self::Measure => Timing::Frame,
        }
    }
}

/// The scheduler's answer to a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The coordinator runs the task before returning.
    Now,
    /// The scheduler took the task; the host will call [`crate::Coordinator::run`] later.
    Deferred,
}

pub trait Scheduler {
    fn schedule(&mut self, task: Task) -> Dispatch;
}

/// Runs every task synchronously. Useful for tests and for hosts without an event loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&mut self, _task: Task) -> Dispatch {
        Dispatch::Now
    }
}

/// Records tasks in per-timing queues for the host to drain.
#[derive(Clone, Debug, Default)]
pub struct QueuedScheduler {
    microtasks: VecDeque<Task>,
    frames: VecDeque<Task>,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop_microtask(&mut self) -> Option<Task> {
        self.microtasks.pop_front()
    }

    pub fn pop_frame(&mut self) -> Option<Task> {
        self.frames.pop_front()
    }

    /// Number of tasks waiting for the next frame.
    pub fn frame_len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.microtasks.is_empty() && self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.microtasks.len() + self.frames.len()
    }
}

impl Scheduler for QueuedScheduler {
    fn schedule(&mut self, task: Task) -> Dispatch {
        match task.timing() {
            Timing::Microtask => self.microtasks.push_back(task),
            Timing::Frame => self.frames.push_back(task),
        }
        Dispatch::Deferred
    }
}

/// The `{dirty, scheduled}` pair tracked per task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TaskState {
    pub(crate) dirty: bool,
    pub(crate) scheduled: bool,
}
