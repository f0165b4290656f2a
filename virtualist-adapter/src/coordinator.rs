use alloc::collections::{BTreeSet, VecDeque};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use virtualist::{
    Align, Diagnostic, Direction, FlowLayout, ItemKey, LayoutEngine, LayoutFact, Position,
    Reconciler, SlotFactory, SlotId, SlotKey,
};

use crate::anchor::{apply_anchor, capture_anchor};
use crate::config::{CallbackFactory, ListConfig};
use crate::nested::{self, ListId, ParentLink, SharedInbox};
use crate::scheduler::{Dispatch, ImmediateScheduler, QueuedScheduler, Scheduler, Task, TaskState};
use crate::{Error, Host};

/// A host write produced by a render pass. Writes are committed only once the pass succeeded.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Write {
    MinExtent(Direction, f64),
    Position(SlotId, Position),
    ScrollBy(f64, f64),
}

/// Drives a layout engine and a reconciler against a host.
///
/// The coordinator owns no UI objects itself: slots are created through the reconciler's
/// [`SlotFactory`] and every geometry read or write goes through the attached [`Host`]. Work is
/// split into two tasks:
/// - [`Task::Render`]: read the view, reflow, reconcile, then write positions, the container's
///   minimum extent and scroll corrections.
/// - [`Task::Measure`]: read the size of freshly bound slots, then feed them to the layout.
///
/// Both are requested through the [`Scheduler`]; a pass never runs inside another pass.
pub struct Coordinator<T, F, H, L = FlowLayout, S = ImmediateScheduler, K = ItemKey>
where
    F: SlotFactory<T>,
{
    id: ListId,
    layout: L,
    reconciler: Reconciler<T, F, K>,
    host: Option<H>,
    scheduler: S,

    render: TaskState,
    measure: TaskState,
    running: bool,
    followups: VecDeque<Task>,

    to_measure: BTreeSet<SlotId>,
    stable: bool,
    // Set when host state may lag behind the layout (first attach, failed pass).
    resync: bool,
    carried_scroll: (f64, f64),

    inbox: SharedInbox,
    parent: Option<ParentLink>,
}

impl<T, Slot, H, S, K> Coordinator<T, CallbackFactory<T, Slot>, H, FlowLayout, S, K>
where
    H: Host<Slot>,
    S: Scheduler,
    K: SlotKey,
{
    /// Builds a coordinator from a closure configuration.
    pub fn from_config(config: ListConfig<T, Slot, K>, scheduler: S) -> Self {
        let (layout, options, factory, items) = config.into_parts();
        let mut reconciler = Reconciler::new(options, factory);
        reconciler.set_items(items);
        Self::new(FlowLayout::new(layout), reconciler, scheduler)
    }
}

impl<T, F, H, L, S, K> Coordinator<T, F, H, L, S, K>
where
    F: SlotFactory<T>,
    H: Host<F::Slot>,
    L: LayoutEngine,
    S: Scheduler,
    K: SlotKey,
{
    pub fn new(mut layout: L, reconciler: Reconciler<T, F, K>, scheduler: S) -> Self {
        layout.set_total_items(reconciler.items().len());
        Self {
            id: ListId::next(),
            layout,
            reconciler,
            host: None,
            scheduler,
            render: TaskState::default(),
            measure: TaskState::default(),
            running: false,
            followups: VecDeque::new(),
            to_measure: BTreeSet::new(),
            stable: true,
            resync: true,
            carried_scroll: (0.0, 0.0),
            inbox: Rc::new(RefCell::new(Default::default())),
            parent: None,
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    pub fn reconciler(&self) -> &Reconciler<T, F, K> {
        &self.reconciler
    }

    pub fn items(&self) -> &[T] {
        self.reconciler.items()
    }

    pub fn host(&self) -> Option<&H> {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> Option<&mut H> {
        self.host.as_mut()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    /// Whether `task` has work waiting to run.
    pub fn is_pending(&self, task: Task) -> bool {
        self.state(task).dirty
    }

    /// Whether the last reported range was stable.
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    /// Drains numeric-input diagnostics collected by the layout.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.layout.take_diagnostics()
    }

    /// Attaches the host and schedules the first render.
    pub fn attach(&mut self, host: H) -> Result<(), Error> {
        vdebug!(list = ?self.id, items = self.reconciler.items().len(), "Coordinator::attach");
        self.host = Some(host);
        self.resync = true;
        self.update_view();
        self.request(Task::Render)
    }

    /// Destroys every slot and hands the host back.
    pub fn detach(&mut self) -> Option<H> {
        let mut host = self.host.take()?;
        vdebug!(list = ?self.id, "Coordinator::detach");
        self.reconciler.clear(&mut host);
        self.to_measure.clear();
        self.followups.clear();
        Some(host)
    }

    /// Replaces every item, keeping the record under the viewport's leading edge in place.
    pub fn set_items(&mut self, items: Vec<T>) -> Result<(), Error> {
        let anchor = capture_anchor(&self.layout, &self.reconciler);
        self.reconciler.set_items(items);
        self.items_changed(anchor)
    }

    /// Replaces `at` with `replacement`, like [`Vec::splice`].
    pub fn splice(
        &mut self,
        at: core::ops::Range<usize>,
        replacement: impl IntoIterator<Item = T>,
    ) -> Result<(), Error> {
        let anchor = capture_anchor(&self.layout, &self.reconciler);
        self.reconciler.splice(at, replacement);
        self.items_changed(anchor)
    }

    fn items_changed(&mut self, anchor: Option<crate::ScrollAnchor<K>>) -> Result<(), Error> {
        self.layout.set_total_items(self.reconciler.items().len());
        if let Some(anchor) = anchor {
            apply_anchor(&mut self.layout, &self.reconciler, &anchor);
        }
        self.request(Task::Render)
    }

    /// Queues the slot of `index` (or every active slot) for measurement.
    ///
    /// Panics if `index` is out of bounds.
    pub fn request_remeasure(&mut self, index: Option<usize>) -> Result<(), Error> {
        match index {
            Some(index) => {
                let count = self.reconciler.items().len();
                assert!(
                    index < count,
                    "request_remeasure: index {index} out of bounds (total_items={count})"
                );
                if let Some(id) = self.reconciler.slot_for(index) {
                    self.to_measure.insert(id);
                }
            }
            None => self.queue_all_active(),
        }
        self.request(Task::Measure)
    }

    /// Forgets every measurement and rebinds the whole range.
    pub fn invalidate(&mut self) -> Result<(), Error> {
        self.layout.invalidate();
        self.reconciler.reset();
        self.request(Task::Render)
    }

    pub fn set_direction(&mut self, direction: Direction) -> Result<(), Error> {
        if self.layout.direction() == direction {
            return Ok(());
        }
        self.layout.set_direction(direction);
        // Measured extents belong to the old axis.
        self.layout.invalidate();
        self.reconciler.reset();
        self.update_view();
        self.request(Task::Render)
    }

    pub fn set_overhang(&mut self, overhang: f64) -> Result<(), Error> {
        self.layout.set_overhang(overhang);
        self.request_render_if_needed()
    }

    /// Scrolls `index` into view on the next render. Panics if `index` is out of bounds.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> Result<(), Error> {
        self.layout.scroll_to_index(index, align);
        self.request(Task::Render)
    }

    /// Call when the scroller moved.
    pub fn on_scroll(&mut self) -> Result<(), Error> {
        self.update_view();
        self.request_render_if_needed()
    }

    /// Call when the container or scroller changed size.
    pub fn on_resize(&mut self) -> Result<(), Error> {
        self.update_view();
        // Slot sizes may depend on the cross-axis size.
        self.queue_all_active();
        self.request_render_if_needed()?;
        if !self.to_measure.is_empty() {
            self.request(Task::Measure)?;
        }
        Ok(())
    }

    /// A link for a list nested inside the slot of `index`.
    pub fn child_link(&self, index: usize) -> ParentLink {
        let count = self.reconciler.items().len();
        assert!(
            index < count,
            "child_link: index {index} out of bounds (total_items={count})"
        );
        ParentLink::new(self.id, index, &self.inbox)
    }

    pub fn set_parent(&mut self, link: Option<ParentLink>) {
        self.parent = link;
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Picks up notifications from nested lists without waiting for the next pass.
    pub fn poll_children(&mut self) -> Result<(), Error> {
        self.drain_children();
        if self.to_measure.is_empty() {
            return Ok(());
        }
        self.request(Task::Measure)
    }

    /// Runs a scheduled task, then any task it requested.
    ///
    /// Hosts with a deferring [`Scheduler`] call this when a task comes due. An error aborts the
    /// pass without committing its host writes; the task stays pending.
    pub fn run(&mut self, task: Task) -> Result<(), Error> {
        if self.host.is_none() {
            self.state_mut(task).scheduled = false;
            return Err(Error::Detached);
        }
        if self.running {
            self.followups.push_back(task);
            return Ok(());
        }

        self.running = true;
        let mut result = self.run_task(task);
        while result.is_ok() {
            let Some(next) = self.followups.pop_front() else {
                break;
            };
            result = self.run_task(next);
        }
        self.running = false;

        if result.is_err() {
            let dropped: Vec<Task> = self.followups.drain(..).collect();
            for task in dropped {
                self.state_mut(task).scheduled = false;
            }
        }
        result
    }

    fn run_task(&mut self, task: Task) -> Result<(), Error> {
        let state = self.state_mut(task);
        state.scheduled = false;
        if !state.dirty {
            return Ok(());
        }
        state.dirty = false;

        let result = match task {
            Task::Render => self.render_pass(),
            Task::Measure => self.measure_pass(),
        };
        if let Err(err) = &result {
            vwarn!(list = ?self.id, ?task, error = %err, "Coordinator: pass aborted");
            self.state_mut(task).dirty = true;
        }
        result
    }

    fn request(&mut self, task: Task) -> Result<(), Error> {
        let state = self.state_mut(task);
        state.dirty = true;
        if state.scheduled || self.host.is_none() {
            return Ok(());
        }
        self.state_mut(task).scheduled = true;
        vtrace!(list = ?self.id, ?task, "Coordinator::request");
        match self.scheduler.schedule(task) {
            Dispatch::Now => self.run(task),
            Dispatch::Deferred => Ok(()),
        }
    }

    fn request_render_if_needed(&mut self) -> Result<(), Error> {
        if self.layout.needs_reflow() {
            self.request(Task::Render)
        } else {
            Ok(())
        }
    }

    fn state(&self, task: Task) -> &TaskState {
        match task {
            Task::Render => &self.render,
            Task::Measure => &self.measure,
        }
    }

    fn state_mut(&mut self, task: Task) -> &mut TaskState {
        match task {
            Task::Render => &mut self.render,
            Task::Measure => &mut self.measure,
        }
    }

    fn update_view(&mut self) {
        let Some(host) = self.host.as_ref() else {
            return;
        };
        let direction = self.layout.direction();
        let (extent, scroll) = host
            .view()
            .with_min_extent(direction, self.layout.total_extent())
            .viewport(direction);
        self.layout.set_viewport_extent(extent);
        self.layout.set_scroll_position(scroll);
    }

    fn queue_all_active(&mut self) {
        let to_measure = &mut self.to_measure;
        self.reconciler.for_each_active(|_, id| {
            to_measure.insert(id);
        });
    }

    fn drain_children(&mut self) {
        for index in nested::drain(&self.inbox, self.id) {
            if let Some(id) = self.reconciler.slot_for(index) {
                self.to_measure.insert(id);
            }
        }
    }

    fn render_pass(&mut self) -> Result<(), Error> {
        self.drain_children();
        self.update_view();
        let direction = self.layout.direction();

        let mut facts = Vec::new();
        if self.layout.needs_reflow() {
            self.layout.reflow(&mut |fact| facts.push(fact));
        }

        let mut min_extent = self.resync.then(|| self.layout.total_extent());
        let (mut dx, mut dy) = core::mem::take(&mut self.carried_scroll);
        let mut moved = Vec::new();
        let mut unstable = false;
        let mut notify_parent = false;
        for fact in facts {
            match fact {
                LayoutFact::SizeChanged { extent } => {
                    min_extent = Some(extent);
                    notify_parent = true;
                }
                LayoutFact::RangeChanged(change) => {
                    self.stable = change.stable;
                    unstable = !change.stable;
                    notify_parent |= change.stable;
                }
                LayoutFact::PositionsChanged(positions) => moved = positions,
                LayoutFact::ScrollError { dx: x, dy: y } => {
                    dx += x;
                    dy += y;
                }
            }
        }

        let range = self.layout.range();
        self.reconciler.set_incremental(!self.stable);
        self.reconciler.set_range(range.first, range.num);

        let Some(host) = self.host.as_mut() else {
            return Err(Error::Detached);
        };
        let bound = if self.reconciler.is_dirty() {
            match self.reconciler.render(host) {
                Ok(report) => report.bound,
                Err(err) => {
                    self.resync = true;
                    self.carried_scroll = (dx, dy);
                    return Err(err.into());
                }
            }
        } else {
            Vec::new()
        };

        let mut writes = Vec::with_capacity(bound.len() + moved.len() + 2);
        if let Some(extent) = min_extent {
            writes.push(Write::MinExtent(direction, extent));
        }
        let mut positioned = BTreeSet::new();
        for &(id, index) in &bound {
            if let Some(offset) = self.layout.item_offset(index) {
                writes.push(Write::Position(id, Position::along(direction, offset)));
                positioned.insert(id);
            }
            self.to_measure.insert(id);
        }
        for (index, offset) in moved {
            // Offsets of indexes without a bound slot are dropped.
            match self.reconciler.slot_for(index) {
                Some(id) if !positioned.contains(&id) => {
                    writes.push(Write::Position(id, Position::along(direction, offset)));
                }
                _ => {}
            }
        }
        if dx != 0.0 || dy != 0.0 {
            writes.push(Write::ScrollBy(dx, dy));
        }

        vtrace!(
            list = ?self.id,
            first = range.first,
            num = range.num,
            bound = bound.len(),
            writes = writes.len(),
            "Coordinator::render"
        );
        commit(host, &self.reconciler, writes);
        self.resync = false;

        if notify_parent {
            if let Some(link) = &self.parent {
                link.notify(self.id);
            }
        }
        if unstable {
            self.layout.settle();
            self.request(Task::Render)?;
        } else if !self.to_measure.is_empty() {
            self.request(Task::Measure)?;
        }
        Ok(())
    }

    fn measure_pass(&mut self) -> Result<(), Error> {
        self.drain_children();
        if !self.stable {
            // Picked up again by the render pass that settles the range.
            self.measure.dirty = true;
            return Ok(());
        }

        let queued = core::mem::take(&mut self.to_measure);
        let direction = self.layout.direction();
        let Some(host) = self.host.as_mut() else {
            self.to_measure = queued;
            return Err(Error::Detached);
        };

        // Read everything first; the layout is only written once every read succeeded.
        let mut measurements = Vec::with_capacity(queued.len());
        let mut failure = None;
        for &id in &queued {
            let (Some(index), Some(slot)) = (self.reconciler.index_of(id), self.reconciler.slot(id))
            else {
                continue;
            };
            match host.measure(slot) {
                Ok(measurement) => measurements.push((index, measurement.extent(direction))),
                Err(source) => {
                    failure = Some(source);
                    break;
                }
            }
        }
        if let Some(source) = failure {
            self.to_measure.extend(queued);
            return Err(virtualist::Error::host("measure", source).into());
        }

        vtrace!(list = ?self.id, measured = measurements.len(), "Coordinator::measure");
        self.layout.update_extents(&measurements);
        self.request_render_if_needed()
    }
}

impl<T, F, H, L, K> Coordinator<T, F, H, L, QueuedScheduler, K>
where
    F: SlotFactory<T>,
    H: Host<F::Slot>,
    L: LayoutEngine,
    K: SlotKey,
{
    /// Runs queued microtasks until none remain.
    pub fn run_microtasks(&mut self) -> Result<(), Error> {
        while let Some(task) = self.scheduler.pop_microtask() {
            self.run(task)?;
        }
        Ok(())
    }

    /// Runs the tasks that were waiting for a frame, each followed by the microtasks it queued.
    ///
    /// Tasks queued for a frame while this runs wait for the next call.
    pub fn run_frame(&mut self) -> Result<(), Error> {
        self.run_microtasks()?;
        for _ in 0..self.scheduler.frame_len() {
            if let Some(task) = self.scheduler.pop_frame() {
                self.run(task)?;
                self.run_microtasks()?;
            }
        }
        Ok(())
    }
}

fn commit<T, F, K, H>(host: &mut H, reconciler: &Reconciler<T, F, K>, writes: Vec<Write>)
where
    F: SlotFactory<T>,
    K: SlotKey,
    H: Host<F::Slot>,
{
    for write in writes {
        match write {
            Write::MinExtent(direction, extent) => host.set_min_extent(direction, extent),
            Write::Position(id, position) => {
                if let Some(slot) = reconciler.slot(id) {
                    host.set_position(slot, position);
                }
            }
            Write::ScrollBy(dx, dy) => host.scroll_by(dx, dy),
        }
    }
}

impl<T, F, H, L, S, K> core::fmt::Debug for Coordinator<T, F, H, L, S, K>
where
    F: SlotFactory<T>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Coordinator")
            .field("id", &self.id)
            .field("reconciler", &self.reconciler)
            .field("attached", &self.host.is_some())
            .field("render", &self.render)
            .field("measure", &self.measure)
            .field("to_measure", &self.to_measure.len())
            .field("stable", &self.stable)
            .finish_non_exhaustive()
    }
}
