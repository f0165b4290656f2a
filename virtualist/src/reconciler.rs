use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::error::Error;
use crate::key::{KeyMap, SlotKey};
use crate::{ItemKey, Range, ReconcilerOptions};

/// Creates, refreshes and disposes of the host's renderable slots.
///
/// This is the capability a [`Reconciler`] is built with. It decides *what* a slot looks like;
/// the reconciler only decides which items are represented.
pub trait SlotFactory<T> {
    type Slot;

    /// Creates a slot for the item at `index`.
    fn create(&mut self, index: usize) -> Result<Self::Slot, Error>;

    /// Binds `item` to `slot`. Called on every (re)binding, including refreshes of a slot that
    /// already shows `index`.
    fn update(&mut self, slot: &mut Self::Slot, item: &T, index: usize) -> Result<(), Error>;

    /// Called when a slot bound to `index` is moved to the pool.
    fn recycle(&mut self, _slot: &mut Self::Slot, _index: usize) {}

    /// Disposes of a slot that will never be reused.
    fn remove(&mut self, slot: Self::Slot) {
        drop(slot);
    }
}

/// The host container that slots are attached to.
pub trait SlotContainer<S> {
    /// Inserts (or moves) `slot` immediately before `before`, or at the end when `None`.
    fn attach(&mut self, slot: &S, before: Option<&S>);
    fn detach(&mut self, slot: &S);
}

/// Opaque handle to a slot owned by a [`Reconciler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u32);

impl SlotId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a render pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub created: usize,
    /// Slots taken out of the pool.
    pub reused: usize,
    pub recycled: usize,
    pub destroyed: usize,
    /// Already attached slots that had to change place.
    pub moved: usize,
    /// Every slot that was bound or refreshed in this pass, in index order.
    pub bound: Vec<(SlotId, usize)>,
}

struct SlotEntry<S, K> {
    slot: S,
    bound: Option<usize>,
    key: Option<K>,
    attached: bool,
}

/// Turns a [`Range`] into an ordered sequence of bound slots with minimal churn.
pub struct Reconciler<T, F: SlotFactory<T>, K = ItemKey> {
    options: ReconcilerOptions<T, K>,
    factory: F,
    items: Vec<T>,

    slots: Vec<Option<SlotEntry<F::Slot, K>>>,
    free: Vec<SlotId>,

    active: BTreeMap<usize, SlotId>,
    active_keys: KeyMap<K, SlotId>,
    pool: KeyMap<K, SlotId>,
    pool_order: Vec<SlotId>,
    physical: Vec<SlotId>,

    range: Range,
    rendered: Range,
    needs_reset: bool,
    dirty: bool,
    incremental: bool,
}

impl<T, F, K> Reconciler<T, F, K>
where
    F: SlotFactory<T>,
    K: SlotKey,
{
    pub fn new(options: ReconcilerOptions<T, K>, factory: F) -> Self {
        Self {
            options,
            factory,
            items: Vec::new(),
            slots: Vec::new(),
            free: Vec::new(),
            active: BTreeMap::new(),
            active_keys: KeyMap::default(),
            pool: KeyMap::default(),
            pool_order: Vec::new(),
            physical: Vec::new(),
            range: Range::EMPTY,
            rendered: Range::EMPTY,
            needs_reset: true,
            dirty: true,
            incremental: false,
        }
    }

    pub fn options(&self) -> &ReconcilerOptions<T, K> {
        &self.options
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Returns the item at `index`. Panics when `index` is out of bounds.
    pub fn item(&self, index: usize) -> &T {
        let count = self.items.len();
        assert!(
            index < count,
            "Reconciler: item index {index} out of bounds (total_items={count})"
        );
        &self.items[index]
    }

    pub fn key_for(&self, index: usize) -> K {
        (self.options.key_fn)(self.item(index), index)
    }

    /// Replaces all items. The next render rebuilds the whole range.
    pub fn set_items(&mut self, items: Vec<T>) {
        vdebug!(
            prev = self.items.len(),
            next = items.len(),
            "Reconciler::set_items"
        );
        self.items = items;
        self.reset();
    }

    /// Replaces `at` with `replacement`, like [`Vec::splice`]. The next render rebuilds the range.
    pub fn splice(
        &mut self,
        at: core::ops::Range<usize>,
        replacement: impl IntoIterator<Item = T>,
    ) {
        self.items.splice(at, replacement);
        self.reset();
    }

    /// Forces the next render through the reset path.
    pub fn reset(&mut self) {
        self.needs_reset = true;
        self.dirty = true;
    }

    /// Sets the window to materialize. Panics if it exceeds the item count.
    pub fn set_range(&mut self, first: usize, num: usize) {
        let count = self.items.len();
        assert!(
            first.saturating_add(num) <= count,
            "Reconciler: range first={first} num={num} exceeds total_items={count}"
        );
        let range = Range::new(first, num);
        if range != self.range {
            self.range = range;
            self.dirty = true;
        }
    }

    /// When set, slots leaving the range stay bound until a render with the flag cleared.
    pub fn set_incremental(&mut self, incremental: bool) {
        if self.incremental != incremental {
            self.incremental = incremental;
            self.dirty = true;
        }
    }

    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Whether a render would change anything.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn slot(&self, id: SlotId) -> Option<&F::Slot> {
        self.entry(id).map(|e| &e.slot)
    }

    pub fn slot_for(&self, index: usize) -> Option<SlotId> {
        self.active.get(&index).copied()
    }

    pub fn index_of(&self, id: SlotId) -> Option<usize> {
        self.entry(id).and_then(|e| e.bound)
    }

    pub fn key_of(&self, id: SlotId) -> Option<&K> {
        self.entry(id).and_then(|e| e.key.as_ref())
    }

    pub fn is_attached(&self, id: SlotId) -> bool {
        self.entry(id).is_some_and(|e| e.attached)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn pool_len(&self) -> usize {
        self.pool_order.len()
    }

    /// Number of live slots (active and pooled).
    pub fn slot_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Active slots in index order.
    pub fn for_each_active(&self, mut f: impl FnMut(usize, SlotId)) {
        for (&index, &id) in &self.active {
            f(index, id);
        }
    }

    /// Attached slots in the container's physical order.
    pub fn physical_order(&self) -> &[SlotId] {
        &self.physical
    }

    /// Materializes the current range.
    ///
    /// A failing host callback aborts the pass and leaves the reconciler marked for a full
    /// reset, so the next render rebinds every slot.
    pub fn render<C>(&mut self, container: &mut C) -> Result<RenderReport, Error>
    where
        C: SlotContainer<F::Slot>,
    {
        let range = self.range;
        debug_assert!(range.end() <= self.items.len());
        let reset = self.needs_reset || !range.overlaps(&self.rendered);
        vtrace!(
            first = range.first,
            num = range.num,
            reset,
            incremental = self.incremental,
            "Reconciler::render"
        );

        let mut report = RenderReport::default();
        let result = if reset {
            self.render_reset(container, &mut report)
        } else {
            self.render_incremental(container, &mut report)
        };
        if let Err(err) = result {
            vwarn!(error = %err, "Reconciler::render aborted");
            self.needs_reset = true;
            self.dirty = true;
            return Err(err);
        }

        if !self.incremental {
            self.evict_outside(container, &mut report);
        }
        self.reorder(container, &mut report);

        self.rendered = range;
        self.needs_reset = false;
        self.dirty = false;
        vdebug!(
            created = report.created,
            reused = report.reused,
            recycled = report.recycled,
            destroyed = report.destroyed,
            moved = report.moved,
            "Reconciler::render done"
        );
        Ok(report)
    }

    /// Destroys every slot, active and pooled.
    pub fn clear<C>(&mut self, container: &mut C)
    where
        C: SlotContainer<F::Slot>,
    {
        let active = core::mem::take(&mut self.active);
        for (_, id) in active {
            if let Some(entry) = self.take_entry(id) {
                if entry.attached {
                    container.detach(&entry.slot);
                }
                self.factory.remove(entry.slot);
            }
        }
        for id in core::mem::take(&mut self.pool_order) {
            if let Some(entry) = self.take_entry(id) {
                self.factory.remove(entry.slot);
            }
        }
        self.active_keys.clear();
        self.pool.clear();
        self.physical.clear();
        self.rendered = Range::EMPTY;
        self.needs_reset = true;
        self.dirty = true;
    }

    fn render_reset<C>(&mut self, container: &mut C, report: &mut RenderReport) -> Result<(), Error>
    where
        C: SlotContainer<F::Slot>,
    {
        let range = self.range;
        let previous = core::mem::take(&mut self.active);
        let mut unclaimed = core::mem::take(&mut self.active_keys);

        // Key hits first, so slots keep their identity wherever their item moved.
        let mut misses = Vec::new();
        for index in range.indexes() {
            let key = self.key_for(index);
            let hit = match unclaimed.remove(&key) {
                Some(id) => Some(id),
                None => self.take_pooled(&key).inspect(|_| report.reused += 1),
            };
            match hit {
                Some(id) => self.activate(id, index, key),
                None => misses.push((index, key)),
            }
        }

        for (index, id) in previous {
            let still_unclaimed = self
                .entry(id)
                .and_then(|e| e.key.as_ref())
                .and_then(|k| unclaimed.get(k))
                == Some(&id);
            if still_unclaimed {
                self.deactivate(id, index, container, report);
            }
        }

        for (index, key) in misses {
            let id = self.take_any_or_create(index, report)?;
            self.activate(id, index, key);
        }

        for index in range.indexes() {
            if let Some(&id) = self.active.get(&index) {
                self.refresh(id, index, report)?;
            }
        }
        Ok(())
    }

    fn render_incremental<C>(
        &mut self,
        container: &mut C,
        report: &mut RenderReport,
    ) -> Result<(), Error>
    where
        C: SlotContainer<F::Slot>,
    {
        let old = self.rendered;
        let new = self.range;

        if !self.incremental {
            let head = old.first..new.first.min(old.end());
            let tail = new.end().max(old.first)..old.end();
            for index in head.chain(tail) {
                if let Some(id) = self.active.remove(&index) {
                    self.deactivate(id, index, container, report);
                }
            }
        }

        let head = new.first..old.first.min(new.end());
        let tail = old.end().max(new.first)..new.end();
        for index in head.chain(tail) {
            if self.active.contains_key(&index) {
                continue;
            }
            let key = self.key_for(index);
            let id = match self.take_stale_active(&key, &new) {
                Some(id) => id,
                None => match self.take_pooled(&key) {
                    Some(id) => {
                        report.reused += 1;
                        id
                    }
                    None => self.take_any_or_create(index, report)?,
                },
            };
            self.activate(id, index, key);
            self.refresh(id, index, report)?;
        }
        Ok(())
    }

    /// Deactivates slots left bound outside the range by incremental passes.
    fn evict_outside<C>(&mut self, container: &mut C, report: &mut RenderReport)
    where
        C: SlotContainer<F::Slot>,
    {
        let range = self.range;
        let outside: Vec<(usize, SlotId)> = self
            .active
            .iter()
            .filter(|(index, _)| !range.contains(**index))
            .map(|(&index, &id)| (index, id))
            .collect();
        for (index, id) in outside {
            self.active.remove(&index);
            self.deactivate(id, index, container, report);
        }
    }

    /// Restores "physical order == index order" with a single current-marker walk.
    fn reorder<C>(&mut self, container: &mut C, report: &mut RenderReport)
    where
        C: SlotContainer<F::Slot>,
    {
        let ordered: Vec<SlotId> = self.active.values().copied().collect();
        let mut marker = 0usize;
        for id in ordered {
            if self.physical.get(marker) == Some(&id) {
                marker += 1;
                continue;
            }
            let was_attached = match self.physical.iter().position(|&p| p == id) {
                Some(pos) => {
                    self.physical.remove(pos);
                    true
                }
                None => false,
            };
            let before = self.physical.get(marker).copied();
            if let Some(slot) = self.slot(id) {
                container.attach(slot, before.and_then(|b| self.slot(b)));
            }
            if let Some(entry) = self.entry_mut(id) {
                entry.attached = true;
            }
            self.physical.insert(marker, id);
            marker += 1;
            if was_attached {
                report.moved += 1;
            }
        }
    }

    fn activate(&mut self, id: SlotId, index: usize, key: K) {
        if let Some(entry) = self.entry_mut(id) {
            entry.bound = Some(index);
            entry.key = Some(key.clone());
        }
        if let Some(displaced) = self.active.insert(index, id) {
            debug_assert!(displaced == id, "two slots bound to index {index}");
        }
        self.active_keys.insert(key, id);
    }

    fn refresh(&mut self, id: SlotId, index: usize, report: &mut RenderReport) -> Result<(), Error> {
        let item = &self.items[index];
        if let Some(Some(entry)) = self.slots.get_mut(id.index()) {
            self.factory.update(&mut entry.slot, item, index)?;
        }
        report.bound.push((id, index));
        Ok(())
    }

    fn deactivate<C>(
        &mut self,
        id: SlotId,
        index: usize,
        container: &mut C,
        report: &mut RenderReport,
    ) where
        C: SlotContainer<F::Slot>,
    {
        if let Some(key) = self.entry(id).and_then(|e| e.key.clone()) {
            if self.active_keys.get(&key) == Some(&id) {
                self.active_keys.remove(&key);
            }
        }
        self.physical.retain(|&p| p != id);

        if self.options.recycling {
            let Some(Some(entry)) = self.slots.get_mut(id.index()) else {
                return;
            };
            self.factory.recycle(&mut entry.slot, index);
            if entry.attached {
                container.detach(&entry.slot);
                entry.attached = false;
            }
            entry.bound = None;
            if let Some(key) = entry.key.clone() {
                self.pool.insert(key, id);
            }
            self.pool_order.push(id);
            report.recycled += 1;
        } else if let Some(entry) = self.take_entry(id) {
            if entry.attached {
                container.detach(&entry.slot);
            }
            self.factory.remove(entry.slot);
            report.destroyed += 1;
        }
    }

    /// A slot still bound outside `range` (deferred by an incremental pass) whose key matches.
    fn take_stale_active(&mut self, key: &K, range: &Range) -> Option<SlotId> {
        let id = *self.active_keys.get(key)?;
        let bound = self.entry(id)?.bound?;
        if range.contains(bound) {
            return None;
        }
        self.active.remove(&bound);
        self.active_keys.remove(key);
        Some(id)
    }

    fn take_pooled(&mut self, key: &K) -> Option<SlotId> {
        let id = self.pool.remove(key)?;
        self.pool_order.retain(|&p| p != id);
        Some(id)
    }

    fn take_any_or_create(
        &mut self,
        index: usize,
        report: &mut RenderReport,
    ) -> Result<SlotId, Error> {
        if self.options.recycling {
            if let Some(id) = self.pool_order.pop() {
                if let Some(key) = self.entry(id).and_then(|e| e.key.clone()) {
                    if self.pool.get(&key) == Some(&id) {
                        self.pool.remove(&key);
                    }
                }
                report.reused += 1;
                return Ok(id);
            }
        }
        let slot = self.factory.create(index)?;
        report.created += 1;
        Ok(self.insert_entry(slot))
    }

    fn insert_entry(&mut self, slot: F::Slot) -> SlotId {
        let entry = SlotEntry {
            slot,
            bound: None,
            key: None,
            attached: false,
        };
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(entry);
            return id;
        }
        let id = SlotId(self.slots.len() as u32);
        self.slots.push(Some(entry));
        id
    }

    fn take_entry(&mut self, id: SlotId) -> Option<SlotEntry<F::Slot, K>> {
        let entry = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id);
        Some(entry)
    }

    fn entry(&self, id: SlotId) -> Option<&SlotEntry<F::Slot, K>> {
        self.slots.get(id.index())?.as_ref()
    }

    fn entry_mut(&mut self, id: SlotId) -> Option<&mut SlotEntry<F::Slot, K>> {
        self.slots.get_mut(id.index())?.as_mut()
    }
}

impl<T, F, K> core::fmt::Debug for Reconciler<T, F, K>
where
    F: SlotFactory<T>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reconciler")
            .field("items", &self.items.len())
            .field("range", &self.range)
            .field("rendered", &self.rendered)
            .field("active", &self.active.len())
            .field("pooled", &self.pool_order.len())
            .field("incremental", &self.incremental)
            .finish_non_exhaustive()
    }
}
