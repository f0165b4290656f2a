use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::fenwick::Fenwick;
use crate::{
    Align, Anchor, Diagnostic, Direction, Extent, LayoutFact, LayoutOptions, Range, RangeChange,
};

/// Changes to an already measured extent smaller than this are ignored.
pub const EXTENT_EPSILON: f64 = 0.5;

/// Range and position computation over an item-extent model.
///
/// Implementations hold no slot references, only index-keyed numeric state. Setters never
/// recompute anything themselves: they mark a reflow as pending, and the driver calls
/// [`LayoutEngine::reflow`] from its scheduled pass.
pub trait LayoutEngine {
    fn set_total_items(&mut self, total_items: usize);
    fn set_viewport_extent(&mut self, extent: f64);
    fn set_scroll_position(&mut self, position: f64);
    fn set_overhang(&mut self, overhang: f64);
    fn set_direction(&mut self, direction: Direction);

    /// Merges measured extents, overwriting estimates.
    fn update_extents(&mut self, measurements: &[(usize, Extent)]);

    /// Recomputes range, positions and total extent, emitting the facts that changed.
    fn reflow(&mut self, emit: &mut dyn FnMut(LayoutFact));

    /// Requests a reflow that reports the current range as stable.
    fn settle(&mut self);

    /// Forgets every measurement and falls back to estimates.
    fn invalidate(&mut self);

    /// Pins `index` so the next reflow scrolls it into view.
    fn scroll_to_index(&mut self, index: usize, align: Align);

    /// Pins `anchor` so the next reflow puts the scroll position `anchor.offset` past the start
    /// of `anchor.index`.
    fn restore_anchor(&mut self, anchor: Anchor);

    fn needs_reflow(&self) -> bool;
    fn direction(&self) -> Direction;
    fn range(&self) -> Range;
    fn total_extent(&self) -> f64;
    fn scroll_position(&self) -> f64;

    /// The item at the leading edge of the viewport after the last reflow.
    fn anchor(&self) -> Option<Anchor>;

    fn item_offset(&self, index: usize) -> Option<f64>;
    fn take_diagnostics(&mut self) -> Vec<Diagnostic>;
}

/// A read-only snapshot of the layout inputs and outputs.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutState {
    pub scroll_position: f64,
    pub viewport_extent: f64,
    pub total_extent: f64,
    pub overhang: f64,
    pub direction: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Pin {
    Index(usize, Align),
    Anchor(Anchor),
}

impl Pin {
    fn index(&self) -> usize {
        match self {
            Self::Index(index, _) => *index,
            Self::Anchor(anchor) => anchor.index,
        }
    }
}

/// A one-dimensional flow layout: items are stacked along the scroll axis.
#[derive(Clone, Debug)]
pub struct FlowLayout {
    options: LayoutOptions,
    viewport: f64,
    scroll: f64,

    extents: Vec<Extent>,
    measured: Vec<bool>,
    sums: Fenwick, // spans (margins included)

    range: Range,
    emitted_size: Option<f64>,
    emitted_range: Option<RangeChange>,
    positions: BTreeMap<usize, f64>,

    anchor: Option<Anchor>,
    pinned: Option<Pin>,
    pending_shift: f64,

    pending: bool,
    scroll_only: bool,
    diagnostics: Vec<Diagnostic>,
}

impl FlowLayout {
    pub fn new(options: LayoutOptions) -> Self {
        vdebug!(
            total_items = options.total_items,
            overhang = options.overhang,
            "FlowLayout::new"
        );
        let mut l = Self {
            options,
            viewport: 0.0,
            scroll: 0.0,
            extents: Vec::new(),
            measured: Vec::new(),
            sums: Fenwick::new(0),
            range: Range::EMPTY,
            emitted_size: None,
            emitted_range: None,
            positions: BTreeMap::new(),
            anchor: None,
            pinned: None,
            pending_shift: 0.0,
            pending: true,
            scroll_only: false,
            diagnostics: Vec::new(),
        };
        l.rebuild_estimates();
        l
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn total_items(&self) -> usize {
        self.options.total_items
    }

    pub fn viewport_extent(&self) -> f64 {
        self.viewport
    }

    pub fn state(&self) -> LayoutState {
        LayoutState {
            scroll_position: self.scroll,
            viewport_extent: self.viewport,
            total_extent: self.sums.total(),
            overhang: self.options.overhang,
            direction: self.options.direction,
        }
    }

    pub fn item_extent(&self, index: usize) -> Option<Extent> {
        self.extents.get(index).copied()
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.measured.get(index).copied().unwrap_or(false)
    }

    /// Returns the index of the item covering `offset` (clamped to the last item).
    pub fn index_at_offset(&self, offset: f64) -> Option<usize> {
        let count = self.options.total_items;
        if count == 0 {
            return None;
        }
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        Some(self.sums.lower_bound(offset).min(count - 1))
    }

    pub fn max_scroll_position(&self) -> f64 {
        (self.sums.total() - self.viewport).max(0.0)
    }

    /// Computes the scroll position that brings `index` into view with the given alignment.
    pub fn scroll_to_index_position(&self, index: usize, align: Align) -> f64 {
        let count = self.options.total_items;
        if count == 0 {
            return 0.0;
        }
        let index = index.min(count - 1);
        let start = self.sums.prefix_sum(index);
        let end = start + self.extents[index].span();
        let view = self.viewport;

        let target = match align {
            Align::Start => start,
            Align::End => end - view,
            Align::Center => start + (end - start) / 2.0 - view / 2.0,
            Align::Auto => {
                let cur = self.scroll;
                let cur_end = cur + view;
                if start >= cur && end <= cur_end {
                    cur
                } else if start < cur {
                    start
                } else {
                    end - view
                }
            }
        };
        target.clamp(0.0, self.max_scroll_position())
    }

    fn mark_pending(&mut self, scroll_caused: bool) {
        if !self.pending {
            self.pending = true;
            self.scroll_only = scroll_caused;
        } else if !scroll_caused {
            self.scroll_only = false;
        }
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        vwarn!(diagnostic = ?diagnostic, "FlowLayout: ignoring invalid input");
        self.diagnostics.push(diagnostic);
    }

    fn estimate(&mut self, index: usize) -> Extent {
        let extent = self.options.item_extent.estimate(index);
        if extent.is_valid() {
            return extent;
        }
        // No known-good value exists for an estimate: the item contributes nothing this pass.
        self.diagnose(Diagnostic::InvalidExtent {
            index,
            value: extent.first_invalid(),
        });
        Extent::default()
    }

    fn rebuild_estimates(&mut self) {
        let count = self.options.total_items;
        self.extents.clear();
        self.measured.clear();
        self.extents.reserve_exact(count);
        self.measured.reserve_exact(count);
        for i in 0..count {
            let e = self.estimate(i);
            self.extents.push(e);
            self.measured.push(false);
        }
        self.rebuild_sums();
    }

    fn rebuild_sums(&mut self) {
        let spans: Vec<f64> = self.extents.iter().map(Extent::span).collect();
        self.sums = Fenwick::from_values(&spans);
    }

    /// The span `[start, end)` currently covered by the materialized range.
    fn materialized_span(&self) -> (f64, f64) {
        if self.range.is_empty() {
            return (0.0, 0.0);
        }
        let start = self.sums.prefix_sum(self.range.first);
        let end = self.sums.prefix_sum(self.range.end());
        (start, end)
    }

    fn window_uncovered(&self) -> bool {
        let count = self.options.total_items;
        if self.emitted_range.is_none() {
            return true;
        }
        if count == 0 {
            return false;
        }
        if self.viewport <= 0.0 {
            return true;
        }
        let total = self.sums.total();
        let overhang = self.options.overhang.min(total);
        let min = (self.scroll - overhang).max(0.0);
        let max = (self.scroll + self.viewport + overhang).min(total);
        let (covered_min, covered_max) = self.materialized_span();
        covered_min > min || covered_max < max
    }

    fn compute_range(&self) -> Range {
        let count = self.options.total_items;
        if count == 0 {
            return Range::EMPTY;
        }
        if self.viewport <= 0.0 {
            return Range::new(self.first_at(self.scroll), 1);
        }

        let total = self.sums.total();
        let overhang = self.options.overhang.min(total);
        let start = (self.scroll - overhang).max(0.0);
        let end = (self.scroll + self.viewport + overhang).min(total);

        let first = self.first_at(start);
        let mut last = self.sums.count_before(end).min(count - 1).max(first);
        while last + 1 < count
            && self.extents[last + 1].span() <= 0.0
            && self.sums.prefix_sum(last + 1) <= end
        {
            last += 1;
        }
        Range::new(first, last - first + 1)
    }

    /// The first item that ends past `offset`, or an empty item sitting exactly at it.
    fn first_at(&self, offset: f64) -> usize {
        let mut first = self.sums.lower_bound(offset).min(self.options.total_items - 1);
        while first > 0
            && self.extents[first - 1].span() <= 0.0
            && self.sums.prefix_sum(first - 1) >= offset
        {
            first -= 1;
        }
        first
    }

    /// Applies a pinned index or a pending anchor shift and clamps the scroll position.
    ///
    /// Returns the shift the host must apply to its own scroll position. Plain clamping of a
    /// host-provided position is not reported.
    fn resolve_scroll(&mut self) -> f64 {
        let max = self.max_scroll_position();
        let base = self.scroll.clamp(0.0, max);
        let mut adjusted = false;
        if let Some(pin) = self.pinned.take() {
            if pin.index() < self.options.total_items {
                self.scroll = match pin {
                    Pin::Index(index, align) => self.scroll_to_index_position(index, align),
                    Pin::Anchor(anchor) => self.sums.prefix_sum(anchor.index) + anchor.offset,
                };
                adjusted = true;
            }
            self.pending_shift = 0.0;
        } else if self.pending_shift != 0.0 {
            self.scroll += self.pending_shift;
            self.pending_shift = 0.0;
            adjusted = true;
        }
        self.scroll = self.scroll.clamp(0.0, max);
        if adjusted { self.scroll - base } else { 0.0 }
    }

    fn capture_anchor(&mut self) {
        let scroll = self.scroll.clamp(0.0, self.max_scroll_position());
        self.anchor = self.index_at_offset(scroll).map(|index| Anchor {
            index,
            offset: scroll - self.sums.prefix_sum(index),
        });
    }

    fn collect_positions(&mut self) -> Vec<(usize, f64)> {
        let mut changed = Vec::new();
        let mut next = BTreeMap::new();
        if !self.range.is_empty() {
            let mut start = self.sums.prefix_sum(self.range.first);
            for i in self.range.indexes() {
                let extent = self.extents[i];
                let offset = start + extent.margin_start;
                if self.positions.get(&i) != Some(&offset) {
                    changed.push((i, offset));
                }
                next.insert(i, offset);
                start += extent.span();
            }
        }
        self.positions = next;
        changed
    }
}

impl LayoutEngine for FlowLayout {
    fn set_total_items(&mut self, total_items: usize) {
        let prev = self.options.total_items;
        if prev == total_items {
            return;
        }
        vtrace!(prev, total_items, "FlowLayout::set_total_items");
        self.options.total_items = total_items;
        if total_items < prev {
            self.extents.truncate(total_items);
            self.measured.truncate(total_items);
            self.positions.retain(|&i, _| i < total_items);
        } else {
            for i in prev..total_items {
                let e = self.estimate(i);
                self.extents.push(e);
                self.measured.push(false);
            }
        }
        if self.pinned.is_some_and(|pin| pin.index() >= total_items) {
            self.pinned = None;
        }
        self.rebuild_sums();
        self.mark_pending(false);
    }

    fn set_viewport_extent(&mut self, extent: f64) {
        if !extent.is_finite() || extent < 0.0 {
            self.diagnose(Diagnostic::InvalidViewport { value: extent });
            return;
        }
        if self.viewport == extent {
            return;
        }
        self.viewport = extent;
        if self.window_uncovered() {
            self.mark_pending(false);
        }
    }

    fn set_scroll_position(&mut self, position: f64) {
        if position.is_nan() {
            self.diagnose(Diagnostic::InvalidScroll { value: position });
            return;
        }
        if self.scroll == position {
            return;
        }
        self.scroll = position;
        // Scrolling inside the materialized window skips the reflow but still moves the anchor.
        if self.anchor.is_some() {
            self.capture_anchor();
        }
        if self.window_uncovered() {
            self.mark_pending(true);
        }
    }

    fn set_overhang(&mut self, overhang: f64) {
        if !overhang.is_finite() || overhang < 0.0 {
            self.diagnose(Diagnostic::InvalidOverhang { value: overhang });
            return;
        }
        if self.options.overhang == overhang {
            return;
        }
        self.options.overhang = overhang;
        self.mark_pending(false);
    }

    fn set_direction(&mut self, direction: Direction) {
        if self.options.direction == direction {
            return;
        }
        self.options.direction = direction;
        // Every fact is axis-dependent for the host: report all of them again.
        self.emitted_size = None;
        self.positions.clear();
        self.mark_pending(false);
    }

    fn update_extents(&mut self, measurements: &[(usize, Extent)]) {
        let count = self.options.total_items;
        let mut changed = false;
        for &(index, extent) in measurements {
            assert!(
                index < count,
                "update_extents: index {index} out of bounds (total_items={count})"
            );
            if !extent.is_valid() {
                self.diagnose(Diagnostic::InvalidExtent {
                    index,
                    value: extent.first_invalid(),
                });
                continue;
            }

            let old = self.extents[index].span();
            let new = extent.span();
            let delta = new - old;
            if self.measured[index] && -EXTENT_EPSILON <= delta && delta <= EXTENT_EPSILON {
                continue;
            }

            self.extents[index] = extent;
            self.measured[index] = true;
            changed = true;

            if let Some(anchor) = self.anchor {
                if index < anchor.index {
                    self.pending_shift += delta;
                }
            }
        }
        if changed {
            // Rebuilt rather than patched so the total stays the exact sum of the spans.
            self.rebuild_sums();
            vtrace!(
                measurements = measurements.len(),
                pending_shift = self.pending_shift,
                "FlowLayout::update_extents"
            );
            self.mark_pending(false);
        }
    }

    fn reflow(&mut self, emit: &mut dyn FnMut(LayoutFact)) {
        let was_pending = self.pending;
        let scroll_only = was_pending && self.scroll_only;
        self.pending = false;
        self.scroll_only = false;

        let shift = self.resolve_scroll();
        let total = self.sums.total();
        self.range = self.compute_range();
        self.capture_anchor();

        let stable = match self.emitted_range {
            Some(prev) if prev.range == self.range => {
                if was_pending {
                    prev.stable || !scroll_only
                } else {
                    prev.stable
                }
            }
            _ => !scroll_only,
        };
        let change = RangeChange {
            range: self.range,
            stable,
        };
        vtrace!(
            first = self.range.first,
            last = self.range.last,
            num = self.range.num,
            stable,
            total,
            "FlowLayout::reflow"
        );

        if self.emitted_size != Some(total) {
            self.emitted_size = Some(total);
            emit(LayoutFact::SizeChanged { extent: total });
        }
        if self.emitted_range != Some(change) {
            self.emitted_range = Some(change);
            emit(LayoutFact::RangeChanged(change));
        }
        let positions = self.collect_positions();
        if !positions.is_empty() {
            emit(LayoutFact::PositionsChanged(positions));
        }
        if shift != 0.0 {
            let (dx, dy) = match self.options.direction {
                Direction::Vertical => (0.0, shift),
                Direction::Horizontal => (shift, 0.0),
            };
            emit(LayoutFact::ScrollError { dx, dy });
        }
    }

    fn settle(&mut self) {
        if let Some(prev) = self.emitted_range {
            if !prev.stable {
                self.mark_pending(false);
            }
        }
    }

    fn invalidate(&mut self) {
        vdebug!(
            total_items = self.options.total_items,
            "FlowLayout::invalidate"
        );
        self.rebuild_estimates();
        self.mark_pending(false);
    }

    fn scroll_to_index(&mut self, index: usize, align: Align) {
        let count = self.options.total_items;
        assert!(
            index < count,
            "scroll_to_index: index {index} out of bounds (total_items={count})"
        );
        self.pinned = Some(Pin::Index(index, align));
        self.mark_pending(false);
    }

    fn restore_anchor(&mut self, anchor: Anchor) {
        let count = self.options.total_items;
        assert!(
            anchor.index < count,
            "restore_anchor: index {} out of bounds (total_items={count})",
            anchor.index
        );
        self.pinned = Some(Pin::Anchor(anchor));
        self.mark_pending(false);
    }

    fn needs_reflow(&self) -> bool {
        self.pending
    }

    fn direction(&self) -> Direction {
        self.options.direction
    }

    fn range(&self) -> Range {
        self.range
    }

    fn total_extent(&self) -> f64 {
        self.sums.total()
    }

    fn scroll_position(&self) -> f64 {
        self.scroll
    }

    fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    fn item_offset(&self, index: usize) -> Option<f64> {
        let extent = self.extents.get(index)?;
        Some(self.sums.prefix_sum(index) + extent.margin_start)
    }

    fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        core::mem::take(&mut self.diagnostics)
    }
}
