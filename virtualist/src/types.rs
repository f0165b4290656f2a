use alloc::vec::Vec;

/// The scroll axis of a list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Start,
    Center,
    End,
    Auto,
}

/// The contiguous window of item indexes that is materialized.
///
/// `last` is inclusive. The empty range has `num == 0` and is only produced for empty lists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub first: usize,
    pub last: usize,
    pub num: usize,
}

impl Range {
    pub const EMPTY: Range = Range {
        first: 0,
        last: 0,
        num: 0,
    };

    /// Builds a range from `first` and `num`. A zero `num` yields [`Range::EMPTY`].
    pub fn new(first: usize, num: usize) -> Self {
        if num == 0 {
            return Self::EMPTY;
        }
        Self {
            first,
            last: first + num - 1,
            num,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.num > 0 && index >= self.first && index <= self.last
    }

    /// Exclusive end index.
    pub fn end(&self) -> usize {
        self.first + self.num
    }

    pub fn indexes(&self) -> core::ops::Range<usize> {
        self.first..self.end()
    }

    pub(crate) fn overlaps(&self, other: &Range) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.first <= other.last
            && other.first <= self.last
    }
}

/// Size of one item: `primary` along the scroll axis, `secondary` across it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extent {
    pub primary: f64,
    pub secondary: f64,
    pub margin_start: f64,
    pub margin_end: f64,
}

impl Extent {
    pub fn new(primary: f64) -> Self {
        Self {
            primary,
            ..Self::default()
        }
    }

    pub fn with_margins(mut self, margin_start: f64, margin_end: f64) -> Self {
        self.margin_start = margin_start;
        self.margin_end = margin_end;
        self
    }

    /// Space the item occupies along the scroll axis, margins included.
    pub fn span(&self) -> f64 {
        self.margin_start + self.primary + self.margin_end
    }

    pub(crate) fn is_valid(&self) -> bool {
        [
            self.primary,
            self.secondary,
            self.margin_start,
            self.margin_end,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
    }

    pub(crate) fn first_invalid(&self) -> f64 {
        [
            self.primary,
            self.secondary,
            self.margin_start,
            self.margin_end,
        ]
        .into_iter()
        .find(|v| !v.is_finite() || *v < 0.0)
        .unwrap_or(self.primary)
    }
}

/// The item/offset pair kept visually stationary across recomputation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Anchor {
    pub index: usize,
    /// Distance from the anchor item's start to the scroll position.
    pub offset: f64,
}

/// A two-dimensional position, used when translating scroll-axis offsets for hosts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub left: f64,
    pub top: f64,
}

impl Position {
    pub fn along(direction: Direction, offset: f64) -> Self {
        match direction {
            Direction::Vertical => Self {
                left: 0.0,
                top: offset,
            },
            Direction::Horizontal => Self {
                left: offset,
                top: 0.0,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeChange {
    pub range: Range,
    /// `false` while the range is shifting because of scrolling.
    pub stable: bool,
}

/// A fact produced by a reflow. Facts are emitted in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutFact {
    SizeChanged { extent: f64 },
    RangeChanged(RangeChange),
    PositionsChanged(Vec<(usize, f64)>),
    ScrollError { dx: f64, dy: f64 },
}

/// A non-fatal problem with numeric input. The offending value is ignored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Diagnostic {
    InvalidExtent { index: usize, value: f64 },
    InvalidScroll { value: f64 },
    InvalidViewport { value: f64 },
    InvalidOverhang { value: f64 },
}

pub type ItemKey = u64;
