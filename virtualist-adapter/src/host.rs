use virtualist::{Direction, Extent, HostError, Position, SlotContainer};

/// An axis-aligned rectangle in the host's screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Where the list's container sits relative to the element that scrolls it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewBounds {
    /// The list container, which is as large as the whole list.
    pub container: Rect,
    /// The visible area of the scrolling element.
    pub scroller: Rect,
}

impl ViewBounds {
    /// Derives `(viewport_extent, scroll_position)` along `direction`.
    ///
    /// The viewport is the part of the scroller the container overlaps, so a container that
    /// starts partway down the scroller, or has been scrolled past it, only gets what is left.
    pub fn viewport(&self, direction: Direction) -> (f64, f64) {
        let (container_start, container_extent, scroller_start, scroller_extent) = match direction {
            Direction::Vertical => (
                self.container.top,
                self.container.height,
                self.scroller.top,
                self.scroller.height,
            ),
            Direction::Horizontal => (
                self.container.left,
                self.container.width,
                self.scroller.left,
                self.scroller.width,
            ),
        };
        let container_end = container_start + container_extent.max(0.0);
        let scroller_end = scroller_start + scroller_extent.max(0.0);
        let extent =
            (scroller_end.min(container_end) - scroller_start.max(container_start)).max(0.0);
        let scroll = (scroller_start - container_start).max(0.0);
        (extent, scroll)
    }

    /// Grows the container to at least `extent` along `direction`.
    ///
    /// The coordinator asks the host for a container as long as the list; a host that has not
    /// applied that yet still reports the old size.
    pub fn with_min_extent(mut self, direction: Direction, extent: f64) -> Self {
        let length = match direction {
            Direction::Vertical => &mut self.container.height,
            Direction::Horizontal => &mut self.container.width,
        };
        *length = length.max(extent);
        self
    }
}

/// A slot's measured box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
}

impl Measurement {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_margins(mut self, top: f64, right: f64, bottom: f64, left: f64) -> Self {
        self.margin_top = top;
        self.margin_right = right;
        self.margin_bottom = bottom;
        self.margin_left = left;
        self
    }

    /// Projects the box onto the scroll axis.
    pub fn extent(&self, direction: Direction) -> Extent {
        match direction {
            Direction::Vertical => Extent {
                primary: self.height,
                secondary: self.width,
                margin_start: self.margin_top,
                margin_end: self.margin_bottom,
            },
            Direction::Horizontal => Extent {
                primary: self.width,
                secondary: self.height,
                margin_start: self.margin_left,
                margin_end: self.margin_right,
            },
        }
    }
}

/// Everything the coordinator needs from the UI layer.
///
/// Slot attachment comes from [`SlotContainer`]; the rest is geometry.
pub trait Host<S>: SlotContainer<S> {
    fn view(&self) -> ViewBounds;

    fn measure(&mut self, slot: &S) -> Result<Measurement, HostError>;

    fn set_position(&mut self, slot: &S, position: Position);

    /// Makes the container at least `extent` long along `direction`.
    fn set_min_extent(&mut self, direction: Direction, extent: f64);

    fn scroll_by(&mut self, dx: f64, dy: f64);
}
