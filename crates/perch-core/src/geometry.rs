#![forbid(unsafe_code)]

//! Geometric primitives in CSS pixel space.
//!
//! All values are `f64` CSS pixels. [`Position`] is in page (document)
//! coordinates unless a call site says otherwise; [`Rect`] is whatever the
//! host measured, which for `getBoundingClientRect()` means viewport
//! coordinates.

use serde::{Deserialize, Serialize};

/// A point in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Origin, also the resting value of a drag offset.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new position.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by a delta.
    #[inline]
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Whether both components are exactly zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle, as reported by `getBoundingClientRect()`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: f64,
    /// Top edge (inclusive).
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle at `origin` with the given size.
    #[inline]
    pub const fn from_origin(origin: Position, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Top-left corner.
    #[inline]
    pub const fn origin(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(&self, point: Position) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Translate the rectangle without changing its size.
    #[inline]
    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Window scroll offsets (`scrollX` / `scrollY`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

impl ScrollOffset {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The three height measurements a layout engine reports for one element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementHeights {
    pub scroll: f64,
    pub offset: f64,
    pub client: f64,
}

impl ElementHeights {
    /// All three measurements equal to `height`.
    pub const fn uniform(height: f64) -> Self {
        Self {
            scroll: height,
            offset: height,
            client: height,
        }
    }

    fn max(&self) -> f64 {
        self.scroll.max(self.offset).max(self.client)
    }
}

/// Live layout metrics of the page, pushed by the host before each dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    /// `window.innerWidth` (falls back to `documentElement.clientWidth`).
    pub viewport_width: f64,
    /// `window.innerHeight`.
    pub viewport_height: f64,
    pub scroll: ScrollOffset,
    pub body: ElementHeights,
    pub document_element: ElementHeights,
}

impl PageMetrics {
    /// Metrics for an unscrolled page whose document is exactly the viewport.
    pub const fn viewport(width: f64, height: f64) -> Self {
        Self {
            viewport_width: width,
            viewport_height: height,
            scroll: ScrollOffset::new(0.0, 0.0),
            body: ElementHeights::uniform(height),
            document_element: ElementHeights::uniform(height),
        }
    }

    /// Override the document height reported by both root elements.
    #[must_use]
    pub const fn with_document_height(mut self, height: f64) -> Self {
        self.body = ElementHeights::uniform(height);
        self.document_element = ElementHeights::uniform(height);
        self
    }

    /// Override the scroll offsets.
    #[must_use]
    pub const fn with_scroll(mut self, x: f64, y: f64) -> Self {
        self.scroll = ScrollOffset::new(x, y);
        self
    }

    /// Full scrollable document height.
    ///
    /// Engines disagree on which of body/documentElement carries the real
    /// value, so this takes the maximum over all six measurements.
    pub fn document_height(&self) -> f64 {
        self.body.max().max(self.document_element.max())
    }
}

impl Default for PageMetrics {
    fn default() -> Self {
        Self::viewport(1280.0, 800.0)
    }
}

/// Page position of an element's top-left corner.
///
/// `rect` is the viewport-relative bounding box. Pass `include_scroll = true`
/// when the consumer is positioned `absolute` in document flow, `false` when it
/// is `fixed` to the viewport.
#[inline]
pub fn element_position(rect: Rect, scroll: ScrollOffset, include_scroll: bool) -> Position {
    if include_scroll {
        Position::new(rect.x + scroll.x, rect.y + scroll.y)
    } else {
        rect.origin()
    }
}
