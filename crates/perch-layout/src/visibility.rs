#![forbid(unsafe_code)]

//! Keeping a panel inside the visible page.
//!
//! The clamp is deliberately asymmetric: the top-left minimums keep the panel
//! clear of a site header, the right edge pulls the panel back by a fixed
//! inset, and the bottom edge is measured against the full document height
//! rather than the viewport.

use perch_core::geometry::{PageMetrics, Position};

/// Default panel width used for clamping.
pub const PANEL_WIDTH: f64 = 420.0;
/// Default panel height used for clamping.
pub const PANEL_HEIGHT: f64 = 250.0;
/// Smallest allowed `x`.
pub const MIN_LEFT: f64 = 100.0;
/// Smallest allowed `y`.
pub const MIN_TOP: f64 = 180.0;
/// `x` becomes `viewport_width - RIGHT_INSET` when the right edge overflows.
pub const RIGHT_INSET: f64 = 340.0;
/// Gap kept below the panel when the bottom edge overflows the document.
pub const BOTTOM_MARGIN: f64 = 10.0;
/// Gap between a toolbar and the right window edge after first paint.
pub const TOOLBAR_RIGHT_GAP: f64 = 30.0;

/// Window width is clamped into this range before sizing a conversation.
pub const WINDOW_WIDTH_CLAMP: (f64, f64) = (750.0, 1500.0);
/// Share of the clamped window width a conversation panel starts at.
pub const WIDTH_FACTOR_OF_SCREEN: f64 = 0.45;

/// Fixed panel box the clamp reasons about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelBox {
    pub width: f64,
    pub height: f64,
    pub right_inset: f64,
}

impl PanelBox {
    pub const DEFAULT: Self = Self {
        width: PANEL_WIDTH,
        height: PANEL_HEIGHT,
        right_inset: RIGHT_INSET,
    };
}

impl Default for PanelBox {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Clamp `position` for the default 420x250 panel.
pub fn ensure_visibility(position: Position, metrics: &PageMetrics) -> Position {
    ensure_visibility_with(position, metrics, PanelBox::DEFAULT)
}

/// Clamp `position` so `panel` stays on the page.
///
/// Rules, applied in order:
/// 1. `x >= 100`, `y >= 180`;
/// 2. right edge past the viewport: `x = viewport_width - right_inset`;
/// 3. bottom edge past the document: `y = document_height - height - 10`.
///
/// The bottom rule wins over the top minimum on documents shorter than
/// `180 + height + 10`. Applying the clamp twice yields the same result.
pub fn ensure_visibility_with(
    position: Position,
    metrics: &PageMetrics,
    panel: PanelBox,
) -> Position {
    let mut out = position;
    if out.x < MIN_LEFT {
        out.x = MIN_LEFT;
    }
    if out.y < MIN_TOP {
        out.y = MIN_TOP;
    }

    let viewport_width = metrics.viewport_width;
    if out.x + panel.width > viewport_width {
        out.x = viewport_width - panel.right_inset;
    }

    let document_height = metrics.document_height();
    if out.y + panel.height > document_height {
        out.y = document_height - panel.height - BOTTOM_MARGIN;
    }
    out
}

/// Post-paint `left` for a toolbar whose rendered width is now known.
pub fn toolbar_left(x: f64, window_width: f64, offset_width: f64) -> f64 {
    (window_width - offset_width - TOOLBAR_RIGHT_GAP)
        .max(0.0)
        .min(x.max(0.0))
}

/// Starting (and minimum) width of a conversation panel.
pub fn conversation_min_width(window_width: f64) -> f64 {
    let (lo, hi) = WINDOW_WIDTH_CLAMP;
    window_width.clamp(lo, hi) * WIDTH_FACTOR_OF_SCREEN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(width: f64, doc_height: f64) -> PageMetrics {
        PageMetrics::viewport(width, 800.0).with_document_height(doc_height)
    }

    #[test]
    fn right_overflow_uses_fixed_inset() {
        let out = ensure_visibility(Position::new(950.0, 200.0), &metrics(1000.0, 2000.0));
        assert_eq!(out, Position::new(660.0, 200.0));
    }

    #[test]
    fn top_left_minimums() {
        let out = ensure_visibility(Position::new(0.0, 0.0), &metrics(1200.0, 2000.0));
        assert_eq!(out, Position::new(100.0, 180.0));
    }

    #[test]
    fn bottom_overflow_keeps_margin() {
        let out = ensure_visibility(Position::new(300.0, 1900.0), &metrics(1200.0, 2000.0));
        assert_eq!(out.y, 2000.0 - 250.0 - 10.0);
    }

    #[test]
    fn in_bounds_position_untouched() {
        let p = Position::new(400.0, 500.0);
        assert_eq!(ensure_visibility(p, &metrics(1200.0, 2000.0)), p);
    }

    #[test]
    fn short_document_bottom_rule_wins() {
        let out = ensure_visibility(Position::new(300.0, 0.0), &metrics(1200.0, 300.0));
        assert_eq!(out.y, 40.0);
        assert_eq!(ensure_visibility(out, &metrics(1200.0, 300.0)), out);
    }

    #[test]
    fn custom_box_dimensions() {
        let panel = PanelBox {
            width: 200.0,
            height: 100.0,
            right_inset: 200.0,
        };
        let out = ensure_visibility_with(Position::new(900.0, 950.0), &metrics(1000.0, 1000.0), panel);
        assert_eq!(out, Position::new(800.0, 890.0));
    }

    #[test]
    fn toolbar_left_clamps_to_window() {
        assert_eq!(toolbar_left(900.0, 1000.0, 200.0), 770.0);
        assert_eq!(toolbar_left(300.0, 1000.0, 200.0), 300.0);
        assert_eq!(toolbar_left(-20.0, 1000.0, 200.0), 0.0);
        assert_eq!(toolbar_left(50.0, 100.0, 200.0), 0.0);
    }

    #[test]
    fn conversation_width_clamps_window() {
        assert_eq!(conversation_min_width(600.0), 750.0 * 0.45);
        assert_eq!(conversation_min_width(1000.0), 1000.0 * 0.45);
        assert_eq!(conversation_min_width(4000.0), 1500.0 * 0.45);
    }
}
