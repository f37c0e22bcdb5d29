#![forbid(unsafe_code)]

//! Panel placement engine.
//!
//! ```text
//! Idle -> Positioning -> Committed <-> Dragging
//! ```
//!
//! The committed position only changes on mount, on an explicit relocation,
//! on drag end and on [`PanelPlacement::update`]. While dragging, movement
//! accumulates in a virtual offset so no layout is read mid-gesture.

use perch_core::geometry::{PageMetrics, Position, Rect, ScrollOffset, element_position};
use serde::{Deserialize, Serialize};

use crate::visibility::{PanelBox, conversation_min_width, ensure_visibility_with};

/// Offset subtracted from the toolbar position when it grows into an
/// ask/reply conversation.
pub const CONVERSATION_GROW_OFFSET: Position = Position::new(250.0, 100.0);
/// Horizontal shift applied when a tool click expands the toolbar.
pub const TOOL_EXPAND_SHIFT_X: f64 = 200.0;
/// Vertical gap between the pointer and a freshly opened toolbar.
pub const POINTER_TOOLBAR_GAP_Y: f64 = 20.0;
/// Touch toolbars open this far right of and below the touch point.
pub const TOUCH_TOOLBAR_OFFSET: Position = Position::new(20.0, 20.0);
/// Keyboard-selection toolbars open this far left of the input's right edge.
pub const KEYBOARD_TOOLBAR_INSET_X: f64 = 400.0;
/// ... and this far above its top edge.
pub const KEYBOARD_TOOLBAR_RAISE_Y: f64 = 20.0;

/// Where a panel's initial position is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Anchor {
    /// Raw pointer coordinates in page space.
    Pointer(Position),
    /// Viewport-relative bounding box of a resolved element.
    Element(Rect),
}

impl Anchor {
    /// Page position of the anchor.
    pub fn page_position(&self, scroll: ScrollOffset) -> Position {
        match *self {
            Self::Pointer(p) => p,
            Self::Element(rect) => element_position(rect, scroll, true),
        }
    }
}

/// Placement lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPhase {
    #[default]
    Idle,
    Positioning,
    Committed,
    Dragging,
}

/// Committed position, drag offset and width of one panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelPlacement {
    phase: PlacementPhase,
    committed: Position,
    virtual_offset: Position,
    width: f64,
    min_width: f64,
    #[serde(skip, default = "PanelPlacement::default_box")]
    panel_box: PanelBox,
}

impl Default for PanelPlacement {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelPlacement {
    fn default_box() -> PanelBox {
        PanelBox::DEFAULT
    }

    /// An unmounted placement.
    pub const fn new() -> Self {
        Self {
            phase: PlacementPhase::Idle,
            committed: Position::ZERO,
            virtual_offset: Position::ZERO,
            width: 0.0,
            min_width: 0.0,
            panel_box: PanelBox::DEFAULT,
        }
    }

    /// Use a non-default clamp box.
    #[must_use]
    pub const fn with_panel_box(mut self, panel_box: PanelBox) -> Self {
        self.panel_box = panel_box;
        self
    }

    #[must_use]
    pub const fn phase(&self) -> PlacementPhase {
        self.phase
    }

    #[must_use]
    pub const fn committed(&self) -> Position {
        self.committed
    }

    #[must_use]
    pub const fn virtual_offset(&self) -> Position {
        self.virtual_offset
    }

    /// Where the panel is drawn right now: committed plus drag offset.
    #[must_use]
    pub fn rendered(&self) -> Position {
        self.committed + self.virtual_offset
    }

    /// Current conversation width.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Idle -> Positioning: clamp the anchor's page position and adopt it.
    pub fn mount(&mut self, position: Position, metrics: &PageMetrics) -> Position {
        let clamped = ensure_visibility_with(position, metrics, self.panel_box);
        self.mount_exact(clamped, metrics)
    }

    /// Idle -> Positioning at an already-final position.
    ///
    /// For hosts that created the container themselves; the position is
    /// adopted as-is.
    pub fn mount_exact(&mut self, position: Position, metrics: &PageMetrics) -> Position {
        self.committed = position;
        self.virtual_offset = Position::ZERO;
        self.min_width = conversation_min_width(metrics.viewport_width);
        self.width = self.min_width;
        self.phase = PlacementPhase::Positioning;
        tracing::debug!(
            message = "placement.mount",
            x = position.x,
            y = position.y
        );
        position
    }

    /// Positioning -> Committed once the host has applied the style.
    pub fn settle(&mut self) {
        if self.phase == PlacementPhase::Positioning {
            self.phase = PlacementPhase::Committed;
        }
    }

    /// Committed -> Dragging. Returns `false` for an unmounted panel.
    pub fn begin_drag(&mut self) -> bool {
        match self.phase {
            PlacementPhase::Idle => false,
            PlacementPhase::Dragging => true,
            PlacementPhase::Positioning | PlacementPhase::Committed => {
                self.phase = PlacementPhase::Dragging;
                self.virtual_offset = Position::ZERO;
                true
            }
        }
    }

    /// Accumulate one drag delta. Ignored outside a drag.
    pub fn on_drag_delta(&mut self, dx: f64, dy: f64) {
        if self.phase == PlacementPhase::Dragging {
            self.virtual_offset = self.virtual_offset.offset(dx, dy);
        }
    }

    /// Dragging -> Committed: fold the offset into the committed position.
    pub fn on_drag_end(&mut self) -> Position {
        if self.phase == PlacementPhase::Dragging {
            self.committed = self.committed + self.virtual_offset;
            self.virtual_offset = Position::ZERO;
            self.phase = PlacementPhase::Committed;
            tracing::debug!(
                message = "placement.drag_commit",
                x = self.committed.x,
                y = self.committed.y
            );
        }
        self.committed
    }

    /// Re-apply the visibility clamp to the committed position.
    ///
    /// Returns the new position when the panel moved. Skipped while a drag is
    /// in progress or before mount. Idempotent.
    pub fn update(&mut self, metrics: &PageMetrics) -> Option<Position> {
        if matches!(self.phase, PlacementPhase::Idle | PlacementPhase::Dragging) {
            return None;
        }
        let clamped = ensure_visibility_with(self.committed, metrics, self.panel_box);
        if clamped == self.committed {
            return None;
        }
        self.committed = clamped;
        Some(clamped)
    }

    /// Move to `position` (clamped) outside of a drag, e.g. when a toolbar
    /// expands into a conversation.
    pub fn relocate(&mut self, position: Position, metrics: &PageMetrics) -> Position {
        if self.phase == PlacementPhase::Dragging {
            self.on_drag_end();
        }
        let clamped = ensure_visibility_with(position, metrics, self.panel_box);
        self.committed = clamped;
        self.virtual_offset = Position::ZERO;
        if self.phase == PlacementPhase::Idle {
            self.phase = PlacementPhase::Positioning;
        }
        clamped
    }

    /// Post-paint horizontal correction once the rendered width is known.
    /// Adopted as-is; the visibility clamp is not re-run.
    pub fn set_left(&mut self, x: f64) {
        self.committed.x = x;
    }

    /// Apply a resize from the side handles, never below the minimum width.
    pub fn on_resize(&mut self, new_width: f64) -> f64 {
        self.width = new_width.max(self.min_width);
        self.width
    }
}

/// Ask/reply placement: grow from the trigger container's page position.
pub fn conversation_grow_position(container_page: Position) -> Position {
    container_page - CONVERSATION_GROW_OFFSET
}

/// Tool-click placement: container position shifted left.
pub fn tool_expand_position(container: Position) -> Position {
    container.offset(-TOOL_EXPAND_SHIFT_X, 0.0)
}

/// Keyboard-selection toolbar position next to the focused input.
pub fn keyboard_toolbar_position(input_page: Position, input_width: f64) -> Position {
    Position::new(
        input_page.x + input_width - KEYBOARD_TOOLBAR_INSET_X,
        input_page.y - KEYBOARD_TOOLBAR_RAISE_Y,
    )
}

/// Static card position: right side, vertically centred-ish.
pub fn static_card_position(metrics: &PageMetrics) -> Position {
    let w = metrics.viewport_width;
    Position::new(
        w - 300.0 - (0.2 * w).floor(),
        metrics.viewport_height / 2.0 - 200.0,
    )
}

/// Centred default for context-menu panels without a menu position.
pub fn centered_menu_position(metrics: &PageMetrics) -> Position {
    Position::new(
        metrics.viewport_width / 2.0 - 300.0,
        metrics.viewport_height / 2.0 - 200.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metrics() -> PageMetrics {
        PageMetrics::viewport(1200.0, 800.0).with_document_height(3000.0)
    }

    #[test]
    fn mount_clamps_and_enters_positioning() {
        let mut p = PanelPlacement::new();
        let at = p.mount(Position::new(10.0, 10.0), &metrics());
        assert_eq!(at, Position::new(100.0, 180.0));
        assert_eq!(p.phase(), PlacementPhase::Positioning);
        p.settle();
        assert_eq!(p.phase(), PlacementPhase::Committed);
    }

    #[test]
    fn drag_folds_offset_on_end() {
        let mut p = PanelPlacement::new();
        p.mount(Position::new(400.0, 400.0), &metrics());
        p.settle();
        assert!(p.begin_drag());
        p.on_drag_delta(10.0, -5.0);
        p.on_drag_delta(3.0, 2.0);
        assert_eq!(p.committed(), Position::new(400.0, 400.0));
        assert_eq!(p.rendered(), Position::new(413.0, 397.0));
        assert_eq!(p.on_drag_end(), Position::new(413.0, 397.0));
        assert!(p.virtual_offset().is_zero());
        assert_eq!(p.phase(), PlacementPhase::Committed);
    }

    #[test]
    fn delta_outside_drag_is_ignored() {
        let mut p = PanelPlacement::new();
        p.mount(Position::new(400.0, 400.0), &metrics());
        p.on_drag_delta(50.0, 50.0);
        assert!(p.virtual_offset().is_zero());
    }

    #[test]
    fn unmounted_panel_cannot_drag() {
        let mut p = PanelPlacement::new();
        assert!(!p.begin_drag());
        assert_eq!(p.update(&metrics()), None);
    }

    #[test]
    fn update_moves_once_then_stays() {
        let mut p = PanelPlacement::new();
        p.mount(Position::new(400.0, 400.0), &metrics());
        p.settle();
        p.begin_drag();
        p.on_drag_delta(-1000.0, 0.0);
        p.on_drag_end();
        assert_eq!(p.committed().x, -600.0);
        assert_eq!(p.update(&metrics()), Some(Position::new(100.0, 400.0)));
        assert_eq!(p.update(&metrics()), None);
    }

    #[test]
    fn update_skipped_while_dragging() {
        let mut p = PanelPlacement::new();
        p.mount(Position::new(400.0, 400.0), &metrics());
        p.begin_drag();
        p.on_drag_delta(-1000.0, 0.0);
        assert_eq!(p.update(&metrics()), None);
    }

    #[test]
    fn relocate_mid_drag_commits_first() {
        let mut p = PanelPlacement::new();
        p.mount(Position::new(400.0, 400.0), &metrics());
        p.begin_drag();
        p.on_drag_delta(5.0, 5.0);
        let at = p.relocate(Position::new(600.0, 600.0), &metrics());
        assert_eq!(at, Position::new(600.0, 600.0));
        assert_eq!(p.phase(), PlacementPhase::Committed);
        assert!(p.virtual_offset().is_zero());
    }

    #[test]
    fn resize_respects_minimum() {
        let mut p = PanelPlacement::new();
        p.mount(Position::new(400.0, 400.0), &metrics());
        let min = p.width();
        assert_eq!(min, 1200.0 * 0.45);
        assert_eq!(p.on_resize(100.0), min);
        assert_eq!(p.on_resize(900.0), 900.0);
    }

    #[test]
    fn helper_positions() {
        assert_eq!(
            conversation_grow_position(Position::new(600.0, 500.0)),
            Position::new(350.0, 400.0)
        );
        assert_eq!(
            tool_expand_position(Position::new(600.0, 500.0)),
            Position::new(400.0, 500.0)
        );
        assert_eq!(
            keyboard_toolbar_position(Position::new(100.0, 300.0), 600.0),
            Position::new(300.0, 280.0)
        );
        let m = PageMetrics::viewport(1000.0, 800.0);
        assert_eq!(static_card_position(&m), Position::new(500.0, 200.0));
        assert_eq!(centered_menu_position(&m), Position::new(200.0, 200.0));
    }

    #[test]
    fn narrow_panel_box_clamps_later() {
        let narrow = PanelBox {
            width: 200.0,
            height: 100.0,
            right_inset: 150.0,
        };
        let mut p = PanelPlacement::new().with_panel_box(narrow);
        assert_eq!(
            p.mount(Position::new(900.0, 400.0), &metrics()),
            Position::new(900.0, 400.0)
        );
        let mut wide = PanelPlacement::new();
        assert_eq!(
            wide.mount(Position::new(900.0, 400.0), &metrics()),
            Position::new(860.0, 400.0)
        );
    }

    #[test]
    fn element_anchor_adds_scroll() {
        let anchor = Anchor::Element(Rect::new(50.0, 60.0, 10.0, 10.0));
        assert_eq!(
            anchor.page_position(ScrollOffset::new(0.0, 100.0)),
            Position::new(50.0, 160.0)
        );
    }
}
