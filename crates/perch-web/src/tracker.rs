#![forbid(unsafe_code)]

//! Selection and focus tracking.
//!
//! [`InteractionContext`] is the only place the controller records which
//! editable element the user last selected in, which panel is the current
//! selection toolbar, and where the last context menu opened. Fields change
//! only through the setters below so every mutation is logged.

use perch_core::{NodeId, Position};
use perch_widgets::PanelId;

/// Trim whitespace, then strip leading and trailing runs of `-`.
///
/// An empty result means "no usable selection".
pub fn normalize_selection(text: &str) -> &str {
    text.trim().trim_matches('-')
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionContext {
    focused_input: Option<NodeId>,
    toolbar: Option<PanelId>,
    touch_selection: String,
    menu_position: Option<Position>,
}

impl InteractionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Editable element the current selection was made in.
    #[must_use]
    pub const fn focused_input(&self) -> Option<NodeId> {
        self.focused_input
    }

    pub fn set_focused_input(&mut self, node: NodeId) {
        if self.focused_input != Some(node) {
            tracing::trace!(message = "tracker.focused_input", node = node.0);
        }
        self.focused_input = Some(node);
    }

    pub fn clear_focused_input(&mut self) {
        if self.focused_input.take().is_some() {
            tracing::trace!(message = "tracker.focused_input_cleared");
        }
    }

    /// Panel of the most recent selection toolbar.
    #[must_use]
    pub const fn toolbar(&self) -> Option<PanelId> {
        self.toolbar
    }

    pub fn set_toolbar(&mut self, panel: PanelId) {
        self.toolbar = Some(panel);
    }

    /// Forget the toolbar if it is `panel`.
    pub fn clear_toolbar(&mut self, panel: PanelId) {
        if self.toolbar == Some(panel) {
            self.toolbar = None;
        }
    }

    /// Last non-empty selection reported by `selectionchange`.
    pub fn touch_selection(&self) -> &str {
        &self.touch_selection
    }

    /// Empty strings are ignored so lifting a finger keeps the last text.
    pub fn set_touch_selection(&mut self, text: &str) {
        if !text.is_empty() {
            self.touch_selection.clear();
            self.touch_selection.push_str(text);
        }
    }

    /// Client position of the last `contextmenu` event.
    #[must_use]
    pub const fn menu_position(&self) -> Option<Position> {
        self.menu_position
    }

    pub fn set_menu_position(&mut self, client: Position) {
        self.menu_position = Some(client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_whitespace_and_dashes() {
        assert_eq!(normalize_selection("  --hello world-- \n"), "hello world");
        assert_eq!(normalize_selection("a-b"), "a-b");
        assert_eq!(normalize_selection(" - "), "");
        assert_eq!(normalize_selection("- x -"), " x ");
        assert_eq!(normalize_selection("---"), "");
        assert_eq!(normalize_selection(""), "");
    }

    #[test]
    fn touch_selection_ignores_empty_updates() {
        let mut ctx = InteractionContext::new();
        ctx.set_touch_selection("first");
        ctx.set_touch_selection("");
        assert_eq!(ctx.touch_selection(), "first");
        ctx.set_touch_selection("second");
        assert_eq!(ctx.touch_selection(), "second");
    }

    #[test]
    fn clear_toolbar_only_matches_current() {
        let mut ctx = InteractionContext::new();
        ctx.set_toolbar(PanelId::new(1));
        ctx.clear_toolbar(PanelId::new(2));
        assert_eq!(ctx.toolbar(), Some(PanelId::new(1)));
        ctx.clear_toolbar(PanelId::new(1));
        assert_eq!(ctx.toolbar(), None);
    }

    #[test]
    fn focused_input_round_trip() {
        let mut ctx = InteractionContext::new();
        ctx.set_focused_input(NodeId(4));
        assert_eq!(ctx.focused_input(), Some(NodeId(4)));
        ctx.clear_focused_input();
        assert_eq!(ctx.focused_input(), None);
    }
}
