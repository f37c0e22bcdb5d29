#![forbid(unsafe_code)]

//! Mutually exclusive overlays inside one panel.
//!
//! A panel shows at most one overlay at a time. Every open goes through
//! [`OverlayState::set_active`], which closes whatever was showing, so the
//! exclusivity rule lives in one place instead of being re-stated at every
//! call site.
//!
//! The reply flow is the one two-step overlay: hovering the reply button
//! shows [`OverlayKind::ReplyOptions`]; choosing email or chat hands off to
//! [`OverlayKind::ReplyContext`] and remembers the chosen [`ReplyKind`].

use serde::{Deserialize, Serialize};

/// Overlays a panel can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    AskInput,
    ModelSelect,
    ReplyOptions,
    ReplyContext,
    TemplateList,
    AddTemplate,
    HiddenTools,
}

impl OverlayKind {
    pub const ALL: [Self; 7] = [
        Self::AskInput,
        Self::ModelSelect,
        Self::ReplyOptions,
        Self::ReplyContext,
        Self::TemplateList,
        Self::AddTemplate,
        Self::HiddenTools,
    ];

    /// Stable name used in log records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AskInput => "ask_input",
            Self::ModelSelect => "model_select",
            Self::ReplyOptions => "reply_options",
            Self::ReplyContext => "reply_context",
            Self::TemplateList => "template_list",
            Self::AddTemplate => "add_template",
            Self::HiddenTools => "hidden_tools",
        }
    }

    /// Overlays whose popup textarea takes focus when opened.
    pub const fn focuses_textarea(self) -> bool {
        matches!(self, Self::AskInput | Self::ReplyContext)
    }
}

/// Reply style chosen in the reply options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Email,
    Chat,
}

/// Result of one overlay transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTransition {
    pub transition_id: u64,
    pub from: Option<OverlayKind>,
    pub to: Option<OverlayKind>,
}

impl OverlayTransition {
    /// Whether the visible overlay changed.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    /// The overlay that became visible, if any.
    pub fn opened(&self) -> Option<OverlayKind> {
        if self.changed() { self.to } else { None }
    }
}

/// Which overlay of one panel is visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayState {
    active: Option<OverlayKind>,
    reply_kind: Option<ReplyKind>,
    transition_counter: u64,
}

impl OverlayState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn active(&self) -> Option<OverlayKind> {
        self.active
    }

    #[must_use]
    pub fn is_visible(&self, kind: OverlayKind) -> bool {
        self.active == Some(kind)
    }

    /// Reply style remembered by the reply hand-off.
    #[must_use]
    pub const fn reply_kind(&self) -> Option<ReplyKind> {
        self.reply_kind
    }

    /// The tool row and drag handle are hidden while templates are shown.
    #[must_use]
    pub fn hides_tool_row(&self) -> bool {
        matches!(
            self.active,
            Some(OverlayKind::TemplateList | OverlayKind::AddTemplate)
        )
    }

    /// Close every sibling and show `kind` (or nothing).
    pub fn set_active(&mut self, kind: Option<OverlayKind>) -> OverlayTransition {
        let from = self.active;
        if kind != Some(OverlayKind::ReplyContext) {
            self.reply_kind = None;
        }
        self.active = kind;
        self.transition_counter = self.transition_counter.saturating_add(1);
        let transition = OverlayTransition {
            transition_id: self.transition_counter,
            from,
            to: kind,
        };
        if transition.changed() {
            tracing::debug!(
                message = "overlay.transition",
                from = from.map(OverlayKind::as_str),
                to = kind.map(OverlayKind::as_str),
                transition_id = transition.transition_id
            );
        }
        transition
    }

    /// Show `kind`, or close it if it is already showing.
    pub fn toggle(&mut self, kind: OverlayKind) -> OverlayTransition {
        if self.is_visible(kind) {
            self.set_active(None)
        } else {
            self.set_active(Some(kind))
        }
    }

    /// Close `kind` if it is the visible overlay.
    pub fn close(&mut self, kind: OverlayKind) -> Option<OverlayTransition> {
        self.is_visible(kind).then(|| self.set_active(None))
    }

    pub fn close_all(&mut self) -> OverlayTransition {
        self.set_active(None)
    }

    /// Reply options -> reply context hand-off.
    pub fn choose_reply(&mut self, kind: ReplyKind) -> OverlayTransition {
        let transition = self.set_active(Some(OverlayKind::ReplyContext));
        self.reply_kind = Some(kind);
        transition
    }

    /// Pointer entered the hidden-tools trigger.
    ///
    /// Opens the flyout unless the reply context box is showing; the context
    /// box keeps the panel while the user is typing into it.
    pub fn hover_hidden_tools(&mut self) -> Option<OverlayTransition> {
        if self.is_visible(OverlayKind::ReplyContext) {
            return None;
        }
        Some(self.set_active(Some(OverlayKind::HiddenTools)))
    }

    /// Pointer entered the reply button.
    pub fn hover_reply(&mut self) -> Option<OverlayTransition> {
        if self.is_visible(OverlayKind::ReplyContext) {
            return None;
        }
        Some(self.set_active(Some(OverlayKind::ReplyOptions)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_one_closes_the_rest() {
        let mut state = OverlayState::new();
        state.set_active(Some(OverlayKind::AskInput));
        state.set_active(Some(OverlayKind::ModelSelect));
        for kind in OverlayKind::ALL {
            assert_eq!(state.is_visible(kind), kind == OverlayKind::ModelSelect);
        }
    }

    #[test]
    fn toggle_twice_closes() {
        let mut state = OverlayState::new();
        assert_eq!(
            state.toggle(OverlayKind::AskInput).opened(),
            Some(OverlayKind::AskInput)
        );
        let t = state.toggle(OverlayKind::AskInput);
        assert_eq!(t.to, None);
        assert_eq!(state.active(), None);
    }

    #[test]
    fn reply_hand_off_keeps_kind() {
        let mut state = OverlayState::new();
        state.hover_reply();
        assert!(state.is_visible(OverlayKind::ReplyOptions));
        state.choose_reply(ReplyKind::Email);
        assert!(state.is_visible(OverlayKind::ReplyContext));
        assert!(!state.is_visible(OverlayKind::ReplyOptions));
        assert_eq!(state.reply_kind(), Some(ReplyKind::Email));
    }

    #[test]
    fn reply_context_survives_hover_elsewhere() {
        let mut state = OverlayState::new();
        state.choose_reply(ReplyKind::Chat);
        assert_eq!(state.hover_hidden_tools(), None);
        assert_eq!(state.hover_reply(), None);
        assert!(state.is_visible(OverlayKind::ReplyContext));
    }

    #[test]
    fn leaving_reply_context_forgets_kind() {
        let mut state = OverlayState::new();
        state.choose_reply(ReplyKind::Chat);
        state.set_active(Some(OverlayKind::AskInput));
        assert_eq!(state.reply_kind(), None);
    }

    #[test]
    fn hidden_tools_hover_closes_model_popup() {
        let mut state = OverlayState::new();
        state.toggle(OverlayKind::ModelSelect);
        state.hover_hidden_tools();
        assert_eq!(state.active(), Some(OverlayKind::HiddenTools));
    }

    #[test]
    fn close_only_affects_visible_kind() {
        let mut state = OverlayState::new();
        state.set_active(Some(OverlayKind::TemplateList));
        assert!(state.hides_tool_row());
        assert!(state.close(OverlayKind::AskInput).is_none());
        assert!(state.close(OverlayKind::TemplateList).is_some());
        assert!(!state.hides_tool_row());
    }
}
