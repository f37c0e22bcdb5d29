#![forbid(unsafe_code)]

//! One floating panel: toolbar mode, conversation mode, docking.
//!
//! `triggered` and `docked` only ever go from `false` to `true` for a given
//! panel; a panel that should look different is replaced by a new one.

use perch_core::{ContainerStyle, CssPosition, NodeId, Position};
use perch_layout::{PanelPlacement, PlacementPhase};
use perch_runtime::{AnswerSource, Session};
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::conversation::Conversation;
use crate::hover::{HoverIntent, HoverRegion};
use crate::overlay::{OverlayKind, OverlayState};
use crate::reply::AskDraft;

/// Class of a selection toolbar container.
pub const TOOLBAR_CONTAINER_CLASS: &str = "chatgptbox-toolbar-container";
/// Class a container switches to once docked.
pub const DOCKED_CONTAINER_CLASS: &str = "chatgptbox-toolbar-container-docked";
/// Class of the static card container; not matched by toolbar queries.
pub const CARD_CONTAINER_CLASS: &str = "chatgptbox-toolbar-container-not-queryable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PanelId(u64);

impl PanelId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// How the panel came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelOrigin {
    /// Pointer, keyboard or touch selection.
    Selection,
    /// Mounted by the host at page load.
    StaticCard,
    /// Context-menu command.
    ContextMenu,
}

/// Snapshot of a panel's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelState {
    pub committed: Position,
    pub virtual_offset: Position,
    pub triggered: bool,
    pub closeable: bool,
    pub docked: bool,
    pub active_overlay: Option<OverlayKind>,
}

/// A mounted panel and everything it owns.
#[derive(Debug)]
pub struct Panel {
    id: PanelId,
    container: NodeId,
    origin: PanelOrigin,
    selection: String,
    triggered: bool,
    closeable: bool,
    docked: bool,
    css_position: CssPosition,
    pub placement: PanelPlacement,
    pub overlay: OverlayState,
    pub hidden_tools_hover: HoverIntent,
    pub reply_hover: HoverIntent,
    pub ask: AskDraft,
    pub reply_context: String,
    conversation: Conversation,
}

impl Panel {
    pub fn new(
        id: PanelId,
        container: NodeId,
        origin: PanelOrigin,
        selection: impl Into<String>,
        session: Session,
        hover_delay: Duration,
    ) -> Self {
        Self {
            id,
            container,
            origin,
            selection: selection.into(),
            triggered: false,
            closeable: false,
            docked: false,
            css_position: CssPosition::Absolute,
            placement: PanelPlacement::new(),
            overlay: OverlayState::new(),
            hidden_tools_hover: HoverIntent::new(HoverRegion::HiddenTools, hover_delay),
            reply_hover: HoverIntent::new(HoverRegion::Reply, hover_delay),
            ask: AskDraft::default(),
            reply_context: String::new(),
            conversation: Conversation::new(session),
        }
    }

    #[must_use]
    pub const fn id(&self) -> PanelId {
        self.id
    }

    #[must_use]
    pub const fn container(&self) -> NodeId {
        self.container
    }

    #[must_use]
    pub const fn origin(&self) -> PanelOrigin {
        self.origin
    }

    pub fn selection(&self) -> &str {
        &self.selection
    }

    /// Touch devices keep updating the selection while a toolbar is open.
    pub fn set_selection(&mut self, selection: impl Into<String>) {
        self.selection = selection.into();
    }

    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        self.triggered
    }

    #[must_use]
    pub const fn is_closeable(&self) -> bool {
        self.closeable
    }

    #[must_use]
    pub const fn is_docked(&self) -> bool {
        self.docked
    }

    pub fn set_closeable(&mut self) {
        self.closeable = true;
    }

    /// Toolbar -> conversation. Sends `prompt` when given.
    ///
    /// Returns `true` the first time the panel is triggered.
    pub fn trigger(&mut self, source: &mut dyn AnswerSource, prompt: Option<&str>) -> bool {
        let first = !self.triggered;
        self.triggered = true;
        self.overlay.close_all();
        if let Some(prompt) = prompt {
            self.conversation.ask(source, prompt);
        }
        if first {
            tracing::debug!(message = "panel.trigger", panel = self.id.0);
        }
        first
    }

    /// Pin the panel. Docked panels are always closeable and survive
    /// outside clicks. Returns `true` if this call docked it.
    pub fn dock(&mut self) -> bool {
        let first = !self.docked;
        self.docked = true;
        self.closeable = true;
        if first {
            tracing::debug!(message = "panel.dock", panel = self.id.0);
        }
        first
    }

    #[must_use]
    pub const fn css_position(&self) -> CssPosition {
        self.css_position
    }

    /// Tool clicks pin the panel to the viewport; ask/reply growth keeps it
    /// in document flow.
    pub fn set_css_position(&mut self, position: CssPosition) {
        self.css_position = position;
    }

    /// Style for the container at the rendered (drag-adjusted) position.
    pub fn container_style(&self) -> ContainerStyle {
        let at = self.placement.rendered();
        match self.css_position {
            CssPosition::Absolute => ContainerStyle::absolute(at),
            CssPosition::Fixed => ContainerStyle::fixed(at),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Whether the placement may be re-clamped (no drag in flight).
    pub fn can_reposition(&self) -> bool {
        self.placement.phase() != PlacementPhase::Dragging
    }

    pub fn state(&self) -> PanelState {
        PanelState {
            committed: self.placement.committed(),
            virtual_offset: self.placement.virtual_offset(),
            triggered: self.triggered,
            closeable: self.closeable,
            docked: self.docked,
            active_overlay: self.overlay.active(),
        }
    }
}
