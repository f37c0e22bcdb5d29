#![forbid(unsafe_code)]

//! Panel-level state for Perch.
//!
//! # Role in Perch
//! `perch-widgets` holds the state of a mounted panel: which overlay is
//! showing, hover-intent timers, the tool row, saved templates, the ask and
//! reply drafts, and the streamed conversation. It does not read the page;
//! `perch-web` feeds it events and applies what it decides.

pub mod conversation;
pub mod error;
pub mod hover;
pub mod models;
pub mod overlay;
pub mod panel;
pub mod portal;
pub mod reply;
pub mod templates;
pub mod tools;

pub use conversation::{Conversation, ConversationItem, StreamStatus};
pub use error::PanelError;
pub use hover::{HoverIntent, HoverRegion};
pub use models::{ModelCatalog, ModelEntry};
pub use overlay::{OverlayKind, OverlayState, OverlayTransition, ReplyKind};
pub use panel::{
    CARD_CONTAINER_CLASS, DOCKED_CONTAINER_CLASS, Panel, PanelId, PanelOrigin, PanelState,
    TOOLBAR_CONTAINER_CLASS,
};
pub use portal::PortalRegistry;
pub use reply::{AskDraft, AskOutcome, ReplyProfile, ask_prompt, reply_prompt};
pub use templates::{TEMPLATE_STORE_KEY, Template, TemplateBook, customization_prompt};
pub use tools::{MenuTool, PromptSource, PromptTemplate, SelectionTool, ToolRegistry, ToolRow};
