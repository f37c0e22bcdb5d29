#![forbid(unsafe_code)]

//! Commands the controller hands back to the JS host.
//!
//! Container creation, styling and removal go straight through
//! [`perch_core::DocumentMut`]. Everything else the host must do on the page
//! (render a panel, copy text, focus a textarea, take pointer capture) is
//! queued as a [`HostCommand`] and drained with
//! [`crate::PerchController::drain_commands`].

use perch_core::NodeId;
use perch_widgets::{OverlayKind, PanelId};
use serde::{Deserialize, Serialize};

use crate::pointer_capture::CaptureCommand;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    /// Render the panel UI into `container`.
    PanelMounted { panel: PanelId, container: NodeId },
    /// The panel's container was removed; unmount its UI.
    PanelClosed { panel: PanelId },
    /// `navigator.clipboard.writeText(text)`.
    CopyToClipboard { text: String },
    /// Focus the popup textarea of `overlay`.
    FocusTextarea { panel: PanelId, overlay: OverlayKind },
    /// Show or hide the tool row and the drag handle.
    ToolRowVisibility { panel: PanelId, visible: bool },
    /// `setPointerCapture` / `releasePointerCapture` on the drag handle.
    PointerCapture { capture: CaptureCommand },
}

impl HostCommand {
    /// Stable name used in log records.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PanelMounted { .. } => "panel_mounted",
            Self::PanelClosed { .. } => "panel_closed",
            Self::CopyToClipboard { .. } => "copy_to_clipboard",
            Self::FocusTextarea { .. } => "focus_textarea",
            Self::ToolRowVisibility { .. } => "tool_row_visibility",
            Self::PointerCapture { .. } => "pointer_capture",
        }
    }
}
