#![forbid(unsafe_code)]

//! Errors for panel operations.

use std::fmt;

use perch_runtime::StoreError;

use crate::panel::PanelId;

/// Failure of a panel-level operation.
///
/// Lookups that are routinely stale (a timer for a panel that has since
/// closed, a second close) are not errors; they are ignored where they occur.
#[derive(Debug)]
pub enum PanelError {
    /// No open panel has this id.
    UnknownPanel(PanelId),
    /// No selection or menu tool has this key.
    UnknownTool(String),
    /// The model key is not in the catalog.
    UnknownModel(String),
    /// Template index out of range.
    TemplateIndex { index: usize, len: usize },
    /// Persisting or loading templates failed.
    Store(StoreError),
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPanel(id) => write!(f, "unknown panel {}", id.get()),
            Self::UnknownTool(key) => write!(f, "unknown tool {key:?}"),
            Self::UnknownModel(key) => write!(f, "unknown model {key:?}"),
            Self::TemplateIndex { index, len } => {
                write!(f, "template index {index} out of range (len {len})")
            }
            Self::Store(e) => write!(f, "template storage: {e}"),
        }
    }
}

impl std::error::Error for PanelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for PanelError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
