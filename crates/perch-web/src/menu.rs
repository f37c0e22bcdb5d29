#![forbid(unsafe_code)]

//! Context-menu commands sent by the extension background.

use serde::{Deserialize, Serialize};

/// Message type that asks the page to open a chat panel.
pub const CREATE_CHAT_MESSAGE: &str = "CREATE_CHAT";

/// "Open a chat for this menu item".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenuCommand {
    /// Selection-tool or menu-tool key.
    pub item_id: String,
    #[serde(default)]
    pub selection_text: String,
    /// Open at the last context-menu pointer instead of the centred default.
    #[serde(default)]
    pub use_menu_position: bool,
}

impl ContextMenuCommand {
    pub fn new(item_id: impl Into<String>, selection_text: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            selection_text: selection_text.into(),
            use_menu_position: false,
        }
    }

    #[must_use]
    pub fn at_menu_position(mut self) -> Self {
        self.use_menu_position = true;
        self
    }
}

/// Decode a runtime message. `Ok(None)` for message types other than
/// [`CREATE_CHAT_MESSAGE`].
#[cfg(feature = "message-parser")]
pub fn parse_runtime_message(json: &str) -> Result<Option<ContextMenuCommand>, serde_json::Error> {
    use serde_json::Value;

    let value: Value = serde_json::from_str(json)?;
    if value.get("type").and_then(Value::as_str) != Some(CREATE_CHAT_MESSAGE) {
        return Ok(None);
    }
    let data = value.get("data").cloned().unwrap_or(Value::Null);
    serde_json::from_value(data).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_fields() {
        let cmd: ContextMenuCommand = serde_json::from_str(
            r#"{"itemId":"translate","selectionText":"hola","useMenuPosition":true}"#,
        )
        .expect("valid command");
        assert_eq!(cmd, ContextMenuCommand::new("translate", "hola").at_menu_position());
    }

    #[test]
    fn missing_optional_fields_default() {
        let cmd: ContextMenuCommand =
            serde_json::from_str(r#"{"itemId":"newChat"}"#).expect("valid command");
        assert_eq!(cmd, ContextMenuCommand::new("newChat", ""));
    }

    #[cfg(feature = "message-parser")]
    #[test]
    fn runtime_message_filters_by_type() {
        let chat = parse_runtime_message(
            r#"{"type":"CREATE_CHAT","data":{"itemId":"summary","selectionText":"x"}}"#,
        )
        .expect("valid json");
        assert_eq!(chat, Some(ContextMenuCommand::new("summary", "x")));

        let other = parse_runtime_message(r#"{"type":"CHANGE_LANG","data":{"lang":"fr"}}"#)
            .expect("valid json");
        assert_eq!(other, None);
        assert!(parse_runtime_message("not json").is_err());
    }
}
