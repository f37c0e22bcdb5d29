#![forbid(unsafe_code)]

//! User configuration consumed by the panel manager.
//!
//! [`UserConfig`] can be loaded from TOML or JSON. Keys are snake_case; the
//! camelCase names used by browser-side storage are accepted as aliases so a
//! host can forward its stored settings unchanged.
//!
//! ```toml
//! selection_tools_next_to_input_box = true
//! always_pin_window = false
//! theme_mode = "dark"
//! active_selection_tools = ["translate", "summary"]
//! ```

#[cfg(feature = "config-files")]
use std::path::Path;

use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Default dismissal delay after the pointer leaves a hover region.
pub const DEFAULT_HOVER_DISMISS_DELAY_MS: u64 = 1000;
/// Default number of tools shown inline before the rest overflow.
pub const DEFAULT_MAX_VISIBLE_TOOLS: usize = 3;
/// Default model key.
pub const DEFAULT_MODEL_NAME: &str = "chatgptFree35";

/// Colour scheme hint forwarded to the host renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    /// Value of the `data-theme` attribute.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// How a selection is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Floating tool row next to the selection.
    #[default]
    FloatingToolbar,
    /// A static card mounted at the right edge of the window.
    Card,
}

/// Settings read by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Open the toolbar next to the editable element the selection lives in
    /// rather than at the pointer.
    #[serde(alias = "selectionToolsNextToInputBox")]
    pub selection_tools_next_to_input_box: bool,
    /// Dock every panel as soon as it is triggered.
    #[serde(alias = "alwaysPinWindow")]
    pub always_pin_window: bool,
    #[serde(alias = "themeMode")]
    pub theme_mode: ThemeMode,
    /// Key of the model new sessions start with.
    #[serde(alias = "modelName")]
    pub model_name: String,
    /// Target language for translation tools; `"auto"` defers to
    /// [`user_language`](Self::user_language).
    #[serde(alias = "preferredLanguage")]
    pub preferred_language: String,
    /// Language reported by the browser.
    #[serde(alias = "userLanguage")]
    pub user_language: String,
    /// Enabled selection tools, by key.
    #[serde(alias = "activeSelectionTools")]
    pub active_selection_tools: Vec<String>,
    /// Models offered in the model popup, by key.
    #[serde(alias = "activeApiModes")]
    pub active_api_modes: Vec<String>,
    #[serde(alias = "displayMode")]
    pub display_mode: DisplayMode,
    #[serde(alias = "hoverDismissDelayMs")]
    pub hover_dismiss_delay_ms: u64,
    #[serde(alias = "maxVisibleTools")]
    pub max_visible_tools: usize,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            selection_tools_next_to_input_box: false,
            always_pin_window: false,
            theme_mode: ThemeMode::Auto,
            model_name: DEFAULT_MODEL_NAME.to_owned(),
            preferred_language: "auto".to_owned(),
            user_language: "English".to_owned(),
            active_selection_tools: [
                "improve",
                "fixError",
                "assistant",
                "makeShorter",
                "makeLonger",
                "explain",
                "summary",
                "translate",
                "code",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            active_api_modes: [
                "chatgptFree35",
                "chatgptPlus4",
                "bardWebFree",
                "claude2WebFree",
                "bingFree4",
                "customModel",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            display_mode: DisplayMode::FloatingToolbar,
            hover_dismiss_delay_ms: DEFAULT_HOVER_DISMISS_DELAY_MS,
            max_visible_tools: DEFAULT_MAX_VISIBLE_TOOLS,
        }
    }
}

impl UserConfig {
    /// Parse from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Validate ranges. An empty list means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.model_name.trim().is_empty() {
            errors.push("model_name must not be empty".to_owned());
        }
        if self.hover_dismiss_delay_ms > 60_000 {
            errors.push(format!(
                "hover_dismiss_delay_ms must be <= 60000, got {}",
                self.hover_dismiss_delay_ms
            ));
        }
        if self.preferred_language.trim().is_empty() {
            errors.push("preferred_language must not be empty".to_owned());
        }
        errors
    }

    /// [`validate`](Self::validate) as a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            tracing::warn!(message = "config.invalid", count = errors.len());
            Err(ConfigError::Validation(errors))
        }
    }

    #[must_use]
    pub fn hover_dismiss_delay(&self) -> Duration {
        Duration::from_millis(self.hover_dismiss_delay_ms)
    }

    /// Effective target language.
    #[must_use]
    pub fn preferred_language(&self) -> &str {
        if self.preferred_language == "auto" {
            &self.user_language
        } else {
            &self.preferred_language
        }
    }

    #[must_use]
    pub fn is_tool_active(&self, key: &str) -> bool {
        self.active_selection_tools.iter().any(|k| k == key)
    }
}

/// Errors from loading a [`UserConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-files")]
    Toml(toml::de::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = UserConfig::default();
        assert!(!config.selection_tools_next_to_input_box);
        assert!(!config.always_pin_window);
        assert_eq!(config.hover_dismiss_delay(), Duration::from_millis(1000));
        assert_eq!(config.max_visible_tools, 3);
        assert!(config.is_tool_active("translate"));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn json_accepts_camel_case_aliases() {
        let config = UserConfig::from_json_str(
            r#"{"selectionToolsNextToInputBox": true, "alwaysPinWindow": true, "themeMode": "dark"}"#,
        )
        .unwrap();
        assert!(config.selection_tools_next_to_input_box);
        assert!(config.always_pin_window);
        assert_eq!(config.theme_mode, ThemeMode::Dark);
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
    }

    #[cfg(feature = "config-files")]
    #[test]
    fn toml_partial_keeps_defaults() {
        let config = UserConfig::from_toml_str(
            "display_mode = \"card\"\nactive_selection_tools = [\"summary\"]\n",
        )
        .unwrap();
        assert_eq!(config.display_mode, DisplayMode::Card);
        assert_eq!(config.active_selection_tools, vec!["summary".to_owned()]);
        assert_eq!(config.max_visible_tools, DEFAULT_MAX_VISIBLE_TOOLS);
    }

    #[test]
    fn preferred_language_auto_uses_user_language() {
        let mut config = UserConfig::default();
        assert_eq!(config.preferred_language(), "English");
        config.preferred_language = "French".to_owned();
        assert_eq!(config.preferred_language(), "French");
    }

    #[test]
    fn validation_rejects_blank_model() {
        let config = UserConfig {
            model_name: "  ".to_owned(),
            ..UserConfig::default()
        };
        assert!(matches!(config.validated(), Err(ConfigError::Validation(e)) if e.len() == 1));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = UserConfig::from_json_str("{").unwrap_err();
        assert!(err.to_string().starts_with("JSON parse error"));
    }
}
