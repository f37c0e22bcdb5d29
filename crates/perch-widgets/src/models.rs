#![forbid(unsafe_code)]

//! Model catalog for the model popup.

use crate::error::PanelError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub key: String,
    /// Backend model identifier.
    pub value: String,
    /// Display name.
    pub desc: String,
}

/// Known models, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for (key, value, desc) in [
            ("chatgptFree35", "text-davinci-002-render-sha", "ChatGPT (Web)"),
            ("chatgptPlus4", "gpt-4", "ChatGPT (Web, GPT-4 All in one)"),
            ("chatgptApi35", "gpt-3.5-turbo", "ChatGPT (GPT-3.5-turbo)"),
            ("chatgptApi4_8k", "gpt-4", "ChatGPT (GPT-4-8k)"),
            ("chatgptApi4_128k", "gpt-4-turbo", "ChatGPT (GPT-4-Turbo 128k)"),
            ("claude2WebFree", "", "Claude.ai (Web)"),
            ("claude3HaikuApi", "claude-3-haiku-20240307", "Claude.ai (API, Claude 3 Haiku)"),
            ("claude3SonnetApi", "claude-3-sonnet-20240229", "Claude.ai (API, Claude 3 Sonnet)"),
            ("claude3OpusApi", "claude-3-opus-20240229", "Claude.ai (API, Claude 3 Opus)"),
            ("bardWebFree", "", "Gemini (Web)"),
            ("bingFree4", "", "Bing (Web, GPT-4)"),
            ("customModel", "", "Custom Model"),
        ] {
            catalog.insert(key, value, desc);
        }
        catalog
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, key: &str, value: &str, desc: &str) {
        let entry = ModelEntry {
            key: key.to_owned(),
            value: value.to_owned(),
            desc: desc.to_owned(),
        };
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, key: &str) -> Result<&ModelEntry, PanelError> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .ok_or_else(|| PanelError::UnknownModel(key.to_owned()))
    }

    /// Display name, falling back to the key for unknown models.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map_or(key, |e| e.desc.as_str())
    }

    /// Entries offered in the popup: catalog order, filtered by `active`.
    pub fn offered<'a>(&'a self, active: &'a [String]) -> impl Iterator<Item = &'a ModelEntry> {
        self.entries
            .iter()
            .filter(move |e| active.iter().any(|a| *a == e.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_key() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(catalog.display_name("chatgptFree35"), "ChatGPT (Web)");
        assert_eq!(catalog.display_name("mystery"), "mystery");
        assert!(matches!(catalog.get("mystery"), Err(PanelError::UnknownModel(_))));
    }

    #[test]
    fn offered_follows_catalog_order() {
        let catalog = ModelCatalog::builtin();
        let active = vec!["customModel".to_owned(), "chatgptFree35".to_owned()];
        let keys: Vec<&str> = catalog.offered(&active).map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["chatgptFree35", "customModel"]);
    }
}
