#![forbid(unsafe_code)]

//! Saved message templates.
//!
//! A template is a message with `<<placeholder>>` markers plus the list of
//! placeholders to fill. Choosing one copies the message; if it names any
//! placeholders the selection is used as context to fill them.

use perch_runtime::{KeyValueStore, load_json, save_json};
use serde::{Deserialize, Serialize};

use crate::error::PanelError;

/// Storage key of the template list.
pub const TEMPLATE_STORE_KEY: &str = "template_messages";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub message: String,
    pub placeholder: String,
}

impl Template {
    /// Trims both fields.
    pub fn new(message: &str, placeholder: &str) -> Self {
        Self {
            message: message.trim().to_owned(),
            placeholder: placeholder.trim().to_owned(),
        }
    }

    pub fn has_placeholders(&self) -> bool {
        !self.placeholder.trim().is_empty()
    }
}

/// Template list backed by a key-value store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateBook {
    templates: Vec<Template>,
}

impl TemplateBook {
    /// Load from `store`; a missing key is an empty book.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self, PanelError> {
        let templates: Vec<Template> =
            load_json(store, TEMPLATE_STORE_KEY)?.unwrap_or_default();
        Ok(Self { templates })
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    /// Append and persist.
    pub fn add<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        template: Template,
    ) -> Result<(), PanelError> {
        let mut next = self.templates.clone();
        next.push(template);
        save_json(store, TEMPLATE_STORE_KEY, &next)?;
        self.templates = next;
        Ok(())
    }

    /// Remove and persist.
    pub fn delete<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: usize,
    ) -> Result<Template, PanelError> {
        let len = self.templates.len();
        if index >= len {
            return Err(PanelError::TemplateIndex { index, len });
        }
        let mut next = self.templates.clone();
        let removed = next.remove(index);
        save_json(store, TEMPLATE_STORE_KEY, &next)?;
        self.templates = next;
        Ok(removed)
    }
}

/// Prompt that fills `template`'s placeholders from `context`.
pub fn customization_prompt(template: &Template, context: &str) -> String {
    format!(
        "Act as a proficient writer. Replace the placeholders written as <<placeholder>> in the message below with matching information from the context, keeping the sentence flow and structure. Leave a placeholder unchanged when the context has no value for it. Only give the updated text, without any extra explanation.\n\nPlaceholders to replace: {}\n\nMessage: {}\n\nContext: {}",
        template.placeholder, template.message, context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_runtime::MemoryStore;

    #[test]
    fn add_and_delete_persist() {
        let mut store = MemoryStore::new();
        let mut book = TemplateBook::load(&store).unwrap();
        assert!(book.templates().is_empty());

        book.add(&mut store, Template::new(" Dear <<Name>> ", "Name"))
            .unwrap();
        book.add(&mut store, Template::new("Thanks!", "")).unwrap();
        assert_eq!(TemplateBook::load(&store).unwrap(), book);

        let removed = book.delete(&mut store, 0).unwrap();
        assert_eq!(removed.message, "Dear <<Name>>");
        assert_eq!(TemplateBook::load(&store).unwrap().templates().len(), 1);
    }

    #[test]
    fn delete_out_of_range() {
        let mut store = MemoryStore::new();
        let mut book = TemplateBook::default();
        assert!(matches!(
            book.delete(&mut store, 2),
            Err(PanelError::TemplateIndex { index: 2, len: 0 })
        ));
    }

    #[test]
    fn stored_list_is_plain_message_placeholder_objects() {
        let mut store = MemoryStore::new();
        let mut book = TemplateBook::default();
        book.add(&mut store, Template::new("Dear <<Name>>", "Name"))
            .unwrap();
        let raw = store.get_raw(TEMPLATE_STORE_KEY).unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            stored,
            serde_json::json!([{ "message": "Dear <<Name>>", "placeholder": "Name" }])
        );
    }

    #[test]
    fn corrupt_store_surfaces_error() {
        let mut store = MemoryStore::new();
        store.set_raw(TEMPLATE_STORE_KEY, "not json".to_owned());
        assert!(matches!(TemplateBook::load(&store), Err(PanelError::Store(_))));
    }

    #[test]
    fn customization_mentions_all_parts() {
        let t = Template::new("Dear <<Name>>", "Name");
        let prompt = customization_prompt(&t, "Hi, I am Ada");
        assert!(prompt.contains("Placeholders to replace: Name"));
        assert!(prompt.contains("Message: Dear <<Name>>"));
        assert!(prompt.ends_with("Context: Hi, I am Ada"));
        assert!(!Template::new("x", "  ").has_placeholders());
    }
}
