#![forbid(unsafe_code)]

//! Selection tools and context-menu tools.
//!
//! A selection tool turns the selected text into a prompt. Built-in tools
//! are [`PromptTemplate`]s; hosts can register any [`PromptSource`],
//! including plain closures.

use std::fmt;

use crate::error::PanelError;

/// Produces a prompt for a selection.
///
/// Called once per tool invocation. An empty selection yields a prompt with
/// an empty quoted body rather than an error.
pub trait PromptSource {
    fn gen_prompt(&self, selection: &str) -> String;
}

impl<F> PromptSource for F
where
    F: Fn(&str) -> String,
{
    fn gen_prompt(&self, selection: &str) -> String {
        self(selection)
    }
}

/// Parameterised prompt shared by the built-in tools.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptTemplate {
    pub message: String,
    /// Ignore `message` and ask for a translation instead.
    pub is_translation: bool,
    /// Fixed target language; `None` uses the preferred language.
    pub target_language: Option<String>,
    /// Translate into English when the text is already in the target language.
    pub bidirectional: bool,
    /// Prefix the prompt with `Reply in <language>.`
    pub language_prefix: bool,
    language: String,
}

impl PromptTemplate {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn translation() -> Self {
        Self {
            is_translation: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn target(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    #[must_use]
    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    #[must_use]
    pub fn with_language_prefix(mut self) -> Self {
        self.language_prefix = true;
        self
    }

    /// Bind the preferred language used when no target is fixed.
    #[must_use]
    pub fn preferred_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn language(&self) -> &str {
        self.target_language.as_deref().unwrap_or(&self.language)
    }
}

impl PromptSource for PromptTemplate {
    fn gen_prompt(&self, selection: &str) -> String {
        let language = self.language();
        let mut full = if self.is_translation {
            format!("Translate the following into {language} and only show me the translated content")
        } else {
            self.message.clone()
        };
        if self.bidirectional {
            full.push_str(&format!(
                ". If it is already in {language}, translate it into English and only show me the translated content"
            ));
        }
        let prefix = if self.language_prefix {
            format!("Reply in {language}.")
        } else {
            String::new()
        };
        format!("{prefix}{full}:\n'''\n{selection}\n'''")
    }
}

/// One entry of the tool row.
pub struct SelectionTool {
    pub key: String,
    pub label: String,
    prompt: Box<dyn PromptSource>,
}

impl SelectionTool {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        prompt: impl PromptSource + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            prompt: Box::new(prompt),
        }
    }

    pub fn gen_prompt(&self, selection: &str) -> String {
        self.prompt.gen_prompt(selection)
    }
}

impl fmt::Debug for SelectionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionTool")
            .field("key", &self.key)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A context-menu entry. Menu tools without a prompt do nothing.
pub struct MenuTool {
    pub key: String,
    pub label: String,
    prompt: Option<Box<dyn Fn() -> String>>,
}

impl MenuTool {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            prompt: None,
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Fn() -> String + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    pub fn gen_prompt(&self) -> Option<String> {
        self.prompt.as_ref().map(|p| p())
    }
}

impl fmt::Debug for MenuTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuTool")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("has_prompt", &self.prompt.is_some())
            .finish()
    }
}

/// Tools visible inline and in the overflow flyout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolRow {
    pub visible: Vec<String>,
    pub hidden: Vec<String>,
}

impl ToolRow {
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.hidden.is_empty()
    }
}

/// Ordered registry of selection and menu tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<SelectionTool>,
    menu: Vec<MenuTool>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in tool set, translating into `language` by default.
    pub fn builtin(language: &str) -> Self {
        let lang = |t: PromptTemplate| t.preferred_language(language);
        let mut registry = Self::new();
        registry.register(SelectionTool::new(
            "improve",
            "Improve",
            lang(PromptTemplate::message(
                "Read the text delimited by triple quotes and improve it. Keep the original meaning, structure, length and language. Only give me the output and nothing else. Do not wrap responses in quotes",
            )),
        ));
        registry.register(SelectionTool::new(
            "assistant",
            "Assistant",
            lang(PromptTemplate::message(
                "Act as a helpful assistant and answer the prompt delimited by triple quotes. Only give me the output and nothing else. Do not wrap responses in quotes",
            )
            .with_language_prefix()),
        ));
        registry.register(SelectionTool::new(
            "fixError",
            "Fix Error",
            lang(PromptTemplate::message(
                "Read the text delimited by triple quotes, fix grammar and spelling errors, and rephrase where needed without losing information. Only give me the output and nothing else. Do not wrap responses in quotes",
            )),
        ));
        registry.register(SelectionTool::new(
            "explain",
            "Explain",
            lang(PromptTemplate::message(
                "Explain the following in great detail and in a way that is easy to understand",
            )
            .with_language_prefix()),
        ));
        registry.register(SelectionTool::new(
            "makeShorter",
            "Shorter",
            lang(PromptTemplate::message(
                "Rewrite the text delimited by triple quotes to no more than half its length, keeping the meaning and the language. Only give me the output and nothing else",
            )),
        ));
        registry.register(SelectionTool::new(
            "makeLonger",
            "Longer",
            lang(PromptTemplate::message(
                "Rewrite the text delimited by triple quotes to more than twice its length, keeping the meaning and the language. Only give me the output and nothing else",
            )),
        ));
        registry.register(SelectionTool::new(
            "translate",
            "Translate",
            lang(PromptTemplate::translation()),
        ));
        registry.register(SelectionTool::new(
            "translateToEn",
            "Translate (To English)",
            lang(PromptTemplate::translation().target("English")),
        ));
        registry.register(SelectionTool::new(
            "translateToZh",
            "Translate (To Chinese)",
            lang(PromptTemplate::translation().target("Chinese")),
        ));
        registry.register(SelectionTool::new(
            "translateBidi",
            "Translate (Bidirectional)",
            lang(PromptTemplate::translation().bidirectional()),
        ));
        registry.register(SelectionTool::new(
            "summary",
            "Summary",
            lang(PromptTemplate::message(
                "Summarize the text delimited by triple quotes into a concise abstract paragraph that keeps the most important points. Only give me the output and nothing else",
            )
            .with_language_prefix()),
        ));
        registry.register(SelectionTool::new(
            "sentiment",
            "Sentiment Analysis",
            lang(PromptTemplate::message(
                "Analyze the sentiments expressed in the following content and make a brief summary of the sentiments",
            )
            .with_language_prefix()),
        ));
        registry.register(SelectionTool::new(
            "divide",
            "Divide Paragraphs",
            lang(PromptTemplate::message(
                "Divide the following into paragraphs that are easy to read and understand",
            )),
        ));
        registry.register(SelectionTool::new(
            "code",
            "Code Explain",
            lang(PromptTemplate::message("Explain the following code").with_language_prefix()),
        ));
        registry.register_menu(MenuTool::new("newChat", "New Chat").with_prompt(String::new));
        registry
    }

    /// Add or replace a tool. Replacement keeps the original position.
    pub fn register(&mut self, tool: SelectionTool) {
        match self.tools.iter_mut().find(|t| t.key == tool.key) {
            Some(slot) => *slot = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn register_menu(&mut self, tool: MenuTool) {
        match self.menu.iter_mut().find(|t| t.key == tool.key) {
            Some(slot) => *slot = tool,
            None => self.menu.push(tool),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SelectionTool> {
        self.tools.iter().find(|t| t.key == key)
    }

    pub fn menu_tool(&self, key: &str) -> Option<&MenuTool> {
        self.menu.iter().find(|t| t.key == key)
    }

    /// Prompt for tool `key`.
    pub fn gen_prompt(&self, key: &str, selection: &str) -> Result<String, PanelError> {
        self.get(key)
            .map(|tool| tool.gen_prompt(selection))
            .ok_or_else(|| PanelError::UnknownTool(key.to_owned()))
    }

    /// Split the active tools into the inline row and the overflow flyout.
    ///
    /// Order follows the registry, not `active`; unknown keys are skipped.
    pub fn row(&self, active: &[String], max_visible: usize) -> ToolRow {
        let keys: Vec<String> = self
            .tools
            .iter()
            .filter(|t| active.iter().any(|a| *a == t.key))
            .map(|t| t.key.clone())
            .collect();
        let split = max_visible.min(keys.len());
        let (visible, hidden) = keys.split_at(split);
        ToolRow {
            visible: visible.to_vec(),
            hidden: hidden.to_vec(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn translation_prompt_shape() {
        let prompt = PromptTemplate::translation()
            .preferred_language("French")
            .gen_prompt("hello world");
        assert_eq!(
            prompt,
            "Translate the following into French and only show me the translated content:\n'''\nhello world\n'''"
        );
    }

    #[test]
    fn fixed_target_overrides_preferred() {
        let prompt = PromptTemplate::translation()
            .target("English")
            .preferred_language("French")
            .gen_prompt("bonjour");
        assert!(prompt.starts_with("Translate the following into English"));
    }

    #[test]
    fn bidirectional_and_prefix() {
        let prompt = PromptTemplate::translation()
            .bidirectional()
            .with_language_prefix()
            .preferred_language("German")
            .gen_prompt("x");
        assert_eq!(
            prompt,
            "Reply in German.Translate the following into German and only show me the translated content. If it is already in German, translate it into English and only show me the translated content:\n'''\nx\n'''"
        );
    }

    #[test]
    fn empty_selection_still_yields_prompt() {
        let prompt = PromptTemplate::message("Explain").gen_prompt("");
        assert_eq!(prompt, "Explain:\n'''\n\n'''");
    }

    #[test]
    fn row_splits_in_registry_order() {
        let registry = ToolRegistry::builtin("English");
        let active: Vec<String> = ["code", "translate", "improve", "summary", "nope"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = registry.row(&active, 3);
        assert_eq!(row.visible, vec!["improve", "translate", "summary"]);
        assert_eq!(row.hidden, vec!["code"]);
    }

    #[test]
    fn empty_active_list_gives_empty_row() {
        let registry = ToolRegistry::builtin("English");
        assert!(registry.row(&[], 3).is_empty());
    }

    #[test]
    fn closures_register_as_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(SelectionTool::new("shout", "Shout", |s: &str| s.to_uppercase()));
        assert_eq!(registry.gen_prompt("shout", "hi").unwrap(), "HI");
        assert!(matches!(
            registry.gen_prompt("missing", "hi"),
            Err(PanelError::UnknownTool(k)) if k == "missing"
        ));
    }

    #[test]
    fn menu_tool_without_prompt_is_inert() {
        let mut registry = ToolRegistry::builtin("English");
        registry.register_menu(MenuTool::new("bare", "Bare"));
        assert_eq!(registry.menu_tool("bare").and_then(MenuTool::gen_prompt), None);
        assert_eq!(
            registry.menu_tool("newChat").and_then(MenuTool::gen_prompt),
            Some(String::new())
        );
    }
}
