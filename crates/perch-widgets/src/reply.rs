#![forbid(unsafe_code)]

//! Ask and reply prompts.

use serde::{Deserialize, Serialize};

use crate::overlay::ReplyKind;

/// Text typed into the ask popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskDraft {
    pub text: String,
    pub include_selection: bool,
}

impl Default for AskDraft {
    fn default() -> Self {
        Self {
            text: String::new(),
            include_selection: true,
        }
    }
}

impl AskDraft {
    pub fn toggle_include_selection(&mut self) -> bool {
        self.include_selection = !self.include_selection;
        self.include_selection
    }

    /// Build the prompt for `selection` and reset the text.
    pub fn take_prompt(&mut self, selection: &str) -> AskOutcome {
        let question = std::mem::take(&mut self.text);
        let prompt = ask_prompt(&question, selection, self.include_selection);
        let clipboard = self.include_selection.then(|| question.clone());
        AskOutcome { prompt, clipboard }
    }
}

/// Result of sending the ask popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskOutcome {
    pub prompt: String,
    /// Text to copy, when the selection was included.
    pub clipboard: Option<String>,
}

/// Who the reply is written as.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplyProfile {
    pub full_name: String,
    pub first_name: String,
    /// Free-form background the model may draw on.
    pub background: String,
}

pub fn ask_prompt(question: &str, selection: &str, include_selection: bool) -> String {
    if include_selection {
        format!(
            "Perform the task independently of the preceding discussion and context. Thoroughly perform the task below on the given text. Only give me the output and nothing else. Do not wrap responses in quotes. Respond in the same language.\n- Task to perform: {question}\n- Context on which to perform the task: {selection}"
        )
    } else {
        format!(
            "Perform the task independently of the preceding discussion and context. Provide a thorough response to the following question without enclosing your answer in quotation marks. Use the same language style as the question: \"{question}\""
        )
    }
}

/// Non-blank reply context, if any.
pub fn nonblank(context: &str) -> Option<&str> {
    (!context.trim().is_empty()).then_some(context)
}

pub fn reply_prompt(
    kind: ReplyKind,
    received: &str,
    context: &str,
    profile: Option<&ReplyProfile>,
) -> String {
    let (what, noun) = match kind {
        ReplyKind::Email => ("You have received an email", "Email"),
        ReplyKind::Chat => ("You are in a conversation", "Chat Message"),
    };
    let mut prompt = String::from(
        "Perform the task independently of the preceding discussion and context. ",
    );
    if let Some(profile) = profile {
        prompt.push_str(&format!(
            "Act as {}. Always reply as if you are {}. ",
            profile.full_name, profile.first_name
        ));
    }
    prompt.push_str(&format!(
        "{what}, shown below in triple quotes. Write a professional reply to it. If a reply context is provided, it takes precedence; otherwise base the reply only on the received text. Do not enclose the reply in quotation marks and match its language style."
    ));
    if let Some(profile) = profile.filter(|p| !p.background.trim().is_empty()) {
        prompt.push_str(&format!("\n\nBackground for reference: {}", profile.background));
    }
    prompt.push_str(&format!("\n\nReceived {noun}:\n\"\"\"{received}\"\"\""));
    if let Some(context) = nonblank(context) {
        prompt.push_str(&format!(
            "\nImportant Reply Context for my reply to the above received {noun}: \"{context}\""
        ));
    }
    prompt
}
