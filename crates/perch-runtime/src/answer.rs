#![forbid(unsafe_code)]

//! Answer collaborator seam.
//!
//! Backends are out of scope; the controller only sees an [`AnswerSource`]
//! that starts an [`AnswerStream`] for a prompt. Streams are polled on every
//! host tick, so a backend that has nothing new simply returns `None` from
//! [`AnswerStream::poll_chunk`].

use serde::{Deserialize, Serialize};

use crate::cancellation::CancellationToken;

/// One question/answer pair kept for conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub question: String,
    pub answer: String,
}

/// Conversation session handed to the answer backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Model key, e.g. `chatgptFree35`.
    pub model_name: String,
    /// Display name of the model shown in the panel header.
    pub ai_name: String,
    pub records: Vec<ConversationRecord>,
}

impl Session {
    pub fn new(model_name: impl Into<String>, ai_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ai_name: ai_name.into(),
            records: Vec::new(),
        }
    }

    /// Append a finished exchange.
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.records.push(ConversationRecord {
            question: question.into(),
            answer: answer.into(),
        });
    }
}

/// Output of an answer stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum AnswerChunk {
    /// Partial answer text; fragments are appended in order.
    Fragment(String),
    /// The stream finished normally.
    Done,
    /// The backend failed; the message is shown to the user.
    Error(String),
}

/// A running answer.
pub trait AnswerStream {
    /// Next available chunk, or `None` when nothing is ready yet.
    fn poll_chunk(&mut self) -> Option<AnswerChunk>;
}

/// Starts answer streams.
pub trait AnswerSource {
    fn start(
        &mut self,
        session: &Session,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Box<dyn AnswerStream>;
}

/// An [`AnswerSource`] that replays fixed chunks and records prompts.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone, Default)]
pub struct ScriptedAnswerSource {
    script: Vec<AnswerChunk>,
    prompts: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl ScriptedAnswerSource {
    /// Every started stream yields `script` one chunk per poll.
    pub fn new(script: Vec<AnswerChunk>) -> Self {
        Self {
            script,
            prompts: Default::default(),
        }
    }

    /// Prompts passed to [`AnswerSource::start`] so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    /// Shared handle to the prompt log, usable after `self` is moved.
    pub fn prompt_log(&self) -> std::rc::Rc<std::cell::RefCell<Vec<String>>> {
        std::rc::Rc::clone(&self.prompts)
    }
}

#[cfg(any(test, feature = "test-helpers"))]
struct ScriptedStream {
    chunks: std::collections::VecDeque<AnswerChunk>,
    cancel: CancellationToken,
}

#[cfg(any(test, feature = "test-helpers"))]
impl AnswerStream for ScriptedStream {
    fn poll_chunk(&mut self) -> Option<AnswerChunk> {
        if self.cancel.is_cancelled() {
            self.chunks.clear();
            return None;
        }
        self.chunks.pop_front()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl AnswerSource for ScriptedAnswerSource {
    fn start(
        &mut self,
        _session: &Session,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Box<dyn AnswerStream> {
        self.prompts.borrow_mut().push(prompt.to_owned());
        Box::new(ScriptedStream {
            chunks: self.script.iter().cloned().collect(),
            cancel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationSource;

    #[test]
    fn scripted_source_replays_and_logs() {
        let mut source = ScriptedAnswerSource::new(vec![
            AnswerChunk::Fragment("Bon".into()),
            AnswerChunk::Fragment("jour".into()),
            AnswerChunk::Done,
        ]);
        let session = Session::new("chatgptFree35", "ChatGPT (Web)");
        let mut stream = source.start(&session, "say hi", CancellationToken::never());
        let mut text = String::new();
        while let Some(chunk) = stream.poll_chunk() {
            if let AnswerChunk::Fragment(f) = chunk {
                text.push_str(&f);
            }
        }
        assert_eq!(text, "Bonjour");
        assert_eq!(source.prompts(), vec!["say hi".to_owned()]);
    }

    #[test]
    fn cancelled_stream_goes_quiet() {
        let mut source = ScriptedAnswerSource::new(vec![AnswerChunk::Fragment("x".into())]);
        let cancel = CancellationSource::new();
        let mut stream = source.start(&Session::new("m", "M"), "p", cancel.token());
        cancel.cancel();
        assert_eq!(stream.poll_chunk(), None);
    }

    #[test]
    fn chunk_wire_shape() {
        let json = serde_json::to_string(&AnswerChunk::Fragment("a".into())).unwrap();
        assert_eq!(json, r#"{"kind":"fragment","text":"a"}"#);
    }
}
