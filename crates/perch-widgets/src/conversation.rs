#![forbid(unsafe_code)]

//! Streamed conversation shown inside a triggered panel.

use std::fmt;

use perch_runtime::{AnswerChunk, AnswerSource, AnswerStream, CancellationSource, Session};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    Question { text: String },
    Answer { text: String, done: bool },
    Error { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    #[default]
    Idle,
    Streaming,
    Done,
    Stopped,
    Failed,
}

/// Question/answer history plus the stream currently feeding it.
pub struct Conversation {
    session: Session,
    items: Vec<ConversationItem>,
    status: StreamStatus,
    stream: Option<Box<dyn AnswerStream>>,
    cancel: Option<CancellationSource>,
}

impl fmt::Debug for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("session", &self.session)
            .field("items", &self.items)
            .field("status", &self.status)
            .field("streaming", &self.stream.is_some())
            .finish()
    }
}

impl Conversation {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            items: Vec::new(),
            status: StreamStatus::Idle,
            stream: None,
            cancel: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn is_streaming(&self) -> bool {
        self.status == StreamStatus::Streaming
    }

    /// Switch the session's model.
    pub fn set_model(&mut self, model_name: &str, ai_name: &str) {
        self.session.model_name = model_name.to_owned();
        self.session.ai_name = ai_name.to_owned();
    }

    /// Send `prompt`, stopping any answer still streaming.
    pub fn ask(&mut self, source: &mut dyn AnswerSource, prompt: &str) {
        if self.is_streaming() {
            self.stop();
        }
        let cancel = CancellationSource::new();
        self.items.push(ConversationItem::Question {
            text: prompt.to_owned(),
        });
        self.items.push(ConversationItem::Answer {
            text: String::new(),
            done: false,
        });
        self.stream = Some(source.start(&self.session, prompt, cancel.token()));
        self.cancel = Some(cancel);
        self.status = StreamStatus::Streaming;
        tracing::debug!(
            message = "conversation.ask",
            model = %self.session.model_name,
            prompt_len = prompt.len()
        );
    }

    /// Drain every chunk the stream has ready. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(chunk) = self.stream.as_mut().and_then(|s| s.poll_chunk()) {
            applied += 1;
            match chunk {
                AnswerChunk::Fragment(fragment) => {
                    if let Some(ConversationItem::Answer { text, .. }) = self.items.last_mut() {
                        text.push_str(&fragment);
                    }
                }
                AnswerChunk::Done => {
                    self.finish_answer();
                    self.status = StreamStatus::Done;
                    self.record_last();
                    self.release_stream();
                }
                AnswerChunk::Error(message) => {
                    self.finish_answer();
                    tracing::warn!(message = "conversation.error", error = %message);
                    self.items.push(ConversationItem::Error { text: message });
                    self.status = StreamStatus::Failed;
                    self.release_stream();
                }
            }
        }
        applied
    }

    /// Stop the running answer. Fragments arriving later are dropped.
    pub fn stop(&mut self) -> bool {
        if !self.is_streaming() {
            return false;
        }
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
        self.finish_answer();
        self.status = StreamStatus::Stopped;
        self.release_stream();
        tracing::debug!(message = "conversation.stop");
        true
    }

    fn finish_answer(&mut self) {
        if let Some(ConversationItem::Answer { done, .. }) = self.items.last_mut() {
            *done = true;
        }
    }

    fn release_stream(&mut self) {
        self.stream = None;
        self.cancel = None;
    }

    fn record_last(&mut self) {
        let mut iter = self.items.iter().rev();
        if let (
            Some(ConversationItem::Answer { text: answer, .. }),
            Some(ConversationItem::Question { text: question }),
        ) = (iter.next(), iter.next())
        {
            let (question, answer) = (question.clone(), answer.clone());
            self.session.record(question, answer);
        }
    }
}
