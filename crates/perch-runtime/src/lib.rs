#![forbid(unsafe_code)]

//! Runtime services for Perch: time, deferred work, cancellation,
//! configuration, storage, and the answer collaborator.
//!
//! Everything here is deterministic. The host owns real time and real
//! storage and feeds them in; tests substitute [`clock::DeterministicClock`],
//! [`store::MemoryStore`] and a scripted answer source.

pub mod answer;
pub mod cancellation;
pub mod clock;
pub mod config;
pub mod store;
pub mod timer;

pub use answer::{AnswerChunk, AnswerSource, AnswerStream, ConversationRecord, Session};
#[cfg(any(test, feature = "test-helpers"))]
pub use answer::ScriptedAnswerSource;
pub use cancellation::{CancellationSource, CancellationToken};
pub use clock::DeterministicClock;
pub use config::{ConfigError, DisplayMode, ThemeMode, UserConfig};
pub use store::{KeyValueStore, MemoryStore, StoreError, load_json, save_json};
pub use timer::{TimerId, TimerQueue};
