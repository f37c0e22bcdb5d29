#![forbid(unsafe_code)]

//! Host-driven panel controller for Perch.
//!
//! # Role in Perch
//! `perch-web` is the boundary with the browser. The content script forwards
//! page events to a [`PerchController`], advances its clock on animation
//! frames or timeouts, and applies the resulting DOM writes and
//! [`HostCommand`]s. Panel state lives in `perch-widgets`; geometry and drag
//! math live in `perch-layout`.
//!
//! # Example
//! ```
//! use perch_core::{DocumentArena, DocumentTree, HostEvent, PageMetrics, PointerEvent, SelectionSnapshot};
//! use perch_runtime::{MemoryStore, UserConfig};
//! use perch_web::PerchController;
//! use web_time::Duration;
//!
//! # struct Silent;
//! # impl perch_runtime::AnswerSource for Silent {
//! #     fn start(&mut self, _: &perch_runtime::Session, _: &str, _: perch_runtime::CancellationToken)
//! #         -> Box<dyn perch_runtime::AnswerStream> {
//! #         struct Empty;
//! #         impl perch_runtime::AnswerStream for Empty {
//! #             fn poll_chunk(&mut self) -> Option<perch_runtime::AnswerChunk> { None }
//! #         }
//! #         Box::new(Empty)
//! #     }
//! # }
//! let mut doc = DocumentArena::new(PageMetrics::viewport(1200.0, 800.0).with_document_height(2000.0));
//! let mut ctl = PerchController::new(UserConfig::default(), Box::new(Silent), Box::new(MemoryStore::new()))?;
//!
//! let body = doc.body().expect("body");
//! doc.set_selection(SelectionSnapshot::new("hello world", Some(body)));
//! ctl.handle(&mut doc, HostEvent::PointerUp(PointerEvent::at(body, 400.0, 300.0)));
//! ctl.advance(&mut doc, Duration::ZERO);
//! assert!(ctl.toolbar().is_some());
//! # Ok::<(), perch_widgets::PanelError>(())
//! ```

pub mod command;
pub mod controller;
pub mod menu;
pub mod pointer_capture;
pub mod tracker;

pub use command::HostCommand;
pub use controller::{KEYBOARD_SETTLE_DELAY, PerchController};
pub use menu::{CREATE_CHAT_MESSAGE, ContextMenuCommand};
#[cfg(feature = "message-parser")]
pub use menu::parse_runtime_message;
pub use pointer_capture::{
    CaptureCommand, CaptureConfig, CaptureDispatch, CaptureIgnoredReason, CaptureLogEntry,
    CaptureLogOutcome, CapturePhase, DragCaptureAdapter,
};
pub use tracker::{InteractionContext, normalize_selection};
