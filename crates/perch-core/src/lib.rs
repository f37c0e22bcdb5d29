#![forbid(unsafe_code)]

//! Core: geometry, the host document model, editable resolution, and events.
//!
//! # Role in Perch
//! `perch-core` is the input layer. It defines the coordinate types the
//! placement engine works in, the [`dom::DocumentTree`] seam through which the
//! embedding host exposes the page, and the normalized [`event::HostEvent`]
//! values the controller consumes.
//!
//! Nothing here touches a real browser; hosts push metrics and events in and
//! apply mutations through [`dom::DocumentMut`].

pub mod dom;
pub mod editable;
pub mod event;
pub mod geometry;
pub mod logging;

pub use dom::{
    ContainerStyle, CssPosition, DocumentArena, DocumentMut, DocumentTree, NodeId,
    SelectionSnapshot,
};
pub use editable::find_editable_ancestor;
pub use event::{HostEvent, Key, KeyEvent, Modifiers, PointerButton, PointerEvent, TouchEvent};
pub use geometry::{PageMetrics, Position, Rect, ScrollOffset, Size, element_position};
