#![forbid(unsafe_code)]

//! Panel layout: visibility clamping, placement, and the drag lifecycle.
//!
//! [`visibility`] holds the pure clamp rules, [`placement`] owns a panel's
//! committed position and virtual drag offset, and [`drag`] turns raw pointer
//! input on a drag handle into incremental deltas.

pub mod drag;
pub mod placement;
pub mod visibility;

pub use drag::{
    DRAG_DEFAULT_THRESHOLD, DragCancelReason, DragEffect, DragInput, DragMachine,
    DragMachineError, DragNoopReason, DragState, DragTransition,
};
pub use placement::{
    Anchor, PanelPlacement, PlacementPhase, centered_menu_position, conversation_grow_position,
    keyboard_toolbar_position, static_card_position, tool_expand_position,
};
pub use visibility::{
    PanelBox, conversation_min_width, ensure_visibility, ensure_visibility_with, toolbar_left,
};
