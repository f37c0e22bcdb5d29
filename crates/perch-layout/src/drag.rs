#![forbid(unsafe_code)]

//! Deterministic drag lifecycle for panel handles.
//!
//! ```text
//! Idle -> Armed -> Dragging -> Idle
//!    \------> Idle (commit/cancel from Armed)
//! ```
//!
//! Only pointer-downs that land on a drag handle arm the machine. Once a drag
//! has started, every transition carries the delta since the previous
//! accepted position, so the deltas of `DragStarted`, `DragUpdated` and
//! `Committed` sum to `end - origin`. A press released before crossing the
//! threshold commits a zero delta.

use std::fmt;

use perch_core::geometry::Position;
use serde::{Deserialize, Serialize};

/// Default movement (CSS px) before an armed press becomes a drag.
pub const DRAG_DEFAULT_THRESHOLD: f64 = 1.0;

/// Why an active drag was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragCancelReason {
    PointerCancel,
    Blur,
    VisibilityHidden,
    LostPointerCapture,
    PanelRemoved,
    Programmatic,
}

/// Input accepted by [`DragMachine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragInput {
    PointerDown {
        pointer_id: u32,
        position: Position,
        on_handle: bool,
    },
    PointerMove {
        pointer_id: u32,
        position: Position,
    },
    PointerUp {
        pointer_id: u32,
        position: Position,
    },
    Cancel {
        reason: DragCancelReason,
    },
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    Idle,
    Armed {
        pointer_id: u32,
        origin: Position,
        current: Position,
    },
    Dragging {
        pointer_id: u32,
        origin: Position,
        current: Position,
    },
}

/// Explicit no-op diagnostics for inputs that are safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragNoopReason {
    IdleWithoutActiveDrag,
    NotOnHandle,
    ActiveDragAlreadyInProgress,
    PointerMismatch,
    ThresholdNotReached,
}

/// Effect emitted by one lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    Armed {
        pointer_id: u32,
        origin: Position,
    },
    DragStarted {
        pointer_id: u32,
        delta_x: f64,
        delta_y: f64,
    },
    DragUpdated {
        pointer_id: u32,
        delta_x: f64,
        delta_y: f64,
    },
    Committed {
        pointer_id: u32,
        delta_x: f64,
        delta_y: f64,
        total_delta_x: f64,
        total_delta_y: f64,
    },
    Canceled {
        pointer_id: Option<u32>,
        reason: DragCancelReason,
    },
    Noop {
        reason: DragNoopReason,
    },
}

impl DragEffect {
    /// Incremental movement carried by this effect, if any.
    pub fn delta(&self) -> Option<(f64, f64)> {
        match *self {
            Self::DragStarted {
                delta_x, delta_y, ..
            }
            | Self::DragUpdated {
                delta_x, delta_y, ..
            }
            | Self::Committed {
                delta_x, delta_y, ..
            } => Some((delta_x, delta_y)),
            _ => None,
        }
    }
}

/// One machine transition with telemetry fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragTransition {
    pub transition_id: u64,
    pub from: DragState,
    pub to: DragState,
    pub effect: DragEffect,
}

/// Construction errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragMachineError {
    InvalidThreshold { threshold: f64 },
}

impl fmt::Display for DragMachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidThreshold { threshold } => {
                write!(f, "drag threshold must be finite and > 0 (got {threshold})")
            }
        }
    }
}

impl std::error::Error for DragMachineError {}

/// Drag lifecycle machine for one panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragMachine {
    state: DragState,
    threshold: f64,
    transition_counter: u64,
}

impl Default for DragMachine {
    fn default() -> Self {
        Self {
            state: DragState::Idle,
            threshold: DRAG_DEFAULT_THRESHOLD,
            transition_counter: 0,
        }
    }
}

impl DragMachine {
    /// Construct with an explicit start threshold.
    pub fn new(threshold: f64) -> Result<Self, DragMachineError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(DragMachineError::InvalidThreshold { threshold });
        }
        Ok(Self {
            threshold,
            ..Self::default()
        })
    }

    #[must_use]
    pub const fn state(&self) -> DragState {
        self.state
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether the machine is Armed or Dragging.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Whether a drag has crossed the threshold and not yet ended.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Reset to Idle from any state. `None` when already Idle.
    pub fn force_cancel(&mut self, reason: DragCancelReason) -> Option<DragTransition> {
        if !self.is_active() {
            return None;
        }
        Some(self.apply(DragInput::Cancel { reason }))
    }

    /// Apply one input and report the transition.
    pub fn apply(&mut self, input: DragInput) -> DragTransition {
        let from = self.state;
        let effect = match (self.state, input) {
            (
                DragState::Idle,
                DragInput::PointerDown {
                    pointer_id,
                    position,
                    on_handle,
                },
            ) => {
                if on_handle {
                    self.state = DragState::Armed {
                        pointer_id,
                        origin: position,
                        current: position,
                    };
                    DragEffect::Armed {
                        pointer_id,
                        origin: position,
                    }
                } else {
                    DragEffect::Noop {
                        reason: DragNoopReason::NotOnHandle,
                    }
                }
            }
            (DragState::Idle, _) => DragEffect::Noop {
                reason: DragNoopReason::IdleWithoutActiveDrag,
            },
            (DragState::Armed { .. } | DragState::Dragging { .. }, DragInput::PointerDown { .. }) => {
                DragEffect::Noop {
                    reason: DragNoopReason::ActiveDragAlreadyInProgress,
                }
            }
            (
                DragState::Armed {
                    pointer_id, origin, ..
                },
                DragInput::PointerMove {
                    pointer_id: incoming,
                    position,
                },
            ) => {
                if incoming != pointer_id {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                } else if crossed_threshold(origin, position, self.threshold) {
                    self.state = DragState::Dragging {
                        pointer_id,
                        origin,
                        current: position,
                    };
                    let (delta_x, delta_y) = delta(origin, position);
                    DragEffect::DragStarted {
                        pointer_id,
                        delta_x,
                        delta_y,
                    }
                } else {
                    self.state = DragState::Armed {
                        pointer_id,
                        origin,
                        current: position,
                    };
                    DragEffect::Noop {
                        reason: DragNoopReason::ThresholdNotReached,
                    }
                }
            }
            (
                DragState::Dragging {
                    pointer_id,
                    origin,
                    current,
                },
                DragInput::PointerMove {
                    pointer_id: incoming,
                    position,
                },
            ) => {
                if incoming != pointer_id {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                } else {
                    self.state = DragState::Dragging {
                        pointer_id,
                        origin,
                        current: position,
                    };
                    let (delta_x, delta_y) = delta(current, position);
                    DragEffect::DragUpdated {
                        pointer_id,
                        delta_x,
                        delta_y,
                    }
                }
            }
            (
                DragState::Armed { pointer_id, .. },
                DragInput::PointerUp {
                    pointer_id: incoming,
                    ..
                },
            ) => {
                if incoming != pointer_id {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                } else {
                    // Never crossed the threshold: a click on the handle.
                    self.state = DragState::Idle;
                    DragEffect::Committed {
                        pointer_id,
                        delta_x: 0.0,
                        delta_y: 0.0,
                        total_delta_x: 0.0,
                        total_delta_y: 0.0,
                    }
                }
            }
            (
                DragState::Dragging {
                    pointer_id,
                    origin,
                    current,
                },
                DragInput::PointerUp {
                    pointer_id: incoming,
                    position,
                },
            ) => {
                if incoming != pointer_id {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                } else {
                    self.state = DragState::Idle;
                    let (delta_x, delta_y) = delta(current, position);
                    let (total_delta_x, total_delta_y) = delta(origin, position);
                    DragEffect::Committed {
                        pointer_id,
                        delta_x,
                        delta_y,
                        total_delta_x,
                        total_delta_y,
                    }
                }
            }
            (
                DragState::Armed { pointer_id, .. } | DragState::Dragging { pointer_id, .. },
                DragInput::Cancel { reason },
            ) => {
                self.state = DragState::Idle;
                DragEffect::Canceled {
                    pointer_id: Some(pointer_id),
                    reason,
                }
            }
        };

        self.transition_counter = self.transition_counter.saturating_add(1);
        DragTransition {
            transition_id: self.transition_counter,
            from,
            to: self.state,
            effect,
        }
    }
}

fn delta(from: Position, to: Position) -> (f64, f64) {
    (to.x - from.x, to.y - from.y)
}

fn crossed_threshold(origin: Position, current: Position, threshold: f64) -> bool {
    let (dx, dy) = delta(origin, current);
    dx * dx + dy * dy >= threshold * threshold
}
