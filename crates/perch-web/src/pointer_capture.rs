#![forbid(unsafe_code)]

//! Deterministic pointer-capture adapter for panel drag handles.
//!
//! This module bridges browser pointer lifecycle signals into
//! [`perch_layout::DragInput`] values while enforcing:
//! - one active pointer at a time,
//! - explicit capture acquire/release commands for JS hosts, and
//! - cancellation on interruption paths (blur/visibility/lost-capture).
//!
//! The adapter does not move panels itself. Callers read the returned
//! [`DragTransition`] and feed its delta into the panel's placement.

use perch_core::{PointerButton, Position};
use perch_layout::{
    DRAG_DEFAULT_THRESHOLD, DragCancelReason, DragEffect, DragInput, DragMachine,
    DragMachineError, DragNoopReason, DragState, DragTransition,
};
use perch_widgets::PanelId;
use serde::{Deserialize, Serialize};

/// Adapter configuration for drag-handle pointer capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureConfig {
    /// Movement (CSS px) before an armed press becomes a drag.
    pub drag_threshold: f64,
    /// Button required to begin a drag sequence.
    pub activation_button: PointerButton,
    /// If true, pointer leave cancels drag when capture was requested but never acknowledged.
    pub cancel_on_leave_without_capture: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            drag_threshold: DRAG_DEFAULT_THRESHOLD,
            activation_button: PointerButton::Primary,
            cancel_on_leave_without_capture: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    Requested,
    Acquired,
}

impl CaptureState {
    const fn is_acquired(self) -> bool {
        matches!(self, Self::Acquired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveCapture {
    pointer_id: u32,
    panel: PanelId,
    button: PointerButton,
    capture_state: CaptureState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DispatchContext {
    phase: CapturePhase,
    pointer_id: Option<u32>,
    panel: Option<PanelId>,
    position: Option<Position>,
}

/// Host command emitted by the adapter for browser pointer-capture control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureCommand {
    Acquire { pointer_id: u32 },
    Release { pointer_id: u32 },
}

/// Lifecycle phase recorded for one adapter dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerCancel,
    PointerLeave,
    Blur,
    VisibilityHidden,
    LostPointerCapture,
    CaptureAcquired,
    PanelRemoved,
}

/// Deterministic reason why an incoming lifecycle signal was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureIgnoredReason {
    InvalidPointerId,
    ButtonNotAllowed,
    ButtonMismatch,
    ActivePointerAlreadyInProgress,
    NoActivePointer,
    PointerMismatch,
    LeaveWhileCaptured,
    MachineRejected(DragNoopReason),
}

/// Outcome category for one lifecycle dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureLogOutcome {
    DragForwarded,
    CaptureStateUpdated,
    Ignored(CaptureIgnoredReason),
}

/// Structured lifecycle log record for one adapter dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureLogEntry {
    pub phase: CapturePhase,
    pub sequence: Option<u64>,
    pub pointer_id: Option<u32>,
    pub panel: Option<PanelId>,
    pub position: Option<Position>,
    pub capture_command: Option<CaptureCommand>,
    pub outcome: CaptureLogOutcome,
}

/// Result of one pointer lifecycle dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureDispatch {
    pub transition: Option<DragTransition>,
    pub capture_command: Option<CaptureCommand>,
    pub log: CaptureLogEntry,
}

impl CaptureDispatch {
    fn ignored(
        phase: CapturePhase,
        reason: CaptureIgnoredReason,
        pointer_id: Option<u32>,
        panel: Option<PanelId>,
        position: Option<Position>,
    ) -> Self {
        Self {
            transition: None,
            capture_command: None,
            log: CaptureLogEntry {
                phase,
                sequence: None,
                pointer_id,
                panel,
                position,
                capture_command: None,
                outcome: CaptureLogOutcome::Ignored(reason),
            },
        }
    }

    fn capture_state_updated(phase: CapturePhase, pointer_id: u32, panel: PanelId) -> Self {
        Self {
            transition: None,
            capture_command: None,
            log: CaptureLogEntry {
                phase,
                sequence: None,
                pointer_id: Some(pointer_id),
                panel: Some(panel),
                position: None,
                capture_command: None,
                outcome: CaptureLogOutcome::CaptureStateUpdated,
            },
        }
    }

    /// Panel whose placement the transition applies to.
    pub fn panel(&self) -> Option<PanelId> {
        self.transition.and(self.log.panel)
    }
}

/// Pointer-capture adapter shared by every panel of a page.
///
/// Only one drag handle can be held at a time, so a single [`DragMachine`]
/// serves all panels; the active capture remembers which panel it belongs to.
#[derive(Debug, Clone)]
pub struct DragCaptureAdapter {
    machine: DragMachine,
    config: CaptureConfig,
    active: Option<ActiveCapture>,
    next_sequence: u64,
}

impl Default for DragCaptureAdapter {
    fn default() -> Self {
        Self {
            machine: DragMachine::default(),
            config: CaptureConfig::default(),
            active: None,
            next_sequence: 1,
        }
    }
}

impl DragCaptureAdapter {
    /// Construct a new adapter with a validated threshold.
    pub fn new(config: CaptureConfig) -> Result<Self, DragMachineError> {
        let machine = DragMachine::new(config.drag_threshold)?;
        Ok(Self {
            machine,
            config,
            active: None,
            next_sequence: 1,
        })
    }

    #[must_use]
    pub const fn config(&self) -> CaptureConfig {
        self.config
    }

    /// Active pointer ID, if any.
    #[must_use]
    pub fn active_pointer_id(&self) -> Option<u32> {
        self.active.map(|active| active.pointer_id)
    }

    /// Panel owning the active pointer, if any.
    #[must_use]
    pub fn active_panel(&self) -> Option<PanelId> {
        self.active.map(|active| active.panel)
    }

    #[must_use]
    pub const fn machine_state(&self) -> DragState {
        self.machine.state()
    }

    /// Handle pointer-down inside a panel. Only presses on the drag handle
    /// arm the machine.
    pub fn pointer_down(
        &mut self,
        panel: PanelId,
        pointer_id: u32,
        button: PointerButton,
        position: Position,
        on_handle: bool,
    ) -> CaptureDispatch {
        if pointer_id == 0 {
            return CaptureDispatch::ignored(
                CapturePhase::PointerDown,
                CaptureIgnoredReason::InvalidPointerId,
                Some(pointer_id),
                Some(panel),
                Some(position),
            );
        }
        if button != self.config.activation_button {
            return CaptureDispatch::ignored(
                CapturePhase::PointerDown,
                CaptureIgnoredReason::ButtonNotAllowed,
                Some(pointer_id),
                Some(panel),
                Some(position),
            );
        }
        if self.active.is_some() {
            return CaptureDispatch::ignored(
                CapturePhase::PointerDown,
                CaptureIgnoredReason::ActivePointerAlreadyInProgress,
                Some(pointer_id),
                Some(panel),
                Some(position),
            );
        }

        let dispatch = self.forward(
            DispatchContext {
                phase: CapturePhase::PointerDown,
                pointer_id: Some(pointer_id),
                panel: Some(panel),
                position: Some(position),
            },
            DragInput::PointerDown {
                pointer_id,
                position,
                on_handle,
            },
            Some(CaptureCommand::Acquire { pointer_id }),
        );
        if dispatch.transition.is_some() {
            self.active = Some(ActiveCapture {
                pointer_id,
                panel,
                button,
                capture_state: CaptureState::Requested,
            });
        }
        dispatch
    }

    /// Mark browser pointer capture as successfully acquired.
    pub fn capture_acquired(&mut self, pointer_id: u32) -> CaptureDispatch {
        let Some(mut active) = self.active else {
            return CaptureDispatch::ignored(
                CapturePhase::CaptureAcquired,
                CaptureIgnoredReason::NoActivePointer,
                Some(pointer_id),
                None,
                None,
            );
        };
        if active.pointer_id != pointer_id {
            return CaptureDispatch::ignored(
                CapturePhase::CaptureAcquired,
                CaptureIgnoredReason::PointerMismatch,
                Some(pointer_id),
                Some(active.panel),
                None,
            );
        }
        active.capture_state = CaptureState::Acquired;
        self.active = Some(active);
        CaptureDispatch::capture_state_updated(CapturePhase::CaptureAcquired, pointer_id, active.panel)
    }

    /// Handle pointer-move during an active drag lifecycle.
    pub fn pointer_move(&mut self, pointer_id: u32, position: Position) -> CaptureDispatch {
        let Some(active) = self.active else {
            return CaptureDispatch::ignored(
                CapturePhase::PointerMove,
                CaptureIgnoredReason::NoActivePointer,
                Some(pointer_id),
                None,
                Some(position),
            );
        };
        if active.pointer_id != pointer_id {
            return CaptureDispatch::ignored(
                CapturePhase::PointerMove,
                CaptureIgnoredReason::PointerMismatch,
                Some(pointer_id),
                Some(active.panel),
                Some(position),
            );
        }
        self.forward(
            DispatchContext {
                phase: CapturePhase::PointerMove,
                pointer_id: Some(pointer_id),
                panel: Some(active.panel),
                position: Some(position),
            },
            DragInput::PointerMove {
                pointer_id,
                position,
            },
            None,
        )
    }

    /// Handle pointer-up and release capture for the active pointer.
    pub fn pointer_up(
        &mut self,
        pointer_id: u32,
        button: PointerButton,
        position: Position,
    ) -> CaptureDispatch {
        let Some(active) = self.active else {
            return CaptureDispatch::ignored(
                CapturePhase::PointerUp,
                CaptureIgnoredReason::NoActivePointer,
                Some(pointer_id),
                None,
                Some(position),
            );
        };
        if active.pointer_id != pointer_id {
            return CaptureDispatch::ignored(
                CapturePhase::PointerUp,
                CaptureIgnoredReason::PointerMismatch,
                Some(pointer_id),
                Some(active.panel),
                Some(position),
            );
        }
        if active.button != button {
            return CaptureDispatch::ignored(
                CapturePhase::PointerUp,
                CaptureIgnoredReason::ButtonMismatch,
                Some(pointer_id),
                Some(active.panel),
                Some(position),
            );
        }

        let dispatch = self.forward(
            DispatchContext {
                phase: CapturePhase::PointerUp,
                pointer_id: Some(pointer_id),
                panel: Some(active.panel),
                position: Some(position),
            },
            DragInput::PointerUp {
                pointer_id,
                position,
            },
            active
                .capture_state
                .is_acquired()
                .then_some(CaptureCommand::Release { pointer_id }),
        );
        if dispatch.transition.is_some() {
            self.active = None;
        }
        dispatch
    }

    /// Handle browser pointer-cancel events.
    pub fn pointer_cancel(&mut self, pointer_id: Option<u32>) -> CaptureDispatch {
        self.cancel_active(
            CapturePhase::PointerCancel,
            pointer_id,
            DragCancelReason::PointerCancel,
            true,
        )
    }

    /// Handle pointer-leave lifecycle events.
    pub fn pointer_leave(&mut self, pointer_id: u32) -> CaptureDispatch {
        let Some(active) = self.active else {
            return CaptureDispatch::ignored(
                CapturePhase::PointerLeave,
                CaptureIgnoredReason::NoActivePointer,
                Some(pointer_id),
                None,
                None,
            );
        };
        if active.pointer_id != pointer_id {
            return CaptureDispatch::ignored(
                CapturePhase::PointerLeave,
                CaptureIgnoredReason::PointerMismatch,
                Some(pointer_id),
                Some(active.panel),
                None,
            );
        }

        if matches!(active.capture_state, CaptureState::Requested)
            && self.config.cancel_on_leave_without_capture
        {
            self.cancel_active(
                CapturePhase::PointerLeave,
                Some(pointer_id),
                DragCancelReason::PointerCancel,
                true,
            )
        } else {
            CaptureDispatch::ignored(
                CapturePhase::PointerLeave,
                CaptureIgnoredReason::LeaveWhileCaptured,
                Some(pointer_id),
                Some(active.panel),
                None,
            )
        }
    }

    /// Handle browser blur.
    pub fn blur(&mut self) -> CaptureDispatch {
        self.cancel_active(CapturePhase::Blur, None, DragCancelReason::Blur, true)
    }

    /// Handle visibility-hidden interruptions.
    pub fn visibility_hidden(&mut self) -> CaptureDispatch {
        self.cancel_active(
            CapturePhase::VisibilityHidden,
            None,
            DragCancelReason::VisibilityHidden,
            true,
        )
    }

    /// Handle `lostpointercapture`; emits cancel and clears active state.
    pub fn lost_pointer_capture(&mut self, pointer_id: u32) -> CaptureDispatch {
        self.cancel_active(
            CapturePhase::LostPointerCapture,
            Some(pointer_id),
            DragCancelReason::LostPointerCapture,
            false,
        )
    }

    /// Cancel the active drag if it belongs to `panel`, which is going away.
    pub fn panel_removed(&mut self, panel: PanelId) -> Option<CaptureDispatch> {
        if self.active_panel() != Some(panel) {
            return None;
        }
        Some(self.cancel_active(
            CapturePhase::PanelRemoved,
            None,
            DragCancelReason::PanelRemoved,
            true,
        ))
    }

    fn cancel_active(
        &mut self,
        phase: CapturePhase,
        pointer_id: Option<u32>,
        reason: DragCancelReason,
        release_capture: bool,
    ) -> CaptureDispatch {
        let Some(active) = self.active else {
            return CaptureDispatch::ignored(
                phase,
                CaptureIgnoredReason::NoActivePointer,
                pointer_id,
                None,
                None,
            );
        };
        if let Some(id) = pointer_id
            && id != active.pointer_id
        {
            return CaptureDispatch::ignored(
                phase,
                CaptureIgnoredReason::PointerMismatch,
                Some(id),
                Some(active.panel),
                None,
            );
        }

        let command = (release_capture && active.capture_state.is_acquired()).then_some(
            CaptureCommand::Release {
                pointer_id: active.pointer_id,
            },
        );
        let dispatch = self.forward(
            DispatchContext {
                phase,
                pointer_id: Some(active.pointer_id),
                panel: Some(active.panel),
                position: None,
            },
            DragInput::Cancel { reason },
            command,
        );
        if dispatch.transition.is_some() {
            self.active = None;
        }
        dispatch
    }

    fn forward(
        &mut self,
        context: DispatchContext,
        input: DragInput,
        capture_command: Option<CaptureCommand>,
    ) -> CaptureDispatch {
        let sequence = self.next_sequence();
        let transition = self.machine.apply(input);
        match transition.effect {
            // Sub-threshold moves are accepted; they just carry no delta yet.
            DragEffect::Noop { reason } if reason != DragNoopReason::ThresholdNotReached => {
                CaptureDispatch::ignored(
                    context.phase,
                    CaptureIgnoredReason::MachineRejected(reason),
                    context.pointer_id,
                    context.panel,
                    context.position,
                )
            }
            _ => {
                tracing::trace!(
                    message = "capture.forward",
                    sequence,
                    transition_id = transition.transition_id,
                    phase = ?context.phase
                );
                CaptureDispatch {
                    transition: Some(transition),
                    capture_command,
                    log: CaptureLogEntry {
                        phase: context.phase,
                        sequence: Some(sequence),
                        pointer_id: context.pointer_id,
                        panel: context.panel,
                        position: context.position,
                        capture_command,
                        outcome: CaptureLogOutcome::DragForwarded,
                    },
                }
            }
        }
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        sequence
    }
}
