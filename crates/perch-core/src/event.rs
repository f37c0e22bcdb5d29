#![forbid(unsafe_code)]

//! Canonical host events.
//!
//! The host normalizes DOM events (`mouseup`/`pointerup`, `mousedown`,
//! `keydown`, `touchstart`, `touchend`, `selectionchange`, `contextmenu`) into
//! [`HostEvent`] values before dispatching them to the controller.

use bitflags::bitflags;

use crate::dom::NodeId;
use crate::geometry::Position;

bitflags! {
    /// Modifier keys held during an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Meta/Command key.
        const META  = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// Pointer button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Auxiliary,
}

/// A pointer (mouse/pen) event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// `event.target`.
    pub target: NodeId,
    /// `pageX` / `pageY`.
    pub page: Position,
    /// `clientX` / `clientY`.
    pub client: Position,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Pointer event on an unscrolled page (`page == client`).
    #[must_use]
    pub const fn at(target: NodeId, x: f64, y: f64) -> Self {
        Self {
            target,
            page: Position::new(x, y),
            client: Position::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    /// Override the client coordinates.
    #[must_use]
    pub const fn with_client(mut self, x: f64, y: f64) -> Self {
        self.client = Position::new(x, y);
        self
    }
}

/// Keys the panel manager distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Enter,
    Escape,
    Other,
}

impl Key {
    /// Whether this is one of the four arrow keys.
    pub const fn is_arrow(self) -> bool {
        matches!(
            self,
            Self::ArrowLeft | Self::ArrowRight | Self::ArrowUp | Self::ArrowDown
        )
    }
}

/// A `keydown` event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEvent {
    pub target: NodeId,
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub const fn new(target: NodeId, key: Key) -> Self {
        Self {
            target,
            key,
            modifiers: Modifiers::NONE,
        }
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// `Ctrl/Cmd+A` or `Shift+Arrow*`.
    pub fn is_selection_shortcut(&self) -> bool {
        let select_all = self
            .modifiers
            .intersects(Modifiers::CTRL | Modifiers::META)
            && self.key == Key::Char('a');
        let extend = self.modifiers.contains(Modifiers::SHIFT) && self.key.is_arrow();
        select_all || extend
    }

    /// `Shift/Ctrl/Cmd+Enter`, the submit chord of popup textareas.
    pub fn is_submit_chord(&self) -> bool {
        self.key == Key::Enter
            && self
                .modifiers
                .intersects(Modifiers::SHIFT | Modifiers::CTRL | Modifiers::META)
    }
}

/// A touch event, reduced to its first changed touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub target: NodeId,
    /// `changedTouches[0].pageX/pageY`.
    pub page: Position,
}

impl TouchEvent {
    #[must_use]
    pub const fn at(target: NodeId, x: f64, y: f64) -> Self {
        Self {
            target,
            page: Position::new(x, y),
        }
    }
}

/// Canonical input event delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    PointerUp(PointerEvent),
    PointerDown(PointerEvent),
    KeyDown(KeyEvent),
    TouchStart(TouchEvent),
    TouchEnd(TouchEvent),
    SelectionChange,
    ContextMenu(PointerEvent),
}

impl HostEvent {
    /// Stable name used in log records.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PointerUp(_) => "pointerup",
            Self::PointerDown(_) => "pointerdown",
            Self::KeyDown(_) => "keydown",
            Self::TouchStart(_) => "touchstart",
            Self::TouchEnd(_) => "touchend",
            Self::SelectionChange => "selectionchange",
            Self::ContextMenu(_) => "contextmenu",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: NodeId = NodeId(7);

    #[test]
    fn ctrl_a_and_cmd_a_are_selection_shortcuts() {
        let ctrl = KeyEvent::new(T, Key::Char('a')).with_modifiers(Modifiers::CTRL);
        let cmd = KeyEvent::new(T, Key::Char('a')).with_modifiers(Modifiers::META);
        assert!(ctrl.is_selection_shortcut());
        assert!(cmd.is_selection_shortcut());
    }

    #[test]
    fn shift_arrow_is_selection_shortcut() {
        for key in [Key::ArrowLeft, Key::ArrowRight, Key::ArrowUp, Key::ArrowDown] {
            let ev = KeyEvent::new(T, key).with_modifiers(Modifiers::SHIFT);
            assert!(ev.is_selection_shortcut(), "{key:?}");
        }
    }

    #[test]
    fn plain_keys_are_not_shortcuts() {
        assert!(!KeyEvent::new(T, Key::Char('a')).is_selection_shortcut());
        assert!(!KeyEvent::new(T, Key::ArrowLeft).is_selection_shortcut());
        let shift_a = KeyEvent::new(T, Key::Char('a')).with_modifiers(Modifiers::SHIFT);
        assert!(!shift_a.is_selection_shortcut());
    }

    #[test]
    fn submit_chord_requires_modifier() {
        assert!(!KeyEvent::new(T, Key::Enter).is_submit_chord());
        let shift = KeyEvent::new(T, Key::Enter).with_modifiers(Modifiers::SHIFT);
        assert!(shift.is_submit_chord());
    }
}
