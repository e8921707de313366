#![forbid(unsafe_code)]

//! Canonical input events consumed by the focus engine.
//!
//! Hosts normalize their platform input (DOM key codes, winit events, remote
//! control scan codes) into [`Event`] values. Key auto-repeat is expressed as
//! repeated [`KeyEventKind::Press`] events with the same [`KeyCode`]; the
//! engine's accelerator decides which repeats get through.

use bitflags::bitflags;

use crate::geometry::Point;

/// Identifier of a node in the host's visual tree.
pub type NodeId = u64;

/// Logical key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyCode {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Backspace,
    Tab,
    /// A printable character.
    Char(char),
    /// Function key `F1..=F24`.
    F(u8),
    /// Any key without a dedicated variant, by raw platform code.
    Other(u32),
}

impl KeyCode {
    /// Map a legacy DOM `keyCode` value.
    ///
    /// Remote-control platforms still deliver these numeric codes, so hosts
    /// embedding the engine in a web view can forward them directly.
    #[must_use]
    pub fn from_dom(code: u32) -> Self {
        match code {
            8 => Self::Backspace,
            9 => Self::Tab,
            13 => Self::Enter,
            27 => Self::Escape,
            37 => Self::Left,
            38 => Self::Up,
            39 => Self::Right,
            40 => Self::Down,
            112..=135 => Self::F((code - 111) as u8),
            48..=57 | 65..=90 => char::from_u32(code)
                .map(|c| Self::Char(c.to_ascii_lowercase()))
                .unwrap_or(Self::Other(code)),
            other => Self::Other(other),
        }
    }

    /// Whether this is one of the four arrow keys.
    #[must_use]
    pub const fn is_arrow(self) -> bool {
        matches!(self, Self::Up | Self::Down | Self::Left | Self::Right)
    }
}

bitflags! {
    /// Modifier keys held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const SUPER = 0b1000;
    }
}

/// Whether a key went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyEventKind {
    /// Key down, including auto-repeat.
    #[default]
    Press,
    /// Key up.
    Release,
}

/// A single key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A key press without modifiers.
    #[must_use]
    pub const fn press(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
            kind: KeyEventKind::Press,
        }
    }

    /// A key release without modifiers.
    #[must_use]
    pub const fn release(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
            kind: KeyEventKind::Release,
        }
    }

    /// Builder: set modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Whether a command modifier (Ctrl/Alt/Super) is held.
    ///
    /// Chorded keys are shortcuts, not navigation.
    #[must_use]
    pub fn is_chord(&self) -> bool {
        self.modifiers
            .intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::SUPER)
    }
}

/// Pointer transition kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PointerKind {
    Move,
    Down,
    Up,
}

/// A pointer event at a position in the shared coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Point,
    /// Node under the pointer as resolved by the host's hit-testing, if any.
    pub target: Option<NodeId>,
}

impl PointerEvent {
    /// Create a pointer event without a host-resolved target.
    #[must_use]
    pub const fn new(kind: PointerKind, position: Point) -> Self {
        Self {
            kind,
            position,
            target: None,
        }
    }

    /// Builder: set the host-resolved target.
    #[must_use]
    pub const fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Raw input delivered to the focus engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    Key(KeyEvent),
    Pointer(PointerEvent),
    /// The platform pointer (cursor) was shown (`true`) or hidden (`false`).
    PointerVisibility(bool),
}

impl From<KeyEvent> for Event {
    fn from(ev: KeyEvent) -> Self {
        Self::Key(ev)
    }
}

impl From<PointerEvent> for Event {
    fn from(ev: PointerEvent) -> Self {
        Self::Pointer(ev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_arrow_codes() {
        assert_eq!(KeyCode::from_dom(37), KeyCode::Left);
        assert_eq!(KeyCode::from_dom(38), KeyCode::Up);
        assert_eq!(KeyCode::from_dom(39), KeyCode::Right);
        assert_eq!(KeyCode::from_dom(40), KeyCode::Down);
        assert_eq!(KeyCode::from_dom(13), KeyCode::Enter);
    }

    #[test]
    fn dom_letters_and_function_keys() {
        assert_eq!(KeyCode::from_dom(65), KeyCode::Char('a'));
        assert_eq!(KeyCode::from_dom(48), KeyCode::Char('0'));
        assert_eq!(KeyCode::from_dom(112), KeyCode::F(1));
        assert_eq!(KeyCode::from_dom(461), KeyCode::Other(461));
    }

    #[test]
    fn arrow_predicate() {
        assert!(KeyCode::Up.is_arrow());
        assert!(!KeyCode::Enter.is_arrow());
    }

    #[test]
    fn chord_detection() {
        let plain = KeyEvent::press(KeyCode::Left);
        assert!(!plain.is_chord());
        assert!(!plain.with_modifiers(Modifiers::SHIFT).is_chord());
        assert!(plain.with_modifiers(Modifiers::CTRL).is_chord());
    }

    #[test]
    fn pointer_builder() {
        let ev = PointerEvent::new(PointerKind::Down, Point::new(1.0, 2.0)).with_target(7);
        assert_eq!(ev.target, Some(7));
        assert_eq!(Event::from(ev), Event::Pointer(ev));
    }
}
