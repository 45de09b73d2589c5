//! Canonical key event types.
//!
//! These are the logical identities the encoder and the on-screen keyboard
//! traffic in, deliberately independent of any windowing library's keysym
//! scheme. All types derive `Clone`, `PartialEq`, and `Eq` for use in
//! tests and pattern matching.

use bitflags::bitflags;

/// Logical key identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A character key; letters are carried lowercase and shifted by the
    /// encoder when the Shift modifier is present.
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    /// Function key (F1-F12).
    F(u8),
    PrintScreen,
    ScrollLock,
    Pause,
}

bitflags! {
    /// Modifier keys held or latched during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL  = 1 << 1;
        const ALT   = 1 << 2;
        const GUI   = 1 << 3;
    }
}

/// A keyboard event: key plus modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create an event with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// Attach modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_compose() {
        let m = Modifiers::CTRL | Modifiers::SHIFT;
        assert!(m.contains(Modifiers::CTRL));
        assert!(!m.contains(Modifiers::ALT));
    }

    #[test]
    fn key_event_builder() {
        let e = KeyEvent::new(KeyCode::Char('a')).with_modifiers(Modifiers::ALT);
        assert_eq!(e.code, KeyCode::Char('a'));
        assert_eq!(e.modifiers, Modifiers::ALT);
    }
}
