//! OSK key descriptors.
//!
//! A key is a display label plus the action selecting it performs. The
//! action variants cover everything a `.kb` or `.keys` file can express,
//! plus the `Inherit` sentinel used for single-slot fallback.

use padterm_input::{KeyCode, Modifiers};

/// Commands a key can issue to the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OskCommand {
    FontInc,
    FontDec,
    CursorToggleVisibility,
    CursorToggleBlink,
    CursorCycleStyle,
    TerminalReset,
    TerminalClear,
    OskTogglePosition,
}

/// What selecting a key does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Write the string to the PTY verbatim.
    Literal(String),
    /// A literal mixed with `{TOKEN}` interpolations, expanded at
    /// selection time (`\{` escapes a brace).
    Macro(String),
    /// Synthesize a keyboard event through the encoder. `mods` are the
    /// key's own modifiers, OR-ed with the effective set at emission.
    Sequence { code: KeyCode, mods: Modifiers },
    /// Flip a one-shot modifier (single-bit mask).
    ModToggle(Modifiers),
    /// Surface an internal command to the embedder.
    Command(OskCommand),
    /// Load a key set from a file path.
    LoadSet(String),
    /// Unload a key set by name.
    UnloadSet(String),
    /// `{N/A}`: defer to the key at the same slot in the base layer.
    Inherit,
}

/// One key on the OSK bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OskKey {
    /// Label shown by the renderer.
    pub label: String,
    pub action: KeyAction,
}

impl OskKey {
    pub fn new(label: impl Into<String>, action: KeyAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }

    /// A plain character key, stored as a synthesizable sequence when the
    /// character is printable ASCII for cleaner modifier handling.
    #[must_use]
    pub fn character(ch: &str) -> Self {
        let mut chars = ch.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if (' '..='~').contains(&c) => Self::new(
                ch,
                KeyAction::Sequence {
                    code: KeyCode::Char(c),
                    mods: Modifiers::empty(),
                },
            ),
            _ => Self::new(ch, KeyAction::Literal(ch.to_string())),
        }
    }

    /// Whether this key is a one-shot modifier toggle.
    #[must_use]
    pub fn is_modifier(&self) -> bool {
        matches!(self.action, KeyAction::ModToggle(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_character_becomes_sequence() {
        let key = OskKey::character("a");
        assert_eq!(
            key.action,
            KeyAction::Sequence {
                code: KeyCode::Char('a'),
                mods: Modifiers::empty()
            }
        );
    }

    #[test]
    fn multibyte_character_becomes_literal() {
        let key = OskKey::character("é");
        assert_eq!(key.action, KeyAction::Literal("é".to_string()));
        assert_eq!(key.label, "é");
    }

    #[test]
    fn modifier_detection() {
        assert!(OskKey::new("Ctrl", KeyAction::ModToggle(Modifiers::CTRL)).is_modifier());
        assert!(!OskKey::character("x").is_modifier());
    }
}
