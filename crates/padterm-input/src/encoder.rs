//! Key-to-byte-sequence encoder.
//!
//! Translates a `(key, modifiers, terminal-mode snapshot)` tuple into the
//! bytes a shell expects. Precedence, first match wins:
//!
//! 1. Ctrl + letter -> the C0 control byte.
//! 2. Ctrl + Space -> NUL.
//! 3. Ctrl + arrow -> the fixed `CSI 1;5` sequences.
//! 4. Alt + printable -> ESC then the character (uppercased under Shift).
//! 5. Alt + Backspace -> `ESC DEL`.
//! 6. Arrows and Home/End -> `ESC O` variants in application-cursor mode,
//!    `ESC [` variants otherwise.
//! 7. The standard special keys (Enter, Tab, function keys, ...).
//! 8. Printable ASCII as a single byte, uppercased under Shift.
//!
//! Composed text delivered by the OS bypasses all of this and is written
//! verbatim; [`is_text_input_duplicate`] is the key-down-path filter that
//! prevents double emission for keys the text path already covers.

use crate::event::{KeyCode, Modifiers};

// Arrow and Home/End sequences in both cursor-key modes.
const SEQ_UP_NORMAL: &[u8] = b"\x1b[A";
const SEQ_UP_APP: &[u8] = b"\x1bOA";
const SEQ_DOWN_NORMAL: &[u8] = b"\x1b[B";
const SEQ_DOWN_APP: &[u8] = b"\x1bOB";
const SEQ_RIGHT_NORMAL: &[u8] = b"\x1b[C";
const SEQ_RIGHT_APP: &[u8] = b"\x1bOC";
const SEQ_LEFT_NORMAL: &[u8] = b"\x1b[D";
const SEQ_LEFT_APP: &[u8] = b"\x1bOD";
const SEQ_HOME_NORMAL: &[u8] = b"\x1b[1~";
const SEQ_HOME_APP: &[u8] = b"\x1bOH";
const SEQ_END_NORMAL: &[u8] = b"\x1b[4~";
const SEQ_END_APP: &[u8] = b"\x1bOF";

/// The terminal modes the encoder consults.
///
/// A snapshot rather than a borrow, so the host can hand it across the
/// OSK emission path without tying lifetimes together.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermModeView {
    /// DECCKM: arrows and Home/End send `ESC O` sequences.
    pub application_cursor: bool,
}

/// Encode a key event into the bytes to write to the PTY.
///
/// Unencodable combinations produce an empty vector.
#[must_use]
pub fn encode_key(code: KeyCode, mods: Modifiers, modes: TermModeView) -> Vec<u8> {
    let shift = mods.contains(Modifiers::SHIFT);

    if mods.contains(Modifiers::CTRL) {
        match code {
            KeyCode::Char(c) if c.is_ascii_alphabetic() => {
                return vec![c.to_ascii_lowercase() as u8 - b'a' + 1];
            }
            KeyCode::Char(' ') => return vec![0],
            KeyCode::Up => return b"\x1b[1;5A".to_vec(),
            KeyCode::Down => return b"\x1b[1;5B".to_vec(),
            KeyCode::Right => return b"\x1b[1;5C".to_vec(),
            KeyCode::Left => return b"\x1b[1;5D".to_vec(),
            _ => {}
        }
    }

    if mods.contains(Modifiers::ALT) {
        match code {
            KeyCode::Char(c) if (' '..='z').contains(&c) => {
                let c = if shift && c.is_ascii_alphabetic() {
                    c.to_ascii_uppercase()
                } else {
                    c
                };
                return vec![0x1b, c as u8];
            }
            KeyCode::Backspace => return b"\x1b\x7f".to_vec(),
            _ => {}
        }
    }

    if modes.application_cursor {
        match code {
            KeyCode::Up => return SEQ_UP_APP.to_vec(),
            KeyCode::Down => return SEQ_DOWN_APP.to_vec(),
            KeyCode::Right => return SEQ_RIGHT_APP.to_vec(),
            KeyCode::Left => return SEQ_LEFT_APP.to_vec(),
            KeyCode::Home => return SEQ_HOME_APP.to_vec(),
            KeyCode::End => return SEQ_END_APP.to_vec(),
            _ => {}
        }
    }

    let standard: Option<&[u8]> = match code {
        KeyCode::Enter => Some(b"\r"),
        KeyCode::Backspace => Some(b"\x7f"),
        KeyCode::Tab => Some(b"\t"),
        KeyCode::Escape => Some(b"\x1b"),
        KeyCode::PageUp => Some(b"\x1b[5~"),
        KeyCode::PageDown => Some(b"\x1b[6~"),
        KeyCode::Up => Some(SEQ_UP_NORMAL),
        KeyCode::Down => Some(SEQ_DOWN_NORMAL),
        KeyCode::Right => Some(SEQ_RIGHT_NORMAL),
        KeyCode::Left => Some(SEQ_LEFT_NORMAL),
        KeyCode::Home => Some(SEQ_HOME_NORMAL),
        KeyCode::End => Some(SEQ_END_NORMAL),
        KeyCode::Insert => Some(b"\x1b[2~"),
        KeyCode::Delete => Some(b"\x1b[3~"),
        KeyCode::F(1) => Some(b"\x1bOP"),
        KeyCode::F(2) => Some(b"\x1bOQ"),
        KeyCode::F(3) => Some(b"\x1bOR"),
        KeyCode::F(4) => Some(b"\x1bOS"),
        KeyCode::F(5) => Some(b"\x1b[15~"),
        KeyCode::F(6) => Some(b"\x1b[17~"),
        KeyCode::F(7) => Some(b"\x1b[18~"),
        KeyCode::F(8) => Some(b"\x1b[19~"),
        KeyCode::F(9) => Some(b"\x1b[20~"),
        KeyCode::F(10) => Some(b"\x1b[21~"),
        KeyCode::F(11) => Some(b"\x1b[23~"),
        KeyCode::F(12) => Some(b"\x1b[24~"),
        KeyCode::PrintScreen => Some(b"\x1b[29~"),
        KeyCode::ScrollLock => Some(b"\x1b[31~"),
        KeyCode::Pause => Some(b"\x1b[32~"),
        _ => None,
    };
    if let Some(seq) = standard {
        return seq.to_vec();
    }

    if let KeyCode::Char(c) = code {
        if (' '..='~').contains(&c) {
            let c = if shift && c.is_ascii_alphabetic() {
                c.to_ascii_uppercase()
            } else {
                c
            };
            return vec![c as u8];
        }
    }

    Vec::new()
}

/// Mouse-wheel escape sequence: positive direction scrolls up.
#[must_use]
pub fn wheel_sequence(direction: i32) -> Option<&'static [u8]> {
    match direction {
        d if d > 0 => Some(SEQ_UP_NORMAL),
        d if d < 0 => Some(SEQ_DOWN_NORMAL),
        _ => None,
    }
}

/// Whether a key-down event duplicates a composed text event.
///
/// The OS text-input path already delivers printable characters; the
/// key-down path must drop them unless a non-Shift modifier changes the
/// encoding. The on-screen keyboard calls [`encode_key`] directly and is
/// unaffected by this filter.
#[must_use]
pub fn is_text_input_duplicate(code: KeyCode, mods: Modifiers) -> bool {
    if mods.intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::GUI) {
        return false;
    }
    matches!(code, KeyCode::Char(c) if (' '..='~').contains(&c))
}
