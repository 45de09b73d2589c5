//! Terminal mode flags and cursor style.

/// Boolean terminal modes toggled by escape sequences.
///
/// Alternate-screen activation lives on the [`Grid`](crate::Grid), since it
/// changes how lines are addressed rather than how input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes {
    /// DECCKM: cursor keys send `ESC O` sequences instead of `ESC [`.
    pub application_cursor: bool,
    /// DECNKM / DECKPAM: application keypad mode.
    pub application_keypad: bool,
    /// DECTCEM: the cursor is drawn at all.
    pub cursor_visible: bool,
    /// DECAWM: writing past the right margin wraps to the next line.
    pub autowrap: bool,
    /// IRM: new characters shift the rest of the line right.
    pub insert: bool,
    /// DECOM: absolute cursor addressing is relative to the scroll region.
    pub origin: bool,
    /// Whether the cursor blinks (DECSCUSR odd styles, internal toggle).
    pub cursor_blink: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            application_cursor: false,
            application_keypad: false,
            cursor_visible: true,
            autowrap: true,
            insert: false,
            origin: false,
            cursor_blink: true,
        }
    }
}

/// Cursor rendering style selected by DECSCUSR or cycled by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Block,
    Underline,
    Bar,
}

impl CursorStyle {
    /// The next style in Block -> Underline -> Bar -> Block order.
    #[must_use]
    pub fn cycled(self) -> Self {
        match self {
            Self::Block => Self::Underline,
            Self::Underline => Self::Bar,
            Self::Bar => Self::Block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_modes() {
        let m = Modes::default();
        assert!(m.autowrap);
        assert!(m.cursor_visible);
        assert!(m.cursor_blink);
        assert!(!m.application_cursor);
        assert!(!m.insert);
        assert!(!m.origin);
    }

    #[test]
    fn cursor_style_cycle_is_three_long() {
        let s = CursorStyle::Block;
        assert_eq!(s.cycled().cycled().cycled(), CursorStyle::Block);
    }
}
