//! VT100 character set translation.
//!
//! Two G-slots are supported, each designated `B` (US-ASCII) or `0` (DEC
//! Special Graphics). Translation applies only to bytes below 128, and the
//! graphics set only remaps the `` ` ``..`~` range.

/// Translate a character through the DEC Special Graphics charset.
///
/// Maps ASCII 0x60-0x7E to Unicode line-drawing and symbol characters.
/// Characters outside this range pass through unchanged.
fn dec_graphics_char(ch: char) -> char {
    match ch {
        '`' => '\u{25C6}', // ◆ diamond
        'a' => '\u{2592}', // ▒ checker board
        'b' => '\u{2409}', // ␉ HT symbol
        'c' => '\u{240C}', // ␌ FF symbol
        'd' => '\u{240D}', // ␍ CR symbol
        'e' => '\u{240A}', // ␊ LF symbol
        'f' => '\u{00B0}', // ° degree sign
        'g' => '\u{00B1}', // ± plus-minus
        'h' => '\u{2424}', // ␤ NL symbol
        'i' => '\u{240B}', // ␋ VT symbol
        'j' => '\u{2518}', // ┘ lower-right corner
        'k' => '\u{2510}', // ┐ upper-right corner
        'l' => '\u{250C}', // ┌ upper-left corner
        'm' => '\u{2514}', // └ lower-left corner
        'n' => '\u{253C}', // ┼ crossing lines
        'o' => '\u{23BA}', // ⎺ scan line 1
        'p' => '\u{23BB}', // ⎻ scan line 3
        'q' => '\u{2500}', // ─ horizontal line
        'r' => '\u{23BC}', // ⎼ scan line 7
        's' => '\u{23BD}', // ⎽ scan line 9
        't' => '\u{251C}', // ├ left tee
        'u' => '\u{2524}', // ┤ right tee
        'v' => '\u{2534}', // ┴ bottom tee
        'w' => '\u{252C}', // ┬ top tee
        'x' => '\u{2502}', // │ vertical line
        'y' => '\u{2264}', // ≤ less-than-or-equal
        'z' => '\u{2265}', // ≥ greater-than-or-equal
        '{' => '\u{03C0}', // π pi
        '|' => '\u{2260}', // ≠ not-equal
        '}' => '\u{00A3}', // £ pound sign
        '~' => '\u{00B7}', // · centered dot
        _ => ch,
    }
}

/// Translate a character through the given charset designator.
///
/// `designator` is the raw byte from the `ESC (` / `ESC )` sequence:
/// `b'0'` selects DEC Special Graphics, anything else is a passthrough.
#[must_use]
pub fn translate_charset(ch: char, designator: u8) -> char {
    match designator {
        b'0' => dec_graphics_char(ch),
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_designator_is_identity() {
        for ch in ' '..='~' {
            assert_eq!(translate_charset(ch, b'B'), ch);
        }
    }

    #[test]
    fn graphics_maps_box_drawing() {
        assert_eq!(translate_charset('q', b'0'), '─');
        assert_eq!(translate_charset('x', b'0'), '│');
        assert_eq!(translate_charset('l', b'0'), '┌');
        assert_eq!(translate_charset('j', b'0'), '┘');
    }

    #[test]
    fn graphics_leaves_uppercase_alone() {
        // Only `..~ is remapped; uppercase letters render as themselves.
        assert_eq!(translate_charset('A', b'0'), 'A');
        assert_eq!(translate_charset('0', b'0'), '0');
    }
}
