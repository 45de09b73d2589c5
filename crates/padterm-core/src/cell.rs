//! Terminal glyph: the fundamental unit of the grid.
//!
//! Each glyph stores one Unicode scalar and its resolved colors and text
//! attributes. Colors are stored fully resolved (RGBA) rather than as palette
//! indices: SGR handling looks colors up in the [`Palette`](crate::Palette) at
//! write time, which is what makes OSC 4 overrides take effect only for
//! subsequently written cells.

use bitflags::bitflags;

/// An 8-bit-per-channel RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Create an opaque color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

bitflags! {
    /// Text attribute flags carried by each glyph.
    ///
    /// Maps directly to the SGR parameter values the parser accepts
    /// (1/3/4/5/7 set, 22/23/24/25/27 clear).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u8 {
        const BOLD      = 1 << 0;
        const ITALIC    = 1 << 1;
        const UNDERLINE = 1 << 2;
        const INVERSE   = 1 << 3;
        const BLINK     = 1 << 4;
    }
}

/// A single cell of the terminal grid.
///
/// Cell width is always one column; wide characters are out of scope for
/// this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// The character content. A space for empty/erased cells.
    pub ch: char,
    /// Foreground color, fully resolved.
    pub fg: Rgba,
    /// Background color, fully resolved.
    pub bg: Rgba,
    /// Text attributes.
    pub attrs: AttrFlags,
}

impl Glyph {
    /// Create a glyph with the given content and paint.
    #[must_use]
    pub const fn new(ch: char, fg: Rgba, bg: Rgba, attrs: AttrFlags) -> Self {
        Self { ch, fg, bg, attrs }
    }

    /// A blank (space) glyph with the given paint.
    ///
    /// Erase and scroll operations fill vacated cells with this, using the
    /// *current* colors and attributes, so cleared regions inherit the
    /// active background.
    #[must_use]
    pub const fn blank(fg: Rgba, bg: Rgba, attrs: AttrFlags) -> Self {
        Self::new(' ', fg, bg, attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_glyph_is_space_with_paint() {
        let fg = Rgba::new(1, 2, 3);
        let bg = Rgba::new(4, 5, 6);
        let g = Glyph::blank(fg, bg, AttrFlags::BOLD);
        assert_eq!(g.ch, ' ');
        assert_eq!(g.fg, fg);
        assert_eq!(g.bg, bg);
        assert_eq!(g.attrs, AttrFlags::BOLD);
    }

    #[test]
    fn rgba_new_is_opaque() {
        assert_eq!(Rgba::new(9, 9, 9).a, 255);
    }

    #[test]
    fn attr_flags_compose() {
        let mut attrs = AttrFlags::BOLD | AttrFlags::UNDERLINE;
        attrs.remove(AttrFlags::BOLD);
        assert_eq!(attrs, AttrFlags::UNDERLINE);
    }
}
