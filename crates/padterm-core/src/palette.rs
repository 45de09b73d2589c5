//! Color palette: 16 ANSI colors, the derived 256-entry xterm table, and
//! the defaults a theme file can override.
//!
//! A color scheme is a plain `key = value` file:
//!
//! ```text
//! # comment
//! foreground = #d3d7cf
//! background = #2e3436
//! cursor     = #eeeeec
//! color0     = #2e3436
//! ...
//! color15    = #eeeeec
//! ```
//!
//! Missing keys keep their built-in defaults. The xterm table is derived
//! after theming, so entries 0-15 always mirror the (possibly themed) ANSI
//! colors; 16-231 are the 6x6x6 cube and 232-255 the grayscale ramp.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::cell::Rgba;

/// Default 16-color palette (Tango).
const DEFAULT_ANSI: [Rgba; 16] = [
    Rgba::new(46, 52, 54),
    Rgba::new(204, 0, 0),
    Rgba::new(78, 154, 6),
    Rgba::new(196, 160, 0),
    Rgba::new(52, 101, 164),
    Rgba::new(117, 80, 123),
    Rgba::new(6, 152, 154),
    Rgba::new(211, 215, 207),
    Rgba::new(85, 87, 83),
    Rgba::new(239, 41, 41),
    Rgba::new(138, 226, 52),
    Rgba::new(252, 233, 79),
    Rgba::new(114, 159, 207),
    Rgba::new(173, 127, 168),
    Rgba::new(52, 226, 226),
    Rgba::new(238, 238, 236),
];

/// Sentinel initial cursor color; replaced by `default_fg` unless a theme
/// explicitly sets `cursor`.
const INITIAL_CURSOR: Rgba = Rgba::new(238, 238, 236);

/// The terminal's full color state.
#[derive(Debug, Clone)]
pub struct Palette {
    /// The 16 ANSI colors (SGR 30-37 / 90-97 and friends).
    pub ansi: [Rgba; 16],
    /// The 256-entry xterm table (SGR 38;5;N / 48;5;N).
    pub xterm: [Rgba; 256],
    /// Foreground used when no SGR color is active.
    pub default_fg: Rgba,
    /// Background used when no SGR color is active.
    pub default_bg: Rgba,
    /// Cursor fill color.
    pub cursor: Rgba,
}

impl Palette {
    /// Built-in palette with no theme applied.
    #[must_use]
    pub fn new() -> Self {
        Self::with_theme(None)
    }

    /// Build the palette, optionally applying a color-scheme file.
    ///
    /// A missing or unreadable file logs a warning and keeps the defaults;
    /// this mirrors the rest of the crate's never-fatal input policy.
    #[must_use]
    pub fn with_theme(path: Option<&Path>) -> Self {
        let mut palette = Self {
            ansi: DEFAULT_ANSI,
            xterm: [Rgba::default(); 256],
            default_fg: DEFAULT_ANSI[2],
            default_bg: DEFAULT_ANSI[0],
            cursor: INITIAL_CURSOR,
        };

        if let Some(path) = path {
            match fs::read_to_string(path) {
                Ok(content) => palette.apply_theme(&content),
                Err(err) => {
                    warn!(path = %path.display(), %err, "could not open color scheme, using defaults");
                }
            }
        }

        // A theme that never names `cursor` gets the themed foreground.
        if palette.cursor == INITIAL_CURSOR {
            palette.cursor = palette.default_fg;
        }

        palette.rebuild_xterm();
        palette
    }

    /// Apply `key = value` theme lines to the ANSI colors and defaults.
    fn apply_theme(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let Some(value) = value.split_whitespace().next() else {
                continue;
            };
            let Some(color) = parse_color(value) else {
                warn!(key, value, "could not parse theme color");
                continue;
            };

            if let Some(index) = key.strip_prefix("color") {
                match index.parse::<usize>() {
                    Ok(i) if i < 16 => self.ansi[i] = color,
                    _ => {}
                }
            } else {
                match key {
                    "foreground" => self.default_fg = color,
                    "background" => self.default_bg = color,
                    "cursor" => self.cursor = color,
                    _ => {}
                }
            }
        }
    }

    /// Derive the 256-entry xterm table from the current ANSI colors.
    fn rebuild_xterm(&mut self) {
        const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

        self.xterm[..16].copy_from_slice(&self.ansi);

        let mut idx = 16;
        for r in 0..6 {
            for g in 0..6 {
                for b in 0..6 {
                    self.xterm[idx] = Rgba::new(LEVELS[r], LEVELS[g], LEVELS[b]);
                    idx += 1;
                }
            }
        }
        for i in 0..24u16 {
            let gray = (8 + i * 10) as u8;
            self.xterm[idx] = Rgba::new(gray, gray, gray);
            idx += 1;
        }
    }

    /// Override an ANSI palette entry (OSC 4), keeping the xterm table in sync.
    ///
    /// Only indices 0-15 are addressable on the wire.
    pub fn set_indexed(&mut self, index: u8, color: Rgba) {
        if index < 16 {
            self.ansi[index as usize] = color;
            self.xterm[index as usize] = color;
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a hex color: `#RRGGBB`, `RRGGBB`, or `AARRGGBB`.
#[must_use]
pub fn parse_color(spec: &str) -> Option<Rgba> {
    let hex = spec.strip_prefix('#').unwrap_or(spec);
    match hex.len() {
        6 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            Some(Rgba::new(
                ((v >> 16) & 0xFF) as u8,
                ((v >> 8) & 0xFF) as u8,
                (v & 0xFF) as u8,
            ))
        }
        8 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            Some(Rgba {
                a: ((v >> 24) & 0xFF) as u8,
                r: ((v >> 16) & 0xFF) as u8,
                g: ((v >> 8) & 0xFF) as u8,
                b: (v & 0xFF) as u8,
            })
        }
        _ => None,
    }
}

/// Parse an OSC 4 color spec: `rgb:RR/GG/BB` or `#RRGGBB`.
///
/// The `rgb:` components are hex of any width; only the low byte of each is
/// kept, matching how longer X11 specs truncate on an 8-bit channel.
#[must_use]
pub fn parse_osc_color(spec: &str) -> Option<Rgba> {
    if let Some(rest) = spec.strip_prefix("rgb:") {
        let mut parts = rest.split('/');
        let r = u32::from_str_radix(parts.next()?, 16).ok()?;
        let g = u32::from_str_radix(parts.next()?, 16).ok()?;
        let b = u32::from_str_radix(parts.next()?, 16).ok()?;
        if parts.next().is_some() {
            return None;
        }
        return Some(Rgba::new((r & 0xFF) as u8, (g & 0xFF) as u8, (b & 0xFF) as u8));
    }
    if spec.len() == 7 && spec.starts_with('#') {
        return parse_color(spec);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_tango_green_on_dark() {
        let p = Palette::new();
        assert_eq!(p.default_fg, p.ansi[2]);
        assert_eq!(p.default_bg, p.ansi[0]);
        // No theme set the cursor, so it falls back to the foreground.
        assert_eq!(p.cursor, p.default_fg);
    }

    #[test]
    fn xterm_cube_and_grays() {
        let p = Palette::new();
        assert_eq!(p.xterm[16], Rgba::new(0, 0, 0));
        assert_eq!(p.xterm[231], Rgba::new(255, 255, 255));
        assert_eq!(p.xterm[232], Rgba::new(8, 8, 8));
        assert_eq!(p.xterm[255], Rgba::new(238, 238, 238));
        // 16 + 21*36 + 1*6 + 3 -> level indices (5,1,3)
        assert_eq!(p.xterm[16 + 5 * 36 + 6 + 3], Rgba::new(255, 95, 175));
    }

    #[test]
    fn theme_overrides_apply() {
        let mut p = Palette::new();
        p.apply_theme(
            "# a theme\n\
             foreground = #aabbcc\n\
             color1 = ff0000\n\
             cursor = #010203\n\
             bogus line\n\
             color99 = #ffffff\n",
        );
        assert_eq!(p.default_fg, Rgba::new(0xaa, 0xbb, 0xcc));
        assert_eq!(p.ansi[1], Rgba::new(0xff, 0, 0));
        assert_eq!(p.cursor, Rgba::new(1, 2, 3));
    }

    #[test]
    fn themed_cursor_survives_fallback() {
        let dir = std::env::temp_dir().join("padterm-palette-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scheme.theme");
        std::fs::write(&path, "cursor = #123456\nforeground = #654321\n").unwrap();

        let p = Palette::with_theme(Some(&path));
        assert_eq!(p.cursor, Rgba::new(0x12, 0x34, 0x56));
        assert_eq!(p.default_fg, Rgba::new(0x65, 0x43, 0x21));
        // xterm low entries mirror themed ANSI values.
        assert_eq!(p.xterm[0], p.ansi[0]);
    }

    #[test]
    fn missing_theme_file_keeps_defaults() {
        let p = Palette::with_theme(Some(Path::new("/nonexistent/padterm.theme")));
        assert_eq!(p.ansi, DEFAULT_ANSI);
    }

    #[test]
    fn parse_color_forms() {
        assert_eq!(parse_color("#010203"), Some(Rgba::new(1, 2, 3)));
        assert_eq!(parse_color("010203"), Some(Rgba::new(1, 2, 3)));
        assert_eq!(
            parse_color("80010203"),
            Some(Rgba { r: 1, g: 2, b: 3, a: 0x80 })
        );
        assert_eq!(parse_color("#zzz"), None);
        assert_eq!(parse_color("#12345"), None);
    }

    #[test]
    fn parse_osc_color_forms() {
        assert_eq!(parse_osc_color("rgb:ff/80/00"), Some(Rgba::new(255, 128, 0)));
        assert_eq!(parse_osc_color("#ff8000"), Some(Rgba::new(255, 128, 0)));
        // Wide components keep their low byte.
        assert_eq!(parse_osc_color("rgb:ffff/0/0"), Some(Rgba::new(255, 0, 0)));
        assert_eq!(parse_osc_color("ff8000"), None);
        assert_eq!(parse_osc_color("rgb:1/2"), None);
    }

    #[test]
    fn set_indexed_updates_both_tables() {
        let mut p = Palette::new();
        let c = Rgba::new(7, 8, 9);
        p.set_indexed(3, c);
        assert_eq!(p.ansi[3], c);
        assert_eq!(p.xterm[3], c);
        // Out-of-range index is a no-op.
        p.set_indexed(200, c);
        assert_ne!(p.xterm[200], c);
    }
}
