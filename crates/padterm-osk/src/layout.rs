//! `.kb` character layout parsing.
//!
//! A layout file is a sequence of sections:
//!
//! ```text
//! [default]
//! qwertyuiop
//! ...
//!
//! [shift]
//! QWERTYUIOP
//! {DEFAULT}
//! A{N/A}C
//! ```
//!
//! A section header names the *layer key*: `default`/`normal` or a `+`- or
//! comma-separated list of modifier words, case-insensitive. An optional
//! `:suffix` names the *active modifier mask* the layer's keys carry when
//! emitted (distinct from the layer key itself). Rows are sequences of
//! `{TOKEN}`s, `\X` escapes, and literal UTF-8 characters; a line that is
//! exactly `{DEFAULT}` inherits the whole row from the base layer.

use padterm_input::{KeyCode, Modifiers};
use tracing::{debug, warn};

use crate::key::{KeyAction, OskKey};

/// Number of modifier-mask layers (4 modifier bits).
pub const NUM_LAYERS: usize = 16;

/// The built-in QWERTY layout used when no `.kb` file is given or the
/// given one fails to parse.
pub const DEFAULT_LAYOUT: &str = "\
[default]\n\
qwertyuiop\n\
asdfghjkl\n\
zxcvbnm\n\
-=[]\\\\;',./_+{}|:\"<>?\n\
`1234567890\n\
\n\
[SHIFT]\n\
QWERTYUIOP\n\
ASDFGHJKL\n\
ZXCVBNM\n\
{ESC}{F1}{F2}{F3}{F4}{F5}{F6}{F7}{F8}{F9}{F10}{F11}{F12}\n\
~!@#$%^&*()\n";

/// What a layout token expands to.
#[derive(Debug, Clone, Copy)]
enum TokenKind {
    Sequence(KeyCode),
    ModToggle(Modifiers),
    /// `{N/A}`: single-slot fallback marker.
    Inherit,
    /// `{DEFAULT}`: whole-row fallback when it is the entire line; acts
    /// like `{N/A}` when embedded mid-row.
    RowDefault,
}

struct LayoutToken {
    token: &'static str,
    label: &'static str,
    kind: TokenKind,
}

/// Token table, ordered by length (descending) so prefixes resolve
/// correctly (`{F1}` vs `{F10}`).
const LAYOUT_TOKENS: &[LayoutToken] = &[
    LayoutToken { token: "{DEFAULT}", label: "", kind: TokenKind::RowDefault },
    LayoutToken { token: "{ENTER}", label: "ENT", kind: TokenKind::Sequence(KeyCode::Enter) },
    LayoutToken { token: "{SPACE}", label: "Space", kind: TokenKind::Sequence(KeyCode::Char(' ')) },
    LayoutToken { token: "{SHIFT}", label: "Shift", kind: TokenKind::ModToggle(Modifiers::SHIFT) },
    LayoutToken { token: "{RIGHT}", label: "RIGHT", kind: TokenKind::Sequence(KeyCode::Right) },
    LayoutToken { token: "{PGUP}", label: "PGUP", kind: TokenKind::Sequence(KeyCode::PageUp) },
    LayoutToken { token: "{PGDN}", label: "PGDN", kind: TokenKind::Sequence(KeyCode::PageDown) },
    LayoutToken { token: "{CTRL}", label: "Ctrl", kind: TokenKind::ModToggle(Modifiers::CTRL) },
    LayoutToken { token: "{LEFT}", label: "LEFT", kind: TokenKind::Sequence(KeyCode::Left) },
    LayoutToken { token: "{HOME}", label: "HOME", kind: TokenKind::Sequence(KeyCode::Home) },
    LayoutToken { token: "{DOWN}", label: "DOWN", kind: TokenKind::Sequence(KeyCode::Down) },
    LayoutToken { token: "{F10}", label: "F10", kind: TokenKind::Sequence(KeyCode::F(10)) },
    LayoutToken { token: "{F11}", label: "F11", kind: TokenKind::Sequence(KeyCode::F(11)) },
    LayoutToken { token: "{F12}", label: "F12", kind: TokenKind::Sequence(KeyCode::F(12)) },
    LayoutToken { token: "{N/A}", label: "", kind: TokenKind::Inherit },
    LayoutToken { token: "{ESC}", label: "ESC", kind: TokenKind::Sequence(KeyCode::Escape) },
    LayoutToken { token: "{TAB}", label: "TAB", kind: TokenKind::Sequence(KeyCode::Tab) },
    LayoutToken { token: "{END}", label: "END", kind: TokenKind::Sequence(KeyCode::End) },
    LayoutToken { token: "{INS}", label: "INS", kind: TokenKind::Sequence(KeyCode::Insert) },
    LayoutToken { token: "{DEL}", label: "DEL", kind: TokenKind::Sequence(KeyCode::Delete) },
    LayoutToken { token: "{ALT}", label: "Alt", kind: TokenKind::ModToggle(Modifiers::ALT) },
    LayoutToken { token: "{GUI}", label: "GUI", kind: TokenKind::ModToggle(Modifiers::GUI) },
    LayoutToken { token: "{UP}", label: "UP", kind: TokenKind::Sequence(KeyCode::Up) },
    LayoutToken { token: "{BS}", label: "BS", kind: TokenKind::Sequence(KeyCode::Backspace) },
    LayoutToken { token: "{F1}", label: "F1", kind: TokenKind::Sequence(KeyCode::F(1)) },
    LayoutToken { token: "{F2}", label: "F2", kind: TokenKind::Sequence(KeyCode::F(2)) },
    LayoutToken { token: "{F3}", label: "F3", kind: TokenKind::Sequence(KeyCode::F(3)) },
    LayoutToken { token: "{F4}", label: "F4", kind: TokenKind::Sequence(KeyCode::F(4)) },
    LayoutToken { token: "{F5}", label: "F5", kind: TokenKind::Sequence(KeyCode::F(5)) },
    LayoutToken { token: "{F6}", label: "F6", kind: TokenKind::Sequence(KeyCode::F(6)) },
    LayoutToken { token: "{F7}", label: "F7", kind: TokenKind::Sequence(KeyCode::F(7)) },
    LayoutToken { token: "{F8}", label: "F8", kind: TokenKind::Sequence(KeyCode::F(8)) },
    LayoutToken { token: "{F9}", label: "F9", kind: TokenKind::Sequence(KeyCode::F(9)) },
];

/// Look up a `{TOKEN}` at the start of `s`. Used by both the layout
/// parser and macro expansion.
pub(crate) fn find_layout_token(s: &str) -> Option<(&'static str, OskKey)> {
    for entry in LAYOUT_TOKENS {
        if let Some(key) = s.strip_prefix(entry.token).map(|_| token_key(entry)) {
            return Some((entry.token, key));
        }
    }
    None
}

fn token_key(entry: &LayoutToken) -> OskKey {
    let action = match entry.kind {
        TokenKind::Sequence(code) => KeyAction::Sequence {
            code,
            mods: Modifiers::empty(),
        },
        TokenKind::ModToggle(m) => KeyAction::ModToggle(m),
        TokenKind::Inherit | TokenKind::RowDefault => KeyAction::Inherit,
    };
    OskKey::new(entry.label, action)
}

/// One populated row of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyRow {
    pub keys: Vec<OskKey>,
    /// Modifiers the section declared as *active*: they ride along on
    /// every key emitted from this row.
    pub active_mods: Modifiers,
}

/// A row slot within a layer: either populated or inheriting wholesale
/// from the base layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutRow {
    /// `{DEFAULT}` whole-row marker.
    Inherit { active_mods: Modifiers },
    Row(KeyRow),
}

/// The 16 modifier-mask layers of a character layout.
#[derive(Debug, Clone, Default)]
pub struct CharLayout {
    layers: [Option<Vec<LayoutRow>>; NUM_LAYERS],
}

impl CharLayout {
    /// Parse layout content. Returns `None` when no base (`[default]`)
    /// layer is present, which would leave the character view unusable.
    #[must_use]
    pub fn parse(content: &str) -> Option<Self> {
        let mut layout = Self::default();
        let mut current: Option<(usize, Modifiers)> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(section) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                match parse_section_header(section) {
                    // The layer itself materializes with its first row, so
                    // an empty section never triggers a layer switch.
                    Some((layer_mask, active_mods)) => {
                        current = Some((layer_mask.bits() as usize, active_mods));
                    }
                    None => {
                        warn!(section, "invalid layout section header, skipping section");
                        current = None;
                    }
                }
                continue;
            }

            let Some((layer_idx, active_mods)) = current else {
                continue;
            };
            let rows = layout.layers[layer_idx].get_or_insert_with(Vec::new);
            if line == "{DEFAULT}" {
                rows.push(LayoutRow::Inherit { active_mods });
            } else {
                rows.push(LayoutRow::Row(parse_layout_line(line, active_mods)));
            }
        }

        if layout.layers[0].is_none() {
            return None;
        }
        Some(layout)
    }

    /// Parse a layout, falling back to the built-in QWERTY layout on error.
    #[must_use]
    pub fn parse_or_default(content: Option<&str>) -> Self {
        if let Some(content) = content {
            if let Some(layout) = Self::parse(content) {
                return layout;
            }
            warn!("could not parse OSK layout, using the default");
        }
        Self::parse(DEFAULT_LAYOUT).expect("built-in layout parses")
    }

    /// Whether a layer exists for this exact modifier mask.
    ///
    /// This is the layer-switch test: held modifiers matching a populated
    /// layer are consumed by the switch instead of riding on key events.
    #[must_use]
    pub fn layer_exists(&self, mask: Modifiers) -> bool {
        self.layers[mask.bits() as usize].is_some()
    }

    fn layer(&self, idx: usize) -> Option<&Vec<LayoutRow>> {
        self.layers[idx].as_ref()
    }

    /// Number of rows visible under `held`: the most specific existing
    /// subset layer wins.
    #[must_use]
    pub fn num_rows(&self, held: Modifiers) -> usize {
        let target = held.bits() as usize;
        for mask in (0..=target).rev() {
            if target & mask == mask {
                if let Some(rows) = self.layer(mask) {
                    return rows.len();
                }
            }
        }
        0
    }

    /// Resolve the effective row for `(set_idx, held)`.
    ///
    /// Walks masks from most to least specific among subsets of `held`;
    /// a populated row wins, a whole-row `{DEFAULT}` marker falls through
    /// to the base layer, and a base-layer marker yields no row.
    #[must_use]
    pub fn effective_row(&self, set_idx: usize, held: Modifiers) -> Option<&KeyRow> {
        let target = held.bits() as usize;
        for mask in (0..=target).rev() {
            if target & mask != mask {
                continue;
            }
            let Some(rows) = self.layer(mask) else {
                continue;
            };
            match rows.get(set_idx) {
                Some(LayoutRow::Row(row)) => return Some(row),
                Some(LayoutRow::Inherit { .. }) => break,
                // Row index out of range for this layer: keep descending.
                None => continue,
            }
        }
        match self.layer(0)?.get(set_idx) {
            Some(LayoutRow::Row(row)) => Some(row),
            _ => None,
        }
    }

    /// Resolve the effective key for `(set_idx, char_idx, held)`.
    ///
    /// Same descent as [`effective_row`](Self::effective_row) plus the
    /// single-slot rule: an `{N/A}` key defers to the base layer's key at
    /// the same slot.
    #[must_use]
    pub fn effective_key(
        &self,
        set_idx: usize,
        char_idx: usize,
        held: Modifiers,
    ) -> Option<&OskKey> {
        let default_key = self
            .layer(0)
            .and_then(|rows| match rows.get(set_idx) {
                Some(LayoutRow::Row(row)) => row.keys.get(char_idx),
                _ => None,
            })
            .filter(|key| key.action != KeyAction::Inherit);

        let target = held.bits() as usize;
        for mask in (0..=target).rev() {
            if target & mask != mask {
                continue;
            }
            let Some(rows) = self.layer(mask) else {
                continue;
            };
            match rows.get(set_idx) {
                Some(LayoutRow::Inherit { .. }) => return default_key,
                Some(LayoutRow::Row(row)) => {
                    let Some(key) = row.keys.get(char_idx) else {
                        return None;
                    };
                    if key.action == KeyAction::Inherit {
                        return default_key;
                    }
                    return Some(key);
                }
                None => continue,
            }
        }
        default_key
    }
}

/// Parse a `[show]` or `[show:active]` section header into (layer key,
/// active modifier mask).
fn parse_section_header(section: &str) -> Option<(Modifiers, Modifiers)> {
    let (show, active) = match section.split_once(':') {
        Some((show, active)) => (show, Some(active)),
        None => (section, None),
    };
    let show_mask = parse_modifier_words(show)?;
    let active_mask = match active {
        Some(active) if !active.trim().is_empty() => parse_modifier_words(active)?,
        _ => Modifiers::empty(),
    };
    Some((show_mask, active_mask))
}

/// Parse `+`- or comma-separated modifier words, case-insensitive.
/// `default` and `normal` name the empty mask.
fn parse_modifier_words(words: &str) -> Option<Modifiers> {
    let mut mask = Modifiers::empty();
    for word in words.split(['+', ',']) {
        let word = word.trim().to_ascii_lowercase();
        match word.as_str() {
            "" | "default" | "normal" => {}
            "shift" => mask |= Modifiers::SHIFT,
            "ctrl" | "ctl" => mask |= Modifiers::CTRL,
            "alt" => mask |= Modifiers::ALT,
            "gui" => mask |= Modifiers::GUI,
            other => {
                warn!(word = other, "unknown modifier in layout section");
                return None;
            }
        }
    }
    Some(mask)
}

/// Parse one row of keys: tokens, `\X` escapes, and literal characters.
fn parse_layout_line(line: &str, active_mods: Modifiers) -> KeyRow {
    let mut keys = Vec::new();
    let mut rest = line;

    while !rest.is_empty() {
        if rest.starts_with('{') {
            if let Some((token, key)) = find_layout_token(rest) {
                keys.push(key);
                rest = &rest[token.len()..];
                continue;
            }
        }

        if let Some(after) = rest.strip_prefix('\\') {
            if let Some(ch) = after.chars().next() {
                keys.push(OskKey::character(&after[..ch.len_utf8()]));
                rest = &after[ch.len_utf8()..];
                continue;
            }
            debug!("trailing backslash in layout row");
            break;
        }

        let ch = rest.chars().next().expect("rest is non-empty");
        keys.push(OskKey::character(&rest[..ch.len_utf8()]));
        rest = &rest[ch.len_utf8()..];
    }

    KeyRow { keys, active_mods }
}
