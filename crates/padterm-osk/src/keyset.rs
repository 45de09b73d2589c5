//! `.keys` special-key-set parsing.
//!
//! One key per line, `display:value[:extra]`, with `\` escaping the next
//! character (needed for literal colons). `value` selects the action:
//!
//! - a quoted string -> a literal, or a macro when it contains an
//!   unescaped `{TOKEN}`
//! - `LOAD_FILE` / `UNLOAD_FILE` -> dynamic-set keys, `extra` holding the
//!   path or name
//! - a `CMD_*` name -> an internal command
//! - anything else -> a synthesized key, with `extra` as a comma-separated
//!   modifier list (`ctrl`, `alt`, `shift`, `gui`/`win`/`super`)
//!
//! Lines starting with `#` and blank lines are ignored; unparsable lines
//! are logged at `debug` and skipped.

use std::fs;
use std::path::Path;

use padterm_input::{KeyCode, Modifiers};
use tracing::{debug, warn};

use crate::key::{KeyAction, OskCommand, OskKey};
use crate::layout::find_layout_token;

/// A named collection of OSK keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialKeySet {
    /// Display name (file basename without the `.keys` suffix for
    /// dynamically loaded sets).
    pub name: String,
    /// Source path for dynamically loaded sets.
    pub file_path: Option<String>,
    pub keys: Vec<OskKey>,
    /// Modifiers this set's keys carry when emitted.
    pub active_mods: Modifiers,
}

impl SpecialKeySet {
    /// Derive a set name from a file path: basename, `.keys` stripped.
    #[must_use]
    pub fn name_for_path(path: &str) -> String {
        let basename = path.rsplit('/').next().unwrap_or(path);
        basename
            .strip_suffix(".keys")
            .unwrap_or(basename)
            .to_string()
    }

    /// Parse set content. Lines that fail to parse are skipped.
    #[must_use]
    pub fn parse(name: impl Into<String>, content: &str) -> Self {
        let keys = content
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(parse_key_line)
            .collect();
        Self {
            name: name.into(),
            file_path: None,
            keys,
            active_mods: Modifiers::empty(),
        }
    }

    /// Load a set from a `.keys` file.
    ///
    /// Returns `None` (with a warning) when the file cannot be read or
    /// yields no keys, matching the never-fatal input policy.
    #[must_use]
    pub fn load(path: &str) -> Option<Self> {
        let content = match fs::read_to_string(Path::new(path)) {
            Ok(content) => content,
            Err(err) => {
                warn!(path, %err, "could not open key set file, skipping");
                return None;
            }
        };
        let mut set = Self::parse(Self::name_for_path(path), &content);
        set.file_path = Some(path.to_string());
        if set.keys.is_empty() {
            warn!(path, "key set file contains no keys, skipping");
            return None;
        }
        Some(set)
    }
}

/// Split a line into up to three fields on unescaped colons.
fn split_fields(line: &str) -> [String; 3] {
    let mut fields = [String::new(), String::new(), String::new()];
    let mut idx = 0;
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' | '\n' => break,
            '\\' => {
                if let Some(next) = chars.next() {
                    fields[idx].push(next);
                }
            }
            ':' if idx < 2 => idx += 1,
            _ => fields[idx].push(ch),
        }
    }
    fields
}

fn parse_key_line(line: &str) -> Option<OskKey> {
    let [display, value, extra] = split_fields(line);
    if display.is_empty() || value.is_empty() {
        debug!(line, "key set line missing display or value");
        return None;
    }

    // Dynamic-set keys: the extra field carries the path or name.
    if value.eq_ignore_ascii_case("LOAD_FILE") {
        return Some(OskKey::new(display, KeyAction::LoadSet(extra)));
    }
    if value.eq_ignore_ascii_case("UNLOAD_FILE") {
        return Some(OskKey::new(display, KeyAction::UnloadSet(extra)));
    }

    if let Some(command) = parse_command(&value) {
        return Some(OskKey::new(display, KeyAction::Command(command)));
    }

    // A quoted value is a literal, or a macro if it contains a real token.
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let content = &value[1..value.len() - 1];
        if contains_unescaped_token(content) {
            return Some(OskKey::new(display, KeyAction::Macro(content.to_string())));
        }
        return Some(OskKey::new(
            display,
            KeyAction::Literal(unescape_braces(content)),
        ));
    }

    let mods = parse_modifier_list(&extra, &display);
    let code = parse_keycode(&value)?;
    Some(OskKey::new(display, KeyAction::Sequence { code, mods }))
}

fn parse_command(value: &str) -> Option<OskCommand> {
    const COMMANDS: &[(&str, OskCommand)] = &[
        ("CMD_FONT_INC", OskCommand::FontInc),
        ("CMD_FONT_DEC", OskCommand::FontDec),
        ("CMD_CURSOR_TOGGLE_VISIBILITY", OskCommand::CursorToggleVisibility),
        ("CMD_CURSOR_TOGGLE_BLINK", OskCommand::CursorToggleBlink),
        ("CMD_CURSOR_CYCLE_STYLE", OskCommand::CursorCycleStyle),
        ("CMD_TERMINAL_RESET", OskCommand::TerminalReset),
        ("CMD_TERMINAL_CLEAR", OskCommand::TerminalClear),
        ("CMD_OSK_TOGGLE_POSITION", OskCommand::OskTogglePosition),
    ];
    COMMANDS
        .iter()
        .find(|(name, _)| value.eq_ignore_ascii_case(name))
        .map(|&(_, cmd)| cmd)
}

/// Scan for an unescaped `{TOKEN}` that names a known layout token.
fn contains_unescaped_token(content: &str) -> bool {
    let mut rest = content;
    while let Some(pos) = rest.find(['\\', '{']) {
        match rest.as_bytes()[pos] {
            b'\\' => {
                // Skip the escaped character.
                let after = &rest[pos + 1..];
                let skip = after.chars().next().map_or(0, char::len_utf8);
                rest = &after[skip..];
            }
            _ => {
                if find_layout_token(&rest[pos..]).is_some() {
                    return true;
                }
                rest = &rest[pos + 1..];
            }
        }
    }
    false
}

/// Unescape `\{` to `{` in a plain literal.
fn unescape_braces(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && chars.peek() == Some(&'{') {
            out.push('{');
            chars.next();
        } else {
            out.push(ch);
        }
    }
    out
}

fn parse_modifier_list(extra: &str, key_display: &str) -> Modifiers {
    let mut mods = Modifiers::empty();
    for word in extra.split(',') {
        let word = word.trim();
        match word.to_ascii_lowercase().as_str() {
            "" => {}
            "ctrl" => mods |= Modifiers::CTRL,
            "alt" => mods |= Modifiers::ALT,
            "shift" => mods |= Modifiers::SHIFT,
            "gui" | "win" | "super" => mods |= Modifiers::GUI,
            other => warn!(modifier = other, key = key_display, "unknown modifier in key set"),
        }
    }
    mods
}

/// Resolve a key name to a key code: case-insensitive aliases first, then
/// well-known names, then single characters.
fn parse_keycode(value: &str) -> Option<KeyCode> {
    let code = match value.to_ascii_lowercase().as_str() {
        "esc" | "escape" => KeyCode::Escape,
        "enter" | "return" => KeyCode::Enter,
        "bs" | "backspace" => KeyCode::Backspace,
        "del" | "delete" => KeyCode::Delete,
        "pgup" | "pageup" => KeyCode::PageUp,
        "pgdn" | "pagedown" => KeyCode::PageDown,
        "tab" => KeyCode::Tab,
        "space" => KeyCode::Char(' '),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "insert" | "ins" => KeyCode::Insert,
        "printscreen" => KeyCode::PrintScreen,
        "scrolllock" => KeyCode::ScrollLock,
        "pause" => KeyCode::Pause,
        name => {
            if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=12).contains(&n) {
                    return Some(KeyCode::F(n));
                }
            }
            let mut chars = value.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Some(KeyCode::Char(c.to_ascii_lowercase()));
            }
            debug!(value, "unresolvable key name in key set");
            return None;
        }
    };
    Some(code)
}
