//! The on-screen keyboard state machine.
//!
//! [`Osk`] owns the layered character layout, the special key sets, the
//! one-shot and held modifier state, and the selection cursor. Navigation
//! actions mutate the selection; `Select` runs the emission engine, which
//! writes bytes through the caller-supplied sink and reports internal
//! commands back up for the embedder to execute.
//!
//! # Modifier discipline
//!
//! - *One-shot* modifiers are latched by on-screen keys and clear after
//!   the first non-modifier, non-macro key emission.
//! - *Held* modifiers mirror physical buttons and clear only on release.
//! - A held combination exactly matching a populated layout layer is
//!   consumed by the layer switch: it changes what the rows show instead
//!   of riding along on emitted key events.

use padterm_input::{encode_key, KeyCode, Modifiers, TermModeView};
use tracing::debug;

use crate::key::{KeyAction, OskCommand, OskKey};
use crate::keyset::SpecialKeySet;
use crate::layout::{find_layout_token, CharLayout, KeyRow};

/// Which view the OSK bar shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OskMode {
    #[default]
    Chars,
    Special,
}

/// Where the bar sits relative to the terminal cursor's screen half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionMode {
    /// Opposite half from the cursor (default: stay out of the way).
    #[default]
    Opposite,
    /// Same half as the cursor.
    Same,
}

/// Navigation and selection actions routed to the OSK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OskAction {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Space,
    Tab,
    Enter,
}

/// What an action did, for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionOutcome {
    /// An internal command for the embedder to execute.
    pub command: Option<OskCommand>,
    /// Whether the OSK view changed and needs a repaint.
    pub redraw: bool,
}

impl ActionOutcome {
    fn redraw() -> Self {
        Self {
            command: None,
            redraw: true,
        }
    }
}

/// Renderer-facing snapshot of the OSK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OskView<'a> {
    pub active: bool,
    pub mode: OskMode,
    pub position_mode: PositionMode,
    pub set_idx: usize,
    pub char_idx: usize,
    /// Labels of the current row, post fallback resolution.
    pub row: Vec<&'a str>,
    /// Latched-state flags per key (modifier toggles light up).
    pub toggled: Vec<bool>,
    /// Set-name banner to show, if any (Special mode, right after a switch).
    pub set_name: Option<&'a str>,
    /// Modifier indicator bits: one-shots, non-consumed held modifiers,
    /// and the current row's active mask.
    pub indicators: Modifiers,
    /// Bumped whenever cached key artwork must be rebuilt.
    pub generation: u64,
}

/// A discovered-but-not-necessarily-loaded key set.
#[derive(Debug, Clone)]
struct AvailableSet {
    name: String,
    path: String,
}

/// The on-screen keyboard model.
#[derive(Debug)]
pub struct Osk {
    layout: CharLayout,
    active: bool,
    mode: OskMode,
    position_mode: PositionMode,
    set_idx: usize,
    char_idx: usize,

    one_shot: Modifiers,
    held: Modifiers,

    /// All selectable special sets; index 0 is always `CONTROL`.
    sets: Vec<SpecialKeySet>,
    /// Sets discovered via `make_set_available` (or loads), by name+path.
    available: Vec<AvailableSet>,
    /// Names of currently loaded dynamic sets.
    loaded: Vec<String>,

    show_set_name: bool,
    /// Render-cache generation; bumped when key artwork goes stale.
    generation: u64,
}

impl Osk {
    /// Build the model from optional layout content.
    #[must_use]
    pub fn new(layout_content: Option<&str>) -> Self {
        let mut osk = Self {
            layout: CharLayout::parse_or_default(layout_content),
            active: false,
            mode: OskMode::Chars,
            position_mode: PositionMode::Opposite,
            set_idx: 0,
            char_idx: 0,
            one_shot: Modifiers::empty(),
            held: Modifiers::empty(),
            sets: vec![SpecialKeySet {
                name: "CONTROL".to_string(),
                file_path: None,
                keys: Vec::new(),
                active_mods: Modifiers::empty(),
            }],
            available: Vec::new(),
            loaded: Vec::new(),
            show_set_name: false,
            generation: 0,
        };
        osk.rebuild_control_set();
        osk
    }

    // ── Introspection ───────────────────────────────────────────────

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn mode(&self) -> OskMode {
        self.mode
    }

    #[must_use]
    pub fn position_mode(&self) -> PositionMode {
        self.position_mode
    }

    /// Flip the bar between `Opposite` and `Same` positioning.
    pub fn toggle_position_mode(&mut self) {
        self.position_mode = match self.position_mode {
            PositionMode::Opposite => PositionMode::Same,
            PositionMode::Same => PositionMode::Opposite,
        };
    }

    /// Whether the bar sits at the top of the window for the given cursor
    /// row. The bar always occupies one character row.
    #[must_use]
    pub fn at_top(&self, cursor_y: u16, rows: u16) -> bool {
        let cursor_in_bottom_half = cursor_y >= rows / 2;
        match self.position_mode {
            PositionMode::Opposite => cursor_in_bottom_half,
            PositionMode::Same => !cursor_in_bottom_half,
        }
    }

    /// One-shot modifier state (for indicator rendering and tests).
    #[must_use]
    pub fn one_shot_modifiers(&self) -> Modifiers {
        self.one_shot
    }

    /// Currently held physical modifiers.
    #[must_use]
    pub fn held_modifiers(&self) -> Modifiers {
        self.held
    }

    #[must_use]
    pub fn selection(&self) -> (usize, usize) {
        (self.set_idx, self.char_idx)
    }

    /// Names of currently loaded dynamic sets.
    #[must_use]
    pub fn loaded_set_names(&self) -> &[String] {
        &self.loaded
    }

    /// All special sets, `CONTROL` first.
    #[must_use]
    pub fn special_sets(&self) -> &[SpecialKeySet] {
        &self.sets
    }

    // ── Activation & modifiers ──────────────────────────────────────

    /// Cycle the OSK: off -> Chars -> Special -> (Chars while one-shot
    /// modifiers are latched, else off).
    pub fn toggle(&mut self) {
        match (self.active, self.mode) {
            (false, _) => {
                self.active = true;
                self.mode = OskMode::Chars;
                self.set_idx = 0;
                self.char_idx = 0;
                self.show_set_name = false;
                self.validate_selection();
            }
            (true, OskMode::Chars) => {
                self.mode = OskMode::Special;
                self.set_idx = 0;
                self.char_idx = 0;
                self.show_set_name = true;
                self.validate_selection();
            }
            (true, OskMode::Special) => {
                if self.one_shot.is_empty() {
                    self.active = false;
                    self.show_set_name = false;
                } else {
                    self.mode = OskMode::Chars;
                    self.show_set_name = false;
                    self.validate_selection();
                }
            }
        }
    }

    /// Track a physical modifier press or release.
    ///
    /// Returns whether the state changed (the view may have switched
    /// layers, so the selection is re-validated).
    pub fn set_held_modifier(&mut self, modifier: Modifiers, pressed: bool) -> bool {
        let before = self.held;
        self.held.set(modifier, pressed);
        if self.held != before {
            self.validate_selection();
            true
        } else {
            false
        }
    }

    /// One-shots OR held: the mask direct-mode key events carry.
    #[must_use]
    pub fn combined_modifiers(&self) -> Modifiers {
        self.one_shot | self.held
    }

    /// The mask an emitted OSK key event carries: one-shots always, held
    /// modifiers only when they did not cause a layer switch.
    #[must_use]
    pub fn effective_send_modifiers(&self) -> Modifiers {
        let mut mods = self.one_shot;
        let consumed = !self.held.is_empty() && self.layout.layer_exists(self.held);
        if !consumed {
            mods |= self.held;
        }
        mods
    }

    /// Clear latched one-shots. Returns whether anything was latched.
    pub fn clear_one_shot_modifiers(&mut self) -> bool {
        if self.one_shot.is_empty() {
            false
        } else {
            self.one_shot = Modifiers::empty();
            true
        }
    }

    // ── Selection resolution ────────────────────────────────────────

    /// The effective row for the current mode and held modifiers.
    #[must_use]
    pub fn effective_row(&self, set_idx: usize) -> Option<&KeyRow> {
        self.layout.effective_row(set_idx, self.held)
    }

    /// The effective key at a slot, honoring `{N/A}` fallback.
    #[must_use]
    pub fn effective_key(&self, set_idx: usize, char_idx: usize) -> Option<&OskKey> {
        self.layout.effective_key(set_idx, char_idx, self.held)
    }

    /// Clamp the selection back to a valid position after any layout,
    /// layer, or registry change.
    pub fn validate_selection(&mut self) {
        let valid = match self.mode {
            OskMode::Chars => {
                let num_rows = self.layout.num_rows(self.held);
                num_rows > 0
                    && self.set_idx < num_rows
                    && match self.effective_row(self.set_idx) {
                        Some(row) => self.char_idx < row.keys.len().max(1) && !row.keys.is_empty(),
                        None => false,
                    }
            }
            OskMode::Special => match self.sets.get(self.set_idx) {
                Some(set) => !set.keys.is_empty() && self.char_idx < set.keys.len(),
                None => false,
            },
        };
        if !valid {
            self.set_idx = 0;
            self.char_idx = 0;
        }
    }

    // ── Action handling ─────────────────────────────────────────────

    /// Route a navigation or selection action.
    ///
    /// `modes` is the terminal-mode snapshot for the encoder; `sink`
    /// receives every byte destined for the PTY.
    pub fn handle_action(
        &mut self,
        action: OskAction,
        modes: TermModeView,
        sink: &mut dyn FnMut(&[u8]),
    ) -> ActionOutcome {
        match self.mode {
            OskMode::Chars => self.handle_chars_action(action, modes, sink),
            OskMode::Special => self.handle_special_action(action, modes, sink),
        }
    }

    fn handle_chars_action(
        &mut self,
        action: OskAction,
        modes: TermModeView,
        sink: &mut dyn FnMut(&[u8]),
    ) -> ActionOutcome {
        let num_rows = self.layout.num_rows(self.held);
        let num_chars = match self.effective_row(self.set_idx) {
            Some(row) => row.keys.len(),
            None => 0,
        };
        if num_rows == 0 || num_chars == 0 {
            if let Some(outcome) = self.handle_common_action(action, modes, sink) {
                return outcome;
            }
            return ActionOutcome::default();
        }

        match action {
            OskAction::Up => {
                self.set_idx = if self.set_idx == 0 {
                    num_rows - 1
                } else {
                    self.set_idx - 1
                };
                self.char_idx = 0;
                self.validate_selection();
                ActionOutcome::redraw()
            }
            OskAction::Down => {
                self.set_idx = (self.set_idx + 1) % num_rows;
                self.char_idx = 0;
                self.validate_selection();
                ActionOutcome::redraw()
            }
            OskAction::Left => {
                self.char_idx = if self.char_idx == 0 {
                    num_chars - 1
                } else {
                    self.char_idx - 1
                };
                self.validate_selection();
                ActionOutcome::redraw()
            }
            OskAction::Right => {
                self.char_idx = (self.char_idx + 1) % num_chars;
                self.validate_selection();
                ActionOutcome::redraw()
            }
            OskAction::Select => {
                let key = self.effective_key(self.set_idx, self.char_idx).cloned();
                match key {
                    Some(key) => self.select_key(&key, modes, sink),
                    None => ActionOutcome::default(),
                }
            }
            _ => self
                .handle_common_action(action, modes, sink)
                .unwrap_or_default(),
        }
    }

    fn handle_special_action(
        &mut self,
        action: OskAction,
        modes: TermModeView,
        sink: &mut dyn FnMut(&[u8]),
    ) -> ActionOutcome {
        let num_sets = self.sets.len();
        let set_len = self.sets.get(self.set_idx).map_or(0, |s| s.keys.len());

        match action {
            OskAction::Up => {
                self.set_idx = if self.set_idx == 0 {
                    num_sets - 1
                } else {
                    self.set_idx - 1
                };
                self.char_idx = 0;
                self.show_set_name = true;
                self.validate_selection();
                ActionOutcome::redraw()
            }
            OskAction::Down => {
                self.set_idx = (self.set_idx + 1) % num_sets;
                self.char_idx = 0;
                self.show_set_name = true;
                self.validate_selection();
                ActionOutcome::redraw()
            }
            OskAction::Left => {
                if set_len > 0 {
                    self.char_idx = if self.char_idx == 0 {
                        set_len - 1
                    } else {
                        self.char_idx - 1
                    };
                }
                self.show_set_name = false;
                self.validate_selection();
                ActionOutcome::redraw()
            }
            OskAction::Right => {
                if set_len > 0 {
                    self.char_idx = (self.char_idx + 1) % set_len;
                }
                self.show_set_name = false;
                self.validate_selection();
                ActionOutcome::redraw()
            }
            OskAction::Select => {
                if self.char_idx < set_len {
                    let key = self.sets[self.set_idx].keys[self.char_idx].clone();
                    self.select_key(&key, modes, sink)
                } else {
                    ActionOutcome::default()
                }
            }
            _ => self
                .handle_common_action(action, modes, sink)
                .unwrap_or_default(),
        }
    }

    /// `Back`/`Space`/`Tab`/`Enter` work the same in both modes: they
    /// synthesize the corresponding key with the combined modifier set.
    /// Held modifiers persist; one-shots are spent.
    fn handle_common_action(
        &mut self,
        action: OskAction,
        modes: TermModeView,
        sink: &mut dyn FnMut(&[u8]),
    ) -> Option<ActionOutcome> {
        let code = match action {
            OskAction::Back => KeyCode::Backspace,
            OskAction::Space => KeyCode::Char(' '),
            OskAction::Tab => KeyCode::Tab,
            OskAction::Enter => KeyCode::Enter,
            _ => return None,
        };
        let bytes = encode_key(code, self.combined_modifiers(), modes);
        if !bytes.is_empty() {
            sink(&bytes);
        }
        let redraw = self.clear_one_shot_modifiers();
        Some(ActionOutcome {
            command: None,
            redraw,
        })
    }

    /// The key-emission table.
    fn select_key(
        &mut self,
        key: &OskKey,
        modes: TermModeView,
        sink: &mut dyn FnMut(&[u8]),
    ) -> ActionOutcome {
        let mut outcome = ActionOutcome::default();
        let mut is_modifier = false;
        let mut is_macro = false;

        match &key.action {
            KeyAction::Literal(text) => {
                sink(text.as_bytes());
            }
            KeyAction::Macro(text) => {
                is_macro = true;
                outcome.redraw |= self.execute_macro(text, modes, sink);
            }
            KeyAction::Sequence { code, mods } => {
                let effective = self.effective_send_modifiers() | *mods;
                let bytes = encode_key(*code, effective, modes);
                if !bytes.is_empty() {
                    sink(&bytes);
                }
            }
            KeyAction::ModToggle(modifier) => {
                is_modifier = true;
                self.one_shot.toggle(*modifier);
                outcome.redraw = true;
            }
            KeyAction::Command(command) => {
                outcome.command = Some(*command);
            }
            KeyAction::LoadSet(path) => {
                self.add_custom_set(path);
                outcome.redraw = true;
            }
            KeyAction::UnloadSet(name) => {
                self.remove_custom_set(name);
                outcome.redraw = true;
            }
            KeyAction::Inherit => {}
        }

        // One-shots are spent by any non-modifier, non-macro selection;
        // macros manage their own clearing.
        if !is_modifier && !is_macro {
            outcome.redraw |= self.clear_one_shot_modifiers();
        }
        if outcome.redraw {
            self.validate_selection();
        }
        outcome
    }

    /// Expand a macro: flush literal segments, synthesize `{TOKEN}` keys
    /// with the effective modifiers, toggle modifier tokens, and spend the
    /// one-shots once any key token was emitted. Returns whether the view
    /// changed.
    fn execute_macro(
        &mut self,
        text: &str,
        modes: TermModeView,
        sink: &mut dyn FnMut(&[u8]),
    ) -> bool {
        let mut redraw = false;
        let mut emitted_sequence = false;
        let mut segment = String::new();
        let mut rest = text;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("\\{") {
                segment.push('{');
                rest = after;
                continue;
            }
            if rest.starts_with('{') {
                if let Some((token, key)) = find_layout_token(rest) {
                    if !segment.is_empty() {
                        sink(segment.as_bytes());
                        segment.clear();
                    }
                    match key.action {
                        KeyAction::Sequence { code, .. } => {
                            let bytes = encode_key(code, self.effective_send_modifiers(), modes);
                            if !bytes.is_empty() {
                                sink(&bytes);
                            }
                            emitted_sequence = true;
                        }
                        KeyAction::ModToggle(modifier) => {
                            self.one_shot.toggle(modifier);
                            redraw = true;
                        }
                        // {N/A}/{DEFAULT} have no meaning inside a macro.
                        _ => {}
                    }
                    rest = &rest[token.len()..];
                    continue;
                }
            }
            let ch = rest.chars().next().expect("rest is non-empty");
            segment.push(ch);
            rest = &rest[ch.len_utf8()..];
        }

        if !segment.is_empty() {
            sink(segment.as_bytes());
        }
        if emitted_sequence {
            redraw |= self.clear_one_shot_modifiers();
        }
        redraw
    }

    // ── Dynamic key sets ────────────────────────────────────────────

    /// Record a set in the available registry without loading its keys.
    /// The `CONTROL` menu grows a `+NAME` entry.
    pub fn make_set_available(&mut self, path: &str) {
        if self.add_to_available(path) {
            self.rebuild_control_set();
        }
    }

    /// Load a `.keys` file, append it as a selectable set, and flip its
    /// `CONTROL` menu entry to `-NAME`.
    pub fn add_custom_set(&mut self, path: &str) {
        self.add_to_available(path);

        let name = SpecialKeySet::name_for_path(path);
        if self.sets.iter().skip(1).any(|s| s.name == name) {
            debug!(name, "key set already loaded, skipping");
            return;
        }
        let Some(set) = SpecialKeySet::load(path) else {
            return;
        };
        self.loaded.push(set.name.clone());
        self.sets.push(set);
        self.rebuild_control_set();
    }

    /// Unload a set by name and flip its menu entry back to `+NAME`.
    pub fn remove_custom_set(&mut self, name: &str) {
        let Some(idx) = self
            .sets
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, s)| s.name == name)
            .map(|(i, _)| i)
        else {
            return;
        };
        self.sets.remove(idx);
        self.loaded.retain(|n| n != name);
        self.rebuild_control_set();
        if self.set_idx >= self.sets.len() {
            self.set_idx = self.sets.len().saturating_sub(1);
            self.char_idx = 0;
        }
        self.validate_selection();
    }

    /// Record a path in the available registry. Returns whether it was new.
    fn add_to_available(&mut self, path: &str) -> bool {
        if self.available.iter().any(|a| a.path == path) {
            return false;
        }
        self.available.push(AvailableSet {
            name: SpecialKeySet::name_for_path(path),
            path: path.to_string(),
        });
        true
    }

    /// Rebuild `CONTROL`: the fixed action keys, then one load/unload key
    /// per available set. Invalidates the render cache.
    fn rebuild_control_set(&mut self) {
        let mut keys = control_action_keys();
        for available in &self.available {
            if self.loaded.iter().any(|n| n == &available.name) {
                keys.push(OskKey::new(
                    format!("-{}", available.name),
                    KeyAction::UnloadSet(available.name.clone()),
                ));
            } else {
                keys.push(OskKey::new(
                    format!("+{}", available.name),
                    KeyAction::LoadSet(available.path.clone()),
                ));
            }
        }
        self.sets[0].keys = keys;
        self.generation = self.generation.wrapping_add(1);
    }

    // ── Render view ─────────────────────────────────────────────────

    /// Snapshot for the renderer.
    #[must_use]
    pub fn view(&self) -> OskView<'_> {
        let (row, active_mods): (Vec<&OskKey>, Modifiers) = match self.mode {
            OskMode::Chars => match self.effective_row(self.set_idx) {
                Some(row) => (
                    (0..row.keys.len())
                        .map(|i| self.effective_key(self.set_idx, i).unwrap_or(&row.keys[i]))
                        .collect(),
                    row.active_mods,
                ),
                None => (Vec::new(), Modifiers::empty()),
            },
            OskMode::Special => match self.sets.get(self.set_idx) {
                Some(set) => (set.keys.iter().collect(), set.active_mods),
                None => (Vec::new(), Modifiers::empty()),
            },
        };

        let toggled = row
            .iter()
            .map(|key| match key.action {
                KeyAction::ModToggle(m) => self.one_shot.contains(m),
                _ => false,
            })
            .collect();

        // Held modifiers consumed by a layer switch are not indicated.
        let layer_switch = self.mode == OskMode::Chars
            && !self.held.is_empty()
            && self.layout.layer_exists(self.held);
        let mut indicators = self.one_shot | active_mods;
        if !layer_switch {
            indicators |= self.held;
        }

        let set_name = match self.mode {
            OskMode::Special if self.show_set_name => {
                self.sets.get(self.set_idx).map(|s| s.name.as_str())
            }
            _ => None,
        };

        OskView {
            active: self.active,
            mode: self.mode,
            position_mode: self.position_mode,
            set_idx: self.set_idx,
            char_idx: self.char_idx,
            row: row.iter().map(|k| k.label.as_str()).collect(),
            toggled,
            set_name,
            indicators,
            generation: self.generation,
        }
    }
}

impl Default for Osk {
    fn default() -> Self {
        Self::new(None)
    }
}

/// The fixed action keys heading the `CONTROL` set.
fn control_action_keys() -> Vec<OskKey> {
    vec![
        OskKey::new("OSK Pos", KeyAction::Command(OskCommand::OskTogglePosition)),
        OskKey::new("Ctrl", KeyAction::ModToggle(Modifiers::CTRL)),
        OskKey::new("Alt", KeyAction::ModToggle(Modifiers::ALT)),
        OskKey::new("GUI", KeyAction::ModToggle(Modifiers::GUI)),
        OskKey::new(
            "Esc",
            KeyAction::Sequence {
                code: KeyCode::Escape,
                mods: Modifiers::empty(),
            },
        ),
        OskKey::new(
            "Tab",
            KeyAction::Sequence {
                code: KeyCode::Tab,
                mods: Modifiers::empty(),
            },
        ),
        OskKey::new(
            "Enter",
            KeyAction::Sequence {
                code: KeyCode::Enter,
                mods: Modifiers::empty(),
            },
        ),
        OskKey::new(
            "Space",
            KeyAction::Sequence {
                code: KeyCode::Char(' '),
                mods: Modifiers::empty(),
            },
        ),
        OskKey::new(
            "Bksp",
            KeyAction::Sequence {
                code: KeyCode::Backspace,
                mods: Modifiers::empty(),
            },
        ),
        OskKey::new(
            "Del",
            KeyAction::Sequence {
                code: KeyCode::Delete,
                mods: Modifiers::empty(),
            },
        ),
        OskKey::new("Shift", KeyAction::ModToggle(Modifiers::SHIFT)),
    ]
}

/// Number of fixed action keys heading the `CONTROL` set; dynamic
/// load/unload menu entries follow from this index.
pub const NUM_CONTROL_ACTION_KEYS: usize = 11;
