//! The session: action routing and glue between engine, encoder, and OSK.
//!
//! Owns the `write_pty` sink handed in at construction; every byte the
//! encoder or the reply flusher produces goes through it. The host reads
//! the PTY itself and calls [`Session::feed_pty`] with each window.

use std::time::{Duration, Instant};

use padterm_core::{CursorView, DirtyTracker, Glyph, Term};
use padterm_input::{encode_key, is_text_input_duplicate, KeyEvent, Modifiers, TermModeView};
use padterm_osk::{Osk, OskAction, OskCommand, OskView};
use tracing::debug;

use crate::config::Config;
use crate::repeat::RepeatState;

/// Cursor blink half-period.
pub const CURSOR_BLINK_INTERVAL: Duration = Duration::from_millis(500);

/// Viewport lines scrolled per `ScrollDown` step.
const SCROLL_DOWN_AMOUNT: i32 = 3;

/// Abstract user actions, independent of the input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Space,
    Tab,
    Enter,
    ScrollUp,
    ScrollDown,
    ToggleOsk,
}

/// Commands the session cannot execute itself and returns to the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    FontInc,
    FontDec,
}

/// The two buttons of the exit combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitButton {
    Back,
    Start,
}

/// Session-level error.
#[derive(Debug)]
pub enum SessionError {
    /// Construction-time allocation failure.
    Core(padterm_core::Error),
    /// The PTY reached EOF or failed; the host decides whether to quit.
    PtyClosed,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core(err) => write!(f, "terminal allocation failed: {err}"),
            Self::PtyClosed => write!(f, "pty closed"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<padterm_core::Error> for SessionError {
    fn from(err: padterm_core::Error) -> Self {
        Self::Core(err)
    }
}

/// A live terminal session.
pub struct Session {
    term: Term,
    osk: Osk,
    sink: Box<dyn FnMut(&[u8])>,
    repeat: RepeatState,
    read_only: bool,
    exit_back_held: bool,
    exit_start_held: bool,
    last_blink_toggle: Option<Instant>,
    needs_render: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cols", &self.term.cols())
            .field("rows", &self.term.rows())
            .field("osk_active", &self.osk.is_active())
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl Session {
    /// Build a session from a configuration and a PTY write sink.
    pub fn new(config: Config, write_pty: Box<dyn FnMut(&[u8])>) -> Result<Self, SessionError> {
        let config = config.sanitized();
        let term = Term::with_theme(
            config.cols,
            config.rows,
            config.scrollback,
            config.theme.as_deref(),
        )?;

        let layout_content = config.osk_layout.as_deref().and_then(|path| {
            std::fs::read_to_string(path)
                .map_err(|err| {
                    debug!(path = %path.display(), %err, "could not read OSK layout file");
                })
                .ok()
        });
        let mut osk = Osk::new(layout_content.as_deref());
        for entry in &config.key_sets {
            let path = entry.path.to_string_lossy();
            osk.make_set_available(&path);
            if entry.load_at_startup {
                osk.add_custom_set(&path);
            }
        }

        Ok(Self {
            term,
            osk,
            sink: write_pty,
            repeat: RepeatState::new(),
            read_only: config.read_only,
            exit_back_held: false,
            exit_start_held: false,
            last_blink_toggle: None,
            needs_render: true,
        })
    }

    // ── PTY side ────────────────────────────────────────────────────

    /// Consume a PTY read window.
    ///
    /// New output snaps the scrollback view to the live bottom; replies
    /// generated while parsing are flushed to the sink before returning.
    pub fn feed_pty(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.term.reset_view();
        self.term.feed(bytes);
        self.flush_replies();
        self.needs_render = true;
    }

    fn flush_replies(&mut self) {
        let replies = self.term.replies();
        if !replies.is_empty() {
            (self.sink)(replies);
        }
        self.term.clear_replies();
    }

    fn write_pty(&mut self, bytes: &[u8]) {
        if !self.read_only && !bytes.is_empty() {
            (self.sink)(bytes);
        }
    }

    // ── Input side ──────────────────────────────────────────────────

    /// Route an abstract action.
    pub fn handle_action(&mut self, action: Action) -> Option<HostCommand> {
        match action {
            Action::ToggleOsk => {
                self.osk.toggle();
                self.needs_render = true;
                None
            }
            Action::ScrollUp => {
                let amount = (self.term.rows() / 2).max(1) as i32;
                if self.term.scroll_view(amount) {
                    self.needs_render = true;
                }
                None
            }
            Action::ScrollDown => {
                if self.term.scroll_view(-SCROLL_DOWN_AMOUNT) {
                    self.needs_render = true;
                }
                None
            }
            _ if self.read_only => None,
            _ if self.osk.is_active() => self.handle_osk_action(action),
            _ => {
                self.handle_direct_action(action);
                None
            }
        }
    }

    /// A press that participates in auto-repeat. Returns the command of
    /// the initial activation, if any.
    pub fn handle_press(&mut self, action: Action, now: Instant) -> Option<HostCommand> {
        if self.repeat.press(action, now) {
            self.handle_action(action)
        } else {
            None
        }
    }

    /// The matching release for [`handle_press`](Self::handle_press).
    pub fn handle_release(&mut self, action: Action) {
        self.repeat.release(action);
    }

    fn handle_osk_action(&mut self, action: Action) -> Option<HostCommand> {
        let osk_action = match action {
            Action::Up => OskAction::Up,
            Action::Down => OskAction::Down,
            Action::Left => OskAction::Left,
            Action::Right => OskAction::Right,
            Action::Select => OskAction::Select,
            Action::Back => OskAction::Back,
            Action::Space => OskAction::Space,
            Action::Tab => OskAction::Tab,
            Action::Enter => OskAction::Enter,
            _ => return None,
        };

        let modes = self.mode_view();
        let read_only = self.read_only;
        let sink = &mut self.sink;
        let outcome = self.osk.handle_action(osk_action, modes, &mut |bytes| {
            if !read_only {
                sink(bytes);
            }
        });
        if outcome.redraw {
            self.needs_render = true;
        }
        outcome.command.and_then(|cmd| self.run_command(cmd))
    }

    /// OSK inactive: actions synthesize key events with the combined
    /// modifier set; one-shots are spent.
    fn handle_direct_action(&mut self, action: Action) {
        use padterm_input::KeyCode;

        let code = match action {
            Action::Up => KeyCode::Up,
            Action::Down => KeyCode::Down,
            Action::Left => KeyCode::Left,
            Action::Right => KeyCode::Right,
            Action::Back => KeyCode::Backspace,
            Action::Space => KeyCode::Char(' '),
            Action::Tab => KeyCode::Tab,
            Action::Enter => KeyCode::Enter,
            _ => return,
        };
        let bytes = encode_key(code, self.osk.combined_modifiers(), self.mode_view());
        self.write_pty(&bytes);
        if self.osk.clear_one_shot_modifiers() {
            self.needs_render = true;
        }
    }

    /// Execute an internal command, or hand it to the embedder.
    fn run_command(&mut self, command: OskCommand) -> Option<HostCommand> {
        match command {
            OskCommand::FontInc => return Some(HostCommand::FontInc),
            OskCommand::FontDec => return Some(HostCommand::FontDec),
            OskCommand::CursorToggleVisibility => self.term.toggle_cursor_visibility(),
            OskCommand::CursorToggleBlink => self.term.toggle_cursor_blink_enabled(),
            OskCommand::CursorCycleStyle => self.term.cycle_cursor_style(),
            OskCommand::TerminalReset => {
                self.term.reset();
                self.write_pty(b"\x0c");
            }
            OskCommand::TerminalClear => self.term.clear_visible_screen(),
            OskCommand::OskTogglePosition => self.osk.toggle_position_mode(),
        }
        self.needs_render = true;
        None
    }

    /// A raw key-down event from a physical keyboard.
    ///
    /// Printable ASCII with no non-Shift modifier is dropped here; the
    /// composed text path delivers those (see [`Session::handle_text`]).
    pub fn handle_key_down(&mut self, event: KeyEvent) {
        if is_text_input_duplicate(event.code, event.modifiers) {
            return;
        }
        let bytes = encode_key(event.code, event.modifiers, self.mode_view());
        self.write_pty(&bytes);
    }

    /// A composed text event from the OS: written verbatim.
    pub fn handle_text(&mut self, text: &str) {
        self.write_pty(text.as_bytes());
    }

    /// A mouse-wheel event, forwarded as arrow sequences.
    pub fn handle_wheel(&mut self, direction: i32) {
        if let Some(seq) = padterm_input::wheel_sequence(direction) {
            self.write_pty(seq);
        }
    }

    /// Track a held physical modifier (shoulder button / trigger).
    pub fn set_held_modifier(&mut self, modifier: Modifiers, pressed: bool) {
        if self.osk.set_held_modifier(modifier, pressed) {
            self.needs_render = true;
        }
    }

    /// Track the exit-combo buttons. Returns `true` when both are held
    /// simultaneously and the host should shut down.
    pub fn note_exit_button(&mut self, button: ExitButton, pressed: bool) -> bool {
        match button {
            ExitButton::Back => self.exit_back_held = pressed,
            ExitButton::Start => self.exit_start_held = pressed,
        }
        self.exit_back_held && self.exit_start_held
    }

    // ── Frame upkeep ────────────────────────────────────────────────

    /// Per-frame upkeep: due button repeats and cursor blink.
    ///
    /// Returns any host command produced by a repeated action.
    pub fn tick(&mut self, now: Instant) -> Option<HostCommand> {
        let mut host_command = None;
        if let Some(action) = self.repeat.poll(now) {
            host_command = self.handle_action(action);
        }

        let blink_due = match self.last_blink_toggle {
            Some(last) => now.duration_since(last) >= CURSOR_BLINK_INTERVAL,
            None => true,
        };
        if blink_due {
            self.last_blink_toggle = Some(now);
            if self.term.modes().cursor_blink && self.term.toggle_cursor_blink() {
                self.needs_render = true;
            }
        }
        host_command
    }

    /// Resize the terminal (destructive; scrollback is discarded).
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if self.term.resize(cols, rows).is_ok() {
            self.needs_render = true;
        }
    }

    // ── Render views ────────────────────────────────────────────────

    #[must_use]
    pub fn term(&self) -> &Term {
        &self.term
    }

    #[must_use]
    pub fn osk(&self) -> &Osk {
        &self.osk
    }

    /// The viewport row at screen position `y`.
    #[must_use]
    pub fn viewport_line(&self, y: u16) -> Option<&[Glyph]> {
        self.term.view_line(y)
    }

    #[must_use]
    pub fn cursor(&self) -> CursorView {
        self.term.cursor()
    }

    #[must_use]
    pub fn dirty(&self) -> &DirtyTracker {
        self.term.dirty()
    }

    pub fn clear_dirty(&mut self) {
        self.term.clear_dirty();
    }

    /// OSK snapshot for the renderer.
    #[must_use]
    pub fn osk_view(&self) -> OskView<'_> {
        self.osk.view()
    }

    /// Whether the OSK bar sits at the top of the window this frame.
    #[must_use]
    pub fn osk_at_top(&self) -> bool {
        self.osk.at_top(self.term.cursor().y, self.term.rows())
    }

    /// Whether anything changed since the last repaint.
    #[must_use]
    pub fn needs_render(&self) -> bool {
        self.needs_render
    }

    /// Acknowledge a repaint.
    pub fn set_rendered(&mut self) {
        self.needs_render = false;
    }

    fn mode_view(&self) -> TermModeView {
        TermModeView {
            application_cursor: self.term.modes().application_cursor,
        }
    }
}
