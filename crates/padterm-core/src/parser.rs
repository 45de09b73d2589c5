//! VT/ANSI parser.
//!
//! A deterministic byte-at-a-time state machine converting the PTY output
//! stream into a sequence of actions for the terminal engine. It covers:
//!
//! - printable characters (ASCII + full UTF-8) -> [`Action::Print`]
//! - C0 controls -> dedicated actions
//! - CSI sequences (cursor, erase, scroll, SGR, mode set/reset, reports)
//! - OSC sequences (palette overrides; everything else discarded safely)
//! - ESC-level sequences (cursor save/restore, index, charset, reset)
//! - DCS payloads, discarded until the terminating escape
//!
//! The parser never retains data beyond its declared buffers: at most 16
//! CSI parameters, 3 intermediates, a 256-byte OSC accumulator, and the
//! 4-byte UTF-8 assembly state. Unknown sequences are logged at `debug`
//! and dropped; the stream always resynchronizes.

use smallvec::SmallVec;
use tracing::debug;

use crate::cell::Rgba;
use crate::palette::parse_osc_color;

/// Maximum number of CSI parameters retained per sequence.
pub const CSI_MAX_PARAMS: usize = 16;

/// Maximum intermediate bytes retained per CSI sequence.
const CSI_MAX_INTERMEDIATES: usize = 3;

/// Maximum accumulated OSC payload in bytes.
const OSC_MAX_LEN: usize = 256;

/// Inline-capacity parameter list for CSI sequences.
///
/// Sized to the wire-format cap so a full sequence never heap-allocates.
pub type CsiParams = SmallVec<[u16; CSI_MAX_PARAMS]>;

/// Parser output actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print one character at the cursor (charset mapping applied later).
    Print(char),
    /// BS: move the cursor one column left, clamped at the margin.
    Backspace,
    /// HT: advance to the next multiple-of-8 column, wrapping past the margin.
    Tab,
    /// LF: line feed.
    LineFeed,
    /// CR: column 0.
    CarriageReturn,
    /// SO: select the G1 charset slot.
    ShiftOut,
    /// SI: select the G0 charset slot.
    ShiftIn,
    /// `ESC (` / `ESC )`: designate a charset for slot G0 (0) or G1 (1).
    DesignateCharset { slot: u8, charset: u8 },
    /// DECSC (`ESC 7`) or `CSI s`: save the cursor position.
    SaveCursor,
    /// DECRC (`ESC 8`) or `CSI u`: restore the saved cursor position.
    RestoreCursor,
    /// IND (`ESC D`): line feed without carriage return.
    Index,
    /// RI (`ESC M`): cursor up, scrolling the region down at the top margin.
    ReverseIndex,
    /// DECKPAM / DECKPNM (`ESC =` / `ESC >`): application keypad on/off.
    ApplicationKeypad(bool),
    /// RIS (`ESC c`): full reset to initial state.
    FullReset,
    /// DECALN (`ESC # 8`): fill the visible screen with `E`.
    ScreenAlignment,
    /// CUU: cursor up, clamped to the scroll region top.
    CursorUp(u16),
    /// CUD: cursor down, clamped to the scroll region bottom.
    CursorDown(u16),
    /// CUF: cursor right.
    CursorForward(u16),
    /// CUB: cursor left.
    CursorBack(u16),
    /// CHA: absolute column, 1-based as on the wire.
    CursorColumn(u16),
    /// VPA: absolute row, 1-based as on the wire.
    CursorRow(u16),
    /// CUP/HVP: absolute position, 1-based; origin mode is applied by the engine.
    CursorPosition { row: u16, col: u16 },
    /// ED: 0 = cursor to end, 1 = start to cursor, 2 = whole display.
    EraseDisplay(u16),
    /// EL: same sub-commands, line-local.
    EraseLine(u16),
    /// ICH: insert blank cells at the cursor.
    InsertChars(u16),
    /// DCH: delete cells at the cursor.
    DeleteChars(u16),
    /// ECH: blank cells in place.
    EraseChars(u16),
    /// IL: insert lines at the cursor row within the scroll region.
    InsertLines(u16),
    /// DL: delete lines at the cursor row within the scroll region.
    DeleteLines(u16),
    /// SU: scroll the region up.
    ScrollUp(u16),
    /// SD: scroll the region down.
    ScrollDown(u16),
    /// DECSTBM. `top` is 1-based; `bottom == 0` means the full height
    /// (the parser does not know the grid size).
    SetScrollRegion { top: u16, bottom: u16 },
    /// SGR parameters, interpreted statefully by the engine.
    Sgr(CsiParams),
    /// SM: set ANSI mode(s).
    SetMode(CsiParams),
    /// RM: reset ANSI mode(s).
    ResetMode(CsiParams),
    /// DECSET (`CSI ? h`).
    DecSet(CsiParams),
    /// DECRST (`CSI ? l`).
    DecRst(CsiParams),
    /// DECSCUSR (`CSI Ps SP q`), 0..=6.
    SetCursorStyle(u8),
    /// DA1 (`CSI c`): report primary device attributes.
    DeviceAttributes,
    /// DSR 6 (`CSI 6 n`): report the cursor position.
    CursorPositionReport,
    /// `CSI 18 t`: report the window size in character cells.
    WindowSizeReport,
    /// OSC 4: override a base palette entry.
    SetPaletteColor { index: u8, color: Rgba },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    /// Accumulating UTF-8 continuation bytes.
    Utf8,
    Escape,
    /// `ESC (` / `ESC )`: waiting for the charset designator byte.
    EscCharset { slot: u8 },
    /// `ESC #`: waiting for the final byte (`8` for DECALN).
    EscHash,
    Csi,
    Osc,
    /// DCS payload, discarded until ESC.
    Dcs,
}

/// VT/ANSI parser state.
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    params: CsiParams,
    private_marker: Option<u8>,
    intermediates: SmallVec<[u8; CSI_MAX_INTERMEDIATES]>,
    osc: Vec<u8>,
    utf8_codepoint: u32,
    utf8_remaining: u8,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a parser in ground state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: CsiParams::new(),
            private_marker: None,
            intermediates: SmallVec::new(),
            osc: Vec::with_capacity(OSC_MAX_LEN),
            utf8_codepoint: 0,
            utf8_remaining: 0,
        }
    }

    /// Return to ground state, discarding any partial sequence.
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.params.clear();
        self.private_marker = None;
        self.intermediates.clear();
        self.osc.clear();
        self.utf8_codepoint = 0;
        self.utf8_remaining = 0;
    }

    /// Advance the parser by one byte.
    ///
    /// Returns an action when a complete token is recognized.
    pub fn advance(&mut self, b: u8) -> Option<Action> {
        match self.state {
            State::Ground => self.advance_ground(b),
            State::Utf8 => self.advance_utf8(b),
            State::Escape => self.advance_escape(b),
            State::EscCharset { slot } => self.advance_esc_charset(b, slot),
            State::EscHash => self.advance_esc_hash(b),
            State::Csi => self.advance_csi(b),
            State::Osc => self.advance_osc(b),
            State::Dcs => self.advance_dcs(b),
        }
    }

    fn advance_ground(&mut self, b: u8) -> Option<Action> {
        match b {
            0x1b => {
                self.state = State::Escape;
                None
            }
            0x0e => Some(Action::ShiftOut),
            0x0f => Some(Action::ShiftIn),
            b'\n' => Some(Action::LineFeed),
            b'\r' => Some(Action::CarriageReturn),
            0x08 => Some(Action::Backspace),
            b'\t' => Some(Action::Tab),
            0x20..=0x7f => Some(Action::Print(b as char)),
            // UTF-8 leading bytes seed the accumulator.
            0xc0..=0xdf => {
                self.utf8_codepoint = u32::from(b & 0x1f);
                self.utf8_remaining = 1;
                self.state = State::Utf8;
                None
            }
            0xe0..=0xef => {
                self.utf8_codepoint = u32::from(b & 0x0f);
                self.utf8_remaining = 2;
                self.state = State::Utf8;
                None
            }
            0xf0..=0xf7 => {
                self.utf8_codepoint = u32::from(b & 0x07);
                self.utf8_remaining = 3;
                self.state = State::Utf8;
                None
            }
            0x80..=0xbf => {
                debug!(byte = b, "stray UTF-8 continuation byte");
                None
            }
            // Remaining C0 controls are ignored.
            _ => None,
        }
    }

    fn advance_utf8(&mut self, b: u8) -> Option<Action> {
        if b & 0xc0 != 0x80 {
            // Invalid continuation: drop the partial sequence and reprocess
            // this byte from scratch in ground state.
            debug!(byte = b, "invalid UTF-8 continuation byte");
            self.utf8_remaining = 0;
            self.state = State::Ground;
            return self.advance_ground(b);
        }

        self.utf8_codepoint = (self.utf8_codepoint << 6) | u32::from(b & 0x3f);
        self.utf8_remaining -= 1;
        if self.utf8_remaining > 0 {
            return None;
        }

        self.state = State::Ground;
        match char::from_u32(self.utf8_codepoint) {
            Some(ch) => Some(Action::Print(ch)),
            None => {
                debug!(codepoint = self.utf8_codepoint, "undecodable codepoint");
                None
            }
        }
    }

    fn advance_escape(&mut self, b: u8) -> Option<Action> {
        match b {
            // A second ESC restarts the escape without leaving the state.
            0x1b => None,
            b'[' => {
                self.params.clear();
                self.private_marker = None;
                self.intermediates.clear();
                self.state = State::Csi;
                None
            }
            b']' => {
                self.osc.clear();
                self.state = State::Osc;
                None
            }
            b'P' => {
                self.state = State::Dcs;
                None
            }
            b'(' => {
                self.state = State::EscCharset { slot: 0 };
                None
            }
            b')' => {
                self.state = State::EscCharset { slot: 1 };
                None
            }
            b'#' => {
                self.state = State::EscHash;
                None
            }
            b'7' => {
                self.state = State::Ground;
                Some(Action::SaveCursor)
            }
            b'8' => {
                self.state = State::Ground;
                Some(Action::RestoreCursor)
            }
            b'D' => {
                self.state = State::Ground;
                Some(Action::Index)
            }
            b'M' => {
                self.state = State::Ground;
                Some(Action::ReverseIndex)
            }
            b'=' => {
                self.state = State::Ground;
                Some(Action::ApplicationKeypad(true))
            }
            b'>' => {
                self.state = State::Ground;
                Some(Action::ApplicationKeypad(false))
            }
            b'c' => {
                self.state = State::Ground;
                Some(Action::FullReset)
            }
            // ST terminator (after OSC/DCS) and ignored designators.
            b'\\' | b'<' => {
                self.state = State::Ground;
                None
            }
            _ => {
                debug!(byte = b, "unhandled escape sequence");
                self.state = State::Ground;
                None
            }
        }
    }

    fn advance_esc_charset(&mut self, b: u8, slot: u8) -> Option<Action> {
        self.state = State::Ground;
        // Only ASCII and DEC Special Graphics are assignable; anything
        // else consumes the byte without changing the slot.
        if b == b'B' || b == b'0' {
            Some(Action::DesignateCharset { slot, charset: b })
        } else {
            None
        }
    }

    fn advance_esc_hash(&mut self, b: u8) -> Option<Action> {
        self.state = State::Ground;
        if b == b'8' {
            Some(Action::ScreenAlignment)
        } else {
            debug!(byte = b, "unhandled ESC # sequence");
            None
        }
    }

    fn advance_csi(&mut self, b: u8) -> Option<Action> {
        match b {
            0x1b => {
                self.state = State::Escape;
                None
            }
            b'0'..=b'9' => {
                if self.params.is_empty() {
                    self.params.push(0);
                }
                let last = self.params.last_mut().expect("params is non-empty");
                *last = last
                    .saturating_mul(10)
                    .saturating_add(u16::from(b - b'0'));
                None
            }
            b';' => {
                if self.params.is_empty() {
                    self.params.push(0);
                }
                // Parameters past the cap are silently dropped.
                if self.params.len() < CSI_MAX_PARAMS {
                    self.params.push(0);
                }
                None
            }
            b'<'..=b'?' => {
                self.private_marker = Some(b);
                None
            }
            0x20..=0x2f => {
                if self.intermediates.len() < CSI_MAX_INTERMEDIATES {
                    self.intermediates.push(b);
                }
                None
            }
            0x40..=0x7e => {
                if self.params.is_empty() {
                    self.params.push(0);
                }
                self.state = State::Ground;
                self.dispatch_csi(b)
            }
            _ => {
                debug!(byte = b, "unhandled byte in CSI state");
                self.state = State::Ground;
                self.advance_ground(b)
            }
        }
    }

    fn advance_osc(&mut self, b: u8) -> Option<Action> {
        match b {
            0x07 => {
                self.state = State::Ground;
                self.decode_osc()
            }
            0x1b => {
                // ESC both terminates the payload (ST arrives as ESC \)
                // and begins the next sequence.
                self.state = State::Escape;
                self.decode_osc()
            }
            b if b.is_ascii_graphic() || b == b' ' || b == b';' => {
                if self.osc.len() < OSC_MAX_LEN {
                    self.osc.push(b);
                }
                None
            }
            _ => {
                debug!(byte = b, "aborting OSC sequence on unexpected byte");
                self.state = State::Ground;
                None
            }
        }
    }

    fn advance_dcs(&mut self, b: u8) -> Option<Action> {
        if b == 0x1b {
            self.state = State::Escape;
        }
        None
    }

    /// First parameter, with 0 (absent) promoted to 1.
    fn count_param(&self) -> u16 {
        self.params.first().copied().unwrap_or(0).max(1)
    }

    /// Parameter at `i`, defaulting to 0.
    fn param(&self, i: usize) -> u16 {
        self.params.get(i).copied().unwrap_or(0)
    }

    fn dispatch_csi(&mut self, command: u8) -> Option<Action> {
        // The only intermediate-qualified command understood is DECSCUSR.
        if command == b'q' {
            if self.intermediates.as_slice() == b" " && self.private_marker.is_none() {
                let style = self.param(0);
                if style <= 6 {
                    return Some(Action::SetCursorStyle(style as u8));
                }
            }
            debug!("unhandled CSI q variant");
            return None;
        }

        if let Some(marker) = self.private_marker {
            if marker == b'?' {
                match command {
                    b'h' => return Some(Action::DecSet(std::mem::take(&mut self.params))),
                    b'l' => return Some(Action::DecRst(std::mem::take(&mut self.params))),
                    _ => {}
                }
            }
            debug!(
                command = %(command as char),
                marker = %(marker as char),
                "unhandled private CSI command"
            );
            return None;
        }

        match command {
            b'A' => Some(Action::CursorUp(self.count_param())),
            b'B' => Some(Action::CursorDown(self.count_param())),
            b'C' => Some(Action::CursorForward(self.count_param())),
            b'D' => Some(Action::CursorBack(self.count_param())),
            b'G' => Some(Action::CursorColumn(self.count_param())),
            b'd' => Some(Action::CursorRow(self.count_param())),
            b'H' | b'f' => Some(Action::CursorPosition {
                row: self.param(0).max(1),
                col: self.param(1).max(1),
            }),
            b'J' => Some(Action::EraseDisplay(self.param(0))),
            b'K' => Some(Action::EraseLine(self.param(0))),
            b'@' => Some(Action::InsertChars(self.count_param())),
            b'L' => Some(Action::InsertLines(self.count_param())),
            b'M' => Some(Action::DeleteLines(self.count_param())),
            b'P' => Some(Action::DeleteChars(self.count_param())),
            b'S' => Some(Action::ScrollUp(self.count_param())),
            // `^` is a legacy alias for scroll down.
            b'T' | b'^' => Some(Action::ScrollDown(self.count_param())),
            b'X' => Some(Action::EraseChars(self.count_param())),
            b'r' => Some(Action::SetScrollRegion {
                top: self.param(0).max(1),
                bottom: self.param(1),
            }),
            b'm' => Some(Action::Sgr(std::mem::take(&mut self.params))),
            b'h' => Some(Action::SetMode(std::mem::take(&mut self.params))),
            b'l' => Some(Action::ResetMode(std::mem::take(&mut self.params))),
            b's' => Some(Action::SaveCursor),
            b'u' => Some(Action::RestoreCursor),
            b'c' => {
                if self.param(0) == 0 {
                    Some(Action::DeviceAttributes)
                } else {
                    None
                }
            }
            b'n' => {
                if self.param(0) == 6 {
                    Some(Action::CursorPositionReport)
                } else {
                    None
                }
            }
            b't' => {
                if self.param(0) == 18 {
                    Some(Action::WindowSizeReport)
                } else {
                    None
                }
            }
            _ => {
                debug!(command = %(command as char), "unhandled CSI command");
                None
            }
        }
    }

    /// Interpret a completed OSC payload. Only `4;N;spec` palette overrides
    /// are understood; everything else is discarded safely.
    fn decode_osc(&mut self) -> Option<Action> {
        let payload = std::mem::take(&mut self.osc);
        let payload = std::str::from_utf8(&payload).ok()?;

        let rest = payload.strip_prefix("4;")?;
        let (index, spec) = rest.split_once(';')?;
        let index: u8 = match index.parse::<u32>() {
            Ok(i) if i <= 15 => i as u8,
            _ => return None,
        };
        let color = match parse_osc_color(spec) {
            Some(c) => c,
            None => {
                debug!(spec, "unparsable OSC 4 color spec");
                return None;
            }
        };
        Some(Action::SetPaletteColor { index, color })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn feed(p: &mut Parser, bytes: &[u8]) -> Vec<Action> {
        bytes.iter().filter_map(|&b| p.advance(b)).collect()
    }

    // ── Ground state ───────────────────────────────────────────────

    #[test]
    fn printable_ascii_emits_print() {
        let mut p = Parser::new();
        assert_eq!(
            feed(&mut p, b"hi"),
            vec![Action::Print('h'), Action::Print('i')]
        );
    }

    #[test]
    fn c0_controls_emit_actions() {
        let mut p = Parser::new();
        assert_eq!(
            feed(&mut p, b"\x08\t\r\n\x0e\x0f"),
            vec![
                Action::Backspace,
                Action::Tab,
                Action::CarriageReturn,
                Action::LineFeed,
                Action::ShiftOut,
                Action::ShiftIn,
            ]
        );
    }

    #[test]
    fn unlisted_c0_controls_are_ignored() {
        let mut p = Parser::new();
        assert!(feed(&mut p, &[0x00, 0x05, 0x0b, 0x0c, 0x1f]).is_empty());
    }

    // ── UTF-8 ──────────────────────────────────────────────────────

    #[test]
    fn utf8_multibyte_characters() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, "é".as_bytes()), vec![Action::Print('é')]);
        assert_eq!(feed(&mut p, "中".as_bytes()), vec![Action::Print('中')]);
        assert_eq!(feed(&mut p, "🎉".as_bytes()), vec![Action::Print('🎉')]);
    }

    #[test]
    fn utf8_split_across_feeds() {
        let mut p = Parser::new();
        assert!(feed(&mut p, &[0xc3]).is_empty());
        assert_eq!(feed(&mut p, &[0xa9]), vec![Action::Print('é')]);
    }

    #[test]
    fn utf8_invalid_continuation_reprocesses() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, &[0xc3, b'a']), vec![Action::Print('a')]);
    }

    #[test]
    fn utf8_interrupted_by_escape() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, &[0xc3, 0x1b, b'c']), vec![Action::FullReset]);
    }

    #[test]
    fn stray_continuation_is_dropped() {
        let mut p = Parser::new();
        assert!(feed(&mut p, &[0x85]).is_empty());
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }

    // ── Escape-level sequences ─────────────────────────────────────

    #[test]
    fn esc_simple_commands() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, b"\x1b7"), vec![Action::SaveCursor]);
        assert_eq!(feed(&mut p, b"\x1b8"), vec![Action::RestoreCursor]);
        assert_eq!(feed(&mut p, b"\x1bD"), vec![Action::Index]);
        assert_eq!(feed(&mut p, b"\x1bM"), vec![Action::ReverseIndex]);
        assert_eq!(feed(&mut p, b"\x1b="), vec![Action::ApplicationKeypad(true)]);
        assert_eq!(feed(&mut p, b"\x1b>"), vec![Action::ApplicationKeypad(false)]);
        assert_eq!(feed(&mut p, b"\x1bc"), vec![Action::FullReset]);
    }

    #[test]
    fn esc_hash_8_is_screen_alignment() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, b"\x1b#8"), vec![Action::ScreenAlignment]);
        assert!(feed(&mut p, b"\x1b#3").is_empty());
    }

    #[test]
    fn charset_designation() {
        let mut p = Parser::new();
        assert_eq!(
            feed(&mut p, b"\x1b(0"),
            vec![Action::DesignateCharset { slot: 0, charset: b'0' }]
        );
        assert_eq!(
            feed(&mut p, b"\x1b)B"),
            vec![Action::DesignateCharset { slot: 1, charset: b'B' }]
        );
        // Unknown designators are consumed without effect.
        assert!(feed(&mut p, b"\x1b(K").is_empty());
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }

    #[test]
    fn unknown_escape_returns_to_ground() {
        let mut p = Parser::new();
        assert!(feed(&mut p, b"\x1bQ").is_empty());
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }

    #[test]
    fn double_escape_stays_pending() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, b"\x1b\x1bc"), vec![Action::FullReset]);
    }

    // ── CSI ────────────────────────────────────────────────────────

    #[test]
    fn csi_cursor_motion() {
        let mut p = Parser::new();
        assert_eq!(
            feed(&mut p, b"\x1b[2A\x1b[B\x1b[3C\x1b[0D"),
            vec![
                Action::CursorUp(2),
                Action::CursorDown(1),
                Action::CursorForward(3),
                Action::CursorBack(1),
            ]
        );
    }

    #[test]
    fn csi_absolute_position_is_one_based() {
        let mut p = Parser::new();
        assert_eq!(
            feed(&mut p, b"\x1b[5;10H"),
            vec![Action::CursorPosition { row: 5, col: 10 }]
        );
        assert_eq!(
            feed(&mut p, b"\x1b[0;0f"),
            vec![Action::CursorPosition { row: 1, col: 1 }]
        );
        assert_eq!(feed(&mut p, b"\x1b[7G"), vec![Action::CursorColumn(7)]);
        assert_eq!(feed(&mut p, b"\x1b[3d"), vec![Action::CursorRow(3)]);
    }

    #[test]
    fn csi_erase_commands() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, b"\x1b[J"), vec![Action::EraseDisplay(0)]);
        assert_eq!(feed(&mut p, b"\x1b[2J"), vec![Action::EraseDisplay(2)]);
        assert_eq!(feed(&mut p, b"\x1b[1K"), vec![Action::EraseLine(1)]);
        assert_eq!(feed(&mut p, b"\x1b[4X"), vec![Action::EraseChars(4)]);
    }

    #[test]
    fn csi_insert_delete_scroll() {
        let mut p = Parser::new();
        assert_eq!(
            feed(&mut p, b"\x1b[4@\x1b[P\x1b[3L\x1b[M\x1b[2S\x1b[T\x1b[2^"),
            vec![
                Action::InsertChars(4),
                Action::DeleteChars(1),
                Action::InsertLines(3),
                Action::DeleteLines(1),
                Action::ScrollUp(2),
                Action::ScrollDown(1),
                Action::ScrollDown(2),
            ]
        );
    }

    #[test]
    fn csi_scroll_region() {
        let mut p = Parser::new();
        assert_eq!(
            feed(&mut p, b"\x1b[2;10r"),
            vec![Action::SetScrollRegion { top: 2, bottom: 10 }]
        );
        assert_eq!(
            feed(&mut p, b"\x1b[r"),
            vec![Action::SetScrollRegion { top: 1, bottom: 0 }]
        );
    }

    #[test]
    fn csi_sgr_collects_params() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, b"\x1b[31m"), vec![Action::Sgr(smallvec![31])]);
        assert_eq!(feed(&mut p, b"\x1b[m"), vec![Action::Sgr(smallvec![0])]);
        assert_eq!(
            feed(&mut p, b"\x1b[38;2;1;2;3m"),
            vec![Action::Sgr(smallvec![38, 2, 1, 2, 3])]
        );
    }

    #[test]
    fn csi_modes_and_private_modes() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, b"\x1b[4h"), vec![Action::SetMode(smallvec![4])]);
        assert_eq!(feed(&mut p, b"\x1b[4l"), vec![Action::ResetMode(smallvec![4])]);
        assert_eq!(
            feed(&mut p, b"\x1b[?1049;25h"),
            vec![Action::DecSet(smallvec![1049, 25])]
        );
        assert_eq!(feed(&mut p, b"\x1b[?7l"), vec![Action::DecRst(smallvec![7])]);
    }

    #[test]
    fn csi_reports() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, b"\x1b[c"), vec![Action::DeviceAttributes]);
        assert_eq!(feed(&mut p, b"\x1b[0c"), vec![Action::DeviceAttributes]);
        assert!(feed(&mut p, b"\x1b[1c").is_empty());
        assert_eq!(feed(&mut p, b"\x1b[6n"), vec![Action::CursorPositionReport]);
        assert!(feed(&mut p, b"\x1b[5n").is_empty());
        assert_eq!(feed(&mut p, b"\x1b[18t"), vec![Action::WindowSizeReport]);
        assert!(feed(&mut p, b"\x1b[19t").is_empty());
    }

    #[test]
    fn csi_cursor_style() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, b"\x1b[4 q"), vec![Action::SetCursorStyle(4)]);
        assert_eq!(feed(&mut p, b"\x1b[ q"), vec![Action::SetCursorStyle(0)]);
        assert!(feed(&mut p, b"\x1b[9 q").is_empty());
        // Bare CSI q without the space intermediate is not DECSCUSR.
        assert!(feed(&mut p, b"\x1b[2q").is_empty());
    }

    #[test]
    fn csi_save_restore() {
        let mut p = Parser::new();
        assert_eq!(feed(&mut p, b"\x1b[s"), vec![Action::SaveCursor]);
        assert_eq!(feed(&mut p, b"\x1b[u"), vec![Action::RestoreCursor]);
    }

    #[test]
    fn csi_param_cap_drops_excess() {
        let mut p = Parser::new();
        let mut seq = b"\x1b[".to_vec();
        seq.extend(b"1;".repeat(30));
        seq.push(b'm');
        let actions = feed(&mut p, &seq);
        assert_eq!(actions.len(), 1);
        let Action::Sgr(params) = &actions[0] else {
            panic!("expected SGR");
        };
        assert_eq!(params.len(), CSI_MAX_PARAMS);
    }

    #[test]
    fn csi_unknown_final_is_dropped() {
        let mut p = Parser::new();
        assert!(feed(&mut p, b"\x1b[5y").is_empty());
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }

    #[test]
    fn csi_stray_byte_reprocesses_in_ground() {
        let mut p = Parser::new();
        // 0x05 is neither a parameter nor a final byte; the sequence is
        // abandoned but the stream resynchronizes.
        assert!(feed(&mut p, b"\x1b[1\x05").is_empty());
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }

    #[test]
    fn csi_param_overflow_saturates() {
        let mut p = Parser::new();
        let actions = feed(&mut p, b"\x1b[99999999A");
        assert_eq!(actions, vec![Action::CursorUp(u16::MAX)]);
    }

    // ── OSC ────────────────────────────────────────────────────────

    #[test]
    fn osc_palette_override_bel_terminated() {
        let mut p = Parser::new();
        assert_eq!(
            feed(&mut p, b"\x1b]4;1;#ff0000\x07"),
            vec![Action::SetPaletteColor {
                index: 1,
                color: Rgba::new(255, 0, 0)
            }]
        );
    }

    #[test]
    fn osc_palette_override_st_terminated() {
        let mut p = Parser::new();
        assert_eq!(
            feed(&mut p, b"\x1b]4;3;rgb:10/20/30\x1b\\"),
            vec![Action::SetPaletteColor {
                index: 3,
                color: Rgba::new(0x10, 0x20, 0x30)
            }]
        );
    }

    #[test]
    fn osc_other_payloads_are_discarded() {
        let mut p = Parser::new();
        assert!(feed(&mut p, b"\x1b]0;window title\x07").is_empty());
        assert!(feed(&mut p, b"\x1b]4;99;#ff0000\x07").is_empty());
        assert!(feed(&mut p, b"\x1b]4;1;nonsense\x07").is_empty());
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }

    #[test]
    fn osc_aborts_on_control_byte() {
        let mut p = Parser::new();
        assert!(feed(&mut p, b"\x1b]4;1;#ff0000\n").is_empty());
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }

    #[test]
    fn osc_payload_cap_is_enforced() {
        let mut p = Parser::new();
        let mut seq = b"\x1b]4;1;".to_vec();
        seq.extend(std::iter::repeat(b'a').take(4096));
        seq.push(0x07);
        assert!(feed(&mut p, &seq).is_empty());
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }

    // ── DCS ────────────────────────────────────────────────────────

    #[test]
    fn dcs_payload_is_discarded() {
        let mut p = Parser::new();
        assert!(feed(&mut p, b"\x1bPsome payload\x1b\\").is_empty());
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }

    // ── Integration ────────────────────────────────────────────────

    #[test]
    fn mixed_stream() {
        let mut p = Parser::new();
        let mut input = Vec::new();
        input.extend_from_slice("日本".as_bytes());
        input.extend_from_slice(b"\x1b[31m");
        input.extend_from_slice(b"\x1b[5;1H");
        assert_eq!(
            feed(&mut p, &input),
            vec![
                Action::Print('日'),
                Action::Print('本'),
                Action::Sgr(smallvec![31]),
                Action::CursorPosition { row: 5, col: 1 },
            ]
        );
    }

    #[test]
    fn reset_discards_partial_sequence() {
        let mut p = Parser::new();
        assert!(feed(&mut p, b"\x1b[12;3").is_empty());
        p.reset();
        assert_eq!(feed(&mut p, b"x"), vec![Action::Print('x')]);
    }
}
