//! Terminal engine: applies parser actions to the grid, modes, and palette.
//!
//! [`Term`] composes the [`Grid`], [`Parser`], [`Palette`], and
//! [`ReplyBuffer`] behind one `feed` entry point. The host loop hands it
//! every PTY read window, then flushes [`Term::replies`] back to the PTY
//! before the next read.
//!
//! # Cursor invariants
//!
//! `cursor_y` is always within `0..rows`. `cursor_x` ranges over
//! `0..=cols`: the value `cols` is the pending-wrap position reached after
//! writing into the last column. With autowrap on, the next printed
//! character performs the wrap; with autowrap off, further prints keep
//! overwriting the last column.
//!
//! The scroll region is stored 1-based (`1 <= scroll_top <= scroll_bottom
//! <= rows`) to match the wire protocol; grid calls convert to 0-based.

use std::path::Path;

use tracing::warn;

use crate::cell::{AttrFlags, Glyph, Rgba};
use crate::charset::translate_charset;
use crate::dirty::DirtyTracker;
use crate::error::Error;
use crate::grid::Grid;
use crate::modes::{CursorStyle, Modes};
use crate::palette::Palette;
use crate::parser::{Action, CsiParams, Parser};
use crate::reply::ReplyBuffer;

/// Snapshot of cursor state for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorView {
    /// Column; may equal `cols` in the pending-wrap position.
    pub x: u16,
    /// Row, always within the screen.
    pub y: u16,
    pub style: CursorStyle,
    /// DECTCEM visibility.
    pub visible: bool,
    /// Current phase of the blink cycle (true = drawn).
    pub blink_on: bool,
}

/// The terminal engine.
#[derive(Debug)]
pub struct Term {
    grid: Grid,
    palette: Palette,
    parser: Parser,
    reply: ReplyBuffer,

    cursor_x: u16,
    cursor_y: u16,
    saved_cursor: (u16, u16),
    /// Cursor stashed when entering the alternate screen (DEC 1049).
    normal_saved_cursor: (u16, u16),

    /// 1-based inclusive scroll region.
    scroll_top: u16,
    scroll_bottom: u16,

    modes: Modes,
    cursor_style: CursorStyle,
    cursor_blink_on: bool,

    fg: Rgba,
    bg: Rgba,
    attrs: AttrFlags,

    /// G0/G1 designators (`B` or `0`).
    charsets: [u8; 2],
    active_charset: usize,
}

impl Term {
    /// Create a terminal with the given dimensions and palette.
    ///
    /// Dimensions are clamped to at least 1x1. Fails only on allocation.
    pub fn new(cols: u16, rows: u16, scrollback: usize, palette: Palette) -> Result<Self, Error> {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let blank = Glyph::blank(palette.default_fg, palette.default_bg, AttrFlags::empty());
        let grid = Grid::new(cols, rows, scrollback, blank)?;
        let mut term = Self {
            grid,
            parser: Parser::new(),
            reply: ReplyBuffer::new(),
            cursor_x: 0,
            cursor_y: 0,
            saved_cursor: (0, 0),
            normal_saved_cursor: (0, 0),
            scroll_top: 1,
            scroll_bottom: rows,
            modes: Modes::default(),
            cursor_style: CursorStyle::Block,
            cursor_blink_on: true,
            fg: palette.default_fg,
            bg: palette.default_bg,
            attrs: AttrFlags::empty(),
            charsets: [b'B', b'B'],
            active_charset: 0,
            palette,
        };
        term.reset();
        Ok(term)
    }

    /// Convenience constructor loading an optional theme file.
    pub fn with_theme(
        cols: u16,
        rows: u16,
        scrollback: usize,
        theme: Option<&Path>,
    ) -> Result<Self, Error> {
        Self::new(cols, rows, scrollback, Palette::with_theme(theme))
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn cols(&self) -> u16 {
        self.grid.cols()
    }

    #[must_use]
    pub fn rows(&self) -> u16 {
        self.grid.rows()
    }

    #[must_use]
    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Cursor state for the renderer.
    #[must_use]
    pub fn cursor(&self) -> CursorView {
        CursorView {
            x: self.cursor_x,
            y: self.cursor_y,
            style: self.cursor_style,
            visible: self.modes.cursor_visible,
            blink_on: self.cursor_blink_on,
        }
    }

    /// The row shown at screen position `y`, honoring the view offset.
    #[must_use]
    pub fn view_line(&self, y: u16) -> Option<&[Glyph]> {
        self.grid.view_line(y)
    }

    /// Damage state for the renderer.
    #[must_use]
    pub fn dirty(&self) -> &DirtyTracker {
        self.grid.dirty()
    }

    /// Clear damage bits after a repaint.
    pub fn clear_dirty(&mut self) {
        self.grid.clear_dirty();
    }

    /// Pending report bytes awaiting a flush to the PTY.
    #[must_use]
    pub fn replies(&self) -> &[u8] {
        self.reply.pending()
    }

    /// Discard flushed report bytes.
    pub fn clear_replies(&mut self) {
        self.reply.clear();
    }

    // ── Host-facing operations ──────────────────────────────────────

    /// Consume a PTY read window, applying every resulting action.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if let Some(action) = self.parser.advance(b) {
                self.apply(action);
            }
        }
    }

    /// Scroll the scrollback view (positive = further back). Returns
    /// whether the viewport changed.
    pub fn scroll_view(&mut self, amount: i32) -> bool {
        self.grid.scroll_view(amount)
    }

    /// Snap the scrollback view to the live bottom.
    pub fn reset_view(&mut self) -> bool {
        self.grid.reset_view()
    }

    /// Toggle the cursor blink phase. Marks the cursor row dirty when the
    /// cursor can actually be on screen; returns whether it did.
    pub fn toggle_cursor_blink(&mut self) -> bool {
        self.cursor_blink_on = !self.cursor_blink_on;
        if self.grid.view_offset() == 0 {
            self.grid.dirty_mut().mark(self.cursor_y);
            true
        } else {
            false
        }
    }

    /// DECTCEM toggle, driven by the host's internal command path.
    pub fn toggle_cursor_visibility(&mut self) {
        self.modes.cursor_visible = !self.modes.cursor_visible;
        self.grid.dirty_mut().mark(self.cursor_y);
    }

    /// Enable/disable cursor blinking; re-arms the drawn phase when enabled.
    pub fn toggle_cursor_blink_enabled(&mut self) {
        self.modes.cursor_blink = !self.modes.cursor_blink;
        if self.modes.cursor_blink {
            self.cursor_blink_on = true;
        }
        self.grid.dirty_mut().mark(self.cursor_y);
    }

    /// Cycle Block -> Underline -> Bar.
    pub fn cycle_cursor_style(&mut self) {
        self.cursor_style = self.cursor_style.cycled();
        self.grid.dirty_mut().mark(self.cursor_y);
    }

    /// Clear every visible row with the current paint.
    pub fn clear_visible_screen(&mut self) {
        let blank = self.blank();
        self.grid.clear_screen(blank);
    }

    /// Resize to new dimensions.
    ///
    /// Destructive by design: scrollback is discarded and the terminal is
    /// fully reset. On allocation failure the previous state is kept and a
    /// warning is logged.
    pub fn resize(&mut self, new_cols: u16, new_rows: u16) -> Result<(), Error> {
        let new_cols = new_cols.max(1);
        let new_rows = new_rows.max(1);
        let blank = Glyph::blank(
            self.palette.default_fg,
            self.palette.default_bg,
            AttrFlags::empty(),
        );
        if let Err(err) = self.grid.resize(new_cols, new_rows, blank) {
            warn!(%err, "terminal resize failed, keeping previous geometry");
            return Err(err);
        }
        self.reset();
        Ok(())
    }

    /// Full reset (RIS): restore fresh-construction state for the current
    /// dimensions and palette.
    pub fn reset(&mut self) {
        self.fg = self.palette.default_fg;
        self.bg = self.palette.default_bg;
        self.attrs = AttrFlags::empty();

        self.cursor_x = 0;
        self.cursor_y = 0;
        self.saved_cursor = (0, 0);
        self.normal_saved_cursor = (0, 0);
        self.scroll_top = 1;
        self.scroll_bottom = self.grid.rows();

        self.modes = Modes::default();
        self.cursor_style = CursorStyle::Block;
        self.cursor_blink_on = true;
        self.charsets = [b'B', b'B'];
        self.active_charset = 0;

        self.parser.reset();

        let blank = Glyph::blank(self.fg, self.bg, AttrFlags::empty());
        self.grid.reset(blank);
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Blank glyph carrying the current paint, used for every erase.
    fn blank(&self) -> Glyph {
        Glyph::blank(self.fg, self.bg, self.attrs)
    }

    /// 0-based scroll region bounds.
    fn region(&self) -> (u16, u16) {
        (self.scroll_top - 1, self.scroll_bottom - 1)
    }

    fn report(&mut self, bytes: &[u8]) {
        self.reply.push_report(bytes);
    }

    /// Write one printable character at the cursor and advance.
    fn put_char(&mut self, ch: char) {
        let cols = self.grid.cols();

        if self.modes.autowrap && self.cursor_x >= cols {
            self.cursor_x = 0;
            self.newline();
        }
        if self.modes.insert {
            let blank = self.blank();
            self.grid.insert_chars(self.cursor_y, self.cursor_x, 1, blank);
        }

        let write_x = self.cursor_x.min(cols - 1);
        let mapped = if (ch as u32) < 128 {
            translate_charset(ch, self.charsets[self.active_charset])
        } else {
            ch
        };
        let glyph = Glyph::new(mapped, self.fg, self.bg, self.attrs);
        if let Some(line) = self.grid.line_mut(self.cursor_y) {
            line[write_x as usize] = glyph;
        }
        self.grid.dirty_mut().mark(self.cursor_y);
        if self.cursor_x < cols {
            self.cursor_x += 1;
        }
    }

    /// Move to the next row, scrolling the region when leaving it.
    fn newline(&mut self) {
        self.cursor_y += 1;
        if self.cursor_y >= self.scroll_bottom {
            self.cursor_y = self.scroll_bottom - 1;
            let blank = self.blank();
            if self.scroll_top == 1 && self.scroll_bottom == self.grid.rows() {
                self.grid.scroll_up_full(blank);
            } else {
                let (top, bottom) = self.region();
                self.grid.scroll_region(top, bottom, 1, blank);
            }
        }
    }

    fn tab(&mut self) {
        let next = (u32::from(self.cursor_x) + 8) & !7;
        if next >= u32::from(self.grid.cols()) {
            self.cursor_x = 0;
            self.newline();
        } else {
            self.cursor_x = next as u16;
        }
    }

    fn reverse_index(&mut self) {
        if self.cursor_y + 1 <= self.scroll_top {
            self.cursor_y = self.scroll_top - 1;
            let blank = self.blank();
            let (top, bottom) = self.region();
            self.grid.scroll_region(top, bottom, -1, blank);
        } else {
            self.cursor_y -= 1;
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Print(ch) => self.put_char(ch),
            Action::Backspace => self.cursor_x = self.cursor_x.saturating_sub(1),
            Action::Tab => self.tab(),
            Action::LineFeed | Action::Index => self.newline(),
            Action::CarriageReturn => self.cursor_x = 0,
            Action::ShiftOut => self.active_charset = 1,
            Action::ShiftIn => self.active_charset = 0,
            Action::DesignateCharset { slot, charset } => {
                if let Some(entry) = self.charsets.get_mut(slot as usize) {
                    *entry = charset;
                }
            }
            Action::SaveCursor => self.saved_cursor = (self.cursor_x, self.cursor_y),
            Action::RestoreCursor => {
                let (x, y) = self.saved_cursor;
                self.cursor_x = x;
                self.cursor_y = y;
            }
            Action::ReverseIndex => self.reverse_index(),
            Action::ApplicationKeypad(on) => self.modes.application_keypad = on,
            Action::FullReset => self.reset(),
            Action::ScreenAlignment => {
                let glyph = Glyph::new(
                    'E',
                    self.palette.default_fg,
                    self.palette.default_bg,
                    AttrFlags::empty(),
                );
                self.grid.fill_screen(glyph);
            }

            Action::CursorUp(n) => {
                let top = self.scroll_top - 1;
                self.cursor_y = self.cursor_y.saturating_sub(n).max(top);
            }
            Action::CursorDown(n) => {
                self.cursor_y = self.cursor_y.saturating_add(n).min(self.scroll_bottom - 1);
            }
            Action::CursorForward(n) => {
                self.cursor_x = self.cursor_x.saturating_add(n).min(self.grid.cols() - 1);
            }
            Action::CursorBack(n) => {
                self.cursor_x = self.cursor_x.saturating_sub(n).min(self.grid.cols() - 1);
            }
            Action::CursorColumn(col) => {
                self.cursor_x = (col - 1).min(self.grid.cols() - 1);
            }
            Action::CursorRow(row) => {
                self.cursor_y = (row - 1).min(self.grid.rows() - 1);
            }
            Action::CursorPosition { row, col } => self.cursor_position(row, col),

            Action::EraseDisplay(mode) => self.erase_display(mode),
            Action::EraseLine(mode) => self.erase_line(mode),

            Action::InsertChars(n) => {
                let blank = self.blank();
                self.grid.insert_chars(self.cursor_y, self.cursor_x, n, blank);
            }
            Action::DeleteChars(n) => {
                let blank = self.blank();
                self.grid.delete_chars(self.cursor_y, self.cursor_x, n, blank);
            }
            Action::EraseChars(n) => {
                let blank = self.blank();
                self.grid.erase_chars(self.cursor_y, self.cursor_x, n, blank);
            }

            Action::InsertLines(n) => self.insert_delete_lines(n, false),
            Action::DeleteLines(n) => self.insert_delete_lines(n, true),
            Action::ScrollUp(n) => {
                let blank = self.blank();
                let (top, bottom) = self.region();
                self.grid.scroll_region(top, bottom, i32::from(n), blank);
            }
            Action::ScrollDown(n) => {
                let blank = self.blank();
                let (top, bottom) = self.region();
                self.grid.scroll_region(top, bottom, -i32::from(n), blank);
            }
            Action::SetScrollRegion { top, bottom } => {
                let rows = self.grid.rows();
                let bottom = if bottom == 0 { rows } else { bottom };
                if top < bottom && bottom <= rows {
                    self.scroll_top = top;
                    self.scroll_bottom = bottom;
                    self.cursor_x = 0;
                    self.cursor_y = 0;
                }
            }

            Action::Sgr(params) => self.apply_sgr(&params),
            Action::SetMode(params) => self.set_ansi_modes(&params, true),
            Action::ResetMode(params) => self.set_ansi_modes(&params, false),
            Action::DecSet(params) => self.set_dec_modes(&params, true),
            Action::DecRst(params) => self.set_dec_modes(&params, false),
            Action::SetCursorStyle(style) => self.set_cursor_style(style),

            Action::DeviceAttributes => self.report(b"\x1b[?1;2c"),
            Action::CursorPositionReport => {
                let report = format!("\x1b[{};{}R", self.cursor_y + 1, self.cursor_x + 1);
                self.report(report.as_bytes());
            }
            Action::WindowSizeReport => {
                let report = format!("\x1b[8;{};{}t", self.grid.rows(), self.grid.cols());
                self.report(report.as_bytes());
            }

            Action::SetPaletteColor { index, color } => self.palette.set_indexed(index, color),
        }
    }

    /// CUP/HVP with 1-based wire coordinates; origin mode offsets into the
    /// scroll region and clamps there.
    fn cursor_position(&mut self, row: u16, col: u16) {
        let cols = self.grid.cols();
        let rows = self.grid.rows();
        if self.modes.origin {
            let y = u32::from(row - 1) + u32::from(self.scroll_top - 1);
            let y = y.clamp(
                u32::from(self.scroll_top - 1),
                u32::from(self.scroll_bottom - 1),
            );
            self.cursor_y = y as u16;
        } else {
            self.cursor_y = (row - 1).min(rows - 1);
        }
        self.cursor_x = (col - 1).min(cols - 1);
    }

    fn erase_display(&mut self, mode: u16) {
        let blank = self.blank();
        match mode {
            0 => {
                self.grid.clear_line(self.cursor_y, self.cursor_x, blank);
                for y in self.cursor_y + 1..self.grid.rows() {
                    self.grid.clear_line(y, 0, blank);
                }
            }
            1 => {
                for y in 0..self.cursor_y {
                    self.grid.clear_line(y, 0, blank);
                }
                self.grid.clear_line_to(self.cursor_y, self.cursor_x, blank);
            }
            2 => self.grid.clear_screen(blank),
            _ => {}
        }
    }

    fn erase_line(&mut self, mode: u16) {
        let blank = self.blank();
        match mode {
            0 => self.grid.clear_line(self.cursor_y, self.cursor_x, blank),
            1 => self.grid.clear_line_to(self.cursor_y, self.cursor_x, blank),
            2 => self.grid.clear_line(self.cursor_y, 0, blank),
            _ => {}
        }
    }

    /// IL/DL: effective only with the cursor inside the scroll region.
    fn insert_delete_lines(&mut self, n: u16, delete: bool) {
        let (top, bottom) = self.region();
        if self.cursor_y < top || self.cursor_y > bottom {
            return;
        }
        let blank = self.blank();
        let amount = if delete { i32::from(n) } else { -i32::from(n) };
        self.grid.scroll_region(self.cursor_y, bottom, amount, blank);
    }

    fn set_ansi_modes(&mut self, params: &CsiParams, value: bool) {
        for &param in params {
            if param == 4 {
                self.modes.insert = value;
            }
        }
    }

    fn set_dec_modes(&mut self, params: &CsiParams, value: bool) {
        for &param in params {
            match param {
                1 => self.modes.application_cursor = value,
                6 => {
                    self.modes.origin = value;
                    self.cursor_x = 0;
                    self.cursor_y = if value { self.scroll_top - 1 } else { 0 };
                }
                7 => self.modes.autowrap = value,
                25 => self.modes.cursor_visible = value,
                66 => self.modes.application_keypad = value,
                1049 => {
                    if value {
                        self.enter_alt_screen();
                    } else {
                        self.leave_alt_screen();
                    }
                }
                _ => {}
            }
        }
    }

    fn enter_alt_screen(&mut self) {
        if self.grid.alt_active() {
            return;
        }
        let blank = self.blank();
        if let Err(err) = self.grid.enter_alt(blank) {
            warn!(%err, "could not allocate alternate screen");
            return;
        }
        self.normal_saved_cursor = (self.cursor_x, self.cursor_y);
        self.clear_visible_screen();
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    fn leave_alt_screen(&mut self) {
        if !self.grid.alt_active() {
            return;
        }
        self.grid.leave_alt();
        let (x, y) = self.normal_saved_cursor;
        self.cursor_x = x;
        self.cursor_y = y;
    }

    /// DECSCUSR style codes 0..=6 map onto (style, blinking) pairs.
    fn set_cursor_style(&mut self, code: u8) {
        let (style, blinking) = match code {
            0 | 1 => (CursorStyle::Block, true),
            2 => (CursorStyle::Block, false),
            3 => (CursorStyle::Underline, true),
            4 => (CursorStyle::Underline, false),
            5 => (CursorStyle::Bar, true),
            6 => (CursorStyle::Bar, false),
            _ => return,
        };
        self.cursor_style = style;
        self.modes.cursor_blink = blinking;
    }

    fn apply_sgr(&mut self, params: &CsiParams) {
        let mut i = 0;
        while i < params.len() {
            let code = params[i];
            match code {
                0 => {
                    self.fg = self.palette.default_fg;
                    self.bg = self.palette.default_bg;
                    self.attrs = AttrFlags::empty();
                }
                1 => self.attrs.insert(AttrFlags::BOLD),
                3 => self.attrs.insert(AttrFlags::ITALIC),
                4 => self.attrs.insert(AttrFlags::UNDERLINE),
                5 => self.attrs.insert(AttrFlags::BLINK),
                7 => self.attrs.insert(AttrFlags::INVERSE),
                22 => self.attrs.remove(AttrFlags::BOLD),
                23 => self.attrs.remove(AttrFlags::ITALIC),
                24 => self.attrs.remove(AttrFlags::UNDERLINE),
                25 => self.attrs.remove(AttrFlags::BLINK),
                27 => self.attrs.remove(AttrFlags::INVERSE),
                30..=37 => self.fg = self.palette.ansi[(code - 30) as usize],
                40..=47 => self.bg = self.palette.ansi[(code - 40) as usize],
                90..=97 => self.fg = self.palette.ansi[(code - 90 + 8) as usize],
                100..=107 => self.bg = self.palette.ansi[(code - 100 + 8) as usize],
                38 => i += self.apply_extended_color(params, i, true),
                48 => i += self.apply_extended_color(params, i, false),
                39 => self.fg = self.palette.default_fg,
                49 => self.bg = self.palette.default_bg,
                _ => {}
            }
            i += 1;
        }
    }

    /// SGR 38/48 extended colors; returns how many extra params were used.
    fn apply_extended_color(&mut self, params: &CsiParams, start: usize, is_fg: bool) -> usize {
        let mode = match params.get(start + 1) {
            Some(&m) => m,
            None => return 0,
        };
        match mode {
            5 => {
                if let Some(&index) = params.get(start + 2) {
                    if index <= 255 {
                        let color = self.palette.xterm[index as usize];
                        if is_fg {
                            self.fg = color;
                        } else {
                            self.bg = color;
                        }
                    }
                    return 2;
                }
                0
            }
            2 => {
                if start + 4 < params.len() {
                    let color = Rgba::new(
                        (params[start + 2] & 0xFF) as u8,
                        (params[start + 3] & 0xFF) as u8,
                        (params[start + 4] & 0xFF) as u8,
                    );
                    if is_fg {
                        self.fg = color;
                    } else {
                        self.bg = color;
                    }
                    return 4;
                }
                0
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(cols: u16, rows: u16, scrollback: usize) -> Term {
        Term::new(cols, rows, scrollback, Palette::new()).unwrap()
    }

    fn row_text(t: &Term, y: u16) -> String {
        t.view_line(y).unwrap().iter().map(|g| g.ch).collect()
    }

    #[test]
    fn prints_advance_cursor() {
        let mut t = term(5, 2, 0);
        t.feed(b"ab");
        assert_eq!(row_text(&t, 0), "ab   ");
        let c = t.cursor();
        assert_eq!((c.x, c.y), (2, 0));
    }

    #[test]
    fn cursor_parks_one_past_margin() {
        let mut t = term(3, 2, 0);
        t.feed(b"abc");
        assert_eq!(t.cursor().x, 3);
        // Next print wraps.
        t.feed(b"d");
        assert_eq!(row_text(&t, 1), "d  ");
        assert_eq!((t.cursor().x, t.cursor().y), (1, 1));
    }

    #[test]
    fn autowrap_off_overwrites_last_column() {
        let mut t = term(3, 2, 0);
        t.feed(b"\x1b[?7l");
        t.feed(b"abcdef");
        assert_eq!(row_text(&t, 0), "abf");
        assert_eq!(row_text(&t, 1), "   ");
        assert_eq!(t.cursor().y, 0);
    }

    #[test]
    fn carriage_return_and_backspace() {
        let mut t = term(5, 1, 0);
        t.feed(b"abc\rx");
        assert_eq!(row_text(&t, 0), "xbc  ");
        t.feed(b"\x08\x08y");
        assert_eq!(row_text(&t, 0), "ybc  ");
    }

    #[test]
    fn tab_advances_to_multiple_of_eight() {
        let mut t = term(20, 2, 0);
        t.feed(b"ab\tc");
        assert_eq!(t.view_line(0).unwrap()[8].ch, 'c');
        // Tab at the right edge wraps to a fresh line.
        let mut t = term(8, 2, 0);
        t.feed(b"ab\tc");
        assert_eq!(row_text(&t, 1), "c       ");
    }

    #[test]
    fn newline_at_bottom_scrolls_into_history() {
        let mut t = term(5, 2, 10);
        t.feed(b"abcde");
        assert_eq!(row_text(&t, 0), "abcde");
        t.feed(b"f");
        assert_eq!(row_text(&t, 0), "abcde");
        assert_eq!(row_text(&t, 1), "f    ");
        assert_eq!((t.cursor().x, t.cursor().y), (1, 1));
        assert_eq!(t.grid().history_size(), 0);

        t.feed(b"\n1\n2");
        assert_eq!(t.grid().history_size(), 1);
        assert_eq!(
            t.grid()
                .history_line(0)
                .unwrap()
                .iter()
                .map(|g| g.ch)
                .collect::<String>(),
            "abcde"
        );
    }

    #[test]
    fn ansi_colors_scenario() {
        let mut t = term(3, 1, 0);
        t.feed(b"\x1b[31mR\x1b[32mG\x1b[0mX");
        let line = t.view_line(0).unwrap();
        assert_eq!(line[0].ch, 'R');
        assert_eq!(line[0].fg, t.palette().ansi[1]);
        assert_eq!(line[1].ch, 'G');
        assert_eq!(line[1].fg, t.palette().ansi[2]);
        assert_eq!(line[2].ch, 'X');
        assert_eq!(line[2].fg, t.palette().default_fg);
        assert_eq!((t.cursor().x, t.cursor().y), (3, 0));
    }

    #[test]
    fn sgr_extended_colors() {
        let mut t = term(4, 1, 0);
        t.feed(b"\x1b[38;5;196ma\x1b[48;2;1;2;3mb");
        let line = t.view_line(0).unwrap();
        assert_eq!(line[0].fg, t.palette().xterm[196]);
        assert_eq!(line[1].bg, Rgba::new(1, 2, 3));
    }

    #[test]
    fn sgr_attributes_set_and_clear() {
        let mut t = term(4, 1, 0);
        t.feed(b"\x1b[1;4ma\x1b[24mb\x1b[0mc");
        let line = t.view_line(0).unwrap();
        assert_eq!(line[0].attrs, AttrFlags::BOLD | AttrFlags::UNDERLINE);
        assert_eq!(line[1].attrs, AttrFlags::BOLD);
        assert_eq!(line[2].attrs, AttrFlags::empty());
    }

    #[test]
    fn bright_colors_map_high_palette() {
        let mut t = term(2, 1, 0);
        t.feed(b"\x1b[91;103mx");
        let g = t.view_line(0).unwrap()[0];
        assert_eq!(g.fg, t.palette().ansi[9]);
        assert_eq!(g.bg, t.palette().ansi[11]);
    }

    #[test]
    fn cursor_motion_clamps() {
        let mut t = term(10, 5, 0);
        t.feed(b"\x1b[99B\x1b[99C");
        assert_eq!((t.cursor().x, t.cursor().y), (9, 4));
        t.feed(b"\x1b[99A\x1b[99D");
        assert_eq!((t.cursor().x, t.cursor().y), (0, 0));
        t.feed(b"\x1b[3;7H");
        assert_eq!((t.cursor().x, t.cursor().y), (6, 2));
        t.feed(b"\x1b[4G\x1b[2d");
        assert_eq!((t.cursor().x, t.cursor().y), (3, 1));
    }

    #[test]
    fn cursor_up_respects_scroll_region() {
        let mut t = term(10, 6, 0);
        t.feed(b"\x1b[2;5r");
        t.feed(b"\x1b[4;1H\x1b[99A");
        assert_eq!(t.cursor().y, 1);
    }

    #[test]
    fn origin_mode_addresses_region() {
        let mut t = term(10, 6, 0);
        t.feed(b"\x1b[2;5r\x1b[?6h");
        assert_eq!(t.cursor().y, 1);
        t.feed(b"\x1b[1;1H");
        assert_eq!((t.cursor().x, t.cursor().y), (0, 1));
        t.feed(b"\x1b[99;1H");
        assert_eq!(t.cursor().y, 4);
        t.feed(b"\x1b[?6l");
        assert_eq!((t.cursor().x, t.cursor().y), (0, 0));
    }

    #[test]
    fn erase_display_modes() {
        let mut t = term(3, 3, 0);
        t.feed(b"aaa\r\nbbb\r\nccc");
        t.feed(b"\x1b[2;2H\x1b[0J");
        assert_eq!(row_text(&t, 0), "aaa");
        assert_eq!(row_text(&t, 1), "b  ");
        assert_eq!(row_text(&t, 2), "   ");

        let mut t = term(3, 3, 0);
        t.feed(b"aaa\r\nbbb\r\nccc");
        t.feed(b"\x1b[2;2H\x1b[1J");
        assert_eq!(row_text(&t, 0), "   ");
        assert_eq!(row_text(&t, 1), "  b");
        assert_eq!(row_text(&t, 2), "ccc");

        t.feed(b"\x1b[2J");
        assert_eq!(row_text(&t, 2), "   ");
    }

    #[test]
    fn erase_line_modes() {
        let mut t = term(5, 1, 0);
        t.feed(b"abcde\x1b[3G\x1b[K");
        assert_eq!(row_text(&t, 0), "ab   ");
        t.feed(b"\x1b[2K");
        assert_eq!(row_text(&t, 0), "     ");
        t.feed(b"abcde\x1b[3G\x1b[1K");
        assert_eq!(row_text(&t, 0), "   de");
    }

    #[test]
    fn erase_uses_current_background() {
        let mut t = term(3, 1, 0);
        t.feed(b"\x1b[41mab\x1b[K");
        let line = t.view_line(0).unwrap();
        assert_eq!(line[2].bg, t.palette().ansi[1]);
    }

    #[test]
    fn insert_and_delete_lines_respect_region() {
        let mut t = term(2, 4, 0);
        t.feed(b"AA\r\nBB\r\nCC\r\nDD");
        t.feed(b"\x1b[2;3r\x1b[2;1H\x1b[L");
        assert_eq!(row_text(&t, 0), "AA");
        assert_eq!(row_text(&t, 1), "  ");
        assert_eq!(row_text(&t, 2), "BB");
        assert_eq!(row_text(&t, 3), "DD");
        t.feed(b"\x1b[M");
        assert_eq!(row_text(&t, 1), "BB");
        assert_eq!(row_text(&t, 2), "  ");
        // Cursor outside the region: no-op.
        t.feed(b"\x1b[4;1H\x1b[M");
        assert_eq!(row_text(&t, 3), "DD");
    }

    #[test]
    fn scroll_region_one_row_does_not_move_neighbors() {
        let mut t = term(2, 3, 0);
        t.feed(b"AA\r\nBB\r\nCC");
        t.feed(b"\x1b[2;2r\x1b[S");
        assert_eq!(row_text(&t, 0), "AA");
        assert_eq!(row_text(&t, 2), "CC");
    }

    #[test]
    fn decstbm_rejects_degenerate_regions() {
        let mut t = term(5, 4, 0);
        t.feed(b"\x1b[3;3r");
        t.feed(b"abcde\nf");
        // Region was rejected, so scrolling still spans the full screen.
        let mut bottom = term(5, 4, 0);
        bottom.feed(b"abcde\nf");
        assert_eq!(row_text(&t, 1), row_text(&bottom, 1));
    }

    #[test]
    fn reverse_index_scrolls_region_down() {
        let mut t = term(2, 3, 0);
        t.feed(b"AA\r\nBB\r\nCC");
        t.feed(b"\x1b[1;1H\x1bM");
        assert_eq!(row_text(&t, 0), "  ");
        assert_eq!(row_text(&t, 1), "AA");
        assert_eq!(row_text(&t, 2), "BB");
    }

    #[test]
    fn charset_graphics_mode() {
        let mut t = term(3, 1, 0);
        t.feed(b"\x1b(0qx\x0fq");
        let line = t.view_line(0).unwrap();
        assert_eq!(line[0].ch, '─');
        assert_eq!(line[1].ch, '│');
        // SI selects G0... which is the graphics set here; designate back.
        let mut t = term(3, 1, 0);
        t.feed(b"\x1b)0q\x0eq\x0fq");
        let line = t.view_line(0).unwrap();
        assert_eq!(line[0].ch, 'q');
        assert_eq!(line[1].ch, '─');
        assert_eq!(line[2].ch, 'q');
    }

    #[test]
    fn alt_screen_round_trip() {
        let mut t = term(5, 3, 10);
        t.feed(b"hello\x1b[2;3H");
        let before = t.cursor();
        t.feed(b"\x1b[?1049h");
        assert!(t.grid().alt_active());
        assert_eq!((t.cursor().x, t.cursor().y), (0, 0));
        assert_eq!(row_text(&t, 0), "     ");
        t.feed(b"alt!!");
        t.feed(b"\x1b[?1049l");
        assert!(!t.grid().alt_active());
        assert_eq!(row_text(&t, 0), "hello");
        assert_eq!((t.cursor().x, t.cursor().y), (before.x, before.y));
    }

    #[test]
    fn alt_screen_blocks_history_and_view() {
        let mut t = term(3, 2, 10);
        t.feed(b"a\n\n\n");
        assert!(t.grid().history_size() > 0);
        t.feed(b"\x1b[?1049h");
        let history = t.grid().history_size();
        t.feed(b"x\n\n\n");
        assert_eq!(t.grid().history_size(), history);
        assert!(!t.scroll_view(1));
    }

    #[test]
    fn device_attributes_report() {
        let mut t = term(5, 3, 0);
        t.feed(b"\x1b[c");
        assert_eq!(t.replies(), b"\x1b[?1;2c");
        // A second query is dropped until the first is flushed.
        t.feed(b"\x1b[6n");
        assert_eq!(t.replies(), b"\x1b[?1;2c");
        t.clear_replies();
        t.feed(b"\x1b[6n");
        assert_eq!(t.replies(), b"\x1b[1;1R");
    }

    #[test]
    fn cursor_position_report_is_one_based() {
        let mut t = term(10, 5, 0);
        t.feed(b"\x1b[3;4H\x1b[6n");
        assert_eq!(t.replies(), b"\x1b[3;4R");
    }

    #[test]
    fn window_size_report() {
        let mut t = term(80, 24, 0);
        t.feed(b"\x1b[18t");
        assert_eq!(t.replies(), b"\x1b[8;24;80t");
    }

    #[test]
    fn decaln_fills_with_e() {
        let mut t = term(3, 2, 0);
        t.feed(b"\x1b#8");
        assert_eq!(row_text(&t, 0), "EEE");
        assert_eq!(row_text(&t, 1), "EEE");
    }

    #[test]
    fn full_reset_matches_fresh_construction() {
        let mut t = term(5, 3, 10);
        t.feed(b"\x1b[31;1mhello\x1b[2;2r\x1b[?1h\x1b[?7l\x1b(0\n\n\n");
        t.feed(b"\x1bc");

        let fresh = term(5, 3, 10);
        for y in 0..3 {
            assert_eq!(t.view_line(y).unwrap(), fresh.view_line(y).unwrap());
        }
        assert_eq!(t.cursor(), fresh.cursor());
        assert_eq!(t.modes(), fresh.modes());
        assert_eq!(t.grid().history_size(), 0);
        // Subsequent printing uses default paint again.
        t.feed(b"x");
        assert_eq!(t.view_line(0).unwrap()[0].fg, t.palette().default_fg);
    }

    #[test]
    fn sgr_zero_equals_untouched_state() {
        let mut t = term(3, 1, 0);
        t.feed(b"\x1b[1;31;44m\x1b[0mx");
        let fresh_glyph = {
            let mut f = term(3, 1, 0);
            f.feed(b"x");
            f.view_line(0).unwrap()[0]
        };
        assert_eq!(t.view_line(0).unwrap()[0], fresh_glyph);
    }

    #[test]
    fn osc_palette_override_applies_to_new_cells() {
        let mut t = term(3, 1, 0);
        t.feed(b"\x1b]4;1;#123456\x07\x1b[31mx");
        assert_eq!(t.view_line(0).unwrap()[0].fg, Rgba::new(0x12, 0x34, 0x56));
        assert_eq!(t.palette().xterm[1], Rgba::new(0x12, 0x34, 0x56));
    }

    #[test]
    fn insert_mode_shifts_existing_cells() {
        let mut t = term(5, 1, 0);
        t.feed(b"abc\x1b[1G\x1b[4hX");
        assert_eq!(row_text(&t, 0), "Xabc ");
        t.feed(b"\x1b[4lY");
        assert_eq!(row_text(&t, 0), "XYbc ");
    }

    #[test]
    fn resize_is_destructive() {
        let mut t = term(5, 2, 10);
        t.feed(b"hello\n\n\n");
        assert!(t.grid().history_size() > 0);
        t.resize(4, 3).unwrap();
        assert_eq!(t.cols(), 4);
        assert_eq!(t.rows(), 3);
        assert_eq!(t.grid().history_size(), 0);
        assert_eq!(row_text(&t, 0), "    ");
        assert_eq!((t.cursor().x, t.cursor().y), (0, 0));
    }

    #[test]
    fn view_snaps_are_host_driven() {
        let mut t = term(3, 2, 10);
        t.feed(b"a\n\n\n");
        assert!(t.scroll_view(2));
        assert_eq!(t.grid().view_offset(), 2);
        assert!(t.reset_view());
        assert_eq!(t.grid().view_offset(), 0);
    }

    #[test]
    fn split_escape_across_feeds() {
        let mut t = term(5, 2, 0);
        t.feed(b"\x1b[3");
        t.feed(b"1mx");
        assert_eq!(t.view_line(0).unwrap()[0].fg, t.palette().ansi[1]);
    }
}
