//! Terminal grid: a line-ring backing the viewport plus scrollback history,
//! and a separate history-free alternate screen.
//!
//! The normal screen is stored as `rows + scrollback` lines in one circular
//! buffer; `top_line` indexes the first logical row. Scrolling the full
//! screen up advances `top_line`, which is what turns the vacated top row
//! into the newest history line for free. The alternate screen is a plain
//! `rows`-line rectangle with no history; only one of the two is active.
//!
//! Coordinates are 0-based throughout this module. The 1-based scroll
//! region of the wire protocol lives in [`Term`](crate::Term).

use crate::cell::Glyph;
use crate::dirty::DirtyTracker;
use crate::error::Error;

/// Allocate a glyph buffer, surfacing allocation failure instead of aborting.
fn alloc_cells(len: usize, fill: Glyph) -> Result<Vec<Glyph>, Error> {
    let mut cells = Vec::new();
    cells.try_reserve_exact(len).map_err(|_| Error::Alloc(len))?;
    cells.resize(len, fill);
    Ok(cells)
}

/// The glyph storage for both screens, with viewport and damage state.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Ring storage for the normal screen: `total_lines * cols` glyphs.
    cells: Vec<Glyph>,
    /// Alternate screen: `rows * cols` glyphs, allocated on first use.
    alt: Option<Vec<Glyph>>,
    cols: u16,
    rows: u16,
    scrollback: usize,
    /// `rows + scrollback`.
    total_lines: usize,
    /// Ring index of logical row 0.
    top_line: usize,
    /// Lines scrolled back from the live position. 0 = at the bottom.
    view_offset: usize,
    /// Lines currently held in history, at most `scrollback`.
    history_size: usize,
    alt_active: bool,
    dirty: DirtyTracker,
}

impl Grid {
    /// Create a grid filled with `blank`.
    ///
    /// Fails only if the ring buffer cannot be allocated.
    pub fn new(cols: u16, rows: u16, scrollback: usize, blank: Glyph) -> Result<Self, Error> {
        let total_lines = rows as usize + scrollback;
        let cells = alloc_cells(total_lines * cols as usize, blank)?;
        Ok(Self {
            cells,
            alt: None,
            cols,
            rows,
            scrollback,
            total_lines,
            top_line: 0,
            view_offset: 0,
            history_size: 0,
            alt_active: false,
            dirty: DirtyTracker::new(rows),
        })
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Number of visible rows.
    #[must_use]
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Lines currently held in scrollback history.
    #[must_use]
    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// Current scrollback view offset (0 = live bottom).
    #[must_use]
    pub fn view_offset(&self) -> usize {
        self.view_offset
    }

    /// Whether the alternate screen is active.
    #[must_use]
    pub fn alt_active(&self) -> bool {
        self.alt_active
    }

    /// Damage state, read by the renderer.
    #[must_use]
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Mutable damage state, for engine-level operations.
    pub(crate) fn dirty_mut(&mut self) -> &mut DirtyTracker {
        &mut self.dirty
    }

    /// Clear all damage bits and the full-redraw flag.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    // ── Line addressing ─────────────────────────────────────────────

    /// Ring index of logical row `y` on the normal screen.
    fn ring_row(&self, y: u16) -> usize {
        (self.top_line + y as usize) % self.total_lines
    }

    /// The active screen's logical row `y`, ignoring the view offset.
    ///
    /// Returns `None` out of range. This is the address the parser writes to.
    #[must_use]
    pub fn line(&self, y: u16) -> Option<&[Glyph]> {
        if y >= self.rows {
            return None;
        }
        let cols = self.cols as usize;
        if self.alt_active {
            let alt = self.alt.as_ref()?;
            let start = y as usize * cols;
            Some(&alt[start..start + cols])
        } else {
            let start = self.ring_row(y) * cols;
            Some(&self.cells[start..start + cols])
        }
    }

    /// Mutable variant of [`line`](Self::line).
    pub fn line_mut(&mut self, y: u16) -> Option<&mut [Glyph]> {
        if y >= self.rows {
            return None;
        }
        let cols = self.cols as usize;
        if self.alt_active {
            let alt = self.alt.as_mut()?;
            let start = y as usize * cols;
            Some(&mut alt[start..start + cols])
        } else {
            let start = self.ring_row(y) * cols;
            Some(&mut self.cells[start..start + cols])
        }
    }

    /// The row to display at screen position `y`, honoring the view offset.
    ///
    /// On the alternate screen the offset is ignored (there is no history).
    #[must_use]
    pub fn view_line(&self, y: u16) -> Option<&[Glyph]> {
        if y >= self.rows {
            return None;
        }
        if self.alt_active {
            return self.line(y);
        }
        let cols = self.cols as usize;
        let back = self.view_offset % self.total_lines;
        let phys = (self.top_line + self.total_lines - back + y as usize) % self.total_lines;
        let start = phys * cols;
        Some(&self.cells[start..start + cols])
    }

    // ── Clearing ────────────────────────────────────────────────────

    /// Clear row `y` from `from_x` (inclusive) to the right margin.
    pub fn clear_line(&mut self, y: u16, from_x: u16, blank: Glyph) {
        if let Some(line) = self.line_mut(y) {
            for cell in line.iter_mut().skip(from_x as usize) {
                *cell = blank;
            }
            self.dirty.mark(y);
        }
    }

    /// Clear row `y` from the left margin through `to_x` (inclusive).
    pub fn clear_line_to(&mut self, y: u16, to_x: u16, blank: Glyph) {
        if let Some(line) = self.line_mut(y) {
            let end = (to_x as usize + 1).min(line.len());
            for cell in &mut line[..end] {
                *cell = blank;
            }
            self.dirty.mark(y);
        }
    }

    /// Clear every visible row on the active screen.
    pub fn clear_screen(&mut self, blank: Glyph) {
        for y in 0..self.rows {
            self.clear_line(y, 0, blank);
        }
        self.dirty.set_full_redraw();
    }

    /// Fill every visible cell with `glyph` (DECALN alignment pattern).
    pub fn fill_screen(&mut self, glyph: Glyph) {
        for y in 0..self.rows {
            if let Some(line) = self.line_mut(y) {
                line.fill(glyph);
            }
        }
        self.dirty.set_full_redraw();
    }

    // ── Scrolling ───────────────────────────────────────────────────

    /// Scroll the full screen up one line.
    ///
    /// On the normal screen this advances the ring, appending the old top
    /// row to history (saturating at the scrollback capacity). On the
    /// alternate screen the content simply shifts up.
    pub fn scroll_up_full(&mut self, blank: Glyph) {
        let cols = self.cols as usize;
        if self.alt_active {
            if let Some(alt) = self.alt.as_mut() {
                let len = self.rows as usize * cols;
                alt.copy_within(cols..len, 0);
            }
            self.clear_line(self.rows - 1, 0, blank);
        } else {
            self.top_line = (self.top_line + 1) % self.total_lines;
            if self.history_size < self.scrollback {
                self.history_size += 1;
            }
            self.dirty.set_full_redraw();
            self.dirty.mark_range(0, self.rows - 1);
            self.clear_line(self.rows - 1, 0, blank);
        }
    }

    /// Scroll rows `top..=bottom` by `n` lines: up for positive `n`, down
    /// for negative. Vacated rows are filled with `blank`.
    ///
    /// This moves content within the region only; nothing enters history.
    pub fn scroll_region(&mut self, top: u16, bottom: u16, n: i32, blank: Glyph) {
        if n == 0 || top > bottom || bottom >= self.rows {
            return;
        }

        self.dirty.set_full_redraw();
        self.dirty.mark_range(top, bottom);

        let height = (bottom - top + 1) as i32;
        let count = n.unsigned_abs().min(height as u32) as u16;
        let keep = (bottom - top + 1) - count;

        if n > 0 {
            for y in 0..keep {
                self.copy_row(top + count + y, top + y);
            }
            for y in (bottom + 1 - count)..=bottom {
                self.clear_line(y, 0, blank);
            }
        } else {
            // Copy bottom-up so overlapping rows are read before overwrite.
            for y in 0..keep {
                self.copy_row(bottom - count - y, bottom - y);
            }
            for y in top..top + count {
                self.clear_line(y, 0, blank);
            }
        }
    }

    /// Copy one full row to another within the active screen.
    fn copy_row(&mut self, src_y: u16, dst_y: u16) {
        if src_y == dst_y || src_y >= self.rows || dst_y >= self.rows {
            return;
        }
        let cols = self.cols as usize;
        if self.alt_active {
            if let Some(alt) = self.alt.as_mut() {
                let src = src_y as usize * cols;
                let dst = dst_y as usize * cols;
                alt.copy_within(src..src + cols, dst);
            }
        } else {
            let src = self.ring_row(src_y) * cols;
            let dst = self.ring_row(dst_y) * cols;
            self.cells.copy_within(src..src + cols, dst);
        }
    }

    /// Adjust the scrollback view by `amount` lines (positive = further back).
    ///
    /// No-op on the alternate screen or with no history. Returns whether the
    /// offset changed; a change forces a full redraw.
    pub fn scroll_view(&mut self, amount: i32) -> bool {
        if self.alt_active || self.history_size == 0 {
            return false;
        }
        let old = self.view_offset;
        let target = self.view_offset as i64 + amount as i64;
        self.view_offset = target.clamp(0, self.history_size as i64) as usize;
        if self.view_offset != old {
            self.dirty.set_full_redraw();
            true
        } else {
            false
        }
    }

    /// Snap the view back to the live bottom. Returns whether it moved.
    pub fn reset_view(&mut self) -> bool {
        if self.view_offset != 0 {
            self.view_offset = 0;
            self.dirty.set_full_redraw();
            true
        } else {
            false
        }
    }

    // ── Line-local character shifts ─────────────────────────────────

    /// Insert `n` blank cells at `(y, x)`, shifting the rest of the row right.
    pub fn insert_chars(&mut self, y: u16, x: u16, n: u16, blank: Glyph) {
        let cols = self.cols;
        if x >= cols {
            return;
        }
        let Some(line) = self.line_mut(y) else {
            return;
        };
        let x = x as usize;
        let n = (n as usize).min(cols as usize - x);
        let keep = cols as usize - x - n;
        if keep > 0 {
            line.copy_within(x..x + keep, x + n);
        }
        for cell in &mut line[x..x + n] {
            *cell = blank;
        }
        self.dirty.mark(y);
    }

    /// Delete `n` cells at `(y, x)`, shifting the rest of the row left and
    /// filling the vacated right margin with `blank`.
    pub fn delete_chars(&mut self, y: u16, x: u16, n: u16, blank: Glyph) {
        let cols = self.cols;
        if x >= cols {
            return;
        }
        let Some(line) = self.line_mut(y) else {
            return;
        };
        let x = x as usize;
        let n = (n as usize).min(cols as usize - x);
        let keep = cols as usize - x - n;
        if keep > 0 {
            line.copy_within(x + n..x + n + keep, x);
        }
        for cell in &mut line[cols as usize - n..] {
            *cell = blank;
        }
        self.dirty.mark(y);
    }

    /// Blank `n` cells at `(y, x)` in place, without shifting.
    pub fn erase_chars(&mut self, y: u16, x: u16, n: u16, blank: Glyph) {
        let cols = self.cols;
        if x >= cols {
            return;
        }
        let Some(line) = self.line_mut(y) else {
            return;
        };
        let x = x as usize;
        let n = (n as usize).min(cols as usize - x);
        for cell in &mut line[x..x + n] {
            *cell = blank;
        }
        self.dirty.mark(y);
    }

    // ── Alternate screen ────────────────────────────────────────────

    /// Switch to the alternate screen, allocating it on first use.
    ///
    /// The caller clears it afterwards; this only flips the addressing.
    /// The scrollback view snaps to the bottom: a non-zero offset is
    /// meaningless while the history-free screen is showing.
    pub fn enter_alt(&mut self, blank: Glyph) -> Result<(), Error> {
        if self.alt_active {
            return Ok(());
        }
        if self.alt.is_none() {
            let len = self.rows as usize * self.cols as usize;
            self.alt = Some(alloc_cells(len, blank)?);
        }
        self.alt_active = true;
        self.view_offset = 0;
        self.dirty.set_full_redraw();
        Ok(())
    }

    /// Switch back to the normal screen.
    pub fn leave_alt(&mut self) {
        if self.alt_active {
            self.alt_active = false;
            self.dirty.set_full_redraw();
        }
    }

    // ── Resize / reset ──────────────────────────────────────────────

    /// Resize to new dimensions, discarding all content and history.
    ///
    /// Resizing is destructive: the ring is reallocated and the caller is
    /// expected to perform a full reset. On allocation failure the previous
    /// buffers are left untouched and the error is returned.
    pub fn resize(&mut self, new_cols: u16, new_rows: u16, blank: Glyph) -> Result<(), Error> {
        if new_cols == self.cols && new_rows == self.rows {
            return Ok(());
        }
        let total_lines = new_rows as usize + self.scrollback;
        let cells = alloc_cells(total_lines * new_cols as usize, blank)?;
        let alt = match &self.alt {
            Some(_) => Some(alloc_cells(new_rows as usize * new_cols as usize, blank)?),
            None => None,
        };

        self.cells = cells;
        self.alt = alt;
        self.cols = new_cols;
        self.rows = new_rows;
        self.total_lines = total_lines;
        self.top_line = 0;
        self.view_offset = 0;
        self.history_size = 0;
        self.dirty.resize(new_rows);
        Ok(())
    }

    /// Reset all storage to `blank` and forget history and view state.
    ///
    /// Used by the full-reset path; leaves dimensions and the alternate
    /// buffer allocation in place but deactivates it.
    pub fn reset(&mut self, blank: Glyph) {
        self.cells.fill(blank);
        if let Some(alt) = self.alt.as_mut() {
            alt.fill(blank);
        }
        self.alt_active = false;
        self.top_line = 0;
        self.view_offset = 0;
        self.history_size = 0;
        self.dirty.resize(self.rows);
    }

    /// Read a history line, 0 = oldest retained.
    ///
    /// Mainly for tests and host-side inspection; returns `None` past the
    /// current history size.
    #[must_use]
    pub fn history_line(&self, index: usize) -> Option<&[Glyph]> {
        if index >= self.history_size {
            return None;
        }
        let cols = self.cols as usize;
        let back = self.history_size - index;
        let phys = (self.top_line + self.total_lines - back) % self.total_lines;
        let start = phys * cols;
        Some(&self.cells[start..start + cols])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{AttrFlags, Rgba};

    fn blank() -> Glyph {
        Glyph::blank(Rgba::new(1, 1, 1), Rgba::new(2, 2, 2), AttrFlags::empty())
    }

    fn grid(cols: u16, rows: u16, scrollback: usize) -> Grid {
        Grid::new(cols, rows, scrollback, blank()).unwrap()
    }

    fn put(g: &mut Grid, y: u16, text: &str) {
        let line = g.line_mut(y).unwrap();
        for (i, ch) in text.chars().enumerate() {
            line[i].ch = ch;
        }
    }

    fn row_text(line: &[Glyph]) -> String {
        line.iter().map(|g| g.ch).collect()
    }

    #[test]
    fn new_grid_is_blank() {
        let g = grid(5, 3, 10);
        assert_eq!(row_text(g.line(0).unwrap()), "     ");
        assert!(g.line(3).is_none());
        assert_eq!(g.history_size(), 0);
    }

    #[test]
    fn scroll_up_full_appends_history() {
        let mut g = grid(3, 2, 4);
        put(&mut g, 0, "aaa");
        put(&mut g, 1, "bbb");
        g.scroll_up_full(blank());
        assert_eq!(g.history_size(), 1);
        assert_eq!(row_text(g.line(0).unwrap()), "bbb");
        assert_eq!(row_text(g.line(1).unwrap()), "   ");
        assert_eq!(row_text(g.history_line(0).unwrap()), "aaa");
    }

    #[test]
    fn history_saturates_at_capacity() {
        let mut g = grid(2, 2, 2);
        for _ in 0..5 {
            g.scroll_up_full(blank());
        }
        assert_eq!(g.history_size(), 2);
    }

    #[test]
    fn view_offset_shows_history() {
        let mut g = grid(3, 2, 4);
        put(&mut g, 0, "old");
        g.scroll_up_full(blank());
        put(&mut g, 1, "new");

        assert_eq!(row_text(g.view_line(0).unwrap()), "   ");
        assert!(g.scroll_view(1));
        assert_eq!(g.view_offset(), 1);
        assert_eq!(row_text(g.view_line(0).unwrap()), "old");
        // Clamped at history size.
        assert!(!g.scroll_view(10) || g.view_offset() <= g.history_size());
        assert!(g.reset_view());
        assert_eq!(g.view_offset(), 0);
    }

    #[test]
    fn scroll_view_is_noop_without_history() {
        let mut g = grid(3, 2, 4);
        assert!(!g.scroll_view(1));
        assert_eq!(g.view_offset(), 0);
    }

    #[test]
    fn scroll_region_up_and_down() {
        let mut g = grid(2, 4, 0);
        for (y, t) in ["AA", "BB", "CC", "DD"].iter().enumerate() {
            put(&mut g, y as u16, t);
        }
        g.scroll_region(1, 2, 1, blank());
        assert_eq!(row_text(g.line(0).unwrap()), "AA");
        assert_eq!(row_text(g.line(1).unwrap()), "CC");
        assert_eq!(row_text(g.line(2).unwrap()), "  ");
        assert_eq!(row_text(g.line(3).unwrap()), "DD");

        g.scroll_region(1, 2, -1, blank());
        assert_eq!(row_text(g.line(1).unwrap()), "  ");
        assert_eq!(row_text(g.line(2).unwrap()), "CC");
    }

    #[test]
    fn one_row_region_clears_in_place() {
        let mut g = grid(2, 3, 0);
        put(&mut g, 1, "XX");
        g.scroll_region(1, 1, 1, blank());
        assert_eq!(row_text(g.line(0).unwrap()), "  ");
        assert_eq!(row_text(g.line(1).unwrap()), "  ");
    }

    #[test]
    fn scroll_region_out_of_range_is_noop() {
        let mut g = grid(2, 3, 0);
        put(&mut g, 0, "AA");
        g.scroll_region(2, 5, 1, blank());
        g.scroll_region(2, 1, 1, blank());
        assert_eq!(row_text(g.line(0).unwrap()), "AA");
    }

    #[test]
    fn insert_delete_erase_chars() {
        let mut g = grid(5, 1, 0);
        put(&mut g, 0, "ABCDE");
        g.insert_chars(0, 1, 2, blank());
        assert_eq!(row_text(g.line(0).unwrap()), "A  BC");

        put(&mut g, 0, "ABCDE");
        g.delete_chars(0, 1, 2, blank());
        assert_eq!(row_text(g.line(0).unwrap()), "ADE  ");

        put(&mut g, 0, "ABCDE");
        g.erase_chars(0, 1, 2, blank());
        assert_eq!(row_text(g.line(0).unwrap()), "A  DE");
    }

    #[test]
    fn char_shifts_clamp_at_margin() {
        let mut g = grid(3, 1, 0);
        put(&mut g, 0, "ABC");
        g.insert_chars(0, 2, 10, blank());
        assert_eq!(row_text(g.line(0).unwrap()), "AB ");
        put(&mut g, 0, "ABC");
        g.delete_chars(0, 2, 10, blank());
        assert_eq!(row_text(g.line(0).unwrap()), "AB ");
        g.erase_chars(0, 9, 1, blank());
    }

    #[test]
    fn alt_screen_is_separate() {
        let mut g = grid(3, 2, 4);
        put(&mut g, 0, "nrm");
        g.enter_alt(blank()).unwrap();
        assert!(g.alt_active());
        assert_eq!(row_text(g.line(0).unwrap()), "   ");
        put(&mut g, 0, "alt");
        g.leave_alt();
        assert_eq!(row_text(g.line(0).unwrap()), "nrm");
        // Re-entering sees the stale alt content until the engine clears it.
        g.enter_alt(blank()).unwrap();
        assert_eq!(row_text(g.line(0).unwrap()), "alt");
    }

    #[test]
    fn enter_alt_snaps_view_to_bottom() {
        let mut g = grid(3, 2, 4);
        g.scroll_up_full(blank());
        g.scroll_view(1);
        g.enter_alt(blank()).unwrap();
        assert_eq!(g.view_offset(), 0);
        assert!(!g.scroll_view(1));
    }

    #[test]
    fn alt_scroll_up_has_no_history() {
        let mut g = grid(3, 2, 4);
        g.enter_alt(blank()).unwrap();
        put(&mut g, 0, "aaa");
        put(&mut g, 1, "bbb");
        g.scroll_up_full(blank());
        assert_eq!(g.history_size(), 0);
        assert_eq!(row_text(g.line(0).unwrap()), "bbb");
        assert_eq!(row_text(g.line(1).unwrap()), "   ");
    }

    #[test]
    fn resize_discards_history_and_content() {
        let mut g = grid(3, 2, 4);
        put(&mut g, 0, "aaa");
        g.scroll_up_full(blank());
        g.resize(4, 3, blank()).unwrap();
        assert_eq!(g.cols(), 4);
        assert_eq!(g.rows(), 3);
        assert_eq!(g.history_size(), 0);
        assert_eq!(g.view_offset(), 0);
        assert_eq!(row_text(g.line(0).unwrap()), "    ");
    }

    #[test]
    fn reset_clears_and_leaves_alt() {
        let mut g = grid(3, 2, 4);
        g.enter_alt(blank()).unwrap();
        put(&mut g, 0, "alt");
        g.scroll_up_full(blank());
        g.reset(blank());
        assert!(!g.alt_active());
        assert_eq!(g.history_size(), 0);
        assert_eq!(row_text(g.line(0).unwrap()), "   ");
    }

    #[test]
    fn dirty_marks_accumulate() {
        let mut g = grid(3, 3, 0);
        g.clear_dirty();
        g.clear_line(1, 0, blank());
        assert!(g.dirty().is_dirty(1));
        assert_eq!(g.dirty().bounds(), Some((1, 1)));
        g.insert_chars(2, 0, 1, blank());
        assert_eq!(g.dirty().bounds(), Some((1, 2)));
    }
}
