//! Per-line damage tracking for render optimization.
//!
//! The renderer repaints only lines whose bit is set, bounded by the
//! incrementally maintained `[min, max]` row range. A separate
//! `full_redraw` flag short-circuits the bitmap entirely (scrolls and mode
//! switches touch too many lines for per-line bookkeeping to pay off).

/// Dirty-line set over the visible rows.
#[derive(Debug, Clone)]
pub struct DirtyTracker {
    lines: Vec<bool>,
    bounds: Option<(u16, u16)>,
    full_redraw: bool,
}

impl DirtyTracker {
    /// Create a tracker for `rows` visible lines, initially all dirty.
    #[must_use]
    pub fn new(rows: u16) -> Self {
        let mut tracker = Self {
            lines: vec![false; rows as usize],
            bounds: None,
            full_redraw: true,
        };
        tracker.mark_range(0, rows.saturating_sub(1));
        tracker
    }

    /// Mark a single line dirty, growing the bounds as needed.
    ///
    /// Out-of-range rows are ignored.
    pub fn mark(&mut self, y: u16) {
        let Some(slot) = self.lines.get_mut(y as usize) else {
            return;
        };
        if *slot {
            return;
        }
        *slot = true;
        self.bounds = Some(match self.bounds {
            None => (y, y),
            Some((min, max)) => (min.min(y), max.max(y)),
        });
    }

    /// Mark an inclusive range of lines dirty.
    pub fn mark_range(&mut self, start: u16, end: u16) {
        for y in start..=end {
            self.mark(y);
        }
    }

    /// Request a full repaint, bypassing per-line bits.
    pub fn set_full_redraw(&mut self) {
        self.full_redraw = true;
    }

    /// Whether a full repaint is pending.
    #[must_use]
    pub fn full_redraw(&self) -> bool {
        self.full_redraw
    }

    /// Whether the given line is dirty.
    #[must_use]
    pub fn is_dirty(&self, y: u16) -> bool {
        self.lines.get(y as usize).copied().unwrap_or(false)
    }

    /// The inclusive `[min, max]` row range of dirty lines, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<(u16, u16)> {
        self.bounds
    }

    /// Clear all dirty bits, bounds, and the full-redraw flag.
    pub fn clear(&mut self) {
        if self.bounds.is_some() {
            self.lines.fill(false);
            self.bounds = None;
        }
        self.full_redraw = false;
    }

    /// Replace the tracked row count, marking everything dirty.
    pub fn resize(&mut self, rows: u16) {
        self.lines = vec![false; rows as usize];
        self.bounds = None;
        self.full_redraw = true;
        self.mark_range(0, rows.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tracker_is_fully_dirty() {
        let t = DirtyTracker::new(4);
        assert!(t.full_redraw());
        assert_eq!(t.bounds(), Some((0, 3)));
        assert!(t.is_dirty(0) && t.is_dirty(3));
    }

    #[test]
    fn mark_extends_bounds_incrementally() {
        let mut t = DirtyTracker::new(10);
        t.clear();
        assert_eq!(t.bounds(), None);

        t.mark(4);
        assert_eq!(t.bounds(), Some((4, 4)));
        t.mark(7);
        assert_eq!(t.bounds(), Some((4, 7)));
        t.mark(1);
        assert_eq!(t.bounds(), Some((1, 7)));
        assert!(!t.is_dirty(5));
    }

    #[test]
    fn mark_out_of_range_is_ignored() {
        let mut t = DirtyTracker::new(3);
        t.clear();
        t.mark(99);
        assert_eq!(t.bounds(), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut t = DirtyTracker::new(5);
        t.mark(2);
        t.set_full_redraw();
        t.clear();
        assert!(!t.full_redraw());
        assert_eq!(t.bounds(), None);
        assert!(!t.is_dirty(2));
    }

    #[test]
    fn resize_marks_all_dirty() {
        let mut t = DirtyTracker::new(2);
        t.clear();
        t.resize(6);
        assert!(t.full_redraw());
        assert_eq!(t.bounds(), Some((0, 5)));
    }
}
