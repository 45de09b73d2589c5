//! Session configuration.
//!
//! The host's CLI / environment handling is out of scope; whatever it does,
//! the result is this populated structure handed to [`Session::new`]
//! (see [`crate::Session`]).

use std::path::PathBuf;

/// Upper bound on retained scrollback lines.
pub const MAX_SCROLLBACK: usize = 100_000;

/// A key-set file named at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySetEntry {
    pub path: PathBuf,
    /// Load the set's keys immediately; otherwise it is only listed in the
    /// `CONTROL` menu for on-demand loading.
    pub load_at_startup: bool,
}

/// Everything the session needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub cols: u16,
    pub rows: u16,
    /// Scrollback lines, clamped to [`MAX_SCROLLBACK`].
    pub scrollback: usize,
    /// Optional color-scheme file.
    pub theme: Option<PathBuf>,
    /// Optional `.kb` character layout; the built-in QWERTY layout is used
    /// when absent.
    pub osk_layout: Option<PathBuf>,
    /// `.keys` files to load or make available.
    pub key_sets: Vec<KeySetEntry>,
    /// Display-only session: suppress all input emission.
    pub read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            scrollback: 1000,
            theme: None,
            osk_layout: None,
            key_sets: Vec::new(),
            read_only: false,
        }
    }
}

impl Config {
    /// Clamp out-of-range fields into their documented domains.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.cols = self.cols.max(1);
        self.rows = self.rows.max(1);
        self.scrollback = self.scrollback.min(MAX_SCROLLBACK);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = Config::default();
        assert_eq!((c.cols, c.rows), (80, 24));
        assert_eq!(c.scrollback, 1000);
        assert!(!c.read_only);
    }

    #[test]
    fn sanitized_clamps() {
        let c = Config {
            cols: 0,
            rows: 0,
            scrollback: usize::MAX,
            ..Config::default()
        }
        .sanitized();
        assert_eq!((c.cols, c.rows), (1, 1));
        assert_eq!(c.scrollback, MAX_SCROLLBACK);
    }
}
