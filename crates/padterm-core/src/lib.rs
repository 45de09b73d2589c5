#![forbid(unsafe_code)]

//! Host-agnostic VT/ANSI terminal engine.
//!
//! `padterm-core` is the platform-independent terminal model at the heart of
//! padterm. It owns grid state, VT/ANSI parsing, cursor positioning, and
//! scrollback — all without any host I/O dependencies.
//!
//! # Primary responsibilities
//!
//! - **Glyph**: character content + attributes (colors, bold, italic, etc.).
//! - **Grid**: line-ring backing the visible viewport plus scrollback history,
//!   with a separate history-free alternate screen.
//! - **Parser**: VT/ANSI state machine turning PTY bytes into actions.
//! - **Term**: the engine applying parser actions to grid, modes, and palette.
//! - **Palette**: 16 ANSI + 240 derived xterm colors, theme-file loading.
//! - **Dirty tracking**: per-line damage bits with incremental bounds.
//!
//! # Design principles
//!
//! - **No I/O beyond the theme file**: the host adapter supplies PTY bytes and
//!   consumes reply bytes; the only file this crate ever reads is the
//!   color-scheme file handed to [`Palette::with_theme`].
//! - **Deterministic**: identical byte sequences always produce identical state.
//! - **`#![forbid(unsafe_code)]`**: safety enforced at compile time.

pub mod cell;
pub mod charset;
pub mod dirty;
pub mod error;
pub mod grid;
pub mod modes;
pub mod palette;
pub mod parser;
pub mod reply;
pub mod term;

pub use cell::{AttrFlags, Glyph, Rgba};
pub use charset::translate_charset;
pub use dirty::DirtyTracker;
pub use error::Error;
pub use grid::Grid;
pub use modes::{CursorStyle, Modes};
pub use palette::Palette;
pub use parser::{Action, CsiParams, Parser};
pub use reply::ReplyBuffer;
pub use term::{CursorView, Term};
