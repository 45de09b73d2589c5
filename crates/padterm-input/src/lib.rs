#![forbid(unsafe_code)]

//! Canonical input types and the key-to-byte encoder.
//!
//! `padterm-input` translates logical key events into the exact byte
//! sequences a shell behind a PTY expects: C0 controls for Ctrl chords,
//! ESC-prefixed characters for Alt, application-cursor variants for
//! arrows, and the canonical xterm sequences for the special keys.
//!
//! All types are pure data; writing the produced bytes to the PTY is the
//! host's job.

pub mod encoder;
pub mod event;

pub use encoder::{encode_key, is_text_input_duplicate, wheel_sequence, TermModeView};
pub use event::{KeyCode, KeyEvent, Modifiers};
