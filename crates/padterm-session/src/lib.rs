#![forbid(unsafe_code)]

//! Session facade binding the terminal engine, the input encoder, and the
//! on-screen keyboard behind one handle.
//!
//! The host owns the PTY and the render loop; [`Session`] owns everything
//! in between. Per frame the host:
//!
//! 1. delivers PTY bytes via [`Session::feed_pty`] (replies are flushed to
//!    the write sink before the call returns),
//! 2. translates device input into [`Action`]s / key / text events and
//!    hands them over,
//! 3. calls [`Session::tick`] for cursor blink and button repeat,
//! 4. repaints from the read-only views and clears the dirty state.
//!
//! The session performs no I/O of its own beyond the injected `write_pty`
//! sink and the configuration files read at construction.

pub mod config;
pub mod repeat;
pub mod session;

pub use config::{Config, KeySetEntry};
pub use repeat::{RepeatState, REPEAT_INITIAL_DELAY, REPEAT_INTERVAL};
pub use session::{Action, ExitButton, HostCommand, Session, SessionError};
