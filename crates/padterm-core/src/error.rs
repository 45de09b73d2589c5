//! Engine error type.
//!
//! Almost everything in this crate recovers locally: malformed input is
//! logged and skipped, out-of-range indices clamp. The only condition that
//! escapes is a failed buffer allocation during construction or resize, in
//! which case the previous state is left intact.

use std::fmt;

/// Error produced by fallible engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A grid buffer allocation failed. Holds the requested cell count.
    Alloc(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(cells) => write!(f, "failed to allocate grid buffer ({cells} cells)"),
        }
    }
}

impl std::error::Error for Error {}
