//! Button auto-repeat.
//!
//! One held button repeats its action after an initial delay; a new press
//! cancels the previous repeat. Timing is injected (`Instant` parameters)
//! so tests never sleep.

use std::time::{Duration, Instant};

use crate::session::Action;

/// Delay before a held button starts repeating.
pub const REPEAT_INITIAL_DELAY: Duration = Duration::from_millis(250);
/// Interval between subsequent repeats.
pub const REPEAT_INTERVAL: Duration = Duration::from_millis(75);

/// Tracks the single repeating action.
#[derive(Debug, Default)]
pub struct RepeatState {
    held: Option<(Action, Instant)>,
}

impl RepeatState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press. Returns whether the action should be handled now
    /// (re-pressing the already-repeating button is swallowed).
    pub fn press(&mut self, action: Action, now: Instant) -> bool {
        if let Some((held, _)) = self.held {
            if held == action {
                return false;
            }
        }
        self.held = Some((action, now + REPEAT_INITIAL_DELAY));
        true
    }

    /// Record a release; only the currently repeating action is affected.
    pub fn release(&mut self, action: Action) {
        if let Some((held, _)) = self.held {
            if held == action {
                self.held = None;
            }
        }
    }

    /// Poll for a due repeat; re-arms the interval when one fires.
    pub fn poll(&mut self, now: Instant) -> Option<Action> {
        let (action, due) = self.held?;
        if now >= due {
            self.held = Some((action, now + REPEAT_INTERVAL));
            Some(action)
        } else {
            None
        }
    }
}
