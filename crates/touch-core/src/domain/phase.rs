//! The touch phase state machine.
//!
//! ```text
//!            ┌──────────── Moved ◄──┐
//!  (none) ──► Began ──┬──► Stationary ┤
//!                     │       ▲   │   │
//!                     │       └───┘   │
//!                     ├──► Ended      │   (terminal)
//!                     └──► Cancelled ◄┘   (terminal)
//! ```
//!
//! A freshly acquired slot has no phase.  `Began` is its only legal first
//! phase.  `Began`, `Moved` and `Stationary` are *live*: from any of them the
//! touch may move, stay put, end, or be cancelled.  `Ended` and `Cancelled`
//! are terminal; the identifier has to be released and re-acquired before it
//! can begin again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a single touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchPhase {
    Began,
    Moved,
    Stationary,
    Ended,
    Cancelled,
}

impl TouchPhase {
    /// `true` for `Ended` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TouchPhase::Ended | TouchPhase::Cancelled)
    }

    /// `true` while the finger is considered down.
    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }

    /// Returns whether a slot currently in `from` (or in no phase yet, for
    /// `None`) may move to `to`.
    pub fn can_transition(from: Option<TouchPhase>, to: TouchPhase) -> bool {
        match from {
            None => to == TouchPhase::Began,
            Some(current) if current.is_terminal() => false,
            Some(_) => to != TouchPhase::Began,
        }
    }
}

impl fmt::Display for TouchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TouchPhase::Began => "began",
            TouchPhase::Moved => "moved",
            TouchPhase::Stationary => "stationary",
            TouchPhase::Ended => "ended",
            TouchPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TouchPhase::*;

    const ALL: [TouchPhase; 5] = [Began, Moved, Stationary, Ended, Cancelled];

    #[test]
    fn test_began_is_the_only_entry_phase() {
        for to in ALL {
            assert_eq!(TouchPhase::can_transition(None, to), to == Began, "none -> {to}");
        }
    }

    #[test]
    fn test_live_phases_accept_every_non_began_phase() {
        for from in [Began, Moved, Stationary] {
            for to in [Moved, Stationary, Ended, Cancelled] {
                assert!(TouchPhase::can_transition(Some(from), to), "{from} -> {to}");
            }
            assert!(!TouchPhase::can_transition(Some(from), Began), "{from} -> began");
        }
    }

    #[test]
    fn test_terminal_phases_accept_nothing() {
        for from in [Ended, Cancelled] {
            for to in ALL {
                assert!(!TouchPhase::can_transition(Some(from), to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_is_terminal() {
        assert!(Ended.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Stationary.is_live());
    }
}
