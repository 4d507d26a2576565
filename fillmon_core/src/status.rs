//! Session lifecycle status.

use std::fmt;

use serde::Serialize;

/// Status of a tank session. `Idle` is both the initial state and the state
/// every session returns to on stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Filling,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => f.write_str("idle"),
            SessionStatus::Filling => f.write_str("filling"),
        }
    }
}
