//! Task runner lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a single task runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunnerState {
    /// Resolving the target, starting and navigating the context.
    #[default]
    Starting,
    /// Waiting for a success signal, an error signal or the timeout.
    Racing,
    /// An outcome has been determined.
    Settled,
}

impl RunnerState {
    /// Returns true if the runner is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled)
    }

    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: RunnerState) -> bool {
        matches!(
            (self, next),
            (Self::Starting, Self::Racing)
                | (Self::Starting, Self::Settled)
                | (Self::Racing, Self::Settled)
        )
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Racing => "racing",
            Self::Settled => "settled",
        };
        f.write_str(name)
    }
}
