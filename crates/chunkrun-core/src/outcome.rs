//! Terminal outcomes of a single task.

use crate::TaskId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// The value a task produces on success.
pub type Payload = serde_json::Value;

/// Soft, per-task failure.
///
/// Soft failures are always attributed to their task. Whether they abort the
/// whole run is decided by [`RunOptions::throw_on_failure`](crate::RunOptions).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskError {
    /// No completion or error signal arrived before the per-task timeout.
    #[error("Task '{task_id}' timed out after {after_ms} ms")]
    Timeout { task_id: TaskId, after_ms: u64 },

    /// The execution context reported an error while running.
    #[error("Task '{task_id}' failed: {message}")]
    Signaled { task_id: TaskId, message: String },
}

impl TaskError {
    /// Build a timeout error for a task.
    pub fn timeout(task_id: TaskId, after: Duration) -> Self {
        Self::Timeout {
            task_id,
            after_ms: after.as_millis() as u64,
        }
    }

    /// Build a signaled failure for a task.
    pub fn signaled(task_id: TaskId, message: impl Into<String>) -> Self {
        Self::Signaled {
            task_id,
            message: message.into(),
        }
    }

    /// The task this error belongs to.
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::Timeout { task_id, .. } | Self::Signaled { task_id, .. } => task_id,
        }
    }

    /// Returns true if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// How one task settled.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The context signaled completion with a payload.
    Success { task_id: TaskId, payload: Payload },

    /// The context crashed or timed out. Reported, never thrown, by the runner.
    Failure { task_id: TaskId, error: TaskError },

    /// Starting or navigating the context itself failed.
    HardException { task_id: TaskId, message: String },
}

impl TaskOutcome {
    /// The task this outcome belongs to.
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::Success { task_id, .. }
            | Self::Failure { task_id, .. }
            | Self::HardException { task_id, .. } => task_id,
        }
    }

    /// Returns true for a successful outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short label used in log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { error, .. } if error.is_timeout() => "timeout",
            Self::Failure { .. } => "failure",
            Self::HardException { .. } => "hard_exception",
        }
    }
}

/// Settled outcomes of one chunk, in the order the descriptors were given.
pub type ChunkResult = Vec<TaskOutcome>;
