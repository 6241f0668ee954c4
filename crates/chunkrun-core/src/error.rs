//! Run-level errors.

use crate::{TaskError, TaskId};
use thiserror::Error;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The same task id appears more than once in the input.
    #[error("Duplicate task id: {0}")]
    DuplicateTaskId(TaskId),

    /// Run options failed validation.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Acquiring or releasing the shared environment failed.
    #[error("Environment error: {0}")]
    Environment(String),

    /// Starting or navigating a task's context failed.
    #[error("Hard exception in task '{task_id}': {message}")]
    HardException { task_id: TaskId, message: String },

    /// A task failed while `throw_on_failure` was set.
    #[error("Task '{task_id}' failed: {source}")]
    TaskFailed {
        task_id: TaskId,
        #[source]
        source: TaskError,
    },
}

impl RunError {
    /// Returns true for errors raised before the environment is acquired.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::DuplicateTaskId(_) | Self::InvalidOptions(_))
    }
}
