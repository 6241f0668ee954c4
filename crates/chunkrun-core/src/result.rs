//! Aggregated run results.

use crate::{Payload, TaskError, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Results of a run.
///
/// Every attempted task has an entry in `results`; failed tasks map to
/// `None` and their error is kept in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Payload per task, `None` when the task failed.
    pub results: BTreeMap<TaskId, Option<Payload>>,

    /// Soft failures recorded in non-strict mode.
    pub errors: BTreeMap<TaskId, TaskError>,
}

impl RunResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful task.
    pub fn record_success(&mut self, task_id: TaskId, payload: Payload) {
        self.results.insert(task_id, Some(payload));
    }

    /// Record a failed task as attempted, keeping its error.
    pub fn record_failure(&mut self, error: TaskError) {
        let task_id = error.task_id().clone();
        self.results.insert(task_id.clone(), None);
        self.errors.insert(task_id, error);
    }

    /// Payload of a task, if it succeeded.
    pub fn payload(&self, task_id: &TaskId) -> Option<&Payload> {
        self.results.get(task_id).and_then(Option::as_ref)
    }

    /// Counts of succeeded and failed tasks.
    pub fn summary(&self) -> RunSummary {
        let succeeded = self.results.values().filter(|p| p.is_some()).count();
        RunSummary {
            attempted: self.results.len(),
            succeeded,
            failed: self.results.len() - succeeded,
        }
    }
}

/// Counts derived from a [`RunResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}
