//! Per-run options.

use crate::RunError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options controlling one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Maximum number of tasks in flight at once. Also the chunk length.
    pub chunk_size: usize,

    /// Abort the run on the first soft failure instead of recording it.
    pub throw_on_failure: bool,

    /// Report progress after each chunk.
    pub report_progress: bool,

    /// How long a task may run without signaling before it times out.
    #[serde(with = "duration_ms")]
    pub task_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1,
            throw_on_failure: false,
            report_progress: false,
            task_timeout: Duration::from_secs(60),
        }
    }
}

impl RunOptions {
    /// Builder method to set the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Builder method to make soft failures fatal.
    pub fn with_throw_on_failure(mut self, throw_on_failure: bool) -> Self {
        self.throw_on_failure = throw_on_failure;
        self
    }

    /// Builder method to enable progress reports.
    pub fn with_report_progress(mut self, report_progress: bool) -> Self {
        self.report_progress = report_progress;
        self
    }

    /// Builder method to set the per-task timeout.
    pub fn with_task_timeout(mut self, task_timeout: Duration) -> Self {
        self.task_timeout = task_timeout;
        self
    }

    /// Check the options before a run starts.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.chunk_size == 0 {
            return Err(RunError::InvalidOptions(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.task_timeout.is_zero() {
            return Err(RunError::InvalidOptions(
                "task_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of chunks needed for `task_count` tasks.
    pub fn chunk_count(&self, task_count: usize) -> usize {
        task_count.div_ceil(self.chunk_size.max(1))
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
