//! Running one chunk of tasks concurrently.

use std::time::Duration;

use chunkrun_core::{ChunkResult, TaskDescriptor};
use futures_util::future::join_all;
use tracing::debug;

use crate::environment::Environment;
use crate::resolver::TargetResolver;
use crate::runner::TaskRunner;

/// Runs a group of tasks concurrently and waits for all of them to settle.
///
/// One task's failure never cancels its siblings. Outcomes come back in
/// descriptor order regardless of completion order.
pub struct ChunkExecutor<'a, E: Environment> {
    environment: &'a E,
    resolver: &'a dyn TargetResolver,
    task_timeout: Duration,
}

impl<'a, E: Environment> ChunkExecutor<'a, E> {
    /// Create an executor bound to a run's environment.
    pub fn new(
        environment: &'a E,
        resolver: &'a dyn TargetResolver,
        task_timeout: Duration,
    ) -> Self {
        Self {
            environment,
            resolver,
            task_timeout,
        }
    }

    /// Run every descriptor in the chunk and collect the settled outcomes.
    pub async fn run_chunk(&self, descriptors: &[TaskDescriptor]) -> ChunkResult {
        debug!(size = descriptors.len(), "Starting chunk");

        let runners = descriptors.iter().map(|task| async move {
            let mut runner = TaskRunner::new(self.environment, self.resolver, self.task_timeout);
            runner.run(task).await
        });
        let outcomes = join_all(runners).await;

        debug!(
            settled = outcomes.len(),
            succeeded = outcomes.iter().filter(|o| o.is_success()).count(),
            "Chunk settled"
        );
        outcomes
    }
}
