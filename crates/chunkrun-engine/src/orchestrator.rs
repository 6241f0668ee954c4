//! Chunked orchestration of a whole task list.

use std::collections::HashSet;
use std::sync::Arc;

use chunkrun_core::{RunError, RunId, RunOptions, RunResult, TaskDescriptor, TaskOutcome};
use tracing::{debug, error, info, warn};

use crate::chunk::ChunkExecutor;
use crate::environment::{Environment, EnvironmentProvider};
use crate::progress::{LogProgress, ProgressSink};
use crate::resolver::TargetResolver;

/// Runs a task list in sequential chunks against one shared environment.
///
/// Peak concurrency is bounded by [`RunOptions::chunk_size`]: chunk *k+1*
/// starts only after every task of chunk *k* has settled. The environment
/// is acquired once per run and released exactly once on every path after
/// a successful acquire.
pub struct Orchestrator<P, R> {
    provider: P,
    resolver: R,
    progress: Arc<dyn ProgressSink>,
}

impl<P, R> Orchestrator<P, R>
where
    P: EnvironmentProvider,
    R: TargetResolver,
{
    /// Create an orchestrator from an environment provider and a target resolver.
    ///
    /// Progress goes to [`LogProgress`] until [`with_progress`](Self::with_progress)
    /// replaces it.
    pub fn new(provider: P, resolver: R) -> Self {
        Self {
            provider,
            resolver,
            progress: Arc::new(LogProgress),
        }
    }

    /// Set the sink that receives progress when `report_progress` is enabled.
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Arc::new(sink);
        self
    }

    /// The environment provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run every task and aggregate the results.
    ///
    /// In non-strict mode soft failures are recorded in
    /// [`RunResult::errors`] and the task maps to `None`. With
    /// `throw_on_failure` the first soft failure aborts the run. Hard
    /// exceptions always abort the run once their chunk has settled.
    pub async fn run(
        &self,
        descriptors: &[TaskDescriptor],
        options: &RunOptions,
    ) -> Result<RunResult, RunError> {
        options.validate()?;
        ensure_unique(descriptors)?;

        let run_id = RunId::generate();
        info!(
            run_id = %run_id,
            tasks = descriptors.len(),
            chunk_size = options.chunk_size,
            strict = options.throw_on_failure,
            "Starting run"
        );

        let environment = self.provider.acquire().await.map_err(|e| {
            error!(run_id = %run_id, error = %e, "Failed to acquire environment");
            RunError::Environment(e.to_string())
        })?;

        let outcome = self
            .run_chunks(&run_id, &environment, descriptors, options)
            .await;

        let released = environment.release().await;
        debug!(run_id = %run_id, "Environment released");

        match (outcome, released) {
            (Ok(result), Ok(())) => {
                let summary = result.summary();
                info!(
                    run_id = %run_id,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "Run completed"
                );
                Ok(result)
            }
            (Ok(_), Err(e)) => {
                error!(run_id = %run_id, error = %e, "Failed to release environment");
                Err(RunError::Environment(e.to_string()))
            }
            (Err(run_error), Err(e)) => {
                warn!(run_id = %run_id, error = %e, "Failed to release environment after aborted run");
                Err(run_error)
            }
            (Err(run_error), Ok(())) => {
                error!(run_id = %run_id, error = %run_error, "Run aborted");
                Err(run_error)
            }
        }
    }

    async fn run_chunks(
        &self,
        run_id: &RunId,
        environment: &P::Environment,
        descriptors: &[TaskDescriptor],
        options: &RunOptions,
    ) -> Result<RunResult, RunError> {
        let executor = ChunkExecutor::new(environment, &self.resolver, options.task_timeout);
        let total = options.chunk_count(descriptors.len());
        let mut result = RunResult::new();

        for (index, chunk) in descriptors.chunks(options.chunk_size).enumerate() {
            debug!(run_id = %run_id, chunk = index + 1, of = total, "Running chunk");

            for outcome in executor.run_chunk(chunk).await {
                apply_outcome(&mut result, outcome, options)?;
            }

            if options.report_progress {
                self.report_progress(index + 1, total);
            }
        }

        if total == 0 && options.report_progress {
            self.report_progress(0, 0);
        }

        Ok(result)
    }

    fn report_progress(&self, completed: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            completed as f64 / total as f64
        };
        self.progress.report(fraction, completed == total);
    }
}

fn ensure_unique(descriptors: &[TaskDescriptor]) -> Result<(), RunError> {
    let mut seen = HashSet::with_capacity(descriptors.len());
    for task in descriptors {
        if !seen.insert(&task.id) {
            return Err(RunError::DuplicateTaskId(task.id.clone()));
        }
    }
    Ok(())
}

fn apply_outcome(
    result: &mut RunResult,
    outcome: TaskOutcome,
    options: &RunOptions,
) -> Result<(), RunError> {
    match outcome {
        TaskOutcome::Success { task_id, payload } => {
            result.record_success(task_id, payload);
        }
        TaskOutcome::Failure { task_id, error } => {
            if options.throw_on_failure {
                return Err(RunError::TaskFailed {
                    task_id,
                    source: error,
                });
            }
            result.record_failure(error);
        }
        TaskOutcome::HardException { task_id, message } => {
            return Err(RunError::HardException { task_id, message });
        }
    }
    Ok(())
}
