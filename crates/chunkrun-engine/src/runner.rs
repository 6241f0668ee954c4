//! Running a single task to a terminal outcome.

use std::sync::Arc;
use std::time::Duration;

use chunkrun_core::{RunnerState, TaskDescriptor, TaskError, TaskId, TaskOutcome};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::environment::{ContextSignal, Environment, ExecutionContext, SignalSink};
use crate::guard::CleanupGuard;
use crate::resolver::TargetResolver;

/// Runs exactly one task: `Starting → Racing → Settled`.
///
/// While racing, the first of a success signal, an error signal or the
/// per-task timeout decides the outcome. The context is closed exactly once
/// by whoever wins the [`CleanupGuard`]; signals raised by the close itself
/// are dropped by the [`SignalSink`].
///
/// Soft failures are returned as [`TaskOutcome::Failure`], never as errors.
pub struct TaskRunner<'a, E: Environment> {
    environment: &'a E,
    resolver: &'a dyn TargetResolver,
    timeout: Duration,
    state: RunnerState,
}

impl<'a, E: Environment> TaskRunner<'a, E> {
    /// Create a runner for one task.
    pub fn new(environment: &'a E, resolver: &'a dyn TargetResolver, timeout: Duration) -> Self {
        Self {
            environment,
            resolver,
            timeout,
            state: RunnerState::Starting,
        }
    }

    /// Current lifecycle state. `Settled` once [`run`](Self::run) returned.
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Drive the task until it settles.
    ///
    /// A runner drives one task only; running it again returns a
    /// `HardException` without touching the environment.
    pub async fn run(&mut self, task: &TaskDescriptor) -> TaskOutcome {
        let task_id = task.id.clone();

        if self.state != RunnerState::Starting {
            warn!(task_id = %task_id, state = %self.state, "Runner already used");
            return TaskOutcome::HardException {
                task_id,
                message: format!("Runner is already {}", self.state),
            };
        }

        let target = match self.resolver.resolve(task) {
            Ok(target) => target,
            Err(message) => {
                return self.hard_exception(task_id, format!("Target resolution failed: {message}"))
            }
        };

        debug!(task_id = %task_id, target = %target, "Starting context");
        let mut context = match self.environment.start_context().await {
            Ok(context) => context,
            Err(e) => return self.hard_exception(task_id, e.to_string()),
        };

        let guard = Arc::new(CleanupGuard::new());
        let (tx, mut signals) = mpsc::unbounded_channel();
        context.subscribe(SignalSink::new(task_id.clone(), tx, Arc::clone(&guard)));

        if let Err(e) = context.navigate(&target).await {
            // The context was opened, so it still has to be closed once.
            if guard.claim() {
                close_context(&mut context, &task_id).await;
            }
            return self.hard_exception(task_id, e.to_string());
        }

        self.transition(&task_id, RunnerState::Racing);

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        // A closed signal channel disables its branch; only the timer remains.
        let outcome = tokio::select! {
            Some(signal) = signals.recv() => match signal {
                ContextSignal::Completed(payload) => TaskOutcome::Success {
                    task_id: task_id.clone(),
                    payload,
                },
                ContextSignal::Crashed(message) => {
                    warn!(task_id = %task_id, error = %message, "Context crashed while running");
                    TaskOutcome::Failure {
                        task_id: task_id.clone(),
                        error: TaskError::signaled(task_id.clone(), message),
                    }
                }
            },
            _ = &mut deadline => {
                warn!(task_id = %task_id, timeout_ms = self.timeout.as_millis() as u64, "Task timed out");
                TaskOutcome::Failure {
                    task_id: task_id.clone(),
                    error: TaskError::timeout(task_id.clone(), self.timeout),
                }
            }
        };

        if guard.claim() {
            close_context(&mut context, &task_id).await;
        }
        drop(signals);

        self.transition(&task_id, RunnerState::Settled);
        info!(task_id = %task_id, outcome = outcome.label(), "Task settled");
        outcome
    }

    fn hard_exception(&mut self, task_id: TaskId, message: String) -> TaskOutcome {
        warn!(task_id = %task_id, error = %message, "Task could not be started");
        self.transition(&task_id, RunnerState::Settled);
        TaskOutcome::HardException { task_id, message }
    }

    fn transition(&mut self, task_id: &TaskId, next: RunnerState) {
        debug_assert!(self.state.can_transition_to(next));
        debug!(task_id = %task_id, from = %self.state, to = %next, "Runner state");
        self.state = next;
    }
}

async fn close_context<C: ExecutionContext>(context: &mut C, task_id: &TaskId) {
    if let Err(e) = context.close().await {
        warn!(task_id = %task_id, error = %e, "Failed to close context");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{id_resolver, MockProvider, Script, Signal};
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(1);

    async fn run_one(provider: &MockProvider, id: &str) -> TaskOutcome {
        let environment = provider.environment();
        let mut runner = TaskRunner::new(&environment, &id_resolver, TIMEOUT);
        runner.run(&TaskDescriptor::new(id)).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_signal() {
        let provider = MockProvider::new([("a", Script::succeed(10, json!({"api": 1})))]);

        let outcome = run_one(&provider, "a").await;

        assert_eq!(
            outcome,
            TaskOutcome::Success {
                task_id: TaskId::from("a"),
                payload: json!({"api": 1}),
            }
        );
        assert_eq!(provider.stats.closes_of("a"), 1);
        assert_eq!(provider.stats.open(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_signal_is_soft_failure() {
        let provider = MockProvider::new([("a", Script::fail(10, "page crashed"))]);

        let outcome = run_one(&provider, "a").await;

        match outcome {
            TaskOutcome::Failure { task_id, error } => {
                assert_eq!(task_id, TaskId::from("a"));
                assert_eq!(error, TaskError::signaled(TaskId::from("a"), "page crashed"));
            }
            other => panic!("Expected Failure, got {:?}", other),
        }
        assert_eq!(provider.stats.closes_of("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let provider = MockProvider::new([("a", Script::Hang)]);

        let outcome = run_one(&provider, "a").await;

        match outcome {
            TaskOutcome::Failure { error, .. } => {
                assert_eq!(error, TaskError::timeout(TaskId::from("a"), TIMEOUT));
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
        assert_eq!(provider.stats.closes_of("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_cancels_timer() {
        let provider = MockProvider::new([("a", Script::succeed(10, json!(null)))]);
        let started = tokio::time::Instant::now();

        let outcome = run_one(&provider, "a").await;

        assert!(outcome.is_success());
        assert!(started.elapsed() < TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spurious_error_on_close_is_ignored() {
        let provider = MockProvider::new([(
            "a",
            Script::CrashOnClose {
                after: Duration::from_millis(5),
                payload: json!("ok"),
            },
        )]);

        let outcome = run_one(&provider, "a").await;

        assert!(outcome.is_success());
        assert_eq!(provider.stats.closes_of("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_signals_success_first() {
        let provider = MockProvider::new([(
            "a",
            Script::Both {
                first: Signal::Success(json!(7)),
                second: Signal::Error("late crash".into()),
            },
        )]);

        let outcome = run_one(&provider, "a").await;

        assert!(outcome.is_success());
        assert_eq!(provider.stats.total_closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_signals_error_first() {
        let provider = MockProvider::new([(
            "a",
            Script::Both {
                first: Signal::Error("crash".into()),
                second: Signal::Success(json!(7)),
            },
        )]);

        let outcome = run_one(&provider, "a").await;

        assert_eq!(outcome.label(), "failure");
        assert_eq!(provider.stats.total_closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_and_timeout_together_close_once() {
        let provider = MockProvider::new([("a", Script::fail(TIMEOUT.as_millis() as u64, "crash"))]);

        let outcome = run_one(&provider, "a").await;

        assert!(matches!(outcome, TaskOutcome::Failure { .. }));
        assert_eq!(provider.stats.closes_of("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_is_hard_exception_without_close() {
        let provider = MockProvider::new([("a", Script::Hang)]).rejecting_starts();

        let outcome = run_one(&provider, "a").await;

        assert_eq!(outcome.label(), "hard_exception");
        assert_eq!(provider.stats.total_closes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_failure_is_hard_exception_and_closes() {
        let provider = MockProvider::new([("a", Script::RejectNavigate)]);

        let outcome = run_one(&provider, "a").await;

        match outcome {
            TaskOutcome::HardException { task_id, message } => {
                assert_eq!(task_id, TaskId::from("a"));
                assert!(message.contains("ERR_CONNECTION_REFUSED"));
            }
            other => panic!("Expected HardException, got {:?}", other),
        }
        assert_eq!(provider.stats.closes_of("a"), 1);
        assert_eq!(provider.stats.open(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_failure_is_hard_exception() {
        let provider = MockProvider::default();
        let environment = provider.environment();
        let resolver =
            |_: &TaskDescriptor| -> Result<String, String> { Err("unknown sim".to_string()) };

        let outcome = TaskRunner::new(&environment, &resolver, TIMEOUT)
            .run(&TaskDescriptor::new("a"))
            .await;

        assert_eq!(outcome.label(), "hard_exception");
        assert_eq!(provider.stats.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_is_observable_after_run() {
        let provider = MockProvider::new([("a", Script::succeed(10, json!(1)))]);
        let environment = provider.environment();
        let mut runner = TaskRunner::new(&environment, &id_resolver, TIMEOUT);
        assert_eq!(runner.state(), RunnerState::Starting);

        let outcome = runner.run(&TaskDescriptor::new("a")).await;

        assert!(outcome.is_success());
        assert_eq!(runner.state(), RunnerState::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_runner_is_not_reused() {
        let provider = MockProvider::new([("a", Script::succeed(10, json!(1)))]);
        let environment = provider.environment();
        let mut runner = TaskRunner::new(&environment, &id_resolver, TIMEOUT);
        runner.run(&TaskDescriptor::new("a")).await;

        let again = runner.run(&TaskDescriptor::new("a")).await;

        assert_eq!(again.label(), "hard_exception");
        assert_eq!(provider.stats.started(), 1);
        assert_eq!(provider.stats.closes_of("a"), 1);
    }
}
