//! Collaborator traits for the execution backend.
//!
//! An [`EnvironmentProvider`] hands out one [`Environment`] per run. The
//! environment opens one [`ExecutionContext`] per task. Contexts report back
//! through a [`SignalSink`] instead of registered callbacks.

use std::sync::Arc;

use async_trait::async_trait;
use chunkrun_core::{Payload, TaskId};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{ContextError, EnvironmentError};
use crate::guard::CleanupGuard;

/// Where a context should go, as produced by a [`TargetResolver`](crate::TargetResolver).
pub type Target = String;

/// Produces the shared environment for a run.
#[async_trait]
pub trait EnvironmentProvider: Send + Sync {
    type Environment: Environment;

    /// Acquire the environment. Called once per run.
    async fn acquire(&self) -> Result<Self::Environment, EnvironmentError>;
}

/// The shared resource all contexts of a run are opened from.
#[async_trait]
pub trait Environment: Send + Sync + Sized {
    type Context: ExecutionContext;

    /// Open a new, private context for one task.
    async fn start_context(&self) -> Result<Self::Context, ContextError>;

    /// Release the environment. Called once per run, after every task settled.
    async fn release(self) -> Result<(), EnvironmentError>;
}

/// An isolated, closable unit hosting one task's work.
#[async_trait]
pub trait ExecutionContext: Send {
    /// Register where completion and error signals go.
    ///
    /// Called once, before [`navigate`](Self::navigate).
    fn subscribe(&mut self, sink: SignalSink);

    /// Point the context at its target and start the work.
    async fn navigate(&mut self, target: &str) -> Result<(), ContextError>;

    /// Close the context. Called at most once.
    async fn close(&mut self) -> Result<(), ContextError>;
}

/// A signal raised by a running context.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextSignal {
    /// The task-specific completion event arrived.
    Completed(Payload),
    /// The context crashed or reported an error.
    Crashed(String),
}

impl ContextSignal {
    fn kind(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Crashed(_) => "crashed",
        }
    }
}

/// Handle a context uses to report completion or errors.
///
/// Cheap to clone; every clone feeds the same task. Signals raised after the
/// task's cleanup has started are dropped.
#[derive(Debug, Clone)]
pub struct SignalSink {
    task_id: TaskId,
    tx: mpsc::UnboundedSender<ContextSignal>,
    guard: Arc<CleanupGuard>,
}

impl SignalSink {
    pub(crate) fn new(
        task_id: TaskId,
        tx: mpsc::UnboundedSender<ContextSignal>,
        guard: Arc<CleanupGuard>,
    ) -> Self {
        Self { task_id, tx, guard }
    }

    /// The task this sink reports for.
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Report successful completion with a payload.
    pub fn succeed(&self, payload: Payload) {
        self.emit(ContextSignal::Completed(payload));
    }

    /// Report a crash or error.
    pub fn fail(&self, message: impl Into<String>) {
        self.emit(ContextSignal::Crashed(message.into()));
    }

    /// Returns true once the task is being cleaned up.
    pub fn is_closed(&self) -> bool {
        self.guard.is_claimed()
    }

    fn emit(&self, signal: ContextSignal) {
        if self.guard.is_claimed() {
            // Closing a context commonly interrupts it and raises an error.
            debug!(
                task_id = %self.task_id,
                signal = signal.kind(),
                detail = ?signal,
                "Ignoring signal raised after cleanup"
            );
            return;
        }

        trace!(task_id = %self.task_id, signal = signal.kind(), "Context signal");
        if self.tx.send(signal).is_err() {
            debug!(task_id = %self.task_id, "Signal receiver dropped");
        }
    }
}
