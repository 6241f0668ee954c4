//! Orchestration engine for chunkrun.
//!
//! Drives many independent, crash-prone execution contexts through
//! sequential chunks of bounded size:
//!
//! ```text
//! Orchestrator ──▶ ChunkExecutor ──▶ TaskRunner ──▶ ExecutionContext
//!      ▲                                                   │
//!      └──────────────── TaskOutcome ◀─────────────────────┘
//! ```
//!
//! The execution backend is injected through [`EnvironmentProvider`],
//! [`Environment`] and [`ExecutionContext`]; see `chunkrun-process` for a
//! subprocess-based implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use chunkrun_core::{RunOptions, TaskDescriptor};
//! use chunkrun_engine::{LogProgress, Orchestrator};
//!
//! let orchestrator = Orchestrator::new(provider, |task: &TaskDescriptor| {
//!     Ok::<_, String>(format!("http://localhost:8080/{}", task.id))
//! })
//! .with_progress(LogProgress);
//!
//! let result = orchestrator
//!     .run(&tasks, &RunOptions::default().with_chunk_size(4))
//!     .await?;
//! ```

mod chunk;
mod environment;
mod error;
mod guard;
mod orchestrator;
mod progress;
mod resolver;
mod runner;

#[cfg(test)]
mod testing;

pub use chunk::ChunkExecutor;
pub use environment::{
    ContextSignal, Environment, EnvironmentProvider, ExecutionContext, SignalSink, Target,
};
pub use error::{ContextError, EnvironmentError};
pub use guard::CleanupGuard;
pub use orchestrator::Orchestrator;
pub use progress::{LogProgress, ProgressSink};
pub use resolver::TargetResolver;
pub use runner::TaskRunner;
