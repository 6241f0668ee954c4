//! chunkrun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - An async runtime
//! - Processes or I/O
//! - Any particular execution backend
//!
//! Everything the orchestrator passes around (descriptors, outcomes,
//! options, aggregated results) lives here.

pub mod error;
pub mod ids;
pub mod options;
pub mod outcome;
pub mod result;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use error::RunError;
pub use ids::{RunId, TaskId};
pub use options::RunOptions;
pub use outcome::{ChunkResult, Payload, TaskError, TaskOutcome};
pub use result::{RunResult, RunSummary};
pub use status::RunnerState;
pub use task::TaskDescriptor;
