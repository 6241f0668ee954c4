//! Subprocess execution environment for chunkrun.
//!
//! Every task runs in its own child process. The process is started with the
//! task's target as its last argument; a stdout line beginning with the
//! completion marker settles the task with the JSON that follows the marker.
//!
//! # Example
//!
//! ```rust,no_run
//! use chunkrun_core::{RunOptions, TaskDescriptor};
//! use chunkrun_engine::Orchestrator;
//! use chunkrun_process::{ProcessConfig, ProcessProvider};
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProcessConfig::new("node")
//!         .with_arg("extract.js")
//!         .with_completion_marker("MACRO_API:");
//!
//!     let orchestrator = Orchestrator::new(ProcessProvider::new(config), |task: &TaskDescriptor| {
//!         Ok::<_, String>(format!("http://localhost:8080/{0}/{0}_en.html", task.id))
//!     });
//!
//!     let tasks = vec![TaskDescriptor::new("friction")];
//!     let result = orchestrator.run(&tasks, &RunOptions::default()).await?;
//!     println!("{:?}", result.summary());
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod environment;
mod error;

pub use config::{ProcessConfig, DEFAULT_COMPLETION_MARKER, DEFAULT_ERROR_MARKER};
pub use context::ProcessContext;
pub use environment::{ProcessEnvironment, ProcessProvider};
pub use error::ProcessError;
