//! CLI configuration.

use std::path::Path;
use std::time::Duration;

use chunkrun_core::{RunOptions, TaskDescriptor};
use chunkrun_process::ProcessConfig;
use thiserror::Error;

use crate::Args;

/// Errors while building the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read tasks file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse tasks file '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No tasks given; pass task ids or --tasks-file")]
    NoTasks,
}

/// Everything a run needs, resolved from the command line.
#[derive(Debug)]
pub struct Config {
    /// Tasks in execution order.
    pub tasks: Vec<TaskDescriptor>,

    /// Orchestrator options.
    pub options: RunOptions,

    /// How task processes are started.
    pub process: ProcessConfig,

    /// Target template for the resolver.
    pub target_template: String,
}

impl Config {
    /// Build the configuration from parsed arguments.
    ///
    /// Tasks from `--tasks-file` come first, followed by positional ids.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let mut tasks = match &args.tasks_file {
            Some(path) => load_tasks(path)?,
            None => Vec::new(),
        };
        tasks.extend(args.tasks.into_iter().map(TaskDescriptor::new));
        if tasks.is_empty() {
            return Err(ConfigError::NoTasks);
        }

        let options = RunOptions::default()
            .with_chunk_size(args.chunk_size)
            .with_throw_on_failure(args.strict)
            .with_report_progress(args.progress)
            .with_task_timeout(Duration::from_secs(args.timeout_secs));

        let mut process = ProcessConfig::new(args.program)
            .with_args(args.program_args)
            .with_completion_marker(args.marker)
            .with_error_marker(args.error_marker);
        if let Some(dir) = args.working_dir {
            process = process.with_working_dir(dir);
        }

        Ok(Self {
            tasks,
            options,
            process,
            target_template: args.target_template,
        })
    }
}

fn load_tasks(path: &Path) -> Result<Vec<TaskDescriptor>, ConfigError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: display,
        source,
    })
}
