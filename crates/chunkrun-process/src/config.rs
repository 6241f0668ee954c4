//! Process environment configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

/// Marker prefix a task process prints on stdout when it completes.
pub const DEFAULT_COMPLETION_MARKER: &str = "CHUNKRUN_RESULT:";

/// Marker prefix a task process prints on stderr to report an error.
pub const DEFAULT_ERROR_MARKER: &str = "CHUNKRUN_ERROR:";

/// How task processes are started and observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Executable to run. Resolved through `PATH` when not a path.
    pub program: String,

    /// Arguments placed before the task target.
    pub args: Vec<String>,

    /// Stdout prefix that marks the completion line.
    pub completion_marker: String,

    /// Stderr prefix that marks an error line.
    pub error_marker: String,

    /// Working directory for task processes.
    pub working_dir: Option<PathBuf>,

    /// Additional environment variables.
    pub env: Vec<(String, String)>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            completion_marker: DEFAULT_COMPLETION_MARKER.to_string(),
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
            working_dir: None,
            env: Vec::new(),
        }
    }
}

impl ProcessConfig {
    /// Create a config for the given executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Add an argument placed before the target.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments placed before the target.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the completion marker.
    pub fn with_completion_marker(mut self, marker: impl Into<String>) -> Self {
        self.completion_marker = marker.into();
        self
    }

    /// Set the error marker.
    pub fn with_error_marker(mut self, marker: impl Into<String>) -> Self {
        self.error_marker = marker.into();
        self
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Check the config before any process is started.
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.program.trim().is_empty() {
            return Err(ProcessError::InvalidConfig("program is empty".into()));
        }
        if self.completion_marker.is_empty() {
            return Err(ProcessError::InvalidConfig(
                "completion marker is empty".into(),
            ));
        }
        if let Some(dir) = &self.working_dir {
            if !dir.is_dir() {
                return Err(ProcessError::InvalidConfig(format!(
                    "working directory '{}' does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}
