//! Error types for the process environment.

use thiserror::Error;

/// Errors that can occur while managing task processes.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The configuration cannot be used to start processes.
    #[error("Invalid process configuration: {0}")]
    InvalidConfig(String),

    /// Failed to spawn the task process.
    #[error("Failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),

    /// A stdio pipe was not available after spawning.
    #[error("Failed to get {0} of spawned process")]
    MissingPipe(&'static str),

    /// The context was navigated before anything subscribed to its signals.
    #[error("Context has no signal subscriber")]
    NotSubscribed,

    /// Processes were still alive when the environment was released.
    #[error("{0} process(es) still running at release")]
    Leaked(usize),
}
