//! Errors returned by injected collaborators.

use thiserror::Error;

/// Errors from acquiring or releasing the shared environment.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The environment could not be acquired.
    #[error("Failed to acquire environment: {0}")]
    Acquire(String),

    /// The environment could not be released cleanly.
    #[error("Failed to release environment: {0}")]
    Release(String),
}

/// Errors from a single execution context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The environment could not open a new context.
    #[error("Failed to start context: {0}")]
    Start(String),

    /// The context could not be pointed at its target.
    #[error("Failed to navigate to '{target}': {message}")]
    Navigate { target: String, message: String },

    /// Closing the context failed.
    #[error("Failed to close context: {0}")]
    Close(String),
}
