//! Process environment and its provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chunkrun_engine::{ContextError, Environment, EnvironmentError, EnvironmentProvider};
use tracing::{info, warn};

use crate::config::ProcessConfig;
use crate::context::ProcessContext;
use crate::error::ProcessError;

/// Hands out a [`ProcessEnvironment`] per run.
#[derive(Debug, Clone)]
pub struct ProcessProvider {
    config: Arc<ProcessConfig>,
}

impl ProcessProvider {
    /// Create a provider for the given config.
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The process configuration.
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }
}

#[async_trait]
impl EnvironmentProvider for ProcessProvider {
    type Environment = ProcessEnvironment;

    async fn acquire(&self) -> Result<ProcessEnvironment, EnvironmentError> {
        self.config
            .validate()
            .map_err(|e| EnvironmentError::Acquire(e.to_string()))?;

        info!(program = %self.config.program, "Process environment acquired");
        Ok(ProcessEnvironment {
            config: Arc::clone(&self.config),
            live: Arc::new(AtomicUsize::new(0)),
        })
    }
}

/// Starts one child process per task and tracks how many are alive.
pub struct ProcessEnvironment {
    config: Arc<ProcessConfig>,
    live: Arc<AtomicUsize>,
}

impl ProcessEnvironment {
    /// Number of task processes currently alive.
    pub fn live_processes(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Environment for ProcessEnvironment {
    type Context = ProcessContext;

    async fn start_context(&self) -> Result<ProcessContext, ContextError> {
        Ok(ProcessContext::new(
            Arc::clone(&self.config),
            Arc::clone(&self.live),
        ))
    }

    async fn release(self) -> Result<(), EnvironmentError> {
        let live = self.live_processes();
        if live > 0 {
            warn!(live, "Releasing environment with running processes");
            return Err(EnvironmentError::Release(
                ProcessError::Leaked(live).to_string(),
            ));
        }
        info!("Process environment released");
        Ok(())
    }
}
