//! Scripted in-memory environment for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chunkrun_core::{Payload, TaskDescriptor};
use tokio::task::JoinHandle;

use crate::environment::{Environment, EnvironmentProvider, ExecutionContext, SignalSink, Target};
use crate::error::{ContextError, EnvironmentError};

/// A signal a scripted context raises.
#[derive(Debug, Clone)]
pub enum Signal {
    Success(Payload),
    Error(String),
}

/// What a context does once navigated to a target.
#[derive(Debug, Clone)]
pub enum Script {
    /// Signal completion after a delay.
    Succeed { after: Duration, payload: Payload },
    /// Signal an error after a delay.
    Fail { after: Duration, message: String },
    /// Never signal.
    Hang,
    /// Refuse to navigate.
    RejectNavigate,
    /// Raise two signals back to back while navigating.
    Both { first: Signal, second: Signal },
    /// Succeed after a delay; closing then raises an error signal.
    CrashOnClose { after: Duration, payload: Payload },
}

impl Script {
    pub fn succeed(after_ms: u64, payload: Payload) -> Self {
        Self::Succeed {
            after: Duration::from_millis(after_ms),
            payload,
        }
    }

    pub fn fail(after_ms: u64, message: &str) -> Self {
        Self::Fail {
            after: Duration::from_millis(after_ms),
            message: message.to_string(),
        }
    }
}

/// Counters shared by a provider and everything it hands out.
#[derive(Debug, Default)]
pub struct Stats {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub started: AtomicUsize,
    pub open: AtomicUsize,
    pub peak_open: AtomicUsize,
    pub closes: Mutex<HashMap<Target, usize>>,
}

impl Stats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }

    pub fn closes_of(&self, target: &str) -> usize {
        self.closes
            .lock()
            .unwrap()
            .get(target)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_closes(&self) -> usize {
        self.closes.lock().unwrap().values().sum()
    }
}

/// Provider whose contexts follow per-target scripts.
#[derive(Default)]
pub struct MockProvider {
    scripts: Arc<HashMap<Target, Script>>,
    pub stats: Arc<Stats>,
    fail_acquire: bool,
    fail_release: bool,
    reject_starts: bool,
}

impl MockProvider {
    pub fn new<I>(scripts: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Script)>,
    {
        Self {
            scripts: Arc::new(
                scripts
                    .into_iter()
                    .map(|(target, script)| (target.to_string(), script))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn failing_acquire(mut self) -> Self {
        self.fail_acquire = true;
        self
    }

    pub fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    pub fn rejecting_starts(mut self) -> Self {
        self.reject_starts = true;
        self
    }

    /// Environment without going through `acquire`, for runner-level tests.
    pub fn environment(&self) -> MockEnvironment {
        MockEnvironment {
            scripts: Arc::clone(&self.scripts),
            stats: Arc::clone(&self.stats),
            fail_release: self.fail_release,
            reject_starts: self.reject_starts,
        }
    }
}

#[async_trait]
impl EnvironmentProvider for MockProvider {
    type Environment = MockEnvironment;

    async fn acquire(&self) -> Result<MockEnvironment, EnvironmentError> {
        if self.fail_acquire {
            return Err(EnvironmentError::Acquire("no browser available".into()));
        }
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(self.environment())
    }
}

pub struct MockEnvironment {
    scripts: Arc<HashMap<Target, Script>>,
    stats: Arc<Stats>,
    fail_release: bool,
    reject_starts: bool,
}

#[async_trait]
impl Environment for MockEnvironment {
    type Context = MockContext;

    async fn start_context(&self) -> Result<MockContext, ContextError> {
        if self.reject_starts {
            return Err(ContextError::Start("browser disconnected".into()));
        }
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        let open = self.stats.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_open.fetch_max(open, Ordering::SeqCst);

        Ok(MockContext {
            scripts: Arc::clone(&self.scripts),
            stats: Arc::clone(&self.stats),
            sink: None,
            target: None,
            crash_on_close: false,
            pending: None,
        })
    }

    async fn release(self) -> Result<(), EnvironmentError> {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(EnvironmentError::Release("browser refused to exit".into()));
        }
        Ok(())
    }
}

pub struct MockContext {
    scripts: Arc<HashMap<Target, Script>>,
    stats: Arc<Stats>,
    sink: Option<SignalSink>,
    target: Option<Target>,
    crash_on_close: bool,
    pending: Option<JoinHandle<()>>,
}

impl MockContext {
    fn emit(sink: &SignalSink, signal: Signal) {
        match signal {
            Signal::Success(payload) => sink.succeed(payload),
            Signal::Error(message) => sink.fail(message),
        }
    }

    fn emit_later(&mut self, after: Duration, signal: Signal) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            Self::emit(&sink, signal);
        }));
    }
}

#[async_trait]
impl ExecutionContext for MockContext {
    fn subscribe(&mut self, sink: SignalSink) {
        self.sink = Some(sink);
    }

    async fn navigate(&mut self, target: &str) -> Result<(), ContextError> {
        self.target = Some(target.to_string());
        let script = self
            .scripts
            .get(target)
            .cloned()
            .ok_or_else(|| ContextError::Navigate {
                target: target.to_string(),
                message: "no script".into(),
            })?;

        match script {
            Script::Succeed { after, payload } => self.emit_later(after, Signal::Success(payload)),
            Script::Fail { after, message } => self.emit_later(after, Signal::Error(message)),
            Script::Hang => {}
            Script::RejectNavigate => {
                return Err(ContextError::Navigate {
                    target: target.to_string(),
                    message: "net::ERR_CONNECTION_REFUSED".into(),
                })
            }
            Script::Both { first, second } => {
                if let Some(sink) = &self.sink {
                    Self::emit(sink, first);
                    Self::emit(sink, second);
                }
            }
            Script::CrashOnClose { after, payload } => {
                self.crash_on_close = true;
                self.emit_later(after, Signal::Success(payload));
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContextError> {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        let target = self.target.clone().unwrap_or_default();
        *self.stats.closes.lock().unwrap().entry(target).or_insert(0) += 1;
        self.stats.open.fetch_sub(1, Ordering::SeqCst);

        if self.crash_on_close {
            if let Some(sink) = &self.sink {
                sink.fail("Target closed");
            }
        }
        Ok(())
    }
}

/// Resolver that uses the task id as the target.
pub fn id_resolver(task: &TaskDescriptor) -> Result<Target, String> {
    Ok(task.id.to_string())
}

/// Descriptors for the given ids.
pub fn tasks(ids: &[&str]) -> Vec<TaskDescriptor> {
    ids.iter().map(|id| TaskDescriptor::new(*id)).collect()
}
