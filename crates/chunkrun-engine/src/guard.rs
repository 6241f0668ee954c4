//! One-shot cleanup latch.

use std::sync::atomic::{AtomicBool, Ordering};

/// Latch that lets exactly one racer close a context and settle its task.
///
/// Shared between the task runner and the context's [`SignalSink`](crate::SignalSink):
/// the runner claims it before closing, and the sink drops every signal that
/// arrives afterwards.
#[derive(Debug, Default)]
pub struct CleanupGuard {
    cleaned: AtomicBool,
}

impl CleanupGuard {
    /// Create an unclaimed guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the guard from unclaimed to claimed.
    ///
    /// Returns true only for the single caller that performed the flip.
    pub fn claim(&self) -> bool {
        self.cleaned
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns true once cleanup has started.
    pub fn is_claimed(&self) -> bool {
        self.cleaned.load(Ordering::Acquire)
    }
}
