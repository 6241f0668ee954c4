//! Progress reporting.

use tracing::info;

/// Receives `(completed_chunks / total_chunks, done)` after each chunk.
///
/// Purely a side channel: it never influences control flow.
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f64, done: bool);
}

impl<F> ProgressSink for F
where
    F: Fn(f64, bool) + Send + Sync,
{
    fn report(&self, fraction: f64, done: bool) {
        self(fraction, done)
    }
}

/// Progress sink that emits tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, fraction: f64, done: bool) {
        info!(
            percent = %format!("{:.1}", fraction * 100.0),
            done,
            "Run progress"
        );
    }
}
