//! Mapping task descriptors to context targets.

use chunkrun_core::TaskDescriptor;

use crate::environment::Target;

/// Resolves where a task's context should navigate to (e.g. a URL).
///
/// Owned by the caller. A resolution error is treated like a failure to
/// navigate: the task settles as a hard exception.
pub trait TargetResolver: Send + Sync {
    fn resolve(&self, task: &TaskDescriptor) -> Result<Target, String>;
}

impl<F> TargetResolver for F
where
    F: Fn(&TaskDescriptor) -> Result<Target, String> + Send + Sync,
{
    fn resolve(&self, task: &TaskDescriptor) -> Result<Target, String> {
        self(task)
    }
}
