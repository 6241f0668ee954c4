//! Task descriptors.

use crate::TaskId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Describes one task to run.
///
/// `params` is opaque to the orchestrator: only the caller's target
/// resolver reads it to decide where the execution context should go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DescriptorRepr")]
pub struct TaskDescriptor {
    /// Unique task identifier.
    pub id: TaskId,

    /// Caller-defined parameters for target resolution.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl TaskDescriptor {
    /// Create a descriptor with no parameters.
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            params: Value::Null,
        }
    }

    /// Builder method to attach resolver parameters.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Look up a string parameter by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// Accepts either `"id"` or `{"id": "...", "params": {...}}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorRepr {
    Bare(TaskId),
    Full {
        id: TaskId,
        #[serde(default)]
        params: Value,
    },
}

impl From<DescriptorRepr> for TaskDescriptor {
    fn from(repr: DescriptorRepr) -> Self {
        match repr {
            DescriptorRepr::Bare(id) => Self::new(id),
            DescriptorRepr::Full { id, params } => Self { id, params },
        }
    }
}
