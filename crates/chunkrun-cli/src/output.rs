//! JSON report printed to stdout.

use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use chunkrun_core::{Payload, RunResult, RunSummary, TaskError, TaskId};
use serde::Serialize;

/// Outcome of a finished run, as printed by the CLI.
#[derive(Debug, Serialize)]
pub struct Report {
    pub started_at: String,
    pub finished_at: String,
    pub elapsed_ms: i64,
    pub summary: RunSummary,
    pub results: BTreeMap<TaskId, Option<Payload>>,
    pub errors: BTreeMap<TaskId, TaskError>,
}

impl Report {
    /// Build a report for a run that started at `started_at` and just finished.
    pub fn new(started_at: DateTime<Utc>, result: RunResult) -> Self {
        let finished_at = Utc::now();
        let summary = result.summary();
        Self {
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            elapsed_ms: (finished_at - started_at).num_milliseconds(),
            summary,
            results: result.results,
            errors: result.errors,
        }
    }

    /// Write the report as pretty JSON to stdout.
    pub fn print(&self) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", json)?;
        stdout.flush()
    }
}
