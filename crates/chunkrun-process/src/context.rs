//! A child process acting as one task's execution context.

use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chunkrun_core::Payload;
use chunkrun_engine::{ContextError, ExecutionContext, SignalSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::ProcessConfig;
use crate::error::ProcessError;

/// How long stdout may stay open after the process exited.
const EXIT_GRACE: Duration = Duration::from_millis(250);

/// Execution context backed by a child process.
///
/// The process is spawned by [`navigate`](ExecutionContext::navigate) and
/// killed by [`close`](ExecutionContext::close). Its exit, a marked stderr
/// line, or a marked stdout line are turned into signals.
pub struct ProcessContext {
    config: Arc<ProcessConfig>,
    live: Arc<AtomicUsize>,
    sink: Option<SignalSink>,
    running: Option<Running>,
}

struct Running {
    kill_tx: oneshot::Sender<()>,
    watcher: JoinHandle<()>,
}

impl ProcessContext {
    pub(crate) fn new(config: Arc<ProcessConfig>, live: Arc<AtomicUsize>) -> Self {
        Self {
            config,
            live,
            sink: None,
            running: None,
        }
    }

    fn spawn(&mut self, target: &str) -> Result<(), ProcessError> {
        let sink = self.sink.clone().ok_or(ProcessError::NotSubscribed)?;

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so close() also reaches anything the task started.
        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }

        debug!(task_id = %sink.task_id(), "Full command: {:?}", cmd);
        let mut child = cmd.spawn().map_err(|e| {
            error!(task_id = %sink.task_id(), error = %e, "Failed to spawn task process");
            e
        })?;

        let stdout = child.stdout.take().ok_or(ProcessError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(ProcessError::MissingPipe("stderr"))?;
        let pid = child.id();

        info!(
            task_id = %sink.task_id(),
            pid = ?pid,
            target = %target,
            "Task process spawned"
        );
        self.live.fetch_add(1, Ordering::SeqCst);

        let completed = Arc::new(AtomicBool::new(false));
        let mut stdout_task = tokio::spawn(read_stdout(
            stdout,
            self.config.completion_marker.clone(),
            Arc::clone(&completed),
            sink.clone(),
        ));
        let stderr_task = tokio::spawn(read_stderr(
            stderr,
            self.config.error_marker.clone(),
            sink.clone(),
        ));

        let (kill_tx, kill_rx) = oneshot::channel();
        let live = Arc::clone(&self.live);
        let watcher = tokio::spawn(async move {
            let exit = tokio::select! {
                status = child.wait() => Exit::Exited(status),
                _ = kill_rx => Exit::Killed,
            };

            match exit {
                Exit::Exited(status) => {
                    // A completion line printed right before exiting may still
                    // be in the pipe. Background children can hold stdout open,
                    // so the wait for it is bounded.
                    if tokio::time::timeout(EXIT_GRACE, &mut stdout_task).await.is_err() {
                        debug!(task_id = %sink.task_id(), "Stdout still open after exit");
                    }
                    match status {
                        Ok(status) if !completed.load(Ordering::SeqCst) => {
                            sink.fail(format!("Process exited with {status} before completing"));
                        }
                        Ok(status) => {
                            debug!(task_id = %sink.task_id(), %status, "Task process exited");
                        }
                        Err(e) => sink.fail(format!("Failed to wait for process: {e}")),
                    }
                    if let Some(pid) = pid {
                        kill_process_group(pid);
                    }
                }
                Exit::Killed => {
                    if let Some(pid) = pid {
                        kill_process_group(pid);
                    }
                    if let Err(e) = child.start_kill() {
                        trace!(task_id = %sink.task_id(), error = %e, "Process already gone");
                    }
                    if let Err(e) = child.wait().await {
                        warn!(task_id = %sink.task_id(), error = %e, "Failed to reap killed process");
                    }
                    sink.fail("Process killed");
                }
            }

            stdout_task.abort();
            stderr_task.abort();
            live.fetch_sub(1, Ordering::SeqCst);
        });

        self.running = Some(Running { kill_tx, watcher });
        Ok(())
    }
}

enum Exit {
    Exited(std::io::Result<ExitStatus>),
    Killed,
}

/// Kill every process in the task's process group.
#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    // SAFETY: killpg only sends a signal; the group was created at spawn.
    let ret = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
    if ret != 0 {
        trace!(pgid, error = %std::io::Error::last_os_error(), "Process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

#[async_trait]
impl ExecutionContext for ProcessContext {
    fn subscribe(&mut self, sink: SignalSink) {
        self.sink = Some(sink);
    }

    async fn navigate(&mut self, target: &str) -> Result<(), ContextError> {
        self.spawn(target).map_err(|e| ContextError::Navigate {
            target: target.to_string(),
            message: e.to_string(),
        })
    }

    async fn close(&mut self) -> Result<(), ContextError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        // Fails harmlessly when the process already exited.
        let _ = running.kill_tx.send(());
        running
            .watcher
            .await
            .map_err(|e| ContextError::Close(e.to_string()))
    }
}

/// Forward the first completion line and flag it in `completed`.
async fn read_stdout(
    stdout: ChildStdout,
    marker: String,
    completed: Arc<AtomicBool>,
    sink: SignalSink,
) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match trimmed.strip_prefix(marker.as_str()) {
                    Some(rest) if !completed.swap(true, Ordering::SeqCst) => {
                        sink.succeed(parse_payload(rest));
                    }
                    _ => trace!(task_id = %sink.task_id(), stdout = %trimmed, "Task stdout"),
                }
            }
            Err(e) => {
                warn!(task_id = %sink.task_id(), error = %e, "Error reading task stdout");
                break;
            }
        }
    }
}

async fn read_stderr(stderr: ChildStderr, marker: String, sink: SignalSink) {
    let mut reader = BufReader::new(stderr);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match trimmed.strip_prefix(marker.as_str()) {
                    Some(message) if !marker.is_empty() => sink.fail(message.trim()),
                    _ => debug!(task_id = %sink.task_id(), stderr = %trimmed, "Task stderr"),
                }
            }
            Err(e) => {
                warn!(task_id = %sink.task_id(), error = %e, "Error reading task stderr");
                break;
            }
        }
    }
}

/// JSON after the marker, or the raw text when it is not JSON.
fn parse_payload(raw: &str) -> Payload {
    let raw = raw.trim();
    serde_json::from_str(raw).unwrap_or_else(|_| Payload::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payload_json() {
        assert_eq!(parse_payload(r#" {"model": {"x": 1}} "#), json!({"model": {"x": 1}}));
    }

    #[test]
    fn test_parse_payload_plain_text() {
        assert_eq!(parse_payload("not json"), json!("not json"));
    }
}
