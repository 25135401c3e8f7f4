//! Command executor
//!
//! Runs a [`RenderedCommand`] as a direct child process: no shell, stdin
//! closed, stdout/stderr captured up to a byte cap each. A timeout or a
//! cancelled request kills the process; the child is also killed if the
//! executing future is dropped.

use crate::command::RenderedCommand;
use crate::errors::AssistantError;
use serde::Serialize;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Time allowed for output readers to drain once the process is gone
const READER_GRACE: Duration = Duration::from_millis(250);

/// How the process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Exited on its own, successfully or not
    Completed,
    /// Killed after exceeding the timeout
    TimedOut,
    /// Killed because the request was cancelled
    Cancelled,
}

/// Captured result of one execution
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Exit code; `None` when the process was killed
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    /// Output exceeded the byte cap and was cut
    pub truncated: bool,
    /// A descendant kept an output pipe open after the process ended;
    /// output written after that point is not captured
    pub pipe_held_open: bool,
    pub outcome: ExecutionOutcome,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.outcome == ExecutionOutcome::Completed && self.exit_code == Some(0)
    }

    pub fn timed_out(&self) -> bool {
        self.outcome == ExecutionOutcome::TimedOut
    }
}

enum Ending {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Bytes kept from one output stream
#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    truncated: bool,
    held_open: bool,
}

/// Capture buffer shared with the reader task so partial output survives
/// an aborted read
type SharedCapture = Arc<Mutex<Capture>>;

/// Runs rendered commands under a byte cap
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    max_output_bytes: usize,
}

impl CommandExecutor {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }

    /// Execute `command` with a timeout
    ///
    /// A non-zero exit, a timeout and cancellation are all reported through
    /// the result. Only a failure to start or wait for the process is an
    /// error.
    pub async fn execute(
        &self,
        command: &RenderedCommand,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, AssistantError> {
        let start = Instant::now();
        debug!("Executing: {}", command.display());

        let mut child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AssistantError::Spawn {
                program: command.program().to_string(),
                source,
            })?;

        let cap = self.max_output_bytes;
        let stdout_buf = SharedCapture::default();
        let stderr_buf = SharedCapture::default();
        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(read_capped(out, cap, stdout_buf.clone())));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(read_capped(err, cap, stderr_buf.clone())));

        let ending = tokio::select! {
            status = child.wait() => Ending::Exited(status),
            _ = tokio::time::sleep(timeout) => Ending::TimedOut,
            _ = cancel.cancelled() => Ending::Cancelled,
        };

        let (exit_code, outcome) = match ending {
            Ending::Exited(status) => (status?.code(), ExecutionOutcome::Completed),
            Ending::TimedOut => {
                warn!(
                    "Command '{}' timed out after {:?}, killing",
                    command.program(),
                    timeout
                );
                kill(&mut child).await;
                (None, ExecutionOutcome::TimedOut)
            }
            Ending::Cancelled => {
                info!("Request cancelled, killing '{}'", command.program());
                kill(&mut child).await;
                (None, ExecutionOutcome::Cancelled)
            }
        };

        let stdout = collect(stdout_task, &stdout_buf).await;
        let stderr = collect(stderr_task, &stderr_buf).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if outcome == ExecutionOutcome::Completed {
            if exit_code == Some(0) {
                info!(
                    "Command '{}' completed successfully in {}ms",
                    command.program(),
                    duration_ms
                );
            } else {
                warn!(
                    "Command '{}' failed with exit code {:?} in {}ms",
                    command.program(),
                    exit_code,
                    duration_ms
                );
            }
        }

        Ok(ExecutionResult {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout.bytes).into_owned(),
            stderr: String::from_utf8_lossy(&stderr.bytes).into_owned(),
            duration_ms,
            truncated: stdout.truncated || stderr.truncated,
            pipe_held_open: stdout.held_open || stderr.held_open,
            outcome,
        })
    }
}

async fn kill(child: &mut tokio::process::Child) {
    if let Err(e) = child.kill().await {
        warn!("Failed to kill child process: {}", e);
    }
}

/// Read a stream into `buf`, keeping at most `cap` bytes and draining the rest
async fn read_capped<R>(mut reader: R, cap: usize, buf: SharedCapture) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        let Ok(mut capture) = buf.lock() else {
            return Ok(());
        };
        let room = cap.saturating_sub(capture.bytes.len());
        if n > room {
            capture.truncated = true;
        }
        capture.bytes.extend_from_slice(&chunk[..n.min(room)]);
    }
}

/// Join a reader task, giving up after a short grace period
///
/// A grandchild that inherited the pipe can keep it open after the child
/// is gone. Whatever was read before that point is kept.
async fn collect(task: Option<JoinHandle<std::io::Result<()>>>, buf: &SharedCapture) -> Capture {
    if let Some(mut task) = task {
        match tokio::time::timeout(READER_GRACE, &mut task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!("Failed to read command output: {}", e),
            Ok(Err(e)) => warn!("Output reader task failed: {}", e),
            Err(_) => {
                task.abort();
                warn!("Output pipe still open after process exit, keeping partial output");
                if let Ok(mut capture) = buf.lock() {
                    capture.held_open = true;
                }
            }
        }
    }

    match buf.lock() {
        Ok(mut capture) => std::mem::take(&mut *capture),
        Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::command::raw_command;

    fn executor() -> CommandExecutor {
        CommandExecutor::new(1024)
    }

    #[tokio::test]
    async fn test_execute_success() {
        let cmd = raw_command("echo", &["hello"]);
        let result = executor()
            .execute(&cmd, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello");
        assert!(!result.truncated);
        assert!(!result.pipe_held_open);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_a_result() {
        let cmd = raw_command("false", &[]);
        let result = executor()
            .execute(&cmd, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.outcome, ExecutionOutcome::Completed);
        assert_eq!(result.exit_code, Some(1));
        assert!(!result.success());
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let cmd = raw_command("sleep", &["10"]);
        let started = Instant::now();
        let result = executor()
            .execute(&cmd, Duration::from_millis(200), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.timed_out());
        assert_eq!(result.exit_code, None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancellation_kills_process() {
        let cmd = raw_command("sleep", &["10"]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let result = executor()
            .execute(&cmd, Duration::from_secs(30), &cancel)
            .await
            .unwrap();
        assert_eq!(result.outcome, ExecutionOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_output_is_capped() {
        let cmd = raw_command("head", &["-c", "100000", "/dev/zero"]);
        let result = CommandExecutor::new(100)
            .execute(&cmd, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.truncated);
        assert_eq!(result.stdout.len(), 100);
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_partial_output_kept_when_grandchild_holds_pipe() {
        let cmd = raw_command("sh", &["-c", "echo hello; sleep 3 &"]);
        let started = Instant::now();
        let result = executor()
            .execute(&cmd, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.pipe_held_open);
        assert!(!result.truncated);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_metacharacters_are_literal() {
        let cmd = raw_command("echo", &["a;b", "$(id)", "`whoami`", "x|y", "p&q"]);
        let result = executor()
            .execute(&cmd, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.stdout.trim(), "a;b $(id) `whoami` x|y p&q");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let cmd = raw_command("kubeassist-no-such-binary-12345", &[]);
        let result = executor()
            .execute(&cmd, Duration::from_secs(5), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AssistantError::Spawn { .. })));
    }
}
