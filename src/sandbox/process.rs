//! Process-group execution with a hard wall-clock limit
//!
//! Every backend ends up spawning one host process (`sh`, `docker` or
//! `isolate`). It is started as the leader of a fresh process group so the
//! whole tree can be killed at once, on timeout and after a normal exit.

use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::SandboxOutcome;
use crate::error::SandboxError;

/// How long to wait for output pipes to close once the group is dead
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Spawn `command` in its own process group and wait at most `timeout`.
///
/// Stdout and stderr are drained concurrently and each kept up to
/// `max_output_bytes`; the rest is read and discarded so the child never
/// blocks on a full pipe.
pub async fn run_in_group(
    mut command: Command,
    program: &str,
    timeout: Duration,
    max_output_bytes: usize,
) -> Result<SandboxOutcome, SandboxError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let started = Instant::now();
    let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
        program: program.to_string(),
        source,
    })?;
    let pgid = child.id().map(|id| Pid::from_raw(id as i32));

    let stdout_task = tokio::spawn(read_capped(child.stdout.take(), max_output_bytes));
    let stderr_task = tokio::spawn(read_capped(child.stderr.take(), max_output_bytes));

    let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => (Some(status), false),
        Ok(Err(e)) => {
            kill_group(pgid);
            return Err(SandboxError::Unavailable(format!(
                "failed to wait for {}: {}",
                program, e
            )));
        }
        Err(_) => {
            debug!(
                program,
                timeout_ms = timeout.as_millis() as u64,
                "Time limit reached, killing process group"
            );
            kill_group(pgid);
            (child.wait().await.ok(), true)
        }
    };

    // Descendants that outlived the leader
    kill_group(pgid);

    let (stdout, stdout_truncated) = collect(stdout_task).await;
    let (stderr, stderr_truncated) = collect(stderr_task).await;

    debug!(
        program,
        elapsed_ms = started.elapsed().as_millis() as u64,
        timed_out,
        exit_code = ?status.and_then(|s| s.code()),
        "Process group finished"
    );

    Ok(SandboxOutcome {
        exit_code: status.and_then(|s| s.code()),
        signal: status.and_then(|s| s.signal()),
        stdout,
        stderr,
        timed_out,
        truncated: stdout_truncated || stderr_truncated,
    })
}

/// SIGKILL every process in the group. A group that is already gone is fine.
pub fn kill_group(pgid: Option<Pid>) {
    let Some(pgid) = pgid else {
        return;
    };
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid = pgid.as_raw(), "Failed to kill process group: {}", e),
    }
}

async fn read_capped<R>(reader: Option<R>, limit: usize) -> (Vec<u8>, bool)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return (Vec::new(), false);
    };

    let mut captured = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = limit.saturating_sub(captured.len());
                if n > room {
                    truncated = true;
                }
                captured.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) => {
                debug!("Output pipe read failed: {}", e);
                break;
            }
        }
    }

    (captured, truncated)
}

async fn collect(task: JoinHandle<(Vec<u8>, bool)>) -> (String, bool) {
    match tokio::time::timeout(DRAIN_GRACE, task).await {
        Ok(Ok((bytes, truncated))) => (String::from_utf8_lossy(&bytes).into_owned(), truncated),
        Ok(Err(e)) => {
            warn!("Output reader task failed: {}", e);
            (String::new(), false)
        }
        Err(_) => {
            warn!("Output pipe still open after the process group was killed");
            (String::new(), true)
        }
    }
}
