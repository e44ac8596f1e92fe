//! Sandboxed execution engine
//!
//! Runs a synthesized program's compile/run pipeline once, under one
//! wall-clock limit, and classifies how it ended. Nothing here returns an
//! error: every failure becomes an `ExecutionResult`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::SandboxError;
use crate::languages::LanguageConfig;
use crate::sandbox::{Sandbox, SandboxCommand};

/// Why a run did not produce usable output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    CompileError,
    RuntimeError,
    Timeout,
    SandboxError,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub succeeded: bool,
    /// Captured bytes decoded as UTF-8, invalid sequences replaced with U+FFFD
    pub stdout: String,
    /// Decoded the same way as `stdout`
    pub stderr: String,
    pub failure_reason: Option<FailureReason>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    /// Captured output hit the ceiling
    pub truncated: bool,
    /// Infrastructure failure description
    pub message: Option<String>,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn sandbox_error(error: &SandboxError, elapsed: Duration) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: String::new(),
            failure_reason: Some(FailureReason::SandboxError),
            exit_code: None,
            signal: None,
            truncated: false,
            message: Some(error.to_string()),
            elapsed,
        }
    }
}

/// Fresh, empty, submission-scoped directory. Removed on drop unless kept.
pub struct ScratchDir {
    dir: TempDir,
    keep: bool,
}

impl ScratchDir {
    pub fn create(root: Option<&Path>, keep: bool) -> Result<Self, SandboxError> {
        let root = match root {
            Some(root) => absolute(root),
            None => std::env::temp_dir(),
        };
        std::fs::create_dir_all(&root).map_err(|e| SandboxError::io(&root, e))?;

        let dir = tempfile::Builder::new()
            .prefix("algojudge-")
            .keep(keep)
            .tempdir_in(&root)
            .map_err(|e| SandboxError::io(&root, e))?;

        debug!(path = %dir.path().display(), "Created scratch directory");
        Ok(Self { dir, keep })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.keep {
            info!(path = %self.dir.path().display(), "Keeping scratch directory");
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Run `language`'s pipeline in `workdir`, which already holds the harness
pub async fn execute(
    sandbox: &dyn Sandbox,
    language: &LanguageConfig,
    workdir: &Path,
    timeout: Duration,
) -> ExecutionResult {
    let command = SandboxCommand::new(language.pipeline());
    let started = Instant::now();

    let outcome = match sandbox.run(&command, workdir, timeout).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(backend = sandbox.name(), "Sandbox failure: {}", e);
            return ExecutionResult::sandbox_error(&e, started.elapsed());
        }
    };
    let elapsed = started.elapsed();

    let failure_reason = if outcome.timed_out {
        Some(FailureReason::Timeout)
    } else if outcome.is_success() {
        None
    } else if artifact_missing(language, workdir) {
        Some(FailureReason::CompileError)
    } else {
        Some(FailureReason::RuntimeError)
    };

    if outcome.truncated {
        warn!(backend = sandbox.name(), "Captured output truncated");
    }
    info!(
        backend = sandbox.name(),
        elapsed_ms = elapsed.as_millis() as u64,
        failure = ?failure_reason,
        exit_code = ?outcome.exit_code,
        "Execution finished"
    );

    ExecutionResult {
        succeeded: failure_reason.is_none(),
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        failure_reason,
        exit_code: outcome.exit_code,
        signal: outcome.signal,
        truncated: outcome.truncated,
        message: None,
        elapsed,
    }
}

/// Compiled languages only: no artifact means the compile stage failed
fn artifact_missing(language: &LanguageConfig, workdir: &Path) -> bool {
    match (&language.compile_command, &language.artifact) {
        (Some(_), Some(artifact)) => !workdir.join(artifact).exists(),
        _ => false,
    }
}
