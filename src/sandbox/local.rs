//! Local backend
//!
//! Runs the pipeline directly on the host inside the scratch directory.
//! There is no filesystem or network isolation, so this is for development
//! machines only.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{process, Sandbox, SandboxCommand, SandboxOutcome};
use crate::error::SandboxError;

const DEFAULT_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

pub struct LocalSandbox {
    max_output_bytes: usize,
}

impl LocalSandbox {
    pub fn new(max_output_bytes: usize) -> Self {
        warn!("Local sandbox selected: submissions run on the host without isolation");
        Self { max_output_bytes }
    }
}

#[async_trait]
impl Sandbox for LocalSandbox {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn run(
        &self,
        command: &SandboxCommand,
        workdir: &Path,
        timeout: Duration,
    ) -> Result<SandboxOutcome, SandboxError> {
        let script = command.shell_script();
        debug!(workdir = %workdir.display(), %script, "Running pipeline on host");

        let path = std::env::var_os("PATH").unwrap_or_else(|| DEFAULT_PATH.into());
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&script)
            .current_dir(workdir)
            .env_clear()
            .env("PATH", path)
            .env("HOME", workdir);

        process::run_in_group(cmd, "sh", timeout, self.max_output_bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(stages: &[&str]) -> SandboxCommand {
        SandboxCommand::new(
            stages
                .iter()
                .map(|s| vec!["sh".to_string(), "-c".to_string(), s.to_string()])
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_runs_in_workdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("input.txt"), "42").unwrap();

        let sandbox = LocalSandbox::new(1024);
        let outcome = sandbox
            .run(&script(&["cat input.txt", "touch built"]), dir.path(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.stdout, "42");
        assert!(dir.path().join("built").exists());
    }

    #[tokio::test]
    async fn test_failed_stage_stops_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = LocalSandbox::new(1024);
        let outcome = sandbox
            .run(&script(&["exit 1", "touch built"]), dir.path(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, Some(1));
        assert!(!dir.path().join("built").exists());
    }

    #[tokio::test]
    async fn test_timeout_spans_all_stages() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = LocalSandbox::new(1024);
        // each stage alone fits, together they do not
        let outcome = sandbox
            .run(&script(&["sleep 0.4", "sleep 0.4"]), dir.path(), Duration::from_millis(600))
            .await
            .unwrap();

        assert!(outcome.timed_out);
    }
}
