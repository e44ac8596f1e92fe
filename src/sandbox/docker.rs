//! Docker backend
//!
//! One throwaway container per submission from the shared runtime image. The
//! scratch directory is the only host path mounted, networking is off, and
//! the container is force-removed if the time limit hits.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{process, Sandbox, SandboxCommand, SandboxOutcome};
use crate::error::SandboxError;

const CONTAINER_WORKDIR: &str = "/sandbox";
const MEMORY_LIMIT: &str = "512m";
const PIDS_LIMIT: &str = "256";
/// `docker run` itself failed (daemon down, image missing, bad flags)
const DOCKER_RUN_FAILED: i32 = 125;
/// Upper bound on `docker rm -f` after a timeout
const REMOVE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DockerSandbox {
    docker_bin: String,
    image: String,
    max_output_bytes: usize,
}

impl DockerSandbox {
    pub fn new(docker_bin: String, image: String, max_output_bytes: usize) -> Self {
        Self {
            docker_bin,
            image,
            max_output_bytes,
        }
    }

    /// Container name derived from the scratch directory, unique per submission
    fn container_name(workdir: &Path) -> String {
        let suffix: String = workdir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        format!("algojudge-{}", suffix.trim_matches('-'))
    }

    fn run_args(&self, name: &str, workdir: &Path, command: &SandboxCommand) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--network".to_string(),
            "none".to_string(),
            "--memory".to_string(),
            MEMORY_LIMIT.to_string(),
            "--pids-limit".to_string(),
            PIDS_LIMIT.to_string(),
            "--read-only".to_string(),
            "--tmpfs".to_string(),
            "/tmp:rw,size=64m".to_string(),
            "-v".to_string(),
            format!("{}:{}", workdir.display(), CONTAINER_WORKDIR),
            "-w".to_string(),
            CONTAINER_WORKDIR.to_string(),
            self.image.clone(),
            "sh".to_string(),
            "-c".to_string(),
            command.shell_script(),
        ]
    }

    async fn remove_container(&self, name: &str, limit: Duration) {
        let mut cmd = Command::new(&self.docker_bin);
        cmd.args(["rm", "-f", name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(limit, cmd.status()).await {
            Ok(Ok(status)) if status.success() => debug!(container = name, "Removed timed-out container"),
            Ok(Ok(status)) => warn!(container = name, "docker rm -f exited with {}", status),
            Ok(Err(e)) => warn!(container = name, "Failed to run docker rm -f: {}", e),
            Err(_) => warn!(
                container = name,
                limit_ms = limit.as_millis() as u64,
                "docker rm -f did not finish, leaving container behind"
            ),
        }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn run(
        &self,
        command: &SandboxCommand,
        workdir: &Path,
        timeout: Duration,
    ) -> Result<SandboxOutcome, SandboxError> {
        let name = Self::container_name(workdir);
        let args = self.run_args(&name, workdir, command);
        debug!(container = %name, image = %self.image, "Starting container");

        let mut cmd = Command::new(&self.docker_bin);
        cmd.args(&args);
        let outcome = process::run_in_group(cmd, &self.docker_bin, timeout, self.max_output_bytes).await?;

        // killing the client does not stop the container
        if outcome.timed_out {
            self.remove_container(&name, REMOVE_TIMEOUT).await;
        }

        if outcome.exit_code == Some(DOCKER_RUN_FAILED) {
            return Err(SandboxError::Unavailable(format!(
                "docker run failed: {}",
                outcome.stderr.trim()
            )));
        }

        Ok(outcome)
    }
}
