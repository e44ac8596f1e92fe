//! Sandbox module - isolation collaborator
//!
//! A sandbox runs one shell pipeline inside a scratch directory under a single
//! wall-clock timeout and reports what happened. It does NOT:
//! - Know about languages, artifacts or harnesses
//! - Interpret exit codes as compile/runtime errors (the executer does)
//! - Retry anything

pub mod docker;
pub mod isolate_box;
pub mod local;
pub mod meta;
pub mod process;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{BackendKind, JudgeConfig};
use crate::error::SandboxError;

pub use docker::DockerSandbox;
pub use isolate_box::IsolateSandbox;
pub use local::LocalSandbox;

/// Ordered stages run as `stage1 && stage2 && ...` under one timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxCommand {
    pub stages: Vec<Vec<String>>,
}

impl SandboxCommand {
    pub fn new(stages: Vec<Vec<String>>) -> Self {
        Self { stages }
    }

    /// Render as a POSIX shell script for `sh -c`
    pub fn shell_script(&self) -> String {
        self.stages
            .iter()
            .map(|stage| stage.iter().map(|arg| shell_quote(arg)).collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | '+' | ':' | ','));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r#"'\''"#))
    }
}

/// Raw outcome of one sandboxed run (no verdict interpretation)
#[derive(Debug, Clone, Default)]
pub struct SandboxOutcome {
    /// Exit code, if the pipeline exited on its own
    pub exit_code: Option<i32>,
    /// Terminating signal, if any
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// Output exceeded the capture ceiling and was cut
    pub truncated: bool,
}

impl SandboxOutcome {
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.signal.is_none() && self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run `command` with `workdir` bound as the only writable directory
    async fn run(
        &self,
        command: &SandboxCommand,
        workdir: &Path,
        timeout: Duration,
    ) -> Result<SandboxOutcome, SandboxError>;
}

/// Build the backend selected by `config`
pub fn from_config(config: &JudgeConfig) -> Arc<dyn Sandbox> {
    match config.backend {
        BackendKind::Docker => Arc::new(DockerSandbox::new(
            config.docker_bin.clone(),
            config.image.clone(),
            config.max_output_bytes,
        )),
        BackendKind::Isolate => Arc::new(IsolateSandbox::new(
            config.isolate_box_base,
            config.max_output_bytes,
        )),
        BackendKind::Local => Arc::new(LocalSandbox::new(config.max_output_bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(stages: &[&[&str]]) -> SandboxCommand {
        SandboxCommand::new(
            stages
                .iter()
                .map(|s| s.iter().map(|a| a.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_shell_script_joins_stages() {
        let cmd = stages(&[&["g++", "-O2", "-o", "main", "main.cpp"], &["./main"]]);
        assert_eq!(cmd.shell_script(), "g++ -O2 -o main main.cpp && ./main");
    }

    #[test]
    fn test_shell_quoting() {
        assert_eq!(shell_quote("main.py"), "main.py");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r#"'it'\''s'"#);
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    }

    #[test]
    fn test_outcome_success() {
        let ok = SandboxOutcome {
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(ok.is_success());

        let timed_out = SandboxOutcome {
            exit_code: Some(0),
            timed_out: true,
            ..Default::default()
        };
        assert!(!timed_out.is_success());
        assert!(!SandboxOutcome::default().is_success());
    }

    #[test]
    fn test_backend_selection() {
        let mut config = JudgeConfig::default();
        assert_eq!(from_config(&config).name(), "docker");
        config.backend = BackendKind::Isolate;
        assert_eq!(from_config(&config).name(), "isolate");
        config.backend = BackendKind::Local;
        assert_eq!(from_config(&config).name(), "local");
    }
}
