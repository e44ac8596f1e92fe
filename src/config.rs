//! Judge configuration
//!
//! Loaded once from the environment at startup and read-only afterwards.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use tracing::warn;

/// Isolation mechanism used to run synthesized programs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Docker,
    Isolate,
    /// Runs directly on the host. No isolation, development only.
    Local,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "isolate" => Ok(Self::Isolate),
            "local" => Ok(Self::Local),
            other => anyhow::bail!("Unknown sandbox backend: {}", other),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendKind::Docker => "docker",
            BackendKind::Isolate => "isolate",
            BackendKind::Local => "local",
        };
        write!(f, "{}", s)
    }
}

/// Judge configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Wall-clock limit for the whole pipeline (compile + run), in milliseconds
    pub timeout_ms: u64,
    /// Ceiling on captured stdout and stderr, each
    pub max_output_bytes: usize,
    /// Parent directory for per-submission scratch directories
    pub scratch_root: Option<PathBuf>,
    /// Leave scratch directories on disk after judging (debugging)
    pub keep_scratch: bool,
    pub backend: BackendKind,
    /// Execution image shared by every language (docker backend)
    pub image: String,
    pub docker_bin: String,
    /// First isolate box id used by this process
    pub isolate_box_base: u32,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_output_bytes: 1024 * 1024,
            scratch_root: None,
            keep_scratch: false,
            backend: BackendKind::Docker,
            image: "algojudge-runtime:latest".to_string(),
            docker_bin: "docker".to_string(),
            isolate_box_base: 0,
        }
    }
}

impl JudgeConfig {
    /// Load configuration from `JUDGE_*` environment variables, falling back to defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_var("JUDGE_TIMEOUT_MS") {
            config.timeout_ms = v
                .parse()
                .with_context(|| format!("Invalid JUDGE_TIMEOUT_MS: {}", v))?;
        }
        if let Some(v) = env_var("JUDGE_MAX_OUTPUT_BYTES") {
            config.max_output_bytes = v
                .parse()
                .with_context(|| format!("Invalid JUDGE_MAX_OUTPUT_BYTES: {}", v))?;
        }
        if let Some(v) = env_var("JUDGE_SCRATCH_ROOT") {
            config.scratch_root = Some(PathBuf::from(v));
        }
        if let Some(v) = env_var("JUDGE_KEEP_SCRATCH") {
            config.keep_scratch = v == "true" || v == "1";
        }
        if let Some(v) = env_var("JUDGE_BACKEND") {
            config.backend = v.parse()?;
        }
        if let Some(v) = env_var("JUDGE_IMAGE") {
            config.image = v;
        }
        if let Some(v) = env_var("JUDGE_DOCKER_BIN") {
            config.docker_bin = v;
        }
        if let Some(v) = env_var("JUDGE_ISOLATE_BOX_BASE") {
            config.isolate_box_base = v
                .parse()
                .with_context(|| format!("Invalid JUDGE_ISOLATE_BOX_BASE: {}", v))?;
        }

        if config.timeout_ms == 0 {
            anyhow::bail!("JUDGE_TIMEOUT_MS must be positive");
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Global judge configuration
static JUDGE_CONFIG: OnceLock<JudgeConfig> = OnceLock::new();

/// Install the process-wide configuration
pub fn init_config(config: JudgeConfig) -> anyhow::Result<()> {
    JUDGE_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Judge configuration already initialized"))
}

/// Get judge configuration
pub fn get_config() -> &'static JudgeConfig {
    JUDGE_CONFIG.get().unwrap_or_else(|| {
        static DEFAULT: OnceLock<JudgeConfig> = OnceLock::new();

        warn!("Judge configuration not initialized, using default");
        DEFAULT.get_or_init(JudgeConfig::default)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("docker".parse::<BackendKind>().unwrap(), BackendKind::Docker);
        assert_eq!(" Isolate ".parse::<BackendKind>().unwrap(), BackendKind::Isolate);
        assert_eq!("LOCAL".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert!("firecracker".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = JudgeConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.max_output_bytes, 1024 * 1024);
        assert_eq!(config.backend, BackendKind::Docker);
        assert!(!config.keep_scratch);
    }

    #[test]
    fn test_backend_display_round_trips() {
        for kind in [BackendKind::Docker, BackendKind::Isolate, BackendKind::Local] {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }
}
