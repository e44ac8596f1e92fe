//! Isolate backend
//!
//! Each run gets its own isolate box: init, copy the scratch directory in, run
//! the pipeline under `--wall-time`, copy produced files back so the executer
//! can look for compile artifacts, clean up.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::meta::{parse_meta, MetaStatus};
use super::{process, Sandbox, SandboxCommand, SandboxOutcome};
use crate::error::SandboxError;

/// Box ids handed out per process, starting at the configured base
const BOX_RANGE: u32 = 1000;
/// Box id used to probe cgroup support
const PROBE_BOX_ID: u32 = 999;
/// Extra wall time granted to isolate itself before we give up on it
const ISOLATE_GRACE: Duration = Duration::from_secs(2);
/// Isolate's own stdout/stderr are small; keep a little for diagnostics
const ISOLATE_OUTPUT_LIMIT: usize = 16 * 1024;

const STDOUT_FILE: &str = ".algojudge.stdout";
const STDERR_FILE: &str = ".algojudge.stderr";

static USE_CGROUPS: OnceLock<bool> = OnceLock::new();

/// Probe once whether isolate can create cgroup-backed boxes
async fn cgroups_available() -> bool {
    if let Some(available) = USE_CGROUPS.get() {
        return *available;
    }

    let probe = PROBE_BOX_ID.to_string();
    let available = Command::new("isolate")
        .args(["--box-id", &probe, "--cg", "--init"])
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false);

    let _ = Command::new("isolate")
        .args(["--box-id", &probe, "--cg", "--cleanup"])
        .output()
        .await;

    info!(available, "Probed isolate cgroup support");
    let _ = USE_CGROUPS.set(available);
    available
}

/// One initialized isolate box
pub struct IsolateBox {
    box_id: u32,
    box_path: PathBuf,
    use_cgroups: bool,
}

impl IsolateBox {
    pub async fn init(box_id: u32, use_cgroups: bool) -> Result<Self, SandboxError> {
        let id = box_id.to_string();

        // a previous crash may have left the box behind
        let _ = Command::new("isolate")
            .args(Self::base_args(&id, use_cgroups))
            .arg("--cleanup")
            .output()
            .await;

        let output = Command::new("isolate")
            .args(Self::base_args(&id, use_cgroups))
            .arg("--init")
            .output()
            .await
            .map_err(|source| SandboxError::Spawn {
                program: "isolate".to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(SandboxError::Unavailable(format!(
                "isolate --init failed for box {}: {}",
                box_id,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let box_path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        debug!(box_id, path = %box_path.display(), use_cgroups, "Initialized isolate box");

        Ok(Self {
            box_id,
            box_path,
            use_cgroups,
        })
    }

    fn base_args(id: &str, use_cgroups: bool) -> Vec<String> {
        let mut args = vec!["--box-id".to_string(), id.to_string()];
        if use_cgroups {
            args.push("--cg".to_string());
        }
        args
    }

    /// Directory the program sees as `/box`
    pub fn work_dir(&self) -> PathBuf {
        self.box_path.join("box")
    }

    pub async fn copy_dir_in(&self, source: &Path) -> Result<(), SandboxError> {
        copy_files(source, &self.work_dir(), |_| true).await
    }

    /// Copy every regular file the run produced back to `dest`
    pub async fn copy_dir_out(&self, dest: &Path) -> Result<(), SandboxError> {
        copy_files(&self.work_dir(), dest, |name| name != STDOUT_FILE && name != STDERR_FILE).await
    }

    fn run_args(&self, script: &str, timeout: Duration, meta_path: &Path) -> Vec<String> {
        let seconds = format!("{:.3}", timeout.as_secs_f64());
        let mut args = Self::base_args(&self.box_id.to_string(), self.use_cgroups);
        if self.use_cgroups {
            args.push("--cg-mem=524288".to_string());
        }
        args.extend([
            format!("--wall-time={}", seconds),
            format!("--meta={}", meta_path.display()),
            format!("--stdout={}", STDOUT_FILE),
            format!("--stderr={}", STDERR_FILE),
            "--processes=64".to_string(),
            "--open-files=256".to_string(),
            "--fsize=262144".to_string(),
            "--dir=/usr".to_string(),
            "--dir=/lib".to_string(),
            "--dir=/lib64:maybe".to_string(),
            "--dir=/etc:noexec".to_string(),
            "--env=PATH=/usr/local/bin:/usr/bin:/bin".to_string(),
            "--env=HOME=/box".to_string(),
            "--run".to_string(),
            "--".to_string(),
            "/bin/sh".to_string(),
            "-c".to_string(),
            script.to_string(),
        ]);
        args
    }

    pub async fn run(
        &self,
        script: &str,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> Result<SandboxOutcome, SandboxError> {
        let meta_path = std::env::temp_dir().join(format!("algojudge-isolate-meta-{}.txt", self.box_id));
        let args = self.run_args(script, timeout, &meta_path);

        let mut cmd = Command::new("isolate");
        cmd.args(&args);
        let invocation = process::run_in_group(cmd, "isolate", timeout + ISOLATE_GRACE, ISOLATE_OUTPUT_LIMIT).await?;

        let meta_content = fs::read_to_string(&meta_path).await;
        let _ = fs::remove_file(&meta_path).await;

        let meta = match meta_content {
            Ok(content) => parse_meta(&content),
            Err(_) if invocation.timed_out => {
                return Ok(SandboxOutcome {
                    timed_out: true,
                    ..Default::default()
                })
            }
            Err(_) => {
                return Err(SandboxError::Unavailable(format!(
                    "isolate produced no meta file: {}",
                    invocation.stderr.trim()
                )))
            }
        };

        if meta.status == MetaStatus::InternalError {
            return Err(SandboxError::Unavailable(
                meta.message.unwrap_or_else(|| "isolate internal error".to_string()),
            ));
        }

        let (stdout, stdout_truncated) = read_capture(&self.work_dir().join(STDOUT_FILE), max_output_bytes).await;
        let (stderr, stderr_truncated) = read_capture(&self.work_dir().join(STDERR_FILE), max_output_bytes).await;

        Ok(SandboxOutcome {
            exit_code: meta.exit_code,
            signal: meta.exit_signal,
            stdout,
            stderr,
            timed_out: meta.status == MetaStatus::TimedOut || invocation.timed_out,
            truncated: stdout_truncated || stderr_truncated,
        })
    }

    pub async fn cleanup(self) {
        let result = Command::new("isolate")
            .args(Self::base_args(&self.box_id.to_string(), self.use_cgroups))
            .arg("--cleanup")
            .output()
            .await;
        match result {
            Ok(o) if o.status.success() => debug!(box_id = self.box_id, "Cleaned up isolate box"),
            Ok(o) => warn!(
                box_id = self.box_id,
                "isolate --cleanup failed: {}",
                String::from_utf8_lossy(&o.stderr).trim()
            ),
            Err(e) => warn!(box_id = self.box_id, "Failed to run isolate --cleanup: {}", e),
        }
    }
}

async fn copy_files(from: &Path, to: &Path, keep: impl Fn(&str) -> bool) -> Result<(), SandboxError> {
    let mut entries = fs::read_dir(from).await.map_err(|e| SandboxError::io(from, e))?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| SandboxError::io(from, e))? {
        let file_type = entry.file_type().await.map_err(|e| SandboxError::io(entry.path(), e))?;
        let name = entry.file_name();
        if !file_type.is_file() || !keep(&name.to_string_lossy()) {
            continue;
        }
        let dest = to.join(&name);
        fs::copy(entry.path(), &dest)
            .await
            .map_err(|e| SandboxError::io(&dest, e))?;
    }
    Ok(())
}

/// Read a capture file, keeping at most `limit` bytes
async fn read_capture(path: &Path, limit: usize) -> (String, bool) {
    match fs::read(path).await {
        Ok(mut bytes) => {
            let truncated = bytes.len() > limit;
            bytes.truncate(limit);
            (String::from_utf8_lossy(&bytes).into_owned(), truncated)
        }
        Err(_) => (String::new(), false),
    }
}

pub struct IsolateSandbox {
    box_base: u32,
    counter: AtomicU32,
    max_output_bytes: usize,
}

impl IsolateSandbox {
    pub fn new(box_base: u32, max_output_bytes: usize) -> Self {
        Self {
            box_base,
            counter: AtomicU32::new(0),
            max_output_bytes,
        }
    }

    /// Next box id in `[box_base, box_base + BOX_RANGE)`, skipping the probe box
    fn next_box_id(&self) -> u32 {
        loop {
            let id = self.box_base + self.counter.fetch_add(1, Ordering::Relaxed) % BOX_RANGE;
            if id != PROBE_BOX_ID {
                return id;
            }
        }
    }
}

#[async_trait]
impl Sandbox for IsolateSandbox {
    fn name(&self) -> &'static str {
        "isolate"
    }

    async fn run(
        &self,
        command: &SandboxCommand,
        workdir: &Path,
        timeout: Duration,
    ) -> Result<SandboxOutcome, SandboxError> {
        let use_cgroups = cgroups_available().await;
        let isolate_box = IsolateBox::init(self.next_box_id(), use_cgroups).await?;

        let result = async {
            isolate_box.copy_dir_in(workdir).await?;
            let outcome = isolate_box
                .run(&command.shell_script(), timeout, self.max_output_bytes)
                .await?;
            isolate_box.copy_dir_out(workdir).await?;
            Ok::<_, SandboxError>(outcome)
        }
        .await;

        isolate_box.cleanup().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_ids_stay_in_range() {
        let sandbox = IsolateSandbox::new(2000, 1024);
        let ids: Vec<u32> = (0..2500).map(|_| sandbox.next_box_id()).collect();
        assert!(ids.iter().all(|id| (2000..3000).contains(id)));
        assert_eq!(ids[0], 2000);
        assert_eq!(ids[1000], 2000);
    }

    #[test]
    fn test_probe_box_is_skipped() {
        let sandbox = IsolateSandbox::new(0, 1024);
        let ids: Vec<u32> = (0..1000).map(|_| sandbox.next_box_id()).collect();
        assert!(!ids.contains(&PROBE_BOX_ID));
    }

    #[test]
    fn test_run_args() {
        let isolate_box = IsolateBox {
            box_id: 7,
            box_path: PathBuf::from("/var/local/lib/isolate/7"),
            use_cgroups: true,
        };
        let args = isolate_box.run_args("python3 main.py", Duration::from_millis(2500), Path::new("/tmp/meta.txt"));

        assert_eq!(&args[..3], &["--box-id", "7", "--cg"]);
        assert!(args.contains(&"--wall-time=2.500".to_string()));
        // CPU time is not limited, only the wall clock
        assert!(!args.iter().any(|a| a.starts_with("--time=") || a.starts_with("--extra-time=")));
        assert!(args.contains(&"--meta=/tmp/meta.txt".to_string()));
        assert_eq!(&args[args.len() - 3..], &["/bin/sh", "-c", "python3 main.py"]);
        assert_eq!(isolate_box.work_dir(), PathBuf::from("/var/local/lib/isolate/7/box"));
    }

    #[tokio::test]
    async fn test_copy_files_skips_captures() {
        let from = tempfile::tempdir().unwrap();
        let to = tempfile::tempdir().unwrap();
        std::fs::write(from.path().join("Main.class"), "x").unwrap();
        std::fs::write(from.path().join(STDOUT_FILE), "[1]").unwrap();
        std::fs::create_dir(from.path().join("nested")).unwrap();

        copy_files(from.path(), to.path(), |name| name != STDOUT_FILE)
            .await
            .unwrap();

        assert!(to.path().join("Main.class").exists());
        assert!(!to.path().join(STDOUT_FILE).exists());
        assert!(!to.path().join("nested").exists());
    }

    #[tokio::test]
    async fn test_read_capture_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out");
        std::fs::write(&path, "abcdef").unwrap();

        assert_eq!(read_capture(&path, 4).await, ("abcd".to_string(), true));
        assert_eq!(read_capture(&path, 10).await, ("abcdef".to_string(), false));
        assert_eq!(read_capture(&dir.path().join("missing"), 4).await, (String::new(), false));
    }

    #[tokio::test]
    #[ignore = "requires isolate installed with root privileges"]
    async fn test_runs_in_box() {
        let sandbox = IsolateSandbox::new(500, 1024);
        let dir = tempfile::tempdir().unwrap();
        let command = SandboxCommand::new(vec![vec!["sh".into(), "-c".into(), "echo ok; touch built".into()]]);

        let outcome = sandbox.run(&command, dir.path(), Duration::from_secs(5)).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.stdout.trim(), "ok");
        assert!(dir.path().join("built").exists());
    }
}
