use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::executer::FailureReason;

/// Top-level outcome of judging a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// The run completed and every test has a per-test result
    Judged,
    CompileError,
    RuntimeError,
    Timeout,
    SandboxError,
    /// Stdout was not the harness's one-line result array
    OutputParseError,
}

impl From<FailureReason> for VerdictStatus {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::CompileError => VerdictStatus::CompileError,
            FailureReason::RuntimeError => VerdictStatus::RuntimeError,
            FailureReason::Timeout => VerdictStatus::Timeout,
            FailureReason::SandboxError => VerdictStatus::SandboxError,
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerdictStatus::Judged => "judged",
            VerdictStatus::CompileError => "compile_error",
            VerdictStatus::RuntimeError => "runtime_error",
            VerdictStatus::Timeout => "timeout",
            VerdictStatus::SandboxError => "sandbox_error",
            VerdictStatus::OutputParseError => "output_parse_error",
        };
        write!(f, "{}", s)
    }
}

/// Result of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestVerdict {
    pub index: usize,
    pub expected: Value,
    /// `None` when the entry point raised
    pub got: Option<Value>,
    pub passed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub all_passed: bool,
    /// Empty unless `status` is `Judged`
    pub tests: Vec<TestVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Verdict {
    pub fn judged(tests: Vec<TestVerdict>) -> Self {
        Self {
            status: VerdictStatus::Judged,
            all_passed: tests.iter().all(|t| t.passed),
            tests,
            stdout: None,
            stderr: None,
            message: None,
        }
    }

    /// A run that could not be judged at all
    pub fn failure(
        status: VerdictStatus,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        message: Option<String>,
    ) -> Self {
        Self {
            status,
            all_passed: false,
            tests: Vec::new(),
            stdout: Some(stdout.into()),
            stderr: Some(stderr.into()),
            message,
        }
    }

    pub fn passed_count(&self) -> usize {
        self.tests.iter().filter(|t| t.passed).count()
    }
}
