//! Error taxonomy for the judging path
//!
//! Lookup and synthesis failures are preconditions: they stop a request before
//! any sandbox work. Execution and parse failures are not errors at all, they
//! are captured into `ExecutionResult` / `Verdict` values.

use std::path::PathBuf;

use thiserror::Error;

/// Rejections returned to the transport layer instead of a verdict
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown problem: {0}")]
    UnknownProblem(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A registered problem has no test cases. Judging it would report a
    /// vacuous pass, so it is refused.
    #[error("problem {0} has an empty test corpus")]
    EmptyCorpus(String),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

/// Harness generation failures. Always a server-side defect, never user-caused.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("failed to encode test corpus: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("test {index} of {problem}: argument {param} does not fit its declared type: {reason}")]
    ArgumentMismatch {
        problem: String,
        index: usize,
        param: String,
        reason: String,
    },

    #[error("test {index} of {problem}: expected {expected} arguments, found {found}")]
    Arity {
        problem: String,
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Infrastructure failures of the isolation mechanism itself
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sandbox I/O failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sandbox unavailable: {0}")]
    Unavailable(String),
}

impl SandboxError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Problem corpus or oracle misconfiguration detected while loading the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to parse problem definitions: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate problem id: {0}")]
    Duplicate(String),

    #[error("no reference oracle registered for problem {0}")]
    MissingOracle(String),

    #[error("problem {0} has an empty test corpus")]
    EmptyCorpus(String),

    #[error("oracle for {problem} rejected test {index}: {reason}")]
    Oracle {
        problem: String,
        index: usize,
        reason: String,
    },

    #[error(transparent)]
    Shape(#[from] SynthesisError),
}
