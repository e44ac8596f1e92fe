//! Problem registry and reference oracles
//!
//! Problems and their test corpora are loaded once at startup and never
//! mutated afterwards, so concurrent requests read them without locking.
//! Expected outputs are computed by the problem's oracle on first use and
//! cached for the lifetime of the registry.

pub mod oracle;
pub mod shape;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ConfigurationError, RegistryError};
use oracle::OracleFn;
pub use shape::{ArgValue, Param, ParamType, ProblemShape, RecordType};

const BUILTIN_PROBLEMS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/problems.toml"));

/// One test case: the ordered arguments passed to the entry point
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestCase {
    pub args: Vec<Value>,
}

/// A canonical problem. Immutable once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct Problem {
    pub id: String,
    /// Function/method name the submission must expose
    pub entry_point: String,
    pub shape: ProblemShape,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
struct ProblemsFile {
    #[serde(default)]
    problems: Vec<Problem>,
}

struct Entry {
    problem: Problem,
    oracle: OracleFn,
    expected: OnceLock<Vec<Value>>,
}

/// Read-only registry of problems with their oracles
pub struct ProblemRegistry {
    entries: HashMap<String, Entry>,
    /// Ids in definition order, for listings
    order: Vec<String>,
}

impl ProblemRegistry {
    /// Parse and validate problem definitions.
    ///
    /// Every problem needs an oracle, a non-empty corpus, and arguments that
    /// fit its shape; the oracle must accept every test case.
    pub fn from_toml_str(content: &str) -> Result<Self, RegistryError> {
        let file: ProblemsFile = toml::from_str(content)?;
        Self::from_problems(file.problems)
    }

    pub fn from_problems(problems: Vec<Problem>) -> Result<Self, RegistryError> {
        let mut entries = HashMap::new();
        let mut order = Vec::new();

        for problem in problems {
            if entries.contains_key(&problem.id) {
                return Err(RegistryError::Duplicate(problem.id));
            }
            let oracle = oracle::lookup(&problem.id)
                .ok_or_else(|| RegistryError::MissingOracle(problem.id.clone()))?;
            if problem.tests.is_empty() {
                return Err(RegistryError::EmptyCorpus(problem.id));
            }

            let mut expected = Vec::with_capacity(problem.tests.len());
            for (index, test) in problem.tests.iter().enumerate() {
                problem.shape.decode_args(&problem.id, index, &test.args)?;
                let value = oracle(&test.args).map_err(|reason| RegistryError::Oracle {
                    problem: problem.id.clone(),
                    index,
                    reason,
                })?;
                expected.push(value);
            }

            debug!(
                problem = %problem.id,
                tests = problem.tests.len(),
                "Registered problem"
            );

            order.push(problem.id.clone());
            let cache = OnceLock::new();
            let _ = cache.set(expected);
            entries.insert(
                problem.id.clone(),
                Entry {
                    problem,
                    oracle,
                    expected: cache,
                },
            );
        }

        Ok(Self { entries, order })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid problem definitions in {}", path.display()))
    }

    /// Problems shipped with the crate
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml_str(BUILTIN_PROBLEMS)
    }

    /// Registry with no validation, for exercising misconfiguration paths
    #[cfg(test)]
    pub(crate) fn unchecked(problems: Vec<Problem>) -> Self {
        let mut entries = HashMap::new();
        let mut order = Vec::new();
        for problem in problems {
            let oracle = oracle::lookup(&problem.id).unwrap_or(|_| Ok(Value::Null));
            order.push(problem.id.clone());
            entries.insert(
                problem.id.clone(),
                Entry {
                    problem,
                    oracle,
                    expected: OnceLock::new(),
                },
            );
        }
        Self { entries, order }
    }

    pub fn get(&self, id: &str) -> Result<&Problem, ConfigurationError> {
        self.entries
            .get(id)
            .map(|entry| &entry.problem)
            .ok_or_else(|| ConfigurationError::UnknownProblem(id.to_string()))
    }

    /// Expected outputs in corpus order, one per test case
    pub fn expected_outputs(&self, id: &str) -> Result<&[Value], ConfigurationError> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| ConfigurationError::UnknownProblem(id.to_string()))?;

        let expected = entry.expected.get_or_init(|| {
            entry
                .problem
                .tests
                .iter()
                .enumerate()
                .map(|(index, test)| {
                    (entry.oracle)(&test.args).unwrap_or_else(|reason| {
                        warn!(problem = %id, index, %reason, "Oracle rejected test case");
                        Value::Null
                    })
                })
                .collect()
        });

        Ok(expected)
    }

    pub fn problems(&self) -> impl Iterator<Item = &Problem> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| &entry.problem))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Global problem registry
static PROBLEMS: OnceLock<ProblemRegistry> = OnceLock::new();

/// Initialize the process-wide registry, from `path` or the built-in corpus
pub fn init_problems(path: Option<&Path>) -> anyhow::Result<&'static ProblemRegistry> {
    let loaded = match path {
        Some(path) => ProblemRegistry::load(path)?,
        None => ProblemRegistry::builtin().context("Invalid built-in problem definitions")?,
    };

    PROBLEMS
        .set(loaded)
        .map_err(|_| anyhow::anyhow!("Problems already initialized"))?;

    registry().ok_or_else(|| anyhow::anyhow!("Problems not initialized"))
}

/// Process-wide registry, if initialized
pub fn registry() -> Option<&'static ProblemRegistry> {
    PROBLEMS.get()
}
