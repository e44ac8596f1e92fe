//! Judger module: one submission in, one verdict out
//!
//! Lookup and synthesis happen before any sandbox work and fail fast with a
//! `ConfigurationError`. Everything after that is captured into the verdict.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checker;
use crate::config::JudgeConfig;
use crate::core::verdict::{Verdict, VerdictStatus};
use crate::error::ConfigurationError;
use crate::executer::{self, ScratchDir};
use crate::harness;
use crate::languages::LanguageTable;
use crate::problems::ProblemRegistry;
use crate::sandbox::Sandbox;

/// Submission as received from the transport layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub language: String,
    pub problem_id: String,
    pub source: String,
}

/// Judging pipeline over read-only tables and one sandbox backend
pub struct Judge<'a> {
    registry: &'a ProblemRegistry,
    languages: &'a LanguageTable,
    sandbox: Arc<dyn Sandbox>,
    config: JudgeConfig,
}

impl<'a> Judge<'a> {
    pub fn new(
        registry: &'a ProblemRegistry,
        languages: &'a LanguageTable,
        sandbox: Arc<dyn Sandbox>,
        config: JudgeConfig,
    ) -> Self {
        Self {
            registry,
            languages,
            sandbox,
            config,
        }
    }

    pub async fn handle(&self, request: &JudgeRequest) -> Result<Verdict, ConfigurationError> {
        self.judge(&request.language, &request.problem_id, &request.source)
            .await
    }

    pub async fn judge(
        &self,
        language: &str,
        problem_id: &str,
        source: &str,
    ) -> Result<Verdict, ConfigurationError> {
        let started = Instant::now();

        let resolved = self
            .languages
            .resolve(language)
            .ok_or_else(|| ConfigurationError::UnsupportedLanguage(language.to_string()))?;
        let lang_config = self
            .languages
            .get(resolved)
            .ok_or_else(|| ConfigurationError::UnsupportedLanguage(language.to_string()))?;

        let problem = self.registry.get(problem_id)?;
        if problem.tests.is_empty() {
            return Err(ConfigurationError::EmptyCorpus(problem_id.to_string()));
        }
        let expected = self.registry.expected_outputs(problem_id)?;

        let program = harness::synthesize(resolved, lang_config, problem, source)?;
        debug!(
            problem = problem_id,
            language = %resolved,
            tests = problem.tests.len(),
            "Synthesized harness"
        );

        // Lives until scoring is done; removed on every path out of this block
        let result = {
            let scratch = match ScratchDir::create(self.config.scratch_root.as_deref(), self.config.keep_scratch) {
                Ok(scratch) => scratch,
                Err(e) => return Ok(Verdict::failure(VerdictStatus::SandboxError, "", "", Some(e.to_string()))),
            };
            if let Err(e) = program.write_to(scratch.path()) {
                return Ok(Verdict::failure(VerdictStatus::SandboxError, "", "", Some(e.to_string())));
            }

            executer::execute(self.sandbox.as_ref(), lang_config, scratch.path(), self.config.timeout()).await
        };

        let verdict = checker::score(expected, &result);

        info!(
            problem = problem_id,
            language = %resolved,
            backend = self.sandbox.name(),
            status = %verdict.status,
            passed = verdict.passed_count(),
            total = expected.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Judged submission"
        );

        Ok(verdict)
    }
}
