//! Harness synthesizer
//!
//! Wraps untrusted user source in a generated driver that calls the problem's
//! entry point once per test case, in corpus order, and prints exactly one
//! line to stdout: a JSON array whose i-th element is the i-th result, or a
//! string starting with [`ERROR_SENTINEL`] when that call raised.
//!
//! User code is never inspected here. If it cannot be combined with the
//! driver, that shows up later as a compile or runtime failure.

pub mod cpp;
pub mod dynamic;
pub mod java;

use std::fs;
use std::path::Path;

use crate::error::{SandboxError, SynthesisError};
use crate::languages::{Language, LanguageConfig};
use crate::problems::{ArgValue, Problem, ProblemShape};

/// Prefix marking a per-test failure caught by the driver
pub const ERROR_SENTINEL: &str = "__ERROR__:";

/// Interpreters that take the corpus as a generic JSON blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicRuntime {
    Node,
    Python,
}

/// Compilers that need per-test typed construction code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticToolchain {
    Cpp,
    Java,
}

/// Synthesis strategy for a (language, shape) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Harness {
    Dynamic(DynamicRuntime),
    Static(StaticToolchain, ProblemShape),
}

impl Harness {
    /// Single extension point: a new language or shape is added here and the
    /// compiler points at every template that has to learn about it.
    pub fn select(language: Language, shape: ProblemShape) -> Self {
        match language {
            Language::JavaScript => Harness::Dynamic(DynamicRuntime::Node),
            Language::Python => Harness::Dynamic(DynamicRuntime::Python),
            Language::Cpp => Harness::Static(StaticToolchain::Cpp, shape),
            Language::Java => Harness::Static(StaticToolchain::Java, shape),
        }
    }
}

/// One generated source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub contents: String,
}

/// Files to place in a fresh scratch directory before execution
#[derive(Debug, Clone)]
pub struct SynthesizedProgram {
    pub language: Language,
    pub files: Vec<SourceFile>,
}

impl SynthesizedProgram {
    pub fn write_to(&self, dir: &Path) -> Result<(), SandboxError> {
        for file in &self.files {
            let path = dir.join(&file.name);
            fs::write(&path, &file.contents).map_err(|e| SandboxError::io(&path, e))?;
        }
        Ok(())
    }
}

/// Build the driver program for `problem` around `source`
pub fn synthesize(
    language: Language,
    lang_config: &LanguageConfig,
    problem: &Problem,
    source: &str,
) -> Result<SynthesizedProgram, SynthesisError> {
    let contents = match Harness::select(language, problem.shape) {
        Harness::Dynamic(runtime) => {
            let corpus: Vec<&Vec<serde_json::Value>> = problem.tests.iter().map(|t| &t.args).collect();
            let corpus_json = serde_json::to_string(&corpus)?;
            match runtime {
                DynamicRuntime::Node => dynamic::render_node(&problem.entry_point, &corpus_json, source),
                DynamicRuntime::Python => dynamic::render_python(&problem.entry_point, &corpus_json, source),
            }
        }
        Harness::Static(toolchain, shape) => {
            let cases = decode_corpus(problem, shape)?;
            match toolchain {
                StaticToolchain::Cpp => cpp::render(problem, shape, &cases, source),
                StaticToolchain::Java => {
                    let class_name = Path::new(&lang_config.source_file)
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("Main");
                    java::render(problem, shape, &cases, source, class_name)
                }
            }
        }
    };

    Ok(SynthesizedProgram {
        language,
        files: vec![SourceFile {
            name: lang_config.source_file.clone(),
            contents,
        }],
    })
}

fn decode_corpus(problem: &Problem, shape: ProblemShape) -> Result<Vec<Vec<ArgValue>>, SynthesisError> {
    problem
        .tests
        .iter()
        .enumerate()
        .map(|(index, test)| shape.decode_args(&problem.id, index, &test.args))
        .collect()
}

/// Declaration a submission must provide, for display to the learner
pub fn signature(language: Language, problem: &Problem) -> String {
    let params = problem.shape.params();
    let entry = &problem.entry_point;
    match language {
        Language::JavaScript => {
            let names: Vec<&str> = params.iter().map(|p| p.name).collect();
            format!("function {}({})", entry, names.join(", "))
        }
        Language::Python => {
            let names: Vec<&str> = params.iter().map(|p| p.name).collect();
            format!("def {}({}):", entry, names.join(", "))
        }
        Language::Cpp => cpp::signature(entry, problem.shape),
        Language::Java => java::signature(entry, problem.shape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::LanguageTable;
    use crate::problems::{ProblemRegistry, TestCase};
    use serde_json::json;

    #[test]
    fn test_select_strategy() {
        for shape in [ProblemShape::Knapsack, ProblemShape::Intervals] {
            assert_eq!(
                Harness::select(Language::JavaScript, shape),
                Harness::Dynamic(DynamicRuntime::Node)
            );
            assert_eq!(
                Harness::select(Language::Python, shape),
                Harness::Dynamic(DynamicRuntime::Python)
            );
            assert_eq!(
                Harness::select(Language::Cpp, shape),
                Harness::Static(StaticToolchain::Cpp, shape)
            );
            assert_eq!(
                Harness::select(Language::Java, shape),
                Harness::Static(StaticToolchain::Java, shape)
            );
        }
    }

    #[test]
    fn test_every_problem_synthesizes_for_every_language() {
        let registry = ProblemRegistry::builtin().unwrap();
        let table = LanguageTable::builtin().unwrap();

        for problem in registry.problems() {
            for language in Language::ALL {
                let config = table.get(language).unwrap();
                let program = synthesize(language, config, problem, "// user code").unwrap();
                assert_eq!(program.files.len(), 1);
                assert_eq!(program.files[0].name, config.source_file);
                assert!(program.files[0].contents.contains("// user code"));
                assert!(
                    program.files[0].contents.contains(&problem.entry_point),
                    "{} / {}",
                    problem.id,
                    language
                );
            }
        }
    }

    #[test]
    fn test_static_synthesis_rejects_malformed_corpus() {
        let problem = Problem {
            id: "coin-change".to_string(),
            entry_point: "coinChange".to_string(),
            shape: ProblemShape::CoinChange,
            description: None,
            tests: vec![TestCase {
                args: vec![json!("1,2,5"), json!(11)],
            }],
        };
        let table = LanguageTable::builtin().unwrap();

        let err = synthesize(Language::Cpp, table.get(Language::Cpp).unwrap(), &problem, "").unwrap_err();
        assert!(matches!(err, SynthesisError::ArgumentMismatch { ref param, .. } if param == "coins"));

        // dynamic harnesses embed the corpus verbatim and never look at its shape
        assert!(synthesize(Language::Python, table.get(Language::Python).unwrap(), &problem, "").is_ok());
    }

    #[test]
    fn test_write_to_scratch_dir() {
        let registry = ProblemRegistry::builtin().unwrap();
        let table = LanguageTable::builtin().unwrap();
        let problem = registry.get("coin-change").unwrap();
        let program = synthesize(Language::Java, table.get(Language::Java).unwrap(), problem, "").unwrap();

        let dir = tempfile::tempdir().unwrap();
        program.write_to(dir.path()).unwrap();
        let written = std::fs::read_to_string(dir.path().join("Main.java")).unwrap();
        assert!(written.contains("public class Main"));
    }

    #[test]
    fn test_signatures() {
        let registry = ProblemRegistry::builtin().unwrap();
        let knapsack = registry.get("knapsack").unwrap();

        assert_eq!(
            signature(Language::JavaScript, knapsack),
            "function knapsack(items, capacity)"
        );
        assert_eq!(signature(Language::Python, knapsack), "def knapsack(items, capacity):");
        assert_eq!(
            signature(Language::Cpp, knapsack),
            "int knapsack(vector<Item>& items, int capacity)"
        );
        assert_eq!(
            signature(Language::Java, knapsack),
            "class Solution { public int knapsack(Item[] items, int capacity) }"
        );
    }
}
