//! Language configuration for compilation and execution

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

const BUILTIN_LANGUAGES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));

/// Submission languages understood by the judge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    Python,
    Cpp,
    Java,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::JavaScript,
        Language::Python,
        Language::Cpp,
        Language::Java,
    ];

    /// Canonical name, also the section name in `languages.toml`
    pub fn name(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }

    fn from_canonical(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.name() == name)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Configuration for a supported programming language
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Name of the source file the harness is written to (e.g., "main.cpp")
    pub source_file: String,
    /// Compile command (None for interpreted languages)
    pub compile_command: Option<Vec<String>>,
    /// Run command
    pub run_command: Vec<String>,
    /// File produced by a successful compile. Its presence after a failed run
    /// means the failure happened at runtime.
    pub artifact: Option<String>,
}

impl LanguageConfig {
    /// Ordered stages executed under one timeout
    pub fn pipeline(&self) -> Vec<Vec<String>> {
        let mut stages = Vec::with_capacity(2);
        if let Some(compile) = &self.compile_command {
            stages.push(compile.clone());
        }
        stages.push(self.run_command.clone());
        stages
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    source_file: String,
    compile_command: Option<String>,
    run_command: String,
    artifact: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Language table: canonical configs plus alias resolution
#[derive(Debug, Clone)]
pub struct LanguageTable {
    configs: HashMap<Language, LanguageConfig>,
    aliases: HashMap<String, Language>,
}

impl LanguageTable {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> =
            toml::from_str(content).context("Failed to parse language configuration")?;

        let mut configs = HashMap::new();
        let mut aliases = HashMap::new();

        for (name, raw) in raw_configs {
            let language = Language::from_canonical(&name.to_lowercase())
                .ok_or_else(|| anyhow::anyhow!("Unknown language section: {}", name))?;

            let run_command = into_command(&raw.run_command);
            if run_command.is_empty() {
                anyhow::bail!("Empty run command for {}", name);
            }
            if raw.compile_command.is_some() && raw.artifact.is_none() {
                anyhow::bail!("Compiled language {} must declare an artifact", name);
            }

            let config = LanguageConfig {
                source_file: raw.source_file,
                compile_command: raw.compile_command.map(|cmd| into_command(&cmd)),
                run_command,
                artifact: raw.artifact,
            };

            // Add main language name
            aliases.insert(language.name().to_string(), language);

            // Add aliases
            for alias in raw.aliases {
                aliases.insert(alias.to_lowercase(), language);
            }

            configs.insert(language, config);
        }

        Ok(Self { configs, aliases })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Configuration shipped with the crate
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml_str(BUILTIN_LANGUAGES)
    }

    /// Resolve a user-supplied language name or alias
    pub fn resolve(&self, name: &str) -> Option<Language> {
        self.aliases.get(&name.trim().to_lowercase()).copied()
    }

    pub fn get(&self, language: Language) -> Option<&LanguageConfig> {
        self.configs.get(&language)
    }

    /// Get all supported language names
    pub fn supported(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|l| self.configs.contains_key(l))
            .collect()
    }
}

/// Global language configurations
static LANGUAGES: OnceLock<LanguageTable> = OnceLock::new();

/// Initialize language configurations, from `path` or the built-in file
pub fn init_languages(path: Option<&Path>) -> anyhow::Result<&'static LanguageTable> {
    let table = match path {
        Some(path) => LanguageTable::load(path)?,
        None => LanguageTable::builtin()?,
    };

    LANGUAGES
        .set(table)
        .map_err(|_| anyhow::anyhow!("Languages already initialized"))?;

    Ok(languages())
}

/// Process-wide language table
pub fn languages() -> &'static LanguageTable {
    LANGUAGES.get_or_init(|| {
        warn!("Languages not initialized, using built-in configuration");
        LanguageTable::builtin().unwrap_or_else(|e| {
            warn!("Built-in language configuration is invalid: {:#}", e);
            LanguageTable {
                configs: HashMap::new(),
                aliases: HashMap::new(),
            }
        })
    })
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[cpp]
source_file = "main.cpp"
compile_command = "g++ -o main main.cpp"
run_command = "./main"
artifact = "main"

[python]
source_file = "main.py"
run_command = "python3 main.py"
aliases = ["py", "Python3"]
"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_load_languages() {
        let config_file = create_test_config();
        let table = LanguageTable::load(config_file.path()).unwrap();

        assert_eq!(table.resolve("py"), Some(Language::Python));
        assert_eq!(table.resolve("PYTHON3"), Some(Language::Python));
        assert_eq!(table.resolve("cpp"), Some(Language::Cpp));
        assert_eq!(table.resolve("java"), None);
        assert_eq!(table.supported(), vec![Language::Python, Language::Cpp]);
    }

    #[test]
    fn test_builtin_covers_all_languages() {
        let table = LanguageTable::builtin().unwrap();
        assert_eq!(table.supported(), Language::ALL.to_vec());

        for (alias, expected) in [
            ("js", Language::JavaScript),
            ("node", Language::JavaScript),
            ("py", Language::Python),
            ("c++", Language::Cpp),
            ("Java", Language::Java),
        ] {
            assert_eq!(table.resolve(alias), Some(expected), "alias {}", alias);
        }
        assert_eq!(table.resolve("ruby"), None);
    }

    #[test]
    fn test_pipeline_order() {
        let table = LanguageTable::builtin().unwrap();

        let cpp = table.get(Language::Cpp).unwrap();
        let stages = cpp.pipeline();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0][0], "g++");
        assert_eq!(stages[1], vec!["./main".to_string()]);
        assert_eq!(cpp.artifact.as_deref(), Some("main"));

        let py = table.get(Language::Python).unwrap();
        assert_eq!(py.pipeline(), vec![vec!["python3".to_string(), "main.py".to_string()]]);
        assert!(py.artifact.is_none());
    }

    #[test]
    fn test_compiled_language_requires_artifact() {
        let content = r#"
[java]
source_file = "Main.java"
compile_command = "javac Main.java"
run_command = "java Main"
"#;
        assert!(LanguageTable::from_toml_str(content).is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let content = r#"
[ruby]
source_file = "main.rb"
run_command = "ruby main.rb"
"#;
        assert!(LanguageTable::from_toml_str(content).is_err());
    }
}
