use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use algojudge::config::{self, JudgeConfig};
use algojudge::harness;
use algojudge::languages;
use algojudge::problems;
use algojudge::sandbox;
use algojudge::Judge;

/// Exit code for requests rejected before judging
const EXIT_CONFIGURATION: u8 = 2;

#[derive(Parser)]
#[command(name = "algojudge")]
#[command(about = "Judge algorithm submissions in JavaScript, Python, C++ and Java", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge a source file against a problem's test corpus
    Judge {
        /// Submission language (e.g., js, python, cpp, java)
        #[arg(short, long)]
        language: String,

        /// Problem id (e.g., coin-change)
        #[arg(short, long)]
        problem: String,

        /// Path to the submission source
        source: PathBuf,
    },

    /// List registered problems
    Problems {
        /// Also show the declaration a submission in this language must provide
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Print the reference outputs for a problem
    Expected {
        /// Problem id
        problem: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("algojudge=info")),
        )
        .init();

    dotenvy::dotenv().ok();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_CONFIGURATION)
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let languages_path = env_path("LANGUAGES_CONFIG");
    let languages = languages::init_languages(languages_path.as_deref())?;
    info!(
        "Loaded language configurations from {}",
        describe(languages_path.as_deref())
    );

    let problems_path = env_path("PROBLEMS_CONFIG");
    let registry = problems::init_problems(problems_path.as_deref())?;
    info!(
        problems = registry.len(),
        "Loaded problems from {}",
        describe(problems_path.as_deref())
    );

    config::init_config(JudgeConfig::from_env()?)?;

    match cli.command {
        Commands::Judge {
            language,
            problem,
            source,
        } => {
            let source = tokio::fs::read_to_string(&source)
                .await
                .with_context(|| format!("Failed to read {}", source.display()))?;

            let config = config::get_config().clone();
            info!(backend = %config.backend, timeout_ms = config.timeout_ms, "Judging submission");
            let judge = Judge::new(registry, languages, sandbox::from_config(&config), config);

            match judge.judge(&language, &problem, &source).await {
                Ok(verdict) => {
                    println!("{}", serde_json::to_string_pretty(&verdict)?);
                    Ok(if verdict.all_passed {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    })
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    Ok(ExitCode::from(EXIT_CONFIGURATION))
                }
            }
        }

        Commands::Problems { language } => {
            let language = match language {
                Some(name) => match languages.resolve(&name) {
                    Some(language) => Some(language),
                    None => {
                        eprintln!("error: unsupported language: {}", name);
                        return Ok(ExitCode::from(EXIT_CONFIGURATION));
                    }
                },
                None => None,
            };

            for problem in registry.problems() {
                println!(
                    "{}  entry={}  shape={}  tests={}",
                    problem.id,
                    problem.entry_point,
                    problem.shape,
                    problem.tests.len()
                );
                if let Some(description) = &problem.description {
                    println!("    {}", description);
                }
                if let Some(language) = language {
                    println!("    {}", harness::signature(language, problem));
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Expected { problem } => match registry.expected_outputs(&problem) {
            Ok(expected) => {
                println!("{}", serde_json::to_string(expected)?);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("error: {}", e);
                Ok(ExitCode::from(EXIT_CONFIGURATION))
            }
        },
    }
}

fn describe(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "built-in defaults".to_string(),
    }
}
