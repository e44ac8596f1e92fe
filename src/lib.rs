//! Polyglot algorithm judge
//!
//! `judge(language, problem, source)` wraps the submission in a generated
//! harness, runs it once in a sandbox under a single timeout, and compares the
//! harness's output against the problem's reference oracle.

pub mod checker;
pub mod config;
pub mod core;
pub mod error;
pub mod executer;
pub mod harness;
pub mod judger;
pub mod languages;
pub mod problems;
pub mod sandbox;

pub use crate::core::verdict::{TestVerdict, Verdict, VerdictStatus};
pub use error::ConfigurationError;
pub use judger::{Judge, JudgeRequest};
