//! Verdict engine
//!
//! Turns an execution result into a verdict: parse the harness's result array
//! and compare it position by position against the oracle's outputs.
//! Comparison is structural JSON equality, so `3` and `3.0` differ and list
//! order matters.

use serde_json::Value;
use tracing::debug;

use crate::core::verdict::{TestVerdict, Verdict, VerdictStatus};
use crate::executer::ExecutionResult;
use crate::harness::ERROR_SENTINEL;

pub fn score(expected: &[Value], result: &ExecutionResult) -> Verdict {
    if !result.succeeded {
        let status = result
            .failure_reason
            .map(VerdictStatus::from)
            .unwrap_or(VerdictStatus::RuntimeError);
        return Verdict::failure(status, result.stdout.as_str(), result.stderr.as_str(), result.message.clone());
    }

    let results = match parse_results(&result.stdout) {
        Ok(results) => results,
        Err(reason) => {
            let reason = if result.truncated {
                format!("{} (output exceeded the capture limit)", reason)
            } else {
                reason
            };
            debug!(%reason, "Harness output did not parse");
            return Verdict::failure(
                VerdictStatus::OutputParseError,
                result.stdout.as_str(),
                result.stderr.as_str(),
                Some(reason),
            );
        }
    };

    if results.len() != expected.len() {
        return Verdict::failure(
            VerdictStatus::OutputParseError,
            result.stdout.as_str(),
            result.stderr.as_str(),
            Some(format!(
                "expected {} results, found {}",
                expected.len(),
                results.len()
            )),
        );
    }

    let tests = expected
        .iter()
        .zip(results)
        .enumerate()
        .map(|(index, (expected, got))| compare(index, expected, got))
        .collect();

    Verdict::judged(tests)
}

/// The whole of stdout, trimmed, must be exactly one JSON array
fn parse_results(stdout: &str) -> Result<Vec<Value>, String> {
    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(Value::Array(results)) => Ok(results),
        Ok(other) => Err(format!("expected a JSON array, found {}", kind(&other))),
        Err(e) => Err(format!("malformed harness output: {}", e)),
    }
}

fn compare(index: usize, expected: &Value, got: Value) -> TestVerdict {
    match got {
        Value::String(s) if s.starts_with(ERROR_SENTINEL) => TestVerdict {
            index,
            expected: expected.clone(),
            got: None,
            passed: false,
            error: Some(s[ERROR_SENTINEL.len()..].to_string()),
        },
        got => TestVerdict {
            index,
            expected: expected.clone(),
            passed: &got == expected,
            got: Some(got),
            error: None,
        },
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
