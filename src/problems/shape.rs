//! Problem shapes: the typed parameter lists entry points are called with
//!
//! Dynamically-typed harnesses never look at shapes. Statically-typed ones
//! need them to declare record types and build literal arguments.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SynthesisError;

/// A record passed to entry points as a struct/class with integer fields
#[derive(Debug, PartialEq, Eq)]
pub struct RecordType {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int,
    IntList,
    RecordList(&'static RecordType),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub ty: ParamType,
}

pub static ITEM: RecordType = RecordType {
    name: "Item",
    fields: &["weight", "value"],
};

pub static INTERVAL: RecordType = RecordType {
    name: "Interval",
    fields: &["start", "end"],
};

pub static JOB: RecordType = RecordType {
    name: "Job",
    fields: &["deadline", "profit"],
};

static KNAPSACK_PARAMS: [Param; 2] = [
    Param {
        name: "items",
        ty: ParamType::RecordList(&ITEM),
    },
    Param {
        name: "capacity",
        ty: ParamType::Int,
    },
];

static INTERVALS_PARAMS: [Param; 1] = [Param {
    name: "intervals",
    ty: ParamType::RecordList(&INTERVAL),
}];

static COIN_CHANGE_PARAMS: [Param; 2] = [
    Param {
        name: "coins",
        ty: ParamType::IntList,
    },
    Param {
        name: "amount",
        ty: ParamType::Int,
    },
];

static JOB_SEQUENCING_PARAMS: [Param; 1] = [Param {
    name: "jobs",
    ty: ParamType::RecordList(&JOB),
}];

/// Closed set of argument shapes. Adding a problem with a new shape means
/// adding a variant here and its parameter list; the static harnesses render
/// any parameter list built from `ParamType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemShape {
    /// `(items: [Item], capacity: int)`
    Knapsack,
    /// `(intervals: [Interval])`
    Intervals,
    /// `(coins: [int], amount: int)`
    CoinChange,
    /// `(jobs: [Job])`
    JobSequencing,
}

impl ProblemShape {
    pub fn params(&self) -> &'static [Param] {
        match self {
            ProblemShape::Knapsack => &KNAPSACK_PARAMS,
            ProblemShape::Intervals => &INTERVALS_PARAMS,
            ProblemShape::CoinChange => &COIN_CHANGE_PARAMS,
            ProblemShape::JobSequencing => &JOB_SEQUENCING_PARAMS,
        }
    }

    /// Record types the harness prelude must declare, in parameter order
    pub fn record_types(&self) -> Vec<&'static RecordType> {
        let mut records: Vec<&'static RecordType> = Vec::new();
        for param in self.params() {
            if let ParamType::RecordList(record) = param.ty {
                if !records.iter().any(|r| r.name == record.name) {
                    records.push(record);
                }
            }
        }
        records
    }

    /// Decode one test case's JSON arguments into typed values.
    ///
    /// Integers must fit in 32 bits since compiled harnesses declare `int`.
    pub fn decode_args(
        &self,
        problem: &str,
        index: usize,
        args: &[Value],
    ) -> Result<Vec<ArgValue>, SynthesisError> {
        let params = self.params();
        if params.len() != args.len() {
            return Err(SynthesisError::Arity {
                problem: problem.to_string(),
                index,
                expected: params.len(),
                found: args.len(),
            });
        }

        params
            .iter()
            .zip(args)
            .map(|(param, value)| {
                decode_value(param.ty, value).map_err(|reason| SynthesisError::ArgumentMismatch {
                    problem: problem.to_string(),
                    index,
                    param: param.name.to_string(),
                    reason,
                })
            })
            .collect()
    }
}

impl fmt::Display for ProblemShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProblemShape::Knapsack => "knapsack",
            ProblemShape::Intervals => "intervals",
            ProblemShape::CoinChange => "coin-change",
            ProblemShape::JobSequencing => "job-sequencing",
        };
        write!(f, "{}", s)
    }
}

/// A decoded argument, ready to be rendered as a typed literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Int(i32),
    IntList(Vec<i32>),
    /// Field values in the record type's declared field order
    Records(&'static RecordType, Vec<Vec<i32>>),
}

fn decode_value(ty: ParamType, value: &Value) -> Result<ArgValue, String> {
    match ty {
        ParamType::Int => decode_int(value).map(ArgValue::Int),
        ParamType::IntList => as_array(value)?
            .iter()
            .map(decode_int)
            .collect::<Result<Vec<_>, _>>()
            .map(ArgValue::IntList),
        ParamType::RecordList(record) => as_array(value)?
            .iter()
            .map(|element| decode_record(record, element))
            .collect::<Result<Vec<_>, _>>()
            .map(|rows| ArgValue::Records(record, rows)),
    }
}

fn as_array(value: &Value) -> Result<&Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("expected a list, found {}", value))
}

fn decode_int(value: &Value) -> Result<i32, String> {
    let n = value
        .as_i64()
        .ok_or_else(|| format!("expected an integer, found {}", value))?;
    i32::try_from(n).map_err(|_| format!("{} does not fit in 32 bits", n))
}

fn decode_record(record: &RecordType, value: &Value) -> Result<Vec<i32>, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected a {} record, found {}", record.name, value))?;

    if object.len() != record.fields.len() {
        return Err(format!(
            "{} records have fields {:?}, found {}",
            record.name, record.fields, value
        ));
    }

    record
        .fields
        .iter()
        .map(|field| {
            let field_value = object
                .get(*field)
                .ok_or_else(|| format!("{} record missing field {}", record.name, field))?;
            decode_int(field_value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shape_names() {
        let shape: ProblemShape = serde_json::from_value(json!("coin-change")).unwrap();
        assert_eq!(shape, ProblemShape::CoinChange);
        assert_eq!(shape.to_string(), "coin-change");
        assert!(serde_json::from_value::<ProblemShape>(json!("matrix")).is_err());
    }

    #[test]
    fn test_record_types() {
        assert_eq!(ProblemShape::Knapsack.record_types(), vec![&ITEM]);
        assert_eq!(ProblemShape::Intervals.record_types(), vec![&INTERVAL]);
        assert!(ProblemShape::CoinChange.record_types().is_empty());
    }

    #[test]
    fn test_decode_knapsack_args() {
        let args = vec![
            json!([{"weight": 1, "value": 1}, {"value": 4, "weight": 3}]),
            json!(4),
        ];
        let decoded = ProblemShape::Knapsack.decode_args("knapsack", 0, &args).unwrap();

        assert_eq!(
            decoded,
            vec![
                ArgValue::Records(&ITEM, vec![vec![1, 1], vec![3, 4]]),
                ArgValue::Int(4),
            ]
        );
    }

    #[test]
    fn test_decode_rejects_wrong_arity() {
        let err = ProblemShape::CoinChange
            .decode_args("coin-change", 2, &[json!([1, 2])])
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Arity { expected: 2, found: 1, index: 2, .. }));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let err = ProblemShape::Intervals
            .decode_args("activity-selection", 0, &[json!([{"start": 1, "finish": 3}])])
            .unwrap_err();
        match err {
            SynthesisError::ArgumentMismatch { param, reason, .. } => {
                assert_eq!(param, "intervals");
                assert!(reason.contains("end"), "{}", reason);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_rejects_wide_integers() {
        let err = ProblemShape::CoinChange
            .decode_args("coin-change", 0, &[json!([1]), json!(5_000_000_000i64)])
            .unwrap_err();
        assert!(matches!(err, SynthesisError::ArgumentMismatch { .. }));
    }

    #[test]
    fn test_decode_rejects_floats() {
        assert!(ProblemShape::CoinChange
            .decode_args("coin-change", 0, &[json!([1.5]), json!(3)])
            .is_err());
    }
}
