//! Reference oracles
//!
//! One trusted, deterministic algorithm per registered problem. Expected
//! outputs are always derived from these, never stored next to the corpus.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Computes the expected output for one test case's arguments
pub type OracleFn = fn(&[Value]) -> Result<Value, String>;

/// Oracle table keyed by problem id
static ORACLES: &[(&str, OracleFn)] = &[
    ("knapsack", knapsack_oracle),
    ("activity-selection", activity_selection_oracle),
    ("coin-change", coin_change_oracle),
    ("job-sequencing", job_sequencing_oracle),
];

pub fn lookup(problem_id: &str) -> Option<OracleFn> {
    ORACLES
        .iter()
        .find(|(id, _)| *id == problem_id)
        .map(|(_, oracle)| *oracle)
}

#[derive(Debug, Deserialize)]
pub struct Item {
    pub weight: i64,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Deserialize)]
pub struct Job {
    pub deadline: i64,
    pub profit: i64,
}

fn decode<T: DeserializeOwned>(args: &[Value]) -> Result<T, String> {
    serde_json::from_value(Value::Array(args.to_vec())).map_err(|e| e.to_string())
}

fn knapsack_oracle(args: &[Value]) -> Result<Value, String> {
    let (items, capacity): (Vec<Item>, i64) = decode(args)?;
    Ok(Value::from(knapsack(&items, capacity)))
}

fn activity_selection_oracle(args: &[Value]) -> Result<Value, String> {
    let (intervals,): (Vec<Interval>,) = decode(args)?;
    Ok(Value::from(activity_selection(&intervals)))
}

fn coin_change_oracle(args: &[Value]) -> Result<Value, String> {
    let (coins, amount): (Vec<i64>, i64) = decode(args)?;
    Ok(Value::from(coin_change(&coins, amount)))
}

fn job_sequencing_oracle(args: &[Value]) -> Result<Value, String> {
    let (jobs,): (Vec<Job>,) = decode(args)?;
    Ok(Value::from(job_sequencing(&jobs)))
}

/// 0/1 knapsack: maximum total value with total weight at most `capacity`
pub fn knapsack(items: &[Item], capacity: i64) -> i64 {
    if capacity <= 0 {
        return 0;
    }
    let capacity = capacity as usize;
    let mut best = vec![0i64; capacity + 1];

    for item in items {
        if item.weight < 0 {
            continue;
        }
        let weight = item.weight as usize;
        if weight > capacity {
            continue;
        }
        // descending so each item is taken at most once
        for c in (weight..=capacity).rev() {
            best[c] = best[c].max(best[c - weight] + item.value);
        }
    }

    best[capacity]
}

/// Maximum number of pairwise non-overlapping intervals.
/// An interval may start exactly when the previous one ends.
pub fn activity_selection(intervals: &[Interval]) -> i64 {
    let mut sorted: Vec<&Interval> = intervals.iter().collect();
    sorted.sort_by_key(|i| (i.end, i.start));

    let mut count = 0;
    let mut last_end = i64::MIN;
    for interval in sorted {
        if interval.start >= last_end {
            count += 1;
            last_end = interval.end;
        }
    }
    count
}

/// Fewest coins summing to `amount`, or -1 when unreachable
pub fn coin_change(coins: &[i64], amount: i64) -> i64 {
    if amount < 0 {
        return -1;
    }
    let amount = amount as usize;
    const UNREACHABLE: i64 = i64::MAX;
    let mut fewest = vec![UNREACHABLE; amount + 1];
    fewest[0] = 0;

    for total in 1..=amount {
        for &coin in coins {
            if coin <= 0 || coin as usize > total {
                continue;
            }
            let prev = fewest[total - coin as usize];
            if prev != UNREACHABLE {
                fewest[total] = fewest[total].min(prev + 1);
            }
        }
    }

    match fewest[amount] {
        UNREACHABLE => -1,
        n => n,
    }
}

/// Maximum profit from unit-time jobs, each finished no later than its deadline
pub fn job_sequencing(jobs: &[Job]) -> i64 {
    let mut sorted: Vec<&Job> = jobs.iter().filter(|j| j.deadline > 0).collect();
    // stable: ties keep corpus order
    sorted.sort_by(|a, b| b.profit.cmp(&a.profit));

    let horizon = sorted.iter().map(|j| j.deadline).max().unwrap_or(0) as usize;
    let mut slots = vec![false; horizon + 1];
    let mut profit = 0;

    for job in sorted {
        let latest = job.deadline as usize;
        if let Some(slot) = (1..=latest).rev().find(|&s| !slots[s]) {
            slots[slot] = true;
            profit += job.profit;
        }
    }
    profit
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activity_selection_scenario() {
        let oracle = lookup("activity-selection").unwrap();
        let args = vec![json!([
            {"start": 1, "end": 3},
            {"start": 2, "end": 5},
            {"start": 4, "end": 7},
            {"start": 1, "end": 8},
            {"start": 5, "end": 9},
            {"start": 8, "end": 10}
        ])];
        assert_eq!(oracle(&args).unwrap(), json!(3));
    }

    #[test]
    fn test_coin_change_unreachable() {
        let oracle = lookup("coin-change").unwrap();
        assert_eq!(oracle(&[json!([2]), json!(3)]).unwrap(), json!(-1));
        assert_eq!(oracle(&[json!([1, 2, 5]), json!(11)]).unwrap(), json!(3));
        assert_eq!(oracle(&[json!([7]), json!(0)]).unwrap(), json!(0));
    }

    #[test]
    fn test_knapsack() {
        let items = vec![
            Item { weight: 1, value: 1 },
            Item { weight: 3, value: 4 },
            Item { weight: 4, value: 5 },
            Item { weight: 5, value: 7 },
        ];
        assert_eq!(knapsack(&items, 7), 9);
        assert_eq!(knapsack(&items, 0), 0);
        assert_eq!(knapsack(&[], 10), 0);
    }

    #[test]
    fn test_knapsack_takes_each_item_once() {
        let items = vec![Item { weight: 2, value: 3 }];
        assert_eq!(knapsack(&items, 10), 3);
    }

    #[test]
    fn test_job_sequencing() {
        let jobs = vec![
            Job { deadline: 2, profit: 100 },
            Job { deadline: 1, profit: 19 },
            Job { deadline: 2, profit: 27 },
            Job { deadline: 1, profit: 25 },
            Job { deadline: 3, profit: 15 },
        ];
        assert_eq!(job_sequencing(&jobs), 142);
        assert_eq!(job_sequencing(&[]), 0);
    }

    #[test]
    fn test_oracles_are_deterministic() {
        let oracle = lookup("knapsack").unwrap();
        let args = vec![json!([{"weight": 2, "value": 3}, {"weight": 3, "value": 4}]), json!(5)];
        let first = oracle(&args).unwrap();
        for _ in 0..5 {
            assert_eq!(oracle(&args).unwrap(), first);
        }
    }

    #[test]
    fn test_oracle_rejects_malformed_args() {
        let oracle = lookup("coin-change").unwrap();
        assert!(oracle(&[json!("nope"), json!(3)]).is_err());
        assert!(lookup("two-sum").is_none());
    }
}
