//! C++ driver
//!
//! Record types are declared ahead of the user's code. Each test gets its own
//! block with typed locals so the entry point can take vectors by value or by
//! (const) reference.

use crate::problems::{ArgValue, ParamType, Problem, ProblemShape, RecordType};

use super::ERROR_SENTINEL;

fn type_name(ty: ParamType) -> String {
    match ty {
        ParamType::Int => "int".to_string(),
        ParamType::IntList => "vector<int>".to_string(),
        ParamType::RecordList(record) => format!("vector<{}>", record.name),
    }
}

fn record_decl(record: &RecordType) -> String {
    let mut decl = format!("struct {} {{\n", record.name);
    for field in record.fields {
        decl.push_str(&format!("    int {};\n", field));
    }
    decl.push_str("};\n");
    decl
}

fn literal(value: &ArgValue) -> String {
    match value {
        ArgValue::Int(n) => n.to_string(),
        ArgValue::IntList(items) => {
            let items: Vec<String> = items.iter().map(|n| n.to_string()).collect();
            format!("{{{}}}", items.join(", "))
        }
        ArgValue::Records(record, rows) => {
            let rows: Vec<String> = rows
                .iter()
                .map(|fields| {
                    let fields: Vec<String> = fields.iter().map(|n| n.to_string()).collect();
                    format!("{}{{{}}}", record.name, fields.join(", "))
                })
                .collect();
            format!("{{{}}}", rows.join(", "))
        }
    }
}

const PRELUDE: &str = r#"#include <bits/stdc++.h>
using namespace std;
"#;

pub fn render(problem: &Problem, shape: ProblemShape, cases: &[Vec<ArgValue>], source: &str) -> String {
    let mut out = String::from(PRELUDE);
    out.push('\n');
    for record in shape.record_types() {
        out.push_str(&record_decl(record));
        out.push('\n');
    }

    out.push_str(source);
    out.push_str("\n\n");

    out.push_str(&format!(
        r#"static string harness_error(const string& message) {{
    string out = "\"{ERROR_SENTINEL}";
    for (unsigned char c : message) {{
        switch (c) {{
            case '"': out += "\\\""; break;
            case '\\': out += "\\\\"; break;
            case '\n': out += "\\n"; break;
            case '\r': out += "\\r"; break;
            case '\t': out += "\\t"; break;
            default:
                if (c < 0x20) {{
                    char buf[8];
                    snprintf(buf, sizeof buf, "\\u%04x", c);
                    out += buf;
                }} else {{
                    out += static_cast<char>(c);
                }}
        }}
    }}
    out += "\"";
    return out;
}}

int main() {{
    vector<string> harness_results;
"#
    ));

    let params = shape.params();
    for args in cases {
        out.push_str("    {\n");
        for (param, value) in params.iter().zip(args) {
            out.push_str(&format!(
                "        {} {} = {};\n",
                type_name(param.ty),
                param.name,
                literal(value)
            ));
        }
        let names: Vec<&str> = params.iter().map(|p| p.name).collect();
        out.push_str(&format!(
            r#"        try {{
            harness_results.push_back(to_string({}({})));
        }} catch (const exception& e) {{
            harness_results.push_back(harness_error(e.what()));
        }} catch (...) {{
            harness_results.push_back(harness_error("unknown exception"));
        }}
    }}
"#,
            problem.entry_point,
            names.join(", ")
        ));
    }

    out.push_str(
        r#"    cout << "[";
    for (size_t i = 0; i < harness_results.size(); ++i) {
        if (i > 0) cout << ",";
        cout << harness_results[i];
    }
    cout << "]" << endl;
    return 0;
}
"#,
    );

    out
}

pub fn signature(entry_point: &str, shape: ProblemShape) -> String {
    let params: Vec<String> = shape
        .params()
        .iter()
        .map(|p| match p.ty {
            ParamType::Int => format!("int {}", p.name),
            ty => format!("{}& {}", type_name(ty), p.name),
        })
        .collect();
    format!("int {}({})", entry_point, params.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::ProblemRegistry;

    #[test]
    fn test_knapsack_driver() {
        let registry = ProblemRegistry::builtin().unwrap();
        let problem = registry.get("knapsack").unwrap();
        let cases = vec![vec![
            ArgValue::Records(&crate::problems::shape::ITEM, vec![vec![1, 1], vec![3, 4]]),
            ArgValue::Int(7),
        ]];

        let out = render(problem, ProblemShape::Knapsack, &cases, "int knapsack(vector<Item>& items, int capacity) { return 0; }");

        let decl_at = out.find("struct Item {\n    int weight;\n    int value;\n};").unwrap();
        let user_at = out.find("int knapsack(vector<Item>& items").unwrap();
        let main_at = out.find("int main()").unwrap();
        assert!(decl_at < user_at && user_at < main_at);

        assert!(out.contains("vector<Item> items = {Item{1, 1}, Item{3, 4}};"));
        assert!(out.contains("int capacity = 7;"));
        assert!(out.contains("to_string(knapsack(items, capacity))"));
        assert_eq!(out.matches("harness_results.push_back(to_string(").count(), 1);
    }

    #[test]
    fn test_one_block_per_test_case() {
        let registry = ProblemRegistry::builtin().unwrap();
        let problem = registry.get("coin-change").unwrap();
        let cases = vec![
            vec![ArgValue::IntList(vec![2]), ArgValue::Int(3)],
            vec![ArgValue::IntList(vec![]), ArgValue::Int(0)],
        ];

        let out = render(problem, ProblemShape::CoinChange, &cases, "");
        assert!(out.contains("vector<int> coins = {2};"));
        assert!(out.contains("vector<int> coins = {};"));
        assert_eq!(out.matches("to_string(coinChange(coins, amount))").count(), 2);
        assert!(!out.contains("struct "));
    }

    #[test]
    fn test_error_helper_uses_sentinel() {
        let registry = ProblemRegistry::builtin().unwrap();
        let problem = registry.get("coin-change").unwrap();
        let out = render(problem, ProblemShape::CoinChange, &[], "");
        assert!(out.contains(r#"string out = "\"__ERROR__:";"#));
    }

    #[test]
    fn test_signature() {
        assert_eq!(
            signature("activitySelection", ProblemShape::Intervals),
            "int activitySelection(vector<Interval>& intervals)"
        );
        assert_eq!(
            signature("coinChange", ProblemShape::CoinChange),
            "int coinChange(vector<int>& coins, int amount)"
        );
    }
}
