//! Java driver
//!
//! Submissions provide `class Solution` with the entry point as an instance
//! method. Record classes and the public driver class are appended after the
//! user's code so the user's own imports stay at the top of the file.

use crate::problems::{ArgValue, ParamType, Problem, ProblemShape, RecordType};

use super::ERROR_SENTINEL;

fn type_name(ty: ParamType) -> String {
    match ty {
        ParamType::Int => "int".to_string(),
        ParamType::IntList => "int[]".to_string(),
        ParamType::RecordList(record) => format!("{}[]", record.name),
    }
}

fn record_class(record: &RecordType) -> String {
    let fields: Vec<String> = record.fields.iter().map(|f| format!("    public int {};\n", f)).collect();
    let ctor_params: Vec<String> = record.fields.iter().map(|f| format!("int {}", f)).collect();
    let assignments: Vec<String> = record
        .fields
        .iter()
        .map(|f| format!("        this.{0} = {0};\n", f))
        .collect();

    format!(
        "class {name} {{\n{fields}\n    {name}({params}) {{\n{assignments}    }}\n}}\n",
        name = record.name,
        fields = fields.concat(),
        params = ctor_params.join(", "),
        assignments = assignments.concat(),
    )
}

fn literal(value: &ArgValue) -> String {
    match value {
        ArgValue::Int(n) => n.to_string(),
        ArgValue::IntList(items) => {
            let items: Vec<String> = items.iter().map(|n| n.to_string()).collect();
            format!("new int[] {{{}}}", items.join(", "))
        }
        ArgValue::Records(record, rows) => {
            let rows: Vec<String> = rows
                .iter()
                .map(|fields| {
                    let fields: Vec<String> = fields.iter().map(|n| n.to_string()).collect();
                    format!("new {}({})", record.name, fields.join(", "))
                })
                .collect();
            format!("new {}[] {{{}}}", record.name, rows.join(", "))
        }
    }
}

pub fn render(
    problem: &Problem,
    shape: ProblemShape,
    cases: &[Vec<ArgValue>],
    source: &str,
    class_name: &str,
) -> String {
    let mut out = String::from("import java.util.*;\n\n");
    out.push_str(source);
    out.push_str("\n\n");

    for record in shape.record_types() {
        out.push_str(&record_class(record));
        out.push('\n');
    }

    out.push_str(&format!(
        r#"public class {class_name} {{
    private static String harnessError(Throwable t) {{
        String message = t.getMessage() != null ? t.getMessage() : t.getClass().getName();
        StringBuilder out = new StringBuilder("\"{ERROR_SENTINEL}");
        for (char c : message.toCharArray()) {{
            switch (c) {{
                case '"': out.append("\\\""); break;
                case '\\': out.append("\\\\"); break;
                case '\n': out.append("\\n"); break;
                case '\r': out.append("\\r"); break;
                case '\t': out.append("\\t"); break;
                default:
                    if (c < 0x20 || c > 0x7e) {{
                        out.append(String.format("\\u%04x", (int) c));
                    }} else {{
                        out.append(c);
                    }}
            }}
        }}
        return out.append('"').toString();
    }}

    public static void main(String[] args) {{
        List<String> results = new ArrayList<>();
"#
    ));

    let params = shape.params();
    let names: Vec<&str> = params.iter().map(|p| p.name).collect();
    for case in cases {
        out.push_str("        try {\n");
        for (param, value) in params.iter().zip(case) {
            out.push_str(&format!(
                "            {} {} = {};\n",
                type_name(param.ty),
                param.name,
                literal(value)
            ));
        }
        out.push_str(&format!(
            "            results.add(String.valueOf(new Solution().{}({})));\n",
            problem.entry_point,
            names.join(", ")
        ));
        out.push_str("        } catch (Throwable t) {\n            results.add(harnessError(t));\n        }\n");
    }

    out.push_str(
        r#"        System.out.println("[" + String.join(",", results) + "]");
    }
}
"#,
    );

    out
}

pub fn signature(entry_point: &str, shape: ProblemShape) -> String {
    let params: Vec<String> = shape
        .params()
        .iter()
        .map(|p| format!("{} {}", type_name(p.ty), p.name))
        .collect();
    format!(
        "class Solution {{ public int {}({}) }}",
        entry_point,
        params.join(", ")
    )
}
