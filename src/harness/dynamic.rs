//! Node and Python drivers
//!
//! The whole corpus is embedded as one JSON literal and each argument list is
//! spread into the entry point, so these templates work for any shape.

use super::ERROR_SENTINEL;

pub fn render_node(entry_point: &str, corpus_json: &str, source: &str) -> String {
    format!(
        r#"{source}

;(function () {{
  const harnessTests = {corpus_json};
  const harnessResults = [];
  for (const harnessArgs of harnessTests) {{
    try {{
      harnessResults.push({entry_point}(...harnessArgs));
    }} catch (e) {{
      const message = e && e.message !== undefined ? e.message : String(e);
      harnessResults.push("{ERROR_SENTINEL}" + (message || (e && e.name) || "error"));
    }}
  }}
  process.stdout.write(JSON.stringify(harnessResults) + "\n");
}})();
"#
    )
}

pub fn render_python(entry_point: &str, corpus_json: &str, source: &str) -> String {
    // JSON string literals are valid Python string literals
    let corpus_literal = serde_json::Value::String(corpus_json.to_string()).to_string();

    format!(
        r#"{source}


def _harness_main():
    import json as _harness_json

    tests = _harness_json.loads({corpus_literal})
    results = []
    for args in tests:
        try:
            results.append({entry_point}(*args))
        except Exception as e:
            results.append("{ERROR_SENTINEL}" + (str(e) or type(e).__name__))
    print(_harness_json.dumps(results))


_harness_main()
"#
    )
}
