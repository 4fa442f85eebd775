use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    println!("{}", render_table(value));
}

pub fn render_table(value: &Value) -> String {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => render_result(result, map),
            _ => field_table(map),
        },
        Value::Array(arr) => array_table(arr),
        _ => value.to_string(),
    }
}

fn render_result(result: &Map<String, Value>, envelope: &Map<String, Value>) -> String {
    let mut sections = vec![field_table(result)];

    // Node and sweep lists get their own tables
    for (key, val) in result {
        if let Value::Array(arr) = val {
            if arr.first().is_some_and(Value::is_object) {
                sections.push(format!("{}:\n{}", key, array_table(arr)));
            }
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            let lines: Vec<String> = warnings
                .iter()
                .filter_map(Value::as_str)
                .map(|w| format!("  - {}", w))
                .collect();
            sections.push(format!("Warnings:\n{}", lines.join("\n")));
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        sections.push(format!("Methodology: {}", meth));
    }

    sections.join("\n\n")
}

/// Scalars as Field/Value rows; nested objects flattened to `outer.inner`.
fn field_table(map: &Map<String, Value>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    push_fields(&mut builder, "", map);
    Table::from(builder).to_string()
}

fn push_fields(builder: &mut Builder, prefix: &str, map: &Map<String, Value>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => push_fields(builder, &name, inner),
            Value::Array(arr) if arr.first().is_some_and(Value::is_object) => {
                builder.push_record([name, format!("{} rows", arr.len())]);
            }
            _ => builder.push_record([name, format_value(val)]),
        }
    }
}

fn array_table(arr: &[Value]) -> String {
    let Some(Value::Object(first)) = arr.first() else {
        return arr.iter().map(format_value).collect::<Vec<_>>().join("\n");
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    Table::from(builder).to_string()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
