pub mod csv_out;
pub mod equity;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten nested objects into `parent.child` rows for two-column output.
/// Arrays longer than `max_inline` are summarised by their length.
pub fn flatten(map: &Map<String, Value>, max_inline: usize) -> Vec<(String, Value)> {
    let mut rows = Vec::new();
    flatten_into(&mut rows, "", map, max_inline);
    rows
}

fn flatten_into(
    rows: &mut Vec<(String, Value)>,
    prefix: &str,
    map: &Map<String, Value>,
    max_inline: usize,
) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => flatten_into(rows, &name, inner, max_inline),
            Value::Array(items) if items.len() > max_inline => {
                rows.push((name, Value::String(format!("[{} items]", items.len()))));
            }
            _ => rows.push((name, val.clone())),
        }
    }
}

/// Render a scalar cell. `null` prints as `null_text`.
pub fn format_scalar(value: &Value, null_text: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => null_text.to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_and_long_arrays() {
        let value = json!({
            "hedge_ratio": 0.8,
            "cointegration": {"p_value": 0.01, "critical_values": {"five_pct": -3.3}},
            "returns": [0.0, 1.0, -1.0],
            "positions": [0]
        });
        let rows = flatten(value.as_object().unwrap(), 2);
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"cointegration.critical_values.five_pct"));
        let returns = rows.iter().find(|(k, _)| k == "returns").unwrap();
        assert_eq!(returns.1, json!("[3 items]"));
        let positions = rows.iter().find(|(k, _)| k == "positions").unwrap();
        assert_eq!(positions.1, json!([0]));
    }

    #[test]
    fn test_null_rendering() {
        assert_eq!(format_scalar(&Value::Null, "n/a"), "n/a");
        assert_eq!(format_scalar(&json!(true), ""), "true");
    }
}
