use serde_json::Value;

use super::format_scalar;

/// Headline fields, most specific first.
const PRIORITY_KEYS: [&str; 5] = [
    "sharpe_ratio",
    "p_value",
    "hedge_ratio",
    "max_drawdown",
    "total_pnl",
];

/// Print only the headline number of a result.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

/// Pick the first priority key present (looking one level into nested
/// objects), falling back to the first field. A null headline is printed as
/// `<key>: undefined` rather than skipped.
pub fn minimal_line(value: &Value) -> String {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let Value::Object(map) = result else {
        return format_scalar(result, "null");
    };

    for key in PRIORITY_KEYS {
        let found = map.get(key).or_else(|| {
            map.values()
                .filter_map(Value::as_object)
                .find_map(|inner| inner.get(key))
        });
        match found {
            Some(Value::Null) => return format!("{}: undefined", key),
            Some(val) => return format_scalar(val, "null"),
            None => {}
        }
    }

    match map.iter().next() {
        Some((key, val)) => format!("{}: {}", key, format_scalar(val, "null")),
        None => String::new(),
    }
}
