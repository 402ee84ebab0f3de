//! Lenient readers for loosely-typed upstream JSON.
//!
//! Providers are inconsistent about whether identifiers and coordinates are
//! sent as numbers or strings, so fields are read as `serde_json::Value`
//! and converted here.

use serde_json::Value;

/// Decimal places used when rendering coordinates.
pub const COORD_PRECISION: usize = 10;

/// Render a scalar as a string. `null` becomes empty.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Read an integer from a number or numeric string; anything else is 0.
pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Read a coordinate as a fixed-precision decimal string.
///
/// Returns `None` when the value is not a number or numeric string.
pub fn parse_coord(value: &Value) -> Option<String> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then(|| format!("{:.*}", COORD_PRECISION, f))
}

/// Like [`parse_coord`], but falls back to the raw text.
pub fn format_coord(value: &Value) -> String {
    parse_coord(value).unwrap_or_else(|| to_string(value))
}

/// Interpret a flag sent as `"1"`, `1` or `true`.
pub fn is_set(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s.trim() == "1",
        _ => false,
    }
}
