//! Turns a batch of loosely-typed extraction records into a rectangular table.
//!
//! The service returns whatever the model produced: records can disagree on
//! their keys, nest objects and arrays, or not be objects at all. Columns are
//! therefore discovered across *every* record, and each record is projected
//! onto that shared column list so all rows have the same width.
//!
//! None of these functions can fail. Malformed records become empty cells.

use crate::domain::model::{Record, TableProjection};
use serde_json::{Number, Value};
use std::collections::HashSet;

const SEPARATOR: &str = ", ";

/// Union of the keys of all object records, in first-seen order.
///
/// Records are scanned in order and keys within a record in insertion order
/// (`serde_json` is built with `preserve_order`). Non-object records are
/// skipped.
pub fn discover_columns(records: &[Record]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut columns = Vec::new();

    for record in records {
        if let Value::Object(obj) = record {
            for key in obj.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }
    }

    columns
}

/// Flat display string for any JSON value.
///
/// Arrays join their formatted elements with `", "`; objects render each
/// entry as `key: value` joined the same way; scalars use their JSON text,
/// except strings which are shown without quotes.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(SEPARATOR),
        Value::Object(obj) => obj
            .iter()
            .map(|(key, v)| format!("{}: {}", key, format_value(v)))
            .collect::<Vec<_>>()
            .join(SEPARATOR),
    }
}

/// Whole floats such as `30.0` (Python backends emit these for numeric
/// fields) are shown as integers; everything else keeps serde_json's text.
fn format_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            let whole = f.is_finite() && f.fract() == 0.0;
            if whole && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                return (f as i64).to_string();
            }
        }
    }
    n.to_string()
}

/// One cell per column; missing keys and non-object records give `""`.
pub fn project_row(record: &Record, columns: &[String]) -> Vec<String> {
    match record {
        Value::Object(obj) => columns
            .iter()
            .map(|column| obj.get(column).map(format_value).unwrap_or_default())
            .collect(),
        _ => vec![String::new(); columns.len()],
    }
}

pub fn project(records: &[Record]) -> TableProjection {
    let columns = discover_columns(records);
    let rows = records
        .iter()
        .map(|record| project_row(record, &columns))
        .collect();

    TableProjection { columns, rows }
}
