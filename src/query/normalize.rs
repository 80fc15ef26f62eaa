//! Converts raw service results into records.

use crate::db::{QueryResult, RawResultSet, Record, Value, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;

/// Turns a raw result set into one record per row, in service order.
///
/// Cells missing from a short row become `Null`; surplus cells are ignored.
pub fn normalize(raw: RawResultSet) -> QueryResult {
    let records = raw
        .rows
        .iter()
        .map(|row| {
            raw.columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let cell = row.get(i).and_then(|c| c.as_deref());
                    (column.name.clone(), convert_value(cell, &column.data_type))
                })
                .collect::<Record>()
        })
        .collect();

    QueryResult {
        columns: raw.columns,
        records,
        execution_time: Default::default(),
        query_execution_id: raw.query_execution_id,
    }
}

/// Converts a single cell according to its column's declared type.
///
/// Cells that do not parse as their declared type are kept as strings.
pub fn convert_value(cell: Option<&str>, data_type: &str) -> Value {
    let Some(text) = cell else {
        return Value::Null;
    };

    let converted = match base_type(data_type).as_str() {
        "boolean" => text.parse::<bool>().ok().map(Value::Bool),

        "tinyint" | "smallint" | "integer" | "int" | "bigint" => {
            text.parse::<i64>().ok().map(Value::Int)
        }

        "real" | "float" | "double" | "decimal" => text.parse::<f64>().ok().map(Value::Float),

        "timestamp" => NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .ok()
            .map(Value::Timestamp),

        // varchar, char, date, json, arrays, maps, rows, zoned timestamps...
        _ => None,
    };

    converted.unwrap_or_else(|| Value::String(text.to_string()))
}

/// Lowercases a type name and drops precision arguments:
/// `DECIMAL(10, 2)` becomes `decimal`, `timestamp(3) with time zone`
/// becomes `timestamp with time zone`.
fn base_type(data_type: &str) -> String {
    let mut stripped = String::with_capacity(data_type.len());
    let mut depth = 0usize;
    for ch in data_type.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
