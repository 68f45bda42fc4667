//! JSON ingestion implementation.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single JSON object: `{"a":1}`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested objects are flattened at any depth into dot-joined column names (`user.name`).
//! Arrays are kept whole and stored as their JSON text. Records that are not objects are
//! rejected.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::infer::{ColumnInference, coerce, sniff_temporal, unique_column_names};

static JSON_NULL: serde_json::Value = serde_json::Value::Null;

/// Options for the structured-record reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOptions {
    /// Infer column types from the values. When `false` every column is text.
    pub auto_detect: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self { auto_detect: true }
    }
}

/// Ingest JSON into an in-memory `DataSet`.
pub fn ingest_json_from_path(path: impl AsRef<Path>, options: &JsonOptions) -> SourceResult<DataSet> {
    let text = fs::read_to_string(path)?;
    ingest_json_from_str(&text, options)
}

/// Ingest JSON from an in-memory string into a [`DataSet`].
///
/// Empty input is valid and yields a dataset without columns.
pub fn ingest_json_from_str(input: &str, options: &JsonOptions) -> SourceResult<DataSet> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(DataSet::default());
    }

    // First try parsing as a single JSON value (array or object).
    let values = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(v @ serde_json::Value::Object(_)) => vec![v],
        Ok(_) => {
            return Err(SourceError::Unsupported {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            });
        }
        Err(_) => parse_ndjson(trimmed)?,
    };

    ingest_json_values(&values, options)
}

fn parse_ndjson(input: &str) -> SourceResult<Vec<serde_json::Value>> {
    let mut values = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| SourceError::ParseError {
            row: i + 1,
            message: format!("invalid ndjson: {e}"),
        })?;
        values.push(v);
    }
    Ok(values)
}

fn ingest_json_values(values: &[serde_json::Value], options: &JsonOptions) -> SourceResult<DataSet> {
    let mut columns: Vec<String> = Vec::new();
    let mut column_idx: HashMap<String, usize> = HashMap::new();
    let mut sparse_rows: Vec<Vec<(usize, Value)>> = Vec::with_capacity(values.len());
    let mut serialized_arrays = false;

    for (idx0, v) in values.iter().enumerate() {
        let row_num = idx0 + 1;
        let obj = v.as_object().ok_or_else(|| SourceError::Unsupported {
            message: format!("record {row_num} is not a json object"),
        })?;

        let mut flat: Vec<(String, &serde_json::Value)> = Vec::new();
        flatten_object("", obj, &mut flat);

        let mut row = Vec::with_capacity(flat.len());
        for (key, jv) in flat {
            serialized_arrays |= jv.is_array();
            let next = columns.len();
            let idx = *column_idx.entry(key.clone()).or_insert(next);
            if idx == next {
                columns.push(key);
            }
            row.push((idx, convert_json_value(jv, options)));
        }
        sparse_rows.push(row);
    }

    let mut inference = vec![ColumnInference::default(); columns.len()];
    for row in &sparse_rows {
        for (idx, value) in row {
            inference[*idx].observe_value(value);
        }
    }
    let types: Vec<DataType> = inference.iter().map(ColumnInference::resolve).collect();

    let rows: Vec<Vec<Value>> = sparse_rows
        .into_iter()
        .map(|sparse| {
            let mut row = vec![Value::Null; columns.len()];
            for (idx, value) in sparse {
                row[idx] = coerce(value, types[idx]);
            }
            row
        })
        .collect();

    let fields = unique_column_names(columns)
        .into_iter()
        .zip(types)
        .map(|(name, dt)| Field::new(name, dt))
        .collect();

    let mut ds = DataSet::new(Schema::new(fields), rows);
    if serialized_arrays {
        ds = ds.with_note("array values were stored as JSON text");
    }
    Ok(ds)
}

fn flatten_object<'a>(
    prefix: &str,
    obj: &'a serde_json::Map<String, serde_json::Value>,
    out: &mut Vec<(String, &'a serde_json::Value)>,
) {
    for (key, value) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            serde_json::Value::Object(nested) if !nested.is_empty() => {
                flatten_object(&path, nested, out)
            }
            serde_json::Value::Object(_) => out.push((path, &JSON_NULL)),
            _ => out.push((path, value)),
        }
    }
}

fn convert_json_value(v: &serde_json::Value, options: &JsonOptions) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::String(s) if !options.auto_detect => Value::Utf8(s.clone()),
        _ if !options.auto_detect => Value::Utf8(v.to_string()),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => n.as_f64().map_or(Value::Utf8(n.to_string()), Value::Float64),
        },
        serde_json::Value::String(s) => match sniff_temporal(s) {
            DataType::Utf8 => Value::Utf8(s.clone()),
            dt => coerce(Value::Utf8(s.clone()), dt),
        },
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::Utf8(v.to_string()),
    }
}
