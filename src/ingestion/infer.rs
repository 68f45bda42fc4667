//! Column type inference shared by the readers.
//!
//! Text cells are sniffed one at a time ([`sniff`]) and folded per column with
//! [`ColumnInference`]; the widest type wins. Mixed numeric columns widen to
//! [`DataType::Float64`], mixed date/time columns to [`DataType::Timestamp`], and anything else
//! that disagrees falls back to [`DataType::Utf8`].

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::{DataType, Value};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Running type decision for one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnInference {
    widest: Option<DataType>,
}

impl ColumnInference {
    /// Fold a non-null observation into the column type.
    pub fn observe(&mut self, data_type: DataType) {
        self.widest = Some(match self.widest {
            None => data_type,
            Some(current) => unify(current, data_type),
        });
    }

    /// Fold a typed value; nulls do not influence the result.
    pub fn observe_value(&mut self, value: &Value) {
        if let Some(dt) = value.data_type() {
            self.observe(dt);
        }
    }

    /// Final column type. Columns that only ever held nulls become [`DataType::Utf8`].
    pub fn resolve(&self) -> DataType {
        self.widest.unwrap_or(DataType::Utf8)
    }
}

/// Smallest type able to hold values of both `a` and `b`.
pub fn unify(a: DataType, b: DataType) -> DataType {
    use DataType::*;
    match (a, b) {
        _ if a == b => a,
        (Int64, Float64) | (Float64, Int64) => Float64,
        (Date, Timestamp) | (Timestamp, Date) => Timestamp,
        _ => Utf8,
    }
}

/// Narrowest type a raw text cell parses as, or `None` for an empty cell.
pub fn sniff(raw: &str) -> Option<DataType> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let dt = if is_bool_word(s) {
        DataType::Bool
    } else if s.parse::<i64>().is_ok() {
        DataType::Int64
    } else if looks_numeric(s) && s.parse::<f64>().is_ok() {
        DataType::Float64
    } else if parse_date(s).is_some() {
        DataType::Date
    } else if parse_timestamp(s).is_some() {
        DataType::Timestamp
    } else {
        DataType::Utf8
    };
    Some(dt)
}

/// Sniff only the temporal types; everything else stays text.
///
/// Used for string values of already-typed sources (JSON strings, spreadsheet text cells),
/// where `"123"` should stay a string but `"2024-01-01"` should become a date.
pub fn sniff_temporal(raw: &str) -> DataType {
    let s = raw.trim();
    if parse_date(s).is_some() {
        DataType::Date
    } else if parse_timestamp(s).is_some() {
        DataType::Timestamp
    } else {
        DataType::Utf8
    }
}

/// Parse a raw text cell as `data_type`.
///
/// Only an empty cell is [`Value::Null`]. Text keeps its surrounding whitespace; the other
/// types are parsed from the trimmed cell, where whitespace alone also reads as null.
pub fn parse_text(raw: &str, data_type: DataType) -> Result<Value, String> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }

    let trimmed = raw.trim();
    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(raw.to_owned())),
        _ if trimmed.is_empty() => Ok(Value::Null),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| e.to_string()),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| e.to_string()),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool),
        DataType::Date => parse_date(trimmed)
            .map(Value::Date)
            .ok_or_else(|| "expected date (YYYY-MM-DD)".to_string()),
        DataType::Timestamp => parse_timestamp(trimmed)
            .or_else(|| parse_date(trimmed).map(|d| d.and_time(NaiveTime::MIN)))
            .map(Value::Timestamp)
            .ok_or_else(|| "expected timestamp (YYYY-MM-DD HH:MM:SS)".to_string()),
    }
}

/// Widen an already-typed value to the resolved column type.
pub fn coerce(value: Value, data_type: DataType) -> Value {
    if value.data_type().is_none_or(|dt| dt == data_type) {
        return value;
    }

    match (value, data_type) {
        (Value::Int64(v), DataType::Float64) => Value::Float64(v as f64),
        (Value::Date(d), DataType::Timestamp) => Value::Timestamp(d.and_time(NaiveTime::MIN)),
        (Value::Utf8(s), dt) => parse_text(&s, dt).unwrap_or(Value::Utf8(s)),
        (other, DataType::Utf8) => other.to_text().map_or(Value::Null, Value::Utf8),
        (other, dt) => other
            .to_text()
            .and_then(|text| parse_text(&text, dt).ok())
            .unwrap_or(Value::Null),
    }
}

/// Like [`coerce`], but a value that still does not fit `data_type` becomes [`Value::Null`].
///
/// For sources whose declared column type is final, so every value written matches it.
pub fn conform(value: Value, data_type: DataType) -> Value {
    let value = coerce(value, data_type);
    match value.data_type() {
        Some(dt) if dt != data_type => Value::Null,
        _ => value,
    }
}

/// Make column names non-empty and unique (case-insensitively, as the database compares them).
///
/// Empty names become `column<i>`; repeats get a `_<n>` suffix.
pub fn unique_column_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for (idx, name) in names.into_iter().enumerate() {
        let trimmed = name.trim();
        let base = if trimmed.is_empty() {
            format!("column{idx}")
        } else {
            trimmed.to_owned()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while !seen.insert(candidate.to_lowercase()) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        out.push(candidate);
    }
    out
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_utc()))
}

fn is_bool_word(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no"
    )
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

// `f64::from_str` also accepts "inf" and "NaN"; those stay text.
fn looks_numeric(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
}
