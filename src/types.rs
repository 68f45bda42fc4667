//! Core data model types for decoded source files.
//!
//! Every format reader produces a [`DataSet`]: an inferred [`Schema`] (a list of typed
//! [`Field`]s) plus row-major [`Value`]s, ready to be written into the destination database.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Logical column type, inferred from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Calendar date.
    Date,
    /// Date and time without a zone (UTC when the source carried an offset).
    Timestamp,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// Column type used in the destination database.
    pub fn sql_name(&self) -> &'static str {
        match self {
            DataType::Bool => "BOOLEAN",
            DataType::Int64 => "BIGINT",
            DataType::Float64 => "DOUBLE",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Utf8 => "VARCHAR",
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing a decoded table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` when the source had no columns at all (e.g. a zero-byte file).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time.
    Timestamp(NaiveDateTime),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// The narrowest type this value fits, or `None` for [`Value::Null`].
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Date(_) => Some(DataType::Date),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::Utf8(_) => Some(DataType::Utf8),
        }
    }

    /// Textual form used when a column widens to [`DataType::Utf8`].
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int64(v) => Some(v.to_string()),
            Value::Float64(v) => Some(v.to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::Utf8(s) => Some(s.clone()),
        }
    }
}

/// In-memory decoded table.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields. `notes`
/// carries non-fatal observations made while decoding (padded rows, serialized arrays, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
    /// Reader warnings worth surfacing in the run log.
    pub notes: Vec<String>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self {
            schema,
            rows,
            notes: Vec::new(),
        }
    }

    /// Attach a reader note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.len()
    }
}
