//! Parquet ingestion implementation.
//!
//! Column types come from the file's embedded schema; nothing is sniffed. Nested groups,
//! lists and maps are stored as their textual form.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime};
use parquet::basic::{ConvertedType, LogicalType, TimeUnit, Type as PhysicalType};
use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field as ParquetField;
use parquet::schema::types::Type as SchemaType;

use crate::error::{SourceError, SourceResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::infer::conform;

/// Ingest a Parquet file into an in-memory `DataSet`.
///
/// Notes:
/// - One column per top-level schema field, typed from the physical + logical type
/// - Uses the Parquet record API (`RowIter`)
pub fn ingest_parquet_from_path(path: impl AsRef<Path>) -> SourceResult<DataSet> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;
    let columns = parquet_schema(&reader);

    let mut nested_columns = false;
    let expected_rows = reader.metadata().file_metadata().num_rows().max(0) as usize;
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(expected_rows);
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        let mut out_row: Vec<Value> = vec![Value::Null; columns.len()];
        for (col, (name, field)) in row.get_column_iter().enumerate() {
            let Some(mapping) = columns.get(col) else {
                return Err(SourceError::ParseError {
                    row: row_num,
                    message: format!("unexpected column '{name}' outside the file schema"),
                });
            };
            nested_columns |= is_nested(field);
            out_row[col] = convert_parquet_field(mapping, field);
        }
        rows.push(out_row);
    }

    let schema = Schema::new(columns.into_iter().map(|c| c.field).collect());
    let mut ds = DataSet::new(schema, rows);
    if nested_columns {
        ds = ds.with_note("nested parquet values were stored as text");
    }
    Ok(ds)
}

fn parquet_schema<R: ChunkReader + 'static>(reader: &SerializedFileReader<R>) -> Vec<ColumnMapping> {
    let root = reader.metadata().file_metadata().schema_descr().root_schema();
    root.get_fields()
        .iter()
        .map(|f| ColumnMapping {
            field: Field::new(f.name(), column_type(f)),
            nanos: has_nanos_unit(f),
        })
        .collect()
}

/// One output column and how its raw integers are scaled.
///
/// The record API hands out nanosecond timestamps and times as plain `Long`s.
struct ColumnMapping {
    field: Field,
    nanos: bool,
}

fn column_type(t: &SchemaType) -> DataType {
    if !t.is_primitive() {
        return DataType::Utf8;
    }

    let info = t.get_basic_info();
    match info.logical_type() {
        Some(LogicalType::Date) => return DataType::Date,
        Some(LogicalType::Timestamp { .. }) => return DataType::Timestamp,
        Some(LogicalType::Decimal { .. }) | Some(LogicalType::Float16) => return DataType::Float64,
        // time of day has no column type of its own; stored as `HH:MM:SS[.fff]`
        Some(LogicalType::Time { .. }) => return DataType::Utf8,
        Some(LogicalType::String) | Some(LogicalType::Json) | Some(LogicalType::Enum) => {
            return DataType::Utf8;
        }
        _ => {}
    }
    match info.converted_type() {
        ConvertedType::DATE => return DataType::Date,
        ConvertedType::TIMESTAMP_MILLIS | ConvertedType::TIMESTAMP_MICROS => {
            return DataType::Timestamp;
        }
        ConvertedType::TIME_MILLIS | ConvertedType::TIME_MICROS => return DataType::Utf8,
        ConvertedType::DECIMAL => return DataType::Float64,
        _ => {}
    }

    match t.get_physical_type() {
        PhysicalType::BOOLEAN => DataType::Bool,
        PhysicalType::INT32 | PhysicalType::INT64 => DataType::Int64,
        PhysicalType::INT96 => DataType::Timestamp,
        PhysicalType::FLOAT | PhysicalType::DOUBLE => DataType::Float64,
        _ => DataType::Utf8,
    }
}

fn has_nanos_unit(t: &SchemaType) -> bool {
    if !t.is_primitive() {
        return false;
    }
    matches!(
        t.get_basic_info().logical_type(),
        Some(LogicalType::Timestamp {
            unit: TimeUnit::NANOS { .. },
            ..
        }) | Some(LogicalType::Time {
            unit: TimeUnit::NANOS { .. },
            ..
        })
    )
}

fn is_nested(f: &ParquetField) -> bool {
    matches!(
        f,
        ParquetField::Group(_) | ParquetField::ListInternal(_) | ParquetField::MapInternal(_)
    )
}

fn convert_parquet_field(mapping: &ColumnMapping, f: &ParquetField) -> Value {
    let data_type = mapping.field.data_type;
    let value = match f {
        ParquetField::Null => Value::Null,
        ParquetField::Long(v) if mapping.nanos => match data_type {
            DataType::Timestamp => Value::Timestamp(DateTime::from_timestamp_nanos(*v).naive_utc()),
            _ => time_of_day(*v),
        },
        ParquetField::Bool(b) => Value::Bool(*b),
        ParquetField::Byte(v) => Value::Int64(i64::from(*v)),
        ParquetField::Short(v) => Value::Int64(i64::from(*v)),
        ParquetField::Int(v) => Value::Int64(i64::from(*v)),
        ParquetField::Long(v) => Value::Int64(*v),
        ParquetField::UByte(v) => Value::Int64(i64::from(*v)),
        ParquetField::UShort(v) => Value::Int64(i64::from(*v)),
        ParquetField::UInt(v) => Value::Int64(i64::from(*v)),
        ParquetField::ULong(v) => match i64::try_from(*v) {
            Ok(v) => Value::Int64(v),
            Err(_) => Value::Float64(*v as f64),
        },
        ParquetField::Float(v) => Value::Float64(f64::from(*v)),
        ParquetField::Double(v) => Value::Float64(*v),
        ParquetField::Str(s) => Value::Utf8(s.clone()),
        ParquetField::Bytes(b) => Value::Utf8(String::from_utf8_lossy(b.data()).into_owned()),
        ParquetField::Date(days) => NaiveDate::default()
            .checked_add_signed(chrono::Duration::days(i64::from(*days)))
            .map_or(Value::Null, Value::Date),
        ParquetField::TimestampMillis(ms) => DateTime::from_timestamp_millis(*ms)
            .map_or(Value::Null, |d| Value::Timestamp(d.naive_utc())),
        ParquetField::TimestampMicros(us) => DateTime::from_timestamp_micros(*us)
            .map_or(Value::Null, |d| Value::Timestamp(d.naive_utc())),
        ParquetField::TimeMillis(ms) => time_of_day(i64::from(*ms) * 1_000_000),
        ParquetField::TimeMicros(us) => time_of_day(us.saturating_mul(1_000)),
        other => Value::Utf8(other.to_string()),
    };

    conform(value, data_type)
}

/// Nanoseconds since midnight as `HH:MM:SS[.fff]` text.
fn time_of_day(nanos: i64) -> Value {
    let secs = nanos.div_euclid(1_000_000_000);
    let sub = nanos.rem_euclid(1_000_000_000);
    match (u32::try_from(secs), u32::try_from(sub)) {
        (Ok(secs), Ok(sub)) => NaiveTime::from_num_seconds_from_midnight_opt(secs, sub)
            .map_or(Value::Null, |t| Value::Utf8(t.format("%H:%M:%S%.f").to_string())),
        _ => Value::Null,
    }
}
