#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{Data, DataType as _, Range, Reader, open_workbook_auto};

use crate::error::{SourceError, SourceResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::infer::{ColumnInference, coerce, parse_timestamp, sniff_temporal, unique_column_names};
use super::unified::ExcelSheetSelection;

/// Ingest one sheet of an Excel document (`.xlsx`, `.xls`, `.ods`, etc.) into an in-memory
/// `DataSet`.
///
/// Behavior:
/// - Picks the sheet named or indexed by `selection`; otherwise uses the first sheet
/// - Detects the first non-empty row as the header row
/// - Skips data rows where every cell is empty
/// - Infers each column's type from its cells
pub fn ingest_excel_from_path(
    path: impl AsRef<Path>,
    selection: &ExcelSheetSelection,
) -> SourceResult<DataSet> {
    let mut workbook = open_workbook_auto(path)?;

    let sheets = workbook.sheet_names().to_vec();
    let sheet = match selection {
        ExcelSheetSelection::First => sheets.first().cloned(),
        ExcelSheetSelection::Named(name) => Some(name.clone()),
        ExcelSheetSelection::Index(idx) => sheets.get(*idx).cloned(),
    }
    .ok_or_else(|| SourceError::Unsupported {
        message: format!("sheet {selection} not found (workbook has {} sheet(s))", sheets.len()),
    })?;

    let range = workbook.worksheet_range(&sheet)?;
    ingest_sheet_range(&sheet, &range)
}

fn ingest_sheet_range(sheet: &str, range: &Range<Data>) -> SourceResult<DataSet> {
    let Some((header_row_idx, header_cells)) = find_header_row(range) else {
        return Ok(DataSet::default()
            .with_note(format!("sheet '{sheet}' has no non-empty rows")));
    };
    let width = header_cells.len();

    let mut error_cells = 0usize;
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row) in range.rows().enumerate() {
        if idx0 <= header_row_idx || row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let mut out_row: Vec<Value> = Vec::with_capacity(width);
        for col_idx in 0..width {
            let cell = row.get(col_idx).unwrap_or(&Data::Empty);
            if matches!(cell, Data::Error(_)) {
                error_cells += 1;
            }
            out_row.push(convert_cell(cell));
        }
        rows.push(out_row);
    }

    let mut inference = vec![ColumnInference::default(); width];
    for row in &rows {
        for (col, value) in row.iter().enumerate() {
            inference[col].observe_value(value);
        }
    }
    let fields: Vec<Field> = unique_column_names(header_cells)
        .into_iter()
        .zip(inference.iter())
        .map(|(name, inf)| Field::new(name, inf.resolve()))
        .collect();

    let rows: Vec<Vec<Value>> = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(fields.iter())
                .map(|(value, field)| coerce(value, field.data_type))
                .collect()
        })
        .collect();

    let mut ds = DataSet::new(Schema::new(fields), rows);
    if error_cells > 0 {
        ds = ds.with_note(format!(
            "sheet '{sheet}': {error_cells} error cell(s) were loaded as nulls"
        ));
    }
    Ok(ds)
}

fn find_header_row(range: &Range<Data>) -> Option<(usize, Vec<String>)> {
    range.rows().enumerate().find_map(|(idx0, row)| {
        let non_empty = row.iter().any(|c| !matches!(c, Data::Empty));
        non_empty.then(|| (idx0, row.iter().map(cell_to_header_string).collect()))
    })
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => "".to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => match sniff_temporal(s) {
            DataType::Utf8 => Value::Utf8(s.clone()),
            dt => coerce(Value::Utf8(s.clone()), dt),
        },
        Data::DateTime(_) => c
            .as_datetime()
            .map_or_else(|| Value::Utf8(c.to_string()), Value::Timestamp),
        Data::DateTimeIso(s) => parse_timestamp(s).map_or_else(|| Value::Utf8(s.clone()), Value::Timestamp),
        Data::DurationIso(s) => Value::Utf8(s.clone()),
    }
}
