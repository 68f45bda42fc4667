//! Delimited-text ingestion implementation.

use std::fs;
use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::infer::{ColumnInference, parse_text, sniff, unique_column_names};

/// Delimiters tried when [`CsvOptions::delimiter`] is not set.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Options for the delimited-text reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Infer column types from the values. When `false` every column is text.
    pub auto_detect_types: bool,
    /// Field delimiter; `None` sniffs it from the first line.
    pub delimiter: Option<u8>,
    /// Whether the first record holds column names.
    pub header: bool,
    /// Quote character.
    pub quote: u8,
    /// Escape character inside quoted fields; `None` means doubled quotes (RFC 4180).
    pub escape: Option<u8>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            auto_detect_types: true,
            delimiter: None,
            header: true,
            quote: b'"',
            escape: None,
        }
    }
}

/// Ingest a delimited-text file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - A zero-byte file yields a dataset with no columns.
/// - A header-only file yields the header's columns and zero rows.
/// - Rows shorter than the header are padded with nulls; longer rows are a parse error.
/// - Column types are inferred from all values unless `auto_detect_types` is off.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, options: &CsvOptions) -> SourceResult<DataSet> {
    let bytes = fs::read(path)?;
    ingest_csv_from_bytes(&bytes, options)
}

/// Ingest delimited text already held in memory.
pub fn ingest_csv_from_bytes(input: &[u8], options: &CsvOptions) -> SourceResult<DataSet> {
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| sniff_delimiter(input, options.quote));

    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        .has_headers(options.header)
        .quote(options.quote)
        .double_quote(options.escape.is_none())
        .escape(options.escape)
        .flexible(true);

    let mut rdr = builder.from_reader(input);
    ingest_csv_from_reader(&mut rdr, options)
}

/// Ingest CSV data from an existing CSV reader.
///
/// The reader should be `flexible`; ragged rows are handled here rather than by the `csv` crate.
pub fn ingest_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    options: &CsvOptions,
) -> SourceResult<DataSet> {
    let header = rdr.has_headers();
    let header_names: Vec<String> = if header {
        rdr.headers()
            .map_err(record_error)?
            .iter()
            .map(str::to_owned)
            .collect()
    } else {
        Vec::new()
    };

    let mut records: Vec<csv::StringRecord> = Vec::new();
    for result in rdr.records() {
        records.push(result.map_err(record_error)?);
    }

    let width = if header {
        header_names.len()
    } else {
        records.iter().map(|r| r.len()).max().unwrap_or(0)
    };
    if width == 0 {
        return Ok(DataSet::default());
    }

    let names = if header {
        unique_column_names(header_names)
    } else {
        (0..width).map(|i| format!("column{i}")).collect()
    };

    let mut padded_rows = 0usize;
    for (idx0, record) in records.iter().enumerate() {
        if record.len() > width {
            return Err(SourceError::ParseError {
                row: user_row(idx0, header),
                message: format!("expected {width} fields, found {}", record.len()),
            });
        }
        if record.len() < width {
            padded_rows += 1;
        }
    }

    let mut inference = vec![ColumnInference::default(); width];
    for record in &records {
        for (col, raw) in record.iter().enumerate() {
            let observed = if options.auto_detect_types {
                sniff(raw)
            } else {
                Some(DataType::Utf8).filter(|_| !raw.is_empty())
            };
            if let Some(dt) = observed {
                inference[col].observe(dt);
            }
        }
    }

    let fields: Vec<Field> = names
        .into_iter()
        .zip(inference.iter())
        .map(|(name, inf)| Field::new(name, inf.resolve()))
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(records.len());
    for (idx0, record) in records.iter().enumerate() {
        let mut row: Vec<Value> = Vec::with_capacity(width);
        for (col, field) in fields.iter().enumerate() {
            let raw = record.get(col).unwrap_or("");
            let value = parse_text(raw, field.data_type).map_err(|message| SourceError::ParseError {
                row: user_row(idx0, header),
                message: format!("column '{}': {message} (raw='{raw}')", field.name),
            })?;
            row.push(value);
        }
        rows.push(row);
    }

    let mut ds = DataSet::new(Schema::new(fields), rows);
    if padded_rows > 0 {
        ds = ds.with_note(format!(
            "{padded_rows} row(s) had fewer than {width} fields and were padded with nulls"
        ));
    }
    Ok(ds)
}

/// Pick the candidate delimiter that occurs most often (outside quotes) on the first
/// non-empty line. Falls back to `,`.
pub fn sniff_delimiter(input: &[u8], quote: u8) -> u8 {
    let first_line = input
        .split(|&b| b == b'\n')
        .find(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .unwrap_or(&[]);

    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for &b in first_line {
        if b == quote {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|&d| d == b) {
            counts[i] += 1;
        }
    }

    counts
        .iter()
        .enumerate()
        .filter(|(_, n)| **n > 0)
        .max_by_key(|(i, n)| (**n, std::cmp::Reverse(*i)))
        .map(|(i, _)| CANDIDATE_DELIMITERS[i])
        .unwrap_or(b',')
}

// Report 1-based row numbers; +1 again when the header is row 1.
fn user_row(idx0: usize, header: bool) -> usize {
    if header { idx0 + 2 } else { idx0 + 1 }
}

fn record_error(err: csv::Error) -> SourceError {
    let is_utf8 = matches!(err.kind(), csv::ErrorKind::Utf8 { .. });
    match err.position().map(|p| p.line() as usize) {
        Some(row) if is_utf8 => SourceError::ParseError {
            row,
            message: err.to_string(),
        },
        _ => SourceError::Csv(err),
    }
}
