//! Format dispatch.
//!
//! [`IngestionFormat::from_extension`] is the fixed extension → format mapping. A
//! [`SourceReader`] is the tagged reader variant for one format, carrying that format's
//! options; [`SourceReader::load`] decodes a file and writes it into the destination database
//! as exactly one table.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::database::Database;
use crate::error::{IngestionError, IngestionResult, SourceError};
use crate::report::LoadResult;
use crate::types::DataSet;

use super::csv::CsvOptions;
use super::json::JsonOptions;
use super::{csv, json, parquet};

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IngestionFormat {
    /// Comma-separated (or otherwise delimited) text.
    Csv,
    /// JSON array-of-objects or NDJSON.
    Json,
    /// Apache Parquet.
    Parquet,
    /// Spreadsheet/workbook formats (decoded with the `excel` feature).
    Excel,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "tsv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Format for a path, by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for IngestionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestionFormat::Csv => "csv",
            IngestionFormat::Json => "json",
            IngestionFormat::Parquet => "parquet",
            IngestionFormat::Excel => "excel",
        };
        f.write_str(name)
    }
}

/// How to choose the sheet when ingesting an Excel workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExcelSheetSelection {
    /// Ingest the first sheet (default).
    #[default]
    First,
    /// Ingest a single named sheet.
    Named(String),
    /// Ingest the sheet at a 0-based position.
    Index(usize),
}

impl ExcelSheetSelection {
    /// Interpret a user-supplied value: all digits selects by index, anything else by name.
    pub fn parse(value: &str) -> Self {
        match value.parse::<usize>() {
            Ok(idx) => Self::Index(idx),
            Err(_) => Self::Named(value.to_string()),
        }
    }
}

impl fmt::Display for ExcelSheetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcelSheetSelection::First => f.write_str("#0"),
            ExcelSheetSelection::Named(name) => write!(f, "'{name}'"),
            ExcelSheetSelection::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

/// Per-format reader options.
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    pub csv: CsvOptions,
    pub json: JsonOptions,
    pub excel_sheet: ExcelSheetSelection,
}

/// A format reader together with its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReader {
    Parquet,
    Csv(CsvOptions),
    Json(JsonOptions),
    Excel(ExcelSheetSelection),
}

impl SourceReader {
    /// Reader for `format`, configured from `options`.
    pub fn for_format(format: IngestionFormat, options: &ReaderOptions) -> Self {
        match format {
            IngestionFormat::Parquet => SourceReader::Parquet,
            IngestionFormat::Csv => SourceReader::Csv(options.csv.clone()),
            IngestionFormat::Json => SourceReader::Json(options.json.clone()),
            IngestionFormat::Excel => SourceReader::Excel(options.excel_sheet.clone()),
        }
    }

    /// Format handled by this reader.
    pub fn format(&self) -> IngestionFormat {
        match self {
            SourceReader::Parquet => IngestionFormat::Parquet,
            SourceReader::Csv(_) => IngestionFormat::Csv,
            SourceReader::Json(_) => IngestionFormat::Json,
            SourceReader::Excel(_) => IngestionFormat::Excel,
        }
    }

    /// Decode `path` into memory without touching any database.
    pub fn read(&self, path: &Path) -> IngestionResult<DataSet> {
        let result = match self {
            SourceReader::Parquet => parquet::ingest_parquet_from_path(path),
            SourceReader::Csv(opts) => csv::ingest_csv_from_path(path, opts),
            SourceReader::Json(opts) => json::ingest_json_from_path(path, opts),
            SourceReader::Excel(sel) => ingest_excel_dispatch(path, sel),
        };
        result.map_err(|e| IngestionError::from_source(path, e))
    }

    /// Decode `path` and create `table` from it.
    ///
    /// Returns the table's row/column counts as stored in the database. Files that decode to
    /// zero columns produce an [`crate::report::LoadStatus::Empty`] result without a table.
    /// On error no table named `table` is left behind.
    pub fn load(&self, db: &mut Database, path: &Path, table: &str) -> IngestionResult<LoadResult> {
        let started = Instant::now();
        let ds = self.read(path)?;
        if ds.schema.is_empty() {
            return Ok(LoadResult::without_columns(path, table, started.elapsed()).with_notes(ds.notes));
        }

        let db_err = |e: duckdb::Error| IngestionError::from_source(path, SourceError::Database(e));
        db.create_table(table, &ds).map_err(db_err)?;

        let counted = db
            .row_count(table)
            .and_then(|rows| Ok((rows, db.describe(table)?)));
        match counted {
            Ok((rows, schema)) => {
                Ok(LoadResult::loaded(path, table, rows, schema, started.elapsed()).with_notes(ds.notes))
            }
            Err(e) => {
                let _ = db.drop_table_if_exists(table);
                Err(db_err(e))
            }
        }
    }
}

fn ingest_excel_dispatch(path: &Path, sel: &ExcelSheetSelection) -> Result<DataSet, SourceError> {
    #[cfg(feature = "excel")]
    {
        super::excel::ingest_excel_from_path(path, sel)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (path, sel);
        Err(SourceError::MissingDependency {
            capability: "spreadsheet",
            message: "this build does not include excel support (enable cargo feature 'excel')"
                .to_string(),
        })
    }
}
