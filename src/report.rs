//! Per-file outcomes and the run report.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::database::ColumnDescription;
use crate::error::IngestionError;
use crate::ingestion::IngestionFormat;

const RULE_WIDTH: usize = 72;

/// A discovered input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// Lowercased extension.
    pub extension: String,
    /// Format selected from the extension.
    pub format: IngestionFormat,
    /// Derived table name; empty when the stem normalizes to nothing.
    pub table_name: String,
    /// File size in bytes.
    pub bytes: u64,
}

impl SourceFile {
    /// File name for display.
    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }
}

/// Outcome category of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    /// Loaded with at least one row.
    Loaded,
    /// Valid input with zero rows. A warning, not a failure.
    Empty,
    /// Not loaded; see the message.
    Failed,
}

/// The outcome of one file's ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct LoadResult {
    pub source: PathBuf,
    pub table: String,
    pub status: LoadStatus,
    pub rows: u64,
    pub columns: usize,
    /// Column names and database types, empty when no table was created.
    pub schema: Vec<ColumnDescription>,
    /// Indexes created by the index heuristic.
    pub indexes: Vec<String>,
    pub elapsed: Duration,
    pub message: Option<String>,
    /// Non-fatal reader observations.
    pub notes: Vec<String>,
}

impl LoadResult {
    /// Result for a file whose table now exists in the database.
    pub fn loaded(
        source: impl Into<PathBuf>,
        table: impl Into<String>,
        rows: u64,
        schema: Vec<ColumnDescription>,
        elapsed: Duration,
    ) -> Self {
        let status = if rows == 0 { LoadStatus::Empty } else { LoadStatus::Loaded };
        let message = (rows == 0).then(|| "table is empty".to_string());
        Self {
            source: source.into(),
            table: table.into(),
            status,
            rows,
            columns: schema.len(),
            schema,
            indexes: Vec::new(),
            elapsed,
            message,
            notes: Vec::new(),
        }
    }

    /// Result for a file that decoded to no columns at all, so no table was created.
    pub fn without_columns(source: impl Into<PathBuf>, table: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            source: source.into(),
            table: table.into(),
            status: LoadStatus::Empty,
            rows: 0,
            columns: 0,
            schema: Vec::new(),
            indexes: Vec::new(),
            elapsed,
            message: Some("file has no columns; no table was created".to_string()),
            notes: Vec::new(),
        }
    }

    /// Result for a file that failed to load.
    pub fn failed(
        source: impl Into<PathBuf>,
        table: impl Into<String>,
        error: &IngestionError,
        elapsed: Duration,
    ) -> Self {
        Self {
            source: source.into(),
            table: table.into(),
            status: LoadStatus::Failed,
            rows: 0,
            columns: 0,
            schema: Vec::new(),
            indexes: Vec::new(),
            elapsed,
            message: Some(error.to_string()),
            notes: Vec::new(),
        }
    }

    /// Attach reader notes.
    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Attach the indexes created on the table.
    pub fn with_indexes(mut self, indexes: Vec<String>) -> Self {
        self.indexes = indexes;
        self
    }

    /// Whether a table for this file exists in the database.
    pub fn has_table(&self) -> bool {
        self.status != LoadStatus::Failed && self.columns > 0
    }
}

/// Aggregated summary of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub folder: String,
    pub database_path: PathBuf,
    pub results: Vec<LoadResult>,
    pub total_rows: u64,
    pub raw_bytes: u64,
    pub database_bytes: u64,
    pub elapsed: Duration,
    pub schema_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
}

impl RunReport {
    /// Results whose table exists in the database.
    pub fn tables(&self) -> impl Iterator<Item = &LoadResult> {
        self.results.iter().filter(|r| r.has_table())
    }

    /// Results that failed.
    pub fn failures(&self) -> impl Iterator<Item = &LoadResult> {
        self.results.iter().filter(|r| r.status == LoadStatus::Failed)
    }

    /// Results flagged as empty.
    pub fn warnings(&self) -> impl Iterator<Item = &LoadResult> {
        self.results.iter().filter(|r| r.status == LoadStatus::Empty)
    }

    /// Look up the result for a table.
    pub fn result_for_table(&self, table: &str) -> Option<&LoadResult> {
        self.results.iter().find(|r| r.table == table && r.has_table())
    }

    /// Description of every created table, for the schema file.
    pub fn schema_description(&self) -> SchemaDescription {
        SchemaDescription {
            folder: self.folder.clone(),
            database: self.database_path.clone(),
            generated_at: Local::now(),
            tables: self
                .tables()
                .map(|r| TableDescription {
                    name: r.table.clone(),
                    source: r.source.clone(),
                    rows: r.rows,
                    columns: r.schema.clone(),
                    indexes: r.indexes.clone(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(f, "DATABASE SUMMARY: {}", self.folder)?;
        writeln!(f, "{rule}")?;

        for r in self.tables() {
            let flag = if r.status == LoadStatus::Empty { "  (empty)" } else { "" };
            writeln!(
                f,
                "  {:30} {:>14} rows  {:>3} columns{flag}",
                r.table,
                thousands(r.rows),
                r.columns
            )?;
        }

        let skipped: Vec<&LoadResult> = self
            .results
            .iter()
            .filter(|r| !r.has_table())
            .collect();
        if !skipped.is_empty() {
            writeln!(f)?;
            for r in skipped {
                let label = match r.status {
                    LoadStatus::Failed => "FAILED",
                    _ => "SKIPPED",
                };
                writeln!(
                    f,
                    "  {label:7} {}: {}",
                    file_name(&r.source),
                    r.message.as_deref().unwrap_or("")
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "  Total rows:     {}", thousands(self.total_rows))?;
        writeln!(f, "  Raw input size: {}", human_bytes(self.raw_bytes))?;
        writeln!(f, "  Database size:  {}", human_bytes(self.database_bytes))?;
        writeln!(f, "  Elapsed:        {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "  Database:       {}", self.database_path.display())?;
        write!(f, "{rule}")
    }
}

/// Machine-readable description of the produced database.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub folder: String,
    pub database: PathBuf,
    pub generated_at: DateTime<Local>,
    pub tables: Vec<TableDescription>,
}

/// One table in a [`SchemaDescription`].
#[derive(Debug, Clone, Serialize)]
pub struct TableDescription {
    pub name: String,
    pub source: PathBuf,
    pub rows: u64,
    pub columns: Vec<ColumnDescription>,
    pub indexes: Vec<String>,
}

impl SchemaDescription {
    /// Write as pretty-printed JSON.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn human_bytes(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    if bytes as f64 >= MB {
        format!("{:.2} MB", bytes as f64 / MB)
    } else {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    }
}
