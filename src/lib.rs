//! `data-drop-ingest` consolidates a folder of heterogeneous tabular files into one DuckDB
//! database, one table per file.
//!
//! The primary entrypoint is [`orchestrator::ingest`] (or [`orchestrator::Ingestor`] for a custom
//! [`orchestrator::IngestConfig`]). Given a folder identifier it:
//!
//! - resolves the project root (explicit base path, else the nearest ancestor holding `data/raw`)
//! - lists `data/raw/<folder>/` and keeps files with a recognized extension, sorted by name
//! - derives a table name per file and loads it with the matching reader
//! - indexes well-known columns and writes `data/processed/<folder>.duckdb`
//! - returns a [`report::RunReport`] with per-file outcomes and totals
//!
//! ## What you can ingest
//!
//! **File formats (selected by extension, case-insensitive):**
//!
//! - **Delimited text**: `.csv`, `.tsv`
//! - **JSON**: `.json` (array of objects, or one object) and `.ndjson` (one object per line)
//! - **Parquet**: `.parquet`, `.pq`
//! - **Spreadsheets** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! Column types are inferred from the data for text formats and taken from the embedded schema
//! for Parquet. See [`types::DataType`] for the supported logical types.
//!
//! ## Quick example
//!
//! ```no_run
//! use data_drop_ingest::orchestrator::ingest;
//!
//! # fn main() -> Result<(), data_drop_ingest::IngestionError> {
//! // Reads ./data/raw/sensors/*, writes ./data/processed/sensors.duckdb
//! let report = ingest("sensors", Some(std::path::Path::new(".")))?;
//! println!("{report}");
//! for failed in report.failures() {
//!     eprintln!("{}: {:?}", failed.source.display(), failed.message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure model
//!
//! Folder-level problems (missing folder, no compatible files, existing database) abort the
//! run. Every file-level problem (unreadable file, malformed row, name collision, missing
//! spreadsheet support) is recorded in the report and the remaining files still load. Index
//! creation failures are only warnings.
//!
//! ## Modules
//!
//! - [`orchestrator`]: discovery, naming, dispatch, indexing and aggregation
//! - [`ingestion`]: format readers and the run-scoped observers
//! - [`database`]: the DuckDB destination
//! - [`paths`]: project root discovery and output layout
//! - [`report`]: per-file results, run report, schema description
//! - [`types`]: in-memory decoded tables
//! - [`error`]: error types

pub mod database;
pub mod error;
pub mod ingestion;
pub mod orchestrator;
pub mod paths;
pub mod report;
pub mod types;

pub use error::{IngestionError, IngestionResult, SourceError};
pub use orchestrator::{ExistingDatabasePolicy, IngestConfig, Ingestor, ingest, ingest_all};
pub use report::{LoadResult, LoadStatus, RunReport};
