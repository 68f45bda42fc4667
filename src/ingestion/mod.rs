//! Format readers.
//!
//! Most callers go through [`SourceReader`] (from [`unified`]), which:
//!
//! - selects a reader from the file extension ([`IngestionFormat::from_extension`])
//! - decodes the file into an in-memory [`crate::types::DataSet`] with an inferred schema
//! - writes it into the destination database as one table ([`SourceReader::load`])
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`parquet`]
//! - `excel` (Cargo feature `excel`, on by default)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod infer;
pub mod json;
pub mod observability;
pub mod parquet;
pub mod unified;

pub use self::csv::CsvOptions;
pub use self::json::JsonOptions;
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    TracingObserver,
};
pub use unified::{ExcelSheetSelection, IngestionFormat, ReaderOptions, SourceReader};
