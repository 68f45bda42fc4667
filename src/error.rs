use std::path::{Path, PathBuf};

use thiserror::Error;

/// Convenience result type for run- and file-level operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for the format readers.
pub type SourceResult<T> = Result<T, SourceError>;

/// Failure raised by a format reader while decoding one file.
///
/// Readers do not know which run they belong to; [`IngestionError::from_source`] attaches the
/// file path once the failure leaves the reader.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parquet decoding error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The destination database rejected the decoded table.
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    /// The file decodes, but its shape cannot become a table (e.g. a JSON scalar).
    #[error("unsupported input: {message}")]
    Unsupported { message: String },

    /// A row could not be decoded even with best-effort inference.
    #[error("failed to parse row {row}: {message}")]
    ParseError { row: usize, message: String },

    /// The runtime was built without the capability needed for this format.
    #[error("{capability} support is not available: {message}")]
    MissingDependency {
        capability: &'static str,
        message: String,
    },
}

/// Error type returned by the orchestrator and the reader wrappers.
///
/// Folder-level variants abort a run; file-level variants are recorded against a single file
/// while the rest of the folder keeps loading.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The resolved `data/raw/<folder>` directory does not exist.
    #[error("folder not found: {}", path.display())]
    FolderNotFound { path: PathBuf },

    /// The folder exists but holds no file with a recognized extension.
    #[error("no compatible files (csv, tsv, json, ndjson, parquet, xlsx, ...) in {}", path.display())]
    NoCompatibleFiles { path: PathBuf },

    /// The destination database exists and the run was not allowed to replace it.
    #[error("destination database already exists: {} (rerun with --overwrite to replace it)", path.display())]
    DatabaseExists { path: PathBuf },

    /// Run-level I/O error (creating the output directory, stat-ing outputs).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Run-level database error (opening or closing the destination).
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    /// A source file could not be read or loaded.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    /// A source file has a row that cannot be decoded.
    #[error("failed to parse {} at row {row}: {message}", path.display())]
    ParseError {
        path: PathBuf,
        row: usize,
        message: String,
    },

    /// A source file needs a capability this build does not have.
    #[error("cannot load {}: {capability} support is not available: {message}", path.display())]
    MissingDependency {
        path: PathBuf,
        capability: &'static str,
        message: String,
    },

    /// Two source files normalize to the same table name.
    #[error(
        "table name '{table}' derived from {} is already taken by {}",
        path.display(),
        existing.display()
    )]
    NameCollision {
        path: PathBuf,
        table: String,
        existing: PathBuf,
    },

    /// The file stem has no characters left after name normalization.
    #[error("cannot derive a table name from {}", path.display())]
    InvalidTableName { path: PathBuf },
}

impl IngestionError {
    /// Attach a source path to a reader failure.
    pub fn from_source(path: &Path, err: SourceError) -> Self {
        match err {
            SourceError::ParseError { row, message } => IngestionError::ParseError {
                path: path.to_path_buf(),
                row,
                message,
            },
            SourceError::MissingDependency {
                capability,
                message,
            } => IngestionError::MissingDependency {
                path: path.to_path_buf(),
                capability,
                message,
            },
            other => IngestionError::Read {
                path: path.to_path_buf(),
                source: other,
            },
        }
    }

    /// Whether this error aborts the whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestionError::FolderNotFound { .. }
                | IngestionError::NoCompatibleFiles { .. }
                | IngestionError::DatabaseExists { .. }
                | IngestionError::Io(_)
                | IngestionError::Database(_)
        )
    }

    /// Path of the source file this error belongs to, for file-level errors.
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            IngestionError::Read { path, .. }
            | IngestionError::ParseError { path, .. }
            | IngestionError::MissingDependency { path, .. }
            | IngestionError::NameCollision { path, .. }
            | IngestionError::InvalidTableName { path } => Some(path),
            _ => None,
        }
    }
}
