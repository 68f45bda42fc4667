//! Project root discovery and the `data/raw` → `data/processed` layout.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::IngestionResult;

/// Relative directory whose presence marks a project root.
pub const ROOT_MARKER: &str = "data/raw";

/// Extension of the produced database file.
pub const DATABASE_EXTENSION: &str = "duckdb";

/// Strategy for finding the project root when no base path is given.
pub trait BasePathResolver: Send + Sync {
    /// Resolve the project root.
    fn resolve(&self) -> IngestionResult<PathBuf>;
}

/// Walks upward looking for a directory that contains [`ROOT_MARKER`].
///
/// Starts at `start` (the current directory when unset) and checks it and each ancestor in
/// turn, stopping at the filesystem root. When no ancestor has the marker, the start directory
/// itself is returned, so a missing folder surfaces as `FolderNotFound` under it.
#[derive(Debug, Clone)]
pub struct MarkerWalkResolver {
    start: Option<PathBuf>,
    marker: PathBuf,
}

impl MarkerWalkResolver {
    /// Resolver starting from the current directory.
    pub fn new() -> Self {
        Self {
            start: None,
            marker: PathBuf::from(ROOT_MARKER),
        }
    }

    /// Resolver starting from an explicit directory.
    pub fn starting_at(start: impl Into<PathBuf>) -> Self {
        Self {
            start: Some(start.into()),
            marker: PathBuf::from(ROOT_MARKER),
        }
    }

    /// Use a different marker (relative path to a directory).
    pub fn with_marker(mut self, marker: impl Into<PathBuf>) -> Self {
        self.marker = marker.into();
        self
    }

    /// First of `start` and its ancestors containing the marker directory.
    pub fn find_from(&self, start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(&self.marker).is_dir())
            .map(Path::to_path_buf)
    }
}

impl Default for MarkerWalkResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BasePathResolver for MarkerWalkResolver {
    fn resolve(&self) -> IngestionResult<PathBuf> {
        let start = match &self.start {
            Some(dir) => dir.clone(),
            None => env::current_dir()?,
        };
        Ok(self.find_from(&start).unwrap_or(start))
    }
}

/// Always resolves to the same directory.
#[derive(Debug, Clone)]
pub struct FixedBasePath(pub PathBuf);

impl BasePathResolver for FixedBasePath {
    fn resolve(&self) -> IngestionResult<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Input and output locations for one folder identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub base: PathBuf,
    pub folder: String,
}

impl ProjectLayout {
    pub fn new(base: impl Into<PathBuf>, folder: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            folder: folder.into(),
        }
    }

    /// `<base>/data/raw`
    pub fn raw_root(&self) -> PathBuf {
        self.base.join("data").join("raw")
    }

    /// `<base>/data/raw/<folder>`
    pub fn raw_dir(&self) -> PathBuf {
        self.raw_root().join(&self.folder)
    }

    /// `<base>/data/processed`
    pub fn processed_dir(&self) -> PathBuf {
        self.base.join("data").join("processed")
    }

    /// `<base>/data/processed/<folder>.duckdb`
    pub fn database_path(&self) -> PathBuf {
        self.processed_dir()
            .join(format!("{}.{DATABASE_EXTENSION}", self.folder))
    }

    /// `<base>/data/processed/<folder>_schema.json`
    pub fn schema_path(&self) -> PathBuf {
        self.processed_dir().join(format!("{}_schema.json", self.folder))
    }

    /// `<base>/data/processed/<folder>.log`
    pub fn log_path(&self) -> PathBuf {
        self.processed_dir().join(format!("{}.log", self.folder))
    }
}
