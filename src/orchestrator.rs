//! The ingestion orchestrator: discover files, derive table names, dispatch readers, index,
//! and aggregate a [`RunReport`].
//!
//! Files are processed strictly in file-name order on one database connection. Folder-level
//! failures abort before the database is touched; file-level failures are recorded in the
//! report and the run moves on to the next file.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use walkdir::WalkDir;

use crate::database::Database;
use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::{
    CompositeObserver, FileObserver, IngestionContext, IngestionFormat, IngestionObserver,
    IngestionSeverity, IngestionStats, ReaderOptions, SourceReader, TracingObserver,
};
use crate::paths::{BasePathResolver, MarkerWalkResolver, ProjectLayout};
use crate::report::{LoadResult, LoadStatus, RunReport, SourceFile};

/// Column names (compared case-insensitively) that receive an index after loading.
pub const INDEX_CANDIDATES: [&str; 5] = ["timestamp", "channel_id", "id", "date", "datetime"];

/// Folder identifier that ingests every folder under `data/raw`.
pub const ALL_FOLDERS: &str = "all";

/// What to do when the destination database file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingDatabasePolicy {
    /// Abort the run with [`IngestionError::DatabaseExists`].
    #[default]
    Fail,
    /// Delete the database (and its write-ahead log) and build it fresh.
    Overwrite,
}

/// Run configuration.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestConfig {
    /// How to find the project root when no explicit base path is given.
    pub resolver: Arc<dyn BasePathResolver>,
    /// Per-format reader options.
    pub reader: ReaderOptions,
    pub existing_database: ExistingDatabasePolicy,
    /// Write `data/processed/<folder>_schema.json`.
    pub write_schema_file: bool,
    /// Write `data/processed/<folder>.log`.
    pub write_run_log: bool,
    /// Observer for logging/alerts, in addition to the run log.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Minimum severity that triggers `on_alert`.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("reader", &self.reader)
            .field("existing_database", &self.existing_database)
            .field("write_schema_file", &self.write_schema_file)
            .field("write_run_log", &self.write_run_log)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            resolver: Arc::new(MarkerWalkResolver::new()),
            reader: ReaderOptions::default(),
            existing_database: ExistingDatabasePolicy::default(),
            write_schema_file: true,
            write_run_log: true,
            observer: Some(Arc::new(TracingObserver)),
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Outcome of one folder in an `all` run.
#[derive(Debug)]
pub struct FolderOutcome {
    pub folder: String,
    pub result: IngestionResult<RunReport>,
}

/// Runs ingestion with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Explicit base path wins; otherwise ask the configured resolver.
    pub fn resolve_base(&self, base_path: Option<&Path>) -> IngestionResult<PathBuf> {
        match base_path {
            Some(p) => Ok(p.to_path_buf()),
            None => self.config.resolver.resolve(),
        }
    }

    /// Build `data/processed/<folder>.duckdb` from the files in `data/raw/<folder>`.
    ///
    /// Fails only for folder-level problems (see [`IngestionError::is_fatal`]); every file-level
    /// failure is recorded in the returned report.
    pub fn ingest(&self, folder: &str, base_path: Option<&Path>) -> IngestionResult<RunReport> {
        let started = Instant::now();
        let layout = ProjectLayout::new(self.resolve_base(base_path)?, folder);
        let files = discover_files(&layout.raw_dir())?;

        let db_path = layout.database_path();
        self.prepare_destination(&db_path)?;
        fs::create_dir_all(layout.processed_dir())?;

        let mut observers = CompositeObserver::default();
        if let Some(obs) = &self.config.observer {
            observers.push(Arc::clone(obs));
        }
        let log_path = self.config.write_run_log.then(|| layout.log_path());
        if let Some(path) = &log_path {
            observers.push(Arc::new(FileObserver::create(path)));
        }
        observers.on_run_start(folder, files.len());

        let mut db = Database::open(&db_path)?;
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        let mut results = Vec::with_capacity(files.len());
        for file in &files {
            results.push(self.ingest_file(&mut db, file, &mut claimed, &observers));
        }
        db.close()?;

        let mut report = RunReport {
            folder: folder.to_string(),
            database_bytes: fs::metadata(&db_path).map_or(0, |m| m.len()),
            database_path: db_path,
            total_rows: results.iter().filter(|r| r.has_table()).map(|r| r.rows).sum(),
            raw_bytes: files.iter().map(|f| f.bytes).sum(),
            results,
            elapsed: started.elapsed(),
            schema_path: None,
            log_path,
        };

        if self.config.write_schema_file {
            let path = layout.schema_path();
            match report.schema_description().write_to(&path) {
                Ok(()) => report.schema_path = Some(path),
                Err(e) => tracing::warn!(path = %path.display(), "could not write schema file: {e}"),
            }
        }

        observers.on_run_complete(&report);
        Ok(report)
    }

    /// Run [`Self::ingest`] for every folder under `data/raw`, in name order.
    ///
    /// A fatal error in one folder is recorded in its [`FolderOutcome`]; the remaining folders
    /// still run.
    pub fn ingest_all(&self, base_path: Option<&Path>) -> IngestionResult<Vec<FolderOutcome>> {
        let base = self.resolve_base(base_path)?;
        let raw_root = ProjectLayout::new(base.as_path(), "").raw_root();
        if !raw_root.is_dir() {
            return Err(IngestionError::FolderNotFound { path: raw_root });
        }

        let mut folders = Vec::new();
        for entry in WalkDir::new(&raw_root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_dir() {
                folders.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        Ok(folders
            .into_iter()
            .map(|folder| {
                let result = self.ingest(&folder, Some(base.as_path()));
                if let Err(e) = &result {
                    tracing::error!(folder = %folder, "{e}");
                }
                FolderOutcome { folder, result }
            })
            .collect())
    }

    fn prepare_destination(&self, db_path: &Path) -> IngestionResult<()> {
        if !db_path.exists() {
            return Ok(());
        }
        match self.config.existing_database {
            ExistingDatabasePolicy::Fail => Err(IngestionError::DatabaseExists {
                path: db_path.to_path_buf(),
            }),
            ExistingDatabasePolicy::Overwrite => {
                fs::remove_file(db_path)?;
                let wal = wal_path(db_path);
                if wal.exists() {
                    fs::remove_file(wal)?;
                }
                Ok(())
            }
        }
    }

    fn ingest_file(
        &self,
        db: &mut Database,
        file: &SourceFile,
        claimed: &mut HashMap<String, PathBuf>,
        observer: &dyn IngestionObserver,
    ) -> LoadResult {
        let started = Instant::now();
        let ctx = IngestionContext {
            path: file.path.clone(),
            format: file.format,
            table: file.table_name.clone(),
        };

        match self.load_file(db, file, claimed) {
            Ok(result) => {
                for note in &result.notes {
                    observer.on_warning(&ctx, note);
                }
                if !result.has_table() {
                    observer.on_warning(&ctx, result.message.as_deref().unwrap_or("no table created"));
                    return result;
                }

                let indexes = create_indexes(db, &result, &ctx, observer);
                let comment = format!("Loaded from {}", file.file_name());
                if let Err(e) = db.comment_on_table(&result.table, &comment) {
                    observer.on_warning(&ctx, &format!("could not comment on table: {e}"));
                }

                observer.on_success(
                    &ctx,
                    IngestionStats {
                        rows: result.rows,
                        columns: result.columns,
                    },
                );
                if result.status == LoadStatus::Empty {
                    observer.on_warning(&ctx, "table is empty");
                }
                result.with_indexes(indexes)
            }
            Err(e) => {
                let severity = IngestionSeverity::for_error(&e);
                observer.on_failure(&ctx, severity, &e);
                if severity >= self.config.alert_at_or_above {
                    observer.on_alert(&ctx, severity, &e);
                }
                LoadResult::failed(&file.path, &file.table_name, &e, started.elapsed())
            }
        }
    }

    fn load_file(
        &self,
        db: &mut Database,
        file: &SourceFile,
        claimed: &mut HashMap<String, PathBuf>,
    ) -> IngestionResult<LoadResult> {
        if file.table_name.is_empty() {
            return Err(IngestionError::InvalidTableName {
                path: file.path.clone(),
            });
        }
        if let Some(existing) = claimed.get(&file.table_name) {
            return Err(IngestionError::NameCollision {
                path: file.path.clone(),
                table: file.table_name.clone(),
                existing: existing.clone(),
            });
        }
        claimed.insert(file.table_name.clone(), file.path.clone());

        SourceReader::for_format(file.format, &self.config.reader).load(db, &file.path, &file.table_name)
    }
}

/// Ingest one folder with the default configuration.
pub fn ingest(folder: &str, base_path: Option<&Path>) -> IngestionResult<RunReport> {
    Ingestor::default().ingest(folder, base_path)
}

/// Ingest every folder under `data/raw` with the default configuration.
pub fn ingest_all(base_path: Option<&Path>) -> IngestionResult<Vec<FolderOutcome>> {
    Ingestor::default().ingest_all(base_path)
}

/// List the recognized files directly inside `dir`, sorted by file name.
///
/// Files with unrecognized extensions and subdirectories are ignored.
pub fn discover_files(dir: &Path) -> IngestionResult<Vec<SourceFile>> {
    if !dir.is_dir() {
        return Err(IngestionError::FolderNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(format) = IngestionFormat::from_path(path) else {
            continue;
        };
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let bytes = entry.metadata().map_err(io::Error::from)?.len();
        files.push(SourceFile {
            table_name: derive_table_name(path),
            path: path.to_path_buf(),
            extension,
            format,
            bytes,
        });
    }

    if files.is_empty() {
        return Err(IngestionError::NoCompatibleFiles {
            path: dir.to_path_buf(),
        });
    }
    Ok(files)
}

/// Table name for a source file.
///
/// Lowercases the file stem, collapses every run of non-alphanumeric characters into one
/// underscore, and trims underscores from both ends. Letters and digits outside ASCII are
/// kept (`Ärger.csv` → `ärger`). May return an empty string.
pub fn derive_table_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut name = String::with_capacity(stem.len());
    let mut pending_sep = false;
    for c in stem.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !name.is_empty() {
                name.push('_');
            }
            pending_sep = false;
            name.push(c);
        } else {
            pending_sep = true;
        }
    }
    name
}

/// Columns that match [`INDEX_CANDIDATES`], in table order.
pub fn index_candidates(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| INDEX_CANDIDATES.iter().any(|cand| c.eq_ignore_ascii_case(cand)))
        .cloned()
        .collect()
}

fn create_indexes(
    db: &Database,
    result: &LoadResult,
    ctx: &IngestionContext,
    observer: &dyn IngestionObserver,
) -> Vec<String> {
    let columns: Vec<String> = result.schema.iter().map(|c| c.name.clone()).collect();
    let mut created = Vec::new();
    for column in index_candidates(&columns) {
        match db.create_index(&result.table, &column) {
            Ok(index) => created.push(index),
            Err(e) => observer.on_warning(ctx, &format!("could not create index on '{column}': {e}")),
        }
    }
    created
}

fn wal_path(db_path: &Path) -> PathBuf {
    let mut wal = db_path.as_os_str().to_owned();
    wal.push(".wal");
    PathBuf::from(wal)
}
