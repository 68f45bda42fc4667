use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{IngestionError, SourceError};
use crate::report::RunReport;

use super::unified::IngestionFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (file failed).
    Error,
    /// Critical error (typically I/O, database or missing runtime support).
    Critical,
}

impl IngestionSeverity {
    /// Severity of a failed file.
    pub fn for_error(e: &IngestionError) -> Self {
        match e {
            IngestionError::Read { source, .. } => match source {
                SourceError::Io(_) | SourceError::Database(_) => IngestionSeverity::Critical,
                SourceError::Csv(err) => match err.kind() {
                    ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
                    _ => IngestionSeverity::Error,
                },
                _ => IngestionSeverity::Error,
            },
            IngestionError::MissingDependency { .. } => IngestionSeverity::Critical,
            IngestionError::ParseError { .. }
            | IngestionError::NameCollision { .. }
            | IngestionError::InvalidTableName { .. } => IngestionSeverity::Error,
            _ => IngestionSeverity::Critical,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            IngestionSeverity::Info => "INFO",
            IngestionSeverity::Warning => "WARNING",
            IngestionSeverity::Error => "ERROR",
            IngestionSeverity::Critical => "CRITICAL",
        }
    }
}

/// Context about one file's ingestion attempt.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// The input path used for ingestion.
    pub path: PathBuf,
    /// Format used for ingestion.
    pub format: IngestionFormat,
    /// Destination table name.
    pub table: String,
}

/// Minimal stats reported on successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of loaded rows.
    pub rows: u64,
    /// Number of columns in the created table.
    pub columns: usize,
}

/// Observer interface for ingestion runs; the run-scoped logger.
///
/// Implementors can record metrics, logs, or trigger alerts. Every callback has an empty
/// default so observers only implement what they care about.
pub trait IngestionObserver: Send + Sync {
    /// Called once the folder is resolved and files are discovered.
    fn on_run_start(&self, _folder: &str, _files: usize) {}

    /// Called when a file is loaded.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called for non-fatal conditions (empty tables, reader notes, index failures).
    fn on_warning(&self, _ctx: &IngestionContext, _message: &str) {}

    /// Called when a file fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a file failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called once the report is assembled.
    fn on_run_complete(&self, _report: &RunReport) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }

    /// Add another observer.
    pub fn push(&mut self, observer: Arc<dyn IngestionObserver>) {
        self.observers.push(observer);
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_run_start(&self, folder: &str, files: usize) {
        for o in &self.observers {
            o.on_run_start(folder, files);
        }
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_warning(&self, ctx: &IngestionContext, message: &str) {
        for o in &self.observers {
            o.on_warning(ctx, message);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_run_complete(&self, report: &RunReport) {
        for o in &self.observers {
            o.on_run_complete(report);
        }
    }
}

/// Forwards ingestion events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_run_start(&self, folder: &str, files: usize) {
        tracing::info!(folder, files, "building database");
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        tracing::info!(
            format = %ctx.format,
            path = %ctx.path.display(),
            table = %ctx.table,
            rows = stats.rows,
            columns = stats.columns,
            "loaded"
        );
    }

    fn on_warning(&self, ctx: &IngestionContext, message: &str) {
        tracing::warn!(path = %ctx.path.display(), table = %ctx.table, "{message}");
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            ?severity,
            format = %ctx.format,
            path = %ctx.path.display(),
            "{error}"
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            alert = true,
            ?severity,
            format = %ctx.format,
            path = %ctx.path.display(),
            "{error}"
        );
    }

    fn on_run_complete(&self, report: &RunReport) {
        tracing::info!(
            folder = %report.folder,
            tables = report.tables().count(),
            failed = report.failures().count(),
            rows = report.total_rows,
            database = %report.database_path.display(),
            "database created"
        );
    }
}

/// Writes ingestion events to a plain-text run log.
///
/// Writes are best-effort; failures to open/write the log file are ignored.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Create a file observer for a fresh log, truncating any previous one.
    pub fn create(path: impl AsRef<Path>) -> Self {
        let _ = File::create(path.as_ref());
        Self::new(path)
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, severity: IngestionSeverity, message: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} - {} - {message}", timestamp(), severity.label());
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_run_start(&self, folder: &str, files: usize) {
        self.append_line(
            IngestionSeverity::Info,
            &format!("building database for {folder} ({files} compatible file(s))"),
        );
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(
            IngestionSeverity::Info,
            &format!(
                "loaded {} format={} table={} rows={} columns={}",
                ctx.path.display(),
                ctx.format,
                ctx.table,
                stats.rows,
                stats.columns
            ),
        );
    }

    fn on_warning(&self, ctx: &IngestionContext, message: &str) {
        self.append_line(
            IngestionSeverity::Warning,
            &format!("{} table={}: {message}", ctx.path.display(), ctx.table),
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(
            severity,
            &format!("failed {} format={}: {error}", ctx.path.display(), ctx.format),
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(
            severity,
            &format!("ALERT {} format={}: {error}", ctx.path.display(), ctx.format),
        );
    }

    fn on_run_complete(&self, report: &RunReport) {
        self.append_line(
            IngestionSeverity::Info,
            &format!(
                "database created: {} tables={} failed={} rows={} elapsed={:.2}s",
                report.database_path.display(),
                report.tables().count(),
                report.failures().count(),
                report.total_rows,
                report.elapsed.as_secs_f64()
            ),
        );
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
