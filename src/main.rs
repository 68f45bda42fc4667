use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use data_drop_ingest::ingestion::{CsvOptions, ExcelSheetSelection, JsonOptions, ReaderOptions};
use data_drop_ingest::orchestrator::{ALL_FOLDERS, ExistingDatabasePolicy, IngestConfig, Ingestor};

#[derive(Parser, Debug)]
#[command(name = "data-drop-ingest")]
#[command(about = "Build data/processed/<folder>.duckdb from the files in data/raw/<folder>")]
struct Args {
    /// Folder under data/raw to ingest, or `all` for every folder
    folder: String,

    /// Project root containing data/raw (default: nearest ancestor of the current directory that has one)
    #[arg(short, long)]
    base_path: Option<PathBuf>,

    /// Replace an existing database instead of failing
    #[arg(long)]
    overwrite: bool,

    /// Field delimiter for delimited text (single character, or `tab`); sniffed when omitted
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<u8>,

    /// Delimited files have no header row
    #[arg(long)]
    no_header: bool,

    /// Load every text column as VARCHAR instead of inferring types
    #[arg(long)]
    no_type_detection: bool,

    /// Spreadsheet sheet to load, by name or 0-based index (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// Do not write data/processed/<folder>_schema.json
    #[arg(long)]
    no_schema_file: bool,

    /// Do not write data/processed/<folder>.log
    #[arg(long)]
    no_run_log: bool,

    /// Debug-level console logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_delimiter(value: &str) -> Result<u8> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        v if v.len() == 1 && v.is_ascii() => Ok(v.as_bytes()[0]),
        v => bail!("delimiter must be a single ASCII character or `tab`, got '{v}'"),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

impl Args {
    fn config(&self) -> IngestConfig {
        IngestConfig {
            reader: ReaderOptions {
                csv: CsvOptions {
                    auto_detect_types: !self.no_type_detection,
                    delimiter: self.delimiter,
                    header: !self.no_header,
                    ..CsvOptions::default()
                },
                json: JsonOptions {
                    auto_detect: !self.no_type_detection,
                },
                excel_sheet: self
                    .sheet
                    .as_deref()
                    .map(ExcelSheetSelection::parse)
                    .unwrap_or_default(),
            },
            existing_database: if self.overwrite {
                ExistingDatabasePolicy::Overwrite
            } else {
                ExistingDatabasePolicy::Fail
            },
            write_schema_file: !self.no_schema_file,
            write_run_log: !self.no_run_log,
            ..IngestConfig::default()
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let ingestor = Ingestor::new(args.config());
    tracing::debug!(config = ?ingestor.config(), "starting");

    if args.folder == ALL_FOLDERS {
        let outcomes = match ingestor.ingest_all(args.base_path.as_deref()) {
            Ok(outcomes) => outcomes,
            Err(e) => {
                tracing::error!("{e}");
                return Ok(ExitCode::FAILURE);
            }
        };
        let mut failed = 0usize;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(report) => println!("{report}\n"),
                Err(_) => failed += 1,
            }
        }
        tracing::info!(folders = outcomes.len(), failed, "all folders processed");
        return Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    match ingestor.ingest(&args.folder, args.base_path.as_deref()) {
        Ok(report) => {
            println!("{report}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
