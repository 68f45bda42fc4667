#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use data_drop_ingest::IngestConfig;

fn nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

/// Fresh file path under the system temp dir.
pub fn tmp_file(name: &str, ext: &str) -> PathBuf {
    std::env::temp_dir().join(format!("data-drop-ingest-{name}-{}.{ext}", nanos()))
}

/// Fresh project root with an empty `data/raw/<folder>`. Returns `(base, raw_dir)`.
pub fn project(name: &str, folder: &str) -> (PathBuf, PathBuf) {
    let base = std::env::temp_dir().join(format!("data-drop-ingest-{name}-{}", nanos()));
    let raw = base.join("data").join("raw").join(folder);
    fs::create_dir_all(&raw).unwrap();
    (base, raw)
}

pub fn write(dir: &Path, file: &str, contents: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, contents).unwrap();
    path
}

pub fn copy_fixture(dir: &Path, fixture: &str) -> PathBuf {
    let path = dir.join(fixture);
    fs::copy(Path::new("tests/fixtures").join(fixture), &path).unwrap();
    path
}

/// Config without console observers.
pub fn quiet_config() -> IngestConfig {
    IngestConfig {
        observer: None,
        ..IngestConfig::default()
    }
}

/// Writes `id INT64, name UTF8, score DOUBLE, active BOOLEAN, joined DATE` with two rows;
/// `score` is optional and null in the second row.
pub fn write_people_parquet(path: &Path) {
    let schema_str = r#"
    message schema {
      REQUIRED INT64 id;
      REQUIRED BINARY name (UTF8);
      OPTIONAL DOUBLE score;
      REQUIRED BOOLEAN active;
      REQUIRED INT32 joined (DATE);
    }
    "#;

    let schema = Arc::new(parse_message_type(schema_str).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    let mut rg = writer.next_row_group().unwrap();
    while let Some(mut col) = rg.next_column().unwrap() {
        match col.untyped() {
            ColumnWriter::Int64ColumnWriter(w) => {
                w.write_batch(&[1_i64, 2_i64], None, None).unwrap();
            }
            ColumnWriter::ByteArrayColumnWriter(w) => {
                let names = [ByteArray::from("Ada"), ByteArray::from("Grace")];
                w.write_batch(&names, None, None).unwrap();
            }
            ColumnWriter::DoubleColumnWriter(w) => {
                // second row is null
                w.write_batch(&[98.5_f64], Some(&[1, 0]), None).unwrap();
            }
            ColumnWriter::BoolColumnWriter(w) => {
                w.write_batch(&[true, false], None, None).unwrap();
            }
            ColumnWriter::Int32ColumnWriter(w) => {
                // 2024-01-01, 2024-02-01
                w.write_batch(&[19_723_i32, 19_754_i32], None, None).unwrap();
            }
            _ => panic!("unexpected column writer in test"),
        }
        col.close().unwrap();
    }
    rg.close().unwrap();
    writer.close().unwrap();
}
