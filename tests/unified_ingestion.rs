mod common;

use std::path::Path;

use data_drop_ingest::IngestionError;
use data_drop_ingest::database::Database;
use data_drop_ingest::ingestion::{
    CsvOptions, ExcelSheetSelection, IngestionFormat, ReaderOptions, SourceReader,
};
use data_drop_ingest::report::LoadStatus;
use data_drop_ingest::types::{DataSet, DataType, Field, Schema, Value};

use common::tmp_file;

#[test]
fn extension_mapping_is_fixed_and_case_insensitive() {
    assert_eq!(IngestionFormat::from_extension("csv"), Some(IngestionFormat::Csv));
    assert_eq!(IngestionFormat::from_extension("TSV"), Some(IngestionFormat::Csv));
    assert_eq!(IngestionFormat::from_extension("Json"), Some(IngestionFormat::Json));
    assert_eq!(IngestionFormat::from_extension("ndjson"), Some(IngestionFormat::Json));
    assert_eq!(IngestionFormat::from_extension("parquet"), Some(IngestionFormat::Parquet));
    assert_eq!(IngestionFormat::from_extension("PQ"), Some(IngestionFormat::Parquet));
    for ext in ["xlsx", "xls", "xlsm", "xlsb", "ods"] {
        assert_eq!(IngestionFormat::from_extension(ext), Some(IngestionFormat::Excel));
    }
    assert_eq!(IngestionFormat::from_extension("txt"), None);
    assert_eq!(IngestionFormat::from_path(Path::new("notes")), None);
    assert_eq!(
        IngestionFormat::from_path(Path::new("dir/Report.XLSX")),
        Some(IngestionFormat::Excel)
    );
}

#[test]
fn reader_variant_carries_format_options() {
    let opts = ReaderOptions {
        csv: CsvOptions {
            delimiter: Some(b';'),
            ..CsvOptions::default()
        },
        excel_sheet: ExcelSheetSelection::Index(2),
        ..ReaderOptions::default()
    };

    let csv = SourceReader::for_format(IngestionFormat::Csv, &opts);
    assert_eq!(csv.format(), IngestionFormat::Csv);
    assert!(matches!(csv, SourceReader::Csv(ref o) if o.delimiter == Some(b';')));

    let excel = SourceReader::for_format(IngestionFormat::Excel, &opts);
    assert_eq!(excel, SourceReader::Excel(ExcelSheetSelection::Index(2)));
    assert_eq!(
        SourceReader::for_format(IngestionFormat::Parquet, &opts),
        SourceReader::Parquet
    );
}

#[test]
fn sheet_selection_parses_names_and_indexes() {
    assert_eq!(ExcelSheetSelection::parse("0"), ExcelSheetSelection::Index(0));
    assert_eq!(
        ExcelSheetSelection::parse("Data"),
        ExcelSheetSelection::Named("Data".to_string())
    );
    assert_eq!(ExcelSheetSelection::default(), ExcelSheetSelection::First);
}

#[test]
fn csv_load_reports_database_counts() {
    let path = tmp_file("unified", "csv");
    std::fs::write(&path, "id,value\n1,a\n2,b\n3,c\n").unwrap();

    let mut db = Database::open_in_memory().unwrap();
    let reader = SourceReader::for_format(IngestionFormat::Csv, &ReaderOptions::default());
    let result = reader.load(&mut db, &path, "values_table").unwrap();

    assert_eq!(result.status, LoadStatus::Loaded);
    assert_eq!(result.rows, 3);
    assert_eq!(result.columns, 2);
    assert_eq!(db.row_count("values_table").unwrap(), 3);
    assert_eq!(
        db.column_names("values_table").unwrap(),
        vec!["id".to_string(), "value".to_string()]
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn header_only_load_is_an_empty_table() {
    let path = tmp_file("header-only", "csv");
    std::fs::write(&path, "id,name\n").unwrap();

    let mut db = Database::open_in_memory().unwrap();
    let result = SourceReader::Csv(CsvOptions::default())
        .load(&mut db, &path, "header_only")
        .unwrap();

    assert_eq!(result.status, LoadStatus::Empty);
    assert_eq!(result.rows, 0);
    assert_eq!(result.columns, 2);
    assert!(result.has_table());
    assert_eq!(db.row_count("header_only").unwrap(), 0);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn zero_byte_load_creates_no_table() {
    let path = tmp_file("zero", "csv");
    std::fs::write(&path, "").unwrap();

    let mut db = Database::open_in_memory().unwrap();
    let result = SourceReader::Csv(CsvOptions::default())
        .load(&mut db, &path, "zero")
        .unwrap();

    assert_eq!(result.status, LoadStatus::Empty);
    assert!(!result.has_table());
    assert!(result.message.is_some());
    assert!(db.table_names().unwrap().is_empty());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn failed_load_leaves_no_partial_table() {
    let path = tmp_file("ragged", "csv");
    std::fs::write(&path, "a,b\n1,2\n3,4,5\n").unwrap();

    let mut db = Database::open_in_memory().unwrap();
    let err = SourceReader::Csv(CsvOptions::default())
        .load(&mut db, &path, "ragged")
        .unwrap_err();

    assert!(matches!(err, IngestionError::ParseError { row: 3, .. }));
    assert_eq!(err.source_path(), Some(path.as_path()));
    assert!(!err.is_fatal());
    assert!(db.table_names().unwrap().is_empty());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn append_failure_rolls_back_the_created_table() {
    let schema = Schema::new(vec![Field::new("n", DataType::Int64)]);
    let bad = DataSet::new(
        schema.clone(),
        vec![vec![Value::Int64(1)], vec![Value::Utf8("x".to_string())]],
    );

    let mut db = Database::open_in_memory().unwrap();
    assert!(db.create_table("numbers", &bad).is_err());
    assert!(db.table_names().unwrap().is_empty());

    // the name is free again and the connection still usable
    let good = DataSet::new(schema, vec![vec![Value::Int64(1)], vec![Value::Int64(2)]]);
    db.create_table("numbers", &good).unwrap();
    assert_eq!(db.row_count("numbers").unwrap(), 2);
}

#[test]
fn existing_table_name_fails_without_touching_it() {
    let path = tmp_file("dupe", "csv");
    std::fs::write(&path, "x\n1\n").unwrap();

    let mut db = Database::open_in_memory().unwrap();
    let reader = SourceReader::Csv(CsvOptions::default());
    reader.load(&mut db, &path, "dupe").unwrap();
    let err = reader.load(&mut db, &path, "dupe").unwrap_err();

    assert!(matches!(err, IngestionError::Read { .. }));
    assert_eq!(db.row_count("dupe").unwrap(), 1);

    let _ = std::fs::remove_file(&path);
}

#[cfg(not(feature = "excel"))]
#[test]
fn spreadsheet_without_excel_support_is_missing_dependency() {
    let path = tmp_file("book", "xlsx");
    std::fs::write(&path, b"PK").unwrap();

    let mut db = Database::open_in_memory().unwrap();
    let err = SourceReader::Excel(ExcelSheetSelection::First)
        .load(&mut db, &path, "book")
        .unwrap_err();

    assert!(matches!(
        err,
        IngestionError::MissingDependency {
            capability: "spreadsheet",
            ..
        }
    ));

    let _ = std::fs::remove_file(&path);
}
