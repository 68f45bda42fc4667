use chrono::NaiveDate;

use data_drop_ingest::SourceError;
use data_drop_ingest::ingestion::csv::{
    CsvOptions, ingest_csv_from_bytes, ingest_csv_from_path, ingest_csv_from_reader, sniff_delimiter,
};
use data_drop_ingest::types::{DataType, Value};

fn types(ds: &data_drop_ingest::types::DataSet) -> Vec<DataType> {
    ds.schema.fields.iter().map(|f| f.data_type).collect()
}

#[test]
fn ingest_csv_from_path_infers_types() {
    let ds = ingest_csv_from_path("tests/fixtures/people.csv", &CsvOptions::default()).unwrap();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(
        ds.schema.field_names().collect::<Vec<_>>(),
        vec!["id", "name", "score", "active"]
    );
    assert_eq!(
        types(&ds),
        vec![DataType::Int64, DataType::Utf8, DataType::Float64, DataType::Bool]
    );
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Ada".to_string()),
            Value::Float64(98.5),
            Value::Bool(true),
        ]
    );
    assert!(ds.notes.is_empty());
}

#[test]
fn delimiter_is_sniffed_and_quotes_are_respected() {
    let ds = ingest_csv_from_path("tests/fixtures/semicolon.csv", &CsvOptions::default()).unwrap();

    assert_eq!(ds.column_count(), 3);
    assert_eq!(ds.row_count(), 3);
    assert_eq!(ds.rows[0][1], Value::Utf8("Oslo; Norway".to_string()));
    // -3.5 and 18 widen to DOUBLE; the empty cell is null
    assert_eq!(ds.schema.fields[2].data_type, DataType::Float64);
    assert_eq!(ds.rows[1][2], Value::Float64(18.0));
    assert_eq!(ds.rows[2][2], Value::Null);
}

#[test]
fn sniff_delimiter_prefers_most_frequent_candidate() {
    assert_eq!(sniff_delimiter(b"a,b,c\n1,2,3\n", b'"'), b',');
    assert_eq!(sniff_delimiter(b"a\tb\tc\n", b'"'), b'\t');
    assert_eq!(sniff_delimiter(b"\"x,y\"|b|c\n", b'"'), b'|');
    assert_eq!(sniff_delimiter(b"single\n", b'"'), b',');
    assert_eq!(sniff_delimiter(b"", b'"'), b',');
}

#[test]
fn tsv_fixture_loads_with_timestamps() {
    let ds = ingest_csv_from_path("tests/fixtures/readings.tsv", &CsvOptions::default()).unwrap();

    assert_eq!(
        types(&ds),
        vec![DataType::Timestamp, DataType::Int64, DataType::Float64]
    );
    let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 10)
        .unwrap();
    assert_eq!(ds.rows[1][0], Value::Timestamp(expected));
}

#[test]
fn explicit_delimiter_overrides_sniffing() {
    let opts = CsvOptions {
        delimiter: Some(b'|'),
        ..CsvOptions::default()
    };
    let ds = ingest_csv_from_bytes(b"a,b|c\n1,2|3\n", &opts).unwrap();
    assert_eq!(ds.schema.field_names().collect::<Vec<_>>(), vec!["a,b", "c"]);
    assert_eq!(ds.rows[0][0], Value::Utf8("1,2".to_string()));
}

#[test]
fn header_only_file_has_columns_but_no_rows() {
    let ds = ingest_csv_from_bytes(b"id,name\n", &CsvOptions::default()).unwrap();
    assert_eq!(ds.column_count(), 2);
    assert_eq!(ds.row_count(), 0);
    assert_eq!(types(&ds), vec![DataType::Utf8, DataType::Utf8]);
}

#[test]
fn zero_byte_file_has_no_columns() {
    let ds = ingest_csv_from_bytes(b"", &CsvOptions::default()).unwrap();
    assert!(ds.schema.is_empty());
    assert_eq!(ds.row_count(), 0);
}

#[test]
fn short_rows_are_padded_with_a_note() {
    let ds = ingest_csv_from_bytes(b"a,b,c\n1,2,3\n4,5\n", &CsvOptions::default()).unwrap();
    assert_eq!(ds.rows[1], vec![Value::Int64(4), Value::Int64(5), Value::Null]);
    assert_eq!(ds.notes.len(), 1);
    assert!(ds.notes[0].contains("padded"));
}

#[test]
fn long_rows_are_a_parse_error_with_row_number() {
    let err = ingest_csv_from_bytes(b"a,b\n1,2\n3,4,5\n", &CsvOptions::default()).unwrap_err();
    match err {
        SourceError::ParseError { row, message } => {
            assert_eq!(row, 3);
            assert!(message.contains("expected 2 fields, found 3"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn no_header_names_columns_by_position() {
    let opts = CsvOptions {
        header: false,
        ..CsvOptions::default()
    };
    let ds = ingest_csv_from_bytes(b"1,x\n2,y\n", &opts).unwrap();
    assert_eq!(
        ds.schema.field_names().collect::<Vec<_>>(),
        vec!["column0", "column1"]
    );
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[0][0], Value::Int64(1));
}

#[test]
fn disabling_type_detection_keeps_text() {
    let opts = CsvOptions {
        auto_detect_types: false,
        ..CsvOptions::default()
    };
    let ds = ingest_csv_from_path("tests/fixtures/people.csv", &opts).unwrap();
    assert!(types(&ds).iter().all(|t| *t == DataType::Utf8));
    assert_eq!(ds.rows[0][0], Value::Utf8("1".to_string()));
}

#[test]
fn mixed_columns_widen() {
    let input = b"n,m,d,t\n1,1,2024-01-01,2024-01-01\n2.5,x,2024-01-02,2024-01-02 12:30:00\n";
    let ds = ingest_csv_from_bytes(input, &CsvOptions::default()).unwrap();
    assert_eq!(
        types(&ds),
        vec![DataType::Float64, DataType::Utf8, DataType::Date, DataType::Timestamp]
    );
    assert_eq!(ds.rows[0][0], Value::Float64(1.0));
    assert_eq!(ds.rows[0][1], Value::Utf8("1".to_string()));
    let midnight = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(ds.rows[0][3], Value::Timestamp(midnight));
}

#[test]
fn duplicate_and_blank_headers_are_made_unique() {
    let ds = ingest_csv_from_bytes(b"id,ID,,name\n1,2,3,4\n", &CsvOptions::default()).unwrap();
    assert_eq!(
        ds.schema.field_names().collect::<Vec<_>>(),
        vec!["id", "ID_1", "column2", "name"]
    );
}

#[test]
fn doubled_quotes_are_unescaped() {
    let ds = ingest_csv_from_bytes(b"q\n\"say \"\"hi\"\"\"\n", &CsvOptions::default()).unwrap();
    assert_eq!(ds.rows[0][0], Value::Utf8("say \"hi\"".to_string()));
}

#[test]
fn text_cells_keep_their_whitespace() {
    let input = b"name,code,n\n\"  padded  \",\"   \",\" 7 \"\n,x, \n";
    let ds = ingest_csv_from_bytes(input, &CsvOptions::default()).unwrap();
    assert_eq!(types(&ds), vec![DataType::Utf8, DataType::Utf8, DataType::Int64]);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Utf8("  padded  ".to_string()),
            Value::Utf8("   ".to_string()),
            Value::Int64(7),
        ]
    );
    // only a truly empty cell is null; blank numbers are null too
    assert_eq!(
        ds.rows[1],
        vec![Value::Null, Value::Utf8("x".to_string()), Value::Null]
    );

    let opts = CsvOptions {
        auto_detect_types: false,
        ..CsvOptions::default()
    };
    let ds = ingest_csv_from_bytes(input, &opts).unwrap();
    assert_eq!(ds.rows[0][0], Value::Utf8("  padded  ".to_string()));
    assert_eq!(ds.rows[0][2], Value::Utf8(" 7 ".to_string()));
    assert_eq!(ds.rows[1][2], Value::Utf8(" ".to_string()));
}

#[test]
fn invalid_utf8_fails() {
    let input: &[u8] = b"a,b\n1,\xff\xfe\n";
    assert!(ingest_csv_from_bytes(input, &CsvOptions::default()).is_err());
}

#[test]
fn ingest_from_custom_reader() {
    let input = "name,id\nAda,1\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input.as_bytes());

    let ds = ingest_csv_from_reader(&mut rdr, &CsvOptions::default()).unwrap();
    assert_eq!(ds.row_count(), 1);
    assert_eq!(ds.rows[0][0], Value::Utf8("Ada".to_string()));
    assert_eq!(ds.rows[0][1], Value::Int64(1));
}
