use std::fmt::Write as _;
use std::path::Path;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use data_drop_ingest::database::Database;
use data_drop_ingest::ingestion::csv::{CsvOptions, ingest_csv_from_bytes};
use data_drop_ingest::orchestrator::derive_table_name;

fn synthetic_csv(rows: usize) -> Vec<u8> {
    let mut out = String::from("Timestamp,channel_id,value,label\n");
    for i in 0..rows {
        let _ = writeln!(
            out,
            "2024-01-01 00:{:02}:{:02},{},{}.25,row {i}",
            (i / 60) % 60,
            i % 60,
            i % 16,
            i
        );
    }
    out.into_bytes()
}

fn bench_derive_table_name(c: &mut Criterion) {
    let names = [
        "sales.csv",
        "A B.csv",
        "--Quarterly Report (Final) v2--.xlsx",
        "sensor_readings_2024-01-01T00-00-00.parquet",
    ];
    c.bench_function("derive_table_name", |b| {
        b.iter(|| {
            for name in names {
                std::hint::black_box(derive_table_name(Path::new(name)));
            }
        });
    });
}

fn bench_csv_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_decode");
    for rows in [1_000usize, 10_000] {
        let input = synthetic_csv(rows);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &input, |b, input| {
            b.iter(|| {
                let ds = ingest_csv_from_bytes(input, &CsvOptions::default()).expect("decode");
                assert_eq!(ds.row_count(), rows);
            });
        });
    }
    group.finish();
}

fn bench_csv_load(c: &mut Criterion) {
    let input = synthetic_csv(10_000);
    let ds = ingest_csv_from_bytes(&input, &CsvOptions::default()).expect("decode");
    c.bench_function("duckdb_create_table_10k", |b| {
        b.iter(|| {
            let mut db = Database::open_in_memory().expect("open");
            db.create_table("readings", &ds).expect("load");
        });
    });
}

criterion_group!(benches, bench_derive_table_name, bench_csv_decode, bench_csv_load);
criterion_main!(benches);
