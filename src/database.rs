//! DuckDB destination database.
//!
//! One [`Database`] is opened per run and held for its whole duration. Table creation runs
//! inside a transaction so a failed load never leaves a partial table behind.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::{Connection, appender_params_from_iter, params};
use serde::Serialize;

use crate::types::{DataSet, Value};

/// Name and SQL type of one column as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: String,
}

/// Handle on the destination DuckDB database.
pub struct Database {
    path: Option<PathBuf>,
    conn: Connection,
}

impl Database {
    /// Open (or create) a file-backed database.
    pub fn open(path: impl AsRef<Path>) -> duckdb::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        Ok(Self {
            path: Some(path),
            conn,
        })
    }

    /// Open an in-memory database. Useful in tests.
    pub fn open_in_memory() -> duckdb::Result<Self> {
        Ok(Self {
            path: None,
            conn: Connection::open_in_memory()?,
        })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create `table` from a decoded dataset and append all of its rows.
    ///
    /// Everything happens in one transaction; on error nothing is left behind.
    pub fn create_table(&mut self, table: &str, ds: &DataSet) -> duckdb::Result<()> {
        let columns = ds
            .schema
            .fields
            .iter()
            .map(|f| format!("{} {}", quote_ident(&f.name), f.data_type.sql_name()))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("CREATE TABLE {} ({columns})", quote_ident(table)))?;
        {
            let mut appender = tx.appender(table)?;
            for row in &ds.rows {
                appender.append_row(appender_params_from_iter(row.iter().map(to_duck_value)))?;
            }
            appender.flush()?;
        }
        tx.commit()
    }

    /// Drop a table if it exists.
    pub fn drop_table_if_exists(&self, table: &str) -> duckdb::Result<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
    }

    /// Number of rows currently stored in `table`.
    pub fn row_count(&self, table: &str) -> duckdb::Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Columns of `table` in declaration order.
    pub fn describe(&self, table: &str) -> duckdb::Result<Vec<ColumnDescription>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_name = ? ORDER BY ordinal_position",
        )?;
        let rows = stmt.query_map(params![table], |row| {
            Ok(ColumnDescription {
                name: row.get(0)?,
                data_type: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    /// Column names of `table` in declaration order.
    pub fn column_names(&self, table: &str) -> duckdb::Result<Vec<String>> {
        Ok(self.describe(table)?.into_iter().map(|c| c.name).collect())
    }

    /// Create a non-unique index on one column and return the index name.
    pub fn create_index(&self, table: &str, column: &str) -> duckdb::Result<String> {
        let index = index_name(table, column);
        self.conn.execute_batch(&format!(
            "CREATE INDEX {} ON {} ({})",
            quote_ident(&index),
            quote_ident(table),
            quote_ident(column)
        ))?;
        Ok(index)
    }

    /// Names of the indexes defined on `table`, sorted.
    pub fn index_names(&self, table: &str) -> duckdb::Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT index_name FROM duckdb_indexes() WHERE table_name = ? ORDER BY index_name",
        )?;
        let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;
        rows.collect()
    }

    /// Attach a description to a table.
    pub fn comment_on_table(&self, table: &str, comment: &str) -> duckdb::Result<()> {
        self.conn.execute_batch(&format!(
            "COMMENT ON TABLE {} IS {}",
            quote_ident(table),
            quote_literal(comment)
        ))
    }

    /// Comment attached to `table`, if any.
    pub fn table_comment(&self, table: &str) -> duckdb::Result<Option<String>> {
        self.conn.query_row(
            "SELECT comment FROM duckdb_tables() WHERE table_name = ?",
            params![table],
            |row| row.get(0),
        )
    }

    /// All user tables, sorted by name.
    pub fn table_names(&self) -> duckdb::Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'main' ORDER BY table_name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect()
    }

    /// Checkpoint and close the connection so the file size on disk is final.
    pub fn close(self) -> duckdb::Result<()> {
        if self.path.is_some() {
            self.conn.execute_batch("CHECKPOINT")?;
        }
        self.conn.close().map_err(|(_, e)| e)
    }
}

/// Quote an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Index names share one namespace per schema. Derived table names never contain `__`, so
/// that separator keeps `scada` + `channel_id` apart from `scada_channel` + `id`.
fn index_name(table: &str, column: &str) -> String {
    let column: String = column
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("idx_{table}__{column}")
}

fn to_duck_value(v: &Value) -> DuckValue {
    match v {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Int64(i) => DuckValue::BigInt(*i),
        Value::Float64(f) => DuckValue::Double(*f),
        Value::Date(d) => DuckValue::Date32(days_since_epoch(d)),
        Value::Timestamp(ts) => DuckValue::Timestamp(TimeUnit::Microsecond, micros_since_epoch(ts)),
        Value::Utf8(s) => DuckValue::Text(s.clone()),
    }
}

fn days_since_epoch(d: &NaiveDate) -> i32 {
    d.signed_duration_since(NaiveDate::default()).num_days() as i32
}

fn micros_since_epoch(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}
