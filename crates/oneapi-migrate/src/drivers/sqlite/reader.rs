//! SQLite reads: column introspection, row streaming and value decoding.

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Executor, Row as _, Statement, TypeInfo, ValueRef};
use tracing::debug;

use super::SqliteDatabase;
use crate::core::traits::Dialect;
use crate::core::value::{Row, SqlValue};
use crate::error::{MigrateError, Result};

impl SqliteDatabase {
    /// Column names of `table`, or empty when the probe fails.
    pub async fn columns(&mut self, table: &str) -> Vec<String> {
        let sql = self.dialect.build_probe_query(table);
        match (&mut self.conn).prepare(&sql).await {
            Ok(stmt) => stmt
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!("SQLite probe of {} failed: {}", table, e);
                Vec::new()
            }
        }
    }

    /// Stream the result of `sql`, one decoded row at a time.
    pub fn stream_rows<'a>(&'a mut self, sql: &'a str) -> BoxStream<'a, Result<Row>> {
        sqlx::query(sql)
            .fetch(&mut self.conn)
            .map_err(MigrateError::from)
            .and_then(|row| futures::future::ready(decode_row(&row)))
            .boxed()
    }

    /// Run `sql` and collect every decoded row.
    pub async fn fetch_all(&mut self, sql: &str) -> Result<Vec<Row>> {
        let rows = sqlx::query(sql).fetch_all(&mut self.conn).await?;
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
    (0..row.len()).map(|i| decode_value(row, i)).collect()
}

/// Decode one cell by the storage class of the value itself.
///
/// SQLite typing is per value, so the declared column type is ignored.
fn decode_value(row: &SqliteRow, idx: usize) -> Result<SqlValue> {
    let name = row.column(idx).name().to_string();
    let err = |e: sqlx::Error| MigrateError::decode(name.as_str(), e);

    let raw = row.try_get_raw(idx).map_err(err)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_string();

    let value = match storage.as_str() {
        "INTEGER" => SqlValue::I64(row.try_get_unchecked::<i64, _>(idx).map_err(err)?),
        "REAL" => SqlValue::F64(row.try_get_unchecked::<f64, _>(idx).map_err(err)?),
        "BLOB" => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx).map_err(err)?),
        _ => SqlValue::Text(row.try_get_unchecked::<String, _>(idx).map_err(err)?),
    };

    Ok(value)
}
