//! MySQL reads: column introspection, row streaming and value decoding.

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Executor, Row as _, Statement, TypeInfo, ValueRef};
use tracing::debug;

use super::MysqlDatabase;
use crate::core::traits::Dialect;
use crate::core::value::{Row, SqlValue};
use crate::error::{MigrateError, Result};

impl MysqlDatabase {
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
                debug!("MySQL probe of {} failed: {}", table, e);
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

fn decode_row(row: &MySqlRow) -> Result<Row> {
    (0..row.len()).map(|i| decode_value(row, i)).collect()
}

/// Decode one cell by its wire type.
fn decode_value(row: &MySqlRow, idx: usize) -> Result<SqlValue> {
    let name = row.column(idx).name().to_string();
    let err = |e: sqlx::Error| MigrateError::decode(name.as_str(), e);

    let raw = row.try_get_raw(idx).map_err(err)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        // tinyint(1) is reported as BOOLEAN but may hold any small integer.
        "BOOLEAN" => SqlValue::I64(i64::from(
            row.try_get_unchecked::<i8, _>(idx).map_err(err)?,
        )),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            SqlValue::I64(row.try_get::<i64, _>(idx).map_err(err)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            let v = row.try_get::<u64, _>(idx).map_err(err)?;
            i64::try_from(v)
                .map(SqlValue::I64)
                .unwrap_or_else(|_| SqlValue::Text(v.to_string()))
        }
        "YEAR" => SqlValue::I64(i64::from(
            row.try_get_unchecked::<u16, _>(idx).map_err(err)?,
        )),
        "FLOAT" => SqlValue::F64(f64::from(row.try_get::<f32, _>(idx).map_err(err)?)),
        "DOUBLE" => SqlValue::F64(row.try_get::<f64, _>(idx).map_err(err)?),
        "DECIMAL" => SqlValue::Text(
            row.try_get::<rust_decimal::Decimal, _>(idx)
                .map_err(err)?
                .to_string(),
        ),
        "DATE" => SqlValue::Text(
            row.try_get::<chrono::NaiveDate, _>(idx)
                .map_err(err)?
                .to_string(),
        ),
        "TIME" => SqlValue::Text(
            row.try_get::<chrono::NaiveTime, _>(idx)
                .map_err(err)?
                .to_string(),
        ),
        "DATETIME" | "TIMESTAMP" => SqlValue::Text(
            row.try_get::<chrono::NaiveDateTime, _>(idx)
                .map_err(err)?
                .to_string(),
        ),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx).map_err(err)?),
        // CHAR, VARCHAR, TEXT family, ENUM, SET, JSON
        _ => match row.try_get::<String, _>(idx) {
            Ok(s) => SqlValue::Text(s),
            Err(_) => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx).map_err(err)?),
        },
    };

    Ok(value)
}
