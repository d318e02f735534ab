//! PostgreSQL reads: column introspection, row streaming and value decoding.

use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use tokio_postgres::types::{FromSql, ToSql};
use tracing::debug;

use super::PostgresDatabase;
use crate::core::traits::Dialect;
use crate::core::value::{Row, SqlValue};
use crate::error::{MigrateError, Result};

impl PostgresDatabase {
    /// Column names of `table`, or empty when the probe fails.
    pub async fn columns(&mut self, table: &str) -> Vec<String> {
        let sql = self.dialect.build_probe_query(table);
        match self.client.prepare(&sql).await {
            Ok(stmt) => stmt
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!("PostgreSQL probe of {} failed: {}", table, e);
                Vec::new()
            }
        }
    }

    /// Stream the result of `sql`, one decoded row at a time.
    pub fn stream_rows<'a>(&'a mut self, sql: &'a str) -> BoxStream<'a, Result<Row>> {
        let client = &self.client;
        stream::once(async move {
            client
                .query_raw(sql, std::iter::empty::<&(dyn ToSql + Sync)>())
                .await
        })
        .try_flatten()
        .map(|row| row.map_err(MigrateError::from).and_then(|r| decode_row(&r)))
        .boxed()
    }

    /// Run `sql` and collect every decoded row.
    pub async fn fetch_all(&mut self, sql: &str) -> Result<Vec<Row>> {
        let rows = self.client.query(sql, &[]).await?;
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &tokio_postgres::Row) -> Result<Row> {
    (0..row.len()).map(|i| convert_pg_row_value(row, i)).collect()
}

fn get<'a, T: FromSql<'a>>(row: &'a tokio_postgres::Row, idx: usize) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| MigrateError::decode(row.columns()[idx].name(), e))
}

/// Decode one cell by its column type.
fn convert_pg_row_value(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue> {
    let type_name = row.columns()[idx].type_().name().to_string();

    let value = match type_name.as_str() {
        "bool" => get::<bool>(row, idx)?.map(SqlValue::Bool),
        "int2" => get::<i16>(row, idx)?.map(|v| SqlValue::I64(i64::from(v))),
        "int4" => get::<i32>(row, idx)?.map(|v| SqlValue::I64(i64::from(v))),
        "int8" => get::<i64>(row, idx)?.map(SqlValue::I64),
        "oid" => get::<u32>(row, idx)?.map(|v| SqlValue::I64(i64::from(v))),
        "float4" => get::<f32>(row, idx)?.map(|v| SqlValue::F64(f64::from(v))),
        "float8" => get::<f64>(row, idx)?.map(SqlValue::F64),
        "numeric" => {
            get::<rust_decimal::Decimal>(row, idx)?.map(|d| SqlValue::Text(d.to_string()))
        }
        "timestamp" => get::<chrono::NaiveDateTime>(row, idx)?
            .map(|v| SqlValue::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string())),
        "timestamptz" => get::<chrono::DateTime<chrono::Utc>>(row, idx)?
            .map(|v| SqlValue::Text(v.to_rfc3339())),
        "date" => get::<chrono::NaiveDate>(row, idx)?.map(|v| SqlValue::Text(v.to_string())),
        "time" => get::<chrono::NaiveTime>(row, idx)?.map(|v| SqlValue::Text(v.to_string())),
        "bytea" => get::<Vec<u8>>(row, idx)?.map(SqlValue::Bytes),
        "json" | "jsonb" => {
            get::<serde_json::Value>(row, idx)?.map(|v| SqlValue::Text(v.to_string()))
        }
        // text, varchar, bpchar, name, citext and enums
        _ => get::<String>(row, idx)?.map(SqlValue::Text),
    };

    Ok(value.unwrap_or(SqlValue::Null))
}
