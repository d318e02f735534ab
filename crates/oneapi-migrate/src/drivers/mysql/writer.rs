//! MySQL writes inside a single transaction.

use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;

use crate::core::value::SqlValue;
use crate::error::Result;

/// A MySQL write transaction.
///
/// Dropping it without [`commit`](Self::commit) rolls back.
pub struct MysqlTransaction<'c> {
    tx: sqlx::Transaction<'c, MySql>,
}

impl<'c> MysqlTransaction<'c> {
    pub(super) fn new(tx: sqlx::Transaction<'c, MySql>) -> Self {
        Self { tx }
    }

    /// Execute one statement with positional parameters.
    pub async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = bind_value(query, value);
        }
        let result = query.execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::I64(v) => query.bind(*v),
        SqlValue::F64(v) => query.bind(*v),
        SqlValue::Text(s) => query.bind(s.as_str()),
        SqlValue::Bytes(b) => query.bind(b.as_slice()),
    }
}
