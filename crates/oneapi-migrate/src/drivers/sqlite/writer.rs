//! SQLite writes inside a single transaction.

use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::query::Query;

use crate::core::value::SqlValue;
use crate::error::Result;

/// A SQLite write transaction.
///
/// Dropping it without [`commit`](Self::commit) rolls back.
pub struct SqliteTransaction<'c> {
    tx: sqlx::Transaction<'c, Sqlite>,
}

impl<'c> SqliteTransaction<'c> {
    pub(super) fn new(tx: sqlx::Transaction<'c, Sqlite>) -> Self {
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
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::I64(v) => query.bind(*v),
        SqlValue::F64(v) => query.bind(*v),
        SqlValue::Text(s) => query.bind(s.as_str()),
        SqlValue::Bytes(b) => query.bind(b.as_slice()),
    }
}
