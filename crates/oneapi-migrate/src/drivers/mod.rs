//! Database driver implementations.
//!
//! - [`mysql`]: MySQL/MariaDB over SQLx
//! - [`postgres`]: PostgreSQL over tokio-postgres
//! - [`sqlite`]: SQLite over SQLx
//! - [`detect`]: DSN classification and normalization
//! - [`common`]: shared utilities (TLS)
//!
//! # Static dispatch
//!
//! The driver set is closed, so dialects, connections and transactions are
//! enums whose methods match on the variant instead of going through
//! `Box<dyn Trait>`.

pub mod common;
pub mod detect;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub use common::{SslMode, TlsBuilder};
pub use detect::{detect, redact_dsn, ConnectionDescriptor};
pub use mysql::{MysqlDatabase, MysqlDialect, MysqlTransaction};
pub use postgres::{PostgresDatabase, PostgresDialect, PostgresTransaction};
pub use sqlite::{SqliteDatabase, SqliteDialect, SqliteTransaction};

use crate::core::traits::Dialect;
use crate::core::value::{Row, SqlValue};
use crate::error::{MigrateError, Result};

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Mysql,
    Postgres,
    Sqlite,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::Mysql => "mysql",
            DatabaseKind::Postgres => "postgres",
            DatabaseKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseKind::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(DatabaseKind::Postgres),
            "sqlite" | "sqlite3" => Ok(DatabaseKind::Sqlite),
            other => Err(MigrateError::Config(format!(
                "Unknown database type: '{}'. Supported types: mysql, postgres, sqlite",
                other
            ))),
        }
    }
}

/// Enum-based static dispatch for dialects.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
    Sqlite(SqliteDialect),
}

impl DialectImpl {
    /// Dialect for a detected database kind.
    pub fn for_kind(kind: DatabaseKind) -> Self {
        match kind {
            DatabaseKind::Mysql => DialectImpl::Mysql(MysqlDialect::new()),
            DatabaseKind::Postgres => DialectImpl::Postgres(PostgresDialect::new()),
            DatabaseKind::Sqlite => DialectImpl::Sqlite(SqliteDialect::new()),
        }
    }

    /// Create a dialect implementation from a database type string.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        Ok(Self::for_kind(db_type.parse()?))
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        match self {
            DialectImpl::Mysql(d) => d.name(),
            DialectImpl::Postgres(d) => d.name(),
            DialectImpl::Sqlite(d) => d.name(),
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        match self {
            DialectImpl::Mysql(d) => d.quote_ident(name),
            DialectImpl::Postgres(d) => d.quote_ident(name),
            DialectImpl::Sqlite(d) => d.quote_ident(name),
        }
    }

    fn param_placeholder(&self, index: usize) -> String {
        match self {
            DialectImpl::Mysql(d) => d.param_placeholder(index),
            DialectImpl::Postgres(d) => d.param_placeholder(index),
            DialectImpl::Sqlite(d) => d.param_placeholder(index),
        }
    }

    fn insert_ignore_prefix(&self) -> &'static str {
        match self {
            DialectImpl::Mysql(d) => d.insert_ignore_prefix(),
            DialectImpl::Postgres(d) => d.insert_ignore_prefix(),
            DialectImpl::Sqlite(d) => d.insert_ignore_prefix(),
        }
    }

    fn insert_ignore_suffix(&self) -> &'static str {
        match self {
            DialectImpl::Mysql(d) => d.insert_ignore_suffix(),
            DialectImpl::Postgres(d) => d.insert_ignore_suffix(),
            DialectImpl::Sqlite(d) => d.insert_ignore_suffix(),
        }
    }
}

/// One open connection, the single handle a side uses for the whole run.
pub enum Database {
    Mysql(MysqlDatabase),
    Postgres(PostgresDatabase),
    Sqlite(SqliteDatabase),
}

impl Database {
    /// Connect to a classified DSN.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        match descriptor.kind {
            DatabaseKind::Mysql => Ok(Database::Mysql(MysqlDatabase::connect(&descriptor.dsn).await?)),
            DatabaseKind::Postgres => Ok(Database::Postgres(
                PostgresDatabase::connect(&descriptor.dsn).await?,
            )),
            DatabaseKind::Sqlite => Ok(Database::Sqlite(SqliteDatabase::connect(&descriptor.dsn).await?)),
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        match self {
            Database::Mysql(_) => DatabaseKind::Mysql,
            Database::Postgres(_) => DatabaseKind::Postgres,
            Database::Sqlite(_) => DatabaseKind::Sqlite,
        }
    }

    pub fn dialect(&self) -> DialectImpl {
        DialectImpl::for_kind(self.kind())
    }

    /// Ordered column names of `table`.
    ///
    /// Returns an empty list when the table is missing or the probe fails.
    pub async fn columns(&mut self, table: &str) -> Vec<String> {
        match self {
            Database::Mysql(db) => db.columns(table).await,
            Database::Postgres(db) => db.columns(table).await,
            Database::Sqlite(db) => db.columns(table).await,
        }
    }

    /// Stream every row produced by `sql`.
    pub fn stream_rows<'a>(&'a mut self, sql: &'a str) -> BoxStream<'a, Result<Row>> {
        match self {
            Database::Mysql(db) => db.stream_rows(sql),
            Database::Postgres(db) => db.stream_rows(sql),
            Database::Sqlite(db) => db.stream_rows(sql),
        }
    }

    /// Run `sql` and collect every row.
    pub async fn fetch_all(&mut self, sql: &str) -> Result<Vec<Row>> {
        match self {
            Database::Mysql(db) => db.fetch_all(sql).await,
            Database::Postgres(db) => db.fetch_all(sql).await,
            Database::Sqlite(db) => db.fetch_all(sql).await,
        }
    }

    /// Open a write transaction on this handle.
    pub async fn begin(&mut self) -> Result<Transaction<'_>> {
        match self {
            Database::Mysql(db) => Ok(Transaction::Mysql(db.begin().await?)),
            Database::Postgres(db) => Ok(Transaction::Postgres(db.begin().await?)),
            Database::Sqlite(db) => Ok(Transaction::Sqlite(db.begin().await?)),
        }
    }

    /// Close the connection. PostgreSQL clients close on drop.
    pub async fn close(self) -> Result<()> {
        match self {
            Database::Mysql(db) => db.close().await,
            Database::Postgres(_) => Ok(()),
            Database::Sqlite(db) => db.close().await,
        }
    }
}

/// A write transaction. Dropping it uncommitted rolls back.
pub enum Transaction<'c> {
    Mysql(MysqlTransaction<'c>),
    Postgres(PostgresTransaction<'c>),
    Sqlite(SqliteTransaction<'c>),
}

impl Transaction<'_> {
    /// Execute one statement, returning the affected row count.
    pub async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        match self {
            Transaction::Mysql(tx) => tx.execute(sql, params).await,
            Transaction::Postgres(tx) => tx.execute(sql, params).await,
            Transaction::Sqlite(tx) => tx.execute(sql, params).await,
        }
    }

    pub async fn commit(self) -> Result<()> {
        match self {
            Transaction::Mysql(tx) => tx.commit().await,
            Transaction::Postgres(tx) => tx.commit().await,
            Transaction::Sqlite(tx) => tx.commit().await,
        }
    }

    pub async fn rollback(self) -> Result<()> {
        match self {
            Transaction::Mysql(tx) => tx.rollback().await,
            Transaction::Postgres(tx) => tx.rollback().await,
            Transaction::Sqlite(tx) => tx.rollback().await,
        }
    }
}
