//! SQLite database driver.
//!
//! The DSN is a filesystem path. A `file:` prefix and a `?query` suffix are
//! tolerated and stripped. The file must already exist.

mod dialect;
mod reader;
mod writer;

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::info;

pub use dialect::SqliteDialect;
pub use writer::SqliteTransaction;

use crate::error::{MigrateError, Result};

/// An open SQLite connection.
pub struct SqliteDatabase {
    conn: SqliteConnection,
    dialect: SqliteDialect,
}

impl SqliteDatabase {
    /// Open an existing database file.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let path = sqlite_path(dsn);
        if path.is_empty() {
            return Err(MigrateError::invalid_dsn("sqlite", "empty database path"));
        }

        let options = SqliteConnectOptions::new()
            .filename(Path::new(path))
            .create_if_missing(false)
            .disable_statement_logging();

        let conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| MigrateError::connection(e, format!("opening SQLite file {}", path)))?;

        info!("Opened SQLite database: {}", path);

        Ok(Self {
            conn,
            dialect: SqliteDialect::new(),
        })
    }

    /// Open a write transaction.
    pub async fn begin(&mut self) -> Result<SqliteTransaction<'_>> {
        let tx = self.conn.begin().await?;
        Ok(SqliteTransaction::new(tx))
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

/// Strip `file:` and any query suffix from a SQLite DSN.
pub fn sqlite_path(dsn: &str) -> &str {
    let dsn = dsn.trim();
    let dsn = dsn.strip_prefix("file:").unwrap_or(dsn);
    match dsn.split_once('?') {
        Some((path, _)) => path,
        None => dsn,
    }
}
