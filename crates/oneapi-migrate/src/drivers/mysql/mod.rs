//! MySQL/MariaDB database driver.
//!
//! - [`MysqlDialect`]: SQL syntax strategy
//! - [`MysqlDsn`]: native DSN parsing
//! - [`MysqlDatabase`]: the single connection used for reads and writes
//! - [`MysqlTransaction`]: per-table write transaction
//!
//! # Connection String
//!
//! Uses the Go driver's native format:
//! ```text
//! user:password@tcp(host:port)/database?charset=utf8mb4
//! ```

mod dialect;
mod dsn;
mod reader;
mod writer;

use sqlx::mysql::MySqlConnection;
use sqlx::{ConnectOptions, Connection};
use tracing::info;

pub use dialect::MysqlDialect;
pub use dsn::{MysqlAddress, MysqlDsn};
pub use writer::MysqlTransaction;

use crate::drivers::detect::redact_dsn;
use crate::error::{MigrateError, Result};

/// An open MySQL connection.
pub struct MysqlDatabase {
    conn: MySqlConnection,
    dialect: MysqlDialect,
}

impl MysqlDatabase {
    /// Connect using a native DSN.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let parsed = MysqlDsn::parse(dsn)?;
        let options = parsed.connect_options()?.disable_statement_logging();

        let conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| {
                MigrateError::connection(e, format!("connecting to MySQL {}", redact_dsn(dsn)))
            })?;

        info!(
            "Connected to MySQL: {:?}/{}",
            parsed.address, parsed.database
        );

        Ok(Self {
            conn,
            dialect: MysqlDialect::new(),
        })
    }

    /// Open a write transaction.
    pub async fn begin(&mut self) -> Result<MysqlTransaction<'_>> {
        let tx = self.conn.begin().await?;
        Ok(MysqlTransaction::new(tx))
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}
