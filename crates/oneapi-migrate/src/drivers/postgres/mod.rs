//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PostgresDatabase`]: the single client used for reads and writes
//! - [`PostgresTransaction`]: per-table write transaction with parameter coercion
//!
//! Both URL and libpq `key=value` DSNs are accepted. `sslmode` is pulled out
//! before the DSN reaches `tokio-postgres`, which only knows a subset of the
//! libpq modes.

mod dialect;
mod reader;
mod writer;

use std::str::FromStr;

use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::{error, info};

pub use dialect::PostgresDialect;
pub use writer::PostgresTransaction;

use crate::drivers::common::{SslMode, TlsBuilder};
use crate::drivers::detect::redact_dsn;
use crate::error::{MigrateError, Result};

/// An open PostgreSQL connection.
pub struct PostgresDatabase {
    client: Client,
    dialect: PostgresDialect,
}

impl PostgresDatabase {
    /// Connect using a URL or `key=value` DSN.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let (driver_dsn, ssl_mode) = extract_ssl_mode(dsn)?;
        let mut config = PgConfig::from_str(&driver_dsn)
            .map_err(|e| MigrateError::invalid_dsn("postgres", e.to_string()))?;
        config.ssl_mode(ssl_mode.driver_mode());

        let context = format!("connecting to PostgreSQL {}", redact_dsn(dsn));

        let client = match TlsBuilder::new(ssl_mode).build()? {
            Some(tls) => {
                let (client, connection) = config
                    .connect(tls)
                    .await
                    .map_err(|e| MigrateError::connection(e, context.clone()))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("PostgreSQL connection error: {}", e);
                    }
                });
                client
            }
            None => {
                let (client, connection) = config
                    .connect(NoTls)
                    .await
                    .map_err(|e| MigrateError::connection(e, context.clone()))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("PostgreSQL connection error: {}", e);
                    }
                });
                client
            }
        };

        info!(
            "Connected to PostgreSQL (sslmode={}): {}",
            ssl_mode.as_str(),
            redact_dsn(dsn)
        );

        Ok(Self {
            client,
            dialect: PostgresDialect::new(),
        })
    }

    /// Open a write transaction.
    pub async fn begin(&mut self) -> Result<PostgresTransaction<'_>> {
        let tx = self.client.transaction().await?;
        Ok(PostgresTransaction::new(tx))
    }
}

/// Remove `sslmode` from a DSN and parse it.
///
/// A DSN without `sslmode` gets libpq's default, `prefer`.
pub fn extract_ssl_mode(dsn: &str) -> Result<(String, SslMode)> {
    let dsn = dsn.trim();
    if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
        extract_from_url(dsn)
    } else {
        extract_from_key_value(dsn)
    }
}

fn extract_from_url(dsn: &str) -> Result<(String, SslMode)> {
    let Some((base, query)) = dsn.split_once('?') else {
        return Ok((dsn.to_string(), SslMode::default()));
    };

    let mut mode = SslMode::default();
    let mut kept = Vec::new();
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("sslmode", value)) => {
                let value = percent_encoding::percent_decode_str(value).decode_utf8_lossy();
                mode = SslMode::parse(&value)?;
            }
            _ if pair.is_empty() => {}
            _ => kept.push(pair),
        }
    }

    let rebuilt = if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    };
    Ok((rebuilt, mode))
}

fn extract_from_key_value(dsn: &str) -> Result<(String, SslMode)> {
    let mut search = 0;
    while let Some(idx) = dsn[search..].find("sslmode") {
        let start = search + idx;
        let at_token_start = start == 0 || dsn[..start].ends_with(char::is_whitespace);
        let after_key = dsn[start + "sslmode".len()..].trim_start();

        if at_token_start {
            if let Some(value_part) = after_key.strip_prefix('=') {
                let value_part = value_part.trim_start();
                let value_len = value_part
                    .find(char::is_whitespace)
                    .unwrap_or(value_part.len());
                let value = value_part[..value_len].trim_matches('\'');
                let mode = SslMode::parse(value)?;

                let end = dsn.len() - value_part.len() + value_len;
                let rebuilt = format!("{} {}", dsn[..start].trim_end(), dsn[end..].trim_start());
                return Ok((rebuilt.trim().to_string(), mode));
            }
        }
        search = start + 1;
    }
    Ok((dsn.to_string(), SslMode::default()))
}
