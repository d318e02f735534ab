//! Configuration validation.

use super::{Config, DatabaseConfig};
use crate::core::identifier::validate_identifier;
use crate::drivers::DatabaseKind;
use crate::error::{MigrateError, Result};
use crate::rebuild::MAX_BATCH_ROWS;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_side("source", &config.source)?;
    validate_side("target", &config.target)?;

    if config.source.dsn.trim() == config.target.dsn.trim() {
        return Err(MigrateError::Config(
            "source and target cannot be the same database".into(),
        ));
    }

    let migration = &config.migration;
    if migration.tables.is_empty() {
        return Err(MigrateError::Config(
            "migration.tables must list at least one table".into(),
        ));
    }
    for table in &migration.tables {
        validate_identifier(table.trim())
            .map_err(|e| MigrateError::Config(format!("migration.tables: {}", e)))?;
    }
    if migration.ability_batch_rows == 0 {
        return Err(MigrateError::Config(
            "migration.ability_batch_rows must be at least 1".into(),
        ));
    }
    if migration.ability_batch_rows > MAX_BATCH_ROWS {
        return Err(MigrateError::Config(format!(
            "migration.ability_batch_rows must be at most {}",
            MAX_BATCH_ROWS
        )));
    }
    if migration.progress_interval == 0 {
        return Err(MigrateError::Config(
            "migration.progress_interval must be at least 1".into(),
        ));
    }

    Ok(())
}

fn validate_side(side: &str, db: &DatabaseConfig) -> Result<()> {
    if db.dsn.trim().is_empty() {
        return Err(MigrateError::Config(format!("{}.dsn is required", side)));
    }
    if let Some(kind) = &db.r#type {
        kind.parse::<DatabaseKind>()
            .map_err(|e| MigrateError::Config(format!("{}.type: {}", side, e)))?;
    }
    Ok(())
}
