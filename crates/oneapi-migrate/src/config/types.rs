//! Configuration types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::drivers::detect::redact_dsn;

/// Tables copied by default, in order.
pub const DEFAULT_TABLES: &[&str] = &[
    "channels",
    "logs",
    "options",
    "redemptions",
    "tokens",
    "users",
    "abilities",
];

/// Root configuration.
///
/// `Debug` output masks DSN passwords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// one-hub database.
    pub source: DatabaseConfig,

    /// one-api database.
    pub target: DatabaseConfig,

    /// Migration behaviour.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// One side of the migration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string in any accepted grammar.
    pub dsn: String,

    /// Explicit dialect ("mysql", "postgres", "sqlite"). Detected from the
    /// DSN when absent.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

impl DatabaseConfig {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            r#type: None,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("dsn", &redact_dsn(&self.dsn))
            .field("type", &self.r#type)
            .finish()
    }
}

/// Migration behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Tables to copy, in order.
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,

    /// Rebuild `abilities` from `channels` after the copy.
    #[serde(default = "default_true")]
    pub rebuild_abilities: bool,

    /// Rows per multi-row INSERT during the rebuild.
    #[serde(default = "default_ability_batch_rows")]
    pub ability_batch_rows: usize,

    /// Log progress every N rows.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            tables: default_tables(),
            rebuild_abilities: true,
            ability_batch_rows: default_ability_batch_rows(),
            progress_interval: default_progress_interval(),
        }
    }
}

fn default_tables() -> Vec<String> {
    DEFAULT_TABLES.iter().map(|t| t.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_ability_batch_rows() -> usize {
    500
}

fn default_progress_interval() -> u64 {
    100
}
