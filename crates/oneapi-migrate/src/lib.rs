//! # oneapi-migrate
//!
//! Migrates a one-hub database into a one-api database.
//!
//! Source and destination can each be MySQL, PostgreSQL or SQLite. The
//! library provides:
//!
//! - **Dialect detection** from loosely formatted DSNs
//! - **Column reconciliation** between differing schemas
//! - **Conflict-tolerant copies**, one transaction per table
//! - **Value transforms**, including the channel-type remap
//! - **Abilities rebuild** from the destination's channels
//!
//! ## Example
//!
//! ```rust,no_run
//! use oneapi_migrate::{Config, Orchestrator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> oneapi_migrate::Result<()> {
//!     let config = Config::from_dsns("root:pw@tcp(db:3306)/onehub", "./one-api.db")?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator.run().await?;
//!     println!("Migrated {} rows", result.rows_total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod rebuild;
pub mod transfer;
pub mod transform;

// Re-exports for convenient access
pub use config::{Config, DatabaseConfig, MigrationConfig};
pub use crate::core::{reconcile, ColumnReconciliation, Dialect, Row, SqlValue, ValueTransform};
pub use drivers::{detect, ConnectionDescriptor, Database, DatabaseKind};
pub use error::{MigrateError, Result};
pub use orchestrator::{MigrationResult, Orchestrator};
pub use rebuild::{AbilityRebuilder, RebuildOutcome, RebuildReport};
pub use transfer::{TableMigrator, TableOutcome, TableReport};
pub use transform::{ChannelTypeTransform, TransformRegistry};
