//! Migration orchestrator - main workflow coordinator.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::drivers::{ConnectionDescriptor, Database};
use crate::error::{MigrateError, Result};
use crate::rebuild::{AbilityRebuilder, RebuildOutcome};
use crate::transfer::{TableMigrator, TableOutcome, TableReport};
use crate::transform::TransformRegistry;

/// Migration orchestrator.
///
/// Owns one connection per side for the whole run.
pub struct Orchestrator {
    config: Config,
    transforms: TransformRegistry,
    source: Database,
    target: Database,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    pub tables_total: usize,
    pub tables_migrated: usize,
    pub tables_skipped: usize,
    pub tables_failed: usize,

    /// Rows processed across migrated tables.
    pub rows_total: u64,

    pub tables: Vec<TableReport>,

    /// Absent when the rebuild was disabled.
    pub abilities: Option<RebuildOutcome>,
}

impl Orchestrator {
    /// Classify both DSNs and connect. Any failure here is fatal.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let source_desc = config.source.descriptor()?;
        let target_desc = config.target.descriptor()?;
        log_descriptor("source", &source_desc);
        log_descriptor("target", &target_desc);

        let source = connect_side("source", &source_desc).await?;
        let target = connect_side("target", &target_desc).await?;

        Ok(Self {
            config,
            transforms: TransformRegistry::with_builtins(),
            source,
            target,
        })
    }

    /// Replace the transform registry.
    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = transforms;
        self
    }

    /// Run the migration: every configured table in order, then the rebuild.
    ///
    /// Table and rebuild failures are recorded in the result, not returned.
    pub async fn run(mut self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let start_time = Instant::now();

        info!(
            "Starting migration: {} -> {}",
            self.source.kind(),
            self.target.kind()
        );

        info!("Phase 1: Migrating {} tables", self.config.migration.tables.len());
        let migrator = TableMigrator::new(&self.transforms, self.config.migration.progress_interval);
        let mut tables = Vec::with_capacity(self.config.migration.tables.len());
        for table in &self.config.migration.tables {
            let report = migrator
                .migrate_table(&mut self.source, &mut self.target, table.trim())
                .await;
            tables.push(report);
        }

        let abilities = if self.config.migration.rebuild_abilities {
            info!("Phase 2: Rebuilding abilities");
            let rebuilder = AbilityRebuilder::new(self.config.migration.ability_batch_rows);
            Some(rebuilder.rebuild(&mut self.target).await)
        } else {
            info!("Phase 2: Abilities rebuild disabled");
            None
        };

        for (side, db) in [("source", self.source), ("target", self.target)] {
            if let Err(e) = db.close().await {
                warn!("Closing {} connection failed: {}", side, e);
            }
        }

        let result = summarize(started_at, start_time, tables, abilities);
        info!(
            "Migration finished: {} tables ({} migrated, {} skipped, {} failed), {} rows in {:.1}s",
            result.tables_total,
            result.tables_migrated,
            result.tables_skipped,
            result.tables_failed,
            result.rows_total,
            result.duration_seconds
        );

        Ok(result)
    }
}

fn log_descriptor(side: &str, descriptor: &ConnectionDescriptor) {
    if let Some(reason) = &descriptor.degraded {
        warn!("{} DSN could not be normalized, using it as given: {}", side, reason);
    }
    info!("{}: {} ({})", side, descriptor.kind, descriptor.redacted());
}

async fn connect_side(side: &str, descriptor: &ConnectionDescriptor) -> Result<Database> {
    Database::connect(descriptor).await.map_err(|e| match e {
        MigrateError::Connection { message, context } => {
            MigrateError::connection(message, format!("{} side, {}", side, context))
        }
        other => other,
    })
}

fn summarize(
    started_at: DateTime<Utc>,
    start_time: Instant,
    tables: Vec<TableReport>,
    abilities: Option<RebuildOutcome>,
) -> MigrationResult {
    let mut migrated = 0;
    let mut skipped = 0;
    let mut failed = 0;
    for report in &tables {
        match report.outcome {
            TableOutcome::Migrated { .. } => migrated += 1,
            TableOutcome::Skipped { .. } => skipped += 1,
            TableOutcome::Failed { .. } => failed += 1,
        }
    }

    MigrationResult {
        started_at,
        completed_at: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
        tables_total: tables.len(),
        tables_migrated: migrated,
        tables_skipped: skipped,
        tables_failed: failed,
        rows_total: tables.iter().map(TableReport::rows).sum(),
        tables,
        abilities,
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether any table or the rebuild failed.
    pub fn has_failures(&self) -> bool {
        self.tables_failed > 0 || matches!(self.abilities, Some(RebuildOutcome::Failed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(table: &str, outcome: TableOutcome) -> TableReport {
        TableReport {
            table: table.into(),
            outcome,
            dropped_columns: Vec::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_summarize_counts_outcomes() {
        let tables = vec![
            report("channels", TableOutcome::Migrated { rows: 10 }),
            report("logs", TableOutcome::Migrated { rows: 5 }),
            report("options", TableOutcome::Skipped { reason: "missing".into() }),
            report("tokens", TableOutcome::Failed { error: "boom".into() }),
        ];
        let result = summarize(Utc::now(), Instant::now(), tables, None);

        assert_eq!(result.tables_total, 4);
        assert_eq!(result.tables_migrated, 2);
        assert_eq!(result.tables_skipped, 1);
        assert_eq!(result.tables_failed, 1);
        assert_eq!(result.rows_total, 15);
        assert!(result.has_failures());
    }

    #[test]
    fn test_result_json_shape() {
        let tables = vec![report("users", TableOutcome::Migrated { rows: 2 })];
        let abilities = Some(RebuildOutcome::Skipped {
            reason: "abilities table not found in destination".into(),
        });
        let result = summarize(Utc::now(), Instant::now(), tables, abilities);
        assert!(!result.has_failures());

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["tables"][0]["outcome"]["status"], "migrated");
        assert_eq!(json["tables"][0]["outcome"]["rows"], 2);
        assert_eq!(json["abilities"]["status"], "skipped");
    }
}
