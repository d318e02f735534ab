//! Per-table row migration.
//!
//! Every source row is streamed, projected onto the columns both sides share,
//! passed through any registered transform and written with a
//! conflict-tolerant single-row INSERT. One destination transaction covers
//! the whole table, so a failure leaves the destination table untouched.

use std::time::Instant;

use futures::StreamExt;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::schema::reconcile;
use crate::core::traits::Dialect;
use crate::core::value::{Row, SqlValue};
use crate::drivers::{Database, Transaction};
use crate::error::{MigrateError, Result};
use crate::transform::{TransformPlan, TransformRegistry};

/// How a table migration ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    /// Committed. `rows` counts processed rows, including ignored duplicates.
    Migrated { rows: u64 },
    /// Not attempted.
    Skipped { reason: String },
    /// Rolled back.
    Failed { error: String },
}

/// Result of migrating one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: String,
    pub outcome: TableOutcome,

    /// Source columns with no destination counterpart.
    pub dropped_columns: Vec<String>,

    pub duration_ms: u64,
}

impl TableReport {
    fn new(table: &str, outcome: TableOutcome, dropped_columns: Vec<String>, started: Instant) -> Self {
        Self {
            table: table.to_string(),
            outcome,
            dropped_columns,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Rows committed for this table.
    pub fn rows(&self) -> u64 {
        match self.outcome {
            TableOutcome::Migrated { rows } => rows,
            _ => 0,
        }
    }
}

/// Maps a full source row onto the destination column list.
pub struct ProjectionPlan {
    table: String,

    /// Destination column names, in destination order.
    pub columns: Vec<String>,

    /// Position of each column in the source row.
    source_indexes: Vec<usize>,

    transforms: TransformPlan,

    source_width: usize,
}

impl ProjectionPlan {
    /// Resolve `common` against the source column order.
    ///
    /// Every name in `common` must appear in `source_columns`.
    pub fn new(
        table: &str,
        common: &[String],
        source_columns: &[String],
        registry: &TransformRegistry,
    ) -> Result<Self> {
        let source_indexes = common
            .iter()
            .map(|c| {
                source_columns
                    .iter()
                    .position(|s| s == c)
                    .ok_or_else(|| {
                        MigrateError::transfer(table, format!("column {} missing from source", c))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            table: table.to_string(),
            columns: common.to_vec(),
            source_indexes,
            transforms: registry.plan(table, common),
            source_width: source_columns.len(),
        })
    }

    /// Project one source row, applying transforms.
    pub fn project(&self, mut row: Row) -> Result<Vec<SqlValue>> {
        if row.len() != self.source_width {
            return Err(MigrateError::transfer(
                &self.table,
                format!("row has {} values, expected {}", row.len(), self.source_width),
            ));
        }

        Ok(self
            .source_indexes
            .iter()
            .zip(&self.transforms)
            .map(|(&idx, transform)| {
                let value = std::mem::replace(&mut row[idx], SqlValue::Null);
                match transform {
                    Some(t) => t.apply(value),
                    None => value,
                }
            })
            .collect())
    }
}

/// Copies tables from one handle to another.
pub struct TableMigrator<'a> {
    transforms: &'a TransformRegistry,
    progress_interval: u64,
}

impl<'a> TableMigrator<'a> {
    pub fn new(transforms: &'a TransformRegistry, progress_interval: u64) -> Self {
        Self {
            transforms,
            progress_interval: progress_interval.max(1),
        }
    }

    /// Migrate one table. Never returns an error: failures end up in the report.
    pub async fn migrate_table(
        &self,
        source: &mut Database,
        dest: &mut Database,
        table: &str,
    ) -> TableReport {
        let started = Instant::now();
        info!("Migrating table {}", table);

        let source_columns = source.columns(table).await;
        if source_columns.is_empty() {
            warn!("Table {} not found in source, skipping", table);
            return TableReport::new(
                table,
                TableOutcome::Skipped {
                    reason: "table not found in source".into(),
                },
                Vec::new(),
                started,
            );
        }

        let dest_columns = dest.columns(table).await;
        if dest_columns.is_empty() {
            warn!("Table {} not found in destination, skipping", table);
            return TableReport::new(
                table,
                TableOutcome::Skipped {
                    reason: "table not found in destination".into(),
                },
                Vec::new(),
                started,
            );
        }

        let reconciled = reconcile(&dest_columns, &source_columns);
        if !reconciled.missing.is_empty() {
            warn!(
                "Table {}: source columns missing in destination will be dropped: {}",
                table,
                reconciled.missing.join(", ")
            );
        }
        if reconciled.is_empty() {
            warn!("Table {} has no columns in common, skipping", table);
            return TableReport::new(
                table,
                TableOutcome::Skipped {
                    reason: "no common columns".into(),
                },
                reconciled.missing,
                started,
            );
        }

        let outcome = match self
            .copy_table(source, dest, table, &reconciled.common, &source_columns)
            .await
        {
            Ok(rows) => {
                info!(
                    "Table {} migrated: {} rows in {:.1}s",
                    table,
                    rows,
                    started.elapsed().as_secs_f64()
                );
                TableOutcome::Migrated { rows }
            }
            Err(e) => {
                error!("Table {} failed and was rolled back: {}", table, e);
                TableOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        TableReport::new(table, outcome, reconciled.missing, started)
    }

    async fn copy_table(
        &self,
        source: &mut Database,
        dest: &mut Database,
        table: &str,
        common: &[String],
        source_columns: &[String],
    ) -> Result<u64> {
        let plan = ProjectionPlan::new(table, common, source_columns, self.transforms)?;
        let select_sql = source.dialect().build_select_all(table);
        let insert_sql = dest.dialect().build_insert_ignore(table, &plan.columns, 1);

        let mut tx = dest.begin().await?;
        match self
            .stream_into(source, &mut tx, table, &select_sql, &insert_sql, &plan)
            .await
        {
            Ok(rows) => {
                tx.commit()
                    .await
                    .map_err(|e| MigrateError::transfer(table, format!("commit failed: {}", e)))?;
                Ok(rows)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback of {} failed: {}", table, rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn stream_into(
        &self,
        source: &mut Database,
        tx: &mut Transaction<'_>,
        table: &str,
        select_sql: &str,
        insert_sql: &str,
        plan: &ProjectionPlan,
    ) -> Result<u64> {
        let mut rows = source.stream_rows(select_sql);
        let mut processed: u64 = 0;

        while let Some(row) = rows.next().await {
            let values = plan.project(row?)?;
            tx.execute(insert_sql, &values).await?;

            processed += 1;
            if processed % self.progress_interval == 0 {
                info!("{}: {} rows processed", table, processed);
            }
        }

        Ok(processed)
    }
}
