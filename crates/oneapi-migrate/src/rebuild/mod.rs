//! Rebuild of the destination `abilities` table from `channels`.
//!
//! one-api routes requests through `abilities`, one row per
//! (group, model, channel). The rows are derived from the comma-separated
//! `group` and `models` fields of each channel, so after the copy they are
//! regenerated from the destination's own `channels` table.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::traits::Dialect;
use crate::core::value::{Row, SqlValue};
use crate::drivers::{Database, Transaction};
use crate::error::{MigrateError, Result};

/// Log progress every N channels scanned.
const PROGRESS_CHANNELS: u64 = 200;

const ABILITY_COLUMNS: [&str; 5] = ["group", "model", "channel_id", "enabled", "priority"];

/// SQLite's default bind parameter limit, the lowest of the three engines.
const MAX_BIND_PARAMS: usize = 32_766;

/// Largest batch whose multi-row insert stays within [`MAX_BIND_PARAMS`].
pub const MAX_BATCH_ROWS: usize = MAX_BIND_PARAMS / ABILITY_COLUMNS.len();

const REQUIRED_CHANNEL_COLUMNS: [&str; 4] = ["id", "group", "models", "status"];

/// One derived `abilities` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityRow {
    pub group: String,
    pub model: String,
    pub channel_id: i64,
    pub enabled: bool,
    pub priority: Option<i64>,
}

impl AbilityRow {
    fn push_params(self, params: &mut Vec<SqlValue>) {
        params.push(SqlValue::Text(self.group));
        params.push(SqlValue::Text(self.model));
        params.push(SqlValue::I64(self.channel_id));
        params.push(SqlValue::Bool(self.enabled));
        params.push(self.priority.map_or(SqlValue::Null, SqlValue::I64));
    }
}

/// The channel fields the rebuild reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub id: i64,
    pub group: String,
    pub models: String,
    pub status: Option<i64>,
    pub priority: Option<i64>,
}

impl ChannelRecord {
    /// Decode a row selected as `id, group, models, status, priority`.
    fn from_row(mut row: Row) -> Result<Self> {
        if row.len() != 5 {
            return Err(MigrateError::decode(
                "channels",
                format!("expected 5 values, got {}", row.len()),
            ));
        }
        let priority = row.pop().and_then(|v| v.as_i64());
        let status = row.pop().and_then(|v| v.as_i64());
        let models = row.pop().and_then(|v| v.as_text()).unwrap_or_default();
        let group = row.pop().and_then(|v| v.as_text()).unwrap_or_default();
        let id_value = row.pop().unwrap_or(SqlValue::Null);
        let id = id_value
            .as_i64()
            .ok_or_else(|| MigrateError::decode("id", format!("not an integer: {}", id_value)))?;

        Ok(Self {
            id,
            group,
            models,
            status,
            priority,
        })
    }
}

/// Counters for a completed rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub channels_scanned: u64,

    /// Channels with an empty group or model list.
    pub channels_skipped: u64,

    pub rows_generated: u64,

    /// INSERT statements executed.
    pub statements: u64,

    pub duration_ms: u64,
}

/// How the rebuild ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RebuildOutcome {
    Rebuilt(RebuildReport),
    Skipped { reason: String },
    Failed { error: String },
}

/// Split a comma-separated field, trimming fragments and dropping empty ones.
pub fn split_csv_trim(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remove duplicates, keeping the first occurrence of each item.
pub fn dedup(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Expand a channel into its ability rows.
///
/// Empty when either the group list or the model list is empty.
pub fn expand_abilities(channel: &ChannelRecord) -> Vec<AbilityRow> {
    let groups = dedup(split_csv_trim(&channel.group));
    let models = dedup(split_csv_trim(&channel.models));
    let enabled = channel.status == Some(1);

    groups
        .iter()
        .flat_map(|group| {
            models.iter().map(move |model| AbilityRow {
                group: group.clone(),
                model: model.clone(),
                channel_id: channel.id,
                enabled,
                priority: channel.priority,
            })
        })
        .collect()
}

/// Regenerates `abilities` on the destination.
pub struct AbilityRebuilder {
    batch_rows: usize,
}

impl AbilityRebuilder {
    pub fn new(batch_rows: usize) -> Self {
        Self {
            batch_rows: batch_rows.clamp(1, MAX_BATCH_ROWS),
        }
    }

    /// Run the rebuild. Failures are rolled back and reported, never returned.
    pub async fn rebuild(&self, dest: &mut Database) -> RebuildOutcome {
        let started = Instant::now();
        info!("Rebuilding abilities from channels");

        let ability_columns = dest.columns("abilities").await;
        if ability_columns.is_empty() {
            return skipped("abilities table not found in destination");
        }
        let channel_columns = dest.columns("channels").await;
        if channel_columns.is_empty() {
            return skipped("channels table not found in destination");
        }
        let missing: Vec<&str> = REQUIRED_CHANNEL_COLUMNS
            .iter()
            .copied()
            .filter(|c| !channel_columns.iter().any(|have| have == c))
            .collect();
        if !missing.is_empty() {
            return skipped(&format!("channels lacks columns: {}", missing.join(", ")));
        }
        let has_priority = channel_columns.iter().any(|c| c == "priority");

        let dialect = dest.dialect();
        let select_sql = build_channel_select(&dialect, has_priority);
        debug!("Channel query: {}", select_sql);

        let channels = match dest.fetch_all(&select_sql).await {
            Ok(rows) => rows,
            Err(e) => return failed(e),
        };

        let mut tx = match dest.begin().await {
            Ok(tx) => tx,
            Err(e) => return failed(e),
        };

        match self.write_abilities(&dialect, &mut tx, channels).await {
            Ok(mut report) => {
                if let Err(e) = tx.commit().await {
                    return failed(e);
                }
                report.duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    "Abilities rebuilt: {} rows from {} channels in {} statements",
                    report.rows_generated, report.channels_scanned, report.statements
                );
                RebuildOutcome::Rebuilt(report)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback of abilities rebuild failed: {}", rollback_err);
                }
                failed(e)
            }
        }
    }

    async fn write_abilities(
        &self,
        dialect: &impl Dialect,
        tx: &mut Transaction<'_>,
        channels: Vec<Row>,
    ) -> Result<RebuildReport> {
        let columns: Vec<String> = ABILITY_COLUMNS.iter().map(|c| c.to_string()).collect();
        let full_batch_sql = dialect.build_insert_ignore("abilities", &columns, self.batch_rows);

        let mut report = RebuildReport::default();
        let mut params: Vec<SqlValue> = Vec::with_capacity(self.batch_rows * columns.len());
        let mut pending = 0usize;

        for row in channels {
            let channel = ChannelRecord::from_row(row)?;
            report.channels_scanned += 1;

            let abilities = expand_abilities(&channel);
            if abilities.is_empty() {
                report.channels_skipped += 1;
            }

            for ability in abilities {
                ability.push_params(&mut params);
                pending += 1;
                report.rows_generated += 1;

                if pending == self.batch_rows {
                    tx.execute(&full_batch_sql, &params).await?;
                    report.statements += 1;
                    params.clear();
                    pending = 0;
                }
            }

            if report.channels_scanned % PROGRESS_CHANNELS == 0 {
                info!(
                    "abilities: {} channels scanned, {} rows generated",
                    report.channels_scanned, report.rows_generated
                );
            }
        }

        if pending > 0 {
            let sql = dialect.build_insert_ignore("abilities", &columns, pending);
            tx.execute(&sql, &params).await?;
            report.statements += 1;
        }

        Ok(report)
    }
}

fn build_channel_select(dialect: &impl Dialect, has_priority: bool) -> String {
    let priority = if has_priority {
        dialect.quote_ident("priority")
    } else {
        "0".to_string()
    };
    format!(
        "SELECT {}, {}, {}, {}, {} FROM {}",
        dialect.quote_ident("id"),
        dialect.quote_ident("group"),
        dialect.quote_ident("models"),
        dialect.quote_ident("status"),
        priority,
        dialect.quote_ident("channels")
    )
}

fn skipped(reason: &str) -> RebuildOutcome {
    warn!("Skipping abilities rebuild: {}", reason);
    RebuildOutcome::Skipped {
        reason: reason.to_string(),
    }
}

fn failed(e: MigrateError) -> RebuildOutcome {
    error!("Abilities rebuild failed and was rolled back: {}", e);
    RebuildOutcome::Failed {
        error: e.to_string(),
    }
}
