//! Core traits for dialect-agnostic data migration.
//!
//! - [`Dialect`]: SQL syntax strategy for the supported database engines
//! - [`ValueTransform`]: per-column value rewrite applied during projection

use std::fmt::Debug;

use super::value::SqlValue;

/// SQL dialect strategy.
///
/// Each supported database provides its own identifier quoting, placeholder
/// syntax and conflict-tolerant INSERT form. Statement builders with a
/// default body are shared by all dialects.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier ("mysql", "postgres", "sqlite").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name).
    ///
    /// - MySQL / SQLite: `` `identifier` ``
    /// - PostgreSQL: `"identifier"`
    fn quote_ident(&self, name: &str) -> String;

    /// Get a parameter placeholder for the given 1-based index.
    ///
    /// - MySQL / SQLite: `?`
    /// - PostgreSQL: `$1`, `$2`, etc.
    fn param_placeholder(&self, index: usize) -> String;

    /// Leading keywords of a conflict-tolerant INSERT.
    fn insert_ignore_prefix(&self) -> &'static str;

    /// Trailing clause of a conflict-tolerant INSERT, if the dialect needs one.
    fn insert_ignore_suffix(&self) -> &'static str {
        ""
    }

    /// Zero-row probe used to read a table's column metadata.
    fn build_probe_query(&self, table: &str) -> String {
        format!("SELECT * FROM {} LIMIT 0", self.quote_ident(table))
    }

    /// Full-table read.
    fn build_select_all(&self, table: &str) -> String {
        format!("SELECT * FROM {}", self.quote_ident(table))
    }

    /// Build a conflict-tolerant INSERT with `rows` VALUES tuples.
    ///
    /// Placeholders are numbered across the whole statement, so a two-column,
    /// two-row PostgreSQL insert uses `$1..$4`.
    fn build_insert_ignore(&self, table: &str, columns: &[String], rows: usize) -> String {
        let cols = columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let width = columns.len();
        let tuples = (0..rows)
            .map(|row| {
                let params = (1..=width)
                    .map(|col| self.param_placeholder(row * width + col))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", params)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "{} {} ({}) VALUES {}",
            self.insert_ignore_prefix(),
            self.quote_ident(table),
            cols,
            tuples
        );
        let suffix = self.insert_ignore_suffix();
        if !suffix.is_empty() {
            sql.push(' ');
            sql.push_str(suffix);
        }
        sql
    }
}

/// A rewrite applied to one column's values while rows are projected.
///
/// Transforms are total: a value that cannot be rewritten is replaced by a
/// sentinel and logged, never turned into an error.
pub trait ValueTransform: Send + Sync + Debug {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Rewrite a single value.
    fn apply(&self, value: SqlValue) -> SqlValue;
}
