//! Column-set reconciliation between source and destination tables.

use std::collections::HashSet;

/// Outcome of matching a destination column list against a source one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnReconciliation {
    /// Destination columns that also exist in the source, in destination order.
    pub common: Vec<String>,

    /// Source columns with no destination counterpart, in source order.
    pub missing: Vec<String>,
}

impl ColumnReconciliation {
    /// True when nothing can be copied.
    pub fn is_empty(&self) -> bool {
        self.common.is_empty()
    }
}

/// Reconcile destination and source column lists.
///
/// Matching is exact and case-sensitive.
pub fn reconcile(dest: &[String], src: &[String]) -> ColumnReconciliation {
    let src_set: HashSet<&str> = src.iter().map(String::as_str).collect();
    let dest_set: HashSet<&str> = dest.iter().map(String::as_str).collect();

    let common = dest
        .iter()
        .filter(|c| src_set.contains(c.as_str()))
        .cloned()
        .collect();
    let missing = src
        .iter()
        .filter(|c| !dest_set.contains(c.as_str()))
        .cloned()
        .collect();

    ColumnReconciliation { common, missing }
}
