//! Per-column value transforms.
//!
//! The [`TransformRegistry`] is keyed by `(table, column)`. It is built once
//! and handed to the row migrator, which resolves a plan per table so the
//! row loop never looks anything up by name.

mod channel_type;

use std::collections::HashMap;
use std::sync::Arc;

pub use channel_type::{remap_channel_type, ChannelTypeTransform, UNKNOWN_CHANNEL_TYPE};

use crate::core::traits::ValueTransform;
use crate::core::value::SqlValue;

/// Transforms resolved for one table's projected columns, positionally.
pub type TransformPlan = Vec<Option<Arc<dyn ValueTransform>>>;

/// Registry of value transforms.
#[derive(Default, Clone)]
pub struct TransformRegistry {
    transforms: HashMap<(String, String), Arc<dyn ValueTransform>>,
}

impl TransformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in rules: `channels.type` remapping.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("channels", "type", Arc::new(ChannelTypeTransform::new()));
        registry
    }

    /// Register (or replace) the transform for `table.column`.
    pub fn register(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        transform: Arc<dyn ValueTransform>,
    ) {
        self.transforms
            .insert((table.into(), column.into()), transform);
    }

    pub fn get(&self, table: &str, column: &str) -> Option<Arc<dyn ValueTransform>> {
        self.transforms
            .get(&(table.to_string(), column.to_string()))
            .cloned()
    }

    /// Apply the transform for `table.column`, or pass the value through.
    pub fn transform(&self, table: &str, column: &str, value: SqlValue) -> SqlValue {
        match self.get(table, column) {
            Some(t) => t.apply(value),
            None => value,
        }
    }

    /// Resolve the transforms for `columns` of `table` once.
    pub fn plan(&self, table: &str, columns: &[String]) -> TransformPlan {
        columns.iter().map(|c| self.get(table, c)).collect()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self
            .transforms
            .iter()
            .map(|((t, c), x)| format!("{}.{}={}", t, c, x.name()))
            .collect();
        keys.sort();
        f.debug_struct("TransformRegistry")
            .field("transforms", &keys)
            .finish()
    }
}
