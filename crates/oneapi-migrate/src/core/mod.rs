//! Core abstractions shared by every driver.
//!
//! - [`value`]: dynamically-typed SQL values
//! - [`traits`]: the [`Dialect`] strategy and the [`ValueTransform`] seam
//! - [`schema`]: column-set reconciliation
//! - [`identifier`]: identifier validation and quoting

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{reconcile, ColumnReconciliation};
pub use traits::{Dialect, ValueTransform};
pub use value::{Row, SqlValue};
