//! SQLite SQL dialect (Strategy pattern).

use crate::core::identifier::quote_backtick;
use crate::core::traits::Dialect;

/// SQLite dialect implementation.
///
/// SQLite accepts backtick quoting for MySQL compatibility.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn insert_ignore_prefix(&self) -> &'static str {
        "INSERT OR IGNORE INTO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_insert_ignore_multi_row() {
        let dialect = SqliteDialect::new();
        let sql = dialect.build_insert_ignore("abilities", &["group".into(), "model".into()], 2);
        assert_eq!(
            sql,
            "INSERT OR IGNORE INTO `abilities` (`group`, `model`) VALUES (?, ?), (?, ?)"
        );
    }

    #[test]
    fn test_build_select_all() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.build_select_all("logs"), "SELECT * FROM `logs`");
    }
}
