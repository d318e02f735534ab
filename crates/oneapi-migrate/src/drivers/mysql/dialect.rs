//! MySQL/MariaDB SQL dialect (Strategy pattern).

use crate::core::identifier::quote_backtick;
use crate::core::traits::Dialect;

/// MySQL/MariaDB dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn insert_ignore_prefix(&self) -> &'static str {
        "INSERT IGNORE INTO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_ident("group"), "`group`");
        assert_eq!(dialect.quote_ident("table`name"), "`table``name`");
    }

    #[test]
    fn test_param_placeholder() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.param_placeholder(1), "?");
        assert_eq!(dialect.param_placeholder(10), "?");
    }

    #[test]
    fn test_build_insert_ignore_single_row() {
        let dialect = MysqlDialect::new();
        let sql = dialect.build_insert_ignore("tokens", &["id".into(), "key".into()], 1);
        assert_eq!(sql, "INSERT IGNORE INTO `tokens` (`id`, `key`) VALUES (?, ?)");
    }

    #[test]
    fn test_build_probe_query() {
        let dialect = MysqlDialect::new();
        assert_eq!(
            dialect.build_probe_query("channels"),
            "SELECT * FROM `channels` LIMIT 0"
        );
    }
}
