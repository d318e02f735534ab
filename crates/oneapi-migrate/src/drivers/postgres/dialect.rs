//! PostgreSQL SQL dialect (Strategy pattern).

use crate::core::identifier::quote_double;
use crate::core::traits::Dialect;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn insert_ignore_prefix(&self) -> &'static str {
        "INSERT INTO"
    }

    fn insert_ignore_suffix(&self) -> &'static str {
        "ON CONFLICT DO NOTHING"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_ident("users"), "\"users\"");
        assert_eq!(dialect.quote_ident("table\"name"), "\"table\"\"name\"");
    }

    #[test]
    fn test_param_placeholder() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.param_placeholder(1), "$1");
        assert_eq!(dialect.param_placeholder(10), "$10");
    }

    #[test]
    fn test_build_insert_ignore_numbers_across_rows() {
        let dialect = PostgresDialect::new();
        let sql = dialect.build_insert_ignore("abilities", &["group".into(), "model".into()], 2);
        assert_eq!(
            sql,
            "INSERT INTO \"abilities\" (\"group\", \"model\") VALUES ($1, $2), ($3, $4) ON CONFLICT DO NOTHING"
        );
    }
}
