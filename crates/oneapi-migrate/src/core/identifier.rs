//! Identifier validation and quoting.
//!
//! Table and column names cannot be bound as statement parameters, so every
//! dynamic statement quotes them here. Embedded quote characters are doubled.

use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate a configured table name.
///
/// Rejects empty names, names containing null bytes and names longer than
/// the cross-database limit.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote with ANSI double quotes (PostgreSQL).
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote with backticks (MySQL, SQLite).
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("channels").is_ok());
        assert!(validate_identifier("group").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        assert!(validate_identifier("users\0--").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(validate_identifier(&long_name).is_err());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
    }

    #[test]
    fn test_quote_double_escapes_embedded_quote() {
        assert_eq!(quote_double("group"), "\"group\"");
        assert_eq!(quote_double("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_quote_backtick_escapes_embedded_backtick() {
        assert_eq!(quote_backtick("group"), "`group`");
        assert_eq!(quote_backtick("a`b"), "`a``b`");
    }

    #[test]
    fn test_quote_injection_stays_inside_identifier() {
        let quoted = quote_backtick("users`; DROP TABLE users; --");
        assert_eq!(quoted, "`users``; DROP TABLE users; --`");
    }
}
