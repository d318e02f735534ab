//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (missing DSN, bad YAML values, unknown dialect).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A connection string could not be understood.
    #[error("Invalid {dialect} connection string: {message}")]
    InvalidDsn { dialect: String, message: String },

    /// Connection setup failed, with context about which side.
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// MySQL or SQLite error surfaced by sqlx.
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// PostgreSQL error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// A scanned cell could not be decoded into a dynamic value.
    #[error("Failed to decode column {column}: {message}")]
    Decode { column: String, message: String },

    /// A value could not be converted to the destination parameter type.
    #[error("Cannot bind {value} as {target_type}")]
    Coercion { value: String, target_type: String },

    /// Data transfer failed for a specific table.
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// IO error (config file reads).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred.
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Transfer error.
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidDsn error.
    pub fn invalid_dsn(dialect: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::InvalidDsn {
            dialect: dialect.into(),
            message: message.into(),
        }
    }

    /// Create a Decode error.
    pub fn decode(column: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Decode {
            column: column.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error should stop the whole process.
    ///
    /// Everything else is scoped to a single table or the rebuild step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrateError::Config(_)
                | MigrateError::InvalidDsn { .. }
                | MigrateError::Connection { .. }
                | MigrateError::Io(_)
                | MigrateError::Yaml(_)
        )
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
