//! Error types for the export library.

use thiserror::Error;

/// Main error type for export operations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The table has no columns in the catalog.
    #[error("table {schema}.{table} not found (catalog returned no columns)")]
    NotFound { schema: String, table: String },

    /// A value's mapped type has no serialization rule.
    ///
    /// Raised instead of passing the value through unescaped: an unknown
    /// type must abort the export rather than risk silently corrupt SQL.
    #[error("no serialization rule for column {column} ({data_type}): {value}")]
    UnsupportedType {
        column: String,
        data_type: String,
        value: String,
    },

    /// Warehouse connection or query error.
    #[error("Warehouse error: {0}")]
    Db(#[from] tokio_postgres::Error),

    /// Connection pool error with context.
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// IO error (file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ExportError {
    /// Create a Pool error with context about where it occurred.
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        ExportError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a NotFound error for a table.
    pub fn not_found(schema: impl Into<String>, table: impl Into<String>) -> Self {
        ExportError::NotFound {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
