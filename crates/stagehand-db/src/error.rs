//! Error types for storage operations.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Native DB error.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Row not found.
    #[error("Row not found: {0}")]
    NotFound(String),

    /// Duplicate key.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Table was never migrated.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Row rejected by the table schema.
    #[error("Schema violation: {0}")]
    Schema(#[from] stagehand_core::Error),

    /// A registered operation callback failed.
    #[error("Callback {name} failed: {source}")]
    Callback {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an error raised inside a named callback
    pub fn callback(
        name: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Callback {
            name: name.into(),
            source: Box::new(source),
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;
