//! Error types for stagehand-publish
//!
//! Errors fall into three groups:
//! - configuration: a model cannot be supported (`ReservedTable`,
//!   `MissingColumn`, `InvalidColumn`)
//! - resolution: the dependency graph cannot be built (`Unsupported`,
//!   `RecordNotFound`, `UnresolvedDependency`, `DeletedDependency`,
//!   `RequiredInProduction`, `IdOutOfRange`)
//! - transactional: the store failed (`Store`); the publish or discard
//!   transaction is rolled back

use stagehand_core::RecordKey;
use thiserror::Error;

/// Result type for stagehand-publish operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while publishing or discarding
#[derive(Debug, Error)]
pub enum Error {
    /// Table name collides with the draft naming scheme
    #[error("{model} uses table {table}, which is reserved for draft tables")]
    ReservedTable { model: String, table: String },

    /// A supported model lacks a required column
    #[error("{model} has no {column} column")]
    MissingColumn { model: String, column: String },

    /// A required column has the wrong definition
    #[error("{model}.{column} is invalid: {reason}")]
    InvalidColumn {
        model: String,
        column: String,
        reason: String,
    },

    /// Table does not belong to a supported model
    #[error("table {0} is not a supported model")]
    Unsupported(String),

    /// Target record has no draft row
    #[error("record {0} not found")]
    RecordNotFound(RecordKey),

    /// A publish dependency has no draft row
    #[error("{record} requires {dependency}, which does not exist")]
    UnresolvedDependency {
        record: RecordKey,
        dependency: RecordKey,
    },

    /// A publish dependency is deleted in draft
    #[error("{record} requires {dependency}, which is deleted")]
    DeletedDependency {
        record: RecordKey,
        dependency: RecordKey,
    },

    /// Removing a record from production would strand a published dependent
    #[error("{record} cannot leave production while {dependent} requires it")]
    RequiredInProduction {
        record: RecordKey,
        dependent: RecordKey,
    },

    /// Record id does not fit an Int column
    #[error("id of {0} is out of range")]
    IdOutOfRange(RecordKey),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] stagehand_db::Error),

    /// Row decoding error
    #[error("row error: {0}")]
    Row(#[from] stagehand_core::Error),

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("RON parse error: {0}")]
    Config(#[from] ron::error::SpannedError),
}

impl Error {
    /// Whether this error comes from model registration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ReservedTable { .. }
                | Error::MissingColumn { .. }
                | Error::InvalidColumn { .. }
        )
    }

    /// Whether this error comes from dependency resolution
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Error::Unsupported(_)
                | Error::RecordNotFound(_)
                | Error::UnresolvedDependency { .. }
                | Error::DeletedDependency { .. }
                | Error::RequiredInProduction { .. }
                | Error::IdOutOfRange(_)
        )
    }
}

// Error travels through store callbacks, so it must be Send + Sync.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<Error>();
};
