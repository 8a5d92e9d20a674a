//! Error types for stagehand-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("Type error in {table}.{column}: expected {expected}, got {got}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        got: String,
    },

    #[error("Null value in non-null column {table}.{column}")]
    NullViolation { table: String, column: String },

    #[error("Column {column} is missing from row {row}")]
    MissingValue { row: String, column: String },

    #[error("Column {column} cannot be read as {expected}")]
    InvalidValue { column: String, expected: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
