//! Identity types for rows and records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a row within one table
///
/// Ids are stored in `Int` columns when referenced, so only ids up to
/// `i64::MAX` can be the target of a column lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Create a new record ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Whether the ID is still unassigned (zero)
    pub fn is_unassigned(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identity of a record across tables
///
/// Always carries the canonical (production) table name, never the draft name,
/// so the same record is one key no matter which physical table it was read from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Canonical table name
    pub table: String,
    /// Primary key within the table
    pub id: RecordId,
}

impl RecordKey {
    /// Create a new record key
    pub fn new(table: impl Into<String>, id: impl Into<RecordId>) -> Self {
        Self {
            table: table.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.id)
    }
}
