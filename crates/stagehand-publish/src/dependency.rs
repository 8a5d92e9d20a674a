//! Dependency descriptors
//!
//! A record declares two kinds of edges:
//! - [`DependencyKind::PublishRequires`]: the target must be published first
//! - [`DependencyKind::DiscardCascades`]: the target is discarded alongside
//!
//! Targets are either a concrete record key or every row of another table
//! whose column references this record.

use serde::{Deserialize, Serialize};
use stagehand_core::RecordKey;

/// Direction of a dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Target must be in production before this record
    PublishRequires,
    /// Target is discarded when this record is
    DiscardCascades,
}

/// How the target of a dependency is located
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookup {
    /// A single record
    Key(RecordKey),
    /// Rows of `table` whose `column` holds this record's id
    ReferencedBy { table: String, column: String },
}

/// One dependency edge declared by a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub lookup: Lookup,
}

impl Dependency {
    /// Dependency on a single record
    pub fn key(kind: DependencyKind, key: RecordKey) -> Self {
        Self {
            kind,
            lookup: Lookup::Key(key),
        }
    }

    /// Dependency on all rows of `table` referencing this record via `column`
    pub fn referenced_by(
        kind: DependencyKind,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            lookup: Lookup::ReferencedBy {
                table: table.into(),
                column: column.into(),
            },
        }
    }

    /// Shorthand for a publish-requires edge to a record
    pub fn requires(key: RecordKey) -> Self {
        Self::key(DependencyKind::PublishRequires, key)
    }

    /// Shorthand for a discard-cascades edge to rows referencing this record
    pub fn cascades_to(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::referenced_by(DependencyKind::DiscardCascades, table, column)
    }

    pub fn is_publish(&self) -> bool {
        self.kind == DependencyKind::PublishRequires
    }

    pub fn is_discard(&self) -> bool {
        self.kind == DependencyKind::DiscardCascades
    }
}
