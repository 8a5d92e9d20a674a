//! Table metadata models for database storage.

use crate::error::{Error, Result};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use stagehand_core::TableSchema;

/// Stored schema of a migrated physical table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredTable {
    /// Primary key - physical table name.
    #[primary_key]
    pub name: String,
    /// Serialized column definitions.
    pub schema: Vec<u8>,
}

impl StoredTable {
    /// Create from a schema.
    pub fn from_schema(name: &str, schema: &TableSchema) -> Result<Self> {
        let schema =
            bincode::serialize(schema).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            schema,
        })
    }

    /// Convert to a schema.
    pub fn to_schema(&self) -> Result<TableSchema> {
        bincode::deserialize(&self.schema).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Next id to hand out for a physical table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredSequence {
    /// Primary key - physical table name.
    #[primary_key]
    pub table: String,
    /// Next unused id.
    pub next: u64,
}
