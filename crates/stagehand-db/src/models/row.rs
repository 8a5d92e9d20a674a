//! Row model for database storage.

use crate::error::{Error, Result};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use stagehand_core::{RecordId, Row, ValueMap};

/// A row of any physical table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredRow {
    /// Primary key - `table/id` with a zero-padded id.
    #[primary_key]
    pub key: String,
    /// Physical table name.
    #[secondary_key]
    pub table: String,
    /// Row id within the table.
    pub id: u64,
    /// Serialized columns.
    pub columns: Vec<u8>,
}

impl StoredRow {
    /// Primary key for a row of a table.
    pub fn primary_key(table: &str, id: RecordId) -> String {
        format!("{}/{:020}", table, id.raw())
    }

    /// Create from a row.
    pub fn from_row(table: &str, row: &Row) -> Result<Self> {
        let columns =
            bincode::serialize(&row.columns).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self {
            key: Self::primary_key(table, row.id),
            table: table.to_string(),
            id: row.id.raw(),
            columns,
        })
    }

    /// Convert to a row.
    pub fn to_row(&self) -> Result<Row> {
        let columns: ValueMap = bincode::deserialize(&self.columns)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Row {
            id: RecordId::new(self.id),
            columns,
        })
    }
}
