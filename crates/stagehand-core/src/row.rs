//! Rows as stored in draft and production tables

use crate::error::{Error, Result};
use crate::value::FromValue;
use crate::{RecordId, Value, ValueMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Soft-delete marker column (nullable timestamp)
pub const DELETED_AT: &str = "deleted_at";

/// Publish status column (`true` = dirty, `false` = published)
pub const PUBLISH_STATUS: &str = "publish_status";

/// Publish status value for a record whose draft differs from production
pub const DIRTY: bool = true;

/// Publish status value for a record in sync with production
pub const PUBLISHED: bool = false;

/// A single row: primary key plus dynamic columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Primary key
    pub id: RecordId,
    /// Column values (e.g., {"name": "lamp", "price": 10.0})
    pub columns: ValueMap,
}

impl Row {
    /// Create a new row with no columns
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            columns: ValueMap::new(),
        }
    }

    /// Get a column value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.columns.get(key)
    }

    /// Get a column value, failing if it is absent
    pub fn require(&self, key: &str) -> Result<&Value> {
        self.columns.get(key).ok_or_else(|| Error::MissingValue {
            row: self.id.to_string(),
            column: key.to_string(),
        })
    }

    /// Read a typed column value; an absent column reads as null
    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T> {
        let value = self.columns.get(key).unwrap_or(&Value::Null);
        T::from_value(value).ok_or_else(|| Error::InvalidValue {
            column: key.to_string(),
            expected: T::EXPECTED.to_string(),
        })
    }

    /// Set a column value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(key.into(), value.into());
    }

    /// Builder-style column assignment
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Remove a column
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.columns.shift_remove(key)
    }

    /// Soft-delete timestamp, if set
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.get(DELETED_AT).and_then(Value::as_timestamp)
    }

    /// Whether the soft-delete marker is set
    pub fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }

    /// Set the soft-delete marker
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        self.set(DELETED_AT, at);
    }

    /// Clear the soft-delete marker
    pub fn restore(&mut self) {
        self.set(DELETED_AT, Value::Null);
    }

    /// Whether the row is marked dirty (absent status counts as published)
    pub fn is_dirty(&self) -> bool {
        self.get(PUBLISH_STATUS)
            .and_then(Value::as_bool)
            .unwrap_or(PUBLISHED)
    }

    /// Set the publish status flag
    pub fn set_dirty(&mut self, dirty: bool) {
        self.set(PUBLISH_STATUS, dirty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_row_columns() {
        let mut row = Row::new(RecordId::new(3)).with("name", "lamp");
        assert_eq!(row.get("name").and_then(Value::as_str), Some("lamp"));
        assert!(row.require("price").is_err());

        assert_eq!(row.get_as::<String>("name").unwrap(), "lamp");
        assert_eq!(row.get_as::<Option<f64>>("price").unwrap(), None);
        assert!(row.get_as::<f64>("price").is_err());

        row.remove("name");
        assert!(row.get("name").is_none());
    }

    #[test]
    fn test_publish_status() {
        let mut row = Row::new(RecordId::new(1));
        assert!(!row.is_dirty());

        row.set_dirty(DIRTY);
        assert!(row.is_dirty());

        row.set_dirty(PUBLISHED);
        assert!(!row.is_dirty());
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut row = Row::new(RecordId::new(1));
        assert!(!row.is_deleted());

        row.soft_delete(at);
        assert_eq!(row.deleted_at(), Some(at));

        row.restore();
        assert!(!row.is_deleted());
        assert_eq!(row.get(DELETED_AT), Some(&Value::Null));
    }
}
