//! Table schemas and column definitions
//!
//! Draft and production tables of one model share a single [`TableSchema`];
//! only the physical table name differs.

use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    String,
    Timestamp,
    /// Accepts any value; used for list-valued and free-form columns
    Any,
}

impl ColumnType {
    /// Check whether a (non-null) value can be stored in this column
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ColumnType::Any, _) => true,
            (ColumnType::Bool, Value::Bool(_)) => true,
            (ColumnType::Int, Value::Int(_)) => true,
            (ColumnType::Float, Value::Float(_) | Value::Int(_)) => true,
            (ColumnType::String, Value::String(_)) => true,
            (ColumnType::Timestamp, Value::Timestamp(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Definition of a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Storage type
    pub ty: ColumnType,
    /// Whether null (or an absent value) is allowed
    pub nullable: bool,
}

impl ColumnDef {
    /// A non-null column
    pub fn required(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
        }
    }

    /// A nullable column
    pub fn nullable(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
        }
    }
}

/// Column layout of a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Create a schema from column definitions
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if the schema declares a column
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Additively merge another schema into this one
    ///
    /// New columns are appended, existing ones take the incoming definition.
    /// Columns are never dropped.
    pub fn merge(&mut self, other: &TableSchema) {
        for incoming in &other.columns {
            match self.columns.iter_mut().find(|c| c.name == incoming.name) {
                Some(existing) => *existing = incoming.clone(),
                None => self.columns.push(incoming.clone()),
            }
        }
    }

    /// Validate a row against this schema
    pub fn validate_row(&self, table: &str, row: &Row) -> Result<()> {
        for name in row.columns.keys() {
            if !self.has_column(name) {
                return Err(Error::UnknownColumn {
                    table: table.to_string(),
                    column: name.clone(),
                });
            }
        }

        for column in &self.columns {
            match row.get(&column.name) {
                None | Some(Value::Null) => {
                    if !column.nullable {
                        return Err(Error::NullViolation {
                            table: table.to_string(),
                            column: column.name.clone(),
                        });
                    }
                }
                Some(value) if !column.ty.accepts(value) => {
                    return Err(Error::TypeMismatch {
                        table: table.to_string(),
                        column: column.name.clone(),
                        expected: column.ty.to_string(),
                        got: value.type_name().to_string(),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordId;

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            ColumnDef::required("name", ColumnType::String),
            ColumnDef::nullable("price", ColumnType::Float),
        ])
    }

    #[test]
    fn test_validate_accepts_matching_row() {
        let mut row = Row::new(RecordId::new(1));
        row.set("name", "lamp");
        row.set("price", 10i64);
        assert!(schema().validate_row("products", &row).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_column() {
        let mut row = Row::new(RecordId::new(1));
        row.set("name", "lamp");
        row.set("colour", "red");
        assert_eq!(
            schema().validate_row("products", &row),
            Err(Error::UnknownColumn {
                table: "products".into(),
                column: "colour".into()
            })
        );
    }

    #[test]
    fn test_validate_rejects_null_and_type_errors() {
        let row = Row::new(RecordId::new(1));
        assert!(matches!(
            schema().validate_row("products", &row),
            Err(Error::NullViolation { .. })
        ));

        let mut row = Row::new(RecordId::new(1));
        row.set("name", 5i64);
        assert!(matches!(
            schema().validate_row("products", &row),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_merge_adds_and_redefines() {
        let mut base = schema();
        base.merge(&TableSchema::new(vec![
            ColumnDef::required("price", ColumnType::Float),
            ColumnDef::nullable("sku", ColumnType::String),
        ]));

        assert_eq!(base.columns.len(), 3);
        assert!(!base.column("price").unwrap().nullable);
        assert!(base.has_column("sku"));
        assert!(base.has_column("name"));
    }
}
