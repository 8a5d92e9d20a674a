//! Model registry
//!
//! Every record type that takes part in publishing is registered once. The
//! registry maps both the canonical and the draft table name to the same
//! [`SupportedModel`], and is read on every intercepted operation.

use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::model::Record;
use indexmap::IndexMap;
use stagehand_core::{
    draft_table_name, original_table_name, ColumnType, Row, TableSchema, DELETED_AT,
    PUBLISH_STATUS,
};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// A registered record type
#[derive(Clone)]
pub struct SupportedModel {
    /// Rust type name, used in diagnostics
    pub type_name: &'static str,
    /// Canonical (production) table
    pub table: String,
    /// Draft table
    pub draft_table: String,
    /// Columns shared by both tables
    pub schema: TableSchema,
    dependencies: fn(&Row) -> Vec<Dependency>,
}

impl fmt::Debug for SupportedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupportedModel")
            .field("type_name", &self.type_name)
            .field("table", &self.table)
            .field("draft_table", &self.draft_table)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl SupportedModel {
    /// Describe a record type, checking its status columns
    pub fn of<T: Record>() -> Result<Self> {
        if original_table_name(T::TABLE) != T::TABLE {
            return Err(Error::ReservedTable {
                model: std::any::type_name::<T>().to_string(),
                table: T::TABLE.to_string(),
            });
        }
        let model = Self {
            type_name: std::any::type_name::<T>(),
            table: T::TABLE.to_string(),
            draft_table: draft_table_name(T::TABLE),
            schema: TableSchema::new(T::columns()),
            dependencies: T::dependencies,
        };
        model.check_column(DELETED_AT, ColumnType::Timestamp, true)?;
        model.check_column(PUBLISH_STATUS, ColumnType::Bool, false)?;
        Ok(model)
    }

    /// Dependencies declared by a row of this model
    pub fn dependencies(&self, row: &Row) -> Vec<Dependency> {
        (self.dependencies)(row)
    }

    fn check_column(&self, name: &str, ty: ColumnType, nullable: bool) -> Result<()> {
        let column = self
            .schema
            .column(name)
            .ok_or_else(|| Error::MissingColumn {
                model: self.type_name.to_string(),
                column: name.to_string(),
            })?;

        if column.ty != ty {
            return Err(self.invalid(name, format!("expected {}, found {}", ty, column.ty)));
        }
        if column.nullable != nullable {
            let reason = if nullable {
                "must be nullable"
            } else {
                "must not be nullable"
            };
            return Err(self.invalid(name, reason.to_string()));
        }
        Ok(())
    }

    fn invalid(&self, column: &str, reason: String) -> Error {
        Error::InvalidColumn {
            model: self.type_name.to_string(),
            column: column.to_string(),
            reason,
        }
    }
}

/// Registry of supported models, keyed by canonical table name
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<IndexMap<String, Arc<SupportedModel>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record type
    ///
    /// Registering the same table twice replaces the earlier entry.
    pub fn register<T: Record>(&self) -> Result<Arc<SupportedModel>> {
        let model = Arc::new(SupportedModel::of::<T>()?);
        debug!(model = model.type_name, table = %model.table, "registered model");
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(model.table.clone(), model.clone());
        Ok(model)
    }

    /// Look up a model by canonical or draft table name
    pub fn get(&self, table: &str) -> Option<Arc<SupportedModel>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(original_table_name(table))
            .cloned()
    }

    /// Look up a model, failing for unsupported tables
    pub fn require(&self, table: &str) -> Result<Arc<SupportedModel>> {
        self.get(table)
            .ok_or_else(|| Error::Unsupported(table.to_string()))
    }

    /// Whether a canonical or draft table belongs to a supported model
    pub fn contains(&self, table: &str) -> bool {
        self.get(table).is_some()
    }

    /// All models in registration order
    pub fn models(&self) -> Vec<Arc<SupportedModel>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Type names of all models in registration order
    pub fn supported_types(&self) -> Vec<&'static str> {
        self.models().iter().map(|model| model.type_name).collect()
    }

    pub fn len(&self) -> usize {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{Category, Product, Unversioned};
    use crate::model::Status;
    use stagehand_core::{ColumnDef, RecordId};

    struct LooseStatus;

    impl Record for LooseStatus {
        const TABLE: &'static str = "loose";

        fn columns() -> Vec<ColumnDef> {
            vec![
                ColumnDef::nullable(DELETED_AT, ColumnType::Timestamp),
                ColumnDef::nullable(PUBLISH_STATUS, ColumnType::Bool),
            ]
        }

        fn id(&self) -> RecordId {
            RecordId::new(0)
        }

        fn to_row(&self) -> Row {
            Row::new(RecordId::new(0))
        }

        fn from_row(_row: &Row) -> stagehand_core::Result<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ModelRegistry::new();
        registry.register::<Category>().unwrap();
        registry.register::<Product>().unwrap();

        assert_eq!(registry.len(), 2);
        let by_draft = registry.get("products_draft").unwrap();
        assert_eq!(by_draft.table, "products");
        assert_eq!(by_draft.draft_table, "products_draft");
        assert!(registry.contains("categories"));
        assert!(!registry.contains("variants"));
        assert!(matches!(
            registry.require("variants"),
            Err(Error::Unsupported(_))
        ));

        let types = registry.supported_types();
        assert!(types[0].ends_with("Category"));
        assert!(types[1].ends_with("Product"));
    }

    #[test]
    fn test_register_rejects_missing_status() {
        let registry = ModelRegistry::new();
        let err = registry.register::<Unversioned>().unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == PUBLISH_STATUS));
        assert!(registry.is_empty());
    }

    struct DraftNamed;

    impl Record for DraftNamed {
        const TABLE: &'static str = "pages_draft";

        fn columns() -> Vec<ColumnDef> {
            Status::columns().to_vec()
        }

        fn id(&self) -> RecordId {
            RecordId::new(0)
        }

        fn to_row(&self) -> Row {
            Row::new(RecordId::new(0))
        }

        fn from_row(_row: &Row) -> stagehand_core::Result<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn test_register_rejects_draft_table_names() {
        let registry = ModelRegistry::new();
        let err = registry.register::<DraftNamed>().unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, Error::ReservedTable { ref table, .. } if table == "pages_draft"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_nullable_publish_status() {
        let err = ModelRegistry::new().register::<LooseStatus>().unwrap_err();
        assert!(matches!(err, Error::InvalidColumn { ref column, .. } if column == PUBLISH_STATUS));
    }
}
