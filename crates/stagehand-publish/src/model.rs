//! Records: application types stored in draft and production tables

use crate::dependency::Dependency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagehand_core::{
    ColumnDef, ColumnType, RecordId, RecordKey, Result, Row, DELETED_AT, PUBLISHED,
    PUBLISH_STATUS,
};

/// An application type that can be supported for publishing
///
/// Implementations describe their columns statically; registration checks
/// them for the soft-delete marker and the publish status flag.
pub trait Record: Sized {
    /// Canonical (production) table name
    const TABLE: &'static str;

    /// Column definitions, identical for draft and production tables
    fn columns() -> Vec<ColumnDef>;

    /// Primary key (zero until the row is created)
    fn id(&self) -> RecordId;

    /// Encode into a row
    fn to_row(&self) -> Row;

    /// Decode from a row
    fn from_row(row: &Row) -> Result<Self>;

    /// Records this row depends on when publishing or discarding
    fn dependencies(_row: &Row) -> Vec<Dependency> {
        Vec::new()
    }

    /// Identity key of this record
    fn key(&self) -> RecordKey {
        RecordKey::new(Self::TABLE, self.id())
    }
}

/// Soft-delete marker and publish status, embeddable in a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    /// Soft-delete timestamp
    pub deleted_at: Option<DateTime<Utc>>,
    /// `true` while draft and production differ
    pub publish_status: bool,
}

impl Status {
    /// The two column definitions every supported record carries
    pub fn columns() -> [ColumnDef; 2] {
        [
            ColumnDef::nullable(DELETED_AT, ColumnType::Timestamp),
            ColumnDef::required(PUBLISH_STATUS, ColumnType::Bool),
        ]
    }

    /// Read the status columns of a row
    pub fn read(row: &Row) -> Result<Self> {
        Ok(Self {
            deleted_at: row.get_as(DELETED_AT)?,
            publish_status: row.get_as::<Option<bool>>(PUBLISH_STATUS)?.unwrap_or(PUBLISHED),
        })
    }

    /// Write the status columns into a row
    pub fn write(&self, row: &mut Row) {
        row.set(DELETED_AT, self.deleted_at);
        row.set(PUBLISH_STATUS, self.publish_status);
    }

    /// Whether the record has unpublished changes
    pub fn is_dirty(&self) -> bool {
        self.publish_status
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Records shared by the crate's tests.
    //!
    //! `Category <- Product <- Variant`: a product requires its category to be
    //! published first, and discarding a product cascades to its variants.

    use super::*;
    use crate::dependency::{Dependency, DependencyKind};
    use stagehand_core::Value;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Category {
        pub id: RecordId,
        pub name: String,
        pub status: Status,
    }

    impl Category {
        pub fn new(name: &str) -> Self {
            Self {
                id: RecordId::new(0),
                name: name.to_string(),
                status: Status::default(),
            }
        }
    }

    impl Record for Category {
        const TABLE: &'static str = "categories";

        fn columns() -> Vec<ColumnDef> {
            let mut columns = vec![ColumnDef::required("name", ColumnType::String)];
            columns.extend(Status::columns());
            columns
        }

        fn id(&self) -> RecordId {
            self.id
        }

        fn to_row(&self) -> Row {
            let mut row = Row::new(self.id).with("name", self.name.as_str());
            self.status.write(&mut row);
            row
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.id,
                name: row.get_as("name")?,
                status: Status::read(row)?,
            })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Product {
        pub id: RecordId,
        pub name: String,
        pub price: f64,
        pub category_id: Option<u64>,
        pub status: Status,
    }

    impl Product {
        pub fn new(name: &str, price: f64) -> Self {
            Self {
                id: RecordId::new(0),
                name: name.to_string(),
                price,
                category_id: None,
                status: Status::default(),
            }
        }

        pub fn in_category(mut self, category: &Category) -> Self {
            self.category_id = Some(category.id.raw());
            self
        }
    }

    impl Record for Product {
        const TABLE: &'static str = "products";

        fn columns() -> Vec<ColumnDef> {
            let mut columns = vec![
                ColumnDef::required("name", ColumnType::String),
                ColumnDef::required("price", ColumnType::Float),
                ColumnDef::nullable("category_id", ColumnType::Int),
            ];
            columns.extend(Status::columns());
            columns
        }

        fn id(&self) -> RecordId {
            self.id
        }

        fn to_row(&self) -> Row {
            let mut row = Row::new(self.id)
                .with("name", self.name.as_str())
                .with("price", self.price)
                .with("category_id", self.category_id);
            self.status.write(&mut row);
            row
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.id,
                name: row.get_as("name")?,
                price: row.get_as("price")?,
                category_id: row.get_as("category_id")?,
                status: Status::read(row)?,
            })
        }

        fn dependencies(row: &Row) -> Vec<Dependency> {
            let mut deps = vec![Dependency::referenced_by(
                DependencyKind::DiscardCascades,
                Variant::TABLE,
                "product_id",
            )];
            if let Some(Value::Int(category)) = row.get("category_id") {
                deps.push(Dependency::key(
                    DependencyKind::PublishRequires,
                    RecordKey::new(Category::TABLE, *category as u64),
                ));
            }
            deps
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Variant {
        pub id: RecordId,
        pub product_id: u64,
        pub sku: String,
        pub status: Status,
    }

    impl Variant {
        pub fn of(product: &Product, sku: &str) -> Self {
            Self {
                id: RecordId::new(0),
                product_id: product.id.raw(),
                sku: sku.to_string(),
                status: Status::default(),
            }
        }
    }

    impl Record for Variant {
        const TABLE: &'static str = "variants";

        fn columns() -> Vec<ColumnDef> {
            let mut columns = vec![
                ColumnDef::required("product_id", ColumnType::Int),
                ColumnDef::required("sku", ColumnType::String),
            ];
            columns.extend(Status::columns());
            columns
        }

        fn id(&self) -> RecordId {
            self.id
        }

        fn to_row(&self) -> Row {
            let mut row = Row::new(self.id)
                .with("product_id", self.product_id)
                .with("sku", self.sku.as_str());
            self.status.write(&mut row);
            row
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.id,
                product_id: row.get_as("product_id")?,
                sku: row.get_as("sku")?,
                status: Status::read(row)?,
            })
        }

        fn dependencies(row: &Row) -> Vec<Dependency> {
            match row.get("product_id") {
                Some(Value::Int(product)) => vec![Dependency::key(
                    DependencyKind::PublishRequires,
                    RecordKey::new(Product::TABLE, *product as u64),
                )],
                _ => Vec::new(),
            }
        }
    }

    /// A record type missing the publish status column
    pub struct Unversioned;

    impl Record for Unversioned {
        const TABLE: &'static str = "unversioned";

        fn columns() -> Vec<ColumnDef> {
            vec![
                ColumnDef::required("name", ColumnType::String),
                ColumnDef::nullable(DELETED_AT, ColumnType::Timestamp),
            ]
        }

        fn id(&self) -> RecordId {
            RecordId::new(0)
        }

        fn to_row(&self) -> Row {
            Row::new(RecordId::new(0))
        }

        fn from_row(_row: &Row) -> Result<Self> {
            Ok(Self)
        }
    }
}
