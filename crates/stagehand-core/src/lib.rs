//! Stagehand Core - rows, schemas and table routing
//!
//! This crate provides the storage-agnostic types of the stagehand
//! draft/production layer:
//! - Dynamic column values (`Value`, `ValueMap`) and `Row`
//! - Record identity (`RecordId`, `RecordKey`)
//! - Table schemas (`TableSchema`, `ColumnDef`, `ColumnType`)
//! - Per-call mode context and the pure table router
//!
//! Every supported model lives in two physical tables with identical columns:
//! `<table>` holds published content and `<table>_draft` holds work in
//! progress. [`route`] picks between them from a [`ModeContext`].

mod error;
mod identity;
pub mod mode;
pub mod row;
mod schema;
mod value;

pub use error::{Error, Result};
pub use identity::{RecordId, RecordKey};
pub use mode::{draft_table_name, is_draft_table, original_table_name, route, Mode, ModeContext};
pub use row::{Row, DELETED_AT, DIRTY, PUBLISHED, PUBLISH_STATUS};
pub use schema::{ColumnDef, ColumnType, TableSchema};
pub use value::{FromValue, Value, ValueMap};
