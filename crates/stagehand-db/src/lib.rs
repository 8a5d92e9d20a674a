//! Stagehand DB - table storage using native_db
//!
//! Provides the execution engine the draft/production layer runs on:
//! - Physical tables with migrated schemas (`Store::migrate`)
//! - Atomic read-write transactions (`Store::transaction`, `Txn`)
//! - Sessions carrying a per-call `ModeContext` (`Session`)
//! - Named before / after-commit callbacks around create, update, delete
//!   and query operations (`Callbacks`)
//! - Per-table table name handlers consulted on every session operation

mod callbacks;
mod error;
mod models;
mod queries;
mod session;
mod store;

pub use callbacks::{
    AfterCommitCallback, BeforeCallback, Callbacks, Operation, OperationKind,
};
pub use error::{Error, Result};
pub use session::Session;
pub use store::{Store, TableNameHandler, Txn};
