//! Stagehand Publish - draft/production versioning for stored records
//!
//! Every supported record type lives in two tables: `<table>_draft` holds work
//! in progress and `<table>` holds published content. Writes always land in
//! draft and mark the record dirty; [`Publish::publish`] and
//! [`Publish::discard`] move content between the two, respecting declared
//! dependencies, inside one transaction.
//!
//! ## Architecture
//!
//! ```text
//! Publish (owns the Store)
//!  │
//!  ├── ModelRegistry   ← supported record types, canonical/draft names
//!  ├── hooks           ← force writes into draft, default reads to draft
//!  └── Resolver        ← per call: expand dependencies, order, SyncPlan
//!       │
//!       └── commit::apply (one transaction)
//! ```
//!
//! ## Key Components
//!
//! - [`Record`]: trait implemented by application types
//! - [`Dependency`]: publish-requires and discard-cascades edges
//! - [`Publish`] / [`Handle`]: entry point and typed mode-bound handles
//! - [`Resolver`], [`SyncPlan`], [`SyncReport`]: the sync engine

pub mod commit;
mod config;
mod dependency;
mod error;
pub mod graph;
pub mod hooks;
mod model;
mod plan;
mod publish;
mod registry;
mod resolver;

pub use commit::SyncReport;
pub use config::PublishConfig;
pub use dependency::{Dependency, DependencyKind, Lookup};
pub use error::{Error, Result};
pub use model::{Record, Status};
pub use plan::{SyncAction, SyncPlan, SyncStep};
pub use publish::{Handle, Publish};
pub use registry::{ModelRegistry, SupportedModel};
pub use resolver::Resolver;

pub use stagehand_core::{
    draft_table_name, original_table_name, route, ColumnDef, ColumnType, Mode, ModeContext,
    RecordId, RecordKey, Row, Value, DIRTY, PUBLISHED,
};
