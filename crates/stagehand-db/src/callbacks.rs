//! Operation pipeline callbacks
//!
//! Every session operation is described by an [`Operation`] that flows through
//! the callbacks registered for its [`OperationKind`]:
//!
//! ```text
//! before callbacks (may mutate the Operation)
//!   -> table name resolution
//!   -> transaction (begin / work / commit)
//!   -> after-commit callbacks
//! ```
//!
//! Before callbacks run ahead of any transactional work, so a failure there
//! leaves storage untouched. After-commit callbacks see the committed row.

use crate::error::Result;
use crate::store::Store;
use stagehand_core::{ModeContext, RecordId, Row, Value, ValueMap};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Kind of operation flowing through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Query,
}

/// A single operation as seen by callbacks
#[derive(Debug, Clone)]
pub struct Operation {
    /// What is being done
    pub kind: OperationKind,
    /// Canonical table name (before routing)
    pub table: String,
    /// Routing context; callbacks may override it
    pub ctx: ModeContext,
    /// Target row id (assigned after create commits)
    pub id: Option<RecordId>,
    /// Row being written, or the committed row in after-commit callbacks
    pub row: Option<Row>,
    /// Replace hard deletion with setting the soft-delete marker
    pub soft_delete: bool,
    /// Extra columns written alongside a soft delete
    pub assignments: ValueMap,
}

impl Operation {
    /// Create a new operation
    pub fn new(kind: OperationKind, table: impl Into<String>, ctx: ModeContext) -> Self {
        Self {
            kind,
            table: table.into(),
            ctx,
            id: None,
            row: None,
            soft_delete: false,
            assignments: ValueMap::new(),
        }
    }

    /// Attach a row
    pub fn with_row(mut self, row: Row) -> Self {
        self.id = Some(row.id);
        self.row = Some(row);
        self
    }

    /// Attach a target id
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set a column on the row being written
    pub fn set_column(&mut self, key: &str, value: impl Into<Value>) {
        if let Some(row) = self.row.as_mut() {
            row.set(key, value);
        }
    }

    /// Queue a column assignment for a soft delete
    pub fn assign(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.assignments.insert(key.into(), value.into());
    }
}

/// Callback run before transactional work
pub type BeforeCallback = Arc<dyn Fn(&mut Operation) -> Result<()> + Send + Sync>;

/// Callback run after the transaction committed
pub type AfterCommitCallback = Arc<dyn Fn(&Store, &Operation) -> Result<()> + Send + Sync>;

#[derive(Default, Clone)]
struct Processor {
    before: Vec<(String, BeforeCallback)>,
    after_commit: Vec<(String, AfterCommitCallback)>,
}

fn upsert_named<F: Clone>(list: &mut Vec<(String, F)>, name: String, callback: F) {
    match list.iter_mut().find(|(existing, _)| *existing == name) {
        Some(slot) => slot.1 = callback,
        None => list.push((name, callback)),
    }
}

/// Named callbacks per operation kind
///
/// Callbacks run in registration order. Registering an existing name
/// replaces that callback in place.
#[derive(Default)]
pub struct Callbacks {
    processors: RwLock<HashMap<OperationKind, Processor>>,
}

impl Callbacks {
    /// Create an empty callback registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a before callback
    pub fn register_before<F>(&self, kind: OperationKind, name: impl Into<String>, callback: F)
    where
        F: Fn(&mut Operation) -> Result<()> + Send + Sync + 'static,
    {
        let mut processors = self
            .processors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let callback: BeforeCallback = Arc::new(callback);
        let processor = processors.entry(kind).or_default();
        upsert_named(&mut processor.before, name.into(), callback);
    }

    /// Register an after-commit callback
    pub fn register_after_commit<F>(
        &self,
        kind: OperationKind,
        name: impl Into<String>,
        callback: F,
    ) where
        F: Fn(&Store, &Operation) -> Result<()> + Send + Sync + 'static,
    {
        let mut processors = self
            .processors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let callback: AfterCommitCallback = Arc::new(callback);
        let processor = processors.entry(kind).or_default();
        upsert_named(&mut processor.after_commit, name.into(), callback);
    }

    /// Names of the registered callbacks for a kind, before callbacks first
    pub fn names(&self, kind: OperationKind) -> Vec<String> {
        let processor = self.processor(kind);
        processor
            .before
            .iter()
            .map(|(name, _)| name.clone())
            .chain(processor.after_commit.iter().map(|(name, _)| name.clone()))
            .collect()
    }

    // Snapshot so callbacks never run while the lock is held
    fn processor(&self, kind: OperationKind) -> Processor {
        self.processors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn run_before(&self, op: &mut Operation) -> Result<()> {
        for (name, callback) in self.processor(op.kind).before {
            tracing::trace!(callback = %name, table = %op.table, "before callback");
            callback(&mut *op)?;
        }
        Ok(())
    }

    pub(crate) fn run_after_commit(&self, store: &Store, op: &Operation) -> Result<()> {
        for (name, callback) in self.processor(op.kind).after_commit {
            tracing::trace!(callback = %name, table = %op.table, "after-commit callback");
            callback(store, op)?;
        }
        Ok(())
    }
}
