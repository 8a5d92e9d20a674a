//! Applying sync plans
//!
//! [`apply`] runs every step of a [`SyncPlan`] inside an open transaction.
//! Steps run in plan order. The first failing write aborts the whole plan
//! and the transaction is dropped, so production never sees a partial sync.

use crate::error::Result;
use crate::plan::{SyncAction, SyncPlan, SyncStep};
use serde::{Deserialize, Serialize};
use stagehand_core::RecordKey;
use stagehand_db::Txn;
use tracing::debug;

/// Outcome of a committed publish or discard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub action: SyncAction,
    /// Records written, in processing order
    pub processed: Vec<RecordKey>,
    /// Records visited but already clean
    pub skipped: Vec<RecordKey>,
    /// Mutually dependent groups that were processed together
    pub cycles: Vec<Vec<RecordKey>>,
    /// Number of row writes applied
    pub writes: usize,
}

impl SyncReport {
    /// Report for a plan that was applied
    pub fn from_plan(plan: &SyncPlan) -> Self {
        Self {
            action: plan.action,
            processed: plan.processed.clone(),
            skipped: plan.skipped.clone(),
            cycles: plan.cycles.clone(),
            writes: plan.len(),
        }
    }

    /// Whether nothing was written
    pub fn is_noop(&self) -> bool {
        self.writes == 0
    }
}

/// Apply a plan inside an open transaction
pub fn apply(tx: &Txn<'_>, plan: &SyncPlan) -> Result<SyncReport> {
    for step in &plan.steps {
        let table = step.table();
        match step {
            SyncStep::WriteProduction { key, row } | SyncStep::WriteDraft { key, row } => {
                debug!(%key, table = %table, "write");
                tx.upsert(&table, row)?;
            }
            SyncStep::RemoveProduction { key } | SyncStep::RemoveDraft { key } => {
                debug!(%key, table = %table, "remove");
                tx.remove(&table, key.id)?;
            }
        }
    }
    Ok(SyncReport::from_plan(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::{
        ColumnDef, ColumnType, RecordId, Row, TableSchema, DELETED_AT, DIRTY, PUBLISHED,
        PUBLISH_STATUS,
    };
    use stagehand_db::Store;

    fn store() -> Store {
        let schema = TableSchema::new(vec![
            ColumnDef::required("name", ColumnType::String),
            ColumnDef::nullable(DELETED_AT, ColumnType::Timestamp),
            ColumnDef::required(PUBLISH_STATUS, ColumnType::Bool),
        ]);
        let store = Store::in_memory().unwrap();
        store.migrate("products", &schema).unwrap();
        store.migrate("products_draft", &schema).unwrap();
        store
    }

    fn commit(store: &Store, plan: &SyncPlan) -> Result<SyncReport> {
        store.transaction(|tx| apply(tx, plan))
    }

    fn row(id: u64, name: &str, dirty: bool) -> Row {
        let mut row = Row::new(RecordId::new(id)).with("name", name);
        row.restore();
        row.set_dirty(dirty);
        row
    }

    #[test]
    fn test_commit_applies_all_steps() {
        let store = store();
        let mut plan = SyncPlan::new(SyncAction::Publish);
        plan.add(
            RecordKey::new("products", 1u64),
            Some(&row(1, "lamp", DIRTY)),
            None,
        );

        let report = commit(&store, &plan).unwrap();
        assert_eq!(report.writes, 2);
        assert_eq!(report.processed, vec![RecordKey::new("products", 1u64)]);

        let published = store
            .transaction(|tx| tx.get("products", RecordId::new(1)))
            .unwrap()
            .unwrap();
        assert_eq!(published, row(1, "lamp", PUBLISHED));
    }

    #[test]
    fn test_failed_step_rolls_back_earlier_steps() {
        let store = store();
        let mut plan = SyncPlan::new(SyncAction::Publish);
        plan.add(
            RecordKey::new("products", 1u64),
            Some(&row(1, "lamp", DIRTY)),
            None,
        );
        // second record carries a column production does not know
        plan.add(
            RecordKey::new("products", 2u64),
            Some(&row(2, "desk", DIRTY).with("colour", "red")),
            None,
        );

        assert!(commit(&store, &plan).is_err());
        assert_eq!(store.count("products").unwrap(), 0);
    }

    #[test]
    fn test_empty_plan_is_noop() {
        let store = store();
        let report = commit(&store, &SyncPlan::new(SyncAction::Discard)).unwrap();
        assert!(report.is_noop());
    }
}
