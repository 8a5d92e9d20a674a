//! Sync plans
//!
//! The resolver turns an ordered set of records into a [`SyncPlan`]: a flat
//! list of [`SyncStep`]s that copy draft rows into production (publish) or
//! production rows back into draft (discard). Plans are computed from one
//! snapshot and applied in a single transaction by [`crate::commit`].

use serde::{Deserialize, Serialize};
use stagehand_core::{draft_table_name, RecordKey, Row, PUBLISHED};

/// Direction of a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncAction {
    /// Copy draft into production
    Publish,
    /// Revert draft to production
    Discard,
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAction::Publish => f.write_str("publish"),
            SyncAction::Discard => f.write_str("discard"),
        }
    }
}

/// A single row write within a sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncStep {
    /// Insert or replace the production row
    WriteProduction {
        key: RecordKey,
        row: Row,
    },
    /// Remove the production row if present
    RemoveProduction {
        key: RecordKey,
    },
    /// Insert or replace the draft row
    WriteDraft {
        key: RecordKey,
        row: Row,
    },
    /// Remove the draft row
    RemoveDraft {
        key: RecordKey,
    },
}

impl SyncStep {
    /// Record this step touches
    pub fn key(&self) -> &RecordKey {
        match self {
            SyncStep::WriteProduction { key, .. }
            | SyncStep::RemoveProduction { key }
            | SyncStep::WriteDraft { key, .. }
            | SyncStep::RemoveDraft { key } => key,
        }
    }

    /// Physical table this step writes
    pub fn table(&self) -> String {
        match self {
            SyncStep::WriteProduction { key, .. } | SyncStep::RemoveProduction { key } => {
                key.table.clone()
            }
            SyncStep::WriteDraft { key, .. } | SyncStep::RemoveDraft { key } => {
                draft_table_name(&key.table)
            }
        }
    }
}

/// Ordered writes for one publish or discard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub action: SyncAction,
    /// Writes in application order
    pub steps: Vec<SyncStep>,
    /// Records that produced writes, in processing order
    pub processed: Vec<RecordKey>,
    /// Records visited but already clean
    pub skipped: Vec<RecordKey>,
    /// Groups of mutually dependent records
    pub cycles: Vec<Vec<RecordKey>>,
}

impl SyncPlan {
    /// Create an empty plan
    pub fn new(action: SyncAction) -> Self {
        Self {
            action,
            steps: Vec::new(),
            processed: Vec::new(),
            skipped: Vec::new(),
            cycles: Vec::new(),
        }
    }

    /// Add the writes for one record, given its current draft and production rows
    pub fn add(&mut self, key: RecordKey, draft: Option<&Row>, production: Option<&Row>) {
        let draft = match draft {
            Some(draft) if draft.is_dirty() => draft,
            _ => {
                self.skipped.push(key);
                return;
            }
        };

        match self.action {
            SyncAction::Publish => self.add_publish(&key, draft),
            SyncAction::Discard => self.add_discard(&key, production),
        }
        self.processed.push(key);
    }

    fn add_publish(&mut self, key: &RecordKey, draft: &Row) {
        let mut clean = draft.clone();
        clean.set_dirty(PUBLISHED);

        if draft.is_deleted() {
            self.steps.push(SyncStep::RemoveProduction { key: key.clone() });
        } else {
            self.steps.push(SyncStep::WriteProduction {
                key: key.clone(),
                row: clean.clone(),
            });
        }
        self.steps.push(SyncStep::WriteDraft {
            key: key.clone(),
            row: clean,
        });
    }

    fn add_discard(&mut self, key: &RecordKey, production: Option<&Row>) {
        match production {
            None => self.steps.push(SyncStep::RemoveDraft { key: key.clone() }),
            Some(production) => {
                let mut reverted = production.clone();
                reverted.restore();
                reverted.set_dirty(PUBLISHED);
                self.steps.push(SyncStep::WriteDraft {
                    key: key.clone(),
                    row: reverted,
                });
            }
        }
    }

    /// Number of writes
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan writes nothing
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stagehand_core::{RecordId, DIRTY};

    fn key() -> RecordKey {
        RecordKey::new("products", 1u64)
    }

    fn row(name: &str, dirty: bool) -> Row {
        let mut row = Row::new(RecordId::new(1)).with("name", name);
        row.restore();
        row.set_dirty(dirty);
        row
    }

    #[test]
    fn test_publish_copies_draft_and_clears_flag() {
        let mut plan = SyncPlan::new(SyncAction::Publish);
        plan.add(key(), Some(&row("lamp", DIRTY)), None);

        let clean = row("lamp", PUBLISHED);
        assert_eq!(
            plan.steps,
            vec![
                SyncStep::WriteProduction {
                    key: key(),
                    row: clean.clone()
                },
                SyncStep::WriteDraft {
                    key: key(),
                    row: clean
                },
            ]
        );
        assert_eq!(plan.processed, vec![key()]);
        assert_eq!(plan.steps[0].table(), "products");
        assert_eq!(plan.steps[1].table(), "products_draft");
    }

    #[test]
    fn test_publish_of_deleted_draft_removes_production() {
        let mut draft = row("lamp", DIRTY);
        draft.soft_delete(Utc::now());

        let mut plan = SyncPlan::new(SyncAction::Publish);
        plan.add(key(), Some(&draft), Some(&row("lamp", PUBLISHED)));

        assert_eq!(plan.steps[0], SyncStep::RemoveProduction { key: key() });
        match &plan.steps[1] {
            SyncStep::WriteDraft { row, .. } => {
                assert!(row.is_deleted());
                assert!(!row.is_dirty());
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_clean_records_are_skipped() {
        let mut plan = SyncPlan::new(SyncAction::Discard);
        plan.add(key(), Some(&row("lamp", PUBLISHED)), None);
        assert!(plan.is_empty());
        assert_eq!(plan.skipped, vec![key()]);
        assert!(plan.processed.is_empty());
    }

    #[test]
    fn test_discard_removes_or_reverts() {
        let mut plan = SyncPlan::new(SyncAction::Discard);
        plan.add(key(), Some(&row("lamp", DIRTY)), None);
        assert_eq!(plan.steps, vec![SyncStep::RemoveDraft { key: key() }]);

        let mut edited = row("desk", DIRTY);
        edited.soft_delete(Utc::now());
        let mut plan = SyncPlan::new(SyncAction::Discard);
        plan.add(key(), Some(&edited), Some(&row("lamp", PUBLISHED)));
        assert_eq!(
            plan.steps,
            vec![SyncStep::WriteDraft {
                key: key(),
                row: row("lamp", PUBLISHED)
            }]
        );
    }
}
