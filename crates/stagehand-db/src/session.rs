//! Sessions: store handles bound to a mode context.

use crate::callbacks::{Operation, OperationKind};
use crate::error::{Error, Result};
use crate::store::Store;
use chrono::Utc;
use stagehand_core::{ModeContext, RecordId, Row, Value};
use tracing::debug;

/// A store handle carrying one `ModeContext`.
///
/// Sessions are cheap copies; two sessions over the same store never see
/// each other's context.
#[derive(Clone, Copy)]
pub struct Session<'s> {
    store: &'s Store,
    ctx: ModeContext,
    unscoped: bool,
}

impl<'s> Session<'s> {
    pub(crate) fn new(store: &'s Store, ctx: ModeContext) -> Self {
        Self {
            store,
            ctx,
            unscoped: false,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &'s Store {
        self.store
    }

    /// The mode context of this session.
    pub fn context(&self) -> ModeContext {
        self.ctx
    }

    /// Same session with soft-deleted rows included in queries.
    pub fn unscoped(self) -> Self {
        Self {
            unscoped: true,
            ..self
        }
    }

    /// Insert a row, assigning an id when it has none.
    pub fn create(&self, table: &str, row: Row) -> Result<Row> {
        let mut op = Operation::new(OperationKind::Create, table, self.ctx).with_row(row);
        self.store.callbacks().run_before(&mut op)?;
        let physical = self.store.physical_table(&op.table, &op.ctx);
        let mut row = take_row(&mut op)?;

        let created = self.store.transaction(|tx| {
            if row.id.is_unassigned() {
                row.id = tx.next_id(&physical)?;
            }
            tx.insert(&physical, &row)?;
            Ok::<_, Error>(row)
        })?;
        debug!(table = %physical, id = %created.id, "created row");

        op.id = Some(created.id);
        op.row = Some(created.clone());
        self.store.callbacks().run_after_commit(self.store, &op)?;
        Ok(created)
    }

    /// Overwrite the given columns of an existing row.
    pub fn update(&self, table: &str, row: Row) -> Result<Row> {
        let mut op = Operation::new(OperationKind::Update, table, self.ctx).with_row(row);
        self.store.callbacks().run_before(&mut op)?;
        let physical = self.store.physical_table(&op.table, &op.ctx);
        let row = take_row(&mut op)?;
        let unscoped = self.unscoped;

        let updated = self.store.transaction(|tx| {
            let mut current = tx
                .get(&physical, row.id)?
                .filter(|existing| unscoped || !existing.is_deleted())
                .ok_or_else(|| not_found(&physical, row.id))?;
            current.columns.extend(row.columns);
            tx.upsert(&physical, &current)?;
            Ok::<_, Error>(current)
        })?;
        debug!(table = %physical, id = %updated.id, "updated row");

        op.row = Some(updated.clone());
        self.store.callbacks().run_after_commit(self.store, &op)?;
        Ok(updated)
    }

    /// Delete a row, or set its soft-delete marker if a callback asked for that.
    pub fn delete(&self, table: &str, id: RecordId) -> Result<()> {
        let mut op = Operation::new(OperationKind::Delete, table, self.ctx).with_id(id);
        self.store.callbacks().run_before(&mut op)?;
        let physical = self.store.physical_table(&op.table, &op.ctx);
        let soft_delete = op.soft_delete;
        let assignments = op.assignments.clone();

        let deleted = self.store.transaction(|tx| {
            if soft_delete {
                let mut row = tx
                    .get(&physical, id)?
                    .filter(|existing| !existing.is_deleted())
                    .ok_or_else(|| not_found(&physical, id))?;
                row.soft_delete(Utc::now());
                row.columns.extend(assignments);
                tx.upsert(&physical, &row)?;
                Ok::<_, Error>(row)
            } else {
                tx.remove(&physical, id)?
                    .ok_or_else(|| not_found(&physical, id))
            }
        })?;
        debug!(table = %physical, %id, soft_delete, "deleted row");

        op.row = Some(deleted);
        self.store.callbacks().run_after_commit(self.store, &op)?;
        Ok(())
    }

    /// Find a row by id.
    pub fn find(&self, table: &str, id: RecordId) -> Result<Option<Row>> {
        let physical = self.query_table(table, Some(id))?;
        let row = self.store.read_row(&physical, id)?;
        Ok(row.filter(|row| self.visible(row)))
    }

    /// All rows of a table.
    pub fn all(&self, table: &str) -> Result<Vec<Row>> {
        let physical = self.query_table(table, None)?;
        let rows = self.store.read_rows(&physical)?;
        Ok(rows.into_iter().filter(|row| self.visible(row)).collect())
    }

    /// Rows whose column equals a value.
    pub fn find_by(&self, table: &str, column: &str, value: impl Into<Value>) -> Result<Vec<Row>> {
        let value = value.into();
        Ok(self
            .all(table)?
            .into_iter()
            .filter(|row| row.get(column) == Some(&value))
            .collect())
    }

    /// Physical table a query on `table` reads from.
    pub fn query_table(&self, table: &str, id: Option<RecordId>) -> Result<String> {
        let mut op = Operation::new(OperationKind::Query, table, self.ctx);
        op.id = id;
        self.store.callbacks().run_before(&mut op)?;
        Ok(self.store.physical_table(&op.table, &op.ctx))
    }

    fn visible(&self, row: &Row) -> bool {
        self.unscoped || !row.is_deleted()
    }
}

fn take_row(op: &mut Operation) -> Result<Row> {
    op.row
        .take()
        .ok_or_else(|| Error::NotFound(format!("row for {:?} on {}", op.kind, op.table)))
}

fn not_found(table: &str, id: RecordId) -> Error {
    Error::NotFound(format!("{}:{}", table, id))
}
