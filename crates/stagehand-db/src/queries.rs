//! Read-only query patterns for the database.

use crate::error::{Error, Result};
use crate::models::*;
use crate::store::Store;
use stagehand_core::{RecordId, Row, TableSchema};

impl Store {
    /// Schema of a migrated table, if any.
    pub fn schema(&self, table: &str) -> Result<Option<TableSchema>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredTable> = r.get().primary(table.to_string())?;
        stored.map(|s| s.to_schema()).transpose()
    }

    /// Names of all migrated tables.
    pub fn tables(&self) -> Result<Vec<String>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredTable>()?;
        let iter = scan.all()?;
        let tables: std::result::Result<Vec<StoredTable>, _> = iter.collect();
        let tables = tables.map_err(|e| Error::Database(e.to_string()))?;
        Ok(tables.into_iter().map(|t| t.name).collect())
    }

    /// Count rows of a table, soft-deleted ones included.
    pub fn count(&self, table: &str) -> Result<usize> {
        Ok(self.read_rows(table)?.len())
    }

    pub(crate) fn read_row(&self, table: &str, id: RecordId) -> Result<Option<Row>> {
        self.require_table(table)?;
        let r = self.db.r_transaction()?;
        let stored: Option<StoredRow> = r.get().primary(StoredRow::primary_key(table, id))?;
        stored.map(|s| s.to_row()).transpose()
    }

    pub(crate) fn read_rows(&self, table: &str) -> Result<Vec<Row>> {
        self.require_table(table)?;
        let r = self.db.r_transaction()?;
        let scan = r.scan().secondary::<StoredRow>(StoredRowKey::table)?;
        let iter = scan.start_with(table)?;
        let stored: std::result::Result<Vec<StoredRow>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        let mut rows = stored
            .iter()
            .filter(|s| s.table == table)
            .map(StoredRow::to_row)
            .collect::<Result<Vec<_>>>()?;
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    fn require_table(&self, table: &str) -> Result<()> {
        match self.schema(table)? {
            Some(_) => Ok(()),
            None => Err(Error::TableNotFound(table.to_string())),
        }
    }
}
