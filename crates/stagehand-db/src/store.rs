//! Database store wrapper.

use crate::callbacks::Callbacks;
use crate::error::{Error, Result};
use crate::models::*;
use crate::session::Session;
use native_db::*;
use stagehand_core::{ModeContext, RecordId, Row, TableSchema, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredRow>().unwrap();
    models.define::<StoredTable>().unwrap();
    models.define::<StoredSequence>().unwrap();
    models
});

/// Maps a canonical table name to a physical one for a given context
pub type TableNameHandler = Arc<dyn Fn(&str, &ModeContext) -> String + Send + Sync>;

/// Row store with per-operation callbacks and table name handlers.
pub struct Store {
    pub(crate) db: Database<'static>,
    callbacks: Callbacks,
    table_handlers: RwLock<HashMap<String, TableNameHandler>>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new()
            .create(&MODELS, path.as_ref())
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self::with_database(db))
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self::with_database(db))
    }

    fn with_database(db: Database<'static>) -> Self {
        Self {
            db,
            callbacks: Callbacks::new(),
            table_handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Operation callbacks.
    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// A session routing with the given context.
    pub fn session(&self, ctx: ModeContext) -> Session<'_> {
        Session::new(self, ctx)
    }

    /// Install the table name handler consulted for a canonical table.
    pub fn set_table_name_handler(&self, table: impl Into<String>, handler: TableNameHandler) {
        self.table_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.into(), handler);
    }

    /// Physical table for a canonical table under a context.
    ///
    /// Tables without a handler are used as named.
    pub fn physical_table(&self, table: &str, ctx: &ModeContext) -> String {
        let handler = self
            .table_handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned();
        match handler {
            Some(handler) => handler(table, ctx),
            None => table.to_string(),
        }
    }

    /// Create a physical table or additively update its schema.
    pub fn migrate(&self, table: &str, schema: &TableSchema) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        let stored: Option<StoredTable> = rw.get().primary(table.to_string())?;
        let merged = match stored {
            Some(existing) => {
                let mut current = existing.to_schema()?;
                current.merge(schema);
                current
            }
            None => schema.clone(),
        };
        rw.upsert(StoredTable::from_schema(table, &merged)?)?;
        rw.commit()?;
        tracing::info!(table, columns = merged.columns.len(), "migrated table");
        Ok(())
    }

    /// Run `f` inside one read-write transaction.
    ///
    /// Commits when `f` returns `Ok`; on `Err` the transaction is dropped
    /// uncommitted and nothing `f` wrote becomes visible.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Txn<'_>) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let rw = self.db.rw_transaction().map_err(Error::from)?;
        let tx = Txn { rw };
        match f(&tx) {
            Ok(value) => {
                tx.rw.commit().map_err(Error::from)?;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!("transaction rolled back");
                drop(tx);
                Err(err)
            }
        }
    }
}

/// An open read-write transaction over physical tables.
///
/// Table names here are physical; no routing or callbacks apply.
pub struct Txn<'db> {
    rw: transaction::RwTransaction<'db>,
}

impl Txn<'_> {
    /// Schema of a migrated table.
    pub fn schema(&self, table: &str) -> Result<TableSchema> {
        let stored: Option<StoredTable> = self.rw.get().primary(table.to_string())?;
        match stored {
            Some(stored) => stored.to_schema(),
            None => Err(Error::TableNotFound(table.to_string())),
        }
    }

    /// Load a row by id.
    pub fn get(&self, table: &str, id: RecordId) -> Result<Option<Row>> {
        self.schema(table)?;
        let stored: Option<StoredRow> = self.rw.get().primary(StoredRow::primary_key(table, id))?;
        stored.map(|s| s.to_row()).transpose()
    }

    /// Load every row of a table, ordered by id.
    pub fn scan(&self, table: &str) -> Result<Vec<Row>> {
        self.schema(table)?;
        let scan = self.rw.scan().secondary::<StoredRow>(StoredRowKey::table)?;
        let iter = scan.start_with(table)?;
        let stored: std::result::Result<Vec<StoredRow>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        // start_with is a prefix match: "products" also yields "products_draft"
        let mut rows = stored
            .iter()
            .filter(|s| s.table == table)
            .map(StoredRow::to_row)
            .collect::<Result<Vec<_>>>()?;
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    /// Load rows whose column equals a value.
    pub fn scan_where(&self, table: &str, column: &str, value: &Value) -> Result<Vec<Row>> {
        Ok(self
            .scan(table)?
            .into_iter()
            .filter(|row| row.get(column) == Some(value))
            .collect())
    }

    /// Insert a new row, failing if the id is taken.
    pub fn insert(&self, table: &str, row: &Row) -> Result<()> {
        let schema = self.schema(table)?;
        schema.validate_row(table, row)?;
        let key = StoredRow::primary_key(table, row.id);
        let existing: Option<StoredRow> = self.rw.get().primary(key.clone())?;
        if existing.is_some() {
            return Err(Error::DuplicateKey(key));
        }
        self.rw.insert(StoredRow::from_row(table, row)?)?;
        self.observe_id(table, row.id)?;
        Ok(())
    }

    /// Insert or overwrite a row, returning the previous one.
    pub fn upsert(&self, table: &str, row: &Row) -> Result<Option<Row>> {
        let schema = self.schema(table)?;
        schema.validate_row(table, row)?;
        let previous = self.get(table, row.id)?;
        self.rw.upsert(StoredRow::from_row(table, row)?)?;
        self.observe_id(table, row.id)?;
        Ok(previous)
    }

    /// Remove a row, returning it if it existed.
    pub fn remove(&self, table: &str, id: RecordId) -> Result<Option<Row>> {
        self.schema(table)?;
        let stored: Option<StoredRow> = self.rw.get().primary(StoredRow::primary_key(table, id))?;
        match stored {
            Some(stored) => {
                let row = stored.to_row()?;
                self.rw.remove(stored)?;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// Hand out the next unused id for a table.
    pub fn next_id(&self, table: &str) -> Result<RecordId> {
        let mut sequence = self.sequence(table)?;
        let id = RecordId::new(sequence.next);
        sequence.next += 1;
        self.rw.upsert(sequence)?;
        Ok(id)
    }

    fn sequence(&self, table: &str) -> Result<StoredSequence> {
        let stored: Option<StoredSequence> = self.rw.get().primary(table.to_string())?;
        Ok(stored.unwrap_or_else(|| StoredSequence {
            table: table.to_string(),
            next: 1,
        }))
    }

    // Keep the sequence ahead of explicitly chosen ids
    fn observe_id(&self, table: &str, id: RecordId) -> Result<()> {
        let mut sequence = self.sequence(table)?;
        if sequence.next <= id.raw() {
            sequence.next = id.raw() + 1;
            self.rw.upsert(sequence)?;
        }
        Ok(())
    }
}

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::{ColumnDef, ColumnType};

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            ColumnDef::required("name", ColumnType::String),
            ColumnDef::nullable("price", ColumnType::Float),
        ])
    }

    fn row(id: u64, name: &str) -> Row {
        Row::new(RecordId::new(id)).with("name", name)
    }

    fn store() -> Store {
        let store = Store::in_memory().unwrap();
        store.migrate("products", &schema()).unwrap();
        store.migrate("products_draft", &schema()).unwrap();
        store
    }

    #[test]
    fn test_unmigrated_table_is_rejected() {
        let store = Store::in_memory().unwrap();
        let result: Result<Option<Row>> = store.transaction(|tx| tx.get("missing", RecordId::new(1)));
        assert!(matches!(result, Err(Error::TableNotFound(t)) if t == "missing"));
    }

    #[test]
    fn test_scan_does_not_mix_prefixed_tables() {
        let store = store();
        store
            .transaction(|tx| {
                tx.insert("products", &row(1, "lamp"))?;
                tx.insert("products_draft", &row(2, "desk"))?;
                tx.insert("products_draft", &row(1, "lamp v2"))
            })
            .unwrap();

        let (production, draft) = store
            .transaction(|tx| Ok::<_, Error>((tx.scan("products")?, tx.scan("products_draft")?)))
            .unwrap();
        assert_eq!(production.len(), 1);
        assert_eq!(draft.len(), 2);
        assert_eq!(draft[0].id, RecordId::new(1));
        assert_eq!(draft[1].id, RecordId::new(2));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = store();
        let result = store.transaction(|tx| {
            tx.insert("products", &row(1, "lamp"))?;
            // violates the non-null name column
            tx.insert("products", &Row::new(RecordId::new(2)))
        });
        assert!(matches!(result, Err(Error::Schema(_))));

        let rows = store.transaction(|tx| tx.scan("products")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_insert_duplicate_and_upsert() {
        let store = store();
        store.transaction(|tx| tx.insert("products", &row(1, "lamp"))).unwrap();

        let dup = store.transaction(|tx| tx.insert("products", &row(1, "again")));
        assert!(matches!(dup, Err(Error::DuplicateKey(_))));

        let previous = store
            .transaction(|tx| tx.upsert("products", &row(1, "lamp v2")))
            .unwrap();
        assert_eq!(previous.unwrap().get_as::<String>("name").unwrap(), "lamp");

        let removed = store
            .transaction(|tx| tx.remove("products", RecordId::new(1)))
            .unwrap();
        assert!(removed.is_some());
        let again = store
            .transaction(|tx| tx.remove("products", RecordId::new(1)))
            .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_sequence_skips_explicit_ids() {
        let store = store();
        let ids = store
            .transaction(|tx| {
                let first = tx.next_id("products")?;
                tx.insert("products", &row(10, "explicit"))?;
                let second = tx.next_id("products")?;
                Ok::<_, Error>((first, second))
            })
            .unwrap();
        assert_eq!(ids, (RecordId::new(1), RecordId::new(11)));
    }

    #[test]
    fn test_migrate_is_additive() {
        let store = store();
        store
            .migrate(
                "products",
                &TableSchema::new(vec![ColumnDef::nullable("sku", ColumnType::String)]),
            )
            .unwrap();

        let schema = store.transaction(|tx| tx.schema("products")).unwrap();
        assert!(schema.has_column("name"));
        assert!(schema.has_column("sku"));
    }

    #[test]
    fn test_physical_table_uses_handler() {
        let store = store();
        store.set_table_name_handler(
            "products",
            Arc::new(|table: &str, ctx: &ModeContext| {
                stagehand_core::route(table, ctx).into_owned()
            }),
        );

        assert_eq!(
            store.physical_table("products", &ModeContext::draft()),
            "products_draft"
        );
        assert_eq!(
            store.physical_table("products", &ModeContext::production()),
            "products"
        );
        assert_eq!(store.physical_table("other", &ModeContext::draft()), "other");
    }
}
