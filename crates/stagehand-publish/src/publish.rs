//! Publish - entry point tying registry, hooks, routing and the resolver
//!
//! A [`Publish`] owns the store. Supporting a record type registers it, routes
//! its table through [`route`], and the lifecycle hooks installed at
//! construction take care of keeping writes in draft.

use crate::commit::SyncReport;
use crate::config::PublishConfig;
use crate::error::Result;
use crate::hooks;
use crate::model::Record;
use crate::plan::SyncAction;
use crate::registry::ModelRegistry;
use crate::resolver::Resolver;
use stagehand_core::{route, ModeContext, RecordId, RecordKey, Value};
use stagehand_db::{Session, Store};
use std::sync::Arc;
use tracing::info;

/// Draft/production publishing over one store
///
/// ```ignore
/// let publish = Publish::in_memory()?;
/// publish.support::<Category>()?.support::<Product>()?;
/// publish.auto_migrate()?;
///
/// let lamp = publish.draft_db().create(&Product::new("lamp", 10.0))?;
/// publish.publish_records(&[lamp])?;
/// ```
pub struct Publish {
    store: Store,
    registry: Arc<ModelRegistry>,
    config: PublishConfig,
}

impl Publish {
    /// Wrap a store with the default configuration
    pub fn new(store: Store) -> Self {
        Self::with_config(store, PublishConfig::default())
    }

    /// Wrap a store, installing the lifecycle hooks for `config`
    pub fn with_config(store: Store, config: PublishConfig) -> Self {
        let registry = Arc::new(ModelRegistry::new());
        hooks::register(&store, registry.clone(), &config);
        Self {
            store,
            registry,
            config,
        }
    }

    /// Open the configured database (in memory when none is set)
    pub fn from_config(config: PublishConfig) -> Result<Self> {
        let store = match &config.database {
            Some(path) => Store::open(path)?,
            None => Store::in_memory()?,
        };
        Ok(Self::with_config(store, config))
    }

    /// In-memory store, default configuration
    pub fn in_memory() -> Result<Self> {
        Self::from_config(PublishConfig::default())
    }

    /// Support a record type
    ///
    /// Fails with a configuration error when the type lacks the soft-delete
    /// or publish status column; nothing is registered in that case.
    pub fn support<T: Record>(&self) -> Result<&Self> {
        let model = self.registry.register::<T>()?;
        self.store.set_table_name_handler(
            model.table.clone(),
            Arc::new(|table: &str, ctx: &ModeContext| route(table, ctx).into_owned()),
        );
        Ok(self)
    }

    /// Create or update draft and production tables of every supported type
    pub fn auto_migrate(&self) -> Result<()> {
        for model in self.registry.models() {
            self.store.migrate(&model.draft_table, &model.schema)?;
            self.store.migrate(&model.table, &model.schema)?;
        }
        info!(models = self.registry.len(), "migrated supported models");
        Ok(())
    }

    /// Handle without an explicit mode; reads see draft content
    pub fn db(&self) -> Handle<'_> {
        Handle::new(self.store.session(ModeContext::unset()))
    }

    /// Handle reading production tables
    pub fn production_db(&self) -> Handle<'_> {
        Handle::new(self.store.session(ModeContext::production()))
    }

    /// Handle reading draft tables
    pub fn draft_db(&self) -> Handle<'_> {
        Handle::new(self.store.session(ModeContext::draft()))
    }

    /// Resolver for one publish or discard call
    pub fn new_resolver(&self, action: SyncAction, targets: Vec<RecordKey>) -> Resolver<'_> {
        Resolver::new(&self.store, &self.registry, action, targets)
    }

    /// Publish records by key; no keys means every dirty record
    pub fn publish(&self, targets: impl IntoIterator<Item = RecordKey>) -> Result<SyncReport> {
        self.new_resolver(SyncAction::Publish, targets.into_iter().collect())
            .run()
    }

    /// Discard records by key; no keys means every dirty record
    pub fn discard(&self, targets: impl IntoIterator<Item = RecordKey>) -> Result<SyncReport> {
        self.new_resolver(SyncAction::Discard, targets.into_iter().collect())
            .run()
    }

    /// Publish record instances
    pub fn publish_records<T: Record>(&self, records: &[T]) -> Result<SyncReport> {
        self.publish(records.iter().map(Record::key))
    }

    /// Discard record instances
    pub fn discard_records<T: Record>(&self, records: &[T]) -> Result<SyncReport> {
        self.discard(records.iter().map(Record::key))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }
}

/// Typed record access through a session with a fixed mode context
#[derive(Clone, Copy)]
pub struct Handle<'a> {
    session: Session<'a>,
}

impl<'a> Handle<'a> {
    fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// Underlying untyped session
    pub fn session(&self) -> Session<'a> {
        self.session
    }

    pub fn context(&self) -> ModeContext {
        self.session.context()
    }

    /// Include soft-deleted records in reads
    pub fn unscoped(self) -> Self {
        Self::new(self.session.unscoped())
    }

    pub fn create<T: Record>(&self, record: &T) -> Result<T> {
        let row = self.session.create(T::TABLE, record.to_row())?;
        Ok(T::from_row(&row)?)
    }

    pub fn update<T: Record>(&self, record: &T) -> Result<T> {
        let row = self.session.update(T::TABLE, record.to_row())?;
        Ok(T::from_row(&row)?)
    }

    /// Delete a record (soft in draft for supported types)
    pub fn delete<T: Record>(&self, record: &T) -> Result<()> {
        self.session.delete(T::TABLE, record.id())?;
        Ok(())
    }

    pub fn find<T: Record>(&self, id: impl Into<RecordId>) -> Result<Option<T>> {
        match self.session.find(T::TABLE, id.into())? {
            Some(row) => Ok(Some(T::from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub fn all<T: Record>(&self) -> Result<Vec<T>> {
        decode(self.session.all(T::TABLE)?)
    }

    pub fn find_by<T: Record>(&self, column: &str, value: impl Into<Value>) -> Result<Vec<T>> {
        decode(self.session.find_by(T::TABLE, column, value)?)
    }
}

fn decode<T: Record>(rows: Vec<stagehand_core::Row>) -> Result<Vec<T>> {
    rows.iter()
        .map(|row| T::from_row(row).map_err(Into::into))
        .collect()
}
