//! Lifecycle hooks wired into the store's operation pipeline
//!
//! | Operation | Before | After commit |
//! |---|---|---|
//! | create | force draft, mark dirty | sync reaction |
//! | update | force draft, mark dirty | sync reaction |
//! | delete | force draft, mark dirty, soft delete | sync reaction |
//! | query | default to draft unless a mode was requested | |
//!
//! Hooks ignore tables that do not belong to a registered model.

use crate::config::PublishConfig;
use crate::plan::SyncAction;
use crate::registry::ModelRegistry;
use crate::resolver::Resolver;
use stagehand_core::{Mode, RecordKey, DIRTY, PUBLISH_STATUS};
use stagehand_db::{Error, Operation, OperationKind, Result, Store};
use std::sync::Arc;
use tracing::debug;

pub const SET_TABLE_TO_DRAFT: &str = "publish:set_table_to_draft";
pub const SOFT_DELETE: &str = "publish:soft_delete";
pub const SET_TABLE_IN_DRAFT_MODE: &str = "publish:set_table_in_draft_mode";
pub const SYNC_AFTER_CREATE: &str = "publish:sync_to_production_after_create";
pub const SYNC_AFTER_UPDATE: &str = "publish:sync_to_production_after_update";
pub const SYNC_AFTER_DELETE: &str = "publish:sync_to_production_after_delete";

/// Register every publish hook on `store`
///
/// Registering again replaces the previous hooks, so a store can be
/// reconfigured without stacking duplicates.
pub fn register(store: &Store, registry: Arc<ModelRegistry>, config: &PublishConfig) {
    let callbacks = store.callbacks();

    for kind in [
        OperationKind::Create,
        OperationKind::Update,
        OperationKind::Delete,
    ] {
        let registry = registry.clone();
        callbacks.register_before(kind, SET_TABLE_TO_DRAFT, move |op| {
            set_table_to_draft(&registry, op);
            Ok(())
        });
    }

    let soft_delete_registry = registry.clone();
    callbacks.register_before(OperationKind::Delete, SOFT_DELETE, move |op| {
        if soft_delete_registry.contains(&op.table) {
            op.soft_delete = true;
        }
        Ok(())
    });

    let query_registry = registry.clone();
    callbacks.register_before(OperationKind::Query, SET_TABLE_IN_DRAFT_MODE, move |op| {
        set_table_in_draft_mode(&query_registry, op);
        Ok(())
    });

    for (kind, name) in [
        (OperationKind::Create, SYNC_AFTER_CREATE),
        (OperationKind::Update, SYNC_AFTER_UPDATE),
        (OperationKind::Delete, SYNC_AFTER_DELETE),
    ] {
        let registry = registry.clone();
        let auto_publish = config.auto_publish;
        callbacks.register_after_commit(kind, name, move |store, op| {
            sync_to_production(store, &registry, auto_publish, name, op)
        });
    }
}

fn set_table_to_draft(registry: &ModelRegistry, op: &mut Operation) {
    if !registry.contains(&op.table) {
        return;
    }
    op.ctx = op.ctx.forced();
    match op.kind {
        OperationKind::Delete => op.assign(PUBLISH_STATUS, DIRTY),
        _ => op.set_column(PUBLISH_STATUS, DIRTY),
    }
    debug!(table = %op.table, kind = ?op.kind, "routed to draft");
}

fn set_table_in_draft_mode(registry: &ModelRegistry, op: &mut Operation) {
    if registry.contains(&op.table) && op.ctx.requested().is_none() {
        op.ctx = op.ctx.with_mode(Mode::Draft);
    }
}

fn sync_to_production(
    store: &Store,
    registry: &ModelRegistry,
    auto_publish: bool,
    name: &str,
    op: &Operation,
) -> Result<()> {
    let Some(model) = registry.get(&op.table) else {
        return Ok(());
    };
    let Some(id) = op.id else {
        return Ok(());
    };
    let key = RecordKey::new(model.table.clone(), id);

    if !auto_publish {
        debug!(%key, kind = ?op.kind, "pending publish");
        return Ok(());
    }

    Resolver::new(store, registry, SyncAction::Publish, vec![key])
        .run()
        .map_err(|err| Error::callback(name, err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::Product;
    use stagehand_core::{ModeContext, RecordId, Row, Value};

    fn registry() -> Arc<ModelRegistry> {
        let registry = ModelRegistry::new();
        registry.register::<Product>().unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_writes_are_forced_to_draft_and_marked_dirty() {
        let registry = registry();
        let mut op = Operation::new(OperationKind::Update, "products", ModeContext::production())
            .with_row(Row::new(RecordId::new(1)));
        set_table_to_draft(&registry, &mut op);

        assert_eq!(op.ctx.effective(), Mode::ForcedDraft);
        assert!(op.row.unwrap().is_dirty());
    }

    #[test]
    fn test_delete_assigns_dirty() {
        let registry = registry();
        let mut op = Operation::new(OperationKind::Delete, "products", ModeContext::unset())
            .with_id(RecordId::new(1));
        set_table_to_draft(&registry, &mut op);

        assert!(op.ctx.is_forced());
        assert_eq!(op.assignments.get(PUBLISH_STATUS), Some(&Value::Bool(DIRTY)));
    }

    #[test]
    fn test_unregistered_tables_are_untouched() {
        let registry = registry();
        let mut op = Operation::new(OperationKind::Create, "orders", ModeContext::production())
            .with_row(Row::new(RecordId::new(1)));
        set_table_to_draft(&registry, &mut op);
        assert_eq!(op.ctx, ModeContext::production());
        assert!(!op.row.unwrap().is_dirty());

        let mut query = Operation::new(OperationKind::Query, "orders", ModeContext::unset());
        set_table_in_draft_mode(&registry, &mut query);
        assert_eq!(query.ctx.effective(), Mode::Production);
    }

    #[test]
    fn test_queries_default_to_draft_unless_requested() {
        let registry = registry();
        let mut op = Operation::new(OperationKind::Query, "products", ModeContext::unset());
        set_table_in_draft_mode(&registry, &mut op);
        assert_eq!(op.ctx.effective(), Mode::Draft);

        let mut op = Operation::new(OperationKind::Query, "products", ModeContext::production());
        set_table_in_draft_mode(&registry, &mut op);
        assert_eq!(op.ctx.effective(), Mode::Production);
    }

    #[test]
    fn test_register_uses_named_callbacks() {
        let store = Store::in_memory().unwrap();
        register(&store, registry(), &PublishConfig::default());
        register(&store, registry(), &PublishConfig::default());

        assert_eq!(
            store.callbacks().names(OperationKind::Delete),
            vec![SET_TABLE_TO_DRAFT, SOFT_DELETE, SYNC_AFTER_DELETE]
        );
        assert_eq!(
            store.callbacks().names(OperationKind::Query),
            vec![SET_TABLE_IN_DRAFT_MODE]
        );
    }
}
