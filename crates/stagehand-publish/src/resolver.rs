//! Resolver: dependency expansion, ordering and sync
//!
//! A [`Resolver`] handles one publish or discard call. Inside a single store
//! transaction it:
//!
//! 1. loads every target record's draft and production rows,
//! 2. expands dependencies of dirty records (publish-requires for publish,
//!    discard-cascades for discard), visiting each [`RecordKey`] once,
//! 3. orders the records so targets of an edge come first
//!    ([`crate::graph::ordered_groups`]),
//! 4. builds a [`SyncPlan`] and applies it.
//!
//! Any error drops the transaction, so neither draft nor production change.

use crate::commit::{self, SyncReport};
use crate::dependency::{Dependency, Lookup};
use crate::error::{Error, Result};
use crate::graph::ordered_groups;
use crate::plan::{SyncAction, SyncPlan};
use crate::registry::{ModelRegistry, SupportedModel};
use indexmap::IndexMap;
use stagehand_core::{draft_table_name, RecordKey, Row, Value};
use stagehand_db::{Store, Txn};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Single-use publish/discard engine
pub struct Resolver<'a> {
    store: &'a Store,
    registry: &'a ModelRegistry,
    action: SyncAction,
    targets: Vec<RecordKey>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for `action` over `targets`
    ///
    /// Empty targets mean every dirty draft row of every registered model.
    pub fn new(
        store: &'a Store,
        registry: &'a ModelRegistry,
        action: SyncAction,
        targets: Vec<RecordKey>,
    ) -> Self {
        Self {
            store,
            registry,
            action,
            targets,
        }
    }

    /// Resolve and apply in one transaction
    pub fn run(self) -> Result<SyncReport> {
        let report = self.store.transaction(|tx| {
            let plan = self.plan_in(tx)?;
            commit::apply(tx, &plan)
        })?;

        if report.is_noop() {
            debug!(action = %report.action, skipped = report.skipped.len(), "nothing to sync");
        } else {
            info!(
                action = %report.action,
                processed = report.processed.len(),
                skipped = report.skipped.len(),
                cycles = report.cycles.len(),
                writes = report.writes,
                "sync committed"
            );
        }
        Ok(report)
    }

    /// Resolve without writing anything
    pub fn plan(&self) -> Result<SyncPlan> {
        self.store.transaction(|tx| self.plan_in(tx))
    }

    /// Resolve against an open transaction
    pub fn plan_in(&self, tx: &Txn<'_>) -> Result<SyncPlan> {
        let mut graph = Graph::new(tx, self.registry, self.action);

        if self.targets.is_empty() {
            graph.add_all_dirty()?;
        } else {
            for target in &self.targets {
                graph.add_target(target)?;
            }
        }
        graph.expand()?;
        graph.check_removals()?;
        Ok(graph.into_plan())
    }
}

struct Node {
    key: RecordKey,
    model: Arc<SupportedModel>,
    draft: Option<Row>,
    production: Option<Row>,
    // nodes processed before this one
    edges: Vec<usize>,
}

impl Node {
    fn is_dirty(&self) -> bool {
        self.draft.as_ref().is_some_and(Row::is_dirty)
    }

    fn is_deleted(&self) -> bool {
        self.draft.as_ref().is_some_and(Row::is_deleted)
    }
}

// Dependency map keyed by record identity; insertion order is discovery order.
struct Graph<'t, 'db> {
    tx: &'t Txn<'db>,
    registry: &'t ModelRegistry,
    action: SyncAction,
    nodes: IndexMap<RecordKey, Node>,
    pending: Vec<usize>,
}

impl<'t, 'db> Graph<'t, 'db> {
    fn new(tx: &'t Txn<'db>, registry: &'t ModelRegistry, action: SyncAction) -> Self {
        Self {
            tx,
            registry,
            action,
            nodes: IndexMap::new(),
            pending: Vec::new(),
        }
    }

    fn add_target(&mut self, key: &RecordKey) -> Result<()> {
        let index = self.node(key)?;
        let (key, node) = self.node_at(index);
        if node.draft.is_none() {
            return Err(Error::RecordNotFound(key.clone()));
        }
        Ok(())
    }

    fn add_all_dirty(&mut self) -> Result<()> {
        for model in self.registry.models() {
            for row in self.tx.scan(&model.draft_table)? {
                if row.is_dirty() {
                    self.node(&RecordKey::new(model.table.clone(), row.id))?;
                }
            }
        }
        Ok(())
    }

    // Look up or load a record; new records are queued for expansion
    fn node(&mut self, key: &RecordKey) -> Result<usize> {
        let model = self.registry.require(&key.table)?;
        let key = RecordKey::new(model.table.clone(), key.id);
        if let Some(index) = self.nodes.get_index_of(&key) {
            return Ok(index);
        }

        let draft = self.tx.get(&model.draft_table, key.id)?;
        let production = self.tx.get(&model.table, key.id)?;
        debug!(%key, draft = draft.is_some(), production = production.is_some(), "visit");

        let (index, _) = self.nodes.insert_full(
            key.clone(),
            Node {
                key,
                model,
                draft,
                production,
                edges: Vec::new(),
            },
        );
        self.pending.push(index);
        Ok(index)
    }

    fn node_at(&self, index: usize) -> (&RecordKey, &Node) {
        let node = &self.nodes[index];
        (&node.key, node)
    }

    fn expand(&mut self) -> Result<()> {
        while let Some(index) = self.pending.pop() {
            let (key, node) = self.node_at(index);
            if !node.is_dirty() {
                continue;
            }
            // a deleted record does not need anything in production
            if self.action == SyncAction::Publish && node.is_deleted() {
                continue;
            }

            let key = key.clone();
            let deps = match &node.draft {
                Some(draft) => node.model.dependencies(draft),
                None => Vec::new(),
            };

            for dep in deps {
                let relevant = match self.action {
                    SyncAction::Publish => dep.is_publish(),
                    SyncAction::Discard => dep.is_discard(),
                };
                if relevant {
                    self.follow(index, &key, &dep)?;
                }
            }
        }
        Ok(())
    }

    fn follow(&mut self, index: usize, key: &RecordKey, dep: &Dependency) -> Result<()> {
        for target in self.lookup(key, dep)? {
            // a discard only cascades to records with no production row of their own
            if self.action == SyncAction::Discard && self.in_production(&target)? {
                debug!(record = %key, dependent = %target, "published dependent kept");
                continue;
            }
            let target_index = self.node(&target)?;
            if target_index == index {
                continue;
            }

            let (target, node) = self.node_at(target_index);
            if self.action == SyncAction::Publish {
                if node.draft.is_none() {
                    return Err(Error::UnresolvedDependency {
                        record: key.clone(),
                        dependency: target.clone(),
                    });
                }
                if node.is_deleted() {
                    return Err(Error::DeletedDependency {
                        record: key.clone(),
                        dependency: target.clone(),
                    });
                }
            }
            if !node.is_dirty() {
                continue;
            }

            let edges = &mut self.nodes[index].edges;
            if !edges.contains(&target_index) {
                edges.push(target_index);
            }
        }
        Ok(())
    }

    fn in_production(&self, key: &RecordKey) -> Result<bool> {
        let model = self.registry.require(&key.table)?;
        match self.nodes.get(&RecordKey::new(model.table.clone(), key.id)) {
            Some(node) => Ok(node.production.is_some()),
            None => Ok(self.tx.get(&model.table, key.id)?.is_some()),
        }
    }

    // Production rows that require a record whose removal is being published
    // must be removed in the same call.
    fn check_removals(&self) -> Result<()> {
        if self.action != SyncAction::Publish {
            return Ok(());
        }
        let removed: Vec<&Node> = self
            .nodes
            .values()
            .filter(|node| node.is_dirty() && node.is_deleted() && node.production.is_some())
            .collect();
        if removed.is_empty() {
            return Ok(());
        }

        for model in self.registry.models() {
            for row in self.tx.scan(&model.table)? {
                let dependent = RecordKey::new(model.table.clone(), row.id);
                // rewritten by this call; its new draft was already checked
                if self.nodes.get(&dependent).is_some_and(Node::is_dirty) {
                    continue;
                }
                for dep in model.dependencies(&row) {
                    if !dep.is_publish() {
                        continue;
                    }
                    for node in &removed {
                        if node.key != dependent && self.requires(&dependent, &dep, node)? {
                            return Err(Error::RequiredInProduction {
                                record: node.key.clone(),
                                dependent,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn requires(&self, key: &RecordKey, dep: &Dependency, target: &Node) -> Result<bool> {
        match &dep.lookup {
            Lookup::Key(required) => Ok(required.id == target.key.id
                && self
                    .registry
                    .get(&required.table)
                    .is_some_and(|model| model.table == target.key.table)),
            Lookup::ReferencedBy { table, column } => {
                if self.registry.require(table)?.table != target.key.table {
                    return Ok(false);
                }
                let id = id_value(key)?;
                Ok(target
                    .production
                    .as_ref()
                    .and_then(|row| row.get(column))
                    .is_some_and(|value| *value == id))
            }
        }
    }

    fn lookup(&self, key: &RecordKey, dep: &Dependency) -> Result<Vec<RecordKey>> {
        match &dep.lookup {
            Lookup::Key(target) => Ok(vec![target.clone()]),
            Lookup::ReferencedBy { table, column } => {
                let model = self.registry.require(table)?;
                let id = id_value(key)?;
                let rows = self
                    .tx
                    .scan_where(&draft_table_name(&model.table), column, &id)?;
                Ok(rows
                    .into_iter()
                    .map(|row| RecordKey::new(model.table.clone(), row.id))
                    .collect())
            }
        }
    }

    fn into_plan(self) -> SyncPlan {
        let edges: Vec<Vec<usize>> = self.nodes.values().map(|n| n.edges.clone()).collect();
        let mut plan = SyncPlan::new(self.action);

        for group in ordered_groups(&edges) {
            if group.len() > 1 {
                let members: Vec<RecordKey> = group
                    .iter()
                    .map(|&i| self.node_at(i).0.clone())
                    .collect();
                warn!(
                    action = %self.action,
                    records = ?members.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "dependency cycle, processing as one group"
                );
                plan.cycles.push(members);
            }
            for i in group {
                let (key, node) = self.node_at(i);
                plan.add(key.clone(), node.draft.as_ref(), node.production.as_ref());
            }
        }
        plan
    }
}

// Int columns hold ids, so ids past i64::MAX cannot be referenced
fn id_value(key: &RecordKey) -> Result<Value> {
    i64::try_from(key.id.raw())
        .map(Value::Int)
        .map_err(|_| Error::IdOutOfRange(key.clone()))
}
