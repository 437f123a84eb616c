//! Declarative cleanup jobs and the reconciler that runs them.

use crate::errors::Result;
use crate::graph::GraphStore;
use crate::models::{NodeRef, SyncMarker};
use serde::Serialize;

/// Which nodes of a label belong to the account being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum CleanupScope {
    /// The node is the account node itself.
    Account,
    /// `(account)-[RESOURCE]->(node)`
    Owned,
    /// `(account)-[RESOURCE]->(parent)-[relation]->(node)`
    ContainedBy {
        parent: &'static str,
        relation: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CleanupStatement {
    /// Deletes nodes of `label` in scope whose marker differs, together with their edges.
    StaleEntities {
        label: &'static str,
        scope: CleanupScope,
    },
    /// Deletes `relation` edges from in-scope `source_label` nodes to `target_label`
    /// nodes whose marker differs.
    StaleRelationships {
        relation: &'static str,
        source_label: &'static str,
        target_label: &'static str,
        scope: CleanupScope,
    },
}

/// Per-family cleanup rule set. Statements run in order; children come before the
/// parents whose edges scope them.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CleanupJob {
    pub name: &'static str,
    pub statements: &'static [CleanupStatement],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupParams {
    pub account: NodeRef,
    pub marker: SyncMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    Scanning,
    Reconciling,
    Idle,
}

/// Tracks one family through Scanning, Reconciling and Idle. Reconciling is only
/// reachable from a Scanning phase that every region finished cleanly.
#[derive(Debug)]
pub struct Reconciler {
    job: CleanupJob,
    phase: ReconcilePhase,
}

impl Reconciler {
    pub fn begin(job: CleanupJob) -> Self {
        Self {
            job,
            phase: ReconcilePhase::Scanning,
        }
    }

    pub fn phase(&self) -> ReconcilePhase {
        self.phase
    }

    /// Leaves Scanning without touching the graph.
    pub fn abandon(&mut self) {
        log::warn!(
            "{}: scan incomplete, leaving prior graph state untouched",
            self.job.name
        );
        self.phase = ReconcilePhase::Idle;
    }

    /// Runs every statement of the job and returns how many entities and relationships
    /// were removed. A reconciler that is no longer scanning does nothing.
    pub fn reconcile(&mut self, store: &dyn GraphStore, params: &CleanupParams) -> Result<usize> {
        if self.phase != ReconcilePhase::Scanning {
            return Ok(0);
        }
        self.phase = ReconcilePhase::Reconciling;
        let result = run_cleanup_job(&self.job, store, params);
        self.phase = ReconcilePhase::Idle;
        result
    }
}

pub fn run_cleanup_job(
    job: &CleanupJob,
    store: &dyn GraphStore,
    params: &CleanupParams,
) -> Result<usize> {
    let mut deleted = 0;
    for statement in job.statements {
        let removed = match statement {
            CleanupStatement::StaleEntities { label, scope } => {
                store.delete_stale_entities(label, scope, params)?
            }
            CleanupStatement::StaleRelationships {
                relation,
                source_label,
                target_label,
                scope,
            } => store.delete_stale_relationships(
                relation,
                source_label,
                target_label,
                scope,
                params,
            )?,
        };
        if removed > 0 {
            log::info!(
                "{}: removed {} stale item(s) for {:?} (account {}, marker {})",
                job.name,
                removed,
                statement,
                params.account.id,
                params.marker
            );
        }
        deleted += removed;
    }
    Ok(deleted)
}
