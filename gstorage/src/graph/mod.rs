//! Graph store contract and its implementations.
//!
//! The synchronizer only ever talks to a `GraphStore`; the operations are the
//! minimum needed to mirror external state: match-or-create by identifier, set
//! attributes and marker, match an identifier pair and relate it, and delete by
//! type and stale marker.

pub mod memory;
pub mod sqlite;

use crate::cleanup::{CleanupParams, CleanupScope};
use crate::errors::Result;
use crate::models::{
    Attributes, EntityRef, EntityType, GraphEntity, GraphRelationship, GraphStats, LinkResult,
    NodeRef, SyncMarker,
};

pub use memory::MemoryGraphStore;
pub use sqlite::SqliteGraphStore;

pub trait GraphStore: Send + Sync {
    /// Creates the entity if `(label, identifier)` is unknown, otherwise overwrites the
    /// supplied attributes and the marker. Attributes not supplied keep their values.
    fn merge_entity(
        &self,
        entity_type: &EntityType,
        identifier: &str,
        attributes: Attributes,
        marker: SyncMarker,
    ) -> Result<EntityRef>;

    /// Relates two existing nodes. Nothing is written when either endpoint is absent.
    fn merge_relationship(
        &self,
        relation: &str,
        source: &NodeRef,
        target: &NodeRef,
        marker: SyncMarker,
    ) -> Result<LinkResult>;

    /// Removes in-scope entities of `label` whose marker differs from `params.marker`,
    /// along with every relationship touching them. Returns the number of entities removed.
    fn delete_stale_entities(
        &self,
        label: &str,
        scope: &CleanupScope,
        params: &CleanupParams,
    ) -> Result<usize>;

    fn delete_stale_relationships(
        &self,
        relation: &str,
        source_label: &str,
        target_label: &str,
        scope: &CleanupScope,
        params: &CleanupParams,
    ) -> Result<usize>;

    fn entity(&self, label: &str, identifier: &str) -> Result<Option<GraphEntity>>;

    fn entities_by_label(&self, label: &str) -> Result<Vec<GraphEntity>>;

    fn relationships(&self, relation: Option<&str>) -> Result<Vec<GraphRelationship>>;

    fn stats(&self) -> Result<GraphStats>;
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
