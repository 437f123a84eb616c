use super::{now_millis, GraphStore};
use crate::cleanup::{CleanupParams, CleanupScope};
use crate::descriptor::OWNERSHIP_RELATION;
use crate::errors::{Result, StorageError};
use crate::models::{
    Attributes, EntityRef, EntityType, GraphEntity, GraphRelationship, GraphStats, LinkResult,
    NodeRef, SyncMarker,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

type EdgeKey = (String, NodeRef, NodeRef);

#[derive(Default)]
struct GraphState {
    entities: HashMap<NodeRef, GraphEntity>,
    relationships: BTreeMap<EdgeKey, GraphRelationship>,
}

impl GraphState {
    fn has_edge(&self, relation: &str, source: &NodeRef, target: &NodeRef) -> bool {
        self.relationships
            .contains_key(&(relation.to_string(), source.clone(), target.clone()))
    }

    fn in_scope(&self, node: &NodeRef, scope: &CleanupScope, params: &CleanupParams) -> bool {
        match scope {
            CleanupScope::Account => node == &params.account,
            CleanupScope::Owned => self.has_edge(OWNERSHIP_RELATION, &params.account, node),
            CleanupScope::ContainedBy { parent, relation } => {
                self.relationships.values().any(|rel| {
                    rel.relation == *relation
                        && rel.target == *node
                        && rel.source.label == *parent
                        && self.has_edge(OWNERSHIP_RELATION, &params.account, &rel.source)
                })
            }
        }
    }
}

/// Graph store kept entirely in process memory behind one mutex.
#[derive(Default)]
pub struct MemoryGraphStore {
    state: Mutex<GraphState>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, GraphState>> {
        self.state.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl GraphStore for MemoryGraphStore {
    fn merge_entity(
        &self,
        entity_type: &EntityType,
        identifier: &str,
        attributes: Attributes,
        marker: SyncMarker,
    ) -> Result<EntityRef> {
        let node = NodeRef::new(entity_type.label, identifier);
        let mut state = self.lock()?;
        let created = match state.entities.get_mut(&node) {
            Some(existing) => {
                existing.properties.extend(attributes);
                existing.lastupdated = marker;
                false
            }
            None => {
                state.entities.insert(
                    node.clone(),
                    GraphEntity {
                        label: entity_type.label.to_string(),
                        id: identifier.to_string(),
                        family: entity_type.family.to_string(),
                        properties: attributes,
                        lastupdated: marker,
                        firstseen: now_millis(),
                    },
                );
                true
            }
        };
        Ok(EntityRef { node, created })
    }

    fn merge_relationship(
        &self,
        relation: &str,
        source: &NodeRef,
        target: &NodeRef,
        marker: SyncMarker,
    ) -> Result<LinkResult> {
        let mut state = self.lock()?;
        for endpoint in [source, target] {
            if !state.entities.contains_key(endpoint) {
                return Ok(LinkResult::TargetMissing {
                    missing: endpoint.clone(),
                });
            }
        }
        let key = (relation.to_string(), source.clone(), target.clone());
        if let Some(existing) = state.relationships.get_mut(&key) {
            existing.lastupdated = marker;
            return Ok(LinkResult::MatchedExisting);
        }
        state.relationships.insert(
            key,
            GraphRelationship {
                relation: relation.to_string(),
                source: source.clone(),
                target: target.clone(),
                lastupdated: marker,
                firstseen: now_millis(),
            },
        );
        Ok(LinkResult::Created)
    }

    fn delete_stale_entities(
        &self,
        label: &str,
        scope: &CleanupScope,
        params: &CleanupParams,
    ) -> Result<usize> {
        let mut state = self.lock()?;
        let stale: Vec<NodeRef> = state
            .entities
            .values()
            .filter(|e| e.label == label && e.lastupdated != params.marker)
            .map(GraphEntity::node_ref)
            .filter(|node| state.in_scope(node, scope, params))
            .collect();
        for node in &stale {
            state.entities.remove(node);
            state
                .relationships
                .retain(|_, rel| rel.source != *node && rel.target != *node);
        }
        Ok(stale.len())
    }

    fn delete_stale_relationships(
        &self,
        relation: &str,
        source_label: &str,
        target_label: &str,
        scope: &CleanupScope,
        params: &CleanupParams,
    ) -> Result<usize> {
        let mut state = self.lock()?;
        let stale: Vec<EdgeKey> = state
            .relationships
            .iter()
            .filter(|(_, rel)| {
                rel.relation == relation
                    && rel.source.label == source_label
                    && rel.target.label == target_label
                    && rel.lastupdated != params.marker
                    && state.in_scope(&rel.source, scope, params)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            state.relationships.remove(key);
        }
        Ok(stale.len())
    }

    fn entity(&self, label: &str, identifier: &str) -> Result<Option<GraphEntity>> {
        let state = self.lock()?;
        Ok(state.entities.get(&NodeRef::new(label, identifier)).cloned())
    }

    fn entities_by_label(&self, label: &str) -> Result<Vec<GraphEntity>> {
        let state = self.lock()?;
        let mut found: Vec<GraphEntity> = state
            .entities
            .values()
            .filter(|e| e.label == label)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    fn relationships(&self, relation: Option<&str>) -> Result<Vec<GraphRelationship>> {
        let state = self.lock()?;
        Ok(state
            .relationships
            .values()
            .filter(|rel| relation.map_or(true, |r| rel.relation == r))
            .cloned()
            .collect())
    }

    fn stats(&self) -> Result<GraphStats> {
        let state = self.lock()?;
        let mut stats = GraphStats::default();
        for entity in state.entities.values() {
            *stats.entities.entry(entity.label.clone()).or_insert(0) += 1;
        }
        for rel in state.relationships.values() {
            *stats.relationships.entry(rel.relation.clone()).or_insert(0) += 1;
        }
        Ok(stats)
    }
}
