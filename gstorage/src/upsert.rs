use crate::descriptor::{EntityDescriptor, ScanScope};
use crate::errors::Result;
use crate::fetch::ResourceRecord;
use crate::graph::GraphStore;
use crate::models::{Attributes, EntityRef, EntityType, SyncMarker};

/// A record resolved through its descriptor: stable identifier plus the full
/// attribute set for the fields the descriptor covers.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    pub entity: &'static EntityDescriptor,
    pub identifier: String,
    pub attributes: Attributes,
}

pub fn normalize(record: &ResourceRecord, scope: &ScanScope) -> Result<NormalizedRecord> {
    let identifier = record.entity.identifier(&record.body, scope)?;
    let attributes = record.entity.attributes(&record.body, scope);
    Ok(NormalizedRecord {
        entity: record.entity,
        identifier,
        attributes,
    })
}

pub struct UpsertEngine<'a> {
    store: &'a dyn GraphStore,
}

impl<'a> UpsertEngine<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self { store }
    }

    /// Create-or-update keyed by identifier. The supplied attributes are authoritative
    /// for the fields they cover, explicit nulls included.
    pub fn upsert(
        &self,
        entity_type: &EntityType,
        identifier: &str,
        attributes: Attributes,
        marker: SyncMarker,
    ) -> Result<EntityRef> {
        let entity = self
            .store
            .merge_entity(entity_type, identifier, attributes, marker)?;
        log::debug!(
            "{} {} (marker {})",
            if entity.created { "created" } else { "refreshed" },
            entity.node,
            marker
        );
        Ok(entity)
    }

    pub fn upsert_normalized(
        &self,
        record: &NormalizedRecord,
        marker: SyncMarker,
    ) -> Result<EntityRef> {
        self.upsert(
            &record.entity.entity_type,
            &record.identifier,
            record.attributes.clone(),
            marker,
        )
    }
}
