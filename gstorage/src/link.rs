//! Relationship linker: derives the edges a record implies and merges them.

use crate::descriptor::{lookup_str, EntityDescriptor, LinkRule, ScanScope, OWNERSHIP_RELATION};
use crate::errors::{Result, StorageError};
use crate::graph::GraphStore;
use crate::models::{LinkResult, NodeRef, SyncMarker};
use crate::utils::id;
use serde_json::Value;

/// Bucket name from a `scheme://bucket/path...` location. Empty or absent URIs, and
/// URIs without a scheme separator, yield nothing.
pub fn extract_bucket_name(location_uri: Option<&str>) -> Option<String> {
    let uri = location_uri.filter(|u| !u.is_empty())?;
    let (_, rest) = uri.split_once("//")?;
    let bucket = rest.split('/').next().unwrap_or_default();
    if bucket.is_empty() {
        None
    } else {
        Some(bucket.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLink {
    pub relation: &'static str,
    pub source: NodeRef,
    pub target: NodeRef,
}

/// Every edge implied by one record: ownership first (for owned entities), then the
/// descriptor's link rules in declaration order. Rules whose reference field is empty
/// produce no edge at all.
pub fn plan_links(
    descriptor: &EntityDescriptor,
    body: &Value,
    node: &NodeRef,
    account: &NodeRef,
    scope: &ScanScope,
) -> Result<Vec<PlannedLink>> {
    let mut planned = Vec::with_capacity(descriptor.links.len() + 1);
    if descriptor.owned {
        planned.push(PlannedLink {
            relation: OWNERSHIP_RELATION,
            source: account.clone(),
            target: node.clone(),
        });
    }

    for rule in descriptor.links {
        let link = match rule {
            LinkRule::Role {
                field,
                relation,
                target,
            } => lookup_str(body, field)
                .filter(|role| !role.is_empty())
                .map(|role| PlannedLink {
                    relation: *relation,
                    source: node.clone(),
                    target: NodeRef::new(*target, id::role_arn(&scope.account_id, role)),
                }),
            LinkRule::Bucket {
                field,
                relation,
                target,
            } => extract_bucket_name(lookup_str(body, field)).map(|bucket| PlannedLink {
                relation: *relation,
                source: node.clone(),
                target: NodeRef::new(*target, bucket),
            }),
            LinkRule::ContainedBy {
                parent,
                relation,
                parent_id,
            } => optional_id(parent_id.render(parent, body, scope))?.map(|id| PlannedLink {
                relation: *relation,
                source: NodeRef::new(parent.label, id),
                target: node.clone(),
            }),
            LinkRule::References {
                target,
                relation,
                target_id,
            } => optional_id(target_id.render(target, body, scope))?.map(|id| PlannedLink {
                relation: *relation,
                source: node.clone(),
                target: NodeRef::new(target.label, id),
            }),
        };
        if let Some(link) = link {
            planned.push(link);
        }
    }
    Ok(planned)
}

/// A reference whose identifier parts are missing from the record is simply absent.
fn optional_id(rendered: Result<String>) -> Result<Option<String>> {
    match rendered {
        Ok(id) => Ok(Some(id)),
        Err(StorageError::Normalization { entity_type, reason }) => {
            log::debug!("no {entity_type} reference: {reason}");
            Ok(None)
        }
        Err(other) => Err(other),
    }
}

pub struct Linker<'a> {
    store: &'a dyn GraphStore,
}

impl<'a> Linker<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self { store }
    }

    /// Merges one edge. A missing endpoint is a soft condition: logged, reported back,
    /// and retried naturally on a later run once the endpoint exists.
    pub fn link(
        &self,
        relation: &str,
        source: &NodeRef,
        target: &NodeRef,
        marker: SyncMarker,
    ) -> Result<LinkResult> {
        let result = self.store.merge_relationship(relation, source, target, marker)?;
        match &result {
            LinkResult::TargetMissing { missing } => {
                log::warn!(
                    "{source} -[{relation}]-> {target} not linked: {missing} is not in the graph"
                );
            }
            LinkResult::Created => log::debug!("linked {source} -[{relation}]-> {target}"),
            LinkResult::MatchedExisting => {}
        }
        Ok(result)
    }

    pub fn apply(&self, planned: &PlannedLink, marker: SyncMarker) -> Result<LinkResult> {
        self.link(planned.relation, &planned.source, &planned.target, marker)
    }
}
