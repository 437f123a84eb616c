use crate::descriptor::{EntityDescriptor, FamilyDescriptor};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// One page of a provider listing call.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Drains a paginated listing from the first page. No cursor survives the call, so
/// invoking it again re-enumerates from scratch.
pub async fn collect_pages<T, E, F, Fut>(mut fetch_page: F) -> std::result::Result<Vec<T>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = std::result::Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = fetch_page(token.take()).await?;
        items.extend(page.items);
        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }
    Ok(items)
}

/// Result of a secondary per-resource lookup. Absence is an expected state and is
/// persisted as such, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Adjunct<T> {
    Present { document: T },
    Absent { reason: String },
}

impl<T> Adjunct<T> {
    pub fn present(document: T) -> Self {
        Adjunct::Present { document }
    }

    pub fn absent(reason: impl Into<String>) -> Self {
        Adjunct::Absent {
            reason: reason.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Adjunct::Present { .. })
    }

    pub fn document(&self) -> Option<&T> {
        match self {
            Adjunct::Present { document } => Some(document),
            Adjunct::Absent { .. } => None,
        }
    }
}

/// A validated snapshot of one external resource, tagged with the descriptor that
/// knows how to turn it into a graph entity.
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub entity: &'static EntityDescriptor,
    pub body: serde_json::Value,
}

impl ResourceRecord {
    pub fn from_typed<T: Serialize>(entity: &'static EntityDescriptor, record: &T) -> Result<Self> {
        Ok(Self {
            entity,
            body: serde_json::to_value(record)?,
        })
    }
}

/// Lists every resource of one family in one region.
///
/// Records must be ordered so that parents precede the children that reference
/// them (a catalog database before its tables).
#[async_trait]
pub trait ResourceEnumerator: Send + Sync {
    fn family(&self) -> &'static FamilyDescriptor;

    async fn enumerate(&self, region: &str) -> Result<Vec<ResourceRecord>>;
}
