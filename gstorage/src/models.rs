use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map written onto an entity. Values are scalars, lists of scalars or `null`.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Run-scoped value stamped on every entity and relationship written during one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncMarker(pub i64);

impl SyncMarker {
    pub fn now() -> Self {
        SyncMarker(chrono::Utc::now().timestamp())
    }
}

impl fmt::Display for SyncMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag of a graph entity: the resource family it belongs to plus its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityType {
    pub family: &'static str,
    pub label: &'static str,
}

impl EntityType {
    pub const fn new(family: &'static str, label: &'static str) -> Self {
        Self { family, label }
    }
}

/// Address of a node in the graph: label plus stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub label: String,
    pub id: String,
}

impl NodeRef {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.label, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntity {
    pub label: String,
    pub id: String,
    pub family: String,
    pub properties: Attributes,
    pub lastupdated: SyncMarker,
    /// Unix millis, written once on creation.
    pub firstseen: i64,
}

impl GraphEntity {
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.label.clone(), self.id.clone())
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub relation: String,
    pub source: NodeRef,
    pub target: NodeRef,
    pub lastupdated: SyncMarker,
    pub firstseen: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub node: NodeRef,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LinkResult {
    Created,
    MatchedExisting,
    /// One endpoint is absent from the graph; no relationship was written.
    TargetMissing { missing: NodeRef },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub entities: BTreeMap<String, usize>,
    pub relationships: BTreeMap<String, usize>,
}

// --- Sync reports ---

#[derive(Debug, Clone, Serialize)]
pub struct MissingLink {
    pub relation: &'static str,
    pub source: NodeRef,
    pub missing: NodeRef,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegionReport {
    pub region: String,
    pub records: usize,
    pub entities_created: usize,
    pub entities_updated: usize,
    pub links_created: usize,
    pub links_matched: usize,
    pub links_missing: Vec<MissingLink>,
    pub errors: Vec<String>,
}

impl RegionReport {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FamilyOutcome {
    Reconciled { deleted: usize },
    ReconcileSkipped { reasons: Vec<String> },
    Disabled,
    /// Store or catalog failure outside any region scan; the run continued with the
    /// next family.
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyReport {
    pub family: &'static str,
    pub marker: SyncMarker,
    pub regions: Vec<RegionReport>,
    pub outcome: FamilyOutcome,
}

impl FamilyReport {
    pub fn reconciled(&self) -> bool {
        matches!(self.outcome, FamilyOutcome::Reconciled { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub families: Vec<FamilyReport>,
}

impl SyncReport {
    pub fn family(&self, name: &str) -> Option<&FamilyReport> {
        self.families.iter().find(|f| f.family == name)
    }
}

// --- Catalog (SQLite) models ---

#[derive(Debug)]
pub struct TaskLog {
    pub task_id: i64,
    pub task_name: String,
    pub start_time: i64, // Unix timestamp
    pub end_time: Option<i64>,
    pub status: String,
    pub details: String, // JSON string
}

#[derive(Debug, PartialEq, Eq)]
pub struct CompletedScan {
    pub account_id: String,
    pub family: String,
    pub marker: SyncMarker,
    pub completed_at: i64,
}
