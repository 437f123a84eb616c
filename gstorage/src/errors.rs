use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite operation failed: {0}")]
    SQLite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error("Cannot normalize {entity_type} record: {reason}")]
    Normalization {
        entity_type: &'static str,
        reason: String,
    },

    #[error("Enumeration failed: {0}")]
    Enumeration(String),

    #[error("Graph store lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures of one (family, region) scan. Every variant names where it happened so
/// the caller can retry the whole family on the next invocation.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("enumeration of {family} in {region} failed: {message}")]
    Enumeration {
        family: &'static str,
        region: String,
        message: String,
    },

    #[error("upsert of {identifier} ({family}, {region}) failed: {source}")]
    Upsert {
        family: &'static str,
        region: String,
        identifier: String,
        #[source]
        source: StorageError,
    },

    #[error("linking {identifier} via {relation} ({family}, {region}) failed: {source}")]
    Link {
        family: &'static str,
        region: String,
        identifier: String,
        relation: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("scan of {family} in {region} was cancelled")]
    Cancelled {
        family: &'static str,
        region: String,
    },
}

impl SyncError {
    pub fn family(&self) -> &'static str {
        match self {
            SyncError::Enumeration { family, .. }
            | SyncError::Upsert { family, .. }
            | SyncError::Link { family, .. }
            | SyncError::Cancelled { family, .. } => family,
        }
    }

    pub fn region(&self) -> &str {
        match self {
            SyncError::Enumeration { region, .. }
            | SyncError::Upsert { region, .. }
            | SyncError::Link { region, .. }
            | SyncError::Cancelled { region, .. } => region,
        }
    }
}
