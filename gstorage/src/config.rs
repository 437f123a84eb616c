use crate::errors::{Result, StorageError};
use crate::models::SyncMarker;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone)]
pub struct StorageConfig {
    pub graph_path: PathBuf,
    pub catalog_path: PathBuf,
}

impl StorageConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            graph_path: base_path.join("graph.sqlite"),
            catalog_path: base_path.join("catalog.sqlite"),
        }
    }
}

/// Per-family inclusion rules supplied by the caller.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FamilyOverride {
    pub enabled: bool,
    pub skip_regions: Vec<String>,
}

impl Default for FamilyOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            skip_regions: Vec::new(),
        }
    }
}

impl FamilyOverride {
    pub fn includes(&self, region: &str) -> bool {
        self.enabled && !self.skip_regions.iter().any(|r| r == region)
    }
}

fn default_region_concurrency() -> usize {
    4
}

fn default_lookup_concurrency() -> usize {
    8
}

/// Everything one invocation of the pipeline needs from its caller.
#[derive(Deserialize, Debug, Clone)]
pub struct SyncConfig {
    pub account_id: String,
    #[serde(default)]
    pub regions: Vec<String>,
    /// Marker for the whole run. Defaults to the current Unix time in seconds.
    #[serde(default)]
    pub update_tag: Option<i64>,
    #[serde(default = "default_region_concurrency")]
    pub region_concurrency: usize,
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
    #[serde(default)]
    pub families: HashMap<String, FamilyOverride>,
}

impl SyncConfig {
    pub fn new(account_id: impl Into<String>, regions: Vec<String>) -> Self {
        Self {
            account_id: account_id.into(),
            regions,
            update_tag: None,
            region_concurrency: default_region_concurrency(),
            lookup_concurrency: default_lookup_concurrency(),
            families: HashMap::new(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: SyncConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(StorageError::Config("account_id must not be empty".into()));
        }
        if self.region_concurrency == 0 || self.lookup_concurrency == 0 {
            return Err(StorageError::Config(
                "concurrency limits must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn marker(&self) -> SyncMarker {
        self.update_tag.map(SyncMarker).unwrap_or_else(SyncMarker::now)
    }

    /// Caller overrides win over the family defaults they name.
    pub fn merge_defaults(&mut self, defaults: HashMap<String, FamilyOverride>) {
        for (family, rule) in defaults {
            self.families.entry(family).or_insert(rule);
        }
    }
}
