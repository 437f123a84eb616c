use std::collections::HashMap;

use gstorage::config::FamilyOverride;
use serde::Deserialize;

use crate::error::{AwsFetcherError, Result};
use crate::mapper::{GLACIER_FAMILY, GLUE_FAMILY, KINESIS_FAMILY};

/// Regions where the Kinesis endpoints are not queried unless the caller says otherwise.
pub const KINESIS_SKIPPED_REGIONS: &[&str] =
    &["northeast-1", "northeast-3", "ap-northeast-3", "us-west-1"];

/// Default per-family overrides. A caller-supplied override for the same family
/// replaces the default entirely.
pub fn default_overrides() -> HashMap<String, FamilyOverride> {
    let mut overrides = HashMap::new();
    overrides.insert(
        KINESIS_FAMILY.to_string(),
        FamilyOverride {
            enabled: true,
            skip_regions: KINESIS_SKIPPED_REGIONS
                .iter()
                .map(|r| r.to_string())
                .collect(),
        },
    );
    overrides
}

/// Which families a run enumerates.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FamilySelection {
    All,
    Only(Vec<String>),
}

impl FamilySelection {
    pub fn parse(names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(FamilySelection::All);
        }
        for name in names {
            if ![GLACIER_FAMILY, KINESIS_FAMILY, GLUE_FAMILY].contains(&name.as_str()) {
                return Err(AwsFetcherError::InvalidParam(format!(
                    "unknown family '{name}', expected one of glacier, kinesis, glue"
                )));
            }
        }
        Ok(FamilySelection::Only(names.to_vec()))
    }

    pub fn includes(&self, family: &str) -> bool {
        match self {
            FamilySelection::All => true,
            FamilySelection::Only(names) => names.iter().any(|n| n == family),
        }
    }
}
