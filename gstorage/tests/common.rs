use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gstorage::cleanup::{CleanupJob, CleanupScope, CleanupStatement};
use gstorage::config::StorageConfig;
use gstorage::descriptor::{EntityDescriptor, FamilyDescriptor, IdTemplate, field};
use gstorage::errors::{Result, StorageError};
use gstorage::fetch::{ResourceEnumerator, ResourceRecord};
use gstorage::graph::GraphStore;
use gstorage::models::{Attributes, EntityType, NodeRef, SyncMarker};
use gstorage::GStorage;
use serde_json::{Value, json};
use tempfile::TempDir;

pub const ACCOUNT_ID: &str = "000000000000";
pub const ACCOUNT: EntityType = EntityType::new("aws", "AWSAccount");

pub static VAULT_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: EntityType::new("vault", "Vault"),
    identifier: IdTemplate::Arn {
        service: "glacier",
        resource: "vaults/{}",
        parts: &["VaultName"],
    },
    fields: &[
        field("VaultName", "vaultname"),
        field("SizeInBytes", "sizeInBytes"),
    ],
    links: &[],
    owned: true,
};

pub static VAULT_FAMILY: FamilyDescriptor = FamilyDescriptor {
    name: "vault",
    entities: &[&VAULT_ENTITY],
    cleanup: CleanupJob {
        name: "vault_cleanup",
        statements: &[
            CleanupStatement::StaleEntities {
                label: "Vault",
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: "RESOURCE",
                source_label: "AWSAccount",
                target_label: "Vault",
                scope: CleanupScope::Account,
            },
        ],
    },
};

pub static STREAM_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: EntityType::new("stream", "Stream"),
    identifier: IdTemplate::Arn {
        service: "kinesis",
        resource: "stream/{}",
        parts: &["StreamName"],
    },
    fields: &[field("StreamName", "streamName")],
    links: &[],
    owned: true,
};

pub static STREAM_FAMILY: FamilyDescriptor = FamilyDescriptor {
    name: "stream",
    entities: &[&STREAM_ENTITY],
    cleanup: CleanupJob {
        name: "stream_cleanup",
        statements: &[CleanupStatement::StaleEntities {
            label: "Stream",
            scope: CleanupScope::Owned,
        }],
    },
};

#[allow(dead_code)]
pub struct TestContext {
    pub temp_dir: TempDir,
    pub config: StorageConfig,
    pub storage: GStorage,
}

pub async fn init_test_context() -> anyhow::Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let config = StorageConfig::new(temp_dir.path());
    let storage = GStorage::with_region_concurrency(config.clone(), 2).await?;
    seed_account(storage.store.as_ref())?;
    Ok(TestContext {
        temp_dir,
        config,
        storage,
    })
}

pub fn account() -> NodeRef {
    NodeRef::new(ACCOUNT.label, ACCOUNT_ID)
}

pub fn seed_account(store: &dyn GraphStore) -> Result<()> {
    store.merge_entity(&ACCOUNT, ACCOUNT_ID, Attributes::new(), SyncMarker(1))?;
    Ok(())
}

pub fn vault(name: &str) -> Value {
    json!({"VaultName": name, "SizeInBytes": 0})
}

#[allow(dead_code)]
pub fn stream(name: &str) -> Value {
    json!({"StreamName": name})
}

pub fn vault_names(store: &dyn GraphStore) -> Vec<String> {
    let mut names: Vec<String> = store
        .entities_by_label("Vault")
        .unwrap()
        .iter()
        .filter_map(|e| e.str_property("vaultname").map(str::to_string))
        .collect();
    names.sort();
    names
}

#[allow(dead_code)]
#[derive(Clone)]
pub enum Script {
    Records(Vec<Value>),
    Fail(String),
    /// Never returns; only cancellation gets the scan out.
    Hang,
}

/// Enumerator replaying a per-region script.
pub struct ScriptedEnumerator {
    family: &'static FamilyDescriptor,
    entity: &'static EntityDescriptor,
    scripts: Mutex<HashMap<String, Script>>,
}

#[allow(dead_code)]
impl ScriptedEnumerator {
    pub fn vaults() -> Self {
        Self {
            family: &VAULT_FAMILY,
            entity: &VAULT_ENTITY,
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn streams() -> Self {
        Self {
            family: &STREAM_FAMILY,
            entity: &STREAM_ENTITY,
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(self, region: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(region.to_string(), script);
        self
    }

    pub fn set(&self, region: &str, script: Script) {
        self.scripts.lock().unwrap().insert(region.to_string(), script);
    }
}

#[async_trait]
impl ResourceEnumerator for ScriptedEnumerator {
    fn family(&self) -> &'static FamilyDescriptor {
        self.family
    }

    async fn enumerate(&self, region: &str) -> Result<Vec<ResourceRecord>> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(region)
            .cloned()
            .unwrap_or(Script::Records(Vec::new()));
        match script {
            Script::Records(bodies) => Ok(bodies
                .into_iter()
                .map(|body| ResourceRecord {
                    entity: self.entity,
                    body,
                })
                .collect()),
            Script::Fail(message) => Err(StorageError::Enumeration(message)),
            Script::Hang => {
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
        }
    }
}

#[allow(dead_code)]
pub fn shared(enumerator: ScriptedEnumerator) -> Arc<dyn ResourceEnumerator> {
    Arc::new(enumerator)
}
