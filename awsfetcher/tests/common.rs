use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use awsfetcher::client::AwsService;
use awsfetcher::error::{AwsFetcherError, Result};
use awsfetcher::fixture::RegionFixture;
use awsfetcher::mapper;
use awsfetcher::models::{
    Connection, Crawler, DataStream, Database, Job, Session, Table, Vault, VideoStream,
};
use awsfetcher::FixtureService;
use gstorage::config::StorageConfig;
use gstorage::fetch::Page;
use gstorage::graph::GraphStore;
use gstorage::models::{Attributes, EntityType, NodeRef, SyncMarker};
use gstorage::sync::SyncContext;
use gstorage::GStorage;
use serde_json::json;
use tempfile::TempDir;

pub const ACCOUNT_ID: &str = "672373165745";
pub const REGION: &str = "us-east-1";

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
    storage
        .store
        .merge_entity(&mapper::ACCOUNT, ACCOUNT_ID, Attributes::new(), SyncMarker(1))?;
    Ok(TestContext {
        temp_dir,
        config,
        storage,
    })
}

pub fn account() -> NodeRef {
    NodeRef::new(mapper::ACCOUNT.label, ACCOUNT_ID)
}

#[allow(dead_code)]
pub fn context(regions: &[&str], marker: i64) -> SyncContext {
    SyncContext::new(
        account(),
        regions.iter().map(|r| r.to_string()).collect(),
        SyncMarker(marker),
    )
}

/// Nodes the AWS families link to but never create themselves.
#[allow(dead_code)]
pub fn seed_external(store: &dyn GraphStore, label: &'static str, id: &str) -> anyhow::Result<()> {
    store.merge_entity(&EntityType::new("external", label), id, Attributes::new(), SyncMarker(1))?;
    Ok(())
}

#[allow(dead_code)]
pub fn fixture_service() -> FixtureService {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/us_east_1.json");
    FixtureService::from_file(&path).expect("fixture file parses")
}

#[allow(dead_code)]
pub fn ids(store: &dyn GraphStore, label: &str) -> Vec<String> {
    let mut ids: Vec<String> = store
        .entities_by_label(label)
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    ids.sort();
    ids
}

#[allow(dead_code)]
pub fn vault(name: &str) -> Vault {
    serde_json::from_value(json!({
        "VaultName": name,
        "VaultARN": format!("arn:aws:glacier:{REGION}:{ACCOUNT_ID}:vaults/{name}"),
        "NumberOfArchives": 1,
        "SizeInBytes": 1024
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn database(name: &str, location: &str) -> Database {
    serde_json::from_value(json!({"Name": name, "LocationUri": location})).unwrap()
}

#[allow(dead_code)]
pub fn table(database: &str, name: &str) -> Table {
    serde_json::from_value(json!({"Name": name, "DatabaseName": database})).unwrap()
}

/// In-memory provider whose state tests can change between runs. Records every
/// table listing so tests can check how often each database was visited.
#[derive(Default)]
pub struct MockAwsService {
    regions: Mutex<HashMap<String, RegionFixture>>,
    table_calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockAwsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(self, region: &str, fixture: RegionFixture) -> Self {
        self.regions
            .lock()
            .unwrap()
            .insert(region.to_string(), fixture);
        self
    }

    pub fn update(&self, region: &str, change: impl FnOnce(&mut RegionFixture)) {
        let mut regions = self.regions.lock().unwrap();
        change(regions.entry(region.to_string()).or_default());
    }

    pub fn table_calls(&self) -> Vec<String> {
        self.table_calls.lock().unwrap().clone()
    }

    fn read<T>(
        &self,
        region: &str,
        operation: &'static str,
        read: impl FnOnce(&RegionFixture) -> T,
    ) -> Result<T> {
        let regions = self.regions.lock().unwrap();
        let Some(fixture) = regions.get(region) else {
            return Ok(read(&RegionFixture::default()));
        };
        if let Some(message) = fixture.failures.get(operation) {
            return Err(AwsFetcherError::service("mock", operation, message.clone()));
        }
        Ok(read(fixture))
    }
}

#[async_trait]
impl AwsService for MockAwsService {
    async fn list_vaults(&self, region: &str, _token: Option<String>) -> Result<Page<Vault>> {
        self.read(region, "list_vaults", |r| Page::last(r.vaults.clone()))
    }

    async fn get_vault_access_policy(
        &self,
        region: &str,
        vault_name: &str,
    ) -> Result<Option<String>> {
        self.read(region, "get_vault_access_policy", |r| {
            r.vault_policies.get(vault_name).cloned()
        })
    }

    async fn list_data_streams(
        &self,
        region: &str,
        _token: Option<String>,
    ) -> Result<Page<DataStream>> {
        self.read(region, "list_streams", |r| Page::last(r.data_streams.clone()))
    }

    async fn get_stream_resource_policy(
        &self,
        region: &str,
        stream_arn: &str,
    ) -> Result<Option<String>> {
        self.read(region, "get_resource_policy", |r| {
            r.stream_policies.get(stream_arn).cloned()
        })
    }

    async fn list_video_streams(
        &self,
        region: &str,
        _token: Option<String>,
    ) -> Result<Page<VideoStream>> {
        self.read(region, "list_streams", |r| Page::last(r.video_streams.clone()))
    }

    async fn get_databases(&self, region: &str, _token: Option<String>) -> Result<Page<Database>> {
        self.read(region, "get_databases", |r| Page::last(r.databases.clone()))
    }

    async fn get_tables(
        &self,
        region: &str,
        database: &str,
        _token: Option<String>,
    ) -> Result<Page<Table>> {
        self.table_calls.lock().unwrap().push(database.to_string());
        self.read(region, "get_tables", |r| {
            Page::last(r.tables.get(database).cloned().unwrap_or_default())
        })
    }

    async fn get_jobs(&self, region: &str, _token: Option<String>) -> Result<Page<Job>> {
        self.read(region, "get_jobs", |r| Page::last(r.jobs.clone()))
    }

    async fn get_crawlers(&self, region: &str, _token: Option<String>) -> Result<Page<Crawler>> {
        self.read(region, "get_crawlers", |r| Page::last(r.crawlers.clone()))
    }

    async fn get_connections(
        &self,
        region: &str,
        _token: Option<String>,
    ) -> Result<Page<Connection>> {
        self.read(region, "get_connections", |r| Page::last(r.connections.clone()))
    }

    async fn list_sessions(&self, region: &str, _token: Option<String>) -> Result<Page<Session>> {
        self.read(region, "list_sessions", |r| Page::last(r.sessions.clone()))
    }
}
