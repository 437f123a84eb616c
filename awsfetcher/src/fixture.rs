//! Replays recorded provider responses from a JSON document.
//!
//! ```json
//! {
//!   "page_size": 2,
//!   "regions": {
//!     "us-east-1": {
//!       "vaults": [{"VaultName": "vault-1", "VaultARN": "arn:aws:glacier:..."}],
//!       "vault_policies": {"vault-1": "{\"Version\":\"2012-10-17\"}"},
//!       "tables": {"customer_database": [{"Name": "customer_csv", "DatabaseName": "customer_database"}]},
//!       "failures": {"get_jobs": "ThrottlingException: Rate exceeded"}
//!     }
//!   }
//! }
//! ```
//!
//! Regions absent from the document are empty. Listings are served in pages of
//! `page_size` items, so replays exercise the same pagination path as live calls.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use gstorage::fetch::Page;
use serde::Deserialize;

use crate::client::AwsService;
use crate::error::{AwsFetcherError, Result};
use crate::models::{
    Connection, Crawler, DataStream, Database, Job, Session, Table, Vault, VideoStream,
};

fn default_page_size() -> usize {
    50
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegionFixture {
    pub vaults: Vec<Vault>,
    /// Vault name to policy document. Vaults not listed have no policy.
    pub vault_policies: HashMap<String, String>,
    pub data_streams: Vec<DataStream>,
    /// Stream ARN to policy document.
    pub stream_policies: HashMap<String, String>,
    pub video_streams: Vec<VideoStream>,
    pub databases: Vec<Database>,
    /// Database name to its tables.
    pub tables: HashMap<String, Vec<Table>>,
    pub jobs: Vec<Job>,
    pub crawlers: Vec<Crawler>,
    pub connections: Vec<Connection>,
    pub sessions: Vec<Session>,
    /// Operation name to the message it fails with in this region.
    pub failures: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub regions: HashMap<String, RegionFixture>,
}

pub struct FixtureService {
    fixture: Fixture,
}

impl FixtureService {
    pub fn new(fixture: Fixture) -> Result<Self> {
        if fixture.page_size == 0 {
            return Err(AwsFetcherError::InvalidParam(
                "fixture page_size must be at least 1".into(),
            ));
        }
        Ok(Self { fixture })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Self::new(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.fixture.regions.keys().map(String::as_str)
    }

    fn region(&self, region: &str) -> Option<&RegionFixture> {
        self.fixture.regions.get(region)
    }

    fn check(&self, region: &str, service: &'static str, operation: &'static str) -> Result<()> {
        match self.region(region).and_then(|r| r.failures.get(operation)) {
            Some(message) => Err(AwsFetcherError::service(service, operation, message.clone())),
            None => Ok(()),
        }
    }

    fn page<T: Clone>(&self, items: &[T], token: Option<String>) -> Result<Page<T>> {
        let start = match token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                AwsFetcherError::InvalidParam(format!("unknown continuation token '{token}'"))
            })?,
            None => 0,
        };
        let end = start.saturating_add(self.fixture.page_size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default();
        Ok(Page {
            items: slice.to_vec(),
            next_token: (end < items.len()).then(|| end.to_string()),
        })
    }
}

#[async_trait]
impl AwsService for FixtureService {
    async fn list_vaults(&self, region: &str, token: Option<String>) -> Result<Page<Vault>> {
        self.check(region, "glacier", "list_vaults")?;
        let items = self.region(region).map(|r| r.vaults.as_slice()).unwrap_or_default();
        self.page(items, token)
    }

    async fn get_vault_access_policy(
        &self,
        region: &str,
        vault_name: &str,
    ) -> Result<Option<String>> {
        self.check(region, "glacier", "get_vault_access_policy")?;
        Ok(self
            .region(region)
            .and_then(|r| r.vault_policies.get(vault_name))
            .cloned())
    }

    async fn list_data_streams(
        &self,
        region: &str,
        token: Option<String>,
    ) -> Result<Page<DataStream>> {
        self.check(region, "kinesis", "list_streams")?;
        let items = self
            .region(region)
            .map(|r| r.data_streams.as_slice())
            .unwrap_or_default();
        self.page(items, token)
    }

    async fn get_stream_resource_policy(
        &self,
        region: &str,
        stream_arn: &str,
    ) -> Result<Option<String>> {
        self.check(region, "kinesis", "get_resource_policy")?;
        Ok(self
            .region(region)
            .and_then(|r| r.stream_policies.get(stream_arn))
            .cloned())
    }

    async fn list_video_streams(
        &self,
        region: &str,
        token: Option<String>,
    ) -> Result<Page<VideoStream>> {
        self.check(region, "kinesisvideo", "list_streams")?;
        let items = self
            .region(region)
            .map(|r| r.video_streams.as_slice())
            .unwrap_or_default();
        self.page(items, token)
    }

    async fn get_databases(&self, region: &str, token: Option<String>) -> Result<Page<Database>> {
        self.check(region, "glue", "get_databases")?;
        let items = self
            .region(region)
            .map(|r| r.databases.as_slice())
            .unwrap_or_default();
        self.page(items, token)
    }

    async fn get_tables(
        &self,
        region: &str,
        database: &str,
        token: Option<String>,
    ) -> Result<Page<Table>> {
        self.check(region, "glue", "get_tables")?;
        let items = self
            .region(region)
            .and_then(|r| r.tables.get(database))
            .map(Vec::as_slice)
            .unwrap_or_default();
        self.page(items, token)
    }

    async fn get_jobs(&self, region: &str, token: Option<String>) -> Result<Page<Job>> {
        self.check(region, "glue", "get_jobs")?;
        let items = self.region(region).map(|r| r.jobs.as_slice()).unwrap_or_default();
        self.page(items, token)
    }

    async fn get_crawlers(&self, region: &str, token: Option<String>) -> Result<Page<Crawler>> {
        self.check(region, "glue", "get_crawlers")?;
        let items = self
            .region(region)
            .map(|r| r.crawlers.as_slice())
            .unwrap_or_default();
        self.page(items, token)
    }

    async fn get_connections(
        &self,
        region: &str,
        token: Option<String>,
    ) -> Result<Page<Connection>> {
        self.check(region, "glue", "get_connections")?;
        let items = self
            .region(region)
            .map(|r| r.connections.as_slice())
            .unwrap_or_default();
        self.page(items, token)
    }

    async fn list_sessions(&self, region: &str, token: Option<String>) -> Result<Page<Session>> {
        self.check(region, "glue", "list_sessions")?;
        let items = self
            .region(region)
            .map(|r| r.sessions.as_slice())
            .unwrap_or_default();
        self.page(items, token)
    }
}
