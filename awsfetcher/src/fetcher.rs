use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use gstorage::descriptor::{EntityDescriptor, FamilyDescriptor};
use gstorage::errors::Result as StorageResult;
use gstorage::fetch::{collect_pages, Adjunct, ResourceEnumerator, ResourceRecord};
use serde::Serialize;

use crate::client::AwsService;
use crate::error::{AwsFetcherError, Result};
use crate::mapper;
use crate::models::{
    DataStreamRecord, Table, VaultRecord, NO_STREAM_POLICY, NO_VAULT_POLICY, POLICY_NOT_LOOKED_UP,
};
use crate::params::FamilySelection;

fn adjunct(document: Option<String>, absent_reason: &str) -> Adjunct<String> {
    match document {
        Some(document) => Adjunct::present(document),
        None => Adjunct::absent(absent_reason),
    }
}

fn records<T: Serialize>(
    entity: &'static EntityDescriptor,
    items: &[T],
) -> StorageResult<Vec<ResourceRecord>> {
    items
        .iter()
        .map(|item| ResourceRecord::from_typed(entity, item))
        .collect()
}

/// Glacier vaults, each with its access policy.
pub struct GlacierEnumerator {
    service: Arc<dyn AwsService>,
    lookup_concurrency: usize,
}

impl GlacierEnumerator {
    pub fn new(service: Arc<dyn AwsService>, lookup_concurrency: usize) -> Self {
        Self {
            service,
            lookup_concurrency: lookup_concurrency.max(1),
        }
    }

    async fn vaults(&self, region: &str) -> Result<Vec<VaultRecord>> {
        let vaults = collect_pages(|token| self.service.list_vaults(region, token)).await?;
        log::debug!("Listed {} vault(s) in {}", vaults.len(), region);

        stream::iter(vaults)
            .map(|vault| async move {
                let policy = self
                    .service
                    .get_vault_access_policy(region, &vault.vault_name)
                    .await?;
                Ok::<_, AwsFetcherError>(VaultRecord {
                    access_policy: adjunct(policy, NO_VAULT_POLICY),
                    vault,
                })
            })
            .buffered(self.lookup_concurrency)
            .try_collect()
            .await
    }
}

#[async_trait]
impl ResourceEnumerator for GlacierEnumerator {
    fn family(&self) -> &'static FamilyDescriptor {
        &mapper::GLACIER
    }

    async fn enumerate(&self, region: &str) -> StorageResult<Vec<ResourceRecord>> {
        let vaults = self.vaults(region).await?;
        records(&mapper::VAULT_ENTITY, &vaults)
    }
}

/// Kinesis data streams (with their resource policy) followed by video streams.
pub struct KinesisEnumerator {
    service: Arc<dyn AwsService>,
    lookup_concurrency: usize,
}

impl KinesisEnumerator {
    pub fn new(service: Arc<dyn AwsService>, lookup_concurrency: usize) -> Self {
        Self {
            service,
            lookup_concurrency: lookup_concurrency.max(1),
        }
    }

    async fn data_streams(&self, region: &str) -> Result<Vec<DataStreamRecord>> {
        let streams = collect_pages(|token| self.service.list_data_streams(region, token)).await?;
        log::debug!("Listed {} data stream(s) in {}", streams.len(), region);

        stream::iter(streams)
            .map(|stream| async move {
                // Policies are keyed by ARN; without one the lookup is never made.
                let resource_policy = match stream.stream_arn.as_deref() {
                    Some(arn) => adjunct(
                        self.service.get_stream_resource_policy(region, arn).await?,
                        NO_STREAM_POLICY,
                    ),
                    None => Adjunct::absent(POLICY_NOT_LOOKED_UP),
                };
                Ok::<_, AwsFetcherError>(DataStreamRecord {
                    resource_policy,
                    stream,
                })
            })
            .buffered(self.lookup_concurrency)
            .try_collect()
            .await
    }
}

#[async_trait]
impl ResourceEnumerator for KinesisEnumerator {
    fn family(&self) -> &'static FamilyDescriptor {
        &mapper::KINESIS
    }

    async fn enumerate(&self, region: &str) -> StorageResult<Vec<ResourceRecord>> {
        let data_streams = self.data_streams(region).await?;
        let video_streams =
            collect_pages(|token| self.service.list_video_streams(region, token)).await?;
        log::debug!("Listed {} video stream(s) in {}", video_streams.len(), region);

        let mut out = records(&mapper::DATA_STREAM_ENTITY, &data_streams)?;
        out.extend(records(&mapper::VIDEO_STREAM_ENTITY, &video_streams)?);
        Ok(out)
    }
}

/// Glue catalog and ETL resources. Databases come first so that tables and crawlers
/// can link to them within the same scan.
pub struct GlueEnumerator {
    service: Arc<dyn AwsService>,
    lookup_concurrency: usize,
}

impl GlueEnumerator {
    pub fn new(service: Arc<dyn AwsService>, lookup_concurrency: usize) -> Self {
        Self {
            service,
            lookup_concurrency: lookup_concurrency.max(1),
        }
    }

    /// Tables of each database, listed once per database and kept in database order.
    async fn tables(&self, region: &str, databases: &[String]) -> Result<Vec<Table>> {
        let per_database: Vec<Vec<Table>> = stream::iter(databases.to_vec())
            .map(|database: String| async move {
                let database = database.as_str();
                let tables =
                    collect_pages(|token| self.service.get_tables(region, database, token))
                        .await?;
                log::debug!("Listed {} table(s) of {} in {}", tables.len(), database, region);
                Ok::<_, AwsFetcherError>(tables)
            })
            .buffered(self.lookup_concurrency)
            .try_collect()
            .await?;
        Ok(per_database.into_iter().flatten().collect())
    }
}

#[async_trait]
impl ResourceEnumerator for GlueEnumerator {
    fn family(&self) -> &'static FamilyDescriptor {
        &mapper::GLUE
    }

    async fn enumerate(&self, region: &str) -> StorageResult<Vec<ResourceRecord>> {
        let service = self.service.as_ref();
        let databases = collect_pages(|token| service.get_databases(region, token)).await?;
        let names: Vec<String> = databases.iter().map(|db| db.name.clone()).collect();
        let tables = self.tables(region, &names).await?;
        let jobs = collect_pages(|token| service.get_jobs(region, token)).await?;
        let crawlers = collect_pages(|token| service.get_crawlers(region, token)).await?;
        let connections = collect_pages(|token| service.get_connections(region, token)).await?;
        let sessions = collect_pages(|token| service.list_sessions(region, token)).await?;
        log::debug!(
            "Listed glue in {}: {} database(s), {} table(s), {} job(s), {} crawler(s), {} connection(s), {} session(s)",
            region,
            databases.len(),
            tables.len(),
            jobs.len(),
            crawlers.len(),
            connections.len(),
            sessions.len()
        );

        let mut out = records(&mapper::GLUE_DATABASE_ENTITY, &databases)?;
        out.extend(records(&mapper::GLUE_TABLE_ENTITY, &tables)?);
        out.extend(records(&mapper::GLUE_JOB_ENTITY, &jobs)?);
        out.extend(records(&mapper::GLUE_CRAWLER_ENTITY, &crawlers)?);
        out.extend(records(&mapper::GLUE_CONNECTION_ENTITY, &connections)?);
        out.extend(records(&mapper::GLUE_SESSION_ENTITY, &sessions)?);
        Ok(out)
    }
}

/// Enumerators for the selected families, in run order.
pub fn enumerators(
    service: Arc<dyn AwsService>,
    lookup_concurrency: usize,
    selection: &FamilySelection,
) -> Vec<Arc<dyn ResourceEnumerator>> {
    let all: [Arc<dyn ResourceEnumerator>; 3] = [
        Arc::new(GlacierEnumerator::new(Arc::clone(&service), lookup_concurrency)),
        Arc::new(KinesisEnumerator::new(Arc::clone(&service), lookup_concurrency)),
        Arc::new(GlueEnumerator::new(service, lookup_concurrency)),
    ];
    all.into_iter()
        .filter(|e| selection.includes(e.family().name))
        .collect()
}
