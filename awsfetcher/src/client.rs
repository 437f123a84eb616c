use async_trait::async_trait;
use gstorage::fetch::Page;

use crate::error::{AwsFetcherError, Result};
use crate::models::{
    Connection, Crawler, DataStream, Database, Job, Session, Table, Vault, VideoStream,
};

/// Provider calls the enumerators depend on. Listing calls take the continuation
/// token returned by the previous page (`None` for the first page).
///
/// Policy lookups return `Ok(None)` when the provider reports that no policy exists;
/// any other failure is an error.
#[async_trait]
pub trait AwsService: Send + Sync {
    async fn list_vaults(&self, region: &str, token: Option<String>) -> Result<Page<Vault>>;

    async fn get_vault_access_policy(&self, region: &str, vault_name: &str)
        -> Result<Option<String>>;

    async fn list_data_streams(
        &self,
        region: &str,
        token: Option<String>,
    ) -> Result<Page<DataStream>>;

    async fn get_stream_resource_policy(
        &self,
        region: &str,
        stream_arn: &str,
    ) -> Result<Option<String>>;

    async fn list_video_streams(
        &self,
        region: &str,
        token: Option<String>,
    ) -> Result<Page<VideoStream>>;

    async fn get_databases(&self, region: &str, token: Option<String>) -> Result<Page<Database>>;

    async fn get_tables(
        &self,
        region: &str,
        database: &str,
        token: Option<String>,
    ) -> Result<Page<Table>>;

    async fn get_jobs(&self, region: &str, token: Option<String>) -> Result<Page<Job>>;

    async fn get_crawlers(&self, region: &str, token: Option<String>) -> Result<Page<Crawler>>;

    async fn get_connections(
        &self,
        region: &str,
        token: Option<String>,
    ) -> Result<Page<Connection>>;

    async fn list_sessions(&self, region: &str, token: Option<String>) -> Result<Page<Session>>;
}

/// Identifying field of a listed record. A record without one fails the whole
/// listing: dropping it would let the scan pass for complete and the record's node
/// be removed as stale.
pub fn require<'a>(
    value: Option<&'a str>,
    service: &'static str,
    operation: &'static str,
    field: &str,
) -> Result<&'a str> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| {
        AwsFetcherError::service(
            service,
            operation,
            format!("listing returned a record without {field}"),
        )
    })
}
