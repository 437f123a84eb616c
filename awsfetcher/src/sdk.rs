//! Live `AwsService` backed by the AWS SDK. Compiled with the `aws` feature.

use async_trait::async_trait;
use aws_config::{Region, SdkConfig};
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::{DateTime, Utc};
use gstorage::fetch::Page;

use crate::client::{require, AwsService};
use crate::error::{AwsFetcherError, Result};
use crate::models::{
    Connection, ConnectionsList, Crawler, DataLakePrincipal, DataStream, Database,
    DatabaseIdentifier, ExecutionProperty, FederatedDatabase, FederatedTable, Job, JobCommand,
    LakeFormationConfiguration, LastCrawl, LineageConfiguration, NotificationProperty,
    PhysicalConnectionRequirements, PrincipalPermissions, RecrawlPolicy, Schedule,
    SchemaChangePolicy, Session, SessionCommand, SourceControlDetails, StorageDescriptor,
    StreamModeDetails, Table, TableIdentifier, Vault, VideoStream,
};

fn sdk_error<E>(service: &'static str, operation: &'static str, err: E) -> AwsFetcherError
where
    E: std::error::Error,
{
    AwsFetcherError::Sdk(format!(
        "{service} {operation}: {}",
        DisplayErrorContext(&err)
    ))
}

fn s(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn ts(value: Option<&aws_smithy_types::DateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
}

fn token(next: Option<&str>) -> Option<String> {
    next.filter(|t| !t.is_empty()).map(str::to_string)
}

pub struct SdkAwsService {
    base: SdkConfig,
}

impl SdkAwsService {
    /// Loads credentials and settings from the standard provider chain.
    pub async fn from_env() -> Self {
        Self {
            base: aws_config::load_from_env().await,
        }
    }

    pub fn new(base: SdkConfig) -> Self {
        Self { base }
    }

    fn regional(&self, region: &str) -> SdkConfig {
        self.base
            .to_builder()
            .region(Region::new(region.to_string()))
            .build()
    }

    fn glacier(&self, region: &str) -> aws_sdk_glacier::Client {
        aws_sdk_glacier::Client::new(&self.regional(region))
    }

    fn kinesis(&self, region: &str) -> aws_sdk_kinesis::Client {
        aws_sdk_kinesis::Client::new(&self.regional(region))
    }

    fn kinesis_video(&self, region: &str) -> aws_sdk_kinesisvideo::Client {
        aws_sdk_kinesisvideo::Client::new(&self.regional(region))
    }

    fn glue(&self, region: &str) -> aws_sdk_glue::Client {
        aws_sdk_glue::Client::new(&self.regional(region))
    }
}

#[async_trait]
impl AwsService for SdkAwsService {
    async fn list_vaults(&self, region: &str, token_in: Option<String>) -> Result<Page<Vault>> {
        let out = self
            .glacier(region)
            .list_vaults()
            .account_id("-")
            .set_marker(token_in)
            .send()
            .await
            .map_err(|e| sdk_error("glacier", "list_vaults", e))?;
        let items = out
            .vault_list()
            .iter()
            .map(|v| {
                let name = require(v.vault_name(), "glacier", "list_vaults", "VaultName")?;
                Ok(Vault {
                    vault_arn: s(v.vault_arn()),
                    vault_name: name.to_string(),
                    creation_date: s(v.creation_date()),
                    last_inventory_date: s(v.last_inventory_date()),
                    number_of_archives: Some(v.number_of_archives()),
                    size_in_bytes: Some(v.size_in_bytes()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            next_token: token(out.marker()),
        })
    }

    async fn get_vault_access_policy(
        &self,
        region: &str,
        vault_name: &str,
    ) -> Result<Option<String>> {
        let result = self
            .glacier(region)
            .get_vault_access_policy()
            .account_id("-")
            .vault_name(vault_name)
            .send()
            .await;
        match result {
            Ok(out) => Ok(out.policy().and_then(|p| p.policy()).map(str::to_string)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(sdk_error("glacier", "get_vault_access_policy", err)),
        }
    }

    async fn list_data_streams(
        &self,
        region: &str,
        token_in: Option<String>,
    ) -> Result<Page<DataStream>> {
        let out = self
            .kinesis(region)
            .list_streams()
            .set_next_token(token_in)
            .send()
            .await
            .map_err(|e| sdk_error("kinesis", "list_streams", e))?;
        let items = out
            .stream_summaries()
            .iter()
            .map(|summary| DataStream {
                stream_name: summary.stream_name().to_string(),
                stream_arn: Some(summary.stream_arn().to_string()),
                stream_status: Some(summary.stream_status().as_str().to_string()),
                stream_mode_details: summary.stream_mode_details().map(|d| StreamModeDetails {
                    stream_mode: d.stream_mode().as_str().to_string(),
                }),
                stream_creation_timestamp: ts(summary.stream_creation_timestamp()),
            })
            .collect();
        let next_token = if out.has_more_streams() {
            token(out.next_token())
        } else {
            None
        };
        Ok(Page { items, next_token })
    }

    async fn get_stream_resource_policy(
        &self,
        region: &str,
        stream_arn: &str,
    ) -> Result<Option<String>> {
        let result = self
            .kinesis(region)
            .get_resource_policy()
            .resource_arn(stream_arn)
            .send()
            .await;
        match result {
            Ok(out) => Ok(Some(out.policy().to_string())),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(sdk_error("kinesis", "get_resource_policy", err)),
        }
    }

    async fn list_video_streams(
        &self,
        region: &str,
        token_in: Option<String>,
    ) -> Result<Page<VideoStream>> {
        let out = self
            .kinesis_video(region)
            .list_streams()
            .set_next_token(token_in)
            .send()
            .await
            .map_err(|e| sdk_error("kinesisvideo", "list_streams", e))?;
        let items = out
            .stream_info_list()
            .iter()
            .map(|info| {
                let name =
                    require(info.stream_name(), "kinesisvideo", "list_streams", "StreamName")?;
                Ok(VideoStream {
                    stream_name: name.to_string(),
                    stream_arn: s(info.stream_arn()),
                    device_name: s(info.device_name()),
                    media_type: s(info.media_type()),
                    kms_key_id: s(info.kms_key_id()),
                    version: s(info.version()),
                    status: info.status().map(|st| st.as_str().to_string()),
                    creation_time: ts(info.creation_time()),
                    data_retention_in_hours: info.data_retention_in_hours().map(i64::from),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            next_token: token(out.next_token()),
        })
    }

    async fn get_databases(
        &self,
        region: &str,
        token_in: Option<String>,
    ) -> Result<Page<Database>> {
        let out = self
            .glue(region)
            .get_databases()
            .set_next_token(token_in)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "get_databases", e))?;
        let items = out
            .database_list()
            .iter()
            .map(|db| Database {
                name: db.name().to_string(),
                description: s(db.description()),
                location_uri: s(db.location_uri()),
                create_time: ts(db.create_time()),
                catalog_id: s(db.catalog_id()),
                create_table_default_permissions: db
                    .create_table_default_permissions()
                    .iter()
                    .map(|p| PrincipalPermissions {
                        principal: p.principal().map(|pr| DataLakePrincipal {
                            data_lake_principal_identifier: s(pr.data_lake_principal_identifier()),
                        }),
                        permissions: p
                            .permissions()
                            .iter()
                            .map(|perm| perm.as_str().to_string())
                            .collect(),
                    })
                    .collect(),
                target_database: db.target_database().map(|t| DatabaseIdentifier {
                    catalog_id: s(t.catalog_id()),
                    database_name: s(t.database_name()),
                    region: s(t.region()),
                }),
                federated_database: db.federated_database().map(|f| FederatedDatabase {
                    identifier: s(f.identifier()),
                    connection_name: s(f.connection_name()),
                }),
            })
            .collect();
        Ok(Page {
            items,
            next_token: token(out.next_token()),
        })
    }

    async fn get_tables(
        &self,
        region: &str,
        database: &str,
        token_in: Option<String>,
    ) -> Result<Page<Table>> {
        let out = self
            .glue(region)
            .get_tables()
            .database_name(database)
            .set_next_token(token_in)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "get_tables", e))?;
        let items = out
            .table_list()
            .iter()
            .map(|t| Table {
                name: t.name().to_string(),
                database_name: t.database_name().unwrap_or(database).to_string(),
                description: s(t.description()),
                owner: s(t.owner()),
                create_time: ts(t.create_time()),
                update_time: ts(t.update_time()),
                last_access_time: ts(t.last_access_time()),
                last_analyzed_time: ts(t.last_analyzed_time()),
                retention: Some(i64::from(t.retention())),
                view_original_text: s(t.view_original_text()),
                view_expanded_text: s(t.view_expanded_text()),
                table_type: s(t.table_type()),
                created_by: s(t.created_by()),
                is_registered_with_lake_formation: Some(t.is_registered_with_lake_formation()),
                target_table: t.target_table().map(|id| TableIdentifier {
                    catalog_id: s(id.catalog_id()),
                    database_name: s(id.database_name()),
                    name: s(id.name()),
                    region: s(id.region()),
                }),
                catalog_id: s(t.catalog_id()),
                version_id: s(t.version_id()),
                federated_table: t.federated_table().map(|f| FederatedTable {
                    identifier: s(f.identifier()),
                    database_identifier: s(f.database_identifier()),
                    connection_name: s(f.connection_name()),
                }),
                storage_descriptor: t.storage_descriptor().map(|sd| StorageDescriptor {
                    location: s(sd.location()),
                    input_format: s(sd.input_format()),
                    output_format: s(sd.output_format()),
                }),
            })
            .collect();
        Ok(Page {
            items,
            next_token: token(out.next_token()),
        })
    }

    async fn get_jobs(&self, region: &str, token_in: Option<String>) -> Result<Page<Job>> {
        let out = self
            .glue(region)
            .get_jobs()
            .set_next_token(token_in)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "get_jobs", e))?;
        let items = out
            .jobs()
            .iter()
            .map(|job| {
                let name = require(job.name(), "glue", "get_jobs", "Name")?;
                Ok(Job {
                    name: name.to_string(),
                    description: s(job.description()),
                    log_uri: s(job.log_uri()),
                    role: s(job.role()),
                    created_on: ts(job.created_on()),
                    last_modified_on: ts(job.last_modified_on()),
                    execution_property: job.execution_property().map(|p| ExecutionProperty {
                        max_concurrent_runs: Some(i64::from(p.max_concurrent_runs())),
                    }),
                    command: job.command().map(|c| JobCommand {
                        name: s(c.name()),
                        script_location: s(c.script_location()),
                        python_version: s(c.python_version()),
                        runtime: s(c.runtime()),
                    }),
                    max_retries: Some(i64::from(job.max_retries())),
                    allocated_capacity: Some(i64::from(job.allocated_capacity())),
                    timeout: job.timeout().map(i64::from),
                    max_capacity: job.max_capacity(),
                    worker_type: job.worker_type().map(|w| w.as_str().to_string()),
                    number_of_workers: job.number_of_workers().map(i64::from),
                    security_configuration: s(job.security_configuration()),
                    notification_property: job.notification_property().map(|n| {
                        NotificationProperty {
                            notify_delay_after: n.notify_delay_after().map(i64::from),
                        }
                    }),
                    glue_version: s(job.glue_version()),
                    execution_class: job.execution_class().map(|c| c.as_str().to_string()),
                    source_control_details: job.source_control_details().map(|d| {
                        SourceControlDetails {
                            provider: d.provider().map(|p| p.as_str().to_string()),
                            repository: s(d.repository()),
                            owner: s(d.owner()),
                            branch: s(d.branch()),
                            folder: s(d.folder()),
                            last_commit_id: s(d.last_commit_id()),
                            auth_strategy: d.auth_strategy().map(|a| a.as_str().to_string()),
                            auth_token: s(d.auth_token()),
                        }
                    }),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            next_token: token(out.next_token()),
        })
    }

    async fn get_crawlers(&self, region: &str, token_in: Option<String>) -> Result<Page<Crawler>> {
        let out = self
            .glue(region)
            .get_crawlers()
            .set_next_token(token_in)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "get_crawlers", e))?;
        let items = out
            .crawlers()
            .iter()
            .map(|c| {
                let name = require(c.name(), "glue", "get_crawlers", "Name")?;
                Ok(Crawler {
                    name: name.to_string(),
                    role: s(c.role()),
                    database_name: s(c.database_name()),
                    description: s(c.description()),
                    classifiers: c.classifiers().to_vec(),
                    recrawl_policy: c.recrawl_policy().map(|p| RecrawlPolicy {
                        recrawl_behavior: p.recrawl_behavior().map(|b| b.as_str().to_string()),
                    }),
                    schema_change_policy: c.schema_change_policy().map(|p| SchemaChangePolicy {
                        update_behavior: p.update_behavior().map(|b| b.as_str().to_string()),
                        delete_behavior: p.delete_behavior().map(|b| b.as_str().to_string()),
                    }),
                    lineage_configuration: c.lineage_configuration().map(|l| {
                        LineageConfiguration {
                            crawler_lineage_settings: l
                                .crawler_lineage_settings()
                                .map(|v| v.as_str().to_string()),
                        }
                    }),
                    state: c.state().map(|st| st.as_str().to_string()),
                    table_prefix: s(c.table_prefix()),
                    schedule: c.schedule().map(|sch| Schedule {
                        schedule_expression: s(sch.schedule_expression()),
                        state: sch.state().map(|st| st.as_str().to_string()),
                    }),
                    crawl_elapsed_time: Some(c.crawl_elapsed_time()),
                    creation_time: ts(c.creation_time()),
                    last_updated: ts(c.last_updated()),
                    last_crawl: c.last_crawl().map(|l| LastCrawl {
                        status: l.status().map(|st| st.as_str().to_string()),
                        error_message: s(l.error_message()),
                        log_group: s(l.log_group()),
                        log_stream: s(l.log_stream()),
                        message_prefix: s(l.message_prefix()),
                        start_time: ts(l.start_time()),
                    }),
                    version: Some(c.version()),
                    configuration: s(c.configuration()),
                    crawler_security_configuration: s(c.crawler_security_configuration()),
                    lake_formation_configuration: c.lake_formation_configuration().map(|l| {
                        LakeFormationConfiguration {
                            use_lake_formation_credentials: l.use_lake_formation_credentials(),
                            account_id: s(l.account_id()),
                        }
                    }),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            next_token: token(out.next_token()),
        })
    }

    async fn get_connections(
        &self,
        region: &str,
        token_in: Option<String>,
    ) -> Result<Page<Connection>> {
        let out = self
            .glue(region)
            .get_connections()
            .set_next_token(token_in)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "get_connections", e))?;
        let items = out
            .connection_list()
            .iter()
            .map(|c| {
                let name = require(c.name(), "glue", "get_connections", "Name")?;
                Ok(Connection {
                    name: name.to_string(),
                    description: s(c.description()),
                    connection_type: c.connection_type().map(|t| t.as_str().to_string()),
                    physical_connection_requirements: c.physical_connection_requirements().map(
                        |p| PhysicalConnectionRequirements {
                            subnet_id: s(p.subnet_id()),
                            security_group_id_list: p.security_group_id_list().to_vec(),
                            availability_zone: s(p.availability_zone()),
                        },
                    ),
                    creation_time: ts(c.creation_time()),
                    last_updated_time: ts(c.last_updated_time()),
                    last_updated_by: s(c.last_updated_by()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            next_token: token(out.next_token()),
        })
    }

    async fn list_sessions(&self, region: &str, token_in: Option<String>) -> Result<Page<Session>> {
        let out = self
            .glue(region)
            .list_sessions()
            .set_next_token(token_in)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "list_sessions", e))?;
        let items = out
            .sessions()
            .iter()
            .map(|session| {
                let id = require(session.id(), "glue", "list_sessions", "Id")?;
                Ok(Session {
                    id: id.to_string(),
                    created_on: ts(session.created_on()),
                    status: session.status().map(|st| st.as_str().to_string()),
                    error_message: s(session.error_message()),
                    description: s(session.description()),
                    role: s(session.role()),
                    command: session.command().map(|c| SessionCommand {
                        name: s(c.name()),
                        python_version: s(c.python_version()),
                    }),
                    connections: session.connections().map(|c| ConnectionsList {
                        connections: c.connections().to_vec(),
                    }),
                    progress: Some(session.progress()),
                    max_capacity: session.max_capacity(),
                    security_configuration: s(session.security_configuration()),
                    glue_version: s(session.glue_version()),
                    number_of_workers: session.number_of_workers().map(i64::from),
                    worker_type: session.worker_type().map(|w| w.as_str().to_string()),
                    completed_on: ts(session.completed_on()),
                    execution_time: Some(session.execution_time()),
                    dpu_seconds: Some(session.dpu_seconds()),
                    idle_timeout: session.idle_timeout().map(i64::from),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            next_token: token(out.next_token()),
        })
    }
}
