//! Typed provider records.
//!
//! Field names follow the provider's wire names so that fixtures, SDK conversions
//! and the descriptor paths in `mapper` all speak the same vocabulary. Required
//! fields are plain values: a record missing them fails validation at the boundary.

use chrono::{DateTime, Utc};
use gstorage::fetch::Adjunct;
use serde::{Deserialize, Serialize};

/// Reason recorded when a vault has no access policy.
pub const NO_VAULT_POLICY: &str = "No vault access policy to display";
/// Reason recorded when a data stream has no resource policy.
pub const NO_STREAM_POLICY: &str = "No resource policy to display";
/// Reason recorded when a data stream carries no ARN to look its policy up by.
pub const POLICY_NOT_LOOKED_UP: &str = "policy not looked up: stream has no ARN";

// ---------------------------------------------------------------------------
// Glacier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vault {
    #[serde(rename = "VaultARN")]
    pub vault_arn: Option<String>,
    pub vault_name: String,
    pub creation_date: Option<String>,
    pub last_inventory_date: Option<String>,
    pub number_of_archives: Option<i64>,
    pub size_in_bytes: Option<i64>,
}

/// A vault plus the outcome of its access-policy lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VaultRecord {
    #[serde(flatten)]
    pub vault: Vault,
    pub access_policy: Adjunct<String>,
}

// ---------------------------------------------------------------------------
// Kinesis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamModeDetails {
    pub stream_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataStream {
    pub stream_name: String,
    #[serde(rename = "StreamARN")]
    pub stream_arn: Option<String>,
    pub stream_status: Option<String>,
    pub stream_mode_details: Option<StreamModeDetails>,
    pub stream_creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataStreamRecord {
    #[serde(flatten)]
    pub stream: DataStream,
    pub resource_policy: Adjunct<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VideoStream {
    pub stream_name: String,
    #[serde(rename = "StreamARN")]
    pub stream_arn: Option<String>,
    pub device_name: Option<String>,
    pub media_type: Option<String>,
    pub kms_key_id: Option<String>,
    pub version: Option<String>,
    pub status: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub data_retention_in_hours: Option<i64>,
}

// ---------------------------------------------------------------------------
// Glue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataLakePrincipal {
    pub data_lake_principal_identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrincipalPermissions {
    pub principal: Option<DataLakePrincipal>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseIdentifier {
    pub catalog_id: Option<String>,
    pub database_name: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FederatedDatabase {
    pub identifier: Option<String>,
    pub connection_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Database {
    pub name: String,
    pub description: Option<String>,
    pub location_uri: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub catalog_id: Option<String>,
    #[serde(default)]
    pub create_table_default_permissions: Vec<PrincipalPermissions>,
    pub target_database: Option<DatabaseIdentifier>,
    pub federated_database: Option<FederatedDatabase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableIdentifier {
    pub catalog_id: Option<String>,
    pub database_name: Option<String>,
    pub name: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FederatedTable {
    pub identifier: Option<String>,
    pub database_identifier: Option<String>,
    pub connection_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageDescriptor {
    pub location: Option<String>,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Table {
    pub name: String,
    pub database_name: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub last_access_time: Option<DateTime<Utc>>,
    pub last_analyzed_time: Option<DateTime<Utc>>,
    pub retention: Option<i64>,
    pub view_original_text: Option<String>,
    pub view_expanded_text: Option<String>,
    pub table_type: Option<String>,
    pub created_by: Option<String>,
    pub is_registered_with_lake_formation: Option<bool>,
    pub target_table: Option<TableIdentifier>,
    pub catalog_id: Option<String>,
    pub version_id: Option<String>,
    pub federated_table: Option<FederatedTable>,
    pub storage_descriptor: Option<StorageDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobCommand {
    pub name: Option<String>,
    pub script_location: Option<String>,
    pub python_version: Option<String>,
    pub runtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionProperty {
    pub max_concurrent_runs: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationProperty {
    pub notify_delay_after: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceControlDetails {
    pub provider: Option<String>,
    pub repository: Option<String>,
    pub owner: Option<String>,
    pub branch: Option<String>,
    pub folder: Option<String>,
    pub last_commit_id: Option<String>,
    pub auth_strategy: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Job {
    pub name: String,
    pub description: Option<String>,
    pub log_uri: Option<String>,
    pub role: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub last_modified_on: Option<DateTime<Utc>>,
    pub execution_property: Option<ExecutionProperty>,
    pub command: Option<JobCommand>,
    pub max_retries: Option<i64>,
    pub allocated_capacity: Option<i64>,
    pub timeout: Option<i64>,
    pub max_capacity: Option<f64>,
    pub worker_type: Option<String>,
    pub number_of_workers: Option<i64>,
    pub security_configuration: Option<String>,
    pub notification_property: Option<NotificationProperty>,
    pub glue_version: Option<String>,
    pub execution_class: Option<String>,
    pub source_control_details: Option<SourceControlDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecrawlPolicy {
    pub recrawl_behavior: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaChangePolicy {
    pub update_behavior: Option<String>,
    pub delete_behavior: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineageConfiguration {
    pub crawler_lineage_settings: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Schedule {
    pub schedule_expression: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LastCrawl {
    pub status: Option<String>,
    pub error_message: Option<String>,
    pub log_group: Option<String>,
    pub log_stream: Option<String>,
    pub message_prefix: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LakeFormationConfiguration {
    pub use_lake_formation_credentials: Option<bool>,
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Crawler {
    pub name: String,
    /// Role name or ARN, as the provider reports it.
    pub role: Option<String>,
    pub database_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub classifiers: Vec<String>,
    pub recrawl_policy: Option<RecrawlPolicy>,
    pub schema_change_policy: Option<SchemaChangePolicy>,
    pub lineage_configuration: Option<LineageConfiguration>,
    pub state: Option<String>,
    pub table_prefix: Option<String>,
    pub schedule: Option<Schedule>,
    pub crawl_elapsed_time: Option<i64>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_crawl: Option<LastCrawl>,
    pub version: Option<i64>,
    pub configuration: Option<String>,
    pub crawler_security_configuration: Option<String>,
    pub lake_formation_configuration: Option<LakeFormationConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhysicalConnectionRequirements {
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub security_group_id_list: Vec<String>,
    pub availability_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Connection {
    pub name: String,
    pub description: Option<String>,
    pub connection_type: Option<String>,
    pub physical_connection_requirements: Option<PhysicalConnectionRequirements>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_updated_time: Option<DateTime<Utc>>,
    pub last_updated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionCommand {
    pub name: Option<String>,
    pub python_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionsList {
    #[serde(default)]
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Session {
    pub id: String,
    pub created_on: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub error_message: Option<String>,
    pub description: Option<String>,
    pub role: Option<String>,
    pub command: Option<SessionCommand>,
    pub connections: Option<ConnectionsList>,
    pub progress: Option<f64>,
    pub max_capacity: Option<f64>,
    pub security_configuration: Option<String>,
    pub glue_version: Option<String>,
    pub number_of_workers: Option<i64>,
    pub worker_type: Option<String>,
    pub completed_on: Option<DateTime<Utc>>,
    pub execution_time: Option<f64>,
    #[serde(rename = "DPUSeconds")]
    pub dpu_seconds: Option<f64>,
    pub idle_timeout: Option<i64>,
}
