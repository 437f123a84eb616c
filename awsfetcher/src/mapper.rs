//! Graph shape of the AWS families: one entity descriptor per resource kind and one
//! cleanup job per family.

use gstorage::cleanup::{CleanupJob, CleanupScope, CleanupStatement};
use gstorage::descriptor::{
    field, EntityDescriptor, FamilyDescriptor, IdTemplate, LinkRule, OWNERSHIP_RELATION,
};
use gstorage::models::EntityType;

pub const ACCOUNT: EntityType = EntityType::new("aws", "AWSAccount");

pub const ROLE_LABEL: &str = "AWSRole";
pub const BUCKET_LABEL: &str = "S3Bucket";

pub const ATTACHED_ROLE: &str = "ATTACHED_ROLE";
pub const HAS_ACCESS: &str = "HAS_ACCESS";
pub const CONTAINS: &str = "CONTAINS";

pub const GLACIER_FAMILY: &str = "glacier";
pub const KINESIS_FAMILY: &str = "kinesis";
pub const GLUE_FAMILY: &str = "glue";

pub const VAULT: EntityType = EntityType::new(GLACIER_FAMILY, "S3GlacierVault");
pub const DATA_STREAM: EntityType = EntityType::new(KINESIS_FAMILY, "KinesisDataStream");
pub const VIDEO_STREAM: EntityType = EntityType::new(KINESIS_FAMILY, "KinesisVideoStream");
pub const GLUE_DATABASE: EntityType = EntityType::new(GLUE_FAMILY, "GlueDatabase");
pub const GLUE_TABLE: EntityType = EntityType::new(GLUE_FAMILY, "GlueTable");
pub const GLUE_JOB: EntityType = EntityType::new(GLUE_FAMILY, "GlueJob");
pub const GLUE_CRAWLER: EntityType = EntityType::new(GLUE_FAMILY, "GlueCrawler");
pub const GLUE_CONNECTION: EntityType = EntityType::new(GLUE_FAMILY, "GlueConnection");
pub const GLUE_SESSION: EntityType = EntityType::new(GLUE_FAMILY, "GlueInteractiveSession");

// ---------------------------------------------------------------------------
// Glacier
// ---------------------------------------------------------------------------

static VAULT_ARN: IdTemplate = IdTemplate::Arn {
    service: "glacier",
    resource: "vaults/{}",
    parts: &["VaultName"],
};

pub static VAULT_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: VAULT,
    identifier: IdTemplate::NativeOr {
        field: "VaultARN",
        fallback: &VAULT_ARN,
    },
    fields: &[
        field("VaultName", "vaultname"),
        field("VaultARN", "arn"),
        field("CreationDate", "creationDate"),
        field("LastInventoryDate", "lastInventoryDate"),
        field("NumberOfArchives", "numberOfArchives"),
        field("SizeInBytes", "sizeInBytes"),
        field("AccessPolicy.document", "accessPolicy"),
        field("AccessPolicy.state", "accessPolicyState"),
        field("AccessPolicy.reason", "accessPolicyReason"),
    ],
    links: &[],
    owned: true,
};

pub static GLACIER: FamilyDescriptor = FamilyDescriptor {
    name: GLACIER_FAMILY,
    entities: &[&VAULT_ENTITY],
    cleanup: CleanupJob {
        name: "aws_import_glacier_cleanup",
        statements: &[
            CleanupStatement::StaleEntities {
                label: VAULT.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: OWNERSHIP_RELATION,
                source_label: ACCOUNT.label,
                target_label: VAULT.label,
                scope: CleanupScope::Account,
            },
        ],
    },
};

// ---------------------------------------------------------------------------
// Kinesis
// ---------------------------------------------------------------------------

static DATA_STREAM_ARN: IdTemplate = IdTemplate::Arn {
    service: "kinesis",
    resource: "stream/{}",
    parts: &["StreamName"],
};

// Video stream ARNs carry a creation suffix the name alone cannot reproduce; the
// fallback is only reached by records that lost their ARN.
static VIDEO_STREAM_ARN: IdTemplate = IdTemplate::Arn {
    service: "kinesisvideo",
    resource: "stream/{}",
    parts: &["StreamName"],
};

pub static DATA_STREAM_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: DATA_STREAM,
    identifier: IdTemplate::NativeOr {
        field: "StreamARN",
        fallback: &DATA_STREAM_ARN,
    },
    fields: &[
        field("StreamName", "streamName"),
        field("StreamARN", "arn"),
        field("StreamStatus", "streamStatus"),
        field("StreamModeDetails.StreamMode", "streamMode"),
        field("StreamCreationTimestamp", "streamCreationTimestamp"),
        field("ResourcePolicy.document", "resourcePolicy"),
        field("ResourcePolicy.state", "resourcePolicyState"),
        field("ResourcePolicy.reason", "resourcePolicyReason"),
    ],
    links: &[],
    owned: true,
};

pub static VIDEO_STREAM_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: VIDEO_STREAM,
    identifier: IdTemplate::NativeOr {
        field: "StreamARN",
        fallback: &VIDEO_STREAM_ARN,
    },
    fields: &[
        field("StreamName", "streamName"),
        field("StreamARN", "arn"),
        field("DeviceName", "deviceName"),
        field("MediaType", "mediaType"),
        field("KmsKeyId", "kmsKeyId"),
        field("Version", "version"),
        field("Status", "status"),
        field("CreationTime", "creationTime"),
        field("DataRetentionInHours", "dataRetentionInHours"),
    ],
    links: &[],
    owned: true,
};

pub static KINESIS: FamilyDescriptor = FamilyDescriptor {
    name: KINESIS_FAMILY,
    entities: &[&DATA_STREAM_ENTITY, &VIDEO_STREAM_ENTITY],
    cleanup: CleanupJob {
        name: "aws_import_kinesis_cleanup",
        statements: &[
            CleanupStatement::StaleEntities {
                label: DATA_STREAM.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleEntities {
                label: VIDEO_STREAM.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: OWNERSHIP_RELATION,
                source_label: ACCOUNT.label,
                target_label: DATA_STREAM.label,
                scope: CleanupScope::Account,
            },
            CleanupStatement::StaleRelationships {
                relation: OWNERSHIP_RELATION,
                source_label: ACCOUNT.label,
                target_label: VIDEO_STREAM.label,
                scope: CleanupScope::Account,
            },
        ],
    },
};

// ---------------------------------------------------------------------------
// Glue
// ---------------------------------------------------------------------------

pub static GLUE_DATABASE_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: GLUE_DATABASE,
    identifier: IdTemplate::Arn {
        service: "glue",
        resource: "database/{}",
        parts: &["Name"],
    },
    fields: &[
        field("Name", "databaseName"),
        field("Description", "description"),
        field("LocationUri", "locationUri"),
        field("CreateTime", "createTime"),
        field("CatalogId", "catalog_id"),
        field("CreateTableDefaultPermissions.0.Permissions", "createTableDefaultPermissions"),
        field(
            "CreateTableDefaultPermissions.0.Principal.DataLakePrincipalIdentifier",
            "createTableDefaultPrincipal",
        ),
        field("TargetDatabase.CatalogId", "targetDatabaseCatalogId"),
        field("TargetDatabase.DatabaseName", "targetDatabaseName"),
        field("TargetDatabase.Region", "targetDatabaseRegion"),
        field("FederatedDatabase.Identifier", "federatedDatabaseIdentifier"),
        field("FederatedDatabase.ConnectionName", "federatedDatabaseConnectionName"),
    ],
    links: &[LinkRule::Bucket {
        field: "LocationUri",
        relation: HAS_ACCESS,
        target: BUCKET_LABEL,
    }],
    owned: true,
};

pub static GLUE_TABLE_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: GLUE_TABLE,
    identifier: IdTemplate::Arn {
        service: "glue",
        resource: "table/{}/{}",
        parts: &["DatabaseName", "Name"],
    },
    fields: &[
        field("DatabaseName", "databaseName"),
        field("Name", "tableName"),
        field("Description", "description"),
        field("Owner", "owner"),
        field("CreateTime", "createTime"),
        field("UpdateTime", "updateTime"),
        field("LastAccessTime", "lastAccessTime"),
        field("LastAnalyzedTime", "lastAnalyzedTime"),
        field("Retention", "retention"),
        field("ViewOriginalText", "viewOriginalText"),
        field("ViewExpandedText", "viewExpandedText"),
        field("TableType", "tableType"),
        field("CreatedBy", "createdBy"),
        field("IsRegisteredWithLakeFormation", "isRegisteredWithLakeFormation"),
        field("TargetTable.CatalogId", "targetTableCatalogId"),
        field("TargetTable.DatabaseName", "targetTableDatabaseName"),
        field("TargetTable.Name", "targetTableName"),
        field("TargetTable.Region", "targetTableRegion"),
        field("CatalogId", "catalogId"),
        field("VersionId", "versionId"),
        field("FederatedTable.Identifier", "federatedTableIdentifier"),
        field("FederatedTable.DatabaseIdentifier", "federatedTableDatabaseIdentifier"),
        field("FederatedTable.ConnectionName", "federatedTableConnectionName"),
        field("StorageDescriptor.Location", "location"),
    ],
    links: &[LinkRule::ContainedBy {
        parent: GLUE_DATABASE,
        relation: CONTAINS,
        parent_id: IdTemplate::Arn {
            service: "glue",
            resource: "database/{}",
            parts: &["DatabaseName"],
        },
    }],
    owned: false,
};

pub static GLUE_JOB_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: GLUE_JOB,
    identifier: IdTemplate::Arn {
        service: "glue",
        resource: "job/{}",
        parts: &["Name"],
    },
    fields: &[
        field("Name", "name"),
        field("Role", "role"),
        field("Description", "description"),
        field("LogUri", "logUri"),
        field("CreatedOn", "createdOn"),
        field("LastModifiedOn", "lastModifiedOn"),
        field("ExecutionProperty.MaxConcurrentRuns", "executionPropertyMaxConcurrentRuns"),
        field("Command.Name", "commandName"),
        field("Command.ScriptLocation", "commandScriptLocation"),
        field("Command.PythonVersion", "commandPythonVersion"),
        field("Command.Runtime", "commandRuntime"),
        field("MaxRetries", "maxRetries"),
        field("AllocatedCapacity", "allocatedCapacity"),
        field("Timeout", "timeout"),
        field("MaxCapacity", "maxCapacity"),
        field("WorkerType", "workerType"),
        field("NumberOfWorkers", "numberOfWorkers"),
        field("SecurityConfiguration", "securityConfiguration"),
        field("NotificationProperty.NotifyDelayAfter", "notificationProperty"),
        field("GlueVersion", "glueVersion"),
        field("ExecutionClass", "executionClass"),
        field("SourceControlDetails.Provider", "jobSourceControlProvider"),
        field("SourceControlDetails.Repository", "jobSourceControlRepository"),
        field("SourceControlDetails.Owner", "jobSourceControlOwner"),
        field("SourceControlDetails.Branch", "jobSourceControlBranch"),
        field("SourceControlDetails.Folder", "jobSourceControlFolder"),
        field("SourceControlDetails.LastCommitId", "jobSourceControlLastCommitId"),
        field("SourceControlDetails.AuthStrategy", "jobSourceControlAuthStrategy"),
        field("SourceControlDetails.AuthToken", "jobSourceControlAuthToken"),
    ],
    links: &[
        LinkRule::Role {
            field: "Role",
            relation: ATTACHED_ROLE,
            target: ROLE_LABEL,
        },
        LinkRule::Bucket {
            field: "Command.ScriptLocation",
            relation: HAS_ACCESS,
            target: BUCKET_LABEL,
        },
    ],
    owned: true,
};

pub static GLUE_CRAWLER_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: GLUE_CRAWLER,
    identifier: IdTemplate::Arn {
        service: "glue",
        resource: "crawler/{}",
        parts: &["Name"],
    },
    fields: &[
        field("Role", "role"),
        field("Name", "name"),
        field("DatabaseName", "databaseName"),
        field("Description", "description"),
        field("Classifiers", "classifiers"),
        field("RecrawlPolicy.RecrawlBehavior", "recrawlPolicy"),
        field("SchemaChangePolicy.UpdateBehavior", "schemaChangePolicyUpdateBehaviour"),
        field("SchemaChangePolicy.DeleteBehavior", "schemaChangePolicyDeleteBehaviour"),
        field("LineageConfiguration.CrawlerLineageSettings", "lineageConfiguration"),
        field("State", "state"),
        field("TablePrefix", "tablePrefix"),
        field("Schedule.ScheduleExpression", "scheduleExpression"),
        field("Schedule.State", "scheduleState"),
        field("CrawlElapsedTime", "crawlElapsedTime"),
        field("CreationTime", "creationTime"),
        field("LastUpdated", "lastUpdated"),
        field("LastCrawl.StartTime", "lastCrawlStartTime"),
        field("LastCrawl.Status", "lastCrawlStatus"),
        field("LastCrawl.LogGroup", "lastCrawlLogGroup"),
        field("LastCrawl.LogStream", "lastCrawlLogStream"),
        field("LastCrawl.MessagePrefix", "lastCrawlMessagePrefix"),
        field("LastCrawl.ErrorMessage", "lastCrawlErrorMessage"),
        field("Version", "version"),
        field("Configuration", "configuration"),
        field("CrawlerSecurityConfiguration", "securityConfiguration"),
        field(
            "LakeFormationConfiguration.UseLakeFormationCredentials",
            "lakeFormationConfigurationUseCredentials",
        ),
        field("LakeFormationConfiguration.AccountId", "lakeFormationConfigurationAccountId"),
    ],
    links: &[
        LinkRule::Role {
            field: "Role",
            relation: ATTACHED_ROLE,
            target: ROLE_LABEL,
        },
        LinkRule::References {
            target: GLUE_DATABASE,
            relation: OWNERSHIP_RELATION,
            target_id: IdTemplate::Arn {
                service: "glue",
                resource: "database/{}",
                parts: &["DatabaseName"],
            },
        },
    ],
    owned: true,
};

pub static GLUE_CONNECTION_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: GLUE_CONNECTION,
    identifier: IdTemplate::Arn {
        service: "glue",
        resource: "connection/{}",
        parts: &["Name"],
    },
    fields: &[
        field("Name", "name"),
        field("Description", "description"),
        field("ConnectionType", "type"),
        field("PhysicalConnectionRequirements.SubnetId", "subnetid"),
        field("PhysicalConnectionRequirements.SecurityGroupIdList", "securityGroupIdList"),
        field("PhysicalConnectionRequirements.AvailabilityZone", "availabilityZone"),
        field("CreationTime", "creationTime"),
        field("LastUpdatedTime", "lastUpdatedTime"),
        field("LastUpdatedBy", "lastUpdatedBy"),
    ],
    links: &[],
    owned: true,
};

pub static GLUE_SESSION_ENTITY: EntityDescriptor = EntityDescriptor {
    entity_type: GLUE_SESSION,
    identifier: IdTemplate::Arn {
        service: "glue",
        resource: "session/{}",
        parts: &["Id"],
    },
    fields: &[
        field("Id", "id"),
        field("Command.Name", "name"),
        field("CreatedOn", "createdOn"),
        field("Status", "status"),
        field("ErrorMessage", "errorMessage"),
        field("Description", "description"),
        field("Role", "role"),
        field("Command.PythonVersion", "pythonVersion"),
        field("Connections.Connections", "connections"),
        field("Progress", "progress"),
        field("MaxCapacity", "maxCapacity"),
        field("SecurityConfiguration", "securityConfiguration"),
        field("GlueVersion", "glueVersion"),
        field("NumberOfWorkers", "numberOfWorkers"),
        field("WorkerType", "workerType"),
        field("CompletedOn", "completedOn"),
        field("ExecutionTime", "executionTime"),
        field("DPUSeconds", "dpuSeconds"),
        field("IdleTimeout", "idleTimeout"),
    ],
    links: &[LinkRule::Role {
        field: "Role",
        relation: ATTACHED_ROLE,
        target: ROLE_LABEL,
    }],
    owned: true,
};

pub static GLUE: FamilyDescriptor = FamilyDescriptor {
    name: GLUE_FAMILY,
    entities: &[
        &GLUE_DATABASE_ENTITY,
        &GLUE_TABLE_ENTITY,
        &GLUE_JOB_ENTITY,
        &GLUE_CRAWLER_ENTITY,
        &GLUE_CONNECTION_ENTITY,
        &GLUE_SESSION_ENTITY,
    ],
    cleanup: CleanupJob {
        name: "aws_import_glue_cleanup",
        statements: &[
            // Tables are scoped through their database, so they go first.
            CleanupStatement::StaleEntities {
                label: GLUE_TABLE.label,
                scope: CleanupScope::ContainedBy {
                    parent: GLUE_DATABASE.label,
                    relation: CONTAINS,
                },
            },
            CleanupStatement::StaleRelationships {
                relation: CONTAINS,
                source_label: GLUE_DATABASE.label,
                target_label: GLUE_TABLE.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: OWNERSHIP_RELATION,
                source_label: GLUE_CRAWLER.label,
                target_label: GLUE_DATABASE.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleEntities {
                label: GLUE_DATABASE.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleEntities {
                label: GLUE_JOB.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleEntities {
                label: GLUE_CRAWLER.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleEntities {
                label: GLUE_CONNECTION.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleEntities {
                label: GLUE_SESSION.label,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: HAS_ACCESS,
                source_label: GLUE_DATABASE.label,
                target_label: BUCKET_LABEL,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: HAS_ACCESS,
                source_label: GLUE_JOB.label,
                target_label: BUCKET_LABEL,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: ATTACHED_ROLE,
                source_label: GLUE_JOB.label,
                target_label: ROLE_LABEL,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: ATTACHED_ROLE,
                source_label: GLUE_CRAWLER.label,
                target_label: ROLE_LABEL,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: ATTACHED_ROLE,
                source_label: GLUE_SESSION.label,
                target_label: ROLE_LABEL,
                scope: CleanupScope::Owned,
            },
            CleanupStatement::StaleRelationships {
                relation: OWNERSHIP_RELATION,
                source_label: ACCOUNT.label,
                target_label: GLUE_DATABASE.label,
                scope: CleanupScope::Account,
            },
            CleanupStatement::StaleRelationships {
                relation: OWNERSHIP_RELATION,
                source_label: ACCOUNT.label,
                target_label: GLUE_JOB.label,
                scope: CleanupScope::Account,
            },
            CleanupStatement::StaleRelationships {
                relation: OWNERSHIP_RELATION,
                source_label: ACCOUNT.label,
                target_label: GLUE_CRAWLER.label,
                scope: CleanupScope::Account,
            },
            CleanupStatement::StaleRelationships {
                relation: OWNERSHIP_RELATION,
                source_label: ACCOUNT.label,
                target_label: GLUE_CONNECTION.label,
                scope: CleanupScope::Account,
            },
            CleanupStatement::StaleRelationships {
                relation: OWNERSHIP_RELATION,
                source_label: ACCOUNT.label,
                target_label: GLUE_SESSION.label,
                scope: CleanupScope::Account,
            },
        ],
    },
};

/// Every family this crate knows, in the order a full run visits them.
pub fn families() -> [&'static FamilyDescriptor; 3] {
    [&GLACIER, &KINESIS, &GLUE]
}
