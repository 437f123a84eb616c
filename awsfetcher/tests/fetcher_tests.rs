mod common;

use std::sync::Arc;

use awsfetcher::client::AwsService;
use awsfetcher::fixture::RegionFixture;
use awsfetcher::mapper::{self, ATTACHED_ROLE, BUCKET_LABEL, CONTAINS, HAS_ACCESS, ROLE_LABEL};
use awsfetcher::models::{NO_STREAM_POLICY, NO_VAULT_POLICY, POLICY_NOT_LOOKED_UP, VideoStream};
use awsfetcher::{
    default_overrides, enumerators, FamilySelection, GlacierEnumerator, GlueEnumerator,
    KinesisEnumerator,
};
use common::{
    account, context, database, fixture_service, ids, init_test_context, seed_external, table,
    vault, MockAwsService, ACCOUNT_ID, REGION,
};
use gstorage::descriptor::OWNERSHIP_RELATION;
use gstorage::graph::GraphStore;
use gstorage::models::{FamilyOutcome, NodeRef, SyncMarker};
use gstorage::sync::{DataSynchronizer, SyncContext};

fn glue_arn(resource: &str) -> String {
    format!("arn:aws:glue:{REGION}:{ACCOUNT_ID}:{resource}")
}

fn role_arn(name: &str) -> String {
    format!("arn:aws:iam::{ACCOUNT_ID}:role/{name}")
}

fn full_run(marker: i64) -> SyncContext {
    context(&[REGION], marker).with_overrides(default_overrides())
}

#[tokio::test]
async fn fixture_replay_populates_every_family() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let store = ctx.storage.store.as_ref();
    let service: Arc<dyn AwsService> = Arc::new(fixture_service());
    let families = enumerators(service, 4, &FamilySelection::All);

    let report = ctx
        .storage
        .synchronizer
        .sync_all(&families, &full_run(123456789))
        .await?;

    for name in ["glacier", "kinesis", "glue"] {
        let family = report.family(name).expect("family reported");
        assert!(family.reconciled(), "{name}: {:?}", family.outcome);
        assert!(family.regions.iter().all(|r| r.is_complete()));
    }

    assert_eq!(
        ids(store, "S3GlacierVault"),
        vec![
            "arn:aws:glacier:us-east-1:672373165745:vaults/vault-1",
            "arn:aws:glacier:us-east-1:672373165745:vaults/vault-2",
            "arn:aws:glacier:us-east-1:672373165745:vaults/vault-3",
        ]
    );
    let vault_1 = store
        .entity("S3GlacierVault", "arn:aws:glacier:us-east-1:672373165745:vaults/vault-1")?
        .expect("vault-1");
    assert_eq!(vault_1.str_property("vaultname"), Some("vault-1"));
    assert_eq!(vault_1.str_property("accessPolicyState"), Some("present"));
    assert!(vault_1.str_property("accessPolicy").unwrap().contains("vaults/vault-1"));
    assert_eq!(vault_1.lastupdated, SyncMarker(123456789));

    let vault_3 = store
        .entity("S3GlacierVault", "arn:aws:glacier:us-east-1:672373165745:vaults/vault-3")?
        .expect("vault-3");
    assert_eq!(vault_3.str_property("accessPolicyState"), Some("absent"));
    assert_eq!(vault_3.str_property("accessPolicyReason"), Some(NO_VAULT_POLICY));
    assert_eq!(vault_3.str_property("accessPolicy"), None);

    // The provider's ARN wins over one rendered from the stream name.
    let first_stream = store
        .entity(
            "KinesisDataStream",
            "arn:aws:kinesis:us-east-1:672373165745:stream/test-data-stream-1",
        )?
        .expect("native ARN used as identifier");
    assert_eq!(first_stream.str_property("streamName"), Some("test-data-stream"));
    assert_eq!(first_stream.str_property("streamMode"), Some("PROVISIONED"));
    let third_stream = store
        .entity(
            "KinesisDataStream",
            "arn:aws:kinesis:us-east-1:672373165745:stream/test-data-stream-3",
        )?
        .expect("stream 3");
    assert_eq!(third_stream.str_property("resourcePolicyState"), Some("absent"));
    assert_eq!(third_stream.str_property("resourcePolicyReason"), Some(NO_STREAM_POLICY));
    assert_eq!(ids(store, "KinesisVideoStream").len(), 3);

    assert_eq!(ids(store, "GlueDatabase").len(), 3);
    assert_eq!(ids(store, "GlueTable"), vec![glue_arn("table/customer_database/customer_csv")]);
    assert_eq!(ids(store, "GlueJob"), vec![glue_arn("job/data-processing-job")]);
    assert_eq!(ids(store, "GlueCrawler"), vec![glue_arn("crawler/crawler_sales_data")]);
    assert_eq!(ids(store, "GlueConnection").len(), 2);
    assert_eq!(ids(store, "GlueInteractiveSession").len(), 2);

    let contains = store.relationships(Some(CONTAINS))?;
    assert_eq!(contains.len(), 1);
    assert_eq!(
        contains[0].source,
        NodeRef::new("GlueDatabase", glue_arn("database/customer_database"))
    );
    assert_eq!(
        contains[0].target,
        NodeRef::new("GlueTable", glue_arn("table/customer_database/customer_csv"))
    );

    // Tables hang off their database, everything else off the account.
    let owned: Vec<_> = store
        .relationships(Some(OWNERSHIP_RELATION))?
        .into_iter()
        .filter(|rel| rel.source == account())
        .collect();
    assert_eq!(owned.len(), 3 + 6 + 3 + 1 + 1 + 2 + 2);
    assert!(owned.iter().all(|rel| rel.target.label != "GlueTable"));
    Ok(())
}

#[tokio::test]
async fn unresolved_references_are_reported_not_created() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let store = ctx.storage.store.as_ref();
    let service: Arc<dyn AwsService> = Arc::new(fixture_service());

    let report = ctx
        .storage
        .synchronizer
        .sync_family(&GlueEnumerator::new(service, 2), &full_run(5))
        .await?;

    assert!(report.reconciled());
    let missing: Vec<NodeRef> = report.regions[0]
        .links_missing
        .iter()
        .map(|link| link.missing.clone())
        .collect();
    assert!(missing.contains(&NodeRef::new(ROLE_LABEL, role_arn("default-glue-user"))));
    // Crawlers name their role; the link target is still the role ARN.
    assert!(missing.contains(&NodeRef::new(ROLE_LABEL, role_arn("sales-glue-user"))));
    assert!(missing.contains(&NodeRef::new(BUCKET_LABEL, "aws-bucket-no-1")));
    assert!(missing.contains(&NodeRef::new("GlueDatabase", glue_arn("database/sales_database"))));

    assert!(store.entities_by_label(ROLE_LABEL)?.is_empty());
    assert!(store.entities_by_label(BUCKET_LABEL)?.is_empty());
    assert!(store.relationships(Some(ATTACHED_ROLE))?.is_empty());
    assert!(store.relationships(Some(HAS_ACCESS))?.is_empty());
    Ok(())
}

#[tokio::test]
async fn existing_buckets_and_roles_are_linked() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let store = ctx.storage.store.as_ref();
    seed_external(store, BUCKET_LABEL, "aws-bucket-no-1")?;
    seed_external(store, ROLE_LABEL, &role_arn("default-glue-user"))?;
    seed_external(store, ROLE_LABEL, &role_arn("sales-glue-user"))?;
    let service: Arc<dyn AwsService> = Arc::new(fixture_service());

    ctx.storage
        .synchronizer
        .sync_family(&GlueEnumerator::new(service, 2), &full_run(5))
        .await?;

    let mut access: Vec<String> = store
        .relationships(Some(HAS_ACCESS))?
        .into_iter()
        .map(|rel| {
            assert_eq!(rel.target, NodeRef::new(BUCKET_LABEL, "aws-bucket-no-1"));
            rel.source.label
        })
        .collect();
    access.sort();
    assert_eq!(access, vec!["GlueDatabase", "GlueJob"]);

    let mut roles: Vec<(String, String)> = store
        .relationships(Some(ATTACHED_ROLE))?
        .into_iter()
        .map(|rel| (rel.source.label, rel.target.id))
        .collect();
    roles.sort();
    assert_eq!(
        roles,
        vec![
            ("GlueCrawler".to_string(), role_arn("sales-glue-user")),
            ("GlueJob".to_string(), role_arn("default-glue-user")),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn removed_vault_is_deleted_on_next_run() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let store = ctx.storage.store.as_ref();
    let service = Arc::new(MockAwsService::new().with_region(
        REGION,
        RegionFixture {
            vaults: vec![vault("vault-1"), vault("vault-2"), vault("vault-3")],
            ..Default::default()
        },
    ));
    let glacier = GlacierEnumerator::new(service.clone(), 2);

    let first = ctx
        .storage
        .synchronizer
        .sync_family(&glacier, &context(&[REGION], 123456789))
        .await?;
    assert_eq!(first.outcome, FamilyOutcome::Reconciled { deleted: 0 });
    assert_eq!(ids(store, "S3GlacierVault").len(), 3);
    for entity in store.entities_by_label("S3GlacierVault")? {
        assert_eq!(entity.str_property("accessPolicyReason"), Some(NO_VAULT_POLICY));
    }

    service.update(REGION, |r| r.vaults.retain(|v| v.vault_name != "vault-2"));
    let second = ctx
        .storage
        .synchronizer
        .sync_family(&glacier, &context(&[REGION], 123456790))
        .await?;
    assert_eq!(second.outcome, FamilyOutcome::Reconciled { deleted: 1 });
    assert_eq!(
        ids(store, "S3GlacierVault"),
        vec![
            "arn:aws:glacier:us-east-1:672373165745:vaults/vault-1",
            "arn:aws:glacier:us-east-1:672373165745:vaults/vault-3",
        ]
    );
    assert_eq!(store.relationships(Some(OWNERSHIP_RELATION))?.len(), 2);
    for entity in store.entities_by_label("S3GlacierVault")? {
        assert_eq!(entity.lastupdated, SyncMarker(123456790));
    }
    Ok(())
}

#[tokio::test]
async fn kinesis_skips_its_default_regions() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let service: Arc<dyn AwsService> = Arc::new(
        MockAwsService::new()
            .with_region(REGION, RegionFixture::default())
            .with_region(
                "us-west-1",
                RegionFixture {
                    failures: [("list_streams".to_string(), "endpoint unavailable".to_string())]
                        .into_iter()
                        .collect(),
                    ..Default::default()
                },
            ),
    );
    let run = context(&[REGION, "us-west-1"], 9).with_overrides(default_overrides());

    let kinesis = ctx
        .storage
        .synchronizer
        .sync_family(&KinesisEnumerator::new(Arc::clone(&service), 2), &run)
        .await?;
    let glacier = ctx
        .storage
        .synchronizer
        .sync_family(&GlacierEnumerator::new(service, 2), &run)
        .await?;

    let scanned: Vec<&str> = kinesis.regions.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(scanned, vec![REGION]);
    assert!(kinesis.reconciled());
    assert_eq!(glacier.regions.len(), 2);
    Ok(())
}

#[tokio::test]
async fn tables_are_listed_once_per_database() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let store = ctx.storage.store.as_ref();
    let service = Arc::new(MockAwsService::new().with_region(
        REGION,
        RegionFixture {
            databases: vec![
                database("customer_database", "s3://aws-bucket-no-1/data/customer_database/"),
                database("product_database", "s3://aws-bucket-no-2/data/product_database/"),
                database("hr_database", "s3://aws-bucket-no-3/data/hr_database/"),
            ],
            tables: [
                (
                    "customer_database".to_string(),
                    vec![
                        table("customer_database", "customer_csv"),
                        table("customer_database", "orders"),
                    ],
                ),
                (
                    "hr_database".to_string(),
                    vec![table("hr_database", "employees")],
                ),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        },
    ));

    ctx.storage
        .synchronizer
        .sync_family(&GlueEnumerator::new(service.clone(), 3), &context(&[REGION], 1))
        .await?;

    let mut calls = service.table_calls();
    calls.sort();
    assert_eq!(calls, vec!["customer_database", "hr_database", "product_database"]);
    assert_eq!(ids(store, "GlueTable").len(), 3);
    assert_eq!(store.relationships(Some(CONTAINS))?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn stale_tables_go_with_their_database() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let store = ctx.storage.store.as_ref();
    let service = Arc::new(MockAwsService::new().with_region(
        REGION,
        RegionFixture {
            databases: vec![database("customer_database", "s3://aws-bucket-no-1/")],
            tables: [(
                "customer_database".to_string(),
                vec![
                    table("customer_database", "customer_csv"),
                    table("customer_database", "orders"),
                ],
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        },
    ));
    let glue = GlueEnumerator::new(service.clone(), 2);
    let sync = &ctx.storage.synchronizer;

    sync.sync_family(&glue, &context(&[REGION], 1)).await?;
    assert_eq!(ids(store, "GlueTable").len(), 2);

    service.update(REGION, |r| {
        if let Some(tables) = r.tables.get_mut("customer_database") {
            tables.retain(|t| t.name == "customer_csv");
        }
    });
    let second = sync.sync_family(&glue, &context(&[REGION], 2)).await?;
    assert_eq!(second.outcome, FamilyOutcome::Reconciled { deleted: 1 });
    assert_eq!(ids(store, "GlueTable"), vec![glue_arn("table/customer_database/customer_csv")]);
    assert_eq!(store.relationships(Some(CONTAINS))?.len(), 1);

    service.update(REGION, |r| {
        r.databases.clear();
        r.tables.clear();
    });
    let third = sync.sync_family(&glue, &context(&[REGION], 3)).await?;
    assert_eq!(third.outcome, FamilyOutcome::Reconciled { deleted: 2 });
    assert!(store.entities_by_label("GlueTable")?.is_empty());
    assert!(store.entities_by_label("GlueDatabase")?.is_empty());
    assert!(store.relationships(None)?.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_listing_keeps_prior_glue_state() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let store = ctx.storage.store.as_ref();
    let service = Arc::new(MockAwsService::new().with_region(
        REGION,
        RegionFixture {
            vaults: vec![vault("vault-1")],
            jobs: vec![serde_json::from_value(serde_json::json!({
                "Name": "data-processing-job",
                "Role": role_arn("default-glue-user")
            }))?],
            ..Default::default()
        },
    ));
    let shared: Arc<dyn AwsService> = service.clone();
    let families = enumerators(shared, 2, &FamilySelection::All);
    let sync = &ctx.storage.synchronizer;

    sync.sync_all(&families, &full_run(1)).await?;
    assert_eq!(ids(store, "GlueJob").len(), 1);

    service.update(REGION, |r| {
        r.jobs.clear();
        r.vaults.clear();
        r.failures
            .insert("get_crawlers".to_string(), "ThrottlingException: Rate exceeded".to_string());
    });
    let report = sync.sync_all(&families, &full_run(2)).await?;

    let glue = report.family(mapper::GLUE_FAMILY).expect("glue reported");
    match &glue.outcome {
        FamilyOutcome::ReconcileSkipped { reasons } => {
            assert_eq!(reasons.len(), 1);
            assert!(reasons[0].contains("Rate exceeded"));
        }
        other => panic!("expected skipped reconcile, got {other:?}"),
    }
    assert_eq!(ids(store, "GlueJob"), vec![glue_arn("job/data-processing-job")]);
    // Other families are unaffected by the failure.
    let glacier = report.family(mapper::GLACIER_FAMILY).expect("glacier reported");
    assert_eq!(glacier.outcome, FamilyOutcome::Reconciled { deleted: 1 });
    assert!(store.entities_by_label("S3GlacierVault")?.is_empty());

    let scan = ctx.storage.catalog.last_complete_scan(ACCOUNT_ID, "glue")?;
    assert_eq!(scan.map(|s| s.marker), Some(SyncMarker(1)));

    service.update(REGION, |r| r.failures.clear());
    let recovered = sync.sync_all(&families, &full_run(3)).await?;
    assert!(recovered.family(mapper::GLUE_FAMILY).unwrap().reconciled());
    assert!(store.entities_by_label("GlueJob")?.is_empty());
    Ok(())
}

#[tokio::test]
async fn family_selection_limits_the_run() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let service: Arc<dyn AwsService> = Arc::new(fixture_service());
    let selection = FamilySelection::parse(&["glacier".to_string()])?;
    let families = enumerators(service, 2, &selection);
    assert_eq!(families.len(), 1);

    let report = ctx
        .storage
        .synchronizer
        .sync_all(&families, &full_run(4))
        .await?;
    assert_eq!(report.families.len(), 1);
    assert!(report.family(mapper::GLUE_FAMILY).is_none());
    assert!(ctx.storage.store.entities_by_label("GlueDatabase")?.is_empty());
    assert_eq!(ids(ctx.storage.store.as_ref(), "S3GlacierVault").len(), 3);
    Ok(())
}

#[tokio::test]
async fn streams_without_arn_are_kept_and_never_looked_up() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let store = ctx.storage.store.as_ref();
    let service = Arc::new(MockAwsService::new().with_region(
        REGION,
        RegionFixture {
            data_streams: vec![serde_json::from_value(
                serde_json::json!({"StreamName": "orphan-data", "StreamStatus": "ACTIVE"}),
            )?],
            video_streams: vec![serde_json::from_value(
                serde_json::json!({"StreamName": "orphan-video", "Status": "ACTIVE"}),
            )?],
            ..Default::default()
        },
    ));

    let report = ctx
        .storage
        .synchronizer
        .sync_family(&KinesisEnumerator::new(service, 2), &context(&[REGION], 1))
        .await?;
    assert!(report.reconciled());

    let data = store
        .entity(
            "KinesisDataStream",
            "arn:aws:kinesis:us-east-1:672373165745:stream/orphan-data",
        )?
        .expect("identifier rendered from the stream name");
    assert_eq!(data.str_property("resourcePolicyState"), Some("absent"));
    assert_eq!(data.str_property("resourcePolicyReason"), Some(POLICY_NOT_LOOKED_UP));

    let video = store.entity(
        "KinesisVideoStream",
        "arn:aws:kinesisvideo:us-east-1:672373165745:stream/orphan-video",
    )?;
    assert!(video.is_some());
    Ok(())
}

#[tokio::test]
async fn incomplete_listing_keeps_existing_streams() -> anyhow::Result<()> {
    let ctx = init_test_context().await?;
    let store = ctx.storage.store.as_ref();
    let video = |name: &str| -> anyhow::Result<VideoStream> {
        Ok(serde_json::from_value(serde_json::json!({
            "StreamName": name,
            "StreamARN": format!("arn:aws:kinesisvideo:{REGION}:{ACCOUNT_ID}:stream/{name}/1"),
        }))?)
    };
    let service = Arc::new(MockAwsService::new().with_region(
        REGION,
        RegionFixture {
            video_streams: vec![video("camera-1")?, video("camera-2")?],
            ..Default::default()
        },
    ));
    let kinesis = KinesisEnumerator::new(service.clone(), 2);
    let sync = &ctx.storage.synchronizer;

    sync.sync_family(&kinesis, &context(&[REGION], 1)).await?;
    assert_eq!(ids(store, "KinesisVideoStream").len(), 2);

    // The provider returned a record without a name; the listing is not trusted.
    service.update(REGION, |r| {
        r.video_streams.truncate(1);
        r.failures.insert(
            "list_streams".to_string(),
            "listing returned a record without StreamName".to_string(),
        );
    });
    let report = sync.sync_family(&kinesis, &context(&[REGION], 2)).await?;

    match &report.outcome {
        FamilyOutcome::ReconcileSkipped { reasons } => {
            assert!(reasons[0].contains("without StreamName"));
        }
        other => panic!("expected skipped reconcile, got {other:?}"),
    }
    assert!(!report.regions[0].is_complete());
    assert_eq!(ids(store, "KinesisVideoStream").len(), 2);
    Ok(())
}
