use crate::catalog::Catalog;
use crate::cleanup::{CleanupParams, Reconciler};
use crate::config::{FamilyOverride, SyncConfig};
use crate::descriptor::{lookup_str, FamilyDescriptor, ScanScope};
use crate::errors::{Result, SyncError};
use crate::fetch::{ResourceEnumerator, ResourceRecord};
use crate::graph::GraphStore;
use crate::link::{plan_links, Linker};
use crate::models::{
    FamilyOutcome, FamilyReport, LinkResult, MissingLink, NodeRef, RegionReport, SyncMarker,
    SyncReport,
};
use crate::upsert::{normalize, UpsertEngine};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Immutable per-invocation context. The marker is fixed before any family starts
/// scanning and is shared by every family and region of the run.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub account: NodeRef,
    pub regions: Vec<String>,
    pub marker: SyncMarker,
    pub overrides: HashMap<String, FamilyOverride>,
    pub cancel: CancellationToken,
}

impl SyncContext {
    pub fn new(account: NodeRef, regions: Vec<String>, marker: SyncMarker) -> Self {
        Self {
            account,
            regions,
            marker,
            overrides: HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &SyncConfig, account_label: &str) -> Self {
        Self {
            account: NodeRef::new(account_label, config.account_id.clone()),
            regions: config.regions.clone(),
            marker: config.marker(),
            overrides: config.families.clone(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, FamilyOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn family_override(&self, family: &str) -> FamilyOverride {
        self.overrides.get(family).cloned().unwrap_or_default()
    }
}

/// Drives resource families from enumeration through reconciliation.
#[async_trait]
pub trait DataSynchronizer {
    /// Scans every included region of one family, then reconciles it if and only if
    /// every region scan completed.
    async fn sync_family(
        &self,
        enumerator: &dyn ResourceEnumerator,
        ctx: &SyncContext,
    ) -> Result<FamilyReport>;

    /// Runs the families one after another under a single marker. A family whose
    /// store or catalog work fails is reported as `Failed` and the run moves on.
    async fn sync_all(
        &self,
        enumerators: &[Arc<dyn ResourceEnumerator>],
        ctx: &SyncContext,
    ) -> Result<SyncReport>;
}

pub struct GraphSynchronizer {
    store: Arc<dyn GraphStore>,
    catalog: Option<Arc<Catalog>>,
    region_concurrency: usize,
}

impl GraphSynchronizer {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            catalog: None,
            region_concurrency: 1,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_region_concurrency(mut self, limit: usize) -> Self {
        self.region_concurrency = limit.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    async fn scan_region(
        &self,
        enumerator: &dyn ResourceEnumerator,
        region: &str,
        ctx: &SyncContext,
    ) -> RegionReport {
        let family = enumerator.family();
        let mut report = RegionReport::new(region);
        log::info!("Scanning {} in {} for account {}", family.name, region, ctx.account.id);

        let enumerated = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                report.errors.push(cancelled(family, region).to_string());
                return report;
            }
            result = enumerator.enumerate(region) => result,
        };
        let records = match enumerated {
            Ok(records) => records,
            Err(e) => {
                let err = SyncError::Enumeration {
                    family: family.name,
                    region: region.to_string(),
                    message: e.to_string(),
                };
                log::error!("{err}");
                report.errors.push(err.to_string());
                return report;
            }
        };

        let scope = ScanScope::new(region, ctx.account.id.clone());
        let engine = UpsertEngine::new(self.store.as_ref());
        let linker = Linker::new(self.store.as_ref());

        for record in &records {
            if ctx.cancel.is_cancelled() {
                report.errors.push(cancelled(family, region).to_string());
                break;
            }
            report.records += 1;
            if let Err(err) = self.apply_record(&engine, &linker, record, &scope, ctx, &mut report)
            {
                log::error!("{err}");
                report.errors.push(err.to_string());
            }
        }

        log::info!(
            "Finished {} in {}: {} record(s), {} created, {} refreshed, {} link(s) missing, {} error(s)",
            family.name,
            region,
            report.records,
            report.entities_created,
            report.entities_updated,
            report.links_missing.len(),
            report.errors.len()
        );
        report
    }

    /// Upsert then link one record. A failing record never stops its siblings.
    fn apply_record(
        &self,
        engine: &UpsertEngine<'_>,
        linker: &Linker<'_>,
        record: &ResourceRecord,
        scope: &ScanScope,
        ctx: &SyncContext,
        report: &mut RegionReport,
    ) -> std::result::Result<(), SyncError> {
        let family = record.entity.entity_type.family;
        let upsert_error = |identifier: String, source| SyncError::Upsert {
            family,
            region: scope.region.clone(),
            identifier,
            source,
        };

        let normalized = normalize(record, scope).map_err(|e| upsert_error(describe(record), e))?;
        let entity = engine
            .upsert_normalized(&normalized, ctx.marker)
            .map_err(|e| upsert_error(normalized.identifier.clone(), e))?;
        if entity.created {
            report.entities_created += 1;
        } else {
            report.entities_updated += 1;
        }

        let planned = plan_links(record.entity, &record.body, &entity.node, &ctx.account, scope)
            .map_err(|e| upsert_error(normalized.identifier.clone(), e))?;
        for link in &planned {
            let result = linker.apply(link, ctx.marker).map_err(|source| SyncError::Link {
                family,
                region: scope.region.clone(),
                identifier: normalized.identifier.clone(),
                relation: link.relation,
                source,
            })?;
            match result {
                LinkResult::Created => report.links_created += 1,
                LinkResult::MatchedExisting => report.links_matched += 1,
                LinkResult::TargetMissing { missing } => report.links_missing.push(MissingLink {
                    relation: link.relation,
                    source: link.source.clone(),
                    missing,
                }),
            }
        }
        Ok(())
    }

    fn reconcile(
        &self,
        family: &FamilyDescriptor,
        reasons: Vec<String>,
        ctx: &SyncContext,
    ) -> Result<FamilyOutcome> {
        let mut reconciler = Reconciler::begin(family.cleanup);
        if !reasons.is_empty() {
            reconciler.abandon();
            return Ok(FamilyOutcome::ReconcileSkipped { reasons });
        }
        let params = CleanupParams {
            account: ctx.account.clone(),
            marker: ctx.marker,
        };
        let deleted = reconciler.reconcile(self.store.as_ref(), &params)?;
        if let Some(catalog) = &self.catalog {
            catalog.record_complete_scan(&ctx.account.id, family.name, ctx.marker)?;
        }
        Ok(FamilyOutcome::Reconciled { deleted })
    }
}

fn cancelled(family: &FamilyDescriptor, region: &str) -> SyncError {
    SyncError::Cancelled {
        family: family.name,
        region: region.to_string(),
    }
}

/// Best human-readable handle for a record whose identifier could not be built.
fn describe(record: &ResourceRecord) -> String {
    record
        .entity
        .fields
        .iter()
        .find_map(|f| lookup_str(&record.body, f.source))
        .map(str::to_string)
        .unwrap_or_else(|| format!("<unidentified {}>", record.entity.entity_type.label))
}

#[async_trait]
impl DataSynchronizer for GraphSynchronizer {
    async fn sync_family(
        &self,
        enumerator: &dyn ResourceEnumerator,
        ctx: &SyncContext,
    ) -> Result<FamilyReport> {
        let family = enumerator.family();
        let rule = ctx.family_override(family.name);
        if !rule.enabled {
            log::info!("Family {} is disabled, skipping", family.name);
            return Ok(FamilyReport {
                family: family.name,
                marker: ctx.marker,
                regions: Vec::new(),
                outcome: FamilyOutcome::Disabled,
            });
        }

        let regions: Vec<String> = ctx
            .regions
            .iter()
            .filter(|region| {
                let included = rule.includes(region);
                if !included {
                    log::info!("Skipping {} in {}: excluded for this family", family.name, region);
                }
                included
            })
            .cloned()
            .collect();

        let task_id = match &self.catalog {
            Some(catalog) => Some(
                catalog.create_task_log(&format!("sync:{}:{}", family.name, ctx.account.id))?,
            ),
            None => None,
        };

        let mut reports: Vec<(usize, RegionReport)> = stream::iter(regions.into_iter().enumerate())
            .map(|(idx, region): (usize, String)| async move {
                (idx, self.scan_region(enumerator, &region, ctx).await)
            })
            .buffer_unordered(self.region_concurrency)
            .collect()
            .await;
        reports.sort_by_key(|(idx, _)| *idx);
        let regions: Vec<RegionReport> = reports.into_iter().map(|(_, report)| report).collect();

        let mut reasons: Vec<String> = regions
            .iter()
            .flat_map(|report| report.errors.iter().cloned())
            .collect();
        if regions.is_empty() {
            reasons.push(format!("no region of {} was in scope", family.name));
        }

        let outcome = match self.reconcile(family, reasons, ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                if let (Some(catalog), Some(task_id)) = (&self.catalog, task_id) {
                    catalog.update_task_log_status(task_id, "FAILED", &e.to_string())?;
                }
                return Err(e);
            }
        };
        match &outcome {
            FamilyOutcome::Reconciled { deleted } => {
                log::info!("Reconciled {}: {} stale item(s) removed", family.name, deleted)
            }
            FamilyOutcome::ReconcileSkipped { reasons } => log::warn!(
                "Reconcile of {} skipped after {} failure(s); prior state kept",
                family.name,
                reasons.len()
            ),
            FamilyOutcome::Disabled | FamilyOutcome::Failed { .. } => {}
        }

        let report = FamilyReport {
            family: family.name,
            marker: ctx.marker,
            regions,
            outcome,
        };
        if let (Some(catalog), Some(task_id)) = (&self.catalog, task_id) {
            let status = if report.reconciled() { "RECONCILED" } else { "SKIPPED" };
            catalog.update_task_log_status(task_id, status, &serde_json::to_string(&report)?)?;
        }
        Ok(report)
    }

    async fn sync_all(
        &self,
        enumerators: &[Arc<dyn ResourceEnumerator>],
        ctx: &SyncContext,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for enumerator in enumerators {
            let family = match self.sync_family(enumerator.as_ref(), ctx).await {
                Ok(family) => family,
                Err(e) => {
                    let name = enumerator.family().name;
                    log::error!("Sync of {} failed, continuing with the next family: {}", name, e);
                    FamilyReport {
                        family: name,
                        marker: ctx.marker,
                        regions: Vec::new(),
                        outcome: FamilyOutcome::Failed {
                            error: e.to_string(),
                        },
                    }
                }
            };
            report.families.push(family);
        }
        Ok(report)
    }
}
