//! Inventory collection run.
//!
//! Loads the pricing catalog once, then runs every registered pipeline as its
//! own task against the same immutable snapshot. A failing pipeline only
//! costs the run its own resource type.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::{CatalogSource, PricingCatalog};
use crate::error::{CollectError, CollectResult, FetchError};
use crate::metrics::InventoryMetrics;
use crate::models::{AccountContext, CloudProvider, Resource, ServiceKind};
use crate::pipeline::{PipelineOutcome, ResourcePipeline};

/// Result of one collection run
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryReport {
    pub resources: Vec<Resource>,
    /// Resource types whose listing did not complete
    pub errors: BTreeMap<ServiceKind, FetchError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl InventoryReport {
    /// Sum of known monthly costs
    pub fn total_monthly_cost(&self) -> f64 {
        self.resources.iter().map(|r| r.estimated_monthly_cost).sum()
    }

    pub fn unknown_cost_count(&self) -> usize {
        self.resources.iter().filter(|r| !r.cost_known).count()
    }

    /// True when every resource type was listed to the end
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn cost_by_service(&self) -> BTreeMap<ServiceKind, f64> {
        let mut totals = BTreeMap::new();
        for resource in &self.resources {
            *totals.entry(resource.service_kind).or_insert(0.0) += resource.estimated_monthly_cost;
        }
        totals
    }
}

/// Runs the registered pipelines for an account
pub struct InventoryCollector<C> {
    catalog_source: C,
    pipelines: Vec<Arc<dyn ResourcePipeline>>,
}

impl<C: CatalogSource> InventoryCollector<C> {
    pub fn new(catalog_source: C) -> Self {
        Self {
            catalog_source,
            pipelines: Vec::new(),
        }
    }

    /// Builder-style registration
    pub fn with_pipeline(mut self, pipeline: Arc<dyn ResourcePipeline>) -> Self {
        self.register(pipeline);
        self
    }

    pub fn register(&mut self, pipeline: Arc<dyn ResourcePipeline>) {
        self.pipelines.push(pipeline);
    }

    /// Service kinds in registration order
    pub fn service_kinds(&self) -> Vec<ServiceKind> {
        self.pipelines.iter().map(|p| p.service_kind()).collect()
    }

    /// Load the catalog snapshot, giving up on cancellation
    pub async fn load_catalog(&self, cancel: &CancellationToken) -> CollectResult<PricingCatalog> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CollectError::Cancelled),
            loaded = self.catalog_source.load() => Ok(loaded?),
        }
    }

    /// Run one inventory collection.
    ///
    /// Fails only when the catalog cannot be loaded or the run is cancelled
    /// before it is. Pipeline failures are reported in the returned
    /// [`InventoryReport::errors`].
    pub async fn collect(
        &self,
        account: &AccountContext,
        cancel: &CancellationToken,
    ) -> CollectResult<InventoryReport> {
        let started_at = Utc::now();
        InventoryMetrics::record_collection_started(&account.account);

        let catalog = match self.load_catalog(cancel).await {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => {
                InventoryMetrics::record_collection_aborted(&account.account, &e.to_string());
                return Err(e);
            }
        };
        info!(
            account = %account.account,
            prices = catalog.len(),
            pipelines = self.pipelines.len(),
            "Pricing catalog loaded"
        );

        let handles: Vec<_> = self
            .pipelines
            .iter()
            .map(|pipeline| {
                let pipeline = Arc::clone(pipeline);
                let catalog = Arc::clone(&catalog);
                let account = account.clone();
                let cancel = cancel.clone();
                let kind = pipeline.service_kind();
                let handle =
                    tokio::spawn(async move { pipeline.run(&account, &catalog, &cancel).await });
                (kind, handle)
            })
            .collect();

        let (kinds, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let outcomes = join_all(handles)
            .await
            .into_iter()
            .zip(kinds)
            .map(|(joined, kind)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(service = %kind, error = %e, "Pipeline task aborted");
                    PipelineOutcome::failed(kind, Vec::new(), FetchError::Aborted(e.to_string()))
                }
            });

        let report = merge_outcomes(outcomes, started_at);

        for (kind, cost) in cost_per_kind(&report, &self.service_kinds()) {
            InventoryMetrics::set_estimated_monthly_cost(kind, cost);
        }
        InventoryMetrics::record_collection_completed(
            &account.account,
            report.resources.len(),
            report.errors.len(),
        );
        info!(
            account = %account.account,
            resources = report.resources.len(),
            failed_types = report.errors.len(),
            unknown_costs = report.unknown_cost_count(),
            "Inventory collection finished"
        );

        Ok(report)
    }
}

/// Fold pipeline outcomes into a report, dropping duplicate identities
fn merge_outcomes(
    outcomes: impl IntoIterator<Item = PipelineOutcome>,
    started_at: DateTime<Utc>,
) -> InventoryReport {
    let mut resources = Vec::new();
    let mut errors = BTreeMap::new();
    let mut seen: HashSet<(CloudProvider, String, String)> = HashSet::new();
    let mut duplicates: HashMap<ServiceKind, usize> = HashMap::new();

    for outcome in outcomes {
        for resource in outcome.resources {
            let (provider, account, resource_id) = resource.identity();
            let key = (provider, account.to_string(), resource_id.to_string());
            if seen.insert(key) {
                resources.push(resource);
            } else {
                *duplicates.entry(resource.service_kind).or_default() += 1;
            }
        }
        if let Some(error) = outcome.error {
            match errors.entry(outcome.kind) {
                Entry::Vacant(entry) => {
                    entry.insert(error);
                }
                Entry::Occupied(entry) => {
                    warn!(
                        service = %outcome.kind,
                        kept = %entry.get(),
                        dropped = %error,
                        "Service kind failed more than once, keeping the first error"
                    );
                }
            }
        }
    }

    for (kind, count) in duplicates {
        warn!(service = %kind, duplicates = count, "Dropped duplicate resources");
    }

    InventoryReport {
        resources,
        errors,
        started_at,
        finished_at: Utc::now(),
    }
}

/// Monthly cost per registered kind; kinds without resources report zero
fn cost_per_kind(report: &InventoryReport, kinds: &[ServiceKind]) -> BTreeMap<ServiceKind, f64> {
    let mut costs = report.cost_by_service();
    for kind in kinds {
        costs.entry(*kind).or_insert(0.0);
    }
    costs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        MockCatalogSource, PERSISTENT_DISK_PRODUCT, StaticCatalogSource, UnitPrice,
    };
    use crate::error::CatalogLoadError;
    use crate::fetcher::AggregatedPage;
    use crate::fetcher::tests::{CancellingLister, ScriptedLister, account, bucket};
    use crate::models::Tag;
    use crate::normalizer::tests::TestDisk;
    use crate::pipeline::ListingPipeline;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pipeline replaying a fixed outcome and counting its runs
    struct FixedPipeline {
        outcome: PipelineOutcome,
        runs: AtomicUsize,
    }

    impl FixedPipeline {
        fn new(outcome: PipelineOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                runs: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ResourcePipeline for FixedPipeline {
        fn service_kind(&self) -> ServiceKind {
            self.outcome.kind
        }

        async fn run(
            &self,
            _: &AccountContext,
            _: &PricingCatalog,
            _: &CancellationToken,
        ) -> PipelineOutcome {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    struct PanickingPipeline;

    #[async_trait]
    impl ResourcePipeline for PanickingPipeline {
        fn service_kind(&self) -> ServiceKind {
            ServiceKind::ComputeAddress
        }

        async fn run(
            &self,
            _: &AccountContext,
            _: &PricingCatalog,
            _: &CancellationToken,
        ) -> PipelineOutcome {
            panic!("listing blew up");
        }
    }

    fn catalog() -> PricingCatalog {
        let mut catalog = PricingCatalog::new();
        catalog.insert(
            PERSISTENT_DISK_PRODUCT,
            "Storagepdssdlitecapacity",
            "us-central1",
            UnitPrice::new(40_000_000, 9),
        );
        catalog
    }

    fn disk_pipeline(disks: Vec<TestDisk>) -> Arc<dyn ResourcePipeline> {
        Arc::new(ListingPipeline::new(
            ServiceKind::ComputeDisk,
            ScriptedLister::new(vec![Ok(AggregatedPage::last(vec![bucket(
                "zones/us-central1-a",
                disks,
            )]))]),
        ))
    }

    fn resource(kind: ServiceKind, id: &str) -> Resource {
        Resource {
            provider: CloudProvider::Gcp,
            account: "test-account".to_string(),
            service_kind: kind,
            resource_id: id.to_string(),
            region: "us-central1".to_string(),
            name: format!("res-{}", id),
            fetched_at: Utc::now(),
            estimated_monthly_cost: 1.5,
            cost_known: true,
            tags: Vec::new(),
            link: String::new(),
        }
    }

    #[tokio::test]
    async fn test_zonal_balanced_disk_end_to_end() {
        let mut disk = TestDisk::zonal(42, "us-central1-a", "pd-balanced", 100);
        disk.labels = Some(HashMap::from([("env".to_string(), "prod".to_string())]));
        let collector = InventoryCollector::new(StaticCatalogSource::new(catalog()))
            .with_pipeline(disk_pipeline(vec![disk]));

        let report = collector.collect(&account(), &CancellationToken::new()).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.resources.len(), 1);
        let resource = &report.resources[0];
        assert_eq!(resource.provider, CloudProvider::Gcp);
        assert_eq!(resource.account, "test-account");
        assert_eq!(resource.service_kind, ServiceKind::ComputeDisk);
        assert_eq!(resource.resource_id, "42");
        assert_eq!(resource.region, "us-central1-a");
        assert_eq!(resource.estimated_monthly_cost, 4.0);
        assert_eq!(resource.tags, vec![Tag::new("env", "prod")]);
        assert!(resource.fetched_at >= report.started_at);
        assert!(resource.fetched_at <= report.finished_at);
        assert_eq!(report.total_monthly_cost(), 4.0);
    }

    #[tokio::test]
    async fn test_catalog_failure_aborts_before_any_pipeline() {
        let mut source = MockCatalogSource::new();
        source
            .expect_load()
            .times(1)
            .returning(|| Err(CatalogLoadError::Unavailable("snapshot missing".to_string())));
        let pipeline = FixedPipeline::new(PipelineOutcome::completed(
            ServiceKind::ComputeDisk,
            Vec::new(),
        ));
        let collector = InventoryCollector::new(source).with_pipeline(pipeline.clone());

        let err = collector.collect(&account(), &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CollectError::CatalogLoad(CatalogLoadError::Unavailable(_))));
        assert_eq!(pipeline.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_type_does_not_affect_other_types() {
        let addresses = FixedPipeline::new(PipelineOutcome::failed(
            ServiceKind::ComputeAddress,
            Vec::new(),
            FetchError::Api {
                status: 403,
                message: "compute.addresses.list denied".to_string(),
            },
        ));
        let collector = InventoryCollector::new(StaticCatalogSource::new(catalog()))
            .with_pipeline(disk_pipeline(vec![
                TestDisk::zonal(1, "us-central1-a", "pd-balanced", 100),
                TestDisk::zonal(2, "us-central1-a", "pd-balanced", 10),
            ]))
            .with_pipeline(addresses);

        let report = collector.collect(&account(), &CancellationToken::new()).await.unwrap();

        assert_eq!(report.resources.len(), 2);
        assert!(report.resources.iter().all(|r| r.service_kind == ServiceKind::ComputeDisk));
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors.get(&ServiceKind::ComputeAddress),
            Some(FetchError::Api { status: 403, .. })
        ));
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_panicking_pipeline_is_reported_as_aborted() {
        let collector = InventoryCollector::new(StaticCatalogSource::new(catalog()))
            .with_pipeline(disk_pipeline(vec![TestDisk::zonal(
                1,
                "us-central1-a",
                "pd-balanced",
                100,
            )]))
            .with_pipeline(Arc::new(PanickingPipeline));

        let report = collector.collect(&account(), &CancellationToken::new()).await.unwrap();

        assert_eq!(report.resources.len(), 1);
        assert!(matches!(
            report.errors.get(&ServiceKind::ComputeAddress),
            Some(FetchError::Aborted(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_identities_are_dropped() {
        let first = FixedPipeline::new(PipelineOutcome::completed(
            ServiceKind::ComputeDisk,
            vec![resource(ServiceKind::ComputeDisk, "1"), resource(ServiceKind::ComputeDisk, "1")],
        ));
        let second = FixedPipeline::new(PipelineOutcome::completed(
            ServiceKind::ComputeAddress,
            vec![resource(ServiceKind::ComputeAddress, "2")],
        ));
        let collector = InventoryCollector::new(StaticCatalogSource::new(catalog()))
            .with_pipeline(first)
            .with_pipeline(second);

        let report = collector.collect(&account(), &CancellationToken::new()).await.unwrap();

        let ids: Vec<&str> = report.resources.iter().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_cancelled_run_before_catalog_load() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pipeline = FixedPipeline::new(PipelineOutcome::completed(
            ServiceKind::ComputeDisk,
            Vec::new(),
        ));
        let collector = InventoryCollector::new(StaticCatalogSource::new(catalog()))
            .with_pipeline(pipeline.clone());

        let err = collector.collect(&account(), &cancel).await.unwrap_err();

        assert!(matches!(err, CollectError::Cancelled));
        assert_eq!(pipeline.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_costs_are_counted_not_summed() {
        let collector = InventoryCollector::new(StaticCatalogSource::new(catalog())).with_pipeline(
            disk_pipeline(vec![
                TestDisk::zonal(1, "us-central1-a", "pd-balanced", 100),
                TestDisk::zonal(2, "us-central1-a", "pd-extreme", 100),
                TestDisk::zonal(3, "us-central1-a", "hyperdisk-ml", 100),
            ]),
        );

        let report = collector.collect(&account(), &CancellationToken::new()).await.unwrap();

        assert_eq!(report.resources.len(), 3);
        assert_eq!(report.unknown_cost_count(), 2);
        assert_eq!(report.total_monthly_cost(), 4.0);
        assert_eq!(report.cost_by_service().get(&ServiceKind::ComputeDisk), Some(&4.0));
    }

    #[test]
    fn test_service_kinds_follow_registration_order() {
        let addresses = PipelineOutcome::completed(ServiceKind::ComputeAddress, Vec::new());
        let disks = PipelineOutcome::completed(ServiceKind::ComputeDisk, Vec::new());
        let collector = InventoryCollector::new(StaticCatalogSource::default())
            .with_pipeline(FixedPipeline::new(addresses))
            .with_pipeline(FixedPipeline::new(disks));
        assert_eq!(
            collector.service_kinds(),
            vec![ServiceKind::ComputeAddress, ServiceKind::ComputeDisk]
        );
    }

    #[tokio::test]
    async fn test_cancel_after_catalog_load_returns_partial_report() {
        let cancel = CancellationToken::new();
        let disks = ListingPipeline::new(
            ServiceKind::ComputeDisk,
            CancellingLister::new(
                AggregatedPage::with_next(
                    vec![bucket(
                        "zones/us-central1-a",
                        vec![TestDisk::zonal(1, "us-central1-a", "pd-balanced", 100)],
                    )],
                    "p2",
                ),
                cancel.clone(),
            ),
        );
        let collector = InventoryCollector::new(StaticCatalogSource::new(catalog()))
            .with_pipeline(Arc::new(disks));

        let report = collector.collect(&account(), &cancel).await.unwrap();

        assert_eq!(report.resources.len(), 1);
        assert_eq!(report.resources[0].resource_id, "1");
        assert_eq!(
            report.errors.get(&ServiceKind::ComputeDisk),
            Some(&FetchError::Cancelled)
        );
        assert_eq!(report.total_monthly_cost(), 4.0);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_first_error_per_kind_is_kept() {
        let outcomes = vec![
            PipelineOutcome::failed(
                ServiceKind::ComputeDisk,
                Vec::new(),
                FetchError::Auth("token expired".to_string()),
            ),
            PipelineOutcome::failed(
                ServiceKind::ComputeDisk,
                Vec::new(),
                FetchError::Transport("connection reset".to_string()),
            ),
        ];

        let report = merge_outcomes(outcomes, Utc::now());

        assert_eq!(report.errors.len(), 1);
        assert_eq!(
            report.errors.get(&ServiceKind::ComputeDisk),
            Some(&FetchError::Auth("token expired".to_string()))
        );
    }

    #[test]
    fn test_cost_per_kind_reports_zero_for_empty_and_failed_kinds() {
        let report = merge_outcomes(
            vec![
                PipelineOutcome::completed(
                    ServiceKind::ComputeDisk,
                    vec![resource(ServiceKind::ComputeDisk, "1")],
                ),
                PipelineOutcome::failed(
                    ServiceKind::ComputeAddress,
                    Vec::new(),
                    FetchError::Cancelled,
                ),
            ],
            Utc::now(),
        );

        let costs = cost_per_kind(
            &report,
            &[ServiceKind::ComputeDisk, ServiceKind::ComputeAddress],
        );

        assert_eq!(costs.get(&ServiceKind::ComputeDisk), Some(&1.5));
        assert_eq!(costs.get(&ServiceKind::ComputeAddress), Some(&0.0));
        assert_eq!(costs.len(), 2);
    }
}
