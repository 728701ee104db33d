//! Inventory Collector Service
//!
//! Wires the GCP listers and the pricing snapshot into a collection run and
//! renders its report.

use chrono::{DateTime, Utc};
use domain_inventory::{
    CatalogSource, InventoryCollector, InventoryReport, ListingPipeline, Resource, ServiceKind,
};
use eyre::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::providers::{AddressLister, DiskLister, GcpComputeClient, SnapshotCatalogSource};

/// Serializable view of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct InventoryOutput {
    pub account: String,
    pub project: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub resource_count: usize,
    pub total_monthly_cost: f64,
    pub unknown_cost_count: usize,
    pub complete: bool,
    /// Failure message per resource type that did not complete
    pub failures: BTreeMap<ServiceKind, String>,
    pub resources: Vec<Resource>,
}

impl InventoryOutput {
    pub fn from_report(config: &Config, report: InventoryReport) -> Self {
        Self {
            account: config.gcp.account_name.clone(),
            project: config.gcp.project_id.clone(),
            started_at: report.started_at,
            finished_at: report.finished_at,
            resource_count: report.resources.len(),
            total_monthly_cost: report.total_monthly_cost(),
            unknown_cost_count: report.unknown_cost_count(),
            complete: report.is_complete(),
            failures: report
                .errors
                .iter()
                .map(|(kind, e)| (*kind, e.to_string()))
                .collect(),
            resources: report.resources,
        }
    }

    pub fn to_json(&self, compact: bool) -> Result<String> {
        let json = if compact {
            serde_json::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        Ok(json)
    }
}

/// Priced entries per (product line, tier)
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSummary {
    pub source: String,
    pub priced_paths: usize,
    pub tiers: Vec<CatalogTierSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogTierSummary {
    pub product_line: String,
    pub tier: String,
    pub regions: usize,
}

/// Main inventory collector service
#[derive(Clone)]
pub struct InventoryService {
    config: Config,
    compute: Arc<GcpComputeClient>,
    http: reqwest::Client,
}

impl InventoryService {
    pub fn new(config: Config) -> Result<Self> {
        let compute = Arc::new(GcpComputeClient::new(&config.gcp)?);
        Ok(Self {
            config,
            compute,
            http: reqwest::Client::new(),
        })
    }

    fn catalog_source(&self) -> SnapshotCatalogSource {
        SnapshotCatalogSource::new(&self.config.pricing_source, self.http.clone())
    }

    fn build_collector(&self) -> InventoryCollector<SnapshotCatalogSource> {
        InventoryCollector::new(self.catalog_source())
            .with_pipeline(Arc::new(ListingPipeline::new(
                ServiceKind::ComputeDisk,
                DiskLister::new(Arc::clone(&self.compute)),
            )))
            .with_pipeline(Arc::new(ListingPipeline::new(
                ServiceKind::ComputeAddress,
                AddressLister::new(Arc::clone(&self.compute)),
            )))
    }

    /// Run a one-time collection
    pub async fn collect(&self, cancel: &CancellationToken) -> Result<InventoryOutput> {
        let account = self.config.gcp.account_context();
        let collector = self.build_collector();

        info!(
            account = %account.account,
            project = %account.project,
            services = ?collector.service_kinds(),
            "Starting inventory collection"
        );

        let report = collector.collect(&account, cancel).await?;
        for (kind, e) in &report.errors {
            warn!(service = %kind, error = %e, "Resource type incomplete");
        }

        Ok(InventoryOutput::from_report(&self.config, report))
    }

    /// Write the output to a file, or stdout when no path is given
    pub async fn write_output(
        output: &InventoryOutput,
        path: Option<&Path>,
        compact: bool,
    ) -> Result<()> {
        let json = output.to_json(compact)?;
        match path {
            Some(path) => {
                tokio::fs::write(path, json).await?;
                info!(
                    path = %path.display(),
                    resources = output.resource_count,
                    "Inventory written"
                );
            }
            None => println!("{}", json),
        }
        Ok(())
    }

    /// Run as a scheduled service until cancelled
    pub async fn run_scheduled(
        &self,
        cron_expr: &str,
        output: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!(cron = cron_expr, "Starting scheduled inventory collection");

        let mut sched = JobScheduler::new().await?;

        let service = self.clone();
        let output = output.map(Path::to_path_buf);
        let job_cancel = cancel.clone();

        let job = Job::new_async(cron_expr, move |_uuid, _l| {
            let service = service.clone();
            let output = output.clone();
            let cancel = job_cancel.child_token();

            Box::pin(async move {
                info!("Running scheduled inventory collection");

                match service.collect(&cancel).await {
                    Ok(result) => {
                        info!(
                            resources = result.resource_count,
                            total_monthly_cost = result.total_monthly_cost,
                            failed_types = result.failures.len(),
                            "Scheduled collection complete"
                        );
                        if let Err(e) = Self::write_output(&result, output.as_deref(), true).await {
                            error!(error = %e, "Failed to write scheduled inventory");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Scheduled collection failed");
                    }
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler started, waiting for jobs...");
        cancel.cancelled().await;

        info!("Shutting down scheduler");
        sched.shutdown().await?;
        Ok(())
    }

    /// Load the pricing snapshot and summarize it
    pub async fn catalog_summary(&self) -> Result<CatalogSummary> {
        let catalog = self.catalog_source().load().await?;
        let tiers = catalog
            .summary()
            .into_iter()
            .map(|((product_line, tier), regions)| CatalogTierSummary {
                product_line,
                tier,
                regions,
            })
            .collect();

        Ok(CatalogSummary {
            source: self.config.pricing_source.clone(),
            priced_paths: catalog.len(),
            tiers,
        })
    }
}
