//! Per-resource-type pipelines.
//!
//! A pipeline lists one service kind, prices each record against the shared
//! catalog and normalizes it. Pipelines never fail the run: their outcome
//! carries the resources they produced and, if the listing stopped early,
//! the error that stopped it.

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::PricingCatalog;
use crate::cost::{CostEstimate, estimate_cost};
use crate::error::FetchError;
use crate::fetcher::{AggregatedLister, fetch_aggregated};
use crate::metrics::InventoryMetrics;
use crate::models::{AccountContext, InventoryRecord, Resource, ServiceKind};
use crate::normalizer::normalize;

/// What a pipeline reports back to the collector
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub kind: ServiceKind,
    pub resources: Vec<Resource>,
    pub error: Option<FetchError>,
}

impl PipelineOutcome {
    pub fn completed(kind: ServiceKind, resources: Vec<Resource>) -> Self {
        Self {
            kind,
            resources,
            error: None,
        }
    }

    pub fn failed(kind: ServiceKind, resources: Vec<Resource>, error: FetchError) -> Self {
        Self {
            kind,
            resources,
            error: Some(error),
        }
    }
}

/// Enumerates and prices one resource type
#[async_trait]
pub trait ResourcePipeline: Send + Sync {
    fn service_kind(&self) -> ServiceKind;

    async fn run(
        &self,
        account: &AccountContext,
        catalog: &PricingCatalog,
        cancel: &CancellationToken,
    ) -> PipelineOutcome;
}

/// Pipeline over an aggregated listing
pub struct ListingPipeline<L> {
    kind: ServiceKind,
    lister: L,
}

impl<L> ListingPipeline<L>
where
    L: AggregatedLister,
    L::Record: InventoryRecord,
{
    pub fn new(kind: ServiceKind, lister: L) -> Self {
        Self { kind, lister }
    }
}

#[async_trait]
impl<L> ResourcePipeline for ListingPipeline<L>
where
    L: AggregatedLister,
    L::Record: InventoryRecord,
{
    fn service_kind(&self) -> ServiceKind {
        self.kind
    }

    async fn run(
        &self,
        account: &AccountContext,
        catalog: &PricingCatalog,
        cancel: &CancellationToken,
    ) -> PipelineOutcome {
        let start = Instant::now();
        // One timestamp for every resource of this listing
        let fetched_at = Utc::now();
        let mut resources = Vec::new();
        let mut failure = None;

        let mut records = std::pin::pin!(fetch_aggregated(&self.lister, account, cancel));
        while let Some(item) = records.next().await {
            match item {
                Ok(record) => {
                    let estimate = estimate_cost(self.kind, &record.billing_attributes(), catalog);
                    if let CostEstimate::Unknown { reason } = estimate {
                        InventoryMetrics::record_unknown_cost(self.kind, reason);
                    }
                    resources.push(normalize(&record, estimate, account, fetched_at));
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        match failure {
            None => {
                info!(
                    provider = %self.kind.provider(),
                    account = %account.account,
                    service = %self.kind,
                    resources = resources.len(),
                    "Fetched resources"
                );
                InventoryMetrics::record_pipeline_completed(self.kind, resources.len(), elapsed);
                PipelineOutcome::completed(self.kind, resources)
            }
            Some(e) if e.is_cancelled() => {
                // Records already priced stay in the inventory
                warn!(
                    account = %account.account,
                    service = %self.kind,
                    resources = resources.len(),
                    "Listing cancelled, keeping partial resources"
                );
                InventoryMetrics::record_pipeline_failed(self.kind, elapsed);
                PipelineOutcome::failed(self.kind, resources, e)
            }
            Some(e) => {
                warn!(
                    account = %account.account,
                    service = %self.kind,
                    discarded = resources.len(),
                    error = %e,
                    "Listing failed, discarding partial resources"
                );
                InventoryMetrics::record_pipeline_failed(self.kind, elapsed);
                PipelineOutcome::failed(self.kind, Vec::new(), e)
            }
        }
    }
}
