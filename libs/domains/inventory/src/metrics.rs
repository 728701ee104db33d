//! Inventory collection metrics.
//!
//! Recorded through the `metrics` facade; the binary decides which exporter
//! (if any) is installed.

use metrics::{counter, gauge, histogram};

use crate::cost::UnknownCost;
use crate::models::ServiceKind;

/// Inventory metrics recorder
pub struct InventoryMetrics;

impl InventoryMetrics {
    // =========================================================================
    // Run Metrics
    // =========================================================================

    /// Record a collection run start
    pub fn record_collection_started(account: &str) {
        counter!(
            "inventory_collections_total",
            "account" => account.to_string(),
            "status" => "started"
        )
        .increment(1);
    }

    /// Record a collection run that produced an inventory
    pub fn record_collection_completed(account: &str, resources: usize, failed_types: usize) {
        let status = if failed_types == 0 { "completed" } else { "partial" };
        counter!(
            "inventory_collections_total",
            "account" => account.to_string(),
            "status" => status
        )
        .increment(1);

        gauge!("inventory_resources_last_run", "account" => account.to_string())
            .set(resources as f64);
    }

    /// Record a collection run aborted before any pipeline reported
    pub fn record_collection_aborted(account: &str, error: &str) {
        counter!(
            "inventory_collections_total",
            "account" => account.to_string(),
            "status" => "aborted"
        )
        .increment(1);

        tracing::error!(account = account, error = error, "Inventory collection aborted");
    }

    // =========================================================================
    // Pipeline Metrics
    // =========================================================================

    /// Record a pipeline that finished its listing
    pub fn record_pipeline_completed(kind: ServiceKind, resources: usize, duration_secs: f64) {
        counter!(
            "inventory_pipeline_runs_total",
            "service" => kind.to_string(),
            "status" => "completed"
        )
        .increment(1);

        histogram!("inventory_pipeline_duration_seconds", "service" => kind.to_string())
            .record(duration_secs);

        gauge!("inventory_resources_total", "service" => kind.to_string()).set(resources as f64);
    }

    /// Record a pipeline whose listing failed
    pub fn record_pipeline_failed(kind: ServiceKind, duration_secs: f64) {
        counter!(
            "inventory_pipeline_runs_total",
            "service" => kind.to_string(),
            "status" => "failed"
        )
        .increment(1);

        histogram!("inventory_pipeline_duration_seconds", "service" => kind.to_string())
            .record(duration_secs);
    }

    // =========================================================================
    // Cost Metrics
    // =========================================================================

    /// Record a resource whose cost could not be estimated
    pub fn record_unknown_cost(kind: ServiceKind, reason: UnknownCost) {
        counter!(
            "inventory_unknown_cost_total",
            "service" => kind.to_string(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    /// Set the estimated monthly cost of a service kind
    pub fn set_estimated_monthly_cost(kind: ServiceKind, cost: f64) {
        gauge!("inventory_estimated_monthly_cost", "service" => kind.to_string()).set(cost);
    }
}
