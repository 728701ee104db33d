//! Logging, error reporting and metrics setup.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

use crate::config::Environment;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install color-eyre with a project-standard configuration.
///
/// Safe to call multiple times.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Initialize tracing with environment-aware configuration and error span capture.
///
/// - **Production** (`APP_ENV=production`): JSON lines, module targets hidden
/// - **Development** (default): pretty-printed output
///
/// `RUST_LOG` overrides the default filter. Calling this twice is harmless.
pub fn init_tracing(environment: &Environment) {
    let is_production = environment.is_production();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("debug,reqwest=info,hyper=info")
        }
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    if result.is_ok() {
        info!(environment = ?environment, "Tracing initialized");
    }
}

/// Initialize the Prometheus metrics recorder.
///
/// Returns `None` when another recorder is already installed; metrics are
/// then silently dropped rather than failing the run.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    let installed = METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();
        Ok::<_, BuildError>(handle)
    });

    match installed {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
            None
        }
    }
}

/// Render the current metrics in Prometheus exposition format
pub fn render_metrics() -> String {
    match METRICS_HANDLE.get() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    describe_counter!(
        "inventory_collections_total",
        "Inventory collection runs by account and status"
    );
    describe_gauge!(
        "inventory_resources_last_run",
        "Resources inventoried in the last run of an account"
    );
    describe_counter!(
        "inventory_pipeline_runs_total",
        "Resource type pipeline runs by status"
    );
    describe_histogram!(
        "inventory_pipeline_duration_seconds",
        "Resource type pipeline duration in seconds"
    );
    describe_gauge!(
        "inventory_resources_total",
        "Resources listed by the last pipeline run of a type"
    );
    describe_counter!(
        "inventory_unknown_cost_total",
        "Resources whose monthly cost could not be estimated"
    );
    describe_gauge!(
        "inventory_estimated_monthly_cost",
        "Estimated monthly cost of the last run by resource type"
    );
}
