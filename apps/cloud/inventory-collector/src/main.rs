//! Inventory Collector
//!
//! Lists billable GCP Compute Engine resources for a project and estimates
//! their monthly cost from a pricing snapshot. Can run as a one-shot
//! collection or as a scheduled cron job.

use clap::{Parser, Subcommand};
use eyre::Result;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod collector;
mod config;
mod providers;
mod telemetry;

use collector::InventoryService;
use config::{Config, Environment, FromEnv};
use telemetry::{init_metrics, init_tracing, install_color_eyre, render_metrics};

#[derive(Parser)]
#[command(name = "inventory-collector")]
#[command(about = "Inventory GCP resources and estimate their monthly cost")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print Prometheus metrics to stderr when the command finishes
    #[arg(long, global = true)]
    print_metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a one-time collection
    Collect {
        /// Write the inventory JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Run as a scheduled service
    Schedule {
        /// Cron expression for scheduling (default: every 6 hours)
        #[arg(short, long, default_value = "0 0 */6 * * *")]
        cron: String,

        /// Write each run's inventory JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load the pricing snapshot and show what it covers
    Catalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_metrics();

    let service = InventoryService::new(config)?;

    // Ctrl-C cancels whatever is in flight
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, cancelling");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for interrupt"),
        }
    });

    match cli.command {
        Commands::Collect { output, compact } => {
            info!("Starting one-time inventory collection");

            let result = service.collect(&cancel).await?;
            InventoryService::write_output(&result, output.as_deref(), compact).await?;

            info!(
                resources = result.resource_count,
                total_monthly_cost = result.total_monthly_cost,
                unknown_costs = result.unknown_cost_count,
                failed_types = result.failures.len(),
                "Collection complete"
            );
        }

        Commands::Schedule { cron, output } => {
            service.run_scheduled(&cron, output.as_deref(), &cancel).await?;
        }

        Commands::Catalog => {
            let summary = service.catalog_summary().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    if cli.print_metrics {
        eprintln!("{}", render_metrics());
    }

    Ok(())
}
