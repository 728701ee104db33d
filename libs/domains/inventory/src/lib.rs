//! Inventory Domain
//!
//! Enumerates billable cloud resources for an account and attaches an
//! estimated monthly cost to each one.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ InventoryCollector  │  ← Loads the catalog, fans out one task per type
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐
//! │  ResourcePipeline   │  ← List → estimate cost → normalize
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐     ┌────────────────┐
//! │ AggregatedLister    │     │ PricingCatalog │  ← Immutable snapshot
//! └─────────────────────┘     └────────────────┘
//! ```
//!
//! Provider I/O lives behind [`AggregatedLister`] and [`CatalogSource`];
//! everything else here is pure and deterministic.

pub mod catalog;
pub mod collector;
pub mod cost;
pub mod error;
pub mod fetcher;
pub mod locator;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod pipeline;

// Re-export commonly used types
pub use catalog::{
    CatalogSource, EXTERNAL_ADDRESS_PRODUCT, MAX_PRICE_EXPONENT, PERSISTENT_DISK_PRODUCT,
    PricingCatalog, StaticCatalogSource, UnitPrice,
};
pub use collector::{InventoryCollector, InventoryReport};
pub use cost::{CostEstimate, DiskTier, UnknownCost, estimate_cost};
pub use error::{CatalogLoadError, CollectError, CollectResult, FetchError, FetchResult};
pub use fetcher::{AggregatedLister, AggregatedPage, ScopeBucket, fetch_aggregated};
pub use locator::Location;
pub use metrics::InventoryMetrics;
pub use models::{
    AccessToken, AccountContext, BillingAttributes, CloudProvider, InventoryRecord, Resource,
    ServiceKind, Tag,
};
pub use normalizer::normalize;
pub use pipeline::{ListingPipeline, PipelineOutcome, ResourcePipeline};
