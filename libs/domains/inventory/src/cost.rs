//! Monthly cost estimation.
//!
//! Disks are billed on provisioned capacity: one catalog price per GB-month,
//! keyed by tier, zonal/regional variant and pricing region. Static external
//! addresses are billed per address at a rate that depends on whether they
//! are attached. Any input that cannot be priced produces
//! [`CostEstimate::Unknown`] rather than an error so a single odd record never
//! stops a collection run.

use serde::Serialize;
use strum::Display;
use tracing::{debug, warn};

use crate::catalog::{EXTERNAL_ADDRESS_PRODUCT, PERSISTENT_DISK_PRODUCT, PricingCatalog};
use crate::locator::Location;
use crate::models::{BillingAttributes, ServiceKind};

/// Persistent disk performance tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiskTier {
    Ssd,
    Balanced,
    Standard,
    Extreme,
    Unknown,
}

/// Map a raw disk type (name or URL) onto a tier.
///
/// Only the last path segment is considered; anything unrecognised is
/// `Unknown`.
pub fn classify_disk_tier(discriminator: &str) -> DiskTier {
    let name = discriminator.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    match name.to_ascii_lowercase().as_str() {
        "pd-ssd" => DiskTier::Ssd,
        "pd-balanced" => DiskTier::Balanced,
        "pd-standard" => DiskTier::Standard,
        "pd-extreme" => DiskTier::Extreme,
        _ => DiskTier::Unknown,
    }
}

/// Why a cost could not be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnknownCost {
    /// Type, size or location was not reported
    MissingAttributes,
    /// Type did not map to a known tier
    UnknownTier,
    /// Tier is known but has no cost model yet
    UnsupportedTier,
    /// No catalog price for the tier in the pricing region
    CatalogMiss,
}

/// Outcome of a cost estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CostEstimate {
    Priced { monthly: f64 },
    Unknown { reason: UnknownCost },
}

impl CostEstimate {
    fn priced(monthly: f64) -> Self {
        CostEstimate::Priced {
            monthly: monthly.max(0.0),
        }
    }

    fn unknown(reason: UnknownCost) -> Self {
        CostEstimate::Unknown { reason }
    }

    /// Monthly cost, `0.0` when unknown
    pub fn monthly(&self) -> f64 {
        match self {
            CostEstimate::Priced { monthly } => *monthly,
            CostEstimate::Unknown { .. } => 0.0,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, CostEstimate::Priced { .. })
    }

    pub fn unknown_reason(&self) -> Option<UnknownCost> {
        match self {
            CostEstimate::Priced { .. } => None,
            CostEstimate::Unknown { reason } => Some(*reason),
        }
    }
}

/// Catalog tier key for a capacity-billed disk tier, `None` when unmodelled
fn capacity_sku(tier: DiskTier, regional: bool) -> Option<&'static str> {
    match (tier, regional) {
        (DiskTier::Balanced, false) => Some("Storagepdssdlitecapacity"),
        (DiskTier::Balanced, true) => Some("Storageregionalpdssdlitecapacity"),
        (DiskTier::Ssd, false) => Some("Storagepdssdcapacity"),
        (DiskTier::Ssd, true) => Some("Storageregionalpdssdcapacity"),
        (DiskTier::Standard, false) => Some("Storagepdcapacity"),
        (DiskTier::Standard, true) => Some("Storageregionalpdcapacity"),
        // Extreme also bills provisioned IOPS, which listings do not carry
        (DiskTier::Extreme, _) => None,
        (DiskTier::Unknown, _) => None,
    }
}

/// Dispatch to the cost model of a service kind
pub fn estimate_cost(
    kind: ServiceKind,
    attrs: &BillingAttributes,
    catalog: &PricingCatalog,
) -> CostEstimate {
    match kind {
        ServiceKind::ComputeDisk => estimate_disk_cost(attrs, catalog),
        ServiceKind::ComputeAddress => estimate_address_cost(attrs, catalog),
    }
}

/// Estimate the monthly cost of a persistent disk
pub fn estimate_disk_cost(attrs: &BillingAttributes, catalog: &PricingCatalog) -> CostEstimate {
    let (Some(discriminator), Some(size_gb)) = (attrs.type_discriminator.as_deref(), attrs.size_gb)
    else {
        debug!(
            has_type = attrs.type_discriminator.is_some(),
            has_size = attrs.size_gb.is_some(),
            "Disk type or size missing, cost unknown"
        );
        return CostEstimate::unknown(UnknownCost::MissingAttributes);
    };
    if size_gb < 0 {
        warn!(size_gb = size_gb, "Negative disk size reported, cost unknown");
        return CostEstimate::unknown(UnknownCost::MissingAttributes);
    }

    let tier = classify_disk_tier(discriminator);
    let sku = match tier {
        DiskTier::Unknown => {
            debug!(disk_type = discriminator, "Unrecognised disk type, cost unknown");
            return CostEstimate::unknown(UnknownCost::UnknownTier);
        }
        DiskTier::Ssd | DiskTier::Balanced | DiskTier::Standard | DiskTier::Extreme => {
            match capacity_sku(tier, attrs.regional) {
                Some(sku) => sku,
                None => {
                    debug!(tier = %tier, "Disk tier has no cost model yet");
                    return CostEstimate::unknown(UnknownCost::UnsupportedTier);
                }
            }
        }
    };

    let Some(location) = attrs.location_ref.as_deref().and_then(Location::parse) else {
        debug!(tier = %tier, "Disk location missing, cost unknown");
        return CostEstimate::unknown(UnknownCost::MissingAttributes);
    };
    let region = location.pricing_region();

    match catalog.lookup(PERSISTENT_DISK_PRODUCT, sku, &region) {
        Some(price) => CostEstimate::priced(price.times(size_gb)),
        None => {
            debug!(sku = sku, region = %region, "No catalog price for disk, cost unknown");
            CostEstimate::unknown(UnknownCost::CatalogMiss)
        }
    }
}

/// Estimate the monthly cost of a reserved IP address.
///
/// Internal addresses are free; external ones are priced by attachment state.
pub fn estimate_address_cost(attrs: &BillingAttributes, catalog: &PricingCatalog) -> CostEstimate {
    let Some(address_type) = attrs.type_discriminator.as_deref() else {
        debug!("Address type missing, cost unknown");
        return CostEstimate::unknown(UnknownCost::MissingAttributes);
    };

    let sku = match (
        address_type.to_ascii_uppercase().as_str(),
        attrs.status.as_deref(),
    ) {
        ("INTERNAL", _) => return CostEstimate::priced(0.0),
        ("EXTERNAL", Some("IN_USE")) => "StaticIpInUse",
        ("EXTERNAL", Some("RESERVED")) => "StaticIpUnused",
        ("EXTERNAL", status) => {
            debug!(status = ?status, "Address status has no rate, cost unknown");
            return CostEstimate::unknown(UnknownCost::MissingAttributes);
        }
        (other, _) => {
            debug!(address_type = other, "Unrecognised address type, cost unknown");
            return CostEstimate::unknown(UnknownCost::UnknownTier);
        }
    };

    let region = attrs
        .location_ref
        .as_deref()
        .and_then(Location::parse)
        .map(|location| location.pricing_region())
        .unwrap_or_else(|| "global".to_string());

    match catalog.lookup(EXTERNAL_ADDRESS_PRODUCT, sku, &region) {
        Some(price) => CostEstimate::priced(price.to_decimal()),
        None => {
            debug!(sku = sku, region = %region, "No catalog price for address, cost unknown");
            CostEstimate::unknown(UnknownCost::CatalogMiss)
        }
    }
}
