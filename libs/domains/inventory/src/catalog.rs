//! Pricing catalog snapshot.
//!
//! The catalog is a nested map `product line -> tier -> region -> prices`.
//! It is loaded once per collection run and only read afterwards, so
//! pipelines share it behind an `Arc` without locking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::CatalogLoadError;

/// Product line holding persistent disk capacity prices
pub const PERSISTENT_DISK_PRODUCT: &str = "compute/persistent-disk";

/// Product line holding static external IP address prices
pub const EXTERNAL_ADDRESS_PRODUCT: &str = "compute/external-ip";

/// Largest decimal exponent accepted from a snapshot
pub const MAX_PRICE_EXPONENT: u32 = 18;

/// Monthly unit rate stored as an integer in currency subunits.
///
/// The decimal value is `amount * 10^-exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPrice {
    pub amount: i64,
    pub exponent: u32,
}

impl UnitPrice {
    pub fn new(amount: i64, exponent: u32) -> Self {
        Self { amount, exponent }
    }

    /// Build from the `{units, nanos}` money representation used by billing APIs
    pub fn from_units_and_nanos(units: i64, nanos: i32) -> Self {
        Self {
            amount: units * 1_000_000_000 + i64::from(nanos),
            exponent: 9,
        }
    }

    pub fn to_decimal(&self) -> f64 {
        self.amount as f64 / 10f64.powi(self.exponent as i32)
    }

    /// Price of `quantity` units.
    ///
    /// Multiplies before scaling so integral inputs stay exact.
    pub fn times(&self, quantity: i64) -> f64 {
        (self.amount as f64 * quantity as f64) / 10f64.powi(self.exponent as i32)
    }
}

/// Immutable snapshot of price entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingCatalog {
    products: HashMap<String, HashMap<String, HashMap<String, Vec<UnitPrice>>>>,
}

impl PricingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON snapshot, rejecting negative prices and out-of-range exponents
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CatalogLoadError> {
        let catalog: PricingCatalog = serde_json::from_slice(bytes)
            .map_err(|e| CatalogLoadError::Invalid(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogLoadError> {
        for (product_line, tiers) in &self.products {
            for (tier, regions) in tiers {
                for (region, prices) in regions {
                    if prices.iter().any(|p| p.amount < 0) {
                        return Err(CatalogLoadError::Invalid(format!(
                            "negative price for {}/{} in {}",
                            product_line, tier, region
                        )));
                    }
                    if let Some(p) = prices.iter().find(|p| p.exponent > MAX_PRICE_EXPONENT) {
                        return Err(CatalogLoadError::Invalid(format!(
                            "exponent {} out of range for {}/{} in {}",
                            p.exponent, product_line, tier, region
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Append a price to the ordered sequence at the given path
    pub fn insert(
        &mut self,
        product_line: impl Into<String>,
        tier: impl Into<String>,
        region: impl Into<String>,
        price: UnitPrice,
    ) -> &mut Self {
        self.products
            .entry(product_line.into())
            .or_default()
            .entry(tier.into())
            .or_default()
            .entry(region.into())
            .or_default()
            .push(price);
        self
    }

    /// Effective price at a path; `None` on a miss at any level
    pub fn lookup(&self, product_line: &str, tier: &str, region: &str) -> Option<UnitPrice> {
        self.products
            .get(product_line)?
            .get(tier)?
            .get(region)?
            .first()
            .copied()
    }

    /// Number of priced (product line, tier, region) paths
    pub fn len(&self) -> usize {
        self.products
            .values()
            .flat_map(|tiers| tiers.values())
            .map(|regions| regions.values().filter(|p| !p.is_empty()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Priced region count per `(product line, tier)`, ordered for display
    pub fn summary(&self) -> BTreeMap<(String, String), usize> {
        let mut summary = BTreeMap::new();
        for (product_line, tiers) in &self.products {
            for (tier, regions) in tiers {
                let priced = regions.values().filter(|p| !p.is_empty()).count();
                summary.insert((product_line.clone(), tier.clone()), priced);
            }
        }
        summary
    }
}

/// Where a collection run gets its pricing snapshot from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load(&self) -> Result<PricingCatalog, CatalogLoadError>;
}

/// Source returning a catalog that is already in memory
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    catalog: PricingCatalog,
}

impl StaticCatalogSource {
    pub fn new(catalog: PricingCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn load(&self) -> Result<PricingCatalog, CatalogLoadError> {
        Ok(self.catalog.clone())
    }
}
