//! Pricing snapshot loader
//!
//! Reads a JSON catalog snapshot from disk or over HTTP at the start of
//! every run.

use async_trait::async_trait;
use domain_inventory::{CatalogLoadError, CatalogSource, PricingCatalog};
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;

use super::{ProviderError, ProviderResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum SnapshotLocation {
    File(PathBuf),
    Url(String),
}

/// Catalog source backed by a JSON snapshot
#[derive(Debug, Clone)]
pub struct SnapshotCatalogSource {
    location: SnapshotLocation,
    client: Client,
}

impl SnapshotCatalogSource {
    /// `source` is an `http(s)://` URL or a filesystem path
    pub fn new(source: &str, client: Client) -> Self {
        let location = if source.starts_with("http://") || source.starts_with("https://") {
            SnapshotLocation::Url(source.to_string())
        } else {
            SnapshotLocation::File(PathBuf::from(source))
        };
        Self { location, client }
    }

    async fn read_snapshot(&self) -> ProviderResult<Vec<u8>> {
        match &self.location {
            SnapshotLocation::File(path) => Ok(tokio::fs::read(path).await?),
            SnapshotLocation::Url(url) => {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ProviderError::ApiError {
                        status: status.as_u16(),
                        message: format!("pricing snapshot request to {} failed", url),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

#[async_trait]
impl CatalogSource for SnapshotCatalogSource {
    async fn load(&self) -> Result<PricingCatalog, CatalogLoadError> {
        let bytes = self.read_snapshot().await?;
        let catalog = PricingCatalog::from_json_slice(&bytes)?;
        info!(location = ?self.location, prices = catalog.len(), "Loaded pricing snapshot");
        Ok(catalog)
    }
}
