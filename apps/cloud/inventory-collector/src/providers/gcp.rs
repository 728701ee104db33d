//! GCP Compute Engine inventory provider
//!
//! Lists disks and addresses through the Compute Engine aggregated list API.
//! https://cloud.google.com/compute/docs/reference/rest/v1/disks/aggregatedList

use async_trait::async_trait;
use domain_inventory::{
    AccountContext, AggregatedLister, AggregatedPage, BillingAttributes, FetchResult,
    InventoryRecord, ScopeBucket, ServiceKind,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ProviderError, ProviderResult};
use crate::config::GcpConfig;

/// Scope name used by the API for resources without a region
const GLOBAL_SCOPE: &str = "global";

/// Warning code the API puts on scopes that hold no resources
const NO_RESULTS_WARNING: &str = "NO_RESULTS_ON_PAGE";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity of a listed record.
///
/// The numeric id is used when present; records without one fall back to
/// their self link and then to `location/name`, which are unique per project.
fn record_identity(
    id: &str,
    self_link: Option<&str>,
    location: Option<&str>,
    name: &str,
) -> String {
    if !id.is_empty() {
        return id.to_string();
    }
    let fallback = match self_link.filter(|link| !link.is_empty()) {
        Some(link) => link.to_string(),
        None => format!("{}/{}", location.unwrap_or(GLOBAL_SCOPE), name),
    };
    warn!(name = name, identity = %fallback, "Record has no id, using fallback identity");
    fallback
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedListResponse<T> {
    items: Option<BTreeMap<String, ScopedList<T>>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScopedList<T> {
    #[serde(alias = "disks", alias = "addresses")]
    records: Option<Vec<T>>,
    warning: Option<ScopeWarning>,
}

#[derive(Debug, Deserialize)]
struct ScopeWarning {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GcpErrorBody {
    error: GcpErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GcpErrorDetail {
    message: String,
}

/// Persistent disk as returned by the API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpDisk {
    /// uint64 encoded as a string
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub self_link: Option<String>,
    /// int64 encoded as a string
    pub size_gb: Option<String>,
    /// Disk type URL, ending in e.g. `pd-balanced`
    #[serde(rename = "type")]
    pub disk_type: Option<String>,
    /// Zone URL, set for zonal disks
    pub zone: Option<String>,
    /// Region URL, set for regional disks
    pub region: Option<String>,
    #[serde(default)]
    pub replica_zones: Vec<String>,
    pub labels: Option<HashMap<String, String>>,
    pub status: Option<String>,
}

impl GcpDisk {
    fn is_regional(&self) -> bool {
        (self.zone.is_none() && self.region.is_some()) || !self.replica_zones.is_empty()
    }

    fn parsed_size_gb(&self) -> Option<i64> {
        let raw = self.size_gb.as_deref()?;
        match raw.parse::<i64>() {
            Ok(size) => Some(size),
            Err(e) => {
                warn!(disk = %self.name, size_gb = raw, error = %e, "Unparseable disk size");
                None
            }
        }
    }
}

impl InventoryRecord for GcpDisk {
    fn service_kind(&self) -> ServiceKind {
        ServiceKind::ComputeDisk
    }

    fn resource_id(&self) -> String {
        record_identity(&self.id, self.self_link.as_deref(), self.location_ref(), &self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn location_ref(&self) -> Option<&str> {
        self.zone.as_deref().or(self.region.as_deref())
    }

    fn labels(&self) -> Option<&HashMap<String, String>> {
        self.labels.as_ref()
    }

    fn billing_attributes(&self) -> BillingAttributes {
        BillingAttributes {
            size_gb: self.parsed_size_gb(),
            type_discriminator: self.disk_type.clone(),
            location_ref: self.location_ref().map(str::to_string),
            regional: self.is_regional(),
            status: self.status.clone(),
        }
    }
}

/// Reserved IP address as returned by the API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpAddress {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub self_link: Option<String>,
    /// `RESERVING`, `RESERVED` or `IN_USE`
    pub status: Option<String>,
    /// `EXTERNAL` or `INTERNAL`; the API omits it for external addresses
    pub address_type: Option<String>,
    /// Region URL, absent for global addresses
    pub region: Option<String>,
    pub labels: Option<HashMap<String, String>>,
}

impl InventoryRecord for GcpAddress {
    fn service_kind(&self) -> ServiceKind {
        ServiceKind::ComputeAddress
    }

    fn resource_id(&self) -> String {
        record_identity(&self.id, self.self_link.as_deref(), self.location_ref(), &self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn location_ref(&self) -> Option<&str> {
        Some(self.region.as_deref().unwrap_or(GLOBAL_SCOPE))
    }

    fn labels(&self) -> Option<&HashMap<String, String>> {
        self.labels.as_ref()
    }

    fn billing_attributes(&self) -> BillingAttributes {
        BillingAttributes {
            type_discriminator: Some(
                self.address_type
                    .clone()
                    .unwrap_or_else(|| "EXTERNAL".to_string()),
            ),
            location_ref: self.location_ref().map(str::to_string),
            status: self.status.clone(),
            ..Default::default()
        }
    }
}

/// Compute Engine REST client shared by the listers
#[derive(Debug, Clone)]
pub struct GcpComputeClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl GcpComputeClient {
    pub fn new(config: &GcpConfig) -> ProviderResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.compute_api.clone(),
            page_size: config.page_size,
        })
    }

    fn aggregated_url(&self, project: &str, collection: &str, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/projects/{}/aggregated/{}?maxResults={}",
            self.base_url,
            urlencoding::encode(project),
            collection,
            self.page_size
        );
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    /// Fetch one page of an aggregated listing
    async fn aggregated_page<T: DeserializeOwned>(
        &self,
        account: &AccountContext,
        collection: &str,
        page_token: Option<String>,
    ) -> ProviderResult<AggregatedPage<T>> {
        let url = self.aggregated_url(&account.project, collection, page_token.as_deref());
        debug!(project = %account.project, collection = collection, "Requesting aggregated page");

        let response = self
            .client
            .get(&url)
            .bearer_auth(account.token.secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body, status);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::AuthError(message)
                }
                _ => ProviderError::ApiError {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let body = response.bytes().await?;
        parse_aggregated_page(&body)
    }
}

/// Human-readable message from an API error body
fn extract_error_message(body: &str, status: StatusCode) -> String {
    match serde_json::from_str::<GcpErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    }
}

fn parse_aggregated_page<T: DeserializeOwned>(body: &[u8]) -> ProviderResult<AggregatedPage<T>> {
    let response: AggregatedListResponse<T> =
        serde_json::from_slice(body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    let buckets = response
        .items
        .unwrap_or_default()
        .into_iter()
        .map(|(scope, list)| {
            if let Some(warning) = &list.warning {
                let code = warning.code.as_deref().unwrap_or_default();
                if code != NO_RESULTS_WARNING {
                    warn!(
                        scope = %scope,
                        code = code,
                        message = warning.message.as_deref().unwrap_or_default(),
                        "Scope returned a warning"
                    );
                }
            }
            ScopeBucket {
                scope,
                records: list.records.unwrap_or_default(),
            }
        })
        .collect();

    Ok(AggregatedPage {
        buckets,
        next_page_token: response.next_page_token,
    })
}

/// Lister for `aggregated/disks`
pub struct DiskLister {
    client: Arc<GcpComputeClient>,
}

impl DiskLister {
    pub fn new(client: Arc<GcpComputeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AggregatedLister for DiskLister {
    type Record = GcpDisk;

    async fn list_page(
        &self,
        account: &AccountContext,
        page_token: Option<String>,
    ) -> FetchResult<AggregatedPage<GcpDisk>> {
        Ok(self.client.aggregated_page(account, "disks", page_token).await?)
    }
}

/// Lister for `aggregated/addresses`
pub struct AddressLister {
    client: Arc<GcpComputeClient>,
}

impl AddressLister {
    pub fn new(client: Arc<GcpComputeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AggregatedLister for AddressLister {
    type Record = GcpAddress;

    async fn list_page(
        &self,
        account: &AccountContext,
        page_token: Option<String>,
    ) -> FetchResult<AggregatedPage<GcpAddress>> {
        Ok(self.client.aggregated_page(account, "addresses", page_token).await?)
    }
}
