use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use strum::{Display, EnumString};

use crate::locator::Location;

/// Cloud provider enumeration
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum CloudProvider {
    #[default]
    Gcp,
}

/// Kind of billable resource a pipeline enumerates
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
pub enum ServiceKind {
    #[serde(rename = "Compute Disk")]
    #[strum(serialize = "Compute Disk")]
    ComputeDisk,
    #[serde(rename = "Compute Address")]
    #[strum(serialize = "Compute Address")]
    ComputeAddress,
}

const CONSOLE_BASE_URL: &str = "https://console.cloud.google.com";

impl ServiceKind {
    pub fn provider(&self) -> CloudProvider {
        match self {
            ServiceKind::ComputeDisk | ServiceKind::ComputeAddress => CloudProvider::Gcp,
        }
    }

    /// Best-effort console URL for a resource of this kind
    pub fn console_link(&self, location: Option<&Location>, name: &str, project: &str) -> String {
        match (self, location) {
            (ServiceKind::ComputeDisk, Some(location)) => format!(
                "{}/compute/disksDetail/{}/{}/disks/{}?project={}",
                CONSOLE_BASE_URL,
                location.scope_segment(),
                location.name(),
                name,
                project
            ),
            (ServiceKind::ComputeDisk, None) => {
                format!("{}/compute/disks?project={}", CONSOLE_BASE_URL, project)
            }
            // Addresses have no stable per-resource page
            (ServiceKind::ComputeAddress, _) => {
                format!("{}/networking/addresses/list?project={}", CONSOLE_BASE_URL, project)
            }
        }
    }
}

/// Key-value tag copied from provider labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Canonical inventory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub provider: CloudProvider,
    pub account: String,
    pub service_kind: ServiceKind,
    /// Provider-unique identifier
    pub resource_id: String,
    /// Zone or region the resource lives in
    pub region: String,
    pub name: String,
    pub fetched_at: DateTime<Utc>,
    /// Estimated monthly cost, `0.0` when unknown
    pub estimated_monthly_cost: f64,
    /// False when `estimated_monthly_cost` is a placeholder rather than a priced value
    pub cost_known: bool,
    pub tags: Vec<Tag>,
    /// Best-effort console URL
    pub link: String,
}

impl Resource {
    /// Identity of the resource across a collection run
    pub fn identity(&self) -> (CloudProvider, &str, &str) {
        (self.provider, &self.account, &self.resource_id)
    }
}

/// Opaque credential handed through to listers.
///
/// The inventory core never inspects it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Account being inventoried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    /// Display name stamped on every resource
    pub account: String,
    /// Provider project the listing runs against
    pub project: String,
    pub token: AccessToken,
}

impl AccountContext {
    pub fn new(account: impl Into<String>, project: impl Into<String>, token: AccessToken) -> Self {
        Self {
            account: account.into(),
            project: project.into(),
            token,
        }
    }
}

/// Attributes a cost model needs; absent fields mean "uncomputable"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingAttributes {
    pub size_gb: Option<i64>,
    /// Raw type string, e.g. a disk type URL ending in `pd-balanced`
    pub type_discriminator: Option<String>,
    pub location_ref: Option<String>,
    /// Billed per region (replicated) rather than per zone
    pub regional: bool,
    /// Lifecycle state when it changes the rate, e.g. an address being `IN_USE`
    pub status: Option<String>,
}

/// Raw provider record that can flow through a listing pipeline
pub trait InventoryRecord: Send {
    fn service_kind(&self) -> ServiceKind;

    fn resource_id(&self) -> String;

    fn name(&self) -> &str;

    /// Provider location reference (zone or region URL)
    fn location_ref(&self) -> Option<&str>;

    fn labels(&self) -> Option<&HashMap<String, String>>;

    fn billing_attributes(&self) -> BillingAttributes;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_provider_displays_uppercase() {
        assert_eq!(CloudProvider::Gcp.to_string(), "GCP");
        assert_eq!(serde_json::to_string(&CloudProvider::Gcp).unwrap(), "\"GCP\"");
    }

    #[test]
    fn test_service_kind_round_trips_through_display() {
        let kind = ServiceKind::ComputeDisk;
        assert_eq!(kind.to_string(), "Compute Disk");
        assert_eq!(ServiceKind::from_str("Compute Disk").unwrap(), kind);
        assert_eq!(kind.provider(), CloudProvider::Gcp);
        assert_eq!(ServiceKind::ComputeAddress.to_string(), "Compute Address");
    }

    #[test]
    fn test_console_links() {
        let zone = Location::Zone("us-central1-a".to_string());
        assert_eq!(
            ServiceKind::ComputeDisk.console_link(Some(&zone), "data", "demo"),
            "https://console.cloud.google.com/compute/disksDetail/zones/us-central1-a/disks/data?project=demo"
        );
        assert_eq!(
            ServiceKind::ComputeDisk.console_link(None, "data", "demo"),
            "https://console.cloud.google.com/compute/disks?project=demo"
        );
        assert_eq!(
            ServiceKind::ComputeAddress.console_link(Some(&zone), "ip", "demo"),
            "https://console.cloud.google.com/networking/addresses/list?project=demo"
        );
    }

    #[test]
    fn test_access_token_is_redacted_in_debug() {
        let ctx = AccountContext::new("prod", "my-project", AccessToken::new("ya29.secret"));
        let debug = format!("{:?}", ctx);
        assert!(!debug.contains("ya29.secret"));
        assert!(debug.contains("AccessToken(***)"));
        assert_eq!(ctx.token.secret(), "ya29.secret");
    }
}
