use chrono::{DateTime, Utc};

use crate::cost::CostEstimate;
use crate::locator::{Location, region_from_location_ref};
use crate::models::{AccountContext, InventoryRecord, Resource, Tag};

/// Build the canonical resource for a raw record. Performs no I/O.
pub fn normalize<R: InventoryRecord + ?Sized>(
    record: &R,
    cost: CostEstimate,
    account: &AccountContext,
    fetched_at: DateTime<Utc>,
) -> Resource {
    let kind = record.service_kind();
    let location = record.location_ref().and_then(Location::parse);
    let region = match &location {
        Some(location) => location.name().to_string(),
        None => record
            .location_ref()
            .map(region_from_location_ref)
            .unwrap_or_default(),
    };

    let link = kind.console_link(location.as_ref(), record.name(), &account.project);

    Resource {
        provider: kind.provider(),
        account: account.account.clone(),
        service_kind: kind,
        resource_id: record.resource_id(),
        region,
        name: record.name().to_string(),
        fetched_at,
        estimated_monthly_cost: cost.monthly(),
        cost_known: cost.is_known(),
        tags: tags_from_labels(record),
        link,
    }
}

fn tags_from_labels<R: InventoryRecord + ?Sized>(record: &R) -> Vec<Tag> {
    let mut tags: Vec<Tag> = record
        .labels()
        .map(|labels| labels.iter().map(|(k, v)| Tag::new(k, v)).collect())
        .unwrap_or_default();
    tags.sort_by(|a, b| a.key.cmp(&b.key));
    tags
}
