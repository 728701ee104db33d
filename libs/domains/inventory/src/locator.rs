//! Location reference parsing.
//!
//! Providers hand back locations as path-like URLs such as
//! `https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a`.
//! Pricing is keyed by region, so zonal references are reduced to their
//! parent region before a catalog lookup.

/// Last non-empty segment of a location reference
pub fn region_from_location_ref(location_ref: &str) -> String {
    location_ref
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Strip the trailing zone suffix (`us-central1-a` -> `us-central1`).
///
/// Region-form input is returned unchanged.
pub fn parent_region_of_zone(zone: &str) -> String {
    match zone.rsplit_once('-') {
        Some((region, suffix)) if !region.is_empty() && is_zone_suffix(suffix) => {
            region.to_string()
        }
        _ => zone.to_string(),
    }
}

fn is_zone_suffix(suffix: &str) -> bool {
    suffix.len() == 1 && suffix.bytes().all(|b| b.is_ascii_lowercase())
}

/// Zonal or regional placement of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Zone(String),
    Region(String),
}

impl Location {
    /// Classify a location reference.
    ///
    /// Uses the `zones`/`regions` path segment when present, otherwise the
    /// zone-suffix rule on the bare name. Empty references yield `None`.
    pub fn parse(location_ref: &str) -> Option<Self> {
        let trimmed = location_ref.trim_end_matches('/');
        let name = region_from_location_ref(trimmed);
        if name.is_empty() {
            return None;
        }

        let location = match trimmed.rsplit('/').nth(1) {
            Some("zones") => Location::Zone(name),
            Some("regions") => Location::Region(name),
            _ if parent_region_of_zone(&name) != name => Location::Zone(name),
            _ => Location::Region(name),
        };
        Some(location)
    }

    pub fn name(&self) -> &str {
        match self {
            Location::Zone(name) | Location::Region(name) => name,
        }
    }

    /// Region used for pricing lookups
    pub fn pricing_region(&self) -> String {
        match self {
            Location::Zone(zone) => parent_region_of_zone(zone),
            Location::Region(region) => region.clone(),
        }
    }

    /// Path segment used in console URLs
    pub fn scope_segment(&self) -> &'static str {
        match self {
            Location::Zone(_) => "zones",
            Location::Region(_) => "regions",
        }
    }
}
