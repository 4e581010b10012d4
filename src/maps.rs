// 🗺️ Map Links - Severity tier → map search URL
// String templating only. Nothing here touches the network.

use crate::severity::SeverityTier;

pub const DEFAULT_MAPS_BASE_URL: &str = "https://www.google.com/maps/search/";

pub const TRAUMA_QUERY: &str = "trauma hospital near me";
pub const HOSPITAL_QUERY: &str = "hospital near me";

/// Search phrase for a tier
pub fn query_for(tier: SeverityTier) -> &'static str {
    match tier {
        SeverityTier::Severe => TRAUMA_QUERY,
        SeverityTier::Urgent => HOSPITAL_QUERY,
    }
}

/// Map search link for a tier against the default base URL
pub fn build_maps_link(tier: SeverityTier) -> String {
    build_maps_link_with_base(DEFAULT_MAPS_BASE_URL, tier)
}

/// Map search link against a configured base URL.
/// Words are percent-encoded and joined with `+`.
pub fn build_maps_link_with_base(base_url: &str, tier: SeverityTier) -> String {
    let query = query_for(tier)
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+");

    if base_url.ends_with('/') {
        format!("{}{}", base_url, query)
    } else {
        format!("{}/{}", base_url, query)
    }
}
