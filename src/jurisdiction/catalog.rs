use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;

static US_STATES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
        "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
        "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
        "VA", "WA", "WV", "WI", "WY", "DC",
    ]
    .into_iter()
    .collect()
});

static US_TERRITORIES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["PR", "VI", "GU", "AS", "MP"].into_iter().collect());

static CANADIAN_PROVINCES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU", "ON", "PE", "PQ", "SK", "YT",
    ]
    .into_iter()
    .collect()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum JurisdictionKind {
    UsState,
    UsTerritory,
    CanadianProvince,
    Other,
}

impl JurisdictionKind {
    pub fn of(code: &str) -> Self {
        if US_STATES.contains(code) {
            JurisdictionKind::UsState
        } else if US_TERRITORIES.contains(code) {
            JurisdictionKind::UsTerritory
        } else if CANADIAN_PROVINCES.contains(code) {
            JurisdictionKind::CanadianProvince
        } else {
            JurisdictionKind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JurisdictionKind::UsState => "US States/DC",
            JurisdictionKind::UsTerritory => "US Territories",
            JurisdictionKind::CanadianProvince => "Canadian Provinces",
            JurisdictionKind::Other => "Other",
        }
    }

    pub fn is_north_american(&self) -> bool {
        !matches!(self, JurisdictionKind::Other)
    }
}
