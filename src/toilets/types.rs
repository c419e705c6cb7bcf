//! Proximity query types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::geo::Coordinate;

pub const MIN_RADIUS_M: u32 = 500;
pub const MAX_RADIUS_M: u32 = 5000;
pub const DEFAULT_RADIUS_M: u32 = 1500;

/// Name shown for toilets with no `name` tag.
pub const FALLBACK_NAME: &str = "Public Toilet";

/// Search radius in meters, always within `MIN_RADIUS_M..=MAX_RADIUS_M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchRadius(u32);

impl SearchRadius {
    pub fn new(meters: u32) -> Result<Self, QueryError> {
        if (MIN_RADIUS_M..=MAX_RADIUS_M).contains(&meters) {
            Ok(Self(meters))
        } else {
            Err(QueryError::RadiusOutOfRange(meters))
        }
    }

    pub fn meters(&self) -> u32 {
        self.0
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(DEFAULT_RADIUS_M)
    }
}

impl<'de> Deserialize<'de> for SearchRadius {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let meters = u32::deserialize(deserializer)?;
        SearchRadius::new(meters).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for SearchRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m", self.0)
    }
}

/// A public toilet returned by the point-of-interest service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToiletRecord {
    /// OSM node id.
    pub id: i64,
    pub coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub tags: Map<String, Value>,
}

impl ToiletRecord {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(FALLBACK_NAME)
    }
}

/// Proximity query errors. All of them mean "no results this time".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Search radius {0} m is outside 500..=5000 m")]
    RadiusOutOfRange(u32),
    #[error("Error querying Overpass API: {0}")]
    Transport(String),
    #[error("Error querying Overpass API: no response within {0} s")]
    Timeout(u64),
    #[error("Error querying Overpass API: HTTP status {0}")]
    Status(u16),
    #[error("Error querying Overpass API: malformed response ({0})")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_boundaries() {
        assert_eq!(SearchRadius::new(500).unwrap().meters(), 500);
        assert_eq!(SearchRadius::new(5000).unwrap().meters(), 5000);
        assert_eq!(SearchRadius::new(499), Err(QueryError::RadiusOutOfRange(499)));
        assert_eq!(SearchRadius::new(5001), Err(QueryError::RadiusOutOfRange(5001)));
    }

    #[test]
    fn test_radius_default() {
        assert_eq!(SearchRadius::default().meters(), 1500);
    }

    #[test]
    fn test_radius_deserialize_validates() {
        assert!(serde_json::from_str::<SearchRadius>("2000").is_ok());
        assert!(serde_json::from_str::<SearchRadius>("5001").is_err());
    }

    #[test]
    fn test_display_name_fallback() {
        let mut rec = ToiletRecord {
            id: 1,
            coordinate: Coordinate::new(0.0, 0.0).unwrap(),
            name: None,
            tags: Map::new(),
        };
        assert_eq!(rec.display_name(), "Public Toilet");
        rec.name = Some("Gare du Nord WC".into());
        assert_eq!(rec.display_name(), "Gare du Nord WC");
    }
}
