//! The Finder — primary public API for Loo Finder.
//!
//! Runs one request cycle: resolve a location, query for nearby toilets,
//! attach distances and navigation links. Every failure ends up as a
//! report state with a message, never as a panic or a propagated error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{info, warn};

use crate::config::Settings;
use crate::geo::{format_coords, rounded_distance_m, Coordinate};
use crate::location::{Geocoder, LocationInput, LocationResolver, NominatimGeocoder, ResolvedLocation};
use crate::toilets::{OverpassClient, SearchRadius, ToiletRecord, ToiletSource};

pub const NO_RESULTS_MESSAGE: &str =
    "No public toilets found nearby. Try a different location or increase the search radius.";

/// Where a request cycle ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    /// No coordinate could be resolved; nothing was queried.
    Unresolved,
    /// Resolved and queried, zero toilets returned.
    NoResults,
    /// Resolved and queried, at least one toilet.
    Found,
    /// Resolved, but the query failed. Treated as an empty result.
    QueryFailed,
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "Unresolved"),
            Self::NoResults => write!(f, "NoResults"),
            Self::Found => write!(f, "Found"),
            Self::QueryFailed => write!(f, "QueryFailed"),
        }
    }
}

/// Whether `SearchReport::error` should be shown as a warning or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A toilet with display distance and navigation link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyToilet {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Great-circle distance from the resolved location, nearest meter.
    pub distance_m: u32,
    pub navigate_url: String,
    /// Raw OSM tags (`wheelchair`, `fee`, `opening_hours`, ...).
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub tags: Map<String, Value>,
}

impl NearbyToilet {
    pub fn from_record(origin: &Coordinate, record: &ToiletRecord) -> Self {
        Self {
            id: record.id,
            name: record.display_name().to_string(),
            lat: record.coordinate.lat(),
            lon: record.coordinate.lon(),
            distance_m: rounded_distance_m(origin, &record.coordinate),
            navigate_url: navigation_url(&record.coordinate),
            tags: record.tags.clone(),
        }
    }
}

/// Google Maps directions deep link to `destination`.
pub fn navigation_url(destination: &Coordinate) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&destination={},{}",
        destination.lat(),
        destination.lon()
    )
}

/// Full outcome of one search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub state: SearchState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ResolvedLocation>,
    pub radius_m: u32,
    pub toilets: Vec<NearbyToilet>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub searched_at: DateTime<Utc>,
}

impl SearchReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// GeoJSON FeatureCollection: an origin point plus one point per toilet.
    pub fn to_geojson(&self) -> Value {
        let mut features = Vec::with_capacity(self.toilets.len() + 1);

        if let Some(loc) = &self.location {
            features.push(json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [loc.coordinate.lon(), loc.coordinate.lat()],
                },
                "properties": {
                    "role": "origin",
                    "popup": "You are here",
                    "source": loc.source,
                    "label": loc.label,
                    "display_name": loc.display_name,
                },
            }));
        }

        for t in &self.toilets {
            features.push(json!({
                "type": "Feature",
                "id": t.id,
                "geometry": {
                    "type": "Point",
                    "coordinates": [t.lon, t.lat],
                },
                "properties": {
                    "role": "toilet",
                    "name": t.name,
                    "distance_m": t.distance_m,
                    "navigate_url": t.navigate_url,
                    "popup": popup_html(t),
                    "tags": t.tags,
                },
            }));
        }

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

fn popup_html(t: &NearbyToilet) -> String {
    format!(
        "{}<br>{}m away<br><a href='{}' target='_blank'>Navigate</a>",
        escape_html(&t.name),
        t.distance_m,
        t.navigate_url
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}

/// The Finder: a resolver plus a toilet source.
pub struct ToiletFinder<G, T> {
    resolver: LocationResolver<G>,
    source: T,
}

impl ToiletFinder<NominatimGeocoder, OverpassClient> {
    /// Finder wired to the public OSM services.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            NominatimGeocoder::from_settings(settings),
            OverpassClient::from_settings(settings),
        )
    }
}

impl<G: Geocoder, T: ToiletSource> ToiletFinder<G, T> {
    pub fn new(geocoder: G, source: T) -> Self {
        Self { resolver: LocationResolver::new(geocoder), source }
    }

    pub fn source(&self) -> &T {
        &self.source
    }

    /// Run one request cycle.
    pub fn search(&self, input: &LocationInput, radius: SearchRadius) -> SearchReport {
        let searched_at = Utc::now();

        let location = match self.resolver.resolve(input) {
            Ok(loc) => loc,
            Err(e) => {
                let severity = if e.is_warning() { Severity::Warning } else { Severity::Error };
                warn!(error = %e, "search unresolved");
                return SearchReport {
                    state: SearchState::Unresolved,
                    location: None,
                    radius_m: radius.meters(),
                    toilets: Vec::new(),
                    message: e.to_string(),
                    error: Some(e.to_string()),
                    severity: Some(severity),
                    searched_at,
                };
            }
        };

        self.search_at(location, radius, searched_at)
    }

    /// Query around an already resolved location.
    pub fn search_at(
        &self,
        location: ResolvedLocation,
        radius: SearchRadius,
        searched_at: DateTime<Utc>,
    ) -> SearchReport {
        let origin = location.coordinate;

        match self.source.nearby(origin, radius) {
            Ok(records) => {
                let toilets: Vec<NearbyToilet> = records
                    .iter()
                    .map(|r| NearbyToilet::from_record(&origin, r))
                    .collect();
                let (state, message) = if toilets.is_empty() {
                    (SearchState::NoResults, NO_RESULTS_MESSAGE.to_string())
                } else {
                    (SearchState::Found, format!("Found {} public toilets nearby.", toilets.len()))
                };
                info!(%state, count = toilets.len(), "search complete");
                SearchReport {
                    state,
                    location: Some(location),
                    radius_m: radius.meters(),
                    toilets,
                    message,
                    error: None,
                    severity: None,
                    searched_at,
                }
            }
            Err(e) => {
                warn!(error = %e, "toilet query failed");
                SearchReport {
                    state: SearchState::QueryFailed,
                    location: Some(location),
                    radius_m: radius.meters(),
                    toilets: Vec::new(),
                    message: NO_RESULTS_MESSAGE.to_string(),
                    error: Some(e.to_string()),
                    severity: Some(Severity::Error),
                    searched_at,
                }
            }
        }
    }
}

// ─── Text summary ───────────────────────────────────────────────

pub fn render_text_summary(report: &SearchReport) -> String {
    let mut out = String::new();

    if let Some(loc) = &report.location {
        out.push_str(&format!("  {}\n", loc.display_line()));
        out.push_str(&format!("  \u{1F50E} Radius: {} m\n", report.radius_m));
    }

    if let Some(err) = &report.error {
        let icon = match report.severity {
            Some(Severity::Warning) => "\u{26A0}\u{FE0F} ",
            _ => "\u{274C}",
        };
        out.push_str(&format!("  {} {}\n", icon, err));
    }

    match report.state {
        SearchState::Found => {
            out.push_str(&format!("  \u{1F6BD} {}\n", report.message));
            let width = report.toilets.iter().map(|t| t.name.chars().count()).max().unwrap_or(0);
            for (i, t) in report.toilets.iter().enumerate() {
                out.push_str(&format!(
                    "  {:>3}. {:<width$}  {:>5} m  {}\n",
                    i + 1,
                    t.name,
                    t.distance_m,
                    t.navigate_url,
                    width = width
                ));
            }
        }
        SearchState::NoResults | SearchState::QueryFailed => {
            out.push_str(&format!("  \u{1F615} {}\n", report.message));
        }
        SearchState::Unresolved => {}
    }

    if let Some(loc) = &report.location {
        out.push_str(&format!("  You are here: {}\n", format_coords(&loc.coordinate)));
    }

    out
}
