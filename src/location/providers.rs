//! Location providers: Nominatim geocoding and IP-based device location.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{DeviceFailure, DeviceReport, LocationError};
use crate::config::Settings;
use crate::geo::Coordinate;
use crate::net::is_timeout;

/// A geocoder hit for a free-text place name.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub coordinate: Coordinate,
    pub display_name: String,
}

/// Turns a free-text place name into a coordinate.
///
/// `Err(GeocodeNotFound)` when the service has no match,
/// `Err(GeocodeService)` when the lookup itself failed.
pub trait Geocoder {
    fn geocode(&self, query: &str) -> Result<GeocodeMatch, LocationError>;
}

/// Requests the device's current position. Never fails outright; failures
/// come back inside the report.
pub trait DeviceLocator {
    fn locate(&self) -> DeviceReport;
}

// ─── Nominatim provider ─────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// OpenStreetMap Nominatim search endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    url: String,
    user_agent: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), user_agent: user_agent.into(), timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.nominatim_url, &settings.user_agent, settings.geocode_timeout)
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, query: &str) -> Result<GeocodeMatch, LocationError> {
        debug!(query, url = %self.url, "nominatim lookup");

        let response = ureq::get(&self.url)
            .set("User-Agent", &self.user_agent)
            .query("q", query)
            .query("format", "json")
            .query("limit", "1")
            .timeout(self.timeout)
            .call()
            .map_err(|e| {
                warn!(query, error = %e, "nominatim request failed");
                LocationError::GeocodeService(e.to_string())
            })?;

        let body = response
            .into_string()
            .map_err(|e| LocationError::GeocodeService(e.to_string()))?;

        let hit = parse_nominatim_body(query, &body)?;
        info!(query, coordinate = %hit.coordinate, "geocoded");
        Ok(hit)
    }
}

/// Take the first usable hit of a Nominatim JSON array.
pub(crate) fn parse_nominatim_body(query: &str, body: &str) -> Result<GeocodeMatch, LocationError> {
    let results: Vec<NominatimResult> = serde_json::from_str(body)
        .map_err(|e| LocationError::GeocodeService(format!("invalid response: {}", e)))?;

    let top = results
        .first()
        .ok_or_else(|| LocationError::GeocodeNotFound(query.to_string()))?;

    let lat: f64 = top
        .lat
        .parse()
        .map_err(|_| LocationError::GeocodeService(format!("invalid latitude '{}'", top.lat)))?;
    let lon: f64 = top
        .lon
        .parse()
        .map_err(|_| LocationError::GeocodeService(format!("invalid longitude '{}'", top.lon)))?;
    let coordinate =
        Coordinate::new(lat, lon).map_err(|e| LocationError::GeocodeService(e.to_string()))?;

    let display_name = if top.display_name.is_empty() {
        query.to_string()
    } else {
        top.display_name.clone()
    };

    Ok(GeocodeMatch { coordinate, display_name })
}

// ─── IP-based device location ───────────────────────────────────

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Approximates the device position from its public IP (ipapi.co).
///
/// This is what "use my location" means on a terminal with no GPS.
#[derive(Debug, Clone)]
pub struct IpLocator {
    url: String,
    user_agent: String,
    timeout: Duration,
}

impl IpLocator {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), user_agent: user_agent.into(), timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.ip_api_url, &settings.user_agent, settings.geocode_timeout)
    }
}

impl DeviceLocator for IpLocator {
    fn locate(&self) -> DeviceReport {
        let response = match ureq::get(&self.url)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .call()
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "ip geolocation request failed");
                let kind = match &e {
                    ureq::Error::Transport(t) if is_timeout(t) => DeviceFailure::Timeout,
                    _ => DeviceFailure::PositionUnavailable,
                };
                return DeviceReport::failed(kind, e.to_string());
            }
        };

        match response.into_string() {
            Ok(body) => parse_ip_api_body(&body),
            Err(e) => {
                let kind = match e.kind() {
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => DeviceFailure::Timeout,
                    _ => DeviceFailure::PositionUnavailable,
                };
                DeviceReport::failed(kind, e.to_string())
            }
        }
    }
}

pub(crate) fn parse_ip_api_body(body: &str) -> DeviceReport {
    let r: IpApiResult = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return DeviceReport::failed(DeviceFailure::Malformed, e.to_string()),
    };

    if r.error {
        let reason = r.reason.unwrap_or_else(|| "unknown error".into());
        return DeviceReport::failed(DeviceFailure::PositionUnavailable, reason);
    }

    DeviceReport { latitude: r.latitude, longitude: r.longitude, error: None }
}

/// Stand-in for environments with no way to locate the device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeviceLocator;

impl DeviceLocator for NoDeviceLocator {
    fn locate(&self) -> DeviceReport {
        DeviceReport::failed(
            DeviceFailure::Unsupported,
            "Geolocation is not supported in this environment.",
        )
    }
}
