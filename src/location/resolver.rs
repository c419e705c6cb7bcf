//! Location resolver: picks exactly one source and resolves it.
//!
//! Priority: manual pair → device report → place name. The first source
//! that is supplied is the only one evaluated; if it fails the request is
//! unresolved. There is no fallthrough to lower-priority sources.

use tracing::{debug, info, warn};

use super::providers::Geocoder;
use super::types::{
    DeviceFailure, DeviceReport, LocationError, LocationInput, LocationSource, ManualInput,
    ResolvedLocation,
};
use crate::geo::Coordinate;

/// The location resolver.
pub struct LocationResolver<G> {
    geocoder: G,
}

impl<G: Geocoder> LocationResolver<G> {
    pub fn new(geocoder: G) -> Self {
        Self { geocoder }
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    /// Resolve one request's input to a single active location.
    pub fn resolve(&self, input: &LocationInput) -> Result<ResolvedLocation, LocationError> {
        // 1. Manual override
        if let Some(manual) = input.manual.as_ref().filter(|m| m.is_supplied()) {
            debug!("resolving from manual pair");
            return Self::from_manual(manual);
        }

        // 2. Device report
        if let Some(report) = &input.device {
            debug!("resolving from device report");
            return Self::from_device(report);
        }

        // 3. Place name
        if let Some(place) = input.place.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            debug!(place, "resolving from place name");
            return self.resolve_place(place);
        }

        Err(LocationError::NoInput)
    }

    /// Geocode a free-text place name. Not retried.
    pub fn resolve_place(&self, place: &str) -> Result<ResolvedLocation, LocationError> {
        match self.geocoder.geocode(place) {
            Ok(hit) => {
                info!(place, coordinate = %hit.coordinate, "place resolved");
                Ok(ResolvedLocation {
                    coordinate: hit.coordinate,
                    source: LocationSource::Geocoder,
                    label: place.to_string(),
                    display_name: Some(hit.display_name),
                })
            }
            Err(e) => {
                warn!(place, error = %e, "place unresolved");
                Err(e)
            }
        }
    }

    /// Parse a manual lat/lon pair. Both fields must parse and be in range.
    pub fn from_manual(manual: &ManualInput) -> Result<ResolvedLocation, LocationError> {
        let lat = parse_field("latitude", &manual.lat)?;
        let lon = parse_field("longitude", &manual.lon)?;
        let coordinate = Coordinate::new(lat, lon)
            .map_err(|e| LocationError::InvalidManualInput(e.to_string()))?;

        info!(%coordinate, "using manual coordinates");
        Ok(ResolvedLocation {
            coordinate,
            source: LocationSource::Manual,
            label: format!("{:.4}, {:.4}", lat, lon),
            display_name: None,
        })
    }

    /// Interpret a device report. A fix needs both fields and valid ranges.
    pub fn from_device(report: &DeviceReport) -> Result<ResolvedLocation, LocationError> {
        if let Some(err) = &report.error {
            warn!(kind = %err.kind, message = %err.message, "device location failed");
            return Err(match err.kind {
                DeviceFailure::Unsupported => LocationError::UnsupportedEnvironment(err.message.clone()),
                reason => LocationError::DeviceRequestFailed {
                    reason,
                    message: err.message.clone(),
                },
            });
        }

        let (lat, lon) = match (report.latitude, report.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(LocationError::DeviceRequestFailed {
                    reason: DeviceFailure::Malformed,
                    message: "report is missing latitude or longitude".into(),
                })
            }
        };

        let coordinate = Coordinate::new(lat, lon).map_err(|e| LocationError::DeviceRequestFailed {
            reason: DeviceFailure::Malformed,
            message: e.to_string(),
        })?;

        info!(%coordinate, "device location detected");
        Ok(ResolvedLocation {
            coordinate,
            source: LocationSource::Device,
            label: "Current location".into(),
            display_name: None,
        })
    }
}

fn parse_field(name: &str, raw: &str) -> Result<f64, LocationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LocationError::InvalidManualInput(format!("{} is missing", name)));
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(LocationError::InvalidManualInput(format!(
            "{} '{}' is not a number",
            name, trimmed
        ))),
    }
}
