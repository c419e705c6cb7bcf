//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::geo::{format_coords, Coordinate};

/// How a location was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Manual,
    Device,
    Geocoder,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "Manual"),
            Self::Device => write!(f, "Device"),
            Self::Geocoder => write!(f, "Nominatim"),
        }
    }
}

/// The single active location of a request cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    pub source: LocationSource,
    /// What the user typed, or a short label for non-text sources.
    pub label: String,
    /// Full display name from the geocoder (e.g. "Roma, Lazio, Italia")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ResolvedLocation {
    pub fn display_line(&self) -> String {
        let name_part = match &self.display_name {
            Some(name) if name != &self.label => format!(" ({})", name),
            _ => String::new(),
        };
        format!(
            "\u{1F4CD} {}{} [{}]\n  \u{1F4D0} {}",
            self.label,
            name_part,
            self.source,
            format_coords(&self.coordinate)
        )
    }
}

/// Raw manual override fields, exactly as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualInput {
    pub lat: String,
    pub lon: String,
}

impl ManualInput {
    pub fn new(lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self { lat: lat.into(), lon: lon.into() }
    }

    /// A pair counts as supplied once either field holds something.
    pub fn is_supplied(&self) -> bool {
        !self.lat.trim().is_empty() || !self.lon.trim().is_empty()
    }
}

/// Why a device location request did not produce a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFailure {
    Unsupported,
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    /// Failed without saying why (e.g. a bare error string).
    RequestFailed,
    /// The report arrived but lacked usable coordinates.
    Malformed,
}

impl fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "not supported"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::PositionUnavailable => write!(f, "position unavailable"),
            Self::Timeout => write!(f, "timed out"),
            Self::RequestFailed => write!(f, "request failed"),
            Self::Malformed => write!(f, "malformed report"),
        }
    }
}

/// Error half of a device report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceErrorReport {
    pub kind: DeviceFailure,
    pub message: String,
}

/// Result of one asynchronous device location request, as delivered by
/// whatever captured it.
///
/// Either a fix (`latitude` and `longitude`) or an `error`. Decoding never
/// fails: an `error` given as a bare string becomes `RequestFailed`, and
/// mistyped fields become a `Malformed` error report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct DeviceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DeviceErrorReport>,
}

impl DeviceReport {
    pub fn fix(latitude: f64, longitude: f64) -> Self {
        Self { latitude: Some(latitude), longitude: Some(longitude), error: None }
    }

    pub fn failed(kind: DeviceFailure, message: impl Into<String>) -> Self {
        Self {
            latitude: None,
            longitude: None,
            error: Some(DeviceErrorReport { kind, message: message.into() }),
        }
    }
}

impl From<Value> for DeviceReport {
    fn from(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::failed(DeviceFailure::Malformed, "device report is not a JSON object");
        };

        if let Some(err) = map.get("error").filter(|e| !e.is_null()) {
            return match err {
                Value::String(msg) => Self::failed(DeviceFailure::RequestFailed, msg.clone()),
                Value::Object(obj) => {
                    let kind = obj
                        .get("kind")
                        .and_then(|k| serde_json::from_value(k.clone()).ok())
                        .unwrap_or(DeviceFailure::RequestFailed);
                    let message = obj.get("message").and_then(Value::as_str).unwrap_or_default();
                    Self::failed(kind, message)
                }
                other => Self::failed(DeviceFailure::Malformed, format!("unexpected error field: {}", other)),
            };
        }

        match (number_field(&map, "latitude"), number_field(&map, "longitude")) {
            (Ok(latitude), Ok(longitude)) => Self { latitude, longitude, error: None },
            (Err(msg), _) | (_, Err(msg)) => Self::failed(DeviceFailure::Malformed, msg),
        }
    }
}

/// Missing or null is `None`; anything but a JSON number is an error.
fn number_field(map: &Map<String, Value>, key: &str) -> Result<Option<f64>, String> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(format!("{} must be a number, got {}", key, other)),
    }
}

/// Everything the user supplied for one request. Sources are evaluated in
/// fixed priority order: manual, then device, then place name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInput {
    #[serde(default)]
    pub manual: Option<ManualInput>,
    #[serde(default)]
    pub device: Option<DeviceReport>,
    #[serde(default)]
    pub place: Option<String>,
}

impl LocationInput {
    pub fn place(name: impl Into<String>) -> Self {
        Self { place: Some(name.into()), ..Self::default() }
    }

    pub fn manual(lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self { manual: Some(ManualInput::new(lat, lon)), ..Self::default() }
    }

    pub fn device(report: DeviceReport) -> Self {
        Self { device: Some(report), ..Self::default() }
    }
}

/// Location resolution errors. Every variant leaves the request unresolved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("No location specified. Use a place name, --device, or --lat/--lon")]
    NoInput,
    #[error("Invalid manual coordinates: {0}")]
    InvalidManualInput(String),
    #[error("Device location is not supported here: {0}")]
    UnsupportedEnvironment(String),
    #[error("Device location request failed ({reason}): {message}")]
    DeviceRequestFailed { reason: DeviceFailure, message: String },
    #[error("Could not find coordinates for '{0}'")]
    GeocodeNotFound(String),
    #[error("Geocoding failed: {0}")]
    GeocodeService(String),
}

impl LocationError {
    /// Warnings are bad input; everything else is an error for the user.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::NoInput | Self::InvalidManualInput(_) | Self::GeocodeNotFound(_))
    }
}
