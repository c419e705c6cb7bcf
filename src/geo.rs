//! Coordinates and great-circle distance.
//!
//! Distances use the haversine formula on a sphere of mean Earth radius.
//! **Distance is returned in meters**.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Mean Earth radius (IUGG), meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Coordinates out of range: {lat}, {lon} (lat -90..90, lon -180..180)")]
    OutOfRange { lat: f64, lon: f64 },
}

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lon)
    }
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        if !valid {
            return Err(GeoError::OutOfRange { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Calculate the distance between two points on a sphere.
///
/// # Notes
/// Altitude is ignored. The error against the WGS84 ellipsoid stays
/// below 0.5% which is well under the meter rounding at toilet-finding
/// distances.
pub fn haversine_m(start: &Coordinate, end: &Coordinate) -> f64 {
    let d_lat = (end.lat - start.lat).to_radians();
    let d_lon = (end.lon - start.lon).to_radians();
    let lat1 = start.lat.to_radians();
    let lat2 = end.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance rounded to the nearest meter, for display.
pub fn rounded_distance_m(start: &Coordinate, end: &Coordinate) -> u32 {
    haversine_m(start, end).round() as u32
}

/// Human-friendly coordinates, e.g. `48.8566° N, 2.3522° E`.
pub fn format_coords(coord: &Coordinate) -> String {
    let ns = if coord.lat >= 0.0 { 'N' } else { 'S' };
    let ew = if coord.lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}\u{00B0} {}, {:.4}\u{00B0} {}", coord.lat.abs(), ns, coord.lon.abs(), ew)
}
