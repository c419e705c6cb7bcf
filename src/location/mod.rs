//! Location resolution for a single search.
//!
//! Turns a manual coordinate pair, a device report, or a place name into
//! one resolved coordinate, through a fixed-priority resolver.

pub mod providers;
pub mod resolver;
pub mod types;

pub use providers::{
    DeviceLocator, GeocodeMatch, Geocoder, IpLocator, NoDeviceLocator, NominatimGeocoder,
};
pub use resolver::LocationResolver;
pub use types::{
    DeviceErrorReport, DeviceFailure, DeviceReport, LocationError, LocationInput, LocationSource,
    ManualInput, ResolvedLocation,
};
