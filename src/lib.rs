//! Loo Finder — find public toilets near a place, a device fix, or a
//! manual coordinate pair, using OpenStreetMap data.

pub mod config;
pub mod finder;
pub mod geo;
pub mod location;
mod net;
pub mod server;
pub mod toilets;

pub use config::Settings;
pub use finder::{render_text_summary, NearbyToilet, SearchReport, SearchState, ToiletFinder};
pub use geo::Coordinate;
pub use location::{LocationInput, ResolvedLocation};
pub use toilets::SearchRadius;
