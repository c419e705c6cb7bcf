//! Proximity query for public toilets.

pub mod overpass;
pub mod types;

pub use overpass::{build_query, OverpassClient, ToiletSource};
pub use types::{
    QueryError, SearchRadius, ToiletRecord, DEFAULT_RADIUS_M, FALLBACK_NAME, MAX_RADIUS_M,
    MIN_RADIUS_M,
};
