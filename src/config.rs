//! Runtime settings loaded from the environment (and `.env`, if present).
//!
//! Every key is optional; unset keys fall back to [`Settings::default`].

use std::time::Duration;
use thiserror::Error;

use crate::toilets::SearchRadius;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_IP_API_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_USER_AGENT: &str = "LooFinder/0.3 (public-toilet-finder)";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}: expected {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Endpoints, timeouts and defaults shared by the CLI and the server.
#[derive(Debug, Clone)]
pub struct Settings {
    pub overpass_url: String,
    pub nominatim_url: String,
    /// IP geolocation endpoint; empty means the device cannot be located.
    pub ip_api_url: String,
    pub user_agent: String,
    pub query_timeout: Duration,
    pub geocode_timeout: Duration,
    pub default_radius: SearchRadius,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.into(),
            nominatim_url: DEFAULT_NOMINATIM_URL.into(),
            ip_api_url: DEFAULT_IP_API_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            query_timeout: Duration::from_secs(30),
            geocode_timeout: Duration::from_secs(5),
            default_radius: SearchRadius::default(),
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

impl Settings {
    /// Read `LOO_*` variables, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();

        if let Some(v) = lookup("LOO_OVERPASS_URL") {
            s.overpass_url = v;
        }
        if let Some(v) = lookup("LOO_NOMINATIM_URL") {
            s.nominatim_url = v;
        }
        if let Some(v) = lookup("LOO_IP_API_URL") {
            s.ip_api_url = v;
        }
        if let Some(v) = lookup("LOO_USER_AGENT") {
            s.user_agent = v;
        }
        if let Some(v) = lookup("LOO_QUERY_TIMEOUT_SECS") {
            s.query_timeout = Duration::from_secs(parse_num("LOO_QUERY_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("LOO_GEOCODE_TIMEOUT_SECS") {
            s.geocode_timeout = Duration::from_secs(parse_num("LOO_GEOCODE_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("LOO_DEFAULT_RADIUS") {
            let meters: u32 = parse_num("LOO_DEFAULT_RADIUS", &v)?;
            s.default_radius = SearchRadius::new(meters).map_err(|_| ConfigError::Invalid {
                key: "LOO_DEFAULT_RADIUS",
                expected: "meters in 500..=5000",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("LOO_HOST") {
            s.host = v;
        }
        if let Some(v) = lookup("LOO_PORT") {
            s.port = parse_num("LOO_PORT", &v)?;
        }

        Ok(s)
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        expected: "a non-negative integer",
        value: value.to_string(),
    })
}
