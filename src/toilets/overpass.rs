//! Overpass API client for `amenity=toilets` nodes.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{QueryError, SearchRadius, ToiletRecord};
use crate::config::Settings;
use crate::geo::Coordinate;
use crate::net::is_timeout;

/// A source of public toilets around a point.
pub trait ToiletSource {
    /// One bounded query; upstream order is preserved.
    fn nearby(&self, center: Coordinate, radius: SearchRadius) -> Result<Vec<ToiletRecord>, QueryError>;
}

#[derive(Deserialize, Debug)]
struct OverpassElement {
    #[serde(default)]
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: Map<String, Value>,
}

#[derive(Deserialize, Debug)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

/// Blocking Overpass client. One POST per call, bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    url: String,
    user_agent: String,
    timeout: Duration,
}

impl OverpassClient {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), user_agent: user_agent.into(), timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.overpass_url, &settings.user_agent, settings.query_timeout)
    }
}

impl ToiletSource for OverpassClient {
    fn nearby(&self, center: Coordinate, radius: SearchRadius) -> Result<Vec<ToiletRecord>, QueryError> {
        let query = build_query(center, radius);
        debug!(url = %self.url, %query, "overpass query");

        let response = ureq::post(&self.url)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .send_string(&query)
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => {
                    warn!(code, "overpass returned error status");
                    QueryError::Status(code)
                }
                ureq::Error::Transport(t) if is_timeout(&t) => {
                    warn!(timeout_s = self.timeout.as_secs(), "overpass request timed out");
                    QueryError::Timeout(self.timeout.as_secs())
                }
                ureq::Error::Transport(t) => {
                    warn!(error = %t, "overpass request failed");
                    QueryError::Transport(t.to_string())
                }
            })?;

        let body = response.into_string().map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                QueryError::Timeout(self.timeout.as_secs())
            }
            _ => QueryError::Transport(e.to_string()),
        })?;

        let records = parse_overpass_body(&body)?;
        info!(count = records.len(), radius = radius.meters(), %center, "overpass results");
        Ok(records)
    }
}

/// Overpass QL for toilet nodes within `radius` of `center`.
pub fn build_query(center: Coordinate, radius: SearchRadius) -> String {
    format!(
        "[out:json];\n(\n  node[\"amenity\"=\"toilets\"](around:{},{},{});\n);\nout body;\n",
        radius.meters(),
        center.lat(),
        center.lon()
    )
}

/// Decode an Overpass JSON body. Elements without a usable position are skipped.
pub(crate) fn parse_overpass_body(body: &str) -> Result<Vec<ToiletRecord>, QueryError> {
    let parsed: OverpassResponse =
        serde_json::from_str(body).map_err(|e| QueryError::Malformed(e.to_string()))?;

    let records = parsed
        .elements
        .into_iter()
        .filter_map(|el| {
            let coordinate = match (el.lat, el.lon) {
                (Some(lat), Some(lon)) => Coordinate::new(lat, lon).ok(),
                _ => None,
            };
            let Some(coordinate) = coordinate else {
                warn!(id = el.id, "skipping element without a valid position");
                return None;
            };
            let name = el
                .tags
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            Some(ToiletRecord { id: el.id, coordinate, name, tags: el.tags })
        })
        .collect();

    Ok(records)
}
