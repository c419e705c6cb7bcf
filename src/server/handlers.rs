use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::finder::SearchReport;
use crate::location::{DeviceReport, Geocoder, LocationInput, ManualInput};
use crate::toilets::{SearchRadius, ToiletSource};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

// ─── GET /health ─────────────────────────────────────────────────

pub async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ─── GET /api/toilets ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ToiletsQuery {
    pub city: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub radius: Option<String>,
}

impl ToiletsQuery {
    fn location_input(&self) -> LocationInput {
        LocationInput {
            manual: manual_pair(self.lat.clone(), self.lon.clone()),
            device: None,
            place: self.city.clone(),
        }
    }
}

pub async fn toilets_get<G, T>(
    State(state): State<Arc<AppState<G, T>>>,
    Query(params): Query<ToiletsQuery>,
) -> Result<Json<SearchReport>, ApiError>
where
    G: Geocoder + Send + Sync + 'static,
    T: ToiletSource + Send + Sync + 'static,
{
    let radius = parse_radius(params.radius.as_deref(), state.default_radius)?;
    let report = run_search(state, params.location_input(), radius).await?;
    Ok(Json(report))
}

pub async fn toilets_geojson<G, T>(
    State(state): State<Arc<AppState<G, T>>>,
    Query(params): Query<ToiletsQuery>,
) -> Result<Json<Value>, ApiError>
where
    G: Geocoder + Send + Sync + 'static,
    T: ToiletSource + Send + Sync + 'static,
{
    let radius = parse_radius(params.radius.as_deref(), state.default_radius)?;
    let report = run_search(state, params.location_input(), radius).await?;
    Ok(Json(report.to_geojson()))
}

// ─── POST /api/toilets ───────────────────────────────────────────

/// Body posted by a client that captured the device location itself.
#[derive(Deserialize, Default)]
pub struct ToiletsRequest {
    #[serde(default)]
    pub device: Option<DeviceReport>,
    #[serde(default)]
    pub city: Option<String>,
    /// Number or string; text is kept as typed so bad input is reported.
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lon: Option<Value>,
    /// Meters as a number or a string; anything but a whole number in
    /// range is a 400.
    #[serde(default)]
    pub radius: Option<Value>,
}

pub async fn toilets_post<G, T>(
    State(state): State<Arc<AppState<G, T>>>,
    Json(body): Json<ToiletsRequest>,
) -> Result<Json<SearchReport>, ApiError>
where
    G: Geocoder + Send + Sync + 'static,
    T: ToiletSource + Send + Sync + 'static,
{
    let raw_radius = body.radius.map(value_text);
    let radius = parse_radius(raw_radius.as_deref(), state.default_radius)?;

    let input = LocationInput {
        manual: manual_pair(body.lat.map(value_text), body.lon.map(value_text)),
        device: body.device,
        place: body.city,
    };

    let report = run_search(state, input, radius).await?;
    Ok(Json(report))
}

// ─── Helpers ─────────────────────────────────────────────────────

async fn run_search<G, T>(
    state: Arc<AppState<G, T>>,
    input: LocationInput,
    radius: SearchRadius,
) -> Result<SearchReport, ApiError>
where
    G: Geocoder + Send + Sync + 'static,
    T: ToiletSource + Send + Sync + 'static,
{
    let start = Instant::now();

    let report = tokio::task::spawn_blocking(move || state.finder.search(&input, radius))
        .await
        .map_err(|e| {
            error!(error = %e, "search task failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "search task failed")
        })?;

    info!(
        state = %report.state,
        toilets = report.toilets.len(),
        radius = radius.meters(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "search served"
    );

    Ok(report)
}

fn parse_radius(raw: Option<&str>, default: SearchRadius) -> Result<SearchRadius, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    let meters: u32 = raw.parse().map_err(|_| {
        api_error(StatusCode::BAD_REQUEST, format!("Invalid radius '{}': expected meters", raw))
    })?;
    SearchRadius::new(meters).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
}

fn manual_pair(lat: Option<String>, lon: Option<String>) -> Option<ManualInput> {
    if lat.is_none() && lon.is_none() {
        return None;
    }
    Some(ManualInput::new(lat.unwrap_or_default(), lon.unwrap_or_default()))
}

fn value_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
