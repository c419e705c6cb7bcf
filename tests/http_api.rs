use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use loo_finder::finder::ToiletFinder;
use loo_finder::geo::{Coordinate, EARTH_RADIUS_M};
use loo_finder::location::{GeocodeMatch, Geocoder, LocationError};
use loo_finder::server::build_router;
use loo_finder::toilets::{QueryError, SearchRadius, ToiletRecord, ToiletSource};

struct CityGeocoder;

impl Geocoder for CityGeocoder {
    fn geocode(&self, query: &str) -> Result<GeocodeMatch, LocationError> {
        match query {
            "London" => Ok(GeocodeMatch {
                coordinate: Coordinate::new(51.5074, -0.1278).unwrap(),
                display_name: "London, Greater London, England, United Kingdom".into(),
            }),
            "Offline" => Err(LocationError::GeocodeService("connection refused".into())),
            _ => Err(LocationError::GeocodeNotFound(query.to_string())),
        }
    }
}

/// Returns two toilets north of whatever center it is asked about,
/// or fails when the radius is 5000 m.
struct TwoToilets;

impl ToiletSource for TwoToilets {
    fn nearby(&self, center: Coordinate, radius: SearchRadius) -> Result<Vec<ToiletRecord>, QueryError> {
        if radius.meters() == 5000 {
            return Err(QueryError::Status(504));
        }
        let north = |m: f64| Coordinate::new(center.lat() + (m / EARTH_RADIUS_M).to_degrees(), center.lon()).unwrap();
        Ok(vec![
            ToiletRecord { id: 1, coordinate: north(1500.0), name: Some("Station WC".into()), tags: Default::default() },
            ToiletRecord { id: 2, coordinate: north(320.0), name: None, tags: Default::default() },
        ])
    }
}

fn app() -> Router {
    build_router(ToiletFinder::new(CityGeocoder, TwoToilets), SearchRadius::default())
}

async fn get_json(uri: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_search_by_city() {
    let (status, body) = get_json("/api/toilets?city=London&radius=2000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "found");
    assert_eq!(body["radius_m"], 2000);
    assert_eq!(body["location"]["source"], "geocoder");
    let toilets = body["toilets"].as_array().unwrap();
    assert_eq!(toilets.len(), 2);
    assert_eq!(toilets[0]["distance_m"], 1500);
    assert_eq!(toilets[0]["name"], "Station WC");
    assert_eq!(toilets[1]["distance_m"], 320);
    assert_eq!(toilets[1]["name"], "Public Toilet");
    assert!(toilets[1]["navigate_url"].as_str().unwrap().starts_with("https://www.google.com/maps/dir/?api=1&destination="));
}

#[tokio::test]
async fn test_default_radius() {
    let (_, body) = get_json("/api/toilets?city=London").await;
    assert_eq!(body["radius_m"], 1500);
}

#[tokio::test]
async fn test_radius_boundaries() {
    for ok in ["500", "5000"] {
        let (status, _) = get_json(&format!("/api/toilets?city=London&radius={}", ok)).await;
        assert_eq!(status, StatusCode::OK, "radius {}", ok);
    }
    for bad in ["499", "5001", "wide"] {
        let (status, body) = get_json(&format!("/api/toilets?city=London&radius={}", bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "radius {}", bad);
        assert_eq!(body["code"], 400);
    }
}

#[tokio::test]
async fn test_query_failure_is_report_state() {
    let (status, body) = get_json("/api/toilets?city=London&radius=5000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "query_failed");
    assert!(body["toilets"].as_array().unwrap().is_empty());
    assert!(body["error"].as_str().unwrap().contains("504"));
}

#[tokio::test]
async fn test_unresolved_place() {
    let (status, body) = get_json("/api/toilets?city=Atlantis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "unresolved");
    assert_eq!(body["severity"], "warning");
    assert!(body.get("location").is_none());

    let (_, body) = get_json("/api/toilets?city=Offline").await;
    assert_eq!(body["state"], "unresolved");
    assert_eq!(body["severity"], "error");
}

#[tokio::test]
async fn test_manual_overrides_city() {
    let (_, body) = get_json("/api/toilets?city=London&lat=48.8566&lon=2.3522").await;
    assert_eq!(body["location"]["source"], "manual");
    assert_eq!(body["location"]["coordinate"]["lat"], 48.8566);
}

#[tokio::test]
async fn test_manual_garbage_is_unresolved() {
    let (_, body) = get_json("/api/toilets?lat=forty&lon=2.35").await;
    assert_eq!(body["state"], "unresolved");
    assert!(body["error"].as_str().unwrap().contains("Invalid manual coordinates"));
}

#[tokio::test]
async fn test_post_device_fix() {
    let (status, body) = post_json(
        "/api/toilets",
        json!({"device": {"latitude": 52.3676, "longitude": 4.9041}, "city": "London", "radius": 1000}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"]["source"], "device");
    assert_eq!(body["radius_m"], 1000);
}

#[tokio::test]
async fn test_post_device_error() {
    let (_, body) = post_json(
        "/api/toilets",
        json!({"device": {"error": {"kind": "unsupported", "message": "Geolocation not supported by this browser."}}}),
    )
    .await;
    assert_eq!(body["state"], "unresolved");
    assert!(body["error"].as_str().unwrap().contains("not supported"));

    let (_, body) = post_json(
        "/api/toilets",
        json!({"device": {"error": {"kind": "permission_denied", "message": "User denied Geolocation"}}}),
    )
    .await;
    assert!(body["error"].as_str().unwrap().contains("permission denied"));
}

#[tokio::test]
async fn test_post_device_bare_error_string() {
    let (status, body) = post_json(
        "/api/toilets",
        json!({"device": {"error": "Geolocation error: User denied Geolocation"}, "city": "London"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "unresolved");
    assert_eq!(body["severity"], "error");
    assert!(body["error"].as_str().unwrap().contains("User denied Geolocation"));
    assert!(body.get("location").is_none());
}

#[tokio::test]
async fn test_post_device_mistyped_fix() {
    let (status, body) = post_json("/api/toilets", json!({"device": {"latitude": "52.1", "longitude": 4.0}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "unresolved");
    assert!(body["error"].as_str().unwrap().contains("malformed"));

    let (status, body) = post_json("/api/toilets", json!({"device": {"latitude": 52.1}})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].as_str().unwrap().contains("malformed"));
}

#[tokio::test]
async fn test_post_numeric_manual_pair() {
    let (_, body) = post_json("/api/toilets", json!({"lat": 41.9028, "lon": 12.4964})).await;
    assert_eq!(body["location"]["source"], "manual");
}

#[tokio::test]
async fn test_post_bad_radius() {
    for bad in [json!(100), json!(-1), json!(1500.5), json!("wide"), json!(true)] {
        let (status, body) = post_json("/api/toilets", json!({"city": "London", "radius": bad.clone()})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "radius {}", bad);
        assert_eq!(body["code"], 400);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_post_radius_as_string() {
    let (status, body) = post_json("/api/toilets", json!({"city": "London", "radius": "2000"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["radius_m"], 2000);
}

#[tokio::test]
async fn test_geojson() {
    let (status, body) = get_json("/api/toilets.geojson?city=London").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);
    assert_eq!(features[0]["properties"]["role"], "origin");
    assert_eq!(features[0]["properties"]["display_name"], "London, Greater London, England, United Kingdom");
    assert_eq!(features[2]["properties"]["distance_m"], 320);
}
