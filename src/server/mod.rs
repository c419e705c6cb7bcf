mod handlers;
mod state;

use axum::routing::get;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Settings;
use crate::finder::ToiletFinder;
use crate::location::Geocoder;
use crate::toilets::{SearchRadius, ToiletSource};

/// JSON API around a finder.
pub fn build_router<G, T>(finder: ToiletFinder<G, T>, default_radius: SearchRadius) -> Router
where
    G: Geocoder + Send + Sync + 'static,
    T: ToiletSource + Send + Sync + 'static,
{
    let state = Arc::new(AppState { finder, default_radius });

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/toilets",
            get(handlers::toilets_get::<G, T>).post(handlers::toilets_post::<G, T>),
        )
        .route("/api/toilets.geojson", get(handlers::toilets_geojson::<G, T>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(settings: &Settings) -> std::io::Result<()> {
    let app = build_router(ToiletFinder::from_settings(settings), settings.default_radius);
    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "loo finder server listening");
    eprintln!("  Loo Finder server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}
