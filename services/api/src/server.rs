//! HTTP query surface returning GeoJSON feature collections.

use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use archive::Archive;
use ocean_common::{geojson, BoundingBox, StoreKind};

/// Shared state for the query handlers.
pub struct ServerState {
    pub archive: Arc<Archive>,
    pub default_bbox: BoundingBox,
}

/// Query-string parameters accepted by both observation endpoints.
#[derive(Debug, Deserialize)]
pub struct ObservationQuery {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub min_lat: Option<f64>,
    pub min_lon: Option<f64>,
    pub max_lat: Option<f64>,
    pub max_lon: Option<f64>,
    /// Select the raw (pre-interpolation) store.
    #[serde(default)]
    pub raw: bool,
}

impl ObservationQuery {
    /// Resolve the request window, box and store, falling back to defaults
    /// for anything absent or unparseable.
    fn resolve(
        &self,
        default_bbox: &BoundingBox,
    ) -> (DateTime<Utc>, DateTime<Utc>, BoundingBox, StoreKind) {
        let end = parse_time(self.end_time.as_deref()).unwrap_or_else(Utc::now);
        let start =
            parse_time(self.start_time.as_deref()).unwrap_or(end - ChronoDuration::days(7));

        let bbox = BoundingBox::new(
            self.min_lat.unwrap_or(default_bbox.min_lat),
            self.min_lon.unwrap_or(default_bbox.min_lon),
            self.max_lat.unwrap_or(default_bbox.max_lat),
            self.max_lon.unwrap_or(default_bbox.max_lon),
        );

        let which = if self.raw {
            StoreKind::Raw
        } else {
            StoreKind::Canonical
        };

        (start, end, bbox, which)
    }
}

fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            warn!(time = value, error = %e, "ignoring unparseable time parameter");
            None
        }
    }
}

/// Create the query API router.
pub fn create_router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chlorophyll", get(chlorophyll_handler))
        .route("/api/currents", get(currents_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(Extension(state))
}

/// GET /api/chlorophyll - chlorophyll observations as GeoJSON
async fn chlorophyll_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Query(params): Query<ObservationQuery>,
) -> impl IntoResponse {
    let (start, end, bbox, which) = params.resolve(&state.default_bbox);

    match state
        .archive
        .query_chlorophyll(start, end, &bbox, which)
        .await
    {
        Ok(records) => Json(geojson::chlorophyll_collection(&records)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("error retrieving chlorophyll data: {e}"),
        )
            .into_response(),
    }
}

/// GET /api/currents - current vector observations as GeoJSON
async fn currents_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Query(params): Query<ObservationQuery>,
) -> impl IntoResponse {
    let (start, end, bbox, which) = params.resolve(&state.default_bbox);

    match state.archive.query_currents(start, end, &bbox, which).await {
        Ok(records) => Json(geojson::currents_collection(&records)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("error retrieving currents data: {e}"),
        )
            .into_response(),
    }
}

/// GET /health - health check endpoint
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ocean-api"
    }))
}

/// Start the HTTP server; drains open connections on shutdown.
pub async fn run_server(
    state: Arc<ServerState>,
    port: u16,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    info!(port = port, "starting query server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_bbox() -> BoundingBox {
        BoundingBox::new(40.83, 1.10, 41.26, 2.53)
    }

    #[test]
    fn test_resolve_defaults() {
        let params = ObservationQuery {
            start_time: None,
            end_time: None,
            min_lat: None,
            min_lon: None,
            max_lat: None,
            max_lon: None,
            raw: false,
        };

        let (start, end, bbox, which) = params.resolve(&default_bbox());
        assert_eq!(end - start, ChronoDuration::days(7));
        assert_eq!(bbox, default_bbox());
        assert_eq!(which, StoreKind::Canonical);
    }

    #[test]
    fn test_resolve_explicit_window_and_raw() {
        let params = ObservationQuery {
            start_time: Some("2025-05-01T00:00:00Z".to_string()),
            end_time: Some("2025-05-02T00:00:00Z".to_string()),
            min_lat: Some(40.9),
            min_lon: None,
            max_lat: None,
            max_lon: None,
            raw: true,
        };

        let (start, end, bbox, which) = params.resolve(&default_bbox());
        assert_eq!(start.to_rfc3339(), "2025-05-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-05-02T00:00:00+00:00");
        assert_eq!(bbox.min_lat, 40.9);
        assert_eq!(bbox.min_lon, 1.10);
        assert_eq!(which, StoreKind::Raw);
    }

    #[test]
    fn test_resolve_ignores_bad_times() {
        let params = ObservationQuery {
            start_time: Some("not-a-time".to_string()),
            end_time: Some("also bad".to_string()),
            min_lat: None,
            min_lon: None,
            max_lat: None,
            max_lon: None,
            raw: false,
        };

        let (start, end, _, _) = params.resolve(&default_bbox());
        assert_eq!(end - start, ChronoDuration::days(7));
    }
}
