//! Liveness and dependency health endpoints.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// `GET /api/v1/health` response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /api/v1/health/detailed` response body.
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub cache: &'static str,
    pub connections: usize,
}

/// `GET /api/v1/health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `GET /api/v1/health/detailed`
pub async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let database = if parlor_database::connection::ping(&state.db).await {
        "ok"
    } else {
        "unavailable"
    };

    let cache = if state.cache.health_check().await {
        "ok"
    } else {
        "unavailable"
    };

    Json(DetailedHealthResponse {
        status: if database == "ok" { "ok" } else { "degraded" },
        database,
        cache,
        connections: state.hub.connection_count(),
    })
}
