//! Route definitions for the Parlor HTTP API.
//!
//! All routes are mounted under `/api/v1`. The router receives `AppState`
//! and passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(profile_routes())
        .merge(room_routes())
        .merge(health_routes())
        .route("/ws", get(handlers::ws::attach));

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Registration and login.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
}

/// Current-user profile.
fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(handlers::user::get_profile))
        .route("/profile", put(handlers::user::update_profile))
}

/// Room CRUD, membership, and history.
fn room_routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(handlers::room::list_rooms))
        .route("/rooms", post(handlers::room::create_room))
        .route("/rooms/{id}", get(handlers::room::get_room))
        .route("/rooms/{id}/join", post(handlers::room::join_room))
        .route("/rooms/{id}/leave", post(handlers::room::leave_room))
        .route("/rooms/{id}/messages", get(handlers::message::history))
        .route("/rooms/{id}/messages/recent", get(handlers::message::recent))
}

/// Liveness and dependency health.
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
