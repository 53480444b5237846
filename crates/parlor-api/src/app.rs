//! Application wiring: construct the shared state, build the router, bind
//! and serve.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use parlor_auth::jwt::JwtKeys;
use parlor_auth::password::PasswordHasher;
use parlor_cache::PresenceCache;
use parlor_core::config::AppConfig;
use parlor_core::error::AppError;
use parlor_database::repositories::{
    MembershipRepository, MessageRepository, RoomRepository, UserRepository,
};
use parlor_realtime::{ChatStore, Hub, MessageIngestion, PgChatStore};

use crate::router::build_router;
use crate::state::AppState;

/// Construct the full application state over an established database pool
/// and (possibly degraded) presence cache.
pub fn build_state(config: AppConfig, pool: PgPool, cache: PresenceCache) -> AppState {
    let cache = Arc::new(cache);
    let store: Arc<dyn ChatStore> = Arc::new(PgChatStore::new(pool.clone()));

    let hub = Arc::new(Hub::new(store.clone(), cache.clone()));
    let ingest = Arc::new(MessageIngestion::new(store, cache.clone(), hub.clone()));

    let jwt = Arc::new(JwtKeys::new(&config.auth));

    AppState {
        config: Arc::new(config),
        db: pool.clone(),
        cache,
        hub,
        ingest,
        users: UserRepository::new(pool.clone()),
        rooms: RoomRepository::new(pool.clone()),
        memberships: MembershipRepository::new(pool.clone()),
        messages: MessageRepository::new(pool),
        hasher: PasswordHasher::new(),
        jwt,
    }
}

/// Bind the configured address and serve until the process exits.
pub async fn run_server(
    config: AppConfig,
    pool: PgPool,
    cache: PresenceCache,
) -> Result<(), AppError> {
    let addr = config.server.bind_addr();
    let state = build_state(config, pool, cache);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!(addr = %addr, "Parlor listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))
}
