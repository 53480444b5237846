//! Application state shared across all handlers.

use std::sync::Arc;

use sqlx::PgPool;

use parlor_auth::jwt::JwtKeys;
use parlor_auth::password::PasswordHasher;
use parlor_cache::PresenceCache;
use parlor_core::config::AppConfig;
use parlor_database::repositories::{
    MembershipRepository, MessageRepository, RoomRepository, UserRepository,
};
use parlor_realtime::{Hub, MessageIngestion};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All non-trivially
/// cloneable fields are `Arc`-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool.
    pub db: PgPool,
    /// Presence cache (no-op when Redis is absent).
    pub cache: Arc<PresenceCache>,

    /// Connection registry and fan-out.
    pub hub: Arc<Hub>,
    /// Chat message ingestion pipeline.
    pub ingest: Arc<MessageIngestion>,

    /// User repository.
    pub users: UserRepository,
    /// Room repository.
    pub rooms: RoomRepository,
    /// Membership repository.
    pub memberships: MembershipRepository,
    /// Message repository.
    pub messages: MessageRepository,

    /// Password hasher (Argon2id).
    pub hasher: PasswordHasher,
    /// JWT signing/verification keys.
    pub jwt: Arc<JwtKeys>,
}
