//! Persistence gateway consumed by the chat fabric.
//!
//! [`ChatStore`] is the narrow contract the hub and ingestion pipeline need
//! from the durable store. The production implementation delegates to the
//! repositories; tests substitute in-memory fakes.

use async_trait::async_trait;
use sqlx::PgPool;

use parlor_core::result::AppResult;
use parlor_database::repositories::{
    MembershipRepository, MessageRepository, RoomRepository, UserRepository,
};
use parlor_entity::membership::MemberRole;
use parlor_entity::message::{Message, NewMessage};
use parlor_entity::user::UserPublic;

/// Store operations the real-time fabric depends on.
#[async_trait]
pub trait ChatStore: Send + Sync + 'static {
    /// Whether the user is enrolled in the room.
    async fn is_member(&self, room_id: i64, user_id: i64) -> AppResult<bool>;

    /// Persist a chat record and return the stored row.
    async fn insert_message(&self, message: &NewMessage) -> AppResult<Message>;

    /// Enroll the user as a `member` of the room if not already enrolled.
    async fn upsert_membership(&self, room_id: i64, user_id: i64) -> AppResult<()>;

    /// Public profile of a user, if it exists.
    async fn load_user_public(&self, user_id: i64) -> AppResult<Option<UserPublic>>;

    /// Update the durable online flag (and `last_seen` when going offline).
    async fn set_user_presence(&self, user_id: i64, online: bool) -> AppResult<()>;

    /// Public profiles for a set of user ids.
    async fn list_public_users(&self, ids: &[i64]) -> AppResult<Vec<UserPublic>>;

    /// Whether the room exists at all.
    async fn room_exists(&self, room_id: i64) -> AppResult<bool>;
}

/// PostgreSQL-backed [`ChatStore`] over the repositories.
#[derive(Debug, Clone)]
pub struct PgChatStore {
    users: UserRepository,
    rooms: RoomRepository,
    memberships: MembershipRepository,
    messages: MessageRepository,
}

impl PgChatStore {
    /// Create a gateway over a shared connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            rooms: RoomRepository::new(pool.clone()),
            memberships: MembershipRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn is_member(&self, room_id: i64, user_id: i64) -> AppResult<bool> {
        self.memberships.is_member(room_id, user_id).await
    }

    async fn insert_message(&self, message: &NewMessage) -> AppResult<Message> {
        self.messages.insert(message).await
    }

    async fn upsert_membership(&self, room_id: i64, user_id: i64) -> AppResult<()> {
        self.memberships
            .insert_if_absent(room_id, user_id, MemberRole::Member)
            .await
    }

    async fn load_user_public(&self, user_id: i64) -> AppResult<Option<UserPublic>> {
        self.users.find_public(user_id).await
    }

    async fn set_user_presence(&self, user_id: i64, online: bool) -> AppResult<()> {
        self.users.set_presence(user_id, online).await
    }

    async fn list_public_users(&self, ids: &[i64]) -> AppResult<Vec<UserPublic>> {
        self.users.list_public(ids).await
    }

    async fn room_exists(&self, room_id: i64) -> AppResult<bool> {
        self.rooms.exists(room_id).await
    }
}
