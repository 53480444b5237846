//! Room entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A chat room.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    /// Unique room identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Whether the room requires a password (or membership) to enter.
    pub is_private: bool,
    /// Argon2id hash of the room password; empty for public rooms.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Maximum member count admitted via the join endpoint.
    pub max_members: i32,
    /// User who created the room.
    pub creator_id: i64,
    /// When the room was created.
    pub created_at: DateTime<Utc>,
    /// When the room was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// API projection with the member count attached.
    pub fn view(&self, member_count: i64) -> RoomView {
        RoomView {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            is_private: self.is_private,
            max_members: self.max_members,
            creator_id: self.creator_id,
            member_count,
            created_at: self.created_at,
        }
    }
}

/// Room projection returned by the room endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub is_private: bool,
    pub max_members: i32,
    pub creator_id: i64,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}
