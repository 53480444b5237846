//! User entity model and its wire projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2id password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name; defaults to the username at registration.
    pub nickname: String,
    /// Avatar URL.
    pub avatar: String,
    /// Whether the user currently holds a live connection.
    pub is_online: bool,
    /// Last time the user was seen online.
    pub last_seen: Option<DateTime<Utc>>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The public projection of this user (no credentials).
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            nickname: self.nickname.clone(),
            avatar: self.avatar.clone(),
            is_online: self.is_online,
            last_seen: self.last_seen,
        }
    }

    /// The compact author projection embedded in message payloads.
    pub fn author_brief(&self) -> AuthorBrief {
        AuthorBrief {
            id: self.id,
            username: self.username.clone(),
            nickname: self.nickname.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Public user projection carried in API responses and presence frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserPublic {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub nickname: String,
    pub avatar: String,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl UserPublic {
    /// The compact author projection embedded in message payloads.
    pub fn author_brief(&self) -> AuthorBrief {
        AuthorBrief {
            id: self.id,
            username: self.username.clone(),
            nickname: self.nickname.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Compact author projection embedded in chat message payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorBrief {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub avatar: String,
}
