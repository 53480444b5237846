//! Room membership entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role a user holds within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
pub enum MemberRole {
    /// The user who created the room.
    Creator,
    /// Elevated member able to administer the room.
    Admin,
    /// Ordinary member.
    Member,
}

impl MemberRole {
    /// Whether this role carries admin privileges.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Creator | Self::Admin)
    }
}

/// The durable fact that a user is enrolled in a room.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    /// Row identifier.
    pub id: i64,
    /// Room the membership belongs to.
    pub room_id: i64,
    /// Enrolled user.
    pub user_id: i64,
    /// Role within the room.
    pub role: MemberRole,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
}
