//! Room membership repository implementation.

use sqlx::PgPool;

use parlor_core::error::{AppError, ErrorKind};
use parlor_core::result::AppResult;
use parlor_entity::membership::{MemberRole, Membership};

/// Repository for room membership rows.
#[derive(Debug, Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Create a new membership repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a membership row for a (room, user) pair.
    pub async fn find(&self, room_id: i64, user_id: i64) -> AppResult<Option<Membership>> {
        sqlx::query_as::<_, Membership>(
            "SELECT * FROM room_members WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find membership", e))
    }

    /// Whether the user is a member of the room.
    pub async fn is_member(&self, room_id: i64, user_id: i64) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM room_members WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check membership", e))?;

        Ok(count > 0)
    }

    /// Insert a membership row; fails on duplicates.
    pub async fn insert(
        &self,
        room_id: i64,
        user_id: i64,
        role: MemberRole,
    ) -> AppResult<Membership> {
        sqlx::query_as::<_, Membership>(
            "INSERT INTO room_members (room_id, user_id, role) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert membership", e))
    }

    /// Insert a membership row unless one already exists.
    pub async fn insert_if_absent(
        &self,
        room_id: i64,
        user_id: i64,
        role: MemberRole,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO room_members (room_id, user_id, role) VALUES ($1, $2, $3) \
             ON CONFLICT (room_id, user_id) DO NOTHING",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert membership", e))?;

        Ok(())
    }

    /// Delete a membership row. Returns `true` if a row was removed.
    pub async fn delete(&self, room_id: i64, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM room_members WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete membership", e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of members enrolled in a room.
    pub async fn member_count(&self, room_id: i64) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM room_members WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count members", e))
    }
}
