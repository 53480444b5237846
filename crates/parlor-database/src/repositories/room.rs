//! Room repository implementation.

use sqlx::PgPool;

use parlor_core::error::{AppError, ErrorKind};
use parlor_core::result::AppResult;
use parlor_core::types::pagination::{PageRequest, PageResponse};
use parlor_entity::room::Room;

/// Fields required to create a room.
#[derive(Debug, Clone)]
pub struct CreateRoom {
    pub name: String,
    pub description: String,
    pub is_private: bool,
    /// Already-hashed room password; empty when the room has none.
    pub password_hash: String,
    pub max_members: i32,
    pub creator_id: i64,
}

/// Repository for room rows.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    pool: PgPool,
}

impl RoomRepository {
    /// Create a new room repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a room by primary key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Room>> {
        sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find room", e))
    }

    /// Check whether a room exists.
    pub async fn exists(&self, id: i64) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to check room existence", e)
            })?;
        Ok(count > 0)
    }

    /// Whether any room exists at all (bootstrap check).
    pub async fn any_exist(&self) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count rooms", e))?;
        Ok(count > 0)
    }

    /// Insert a new room and return the created row.
    pub async fn create(&self, room: &CreateRoom) -> AppResult<Room> {
        sqlx::query_as::<_, Room>(
            "INSERT INTO rooms (name, description, is_private, password_hash, max_members, creator_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&room.name)
        .bind(&room.description)
        .bind(room.is_private)
        .bind(&room.password_hash)
        .bind(room.max_members)
        .bind(room.creator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create room", e))
    }

    /// List rooms visible to a user, newest first.
    ///
    /// Public rooms are visible to everyone; private rooms only to their
    /// creator and members. `search` filters on name/description.
    pub async fn list_visible(
        &self,
        user_id: i64,
        search: Option<&str>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Room>> {
        let pattern = search.map(|s| format!("%{s}%"));

        let visibility = "(is_private = FALSE OR creator_id = $1 \
             OR id IN (SELECT room_id FROM room_members WHERE user_id = $1))";

        let (count_sql, list_sql) = if pattern.is_some() {
            (
                format!(
                    "SELECT COUNT(*) FROM rooms WHERE {visibility} \
                     AND (name ILIKE $2 OR description ILIKE $2)"
                ),
                format!(
                    "SELECT * FROM rooms WHERE {visibility} \
                     AND (name ILIKE $2 OR description ILIKE $2) \
                     ORDER BY created_at DESC LIMIT $3 OFFSET $4"
                ),
            )
        } else {
            (
                format!("SELECT COUNT(*) FROM rooms WHERE {visibility}"),
                format!(
                    "SELECT * FROM rooms WHERE {visibility} \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ),
            )
        };

        let (total, rooms): (i64, Vec<Room>) = if let Some(pattern) = &pattern {
            let total = sqlx::query_scalar(&count_sql)
                .bind(user_id)
                .bind(pattern)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count rooms", e)
                })?;
            let rooms = sqlx::query_as::<_, Room>(&list_sql)
                .bind(user_id)
                .bind(pattern)
                .bind(page.limit() as i64)
                .bind(page.offset() as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to list rooms", e)
                })?;
            (total, rooms)
        } else {
            let total = sqlx::query_scalar(&count_sql)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count rooms", e)
                })?;
            let rooms = sqlx::query_as::<_, Room>(&list_sql)
                .bind(user_id)
                .bind(page.limit() as i64)
                .bind(page.offset() as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to list rooms", e)
                })?;
            (total, rooms)
        };

        Ok(PageResponse::new(
            rooms,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
