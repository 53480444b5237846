//! Chat message repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use parlor_core::error::{AppError, ErrorKind};
use parlor_core::result::AppResult;
use parlor_core::types::pagination::{PageRequest, PageResponse};
use parlor_entity::message::{Message, MessageKind, MessageView, NewMessage};
use parlor_entity::user::AuthorBrief;

/// A message row joined with its author's brief profile.
#[derive(Debug, FromRow)]
struct MessageAuthorRow {
    id: i64,
    room_id: i64,
    user_id: i64,
    kind: MessageKind,
    content: String,
    file_url: Option<String>,
    file_name: Option<String>,
    file_size: Option<i64>,
    created_at: DateTime<Utc>,
    author_username: Option<String>,
    author_nickname: Option<String>,
    author_avatar: Option<String>,
}

impl MessageAuthorRow {
    fn into_view(self) -> MessageView {
        let author = self.author_username.map(|username| AuthorBrief {
            id: self.user_id,
            username,
            nickname: self.author_nickname.unwrap_or_default(),
            avatar: self.author_avatar.unwrap_or_default(),
        });

        Message {
            id: self.id,
            room_id: self.room_id,
            user_id: self.user_id,
            kind: self.kind,
            content: self.content,
            file_url: self.file_url,
            file_name: self.file_name,
            file_size: self.file_size,
            created_at: self.created_at,
        }
        .view(author)
    }
}

/// Repository for message rows.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a message and return the persisted row.
    pub async fn insert(&self, message: &NewMessage) -> AppResult<Message> {
        sqlx::query_as::<_, Message>(
            "INSERT INTO messages (room_id, user_id, kind, content) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(message.room_id)
        .bind(message.user_id)
        .bind(message.kind)
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert message", e))
    }

    /// Page through a room's history, newest first, authors embedded.
    pub async fn list_by_room(
        &self,
        room_id: i64,
        page: &PageRequest,
    ) -> AppResult<PageResponse<MessageView>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count messages", e)
            })?;

        let rows = sqlx::query_as::<_, MessageAuthorRow>(
            "SELECT m.id, m.room_id, m.user_id, m.kind, m.content, \
                    m.file_url, m.file_name, m.file_size, m.created_at, \
                    u.username AS author_username, \
                    u.nickname AS author_nickname, \
                    u.avatar AS author_avatar \
             FROM messages m \
             LEFT JOIN users u ON u.id = m.user_id \
             WHERE m.room_id = $1 \
             ORDER BY m.created_at DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(room_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list messages", e))?;

        let views = rows.into_iter().map(MessageAuthorRow::into_view).collect();

        Ok(PageResponse::new(
            views,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
