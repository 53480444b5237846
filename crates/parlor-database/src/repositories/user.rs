//! User repository implementation.

use sqlx::PgPool;

use parlor_core::error::{AppError, ErrorKind};
use parlor_core::result::AppResult;
use parlor_entity::user::{User, UserPublic};

/// Fields required to insert a new user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub nickname: String,
    pub avatar: String,
}

/// Repository for user rows.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by primary key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    /// Find a user by username or email (login identity).
    pub async fn find_by_identity(&self, identity: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1)",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find user by identity", e)
        })
    }

    /// Check whether a username or email is already taken.
    pub async fn identity_taken(&self, username: &str, email: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users \
             WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check identity", e))?;

        Ok(count > 0)
    }

    /// Insert a new user and return the created row.
    ///
    /// An empty nickname falls back to the username.
    pub async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let nickname = if user.nickname.is_empty() {
            user.username.as_str()
        } else {
            user.nickname.as_str()
        };

        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, nickname, avatar) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(nickname)
        .bind(&user.avatar)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create user", e))
    }

    /// Update nickname and/or avatar; unchanged fields pass `None`.
    pub async fn update_profile(
        &self,
        id: i64,
        nickname: Option<&str>,
        avatar: Option<&str>,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET \
                 nickname = COALESCE($2, nickname), \
                 avatar = COALESCE($3, avatar), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(nickname)
        .bind(avatar)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update profile", e))
    }

    /// Set the durable online flag; going offline also stamps `last_seen`.
    pub async fn set_presence(&self, id: i64, online: bool) -> AppResult<()> {
        let query = if online {
            "UPDATE users SET is_online = TRUE, updated_at = NOW() WHERE id = $1"
        } else {
            "UPDATE users SET is_online = FALSE, last_seen = NOW(), updated_at = NOW() \
             WHERE id = $1"
        };

        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update presence", e)
            })?;

        Ok(())
    }

    /// Public projection of a single user.
    pub async fn find_public(&self, id: i64) -> AppResult<Option<UserPublic>> {
        sqlx::query_as::<_, UserPublic>(
            "SELECT id, username, email, nickname, avatar, is_online, last_seen \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load public user", e))
    }

    /// Public projections for a set of user ids.
    pub async fn list_public(&self, ids: &[i64]) -> AppResult<Vec<UserPublic>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, UserPublic>(
            "SELECT id, username, email, nickname, avatar, is_online, last_seen \
             FROM users WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list public users", e))
    }
}
