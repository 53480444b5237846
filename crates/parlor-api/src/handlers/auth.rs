//! Registration and login endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use parlor_core::error::AppError;
use parlor_core::result::AppResult;
use parlor_database::repositories::user::CreateUser;
use parlor_entity::user::UserPublic;

use crate::state::AppState;

/// `POST /api/v1/auth/register` request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub nickname: String,
}

/// `POST /api/v1/auth/login` request body. `username` also accepts the
/// account email.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body returned by both auth endpoints.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPublic,
}

/// Register a new account and hand back a token.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    let nickname = req.nickname.trim().to_string();

    if username.len() < 3 || username.len() > 50 {
        return Err(AppError::validation("Username must be 3-50 characters"));
    }
    if !email.contains('@') || email.len() > 100 {
        return Err(AppError::validation("Invalid email address"));
    }
    if req.password.len() < 6 {
        return Err(AppError::validation("Password must be at least 6 characters"));
    }

    if state.users.identity_taken(&username, &email).await? {
        return Err(AppError::conflict("Username or email already exists"));
    }

    let password_hash = state.hasher.hash_password(&req.password)?;
    let user = state
        .users
        .create(&CreateUser {
            username,
            email,
            password_hash,
            nickname,
            avatar: String::new(),
        })
        .await?;

    let token = state.jwt.issue(user.id, &user.username, &user.email)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.public(),
        }),
    ))
}

/// Authenticate by username or email and hand back a token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = state
        .users
        .find_by_identity(req.username.trim())
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid username or password"))?;

    if !state.hasher.verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::unauthorized("Invalid username or password"));
    }

    state.users.set_presence(user.id, true).await?;

    let token = state.jwt.issue(user.id, &user.username, &user.email)?;

    Ok(Json(AuthResponse {
        token,
        user: user.public(),
    }))
}
