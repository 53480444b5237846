//! Current-user profile endpoints.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use parlor_core::result::AppResult;
use parlor_entity::user::UserPublic;

use crate::extractors::AuthUser;
use crate::state::AppState;

/// Body wrapping a user projection.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserPublic,
}

/// `PUT /api/v1/profile` request body; omitted fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// `GET /api/v1/profile`
pub async fn get_profile(auth: AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: auth.public(),
    })
}

/// `PUT /api/v1/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let nickname = req
        .nickname
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let avatar = req
        .avatar
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let user = if nickname.is_some() || avatar.is_some() {
        state.users.update_profile(auth.id, nickname, avatar).await?
    } else {
        auth.0
    };

    Ok(Json(ProfileResponse {
        user: user.public(),
    }))
}
