//! `AuthUser` extractor — pulls the bearer token from the Authorization
//! header, validates it, and loads the current user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use parlor_core::error::AppError;
use parlor_entity::user::User;

use crate::state::AppState;

/// The authenticated user behind the request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl std::ops::Deref for AuthUser {
    type Target = User;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

        let claims = state.jwt.verify(token)?;

        let user = state
            .users
            .find_by_id(claims.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

        Ok(AuthUser(user))
    }
}
