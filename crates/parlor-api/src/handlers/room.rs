//! Room endpoints: listing, creation, detail, join, leave.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use parlor_core::error::AppError;
use parlor_core::result::AppResult;
use parlor_core::types::pagination::{PageRequest, PageResponse};
use parlor_database::repositories::room::CreateRoom;
use parlor_entity::membership::MemberRole;
use parlor_entity::message::NewMessage;
use parlor_entity::room::{Room, RoomView};

use crate::extractors::AuthUser;
use crate::state::AppState;

/// `GET /api/v1/rooms` query parameters.
#[derive(Debug, Deserialize)]
pub struct RoomListQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub search: Option<String>,
}

/// `POST /api/v1/rooms` request body.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub max_members: i32,
}

/// `POST /api/v1/rooms/{id}/join` request body.
#[derive(Debug, Default, Deserialize)]
pub struct JoinRoomRequest {
    #[serde(default)]
    pub password: String,
}

/// `GET /api/v1/rooms` — rooms visible to the caller, paginated.
pub async fn list_rooms(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RoomListQuery>,
) -> AppResult<Json<PageResponse<RoomView>>> {
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(20),
    }
    .clamped(20);

    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let rooms = state.rooms.list_visible(auth.id, search, &page).await?;

    let mut views = Vec::with_capacity(rooms.items.len());
    for room in &rooms.items {
        let member_count = state.memberships.member_count(room.id).await?;
        views.push(room.view(member_count));
    }

    Ok(Json(PageResponse::new(
        views,
        rooms.page,
        rooms.page_size,
        rooms.total,
    )))
}

/// `POST /api/v1/rooms` — create a room; the creator is auto-enrolled.
pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateRoomRequest>,
) -> AppResult<(StatusCode, Json<RoomView>)> {
    let name = req.name.trim().to_string();
    if name.is_empty() || name.len() > 100 {
        return Err(AppError::validation("Room name must be 1-100 characters"));
    }

    let password_hash = if req.is_private && !req.password.is_empty() {
        state.hasher.hash_password(&req.password)?
    } else {
        String::new()
    };

    let max_members = if req.max_members <= 0 { 100 } else { req.max_members };

    let room = state
        .rooms
        .create(&CreateRoom {
            name,
            description: req.description.trim().to_string(),
            is_private: req.is_private,
            password_hash,
            max_members,
            creator_id: auth.id,
        })
        .await?;

    state
        .memberships
        .insert(room.id, auth.id, MemberRole::Creator)
        .await?;

    Ok((StatusCode::CREATED, Json(room.view(1))))
}

/// `GET /api/v1/rooms/{id}` — room detail.
pub async fn get_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<i64>,
) -> AppResult<Json<RoomView>> {
    let room = load_visible_room(&state, &auth, room_id).await?;
    let member_count = state.memberships.member_count(room.id).await?;
    Ok(Json(room.view(member_count)))
}

/// `POST /api/v1/rooms/{id}/join` — enroll the caller. The body is
/// optional; only private rooms need the password it carries.
pub async fn join_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<i64>,
    body: axum::body::Bytes,
) -> AppResult<Json<Value>> {
    let req: JoinRoomRequest = serde_json::from_slice(&body).unwrap_or_default();

    let room = state
        .rooms
        .find_by_id(room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;

    if state.memberships.is_member(room.id, auth.id).await? {
        return Err(AppError::conflict("Already a member of this room"));
    }

    let member_count = state.memberships.member_count(room.id).await?;
    if member_count >= i64::from(room.max_members) {
        return Err(AppError::forbidden("Room is full"));
    }

    if room.is_private && !room.password_hash.is_empty() {
        let ok = !req.password.is_empty()
            && state.hasher.verify_password(&req.password, &room.password_hash)?;
        if !ok {
            return Err(AppError::forbidden("Invalid password"));
        }
    }

    state
        .memberships
        .insert(room.id, auth.id, MemberRole::Member)
        .await?;

    state
        .messages
        .insert(&NewMessage::system(
            room.id,
            auth.id,
            format!("{} joined the room", auth.nickname),
        ))
        .await?;

    Ok(Json(json!({ "message": "Successfully joined room" })))
}

/// `POST /api/v1/rooms/{id}/leave` — withdraw the caller's membership.
pub async fn leave_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let membership = state
        .memberships
        .find(room_id, auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("Not a member of this room"))?;

    let room = state
        .rooms
        .find_by_id(room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;

    if room.creator_id == auth.id {
        return Err(AppError::forbidden("Room creator cannot leave the room"));
    }

    state.memberships.delete(membership.room_id, auth.id).await?;

    state
        .messages
        .insert(&NewMessage::system(
            room.id,
            auth.id,
            format!("{} left the room", auth.nickname),
        ))
        .await?;

    Ok(Json(json!({ "message": "Successfully left room" })))
}

/// Load a room, enforcing private-room visibility for the caller.
pub(crate) async fn load_visible_room(
    state: &AppState,
    auth: &AuthUser,
    room_id: i64,
) -> AppResult<Room> {
    let room = state
        .rooms
        .find_by_id(room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;

    if room.is_private
        && room.creator_id != auth.id
        && !state.memberships.is_member(room.id, auth.id).await?
    {
        return Err(AppError::forbidden("Access denied"));
    }

    Ok(room)
}
