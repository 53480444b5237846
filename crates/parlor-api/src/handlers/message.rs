//! Message history endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::warn;

use parlor_core::result::AppResult;
use parlor_core::types::pagination::{PageRequest, PageResponse};
use parlor_entity::message::MessageView;

use crate::extractors::AuthUser;
use crate::handlers::room::load_visible_room;
use crate::state::AppState;

/// `GET /api/v1/rooms/{id}/messages` query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// `GET /api/v1/rooms/{id}/messages/recent` query parameters.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Body of the recent-messages endpoint, newest first.
#[derive(Debug, Serialize)]
pub struct RecentMessagesResponse {
    pub messages: Vec<MessageView>,
}

/// `GET /api/v1/rooms/{id}/messages` — paginated history. Pages are fetched
/// newest-first but returned oldest-first within the page, the order chat
/// clients render.
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<PageResponse<MessageView>>> {
    load_visible_room(&state, &auth, room_id).await?;

    let page = PageRequest {
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(50),
    }
    .clamped(50);

    let mut response = state.messages.list_by_room(room_id, &page).await?;
    response.items.reverse();

    Ok(Json(response))
}

/// `GET /api/v1/rooms/{id}/messages/recent` — the recent-message cache,
/// falling back to the store when the cache is absent or empty.
pub async fn recent(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<i64>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<RecentMessagesResponse>> {
    load_visible_room(&state, &auth, room_id).await?;

    let limit = query.limit.unwrap_or(50).clamp(1, 100);

    let cached = match state.cache.recent_messages(room_id, limit).await {
        Ok(cached) => cached,
        Err(e) => {
            warn!(error = %e, room_id, "Recent-message cache read failed");
            Vec::new()
        }
    };

    let mut messages: Vec<MessageView> = cached
        .iter()
        .filter_map(|raw| serde_json::from_str(raw).ok())
        .collect();

    if messages.is_empty() {
        let page = PageRequest::new(1, limit as u32);
        messages = state.messages.list_by_room(room_id, &page).await?.items;
    }

    Ok(Json(RecentMessagesResponse { messages }))
}
