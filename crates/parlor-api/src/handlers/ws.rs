//! The attach endpoint: upgrade an authenticated request to the chat
//! transport, register the connection, and run its pumps.

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::info;

use parlor_core::error::AppError;
use parlor_realtime::connection::{ConnectionHandle, run_connection};

use crate::extractors::AuthUser;
use crate::state::AppState;

/// `GET /api/v1/ws` query parameters. `room_id` is parsed by hand so a
/// missing value can default while a malformed one is rejected.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub room_id: Option<String>,
}

/// `GET /api/v1/ws?room_id=<uint>` — WebSocket upgrade.
///
/// Authentication happens before the upgrade; an invalid bearer token is a
/// plain 401 and no socket is opened.
pub async fn attach(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let room_id = parse_room_id(query.room_id.as_deref(), state.config.realtime.default_room_id)?;

    let max_frame = state.config.realtime.max_frame_bytes;
    let user_id = auth.id;

    Ok(ws
        .max_message_size(max_frame)
        .on_upgrade(move |socket| handle_socket(socket, state, user_id, room_id)))
}

/// Construct the connection, register it with the hub, and drive the pumps
/// until the connection dies.
async fn handle_socket(socket: WebSocket, state: AppState, user_id: i64, room_id: i64) {
    let config = state.config.realtime.clone();

    let handle = Arc::new(ConnectionHandle::new(user_id, room_id));
    let (sender, outbound) = mpsc::channel(config.outbound_queue_capacity);

    state.hub.register(handle.clone(), sender).await;

    info!(conn_id = %handle.id, user_id, room_id, "WebSocket connection established");

    run_connection(
        socket,
        handle.clone(),
        outbound,
        state.hub.clone(),
        state.ingest.clone(),
        config,
    )
    .await;

    info!(conn_id = %handle.id, user_id, "WebSocket connection closed");
}

/// An absent `room_id` falls back to the default room; a malformed one is
/// a client error.
fn parse_room_id(raw: Option<&str>, default_room: i64) -> Result<i64, AppError> {
    match raw {
        None | Some("") => Ok(default_room),
        Some(raw) => raw
            .parse::<u32>()
            .map(i64::from)
            .map_err(|_| AppError::bad_request("Invalid room ID")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_defaults_when_absent() {
        assert_eq!(parse_room_id(None, 1).unwrap(), 1);
        assert_eq!(parse_room_id(Some(""), 1).unwrap(), 1);
    }

    #[test]
    fn room_id_parses_unsigned() {
        assert_eq!(parse_room_id(Some("42"), 1).unwrap(), 42);
    }

    #[test]
    fn malformed_room_id_is_rejected() {
        assert!(parse_room_id(Some("abc"), 1).is_err());
        assert!(parse_room_id(Some("-3"), 1).is_err());
    }
}
