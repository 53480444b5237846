//! WebSocket wire frames.
//!
//! Every frame crossing the socket is a JSON object with a `type`
//! discriminator and optional `room_id`, `content`, and `data` members,
//! modeled here as tagged unions over the accepted inbound and emitted
//! outbound frame sets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use parlor_core::result::AppResult;
use parlor_entity::message::MessageView;
use parlor_entity::user::UserPublic;

/// Frames accepted from clients. Unknown `type`s fail to parse and are
/// discarded by the reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// A chat message for the sender's current room.
    Message {
        #[serde(default)]
        content: String,
    },
    /// Switch the connection to another room, enrolling if necessary.
    JoinRoom {
        #[serde(default)]
        room_id: i64,
    },
    /// Detach from the current room and close the connection.
    LeaveRoom,
}

/// Frames emitted to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A chat message fanned out to the room.
    Message { room_id: i64, data: MessageView },
    /// A user attached to the room.
    UserJoined { room_id: i64, data: UserJoinedData },
    /// A user detached from the room.
    UserLeft { room_id: i64, data: UserLeftData },
    /// Snapshot of the room's online users, sent to a newly attached
    /// connection.
    OnlineUsers { room_id: i64, data: OnlineUsersData },
}

/// Payload of a `user_joined` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserJoinedData {
    pub user: UserPublic,
}

/// Payload of a `user_left` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLeftData {
    pub user_id: i64,
}

/// Payload of an `online_users` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUsersData {
    pub users: Vec<UserPublic>,
}

impl ServerFrame {
    /// The room this frame addresses.
    pub fn room_id(&self) -> i64 {
        match self {
            Self::Message { room_id, .. }
            | Self::UserJoined { room_id, .. }
            | Self::UserLeft { room_id, .. }
            | Self::OnlineUsers { room_id, .. } => *room_id,
        }
    }

    /// Serialize once for fan-out; recipients share the buffer.
    pub fn encode(&self) -> AppResult<Arc<str>> {
        let json = serde_json::to_string(self)?;
        Ok(Arc::from(json.into_boxed_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inbound_message() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"message","room_id":1,"content":"hi"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Message { content } if content == "hi"));
    }

    #[test]
    fn parses_join_and_leave() {
        let join: ClientFrame = serde_json::from_str(r#"{"type":"join_room","room_id":2}"#).unwrap();
        assert!(matches!(join, ClientFrame::JoinRoom { room_id: 2 }));

        let leave: ClientFrame = serde_json::from_str(r#"{"type":"leave_room"}"#).unwrap();
        assert!(matches!(leave, ClientFrame::LeaveRoom));
    }

    #[test]
    fn missing_optional_fields_default() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"message"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Message { content } if content.is_empty()));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"upload_file"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>("not json").is_err());
    }

    #[test]
    fn user_left_wire_shape() {
        let frame = ServerFrame::UserLeft {
            room_id: 3,
            data: UserLeftData { user_id: 9 },
        };
        let json: serde_json::Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(json["type"], "user_left");
        assert_eq!(json["room_id"], 3);
        assert_eq!(json["data"]["user_id"], 9);
    }
}
