//! Chat message entity model and wire projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::user::AuthorBrief;

/// Kind of chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "message_kind", rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text sent by a user.
    Text,
    /// Image attachment reference.
    Image,
    /// File attachment reference.
    File,
    /// Server-generated notice.
    System,
}

/// A persisted chat message.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Unique message identifier.
    pub id: i64,
    /// Room the message was sent to.
    pub room_id: i64,
    /// Author; the system user for system messages.
    pub user_id: i64,
    /// Message kind.
    pub kind: MessageKind,
    /// Textual content.
    pub content: String,
    /// Attachment URL for file/image messages.
    pub file_url: Option<String>,
    /// Attachment file name.
    pub file_name: Option<String>,
    /// Attachment size in bytes.
    pub file_size: Option<i64>,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Wire projection with the author embedded.
    ///
    /// File metadata is carried only for file/image kinds, matching the
    /// shape history readers expect.
    pub fn view(&self, author: Option<AuthorBrief>) -> MessageView {
        let carries_file = matches!(self.kind, MessageKind::File | MessageKind::Image);
        MessageView {
            id: self.id,
            room_id: self.room_id,
            user_id: self.user_id,
            kind: self.kind,
            content: self.content.clone(),
            created_at: self.created_at,
            user: author,
            file_url: if carries_file { self.file_url.clone() } else { None },
            file_name: if carries_file { self.file_name.clone() } else { None },
            file_size: if carries_file { self.file_size } else { None },
        }
    }
}

/// Fields required to insert a new message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: i64,
    pub user_id: i64,
    pub kind: MessageKind,
    pub content: String,
}

impl NewMessage {
    /// A text message from a user.
    pub fn text(room_id: i64, user_id: i64, content: impl Into<String>) -> Self {
        Self {
            room_id,
            user_id,
            kind: MessageKind::Text,
            content: content.into(),
        }
    }

    /// A server-generated system notice.
    pub fn system(room_id: i64, user_id: i64, content: impl Into<String>) -> Self {
        Self {
            room_id,
            user_id,
            kind: MessageKind::System,
            content: content.into(),
        }
    }
}

/// Message projection carried on the wire and in history responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    /// Serialized as `"type"` on the wire.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Author projection; absent when the profile could not be loaded.
    pub user: Option<AuthorBrief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: MessageKind) -> Message {
        Message {
            id: 7,
            room_id: 1,
            user_id: 2,
            kind,
            content: "hi".to_string(),
            file_url: Some("https://cdn.example/x.png".to_string()),
            file_name: Some("x.png".to_string()),
            file_size: Some(1024),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn kind_serializes_as_type_field() {
        let view = sample(MessageKind::Text).view(None);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "text");
        assert!(json.get("file_url").is_none());
    }

    #[test]
    fn file_metadata_only_for_file_kinds() {
        let text = sample(MessageKind::Text).view(None);
        assert!(text.file_url.is_none());

        let image = sample(MessageKind::Image).view(None);
        assert_eq!(image.file_name.as_deref(), Some("x.png"));
    }
}
