//! Message ingestion: validate an inbound chat frame, persist it, update
//! the recent-message cache, and hand it to the hub for fan-out.
//!
//! Ingestion is fire-and-forget from the sender's point of view: rejected
//! and failed submissions produce no error frame, only a log line. A crash
//! between the insert and the broadcast leaves a persisted-but-unbroadcast
//! message that clients pick up on their next history fetch.

use std::sync::Arc;

use tracing::{debug, warn};

use parlor_cache::PresenceCache;
use parlor_core::result::AppResult;
use parlor_entity::message::NewMessage;

use crate::connection::ConnectionHandle;
use crate::frame::ServerFrame;
use crate::gateway::ChatStore;
use crate::hub::Hub;

/// The chat message ingestion pipeline.
pub struct MessageIngestion {
    store: Arc<dyn ChatStore>,
    presence: Arc<PresenceCache>,
    hub: Arc<Hub>,
}

impl MessageIngestion {
    /// Create the pipeline over its collaborators.
    pub fn new(store: Arc<dyn ChatStore>, presence: Arc<PresenceCache>, hub: Arc<Hub>) -> Self {
        Self {
            store,
            presence,
            hub,
        }
    }

    /// Ingest a chat message from an attached connection.
    ///
    /// Empty content (after trimming) and non-member senders are silently
    /// dropped. Store failures abort before any broadcast, so a message is
    /// either persisted and fanned out or neither. Cache failures are
    /// non-fatal.
    pub async fn submit(&self, handle: &ConnectionHandle, content: &str) -> AppResult<()> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }

        let room_id = handle.room_id();
        let user_id = handle.user_id;

        if !self.store.is_member(room_id, user_id).await? {
            debug!(user_id, room_id, "Dropping chat from non-member");
            return Ok(());
        }

        let message = self
            .store
            .insert_message(&NewMessage::text(room_id, user_id, content))
            .await?;

        let author = match self.store.load_user_public(user_id).await {
            Ok(profile) => profile.map(|p| p.author_brief()),
            Err(e) => {
                warn!(error = %e, user_id, "Failed to load author profile");
                None
            }
        };

        let view = message.view(author);

        match serde_json::to_string(&view) {
            Ok(payload) => {
                if let Err(e) = self.presence.push_recent(room_id, &payload).await {
                    warn!(error = %e, room_id, "Failed to cache recent message");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize message for cache"),
        }

        self.hub
            .broadcast(room_id, &ServerFrame::Message { room_id, data: view })
            .await;

        Ok(())
    }

    /// Handle a `join_room` frame: enroll the user in the target room if
    /// needed, then re-index the connection.
    pub async fn join_room(&self, handle: &Arc<ConnectionHandle>, room_id: i64) -> AppResult<()> {
        if room_id <= 0 {
            return Ok(());
        }

        if !self.store.room_exists(room_id).await? {
            debug!(room_id, "join_room for unknown room ignored");
            return Ok(());
        }

        self.store.upsert_membership(room_id, handle.user_id).await?;
        self.hub.move_to_room(handle.id, room_id).await;

        Ok(())
    }
}
