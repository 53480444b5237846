//! Presence tracking and recent-message caching.
//!
//! Presence is stored two ways: a per-user JSON entry with a TTL (the
//! liveness record) and a per-room set of user ids (so listing a room's
//! online users is O(room size) rather than a scan of every presence key).
//! Set members whose per-user entry has expired are filtered and pruned on
//! read.

use chrono::Utc;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use parlor_core::config::CacheConfig;
use parlor_core::error::{AppError, ErrorKind};
use parlor_core::result::AppResult;

use crate::client::RedisClient;
use crate::keys;

/// A user's transient presence record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub user_id: i64,
    pub room_id: i64,
    /// Unix timestamp of the last presence refresh.
    pub timestamp: i64,
}

/// Optional Redis-backed presence cache.
///
/// Holds `None` when Redis is disabled or unreachable at startup; every
/// operation then returns its neutral value so callers never need to care.
#[derive(Debug, Clone)]
pub struct PresenceCache {
    client: Option<RedisClient>,
    presence_ttl_seconds: u64,
    recent_limit: u64,
    recent_ttl_seconds: u64,
}

impl PresenceCache {
    /// Connect to Redis, degrading to a no-op cache on any failure.
    pub async fn connect(config: &CacheConfig) -> Self {
        let client = if config.enabled {
            match RedisClient::connect(config).await {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "Redis unavailable; presence features disabled");
                    None
                }
            }
        } else {
            info!("Presence cache disabled by configuration");
            None
        };

        Self {
            client,
            presence_ttl_seconds: config.presence_ttl_seconds,
            recent_limit: config.recent_messages_limit,
            recent_ttl_seconds: config.recent_messages_ttl_seconds,
        }
    }

    /// A cache with no backing Redis; every operation is a no-op.
    pub fn disabled() -> Self {
        let defaults = CacheConfig::default();
        Self {
            client: None,
            presence_ttl_seconds: defaults.presence_ttl_seconds,
            recent_limit: defaults.recent_messages_limit,
            recent_ttl_seconds: defaults.recent_messages_ttl_seconds,
        }
    }

    /// Whether a Redis connection is held.
    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    /// Record a user as online in a room.
    ///
    /// Moving rooms removes the user from the previous room's set first.
    pub async fn set_user_online(&self, user_id: i64, room_id: i64) -> AppResult<()> {
        let Some(client) = &self.client else {
            return Ok(());
        };
        let mut conn = client.conn_mut();

        let user_key = client.prefixed_key(&keys::presence_user(user_id));
        let previous: Option<String> = conn.get(&user_key).await.map_err(map_err)?;
        if let Some(previous) = previous
            .as_deref()
            .and_then(|raw| serde_json::from_str::<PresenceEntry>(raw).ok())
        {
            if previous.room_id != room_id {
                let old_room_key = client.prefixed_key(&keys::presence_room(previous.room_id));
                let _: () = conn.srem(&old_room_key, user_id).await.map_err(map_err)?;
            }
        }

        let entry = PresenceEntry {
            user_id,
            room_id,
            timestamp: Utc::now().timestamp(),
        };
        let payload = serde_json::to_string(&entry)?;
        let room_key = client.prefixed_key(&keys::presence_room(room_id));

        let _: () = redis::pipe()
            .set_ex(&user_key, payload, self.presence_ttl_seconds)
            .sadd(&room_key, user_id)
            .expire(&room_key, self.presence_ttl_seconds as i64)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;

        Ok(())
    }

    /// Clear a user's presence entry and room-set membership.
    pub async fn set_user_offline(&self, user_id: i64) -> AppResult<()> {
        let Some(client) = &self.client else {
            return Ok(());
        };
        let mut conn = client.conn_mut();

        let user_key = client.prefixed_key(&keys::presence_user(user_id));
        let entry: Option<String> = conn.get(&user_key).await.map_err(map_err)?;
        if let Some(entry) = entry
            .as_deref()
            .and_then(|raw| serde_json::from_str::<PresenceEntry>(raw).ok())
        {
            let room_key = client.prefixed_key(&keys::presence_room(entry.room_id));
            let _: () = conn.srem(&room_key, user_id).await.map_err(map_err)?;
        }

        let _: () = conn.del(&user_key).await.map_err(map_err)?;
        Ok(())
    }

    /// List the user ids currently online in a room.
    ///
    /// Set members whose per-user entry has expired are pruned as a side
    /// effect. Returns an empty list when the cache is absent.
    pub async fn online_users_in_room(&self, room_id: i64) -> AppResult<Vec<i64>> {
        let Some(client) = &self.client else {
            return Ok(Vec::new());
        };
        let mut conn = client.conn_mut();

        let room_key = client.prefixed_key(&keys::presence_room(room_id));
        let members: Vec<i64> = conn.smembers(&room_key).await.map_err(map_err)?;

        let mut online = Vec::with_capacity(members.len());
        for user_id in members {
            let user_key = client.prefixed_key(&keys::presence_user(user_id));
            let live: bool = conn.exists(&user_key).await.map_err(map_err)?;
            if live {
                online.push(user_id);
            } else {
                let _: () = conn.srem(&room_key, user_id).await.map_err(map_err)?;
            }
        }

        online.sort_unstable();
        Ok(online)
    }

    /// Push a serialized message onto a room's recent list, bounded to the
    /// configured limit with a rolling TTL.
    pub async fn push_recent(&self, room_id: i64, payload: &str) -> AppResult<()> {
        let Some(client) = &self.client else {
            return Ok(());
        };
        let mut conn = client.conn_mut();

        let key = client.prefixed_key(&keys::room_recent(room_id));
        let _: () = redis::pipe()
            .lpush(&key, payload)
            .ltrim(&key, 0, self.recent_limit as isize - 1)
            .expire(&key, self.recent_ttl_seconds as i64)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;

        Ok(())
    }

    /// Read up to `limit` recent serialized messages, newest first.
    pub async fn recent_messages(&self, room_id: i64, limit: u64) -> AppResult<Vec<String>> {
        let Some(client) = &self.client else {
            return Ok(Vec::new());
        };
        let mut conn = client.conn_mut();

        let key = client.prefixed_key(&keys::room_recent(room_id));
        let capped = limit.min(self.recent_limit);
        conn.lrange(&key, 0, capped as isize - 1)
            .await
            .map_err(map_err)
    }

    /// Ping the backing Redis; `false` when absent.
    pub async fn health_check(&self) -> bool {
        match &self.client {
            Some(client) => client.health_check().await.unwrap_or(false),
            None => false,
        }
    }
}

fn map_err(e: redis::RedisError) -> AppError {
    AppError::with_source(ErrorKind::Cache, format!("Redis error: {e}"), e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_cache_is_neutral() {
        let cache = PresenceCache::disabled();
        assert!(!cache.is_available());

        cache.set_user_online(1, 1).await.unwrap();
        cache.set_user_offline(1).await.unwrap();
        cache.push_recent(1, "{}").await.unwrap();

        assert!(cache.online_users_in_room(1).await.unwrap().is_empty());
        assert!(cache.recent_messages(1, 50).await.unwrap().is_empty());
        assert!(!cache.health_check().await);
    }

    #[test]
    fn presence_entry_round_trips() {
        let entry = PresenceEntry {
            user_id: 3,
            room_id: 9,
            timestamp: 1_700_000_000,
        };
        let raw = serde_json::to_string(&entry).unwrap();
        assert_eq!(serde_json::from_str::<PresenceEntry>(&raw).unwrap(), entry);
    }
}
