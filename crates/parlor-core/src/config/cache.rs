//! Presence cache configuration.

use serde::{Deserialize, Serialize};

/// Redis presence cache configuration.
///
/// The cache is optional: when `enabled` is false or the connection fails
/// at startup, presence features degrade to no-ops and the server keeps
/// running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether to attempt a Redis connection at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Redis connection URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Key prefix for all Parlor cache keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// TTL for per-user presence entries in seconds.
    #[serde(default = "default_presence_ttl")]
    pub presence_ttl_seconds: u64,
    /// Number of recent messages retained per room.
    #[serde(default = "default_recent_limit")]
    pub recent_messages_limit: u64,
    /// TTL for the per-room recent-message list in seconds.
    #[serde(default = "default_recent_ttl")]
    pub recent_messages_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: default_url(),
            key_prefix: default_key_prefix(),
            presence_ttl_seconds: default_presence_ttl(),
            recent_messages_limit: default_recent_limit(),
            recent_messages_ttl_seconds: default_recent_ttl(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "parlor:".to_string()
}

fn default_presence_ttl() -> u64 {
    30 * 60
}

fn default_recent_limit() -> u64 {
    100
}

fn default_recent_ttl() -> u64 {
    24 * 60 * 60
}
