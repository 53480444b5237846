//! Real-time chat fabric configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the WebSocket hub and per-connection pumps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of each connection's outbound frame queue. A full queue at
    /// broadcast time evicts the recipient.
    #[serde(default = "default_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Maximum inbound frame size in bytes; larger frames close the connection.
    #[serde(default = "default_max_frame")]
    pub max_frame_bytes: usize,
    /// Read deadline in seconds; refreshed on every keepalive reply.
    #[serde(default = "default_read_deadline")]
    pub read_deadline_seconds: u64,
    /// Write deadline in seconds, applied per write.
    #[serde(default = "default_write_deadline")]
    pub write_deadline_seconds: u64,
    /// Room a connection attaches to when no `room_id` is given.
    #[serde(default = "default_room")]
    pub default_room_id: i64,
}

impl RealtimeConfig {
    /// Read deadline as a [`Duration`].
    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.read_deadline_seconds)
    }

    /// Write deadline as a [`Duration`].
    pub fn write_deadline(&self) -> Duration {
        Duration::from_secs(self.write_deadline_seconds)
    }

    /// Keepalive probe period: 90% of the read deadline, so probes always
    /// arrive before the peer's deadline fires.
    pub fn keepalive_period(&self) -> Duration {
        Duration::from_secs(self.read_deadline_seconds * 9 / 10)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_queue_capacity(),
            max_frame_bytes: default_max_frame(),
            read_deadline_seconds: default_read_deadline(),
            write_deadline_seconds: default_write_deadline(),
            default_room_id: default_room(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_frame() -> usize {
    512
}

fn default_read_deadline() -> u64 {
    60
}

fn default_write_deadline() -> u64 {
    10
}

fn default_room() -> i64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keepalive_is_nine_tenths_of_read_deadline() {
        let config = RealtimeConfig::default();
        assert_eq!(config.read_deadline(), Duration::from_secs(60));
        assert_eq!(config.keepalive_period(), Duration::from_secs(54));
    }
}
