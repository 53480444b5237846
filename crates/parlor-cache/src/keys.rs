//! Cache key builders.
//!
//! All keys are built here so the keyspace layout is visible in one place.
//! The [`RedisClient`](crate::client::RedisClient) prefix is applied on top
//! of these.

/// Per-user presence entry (JSON value, TTL-bound).
pub fn presence_user(user_id: i64) -> String {
    format!("presence:user:{user_id}")
}

/// Per-room set of online user ids.
pub fn presence_room(room_id: i64) -> String {
    format!("presence:room:{room_id}")
}

/// Per-room list of recent serialized messages.
pub fn room_recent(room_id: i64) -> String {
    format!("room:recent:{room_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(presence_user(7), "presence:user:7");
        assert_eq!(presence_room(1), "presence:room:1");
        assert_eq!(room_recent(42), "room:recent:42");
    }
}
