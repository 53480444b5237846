//! The Hub: process-wide connection registry and room-scoped fan-out.
//!
//! The registry is three maps guarded by one `RwLock`, and that lock is
//! the hub's serialization point: registrations mutate under it, and each
//! fan-out runs exclusively under it doing exactly one non-blocking enqueue
//! per recipient, which is what gives every recipient in a room the same
//! frame order. A recipient whose queue is full is a slow consumer: it is
//! collected during the iteration and evicted after the lock is released,
//! so one stalled socket never delays the others beyond that single
//! enqueue attempt. Eviction cascades (a `user_left` announcement can
//! itself expose further slow consumers) are processed iteratively off a
//! worklist.
//!
//! The hub owns no durable state. A restart empties every room and clients
//! re-attach.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use parlor_cache::PresenceCache;
use parlor_entity::user::UserPublic;

use crate::connection::{ConnectionHandle, ConnectionId, OutboundFrame, OutboundSender};
use crate::frame::{OnlineUsersData, ServerFrame, UserJoinedData, UserLeftData};
use crate::gateway::ChatStore;

/// A registered connection: its identity plus the sending half of its
/// outbound queue. Dropping the entry closes the queue.
struct RegisteredConnection {
    handle: Arc<ConnectionHandle>,
    sender: OutboundSender,
}

/// The three registry indexes. Mutated only under the write lock.
#[derive(Default)]
struct Registry {
    /// Every attached connection, by connection id.
    connections: HashMap<ConnectionId, RegisteredConnection>,
    /// Room id → connections attached to it. Entries are never empty.
    by_room: HashMap<i64, HashSet<ConnectionId>>,
    /// User id → that user's single connection.
    by_user: HashMap<i64, ConnectionId>,
}

impl Registry {
    /// Install a connection, evicting any existing connection of the same
    /// user. Returns the evicted entry, fully removed from all indexes.
    fn insert(
        &mut self,
        handle: Arc<ConnectionHandle>,
        sender: OutboundSender,
    ) -> Option<RegisteredConnection> {
        let evicted = self
            .by_user
            .get(&handle.user_id)
            .copied()
            .and_then(|old_id| self.remove(old_id));

        let conn_id = handle.id;
        self.by_room.entry(handle.room_id()).or_default().insert(conn_id);
        self.by_user.insert(handle.user_id, conn_id);
        self.connections
            .insert(conn_id, RegisteredConnection { handle, sender });

        evicted
    }

    /// Remove a connection from every index. Dropping empty room sets keeps
    /// `by_room` free of empty entries.
    fn remove(&mut self, conn_id: ConnectionId) -> Option<RegisteredConnection> {
        let entry = self.connections.remove(&conn_id)?;
        let room_id = entry.handle.room_id();

        if let Some(members) = self.by_room.get_mut(&room_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                self.by_room.remove(&room_id);
            }
        }

        if self.by_user.get(&entry.handle.user_id) == Some(&conn_id) {
            self.by_user.remove(&entry.handle.user_id);
        }

        Some(entry)
    }

    /// Re-index a connection into another room, mutating the handle's
    /// `room_id` while the write lock is held so no broadcast can observe
    /// the two out of agreement. Returns the handle and the previous room.
    fn move_room(
        &mut self,
        conn_id: ConnectionId,
        new_room: i64,
    ) -> Option<(Arc<ConnectionHandle>, i64)> {
        let handle = self.connections.get(&conn_id)?.handle.clone();
        let old_room = handle.room_id();
        if old_room == new_room {
            return Some((handle, old_room));
        }

        if let Some(members) = self.by_room.get_mut(&old_room) {
            members.remove(&conn_id);
            if members.is_empty() {
                self.by_room.remove(&old_room);
            }
        }
        handle.set_room_id(new_room);
        self.by_room.entry(new_room).or_default().insert(conn_id);

        Some((handle, old_room))
    }
}

/// Process-wide registry of attached connections, indexed by room and by
/// user, with room-scoped fan-out.
pub struct Hub {
    registry: RwLock<Registry>,
    store: Arc<dyn ChatStore>,
    presence: Arc<PresenceCache>,
}

impl Hub {
    /// Create a hub over its collaborators.
    pub fn new(store: Arc<dyn ChatStore>, presence: Arc<PresenceCache>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            store,
            presence,
        }
    }

    /// Register a freshly attached connection.
    ///
    /// If the user already holds a connection, the older one is evicted
    /// first through the ordinary detach path (its room sees a
    /// `user_left`). The new connection's room then receives `user_joined`,
    /// and the connection itself receives an `online_users` snapshot.
    pub async fn register(&self, handle: Arc<ConnectionHandle>, sender: OutboundSender) {
        let evicted = self.registry.write().insert(handle.clone(), sender);

        if let Some(old) = evicted {
            warn!(
                user_id = old.handle.user_id,
                old_conn = %old.handle.id,
                new_conn = %handle.id,
                "Duplicate attach; evicting previous connection"
            );
            self.finish_detach(old.handle).await;
        }

        let user_id = handle.user_id;
        let room_id = handle.room_id();

        if let Err(e) = self.presence.set_user_online(user_id, room_id).await {
            warn!(error = %e, user_id, "Failed to cache online presence");
        }
        if let Err(e) = self.store.set_user_presence(user_id, true).await {
            warn!(error = %e, user_id, "Failed to persist online presence");
        }

        info!(conn_id = %handle.id, user_id, room_id, "Connection registered");

        self.announce_joined(user_id, room_id).await;
        self.send_online_users(handle.id, room_id).await;
    }

    /// Unregister a connection. Idempotent: later calls for the same id are
    /// no-ops, so exactly one `user_left` is ever broadcast. Dropping the
    /// registry entry closes the outbound queue, which terminates the
    /// writer pump and closes the socket.
    pub async fn unregister(&self, conn_id: ConnectionId) {
        let removed = self.registry.write().remove(conn_id);
        let Some(removed) = removed else {
            return;
        };

        info!(
            conn_id = %conn_id,
            user_id = removed.handle.user_id,
            room_id = removed.handle.room_id(),
            "Connection unregistered"
        );

        self.finish_detach(removed.handle).await;
    }

    /// Deliver one frame to every connection in a room.
    ///
    /// The frame is serialized once. Each recipient gets a single
    /// non-blocking enqueue; recipients with full (or already closed)
    /// queues are evicted afterwards and the iteration never stalls.
    pub async fn broadcast(&self, room_id: i64, frame: &ServerFrame) {
        let payload = match frame.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, room_id, "Failed to serialize broadcast frame");
                return;
            }
        };

        for conn_id in self.fan_out(room_id, payload) {
            self.unregister(conn_id).await;
        }
    }

    /// Move a connection to another room: re-index and mutate `room_id`
    /// under one write-lock acquisition, then emit `user_left` to the old
    /// room, `user_joined` to the new, and a fresh `online_users` snapshot
    /// to the moved connection.
    pub async fn move_to_room(&self, conn_id: ConnectionId, new_room: i64) {
        let moved = self.registry.write().move_room(conn_id, new_room);
        let Some((handle, old_room)) = moved else {
            return;
        };

        let user_id = handle.user_id;
        if let Err(e) = self.presence.set_user_online(user_id, new_room).await {
            warn!(error = %e, user_id, "Failed to cache presence on room move");
        }

        if old_room == new_room {
            return;
        }

        info!(conn_id = %conn_id, user_id, old_room, new_room, "Connection moved rooms");

        self.broadcast(
            old_room,
            &ServerFrame::UserLeft {
                room_id: old_room,
                data: UserLeftData { user_id },
            },
        )
        .await;

        self.announce_joined(user_id, new_room).await;
        self.send_online_users(conn_id, new_room).await;
    }

    /// Number of attached connections (diagnostics).
    pub fn connection_count(&self) -> usize {
        self.registry.read().connections.len()
    }

    /// Whether a user currently holds a connection.
    pub fn is_user_attached(&self, user_id: i64) -> bool {
        self.registry.read().by_user.contains_key(&user_id)
    }

    /// One non-blocking enqueue per recipient. Holds the lock exclusively
    /// so concurrent fan-outs to the same room cannot interleave and every
    /// recipient observes the same order. Returns the connections whose
    /// queues were full or closed; the caller evicts them once the lock is
    /// released.
    fn fan_out(&self, room_id: i64, payload: OutboundFrame) -> Vec<ConnectionId> {
        let mut slow = Vec::new();
        let registry = self.registry.write();
        let Some(members) = registry.by_room.get(&room_id) else {
            return slow;
        };

        for conn_id in members {
            let Some(conn) = registry.connections.get(conn_id) else {
                continue;
            };
            match conn.sender.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(conn_id = %conn_id, room_id, "Slow consumer; evicting");
                    slow.push(*conn_id);
                }
                Err(TrySendError::Closed(_)) => slow.push(*conn_id),
            }
        }

        slow
    }

    /// Presence clear + `user_left` for connections already removed from
    /// the registry. A `user_left` announcement can itself expose further
    /// slow consumers, so the cascade is worked off a queue rather than by
    /// recursing.
    async fn finish_detach(&self, handle: Arc<ConnectionHandle>) {
        let mut detached = vec![handle];

        while let Some(handle) = detached.pop() {
            let user_id = handle.user_id;
            let room_id = handle.room_id();

            if let Err(e) = self.presence.set_user_offline(user_id).await {
                warn!(error = %e, user_id, "Failed to clear cached presence");
            }
            if let Err(e) = self.store.set_user_presence(user_id, false).await {
                warn!(error = %e, user_id, "Failed to persist offline presence");
            }

            let frame = ServerFrame::UserLeft {
                room_id,
                data: UserLeftData { user_id },
            };
            let payload = match frame.encode() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize user_left frame");
                    continue;
                }
            };

            for conn_id in self.fan_out(room_id, payload) {
                if let Some(next) = self.registry.write().remove(conn_id) {
                    info!(
                        conn_id = %conn_id,
                        user_id = next.handle.user_id,
                        "Connection unregistered"
                    );
                    detached.push(next.handle);
                }
            }
        }
    }

    /// Broadcast `user_joined` with the user's public profile embedded.
    /// Registration stands even if the profile cannot be loaded.
    async fn announce_joined(&self, user_id: i64, room_id: i64) {
        let profile: Option<UserPublic> = match self.store.load_user_public(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, user_id, "Failed to load profile for user_joined");
                None
            }
        };
        let Some(user) = profile else {
            return;
        };

        self.broadcast(
            room_id,
            &ServerFrame::UserJoined {
                room_id,
                data: UserJoinedData { user },
            },
        )
        .await;
    }

    /// Send the room's online-user snapshot directly to one connection.
    /// Served best-effort from the presence cache; an empty list when the
    /// cache is absent.
    async fn send_online_users(&self, conn_id: ConnectionId, room_id: i64) {
        let ids = match self.presence.online_users_in_room(room_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, room_id, "Failed to list online users");
                Vec::new()
            }
        };

        let users = match self.store.list_public_users(&ids).await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, room_id, "Failed to load online user profiles");
                Vec::new()
            }
        };

        let frame = ServerFrame::OnlineUsers {
            room_id,
            data: OnlineUsersData { users },
        };
        let payload = match frame.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize online_users frame");
                return;
            }
        };

        let full = {
            let registry = self.registry.read();
            match registry.connections.get(&conn_id) {
                Some(conn) => conn.sender.try_send(payload).is_err(),
                None => false,
            }
        };
        if full {
            debug!(conn_id = %conn_id, "Queue full delivering online_users; evicting");
            self.unregister(conn_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn attach(registry: &mut Registry, user_id: i64, room_id: i64) -> ConnectionId {
        let handle = Arc::new(ConnectionHandle::new(user_id, room_id));
        let (tx, rx) = mpsc::channel(8);
        std::mem::forget(rx); // keep the queue open for the test's lifetime
        let conn_id = handle.id;
        registry.insert(handle, tx);
        conn_id
    }

    /// Every connection is indexed consistently across all three maps.
    fn assert_consistent(registry: &Registry) {
        for (conn_id, conn) in &registry.connections {
            let room = conn.handle.room_id();
            assert!(registry.by_room[&room].contains(conn_id));
            assert_eq!(registry.by_user[&conn.handle.user_id], *conn_id);
        }
        for members in registry.by_room.values() {
            assert!(!members.is_empty());
        }
    }

    #[test]
    fn insert_and_remove_maintain_indexes() {
        let mut registry = Registry::default();
        let a = attach(&mut registry, 1, 1);
        let b = attach(&mut registry, 2, 1);
        assert_consistent(&registry);
        assert_eq!(registry.by_room[&1].len(), 2);

        registry.remove(a);
        assert_consistent(&registry);
        assert_eq!(registry.by_room[&1].len(), 1);

        registry.remove(b);
        assert!(registry.by_room.is_empty());
        assert!(registry.by_user.is_empty());
        assert!(registry.connections.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut registry = Registry::default();
        let a = attach(&mut registry, 1, 1);
        assert!(registry.remove(a).is_some());
        assert!(registry.remove(a).is_none());
    }

    #[test]
    fn duplicate_user_evicts_older_connection() {
        let mut registry = Registry::default();
        let first = attach(&mut registry, 1, 1);

        let handle = Arc::new(ConnectionHandle::new(1, 2));
        let second = handle.id;
        let (tx, _rx) = mpsc::channel(8);
        let evicted = registry.insert(handle, tx).expect("older connection evicted");

        assert_eq!(evicted.handle.id, first);
        assert_consistent(&registry);
        assert_eq!(registry.by_user[&1], second);
        assert!(!registry.by_room.contains_key(&1));
    }

    #[test]
    fn move_room_reindexes_and_mutates_handle() {
        let mut registry = Registry::default();
        let a = attach(&mut registry, 1, 1);

        let (handle, old_room) = registry.move_room(a, 5).unwrap();
        assert_eq!(old_room, 1);
        assert_eq!(handle.room_id(), 5);
        assert_consistent(&registry);
        assert!(!registry.by_room.contains_key(&1));
        assert!(registry.by_room[&5].contains(&a));
    }

    #[test]
    fn move_room_unknown_connection_is_none() {
        let mut registry = Registry::default();
        assert!(registry.move_room(ConnectionId::new(), 2).is_none());
    }
}
