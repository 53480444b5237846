//! Hub and ingestion behavior against an in-memory store fake and a
//! degraded (Redis-less) presence cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use parlor_cache::PresenceCache;
use parlor_core::error::AppError;
use parlor_core::result::AppResult;
use parlor_entity::message::{Message, NewMessage};
use parlor_entity::user::UserPublic;
use parlor_realtime::connection::{ConnectionHandle, OutboundFrame};
use parlor_realtime::frame::ServerFrame;
use parlor_realtime::{ChatStore, Hub, MessageIngestion};

#[derive(Default)]
struct FakeState {
    rooms: HashSet<i64>,
    users: HashMap<i64, UserPublic>,
    members: HashSet<(i64, i64)>,
    messages: Vec<Message>,
    online: HashMap<i64, bool>,
    fail_inserts: bool,
}

#[derive(Default)]
struct FakeStore {
    state: Mutex<FakeState>,
}

impl FakeStore {
    fn with_member(&self, room_id: i64, user_id: i64) -> &Self {
        self.state.lock().members.insert((room_id, user_id));
        self
    }

    fn message_count(&self) -> usize {
        self.state.lock().messages.len()
    }

    fn is_enrolled(&self, room_id: i64, user_id: i64) -> bool {
        self.state.lock().members.contains(&(room_id, user_id))
    }

    fn online_flag(&self, user_id: i64) -> Option<bool> {
        self.state.lock().online.get(&user_id).copied()
    }
}

#[async_trait]
impl ChatStore for FakeStore {
    async fn is_member(&self, room_id: i64, user_id: i64) -> AppResult<bool> {
        Ok(self.state.lock().members.contains(&(room_id, user_id)))
    }

    async fn insert_message(&self, message: &NewMessage) -> AppResult<Message> {
        let mut state = self.state.lock();
        if state.fail_inserts {
            return Err(AppError::database("insert failed"));
        }
        let stored = Message {
            id: state.messages.len() as i64 + 1,
            room_id: message.room_id,
            user_id: message.user_id,
            kind: message.kind,
            content: message.content.clone(),
            file_url: None,
            file_name: None,
            file_size: None,
            created_at: Utc::now(),
        };
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn upsert_membership(&self, room_id: i64, user_id: i64) -> AppResult<()> {
        self.state.lock().members.insert((room_id, user_id));
        Ok(())
    }

    async fn load_user_public(&self, user_id: i64) -> AppResult<Option<UserPublic>> {
        Ok(self.state.lock().users.get(&user_id).cloned())
    }

    async fn set_user_presence(&self, user_id: i64, online: bool) -> AppResult<()> {
        self.state.lock().online.insert(user_id, online);
        Ok(())
    }

    async fn list_public_users(&self, ids: &[i64]) -> AppResult<Vec<UserPublic>> {
        let state = self.state.lock();
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn room_exists(&self, room_id: i64) -> AppResult<bool> {
        Ok(self.state.lock().rooms.contains(&room_id))
    }
}

fn fake_user(id: i64) -> UserPublic {
    UserPublic {
        id,
        username: format!("user{id}"),
        email: format!("user{id}@example.com"),
        nickname: format!("User {id}"),
        avatar: String::new(),
        is_online: false,
        last_seen: None,
    }
}

struct TestBed {
    store: Arc<FakeStore>,
    hub: Arc<Hub>,
    ingest: MessageIngestion,
}

fn testbed() -> TestBed {
    let store = Arc::new(FakeStore::default());
    {
        let mut state = store.state.lock();
        state.rooms.extend([1, 2]);
        for id in 1..=4 {
            state.users.insert(id, fake_user(id));
        }
    }

    let presence = Arc::new(PresenceCache::disabled());
    let store_gateway: Arc<dyn ChatStore> = store.clone();
    let hub = Arc::new(Hub::new(store_gateway.clone(), presence.clone()));
    let ingest = MessageIngestion::new(store_gateway, presence, hub.clone());

    TestBed { store, hub, ingest }
}

async fn attach(
    hub: &Arc<Hub>,
    user_id: i64,
    room_id: i64,
    queue_capacity: usize,
) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundFrame>) {
    let handle = Arc::new(ConnectionHandle::new(user_id, room_id));
    let (tx, rx) = mpsc::channel(queue_capacity);
    hub.register(handle.clone(), tx).await;
    (handle, rx)
}

fn decode(payload: &OutboundFrame) -> ServerFrame {
    serde_json::from_str(payload).expect("outbound frames are valid ServerFrame JSON")
}

/// Pop every frame currently queued for a recipient.
fn drain(rx: &mut mpsc::Receiver<OutboundFrame>) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        frames.push(decode(&payload));
    }
    frames
}

#[tokio::test]
async fn basic_delivery_reaches_every_room_member() {
    let bed = testbed();
    bed.store.with_member(1, 1).with_member(1, 2);

    let (alice, mut alice_rx) = attach(&bed.hub, 1, 1, 16).await;
    let (_bob, mut bob_rx) = attach(&bed.hub, 2, 1, 16).await;

    // Bob's attach produced a user_joined visible to Alice.
    let seen_by_alice = drain(&mut alice_rx);
    assert!(seen_by_alice.iter().any(|frame| matches!(
        frame,
        ServerFrame::UserJoined { room_id: 1, data } if data.user.id == 2
    )));
    drain(&mut bob_rx);

    bed.ingest.submit(&alice, "hi").await.unwrap();

    assert_eq!(bed.store.message_count(), 1);
    for rx in [&mut alice_rx, &mut bob_rx] {
        let frames = drain(rx);
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            ServerFrame::Message { room_id: 1, data } => {
                assert_eq!(data.content, "hi");
                assert_eq!(data.user_id, 1);
                assert_eq!(data.user.as_ref().unwrap().id, 1);
            }
            other => panic!("expected message frame, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn non_member_chat_is_dropped_silently() {
    let bed = testbed();
    bed.store.with_member(1, 1);

    let (_alice, mut alice_rx) = attach(&bed.hub, 1, 1, 16).await;
    let (carol, mut carol_rx) = attach(&bed.hub, 3, 1, 16).await;
    drain(&mut alice_rx);
    drain(&mut carol_rx);

    bed.ingest.submit(&carol, "x").await.unwrap();

    assert_eq!(bed.store.message_count(), 0);
    assert!(drain(&mut alice_rx).is_empty());
    assert!(drain(&mut carol_rx).is_empty());
    // The connection stays attached.
    assert!(bed.hub.is_user_attached(3));
}

#[tokio::test]
async fn empty_content_is_a_no_op() {
    let bed = testbed();
    bed.store.with_member(1, 1);

    let (alice, mut alice_rx) = attach(&bed.hub, 1, 1, 16).await;
    drain(&mut alice_rx);

    bed.ingest.submit(&alice, "   \n\t ").await.unwrap();

    assert_eq!(bed.store.message_count(), 0);
    assert!(drain(&mut alice_rx).is_empty());
}

#[tokio::test]
async fn store_failure_aborts_before_broadcast() {
    let bed = testbed();
    bed.store.with_member(1, 1).with_member(1, 2);
    bed.store.state.lock().fail_inserts = true;

    let (alice, mut alice_rx) = attach(&bed.hub, 1, 1, 16).await;
    let (_bob, mut bob_rx) = attach(&bed.hub, 2, 1, 16).await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    assert!(bed.ingest.submit(&alice, "hi").await.is_err());

    // Neither persisted nor visible to anyone.
    assert_eq!(bed.store.message_count(), 0);
    assert!(drain(&mut alice_rx).is_empty());
    assert!(drain(&mut bob_rx).is_empty());
}

#[tokio::test]
async fn slow_consumer_is_evicted_without_stalling_others() {
    let bed = testbed();
    bed.store.with_member(1, 1);

    let (alice, mut alice_rx) = attach(&bed.hub, 1, 1, 64).await;
    // Dave's queue is tiny and nobody drains it.
    let (_dave, mut dave_rx) = attach(&bed.hub, 4, 1, 4).await;
    drain(&mut alice_rx);

    for i in 0..8 {
        bed.ingest.submit(&alice, &format!("msg {i}")).await.unwrap();
    }

    // Dave got evicted and a user_left for him reached Alice.
    assert!(!bed.hub.is_user_attached(4));
    let frames = drain(&mut alice_rx);
    let messages = frames
        .iter()
        .filter(|f| matches!(f, ServerFrame::Message { .. }))
        .count();
    assert_eq!(messages, 8, "all broadcasts reached the healthy recipient");
    assert!(frames.iter().any(|frame| matches!(
        frame,
        ServerFrame::UserLeft { room_id: 1, data } if data.user_id == 4
    )));

    // Dave's queue was closed: whatever was buffered, then end-of-stream.
    while dave_rx.try_recv().is_ok() {}
    assert!(dave_rx.recv().await.is_none());
}

#[tokio::test]
async fn duplicate_attach_evicts_older_connection() {
    let bed = testbed();

    let (_bob, mut bob_rx) = attach(&bed.hub, 2, 1, 16).await;
    let (first, mut first_rx) = attach(&bed.hub, 1, 1, 16).await;
    drain(&mut bob_rx);
    drain(&mut first_rx);

    // Same user attaches again, this time to room 2.
    let (second, mut second_rx) = attach(&bed.hub, 1, 2, 16).await;

    // Room 1 saw the first connection leave.
    let seen_by_bob = drain(&mut bob_rx);
    let left: Vec<_> = seen_by_bob
        .iter()
        .filter(|f| matches!(f, ServerFrame::UserLeft { data, .. } if data.user_id == 1))
        .collect();
    assert_eq!(left.len(), 1);

    // The first connection's queue is closed.
    while first_rx.try_recv().is_ok() {}
    assert!(first_rx.recv().await.is_none());

    // The user remains attached through the second connection.
    assert!(bed.hub.is_user_attached(1));
    assert_ne!(first.id, second.id);
    assert!(drain(&mut second_rx)
        .iter()
        .any(|f| matches!(f, ServerFrame::OnlineUsers { room_id: 2, .. })));
}

#[tokio::test]
async fn join_room_upserts_membership_and_reindexes() {
    let bed = testbed();
    bed.store.with_member(1, 1);

    let (gina, mut gina_rx) = attach(&bed.hub, 1, 1, 16).await;
    let (_bob, mut bob_rx) = attach(&bed.hub, 2, 1, 16).await;
    let (_carol, mut carol_rx) = attach(&bed.hub, 3, 2, 16).await;
    drain(&mut gina_rx);
    drain(&mut bob_rx);
    drain(&mut carol_rx);

    assert!(!bed.store.is_enrolled(2, 1));
    bed.ingest.join_room(&gina, 2).await.unwrap();

    assert!(bed.store.is_enrolled(2, 1));
    assert_eq!(gina.room_id(), 2);

    // Old room observed the departure, new room the arrival.
    assert!(drain(&mut bob_rx).iter().any(|frame| matches!(
        frame,
        ServerFrame::UserLeft { room_id: 1, data } if data.user_id == 1
    )));
    assert!(drain(&mut carol_rx).iter().any(|frame| matches!(
        frame,
        ServerFrame::UserJoined { room_id: 2, data } if data.user.id == 1
    )));
    // The mover received a fresh online_users snapshot for the new room.
    assert!(drain(&mut gina_rx)
        .iter()
        .any(|f| matches!(f, ServerFrame::OnlineUsers { room_id: 2, .. })));
}

#[tokio::test]
async fn join_room_to_unknown_room_is_ignored() {
    let bed = testbed();
    let (gina, _gina_rx) = attach(&bed.hub, 1, 1, 16).await;

    bed.ingest.join_room(&gina, 99).await.unwrap();

    assert_eq!(gina.room_id(), 1);
    assert!(!bed.store.is_enrolled(99, 1));
}

#[tokio::test]
async fn unregister_is_idempotent_with_exactly_one_user_left() {
    let bed = testbed();

    let (alice, _alice_rx) = attach(&bed.hub, 1, 1, 16).await;
    let (_bob, mut bob_rx) = attach(&bed.hub, 2, 1, 16).await;
    drain(&mut bob_rx);

    bed.hub.unregister(alice.id).await;
    bed.hub.unregister(alice.id).await;

    let left: Vec<_> = drain(&mut bob_rx)
        .into_iter()
        .filter(|f| matches!(f, ServerFrame::UserLeft { data, .. } if data.user_id == 1))
        .collect();
    assert_eq!(left.len(), 1);
    assert_eq!(bed.store.online_flag(1), Some(false));
}

#[tokio::test]
async fn delivery_order_matches_submission_order() {
    let bed = testbed();
    bed.store.with_member(1, 1);

    let (alice, _alice_rx) = attach(&bed.hub, 1, 1, 64).await;
    let (_bob, mut bob_rx) = attach(&bed.hub, 2, 1, 64).await;
    drain(&mut bob_rx);

    for i in 0..5 {
        bed.ingest.submit(&alice, &format!("m{i}")).await.unwrap();
    }

    let contents: Vec<String> = drain(&mut bob_rx)
        .into_iter()
        .filter_map(|frame| match frame {
            ServerFrame::Message { data, .. } => Some(data.content),
            _ => None,
        })
        .collect();
    assert_eq!(contents, ["m0", "m1", "m2", "m3", "m4"]);
}

#[tokio::test]
async fn registration_updates_durable_presence() {
    let bed = testbed();

    let (alice, _alice_rx) = attach(&bed.hub, 1, 1, 16).await;
    assert_eq!(bed.store.online_flag(1), Some(true));

    bed.hub.unregister(alice.id).await;
    assert_eq!(bed.store.online_flag(1), Some(false));

    // Frames stop flowing shortly after detach.
    tokio::time::timeout(Duration::from_millis(100), async {
        assert_eq!(bed.hub.connection_count(), 0);
    })
    .await
    .unwrap();
}
