//! Per-connection state and the reader/writer pumps.
//!
//! Each attached client owns exactly two tasks. The reader parses inbound
//! frames and dispatches them; the writer drains the outbound queue to the
//! socket and runs the keepalive clock. They share only the socket halves
//! and the queue: whichever exits first takes the other down via socket
//! close (reader) or queue close (writer), and every detach path funnels
//! through the hub's idempotent unregister.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, warn};
use uuid::Uuid;

use parlor_core::config::RealtimeConfig;

use crate::frame::ClientFrame;
use crate::hub::Hub;
use crate::ingest::MessageIngestion;

/// Unique connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Mint a fresh random connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A serialized outbound frame, shared across fan-out recipients.
pub type OutboundFrame = Arc<str>;

/// Sending half of a connection's outbound queue. Held by the hub's
/// registry; dropping it closes the queue and terminates the writer.
pub type OutboundSender = mpsc::Sender<OutboundFrame>;

/// Receiving half of a connection's outbound queue. Owned by the writer.
pub type OutboundReceiver = mpsc::Receiver<OutboundFrame>;

/// Identity of an attached connection.
///
/// `user_id` is immutable for the connection's lifetime; `room_id` is
/// mutated in place on `join_room`, but only by the hub while it holds the
/// registry write lock, so the value always agrees with the room set the
/// connection is indexed under.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Locally unique connection id.
    pub id: ConnectionId,
    /// Authenticated user.
    pub user_id: i64,
    room_id: AtomicI64,
}

impl ConnectionHandle {
    /// Create a handle for a freshly attached connection.
    pub fn new(user_id: i64, room_id: i64) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            room_id: AtomicI64::new(room_id),
        }
    }

    /// The room this connection is currently attached to.
    pub fn room_id(&self) -> i64 {
        self.room_id.load(Ordering::Acquire)
    }

    pub(crate) fn set_room_id(&self, room_id: i64) {
        self.room_id.store(room_id, Ordering::Release);
    }
}

/// Drive a registered connection until either pump exits, then unregister.
///
/// The caller has already authenticated the client, registered the handle
/// with the hub, and handed the queue's receiving half over.
pub async fn run_connection(
    socket: WebSocket,
    handle: Arc<ConnectionHandle>,
    outbound: OutboundReceiver,
    hub: Arc<Hub>,
    ingest: Arc<MessageIngestion>,
    config: RealtimeConfig,
) {
    let (ws_tx, ws_rx) = socket.split();

    let writer = tokio::spawn(write_pump(ws_tx, outbound, config.clone()));

    read_pump(ws_rx, &handle, &hub, &ingest, &config).await;

    hub.unregister(handle.id).await;
    let _ = writer.await;
}

/// Reader pump: enforces the read deadline, parses frames, dispatches.
async fn read_pump(
    mut ws_rx: SplitStream<WebSocket>,
    handle: &Arc<ConnectionHandle>,
    hub: &Arc<Hub>,
    ingest: &MessageIngestion,
    config: &RealtimeConfig,
) {
    let mut deadline = Instant::now() + config.read_deadline();

    loop {
        let message = match timeout_at(deadline, ws_rx.next()).await {
            Err(_) => {
                debug!(conn_id = %handle.id, user_id = handle.user_id, "Read deadline exceeded");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(conn_id = %handle.id, error = %e, "Socket read failed");
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            // Keepalive reply refreshes the read deadline.
            Message::Pong(_) => {
                deadline = Instant::now() + config.read_deadline();
            }
            Message::Text(text) => dispatch(text.as_str(), handle, hub, ingest).await,
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => dispatch(text, handle, hub, ingest).await,
                Err(_) => {
                    warn!(conn_id = %handle.id, "Discarding non-UTF-8 binary frame");
                }
            },
            Message::Close(_) => break,
            // The transport answers pings on its own.
            Message::Ping(_) => {}
        }
    }
}

/// Parse one inbound frame and route it. Malformed frames are logged and
/// skipped; the connection stays up.
async fn dispatch(
    raw: &str,
    handle: &Arc<ConnectionHandle>,
    hub: &Arc<Hub>,
    ingest: &MessageIngestion,
) {
    let frame: ClientFrame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(conn_id = %handle.id, error = %e, "Discarding malformed frame");
            return;
        }
    };

    match frame {
        ClientFrame::Message { content } => {
            if let Err(e) = ingest.submit(handle, &content).await {
                warn!(conn_id = %handle.id, error = %e, "Message ingestion failed");
            }
        }
        ClientFrame::JoinRoom { room_id } => {
            if let Err(e) = ingest.join_room(handle, room_id).await {
                warn!(conn_id = %handle.id, error = %e, "join_room failed");
            }
        }
        ClientFrame::LeaveRoom => {
            hub.unregister(handle.id).await;
        }
    }
}

/// Writer pump: drains the outbound queue in newline-separated batches and
/// sends keepalive probes; every write is bounded by the write deadline.
async fn write_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound: OutboundReceiver,
    config: RealtimeConfig,
) {
    let period = config.keepalive_period();
    let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
    keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(first) => {
                    let batch = drain_batch(first, &mut outbound, config.outbound_queue_capacity);
                    let sent = timeout(config.write_deadline(), ws_tx.send(Message::Text(batch.into()))).await;
                    if !matches!(sent, Ok(Ok(()))) {
                        break;
                    }
                }
                // Queue closed by the hub: say goodbye and stop.
                None => {
                    let _ = timeout(
                        config.write_deadline(),
                        ws_tx.send(Message::Close(None)),
                    )
                    .await;
                    break;
                }
            },
            _ = keepalive.tick() => {
                let sent = timeout(
                    config.write_deadline(),
                    ws_tx.send(Message::Ping(Default::default())),
                )
                .await;
                if !matches!(sent, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }

    let _ = timeout(config.write_deadline(), ws_tx.close()).await;
}

/// Opportunistically append queued frames to the current write, separated
/// by newlines. Bounded by the queue capacity, so one write never coalesces
/// more than a full queue.
fn drain_batch(first: OutboundFrame, outbound: &mut OutboundReceiver, cap: usize) -> String {
    let mut batch = String::from(&*first);
    let mut drained = 0;
    while drained < cap {
        match outbound.try_recv() {
            Ok(next) => {
                batch.push('\n');
                batch.push_str(&next);
                drained += 1;
            }
            Err(_) => break,
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_room_id_is_mutable_in_place() {
        let handle = ConnectionHandle::new(7, 1);
        assert_eq!(handle.room_id(), 1);
        handle.set_room_id(2);
        assert_eq!(handle.room_id(), 2);
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[tokio::test]
    async fn drain_batch_joins_with_newlines_and_respects_cap() {
        let (tx, mut rx) = mpsc::channel::<OutboundFrame>(8);
        for payload in ["b", "c", "d"] {
            tx.try_send(Arc::from(payload)).unwrap();
        }

        let batch = drain_batch(Arc::from("a"), &mut rx, 2);
        assert_eq!(batch, "a\nb\nc");
        // "d" stays queued for the next write.
        assert_eq!(&*rx.try_recv().unwrap(), "d");
    }
}
