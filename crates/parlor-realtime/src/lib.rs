//! # parlor-realtime
//!
//! The real-time messaging fabric:
//!
//! - [`hub::Hub`] — process-wide connection registry and room fan-out
//! - [`connection`] — per-connection reader/writer pumps with
//!   heartbeat-based liveness detection
//! - [`frame`] — the JSON wire envelope as tagged inbound/outbound enums
//! - [`ingest::MessageIngestion`] — validate → persist → cache → broadcast
//! - [`gateway::ChatStore`] — the narrow persistence contract the fabric
//!   consumes, so it can run against fakes in tests

pub mod connection;
pub mod frame;
pub mod gateway;
pub mod hub;
pub mod ingest;

pub use connection::{ConnectionHandle, ConnectionId};
pub use gateway::{ChatStore, PgChatStore};
pub use hub::Hub;
pub use ingest::MessageIngestion;
