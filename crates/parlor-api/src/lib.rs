//! # parlor-api
//!
//! The HTTP and WebSocket surface: router, shared application state,
//! request extractors, and per-domain handlers.

pub mod app;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::run_server;
pub use state::AppState;
