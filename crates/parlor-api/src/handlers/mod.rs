//! Request handlers, one module per domain.

pub mod auth;
pub mod health;
pub mod message;
pub mod room;
pub mod user;
pub mod ws;
