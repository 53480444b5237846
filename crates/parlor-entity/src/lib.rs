//! # parlor-entity
//!
//! Domain entity models for Parlor. Every struct in this crate represents
//! a database table row or a wire-facing projection of one. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod membership;
pub mod message;
pub mod room;
pub mod user;

pub use membership::{MemberRole, Membership};
pub use message::{Message, MessageKind, MessageView, NewMessage};
pub use room::{Room, RoomView};
pub use user::{AuthorBrief, User, UserPublic};
