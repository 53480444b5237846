//! Per-aggregate repositories over the shared `PgPool`.

pub mod membership;
pub mod message;
pub mod room;
pub mod user;

pub use membership::MembershipRepository;
pub use message::MessageRepository;
pub use room::RoomRepository;
pub use user::UserRepository;
