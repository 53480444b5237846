//! # parlor-auth
//!
//! Bearer credential handling: HS256 JWTs carrying the authenticated user
//! identity, and Argon2id password hashing (user accounts and private-room
//! passwords alike).

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtKeys};
pub use password::PasswordHasher;
