//! # parlor-core
//!
//! Core crate for the Parlor chat server. Contains configuration schemas,
//! the unified error system, and shared API types.
//!
//! This crate has **no** internal dependencies on other Parlor crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
