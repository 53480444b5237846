//! Router middleware builders.

pub mod cors;
