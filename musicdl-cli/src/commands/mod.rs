//! CLI command implementations.

pub mod about;
pub mod cookies;
pub mod fetch;
