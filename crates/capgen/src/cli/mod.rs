//! CLI command handlers.

pub mod caption;
pub mod config;
