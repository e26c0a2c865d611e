//! CLI command implementations.

pub mod build;
pub mod cache;
pub mod config;
