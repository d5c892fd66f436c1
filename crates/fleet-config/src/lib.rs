//! # Fleet Config
//!
//! Configuration management for Fleet.
//! Supports layered configuration from files and environment variables,
//! validation, and runtime refresh.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
