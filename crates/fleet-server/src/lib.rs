//! # Fleet Server Library
//!
//! Wires configuration, logging and the worker component into a runnable
//! service.

pub mod app;
pub mod startup;

pub use app::App;
