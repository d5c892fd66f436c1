//! # Fleet Core
//!
//! Shared error definitions, component lifecycle and logging
//! initialisation for the Fleet job execution runtime.

pub mod error;
pub mod lifecycle;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use lifecycle::{Component, Components, DEFAULT_COMPONENT_ORDER};
pub use result::*;
pub use telemetry::{init_logging, is_production, LogFormat, LoggingConfig};
