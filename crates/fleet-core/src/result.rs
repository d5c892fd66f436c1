//! Result type aliases for Fleet.

use crate::FleetError;

/// A specialized `Result` type for Fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;
