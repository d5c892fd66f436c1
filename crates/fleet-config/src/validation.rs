//! Configuration validation module.
//!
//! Provides validation for all configuration values, failing fast on invalid
//! configuration rather than at runtime.

use crate::AppConfig;
use std::fmt;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// A size or count must be at least one.
    NonPositiveSize { name: String, value: usize },
    /// Worker count exceeds maximum allowed.
    PoolSizeTooLarge { value: usize, maximum: usize },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Jitter must be between 0.0 and 1.0.
    InvalidJitter { value: f64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// A name used as a log/metric label is empty.
    EmptyName { name: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveSize { name, value } => {
                write!(f, "'{}' must be at least 1, got {}", name, value)
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(
                    f,
                    "Pool size {} exceeds maximum allowed ({})",
                    value, maximum
                )
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{}' must be positive, got {}", name, value)
            }
            Self::InvalidJitter { value } => {
                write!(
                    f,
                    "Invalid jitter: {} (must be between 0.0 and 1.0)",
                    value
                )
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::EmptyName { name } => write!(f, "'{}' cannot be empty", name),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum number of workers in a pool.
    const MAX_POOL_SIZE: usize = 1024;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_pool(&config.pool, &mut errors);
        Self::validate_jobs(&config.jobs, &mut errors);
        Self::validate_logging(&config.logging, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_pool(config: &crate::PoolSettings, errors: &mut Vec<ConfigValidationError>) {
        if config.name.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyName {
                name: "pool.name".to_string(),
            });
        }

        if config.size == 0 {
            errors.push(ConfigValidationError::NonPositiveSize {
                name: "pool.size".to_string(),
                value: 0,
            });
        } else if config.size > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: config.size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.queue_size == 0 {
            errors.push(ConfigValidationError::NonPositiveSize {
                name: "pool.queue_size".to_string(),
                value: 0,
            });
        }

        if config.stop_timeout_ms == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "pool.stop_timeout_ms".to_string(),
                value: 0,
            });
        }
    }

    // max_timeout_ms = 0 is valid and means "no deadline".
    fn validate_jobs(config: &crate::JobDefaults, errors: &mut Vec<ConfigValidationError>) {
        if !(0.0..=1.0).contains(&config.jitter_pct) {
            errors.push(ConfigValidationError::InvalidJitter {
                value: config.jitter_pct,
            });
        }
    }

    /// Only the default directive (before the first comma) is checked;
    /// per-target directives are left to the subscriber.
    fn validate_logging(config: &fleet_core::LoggingConfig, errors: &mut Vec<ConfigValidationError>) {
        let default_directive = config.level.split(',').next().unwrap_or_default().trim();
        let level = default_directive.to_lowercase();
        if level.contains('=') {
            return;
        }
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.level.clone(),
            });
        }
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
