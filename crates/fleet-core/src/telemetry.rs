//! Logging initialisation.
//!
//! Development environments get human-readable console output on stderr.
//! Production environments always emit one JSON object per event on stdout so
//! log shippers can parse them. `RUST_LOG` overrides the configured level.

use crate::{FleetError, FleetResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment names treated as production.
const PRODUCTION_ENVIRONMENTS: &[&str] = &["production", "prod", "prd"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output.
    Pretty,
    /// Structured JSON lines.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error or a full
    /// `EnvFilter` directive such as `info,fleet_jobs=debug`).
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format outside production.
    #[serde(default)]
    pub format: LogFormat,

    /// Value of the `service` field attached to every event.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_level() -> String {
    "info,fleet=debug".to_string()
}

fn default_service_name() -> String {
    "fleet".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            service_name: default_service_name(),
        }
    }
}

impl LoggingConfig {
    /// Resolves the output format for the given environment.
    #[must_use]
    pub fn effective_format(&self, environment: &str) -> LogFormat {
        if is_production(environment) {
            LogFormat::Json
        } else {
            self.format
        }
    }
}

/// Returns true if `environment` names a production deployment.
#[must_use]
pub fn is_production(environment: &str) -> bool {
    let env = environment.to_lowercase();
    PRODUCTION_ENVIRONMENTS.contains(&env.as_str())
}

/// Initialize the global tracing subscriber.
///
/// Fails with [`FleetError::Telemetry`] if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig, environment: &str) -> FleetResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| FleetError::Telemetry(format!("Invalid log filter '{}': {}", config.level, e)))?;

    let result = match config.effective_format(environment) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| FleetError::Telemetry(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        environment = %environment,
        format = ?config.effective_format(environment),
        "Logging initialized"
    );

    Ok(())
}
