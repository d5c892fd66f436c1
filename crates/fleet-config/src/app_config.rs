//! Application configuration structures.

use fleet_core::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Worker pool configuration.
    #[serde(default)]
    pub pool: PoolSettings,

    /// Defaults applied to jobs built from configuration.
    #[serde(default)]
    pub jobs: JobDefaults,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "fleet".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Pool name used in logs and metrics.
    #[serde(default = "default_pool_name")]
    pub name: String,

    /// Number of concurrent workers.
    #[serde(default = "default_pool_size")]
    pub size: usize,

    /// Capacity of the bounded submission queue.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Upper bound on graceful shutdown, in milliseconds.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            name: default_pool_name(),
            size: default_pool_size(),
            queue_size: default_queue_size(),
            stop_timeout_ms: default_stop_timeout(),
        }
    }
}

fn default_pool_name() -> String {
    "worker".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_queue_size() -> usize {
    1024
}

fn default_stop_timeout() -> u64 {
    10_000 // 10 seconds
}

impl PoolSettings {
    /// Returns the stop timeout as Duration.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Job defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefaults {
    /// Per-attempt deadline in milliseconds (0 = unbounded).
    #[serde(default = "default_max_timeout")]
    pub max_timeout_ms: u64,

    /// Backoff delays between retries, in milliseconds.
    #[serde(default)]
    pub retry_schedule_ms: Vec<u64>,

    /// Jitter fraction applied to each backoff delay (0.0 to 1.0).
    #[serde(default)]
    pub jitter_pct: f64,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            max_timeout_ms: default_max_timeout(),
            retry_schedule_ms: Vec::new(),
            jitter_pct: 0.0,
        }
    }
}

fn default_max_timeout() -> u64 {
    10_000 // 10 seconds
}

impl JobDefaults {
    /// Returns the per-attempt deadline as Duration.
    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }

    /// Returns the retry schedule as Durations.
    pub fn retry_schedule(&self) -> Vec<Duration> {
        self.retry_schedule_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }
}
