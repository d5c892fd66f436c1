//! Server startup utilities.

use fleet_config::AppConfig;
use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
    ________          __
   / ____/ /__  ___  / /_
  / /_  / / _ \/ _ \/ __/
 / __/ / /  __/  __/ /_
/_/   /_/\___/\___/\__/

        job runner
    "#);
}

/// Prints the effective pool and job settings.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Environment:   {}", config.app.environment);
    info!("Pool:          {} ({} workers)", config.pool.name, config.pool.size);
    info!("Queue size:    {}", config.pool.queue_size);
    info!("Stop timeout:  {:?}", config.pool.stop_timeout());
    info!("Job timeout:   {:?}", config.jobs.max_timeout());
    info!("Retries:       {:?}", config.jobs.retry_schedule());
    info!("{}", separator);
}
