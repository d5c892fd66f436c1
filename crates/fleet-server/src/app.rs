//! Application wiring.

use fleet_config::AppConfig;
use fleet_core::{Components, FleetResult};
use fleet_jobs::{Job, JobConfig, MetricsHook, PoolConfig, PrometheusMetrics, WorkerComponent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Interval between heartbeat jobs.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Id of the worker component.
pub const WORKER_COMPONENT_ID: &str = "worker";

/// The assembled service: configuration plus its lifecycle components.
pub struct App {
    config: AppConfig,
    components: Components,
    worker: Arc<WorkerComponent>,
}

impl App {
    /// Builds the components described by `config`.
    pub fn new(config: AppConfig) -> Self {
        let metrics: Arc<dyn MetricsHook> = Arc::new(PrometheusMetrics::new(config.pool.name.clone()));
        let worker = Arc::new(WorkerComponent::new(
            WORKER_COMPONENT_ID,
            PoolConfig::from(&config.pool),
            Some(metrics),
        ));

        let mut components = Components::new();
        components.register(worker.clone());

        Self {
            config,
            components,
            worker,
        }
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The worker component jobs are submitted to.
    pub fn worker(&self) -> &Arc<WorkerComponent> {
        &self.worker
    }

    /// Registered components.
    pub fn components(&self) -> &Components {
        &self.components
    }

    /// Job configuration derived from the configured job defaults.
    pub fn job_config(&self, name: &str) -> JobConfig {
        JobConfig::from(&self.config.jobs).with_name(name)
    }

    /// Activates every component.
    pub async fn start(&self, ctx: &CancellationToken) -> FleetResult<()> {
        self.components.activate_all(ctx).await
    }

    /// Stops every component, waiting at most for each pool's stop timeout.
    pub async fn shutdown(&self) {
        self.components.stop_all(&CancellationToken::new()).await;
    }

    /// Submits a heartbeat job every `interval` until `ctx` is cancelled.
    pub fn spawn_heartbeat(&self, ctx: &CancellationToken, interval: Duration) -> JoinHandle<()> {
        let worker = self.worker.clone();
        let job_config = self.job_config("heartbeat");
        let ctx = ctx.clone();

        tokio::spawn(async move {
            let beats = Arc::new(AtomicU64::new(0));
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = ctx.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let seq = beats.fetch_add(1, Ordering::Relaxed) + 1;
                let job = Job::new(
                    move |_| async move {
                        debug!(seq, "Heartbeat");
                        Ok(())
                    },
                    job_config.clone(),
                );

                if !worker.submit(Arc::new(job)) {
                    warn!(seq, "Heartbeat dropped");
                }
            }

            info!(beats = beats.load(Ordering::Relaxed), "Heartbeat producer stopped");
        })
    }
}
