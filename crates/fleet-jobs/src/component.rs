//! Worker pool as a lifecycle component.

use crate::config::PoolConfig;
use crate::job::Job;
use crate::logger::{Logger, TracingLogger};
use crate::metrics::MetricsHook;
use crate::worker::WorkerPool;
use async_trait::async_trait;
use fleet_core::{Component, FleetError, FleetResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Activation order of the worker component.
pub const WORKER_COMPONENT_ORDER: i32 = 40;

/// Owns a [`WorkerPool`] and runs it in the background between
/// [`activate`](Component::activate) and [`stop`](Component::stop).
pub struct WorkerComponent {
    id: String,
    pool_config: PoolConfig,
    metrics: Option<Arc<dyn MetricsHook>>,
    logger: Arc<dyn Logger>,
    pool: Mutex<Option<Arc<WorkerPool>>>,
    run_task: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerComponent {
    /// Creates an inactive component.
    pub fn new(
        id: impl Into<String>,
        pool_config: PoolConfig,
        metrics: Option<Arc<dyn MetricsHook>>,
    ) -> Self {
        let id = id.into();
        Self {
            logger: TracingLogger::shared(id.clone()),
            id,
            pool_config,
            metrics,
            pool: Mutex::new(None),
            run_task: Mutex::new(None),
        }
    }

    /// Replaces the logger handed to the pool.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Enqueues a job. Returns `false` before activation, after stop, or
    /// when the queue is full.
    pub fn submit(&self, job: Arc<Job>) -> bool {
        match self.pool() {
            Some(pool) => pool.submit(job),
            None => false,
        }
    }

    /// The running pool, if activated.
    pub fn pool(&self) -> Option<Arc<WorkerPool>> {
        self.pool.lock().clone()
    }

    /// Returns true once activated.
    pub fn is_active(&self) -> bool {
        self.pool.lock().is_some()
    }
}

#[async_trait]
impl Component for WorkerComponent {
    fn id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> i32 {
        WORKER_COMPONENT_ORDER
    }

    async fn activate(&self, ctx: &CancellationToken) -> FleetResult<()> {
        let pool = {
            let mut slot = self.pool.lock();
            if slot.is_some() {
                return Err(FleetError::internal(format!(
                    "component {} already activated",
                    self.id
                )));
            }
            let pool = Arc::new(WorkerPool::new(
                self.pool_config.clone(),
                self.logger.clone(),
                self.metrics.clone(),
            ));
            *slot = Some(pool.clone());
            pool
        };

        pool.start(ctx);

        let token = ctx.clone();
        let handle = tokio::spawn(async move { pool.run(&token).await });
        *self.run_task.lock() = Some(handle);

        self.logger.info("worker component started");
        Ok(())
    }

    async fn stop(&self, ctx: &CancellationToken) -> FleetResult<()> {
        if let Some(pool) = self.pool() {
            pool.stop(ctx).await;
        }
        if let Some(handle) = self.run_task.lock().take() {
            handle.abort();
        }
        Ok(())
    }
}
