//! Job and worker pool configuration.

use crate::error::JobError;
use fleet_config::{JobDefaults, PoolSettings};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default per-attempt deadline.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(10);

/// Callback invoked after a failed retry: `(retry_index, next_delay, error)`.
///
/// `next_delay` previews the jittered delay before the next retry, or is zero
/// when the schedule is exhausted.
pub type OnRetry = Arc<dyn Fn(usize, Duration, &JobError) + Send + Sync>;

/// Callback invoked each time the handler succeeds.
pub type OnComplete = Arc<dyn Fn() + Send + Sync>;

/// Callback invoked when the job gives up.
pub type OnPermanent = Arc<dyn Fn(&JobError) + Send + Sync>;

/// Per-job configuration.
#[derive(Clone)]
pub struct JobConfig {
    /// Name used in logs and metrics. Empty means unnamed.
    pub name: String,

    /// Deadline for a single attempt. `Duration::ZERO` disables it.
    pub max_timeout: Duration,

    /// Delays to wait before each retry, in order.
    pub retry_schedule: Vec<Duration>,

    /// Jitter fraction in `[0, 1]` applied to each delay.
    pub jitter_pct: f64,

    /// Called after every failed retry.
    pub on_retry: Option<OnRetry>,

    /// Called after every successful attempt.
    pub on_complete: Option<OnComplete>,

    /// Called when no further retry will be made.
    pub on_permanent: Option<OnPermanent>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_timeout: DEFAULT_JOB_TIMEOUT,
            retry_schedule: Vec::new(),
            jitter_pct: 0.0,
            on_retry: None,
            on_complete: None,
            on_permanent: None,
        }
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("name", &self.name)
            .field("max_timeout", &self.max_timeout)
            .field("retry_schedule", &self.retry_schedule)
            .field("jitter_pct", &self.jitter_pct)
            .field("on_retry", &self.on_retry.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_permanent", &self.on_permanent.is_some())
            .finish()
    }
}

impl JobConfig {
    /// Creates a configuration with defaults (10s deadline, no retries).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the job name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the per-attempt deadline (`Duration::ZERO` = unbounded).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.max_timeout = timeout;
        self
    }

    /// Sets the retry schedule.
    pub fn with_retries(mut self, schedule: impl Into<Vec<Duration>>) -> Self {
        self.retry_schedule = schedule.into();
        self
    }

    /// Sets the jitter fraction, clamped into `[0, 1]`.
    pub fn with_jitter(mut self, pct: f64) -> Self {
        self.jitter_pct = if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 1.0) };
        self
    }

    /// Sets the retry callback.
    pub fn on_retry(mut self, f: impl Fn(usize, Duration, &JobError) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(f));
        self
    }

    /// Sets the completion callback.
    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    /// Sets the permanent-failure callback.
    pub fn on_permanent(mut self, f: impl Fn(&JobError) + Send + Sync + 'static) -> Self {
        self.on_permanent = Some(Arc::new(f));
        self
    }
}

impl From<&JobDefaults> for JobConfig {
    fn from(defaults: &JobDefaults) -> Self {
        Self::new()
            .with_timeout(defaults.max_timeout())
            .with_retries(defaults.retry_schedule())
            .with_jitter(defaults.jitter_pct)
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Pool name used in logs and metrics.
    pub name: String,

    /// Number of concurrent workers.
    pub size: usize,

    /// Capacity of the bounded queue.
    pub queue_size: usize,

    /// Upper bound on waiting for the backlog to drain at shutdown.
    pub stop_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "worker".to_string(),
            size: 4,
            queue_size: 1024,
            stop_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolConfig {
    /// Sets the pool name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the number of workers (at least one).
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size.max(1);
        self
    }

    /// Sets the queue capacity (at least one).
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    /// Sets the shutdown drain timeout.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

impl From<&PoolSettings> for PoolConfig {
    fn from(settings: &PoolSettings) -> Self {
        Self::default()
            .with_name(settings.name.clone())
            .with_size(settings.size)
            .with_queue_size(settings.queue_size)
            .with_stop_timeout(settings.stop_timeout())
    }
}
