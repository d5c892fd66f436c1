//! Fleet Jobs - Bounded In-Process Job Execution
//!
//! Runs units of work on a fixed pool of workers with:
//! - Per-attempt deadlines with cooperative cancellation
//! - Retry schedules with approximate jitter
//! - Bounded queue with immediate backpressure on submit
//! - Graceful shutdown bounded by a stop timeout
//! - Pluggable logging and metrics hooks
//!
//! # Architecture
//!
//! ```text
//!   Producer ── submit() ──▶ ┌──────────────────────────┐
//!        ▲                   │  bounded queue (mpsc)     │
//!        └── false if full ──┤                           │
//!                            └────────────┬─────────────┘
//!                                         │ recv
//!                  ┌──────────┬───────────┼───────────┐
//!                  ▼          ▼           ▼           ▼
//!              Worker 0   Worker 1    Worker 2    Worker N
//!                  │
//!                  ▼
//!           Job::run_with_retry
//!             execute ─▶ retry (backoff) ─▶ execute ...
//!                  │
//!                  ▼
//!            MetricsHook / Logger
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fleet_jobs::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let pool = Arc::new(WorkerPool::new(
//!     PoolConfig::default().with_size(8),
//!     TracingLogger::shared("mailer"),
//!     None,
//! ));
//!
//! let job = Job::new(
//!     |token| async move { send_email(token).await.map_err(JobError::from) },
//!     JobConfig::new()
//!         .with_name("send_email")
//!         .with_timeout(Duration::from_secs(5))
//!         .with_retries(RetrySchedule::exponential(
//!             Duration::from_millis(100), 2.0, Duration::from_secs(2), 3,
//!         ))
//!         .with_jitter(0.2),
//! );
//!
//! if !pool.submit(Arc::new(job)) {
//!     // queue full: drop, delay or escalate
//! }
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod job;
pub mod logger;
pub mod metrics;
pub mod retry;
pub mod worker;

pub use component::{WorkerComponent, WORKER_COMPONENT_ORDER};
pub use config::{JobConfig, OnComplete, OnPermanent, OnRetry, PoolConfig, DEFAULT_JOB_TIMEOUT};
pub use error::{JobError, JobResult};
pub use job::{Handler, Job, JobState, UNNAMED_JOB};
pub use logger::{Logger, TracingLogger};
pub use metrics::{register_metrics, MetricsHook, PrometheusMetrics};
pub use retry::{apply_jitter, RetrySchedule};
pub use worker::{PoolState, WorkerPool, WorkerPoolStats};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::job::{Job, JobState};
    pub use crate::logger::{Logger, TracingLogger};
    pub use crate::retry::RetrySchedule;
    pub use crate::worker::WorkerPool;
    pub use crate::{JobConfig, JobError, JobResult, PoolConfig};
}
