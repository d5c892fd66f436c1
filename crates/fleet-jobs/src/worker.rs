//! Worker pool for processing jobs.
//!
//! A fixed set of workers drains one bounded queue. Producers get immediate
//! backpressure from [`WorkerPool::submit`]; shutdown closes intake and waits
//! for the backlog to drain, bounded by the configured stop timeout.

use crate::config::PoolConfig;
use crate::job::{Job, JobState};
use crate::logger::Logger;
use crate::metrics::MetricsHook;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

type JobSender = mpsc::Sender<Arc<Job>>;
type JobReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Arc<Job>>>>;

/// Lifecycle state of a worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// Constructed, workers not spawned.
    Created,
    /// Workers are draining the queue.
    Running,
    /// Intake closed, waiting for the backlog to drain.
    Draining,
    /// Drain finished or the stop timeout elapsed.
    Stopped,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Created => "created",
            PoolState::Running => "running",
            PoolState::Draining => "draining",
            PoolState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct PoolCounters {
    jobs_processed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_permanently_failed: AtomicU64,
}

/// Bounded worker pool.
pub struct WorkerPool {
    config: PoolConfig,
    logger: Arc<dyn Logger>,
    metrics: Option<Arc<dyn MetricsHook>>,

    sender: Mutex<Option<JobSender>>,
    receiver: JobReceiver,
    tracker: TaskTracker,

    started: AtomicBool,
    stopped: AtomicBool,
    state: Mutex<PoolState>,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    /// Creates a pool and allocates its queue. No worker runs until
    /// [`start`](Self::start) or [`run`](Self::run).
    pub fn new(
        config: PoolConfig,
        logger: Arc<dyn Logger>,
        metrics: Option<Arc<dyn MetricsHook>>,
    ) -> Self {
        let config = PoolConfig::default()
            .with_name(config.name)
            .with_size(config.size)
            .with_queue_size(config.queue_size)
            .with_stop_timeout(config.stop_timeout);
        let (sender, receiver) = mpsc::channel(config.queue_size);

        Self {
            logger: logger.with_prefix(&config.name),
            config,
            metrics,
            sender: Mutex::new(Some(sender)),
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            tracker: TaskTracker::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            state: Mutex::new(PoolState::Created),
            counters: Arc::new(PoolCounters::default()),
        }
    }

    /// Enqueues a job without waiting.
    ///
    /// Returns `false` when the queue is full or the pool has been stopped.
    pub fn submit(&self, job: Arc<Job>) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            self.logger.error("submit after stop, job rejected");
            return false;
        }

        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            self.logger.error("submit after stop, job rejected");
            return false;
        };

        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                self.logger
                    .warn(&format!("queue full, drop job name={}", job.name()));
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.logger.error("queue closed, job rejected");
                false
            }
        }
    }

    /// Spawns the workers. Only the first call has an effect.
    ///
    /// Jobs run with `ctx` as their parent cancellation token.
    pub fn start(&self, ctx: &CancellationToken) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let mut state = self.state.lock();
            if *state == PoolState::Created {
                *state = PoolState::Running;
            }
        }

        for id in 0..self.config.size {
            let worker = Worker {
                id,
                receiver: self.receiver.clone(),
                logger: self.logger.with_prefix("worker"),
                metrics: self.metrics.clone(),
                counters: self.counters.clone(),
            };
            let span = tracing::info_span!("worker", pool = %self.config.name, worker = id);
            self.tracker.spawn(worker.run(ctx.clone()).instrument(span));
        }

        self.logger.info(&format!(
            "worker pool started size={} queue_size={}",
            self.config.size, self.config.queue_size
        ));
    }

    /// Starts the workers, waits for `ctx` to be cancelled, then stops.
    ///
    /// The drain after cancellation is bounded by the stop timeout only.
    pub async fn run(&self, ctx: &CancellationToken) {
        self.start(ctx);
        ctx.cancelled().await;
        self.stop(&CancellationToken::new()).await;
    }

    /// Closes intake and waits for the backlog to drain.
    ///
    /// Returns when the workers finish, the stop timeout elapses or `ctx` is
    /// cancelled, whichever comes first. Workers still busy at that point keep
    /// running detached. Calls after the first return immediately.
    pub async fn stop(&self, ctx: &CancellationToken) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        *self.state.lock() = PoolState::Draining;
        drop(self.sender.lock().take());
        self.tracker.close();

        tokio::select! {
            () = self.tracker.wait() => {
                self.logger.info("worker pool stopped");
            }
            () = tokio::time::sleep(self.config.stop_timeout) => {
                self.logger.warn("worker pool stop timeout reached");
            }
            () = ctx.cancelled() => {
                self.logger.warn("worker pool stop cancelled");
            }
        }

        *self.state.lock() = PoolState::Stopped;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        *self.state.lock()
    }

    /// Returns true once workers have been spawned and stop has not begun.
    pub fn is_running(&self) -> bool {
        self.state() == PoolState::Running
    }

    /// Number of jobs waiting in the queue. Zero once stopped.
    pub fn queued(&self) -> usize {
        self.sender
            .lock()
            .as_ref()
            .map_or(0, |sender| sender.max_capacity() - sender.capacity())
    }

    /// Get the number of jobs that completed successfully.
    pub fn jobs_processed(&self) -> u64 {
        self.counters.jobs_processed.load(Ordering::Relaxed)
    }

    /// Get the number of jobs failed.
    pub fn jobs_failed(&self) -> u64 {
        self.counters.jobs_failed.load(Ordering::Relaxed)
    }

    /// Get the number of jobs that exhausted their retries.
    pub fn jobs_permanently_failed(&self) -> u64 {
        self.counters.jobs_permanently_failed.load(Ordering::Relaxed)
    }

    /// Pool configuration after defaults were applied.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get pool statistics.
    pub fn stats(&self) -> WorkerPoolStats {
        WorkerPoolStats {
            name: self.config.name.clone(),
            state: self.state(),
            size: self.config.size,
            queue_capacity: self.config.queue_size,
            queued: self.queued(),
            jobs_processed: self.jobs_processed(),
            jobs_failed: self.jobs_failed(),
            jobs_permanently_failed: self.jobs_permanently_failed(),
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Worker pool statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolStats {
    /// Pool name.
    pub name: String,

    /// Lifecycle state.
    pub state: PoolState,

    /// Number of workers.
    pub size: usize,

    /// Queue capacity.
    pub queue_capacity: usize,

    /// Jobs waiting in the queue.
    pub queued: usize,

    /// Jobs completed successfully.
    pub jobs_processed: u64,

    /// Jobs failed.
    pub jobs_failed: u64,

    /// Jobs that exhausted their retries.
    pub jobs_permanently_failed: u64,
}

struct Worker {
    id: usize,
    receiver: JobReceiver,
    logger: Arc<dyn Logger>,
    metrics: Option<Arc<dyn MetricsHook>>,
    counters: Arc<PoolCounters>,
}

impl Worker {
    async fn run(self, ctx: CancellationToken) {
        self.logger.debug(&format!("worker {} started", self.id));

        while let Some(job) = self.next_job().await {
            self.process(&job, &ctx).await;
        }

        self.logger.debug(&format!("worker {} exited", self.id));
    }

    async fn next_job(&self) -> Option<Arc<Job>> {
        self.receiver.lock().await.recv().await
    }

    async fn process(&self, job: &Job, ctx: &CancellationToken) {
        let name = job.name();
        let start = Instant::now();
        if let Some(metrics) = &self.metrics {
            metrics.inc_job_started(name);
        }

        let result = job.run_with_retry(ctx).await;
        let latency = start.elapsed();

        let err = match result {
            Ok(()) => {
                self.logger
                    .info(&format!("job success name={name} latency={latency:?}"));
                self.counters.jobs_processed.fetch_add(1, Ordering::Relaxed);
                if let Some(metrics) = &self.metrics {
                    metrics.inc_job_success(name, latency);
                }
                return;
            }
            Err(err) => err,
        };

        let state = job.state();
        self.logger.warn(&format!(
            "job failed name={name} state={state} retry={} err={err}",
            retry_label(job.retry_index())
        ));

        self.counters.jobs_failed.fetch_add(1, Ordering::Relaxed);
        if state == JobState::RetryFailed {
            self.counters
                .jobs_permanently_failed
                .fetch_add(1, Ordering::Relaxed);
        }

        if let Some(metrics) = &self.metrics {
            if state == JobState::RetryFailed {
                metrics.inc_job_permanent_failed(name, &err);
            }
            metrics.inc_job_failed(name, &err, latency);
        }
    }
}

fn retry_label(index: Option<usize>) -> String {
    index.map_or_else(|| "none".to_string(), |i| i.to_string())
}
