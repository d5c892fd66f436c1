//! Job state machine.
//!
//! A [`Job`] wraps one async handler with its [`JobConfig`] and tracks the
//! outcome of its most recent run cycle:
//!
//! ```text
//! Init ──▶ Running ──┬──▶ Completed
//!                    ├──▶ Failed  ──┐
//!                    └──▶ Timeout ──┤ retry (after backoff)
//!                                   ▼
//!                         Running ──┬──▶ Completed
//!                                   └──▶ Failed / Timeout ... ──▶ RetryFailed
//! ```
//!
//! A job is driven by one caller at a time. Concurrent `execute`/`retry`
//! calls on the same instance are not supported.

use crate::config::JobConfig;
use crate::error::{JobError, JobResult};
use crate::retry::apply_jitter;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Name reported for jobs configured without one.
pub const UNNAMED_JOB: &str = "job";

/// Unit of work run by a job.
///
/// The token is the execution scope of the current attempt: it is cancelled
/// when the attempt's deadline elapses or the caller's token is cancelled.
/// Handlers are expected to observe it; nothing interrupts them forcibly.
pub type Handler = Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, JobResult<()>> + Send + Sync>;

/// Execution state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Created, never run.
    Init,
    /// An attempt is in progress.
    Running,
    /// The last attempt failed or was cancelled.
    Failed,
    /// The last attempt hit its deadline.
    Timeout,
    /// The last attempt succeeded.
    Completed,
    /// The retry schedule is exhausted and the last retry failed.
    RetryFailed,
}

impl JobState {
    /// Returns true for the outcomes that end a run cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::RetryFailed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Init => "Init",
            JobState::Running => "Running",
            JobState::Failed => "Failed",
            JobState::Timeout => "Timeout",
            JobState::Completed => "Completed",
            JobState::RetryFailed => "RetryFailed",
        };
        f.write_str(name)
    }
}

struct JobInner {
    state: JobState,
    retry_index: Option<usize>,
    last_error: Option<JobError>,
    retry_schedule: Vec<Duration>,
}

impl JobInner {
    fn next_retry_index(&self) -> Option<usize> {
        let next = self.retry_index.map_or(0, |i| i + 1);
        (next < self.retry_schedule.len()).then_some(next)
    }
}

/// A unit of work with timeout and retry policy.
pub struct Job {
    config: JobConfig,
    handler: Handler,
    inner: Mutex<JobInner>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Job")
            .field("name", &self.name())
            .field("state", &inner.state)
            .field("retry_index", &inner.retry_index)
            .field("last_error", &inner.last_error)
            .finish_non_exhaustive()
    }
}

impl Job {
    /// Creates a job from an async handler and its configuration.
    pub fn new<F, Fut>(handler: F, config: JobConfig) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<()>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |token| handler(token).boxed());
        Self::from_handler(handler, config)
    }

    /// Creates a job with the default configuration.
    pub fn from_fn<F, Fut>(handler: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<()>> + Send + 'static,
    {
        Self::new(handler, JobConfig::default())
    }

    /// Creates a job from an already boxed handler.
    pub fn from_handler(handler: Handler, config: JobConfig) -> Self {
        let retry_schedule = config.retry_schedule.clone();
        Self {
            config,
            handler,
            inner: Mutex::new(JobInner {
                state: JobState::Init,
                retry_index: None,
                last_error: None,
                retry_schedule,
            }),
        }
    }

    /// Runs the handler once.
    ///
    /// An already cancelled `ctx` fails the attempt without calling the
    /// handler. With a non-zero `max_timeout` the handler gets a child of `ctx` that
    /// is cancelled when the deadline elapses. The handler runs on its own
    /// task; if it outlives the deadline or `ctx` it keeps running detached.
    ///
    /// # Panics
    ///
    /// A panic inside the handler is resumed on the caller.
    pub async fn execute(&self, ctx: &CancellationToken) -> JobResult<()> {
        if ctx.is_cancelled() {
            let mut inner = self.inner.lock();
            inner.state = JobState::Failed;
            inner.last_error = Some(JobError::Cancelled);
            return Err(JobError::Cancelled);
        }

        self.set_state(JobState::Running);

        let deadline = (!self.config.max_timeout.is_zero()).then_some(self.config.max_timeout);
        let scope = if deadline.is_some() {
            ctx.child_token()
        } else {
            ctx.clone()
        };

        let mut handle = tokio::spawn((self.handler)(scope.clone()));

        let (state, result) = tokio::select! {
            biased;
            () = ctx.cancelled() => (JobState::Failed, Err(JobError::Cancelled)),
            () = deadline_elapsed(deadline) => {
                (JobState::Timeout, Err(JobError::Timeout(self.config.max_timeout)))
            }
            joined = &mut handle => match joined {
                Ok(Ok(())) => (JobState::Completed, Ok(())),
                Ok(Err(err)) => (JobState::Failed, Err(err)),
                Err(join_err) if join_err.is_panic() => {
                    std::panic::resume_unwind(join_err.into_panic())
                }
                Err(_) => (JobState::Failed, Err(JobError::Cancelled)),
            },
        };

        if deadline.is_some() {
            scope.cancel();
        }

        {
            let mut inner = self.inner.lock();
            inner.state = state;
            inner.last_error = result.as_ref().err().cloned();
        }

        if result.is_ok() {
            if let Some(on_complete) = &self.config.on_complete {
                on_complete();
            }
        }

        result
    }

    /// Waits for the next scheduled backoff and runs the handler again.
    ///
    /// When the schedule is empty or exhausted no attempt is made:
    /// `on_permanent` fires with the last error, which is returned at once.
    /// Cancelling `ctx` during the backoff records [`JobError::Cancelled`]
    /// without calling the handler.
    pub async fn retry(&self, ctx: &CancellationToken) -> JobResult<()> {
        let scheduled = {
            let mut inner = self.inner.lock();
            match inner.next_retry_index() {
                Some(index) => {
                    inner.retry_index = Some(index);
                    Some((index, apply_jitter(inner.retry_schedule[index], self.config.jitter_pct)))
                }
                None => None,
            }
        };

        let Some((index, delay)) = scheduled else {
            return self.give_up(self.last_error());
        };

        tokio::select! {
            biased;
            () = ctx.cancelled() => {
                let mut inner = self.inner.lock();
                inner.state = JobState::Failed;
                inner.last_error = Some(JobError::Cancelled);
                return Err(JobError::Cancelled);
            }
            () = tokio::time::sleep(delay) => {}
        }

        let err = match self.execute(ctx).await {
            Ok(()) => {
                self.set_state(JobState::Completed);
                return Ok(());
            }
            Err(err) => err,
        };

        let (next_delay, exhausted) = {
            let inner = self.inner.lock();
            let next_delay = inner
                .retry_schedule
                .get(index + 1)
                .map_or(Duration::ZERO, |d| apply_jitter(*d, self.config.jitter_pct));
            (next_delay, index + 1 >= inner.retry_schedule.len())
        };

        if let Some(on_retry) = &self.config.on_retry {
            on_retry(index, next_delay, &err);
        }

        if exhausted {
            self.set_state(JobState::RetryFailed);
            if let Some(on_permanent) = &self.config.on_permanent {
                on_permanent(&err);
            }
        }

        Err(err)
    }

    /// Executes once, then retries until success or schedule exhaustion.
    ///
    /// Returns `Ok(())` on eventual success, otherwise the final error.
    pub async fn run_with_retry(&self, ctx: &CancellationToken) -> JobResult<()> {
        if self.execute(ctx).await.is_ok() {
            return Ok(());
        }

        loop {
            match self.retry(ctx).await {
                Ok(()) => return Ok(()),
                Err(err) if self.retries_exhausted() => return Err(err),
                Err(_) => {}
            }
        }
    }

    /// Replaces the retry schedule and rewinds the retry index.
    ///
    /// A job that finished its previous cycle goes back to `Init` so it can
    /// be driven again.
    pub fn set_retries(&self, schedule: impl Into<Vec<Duration>>) {
        let mut inner = self.inner.lock();
        inner.retry_schedule = schedule.into();
        inner.retry_index = None;
        if inner.state.is_terminal() {
            inner.state = JobState::Init;
        }
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.inner.lock().state
    }

    /// Index into the retry schedule of the latest retry, `None` before the
    /// first retry.
    pub fn retry_index(&self) -> Option<usize> {
        self.inner.lock().retry_index
    }

    /// Error recorded by the latest attempt, `None` after a success.
    pub fn last_error(&self) -> Option<JobError> {
        self.inner.lock().last_error.clone()
    }

    /// Current retry schedule.
    pub fn retry_schedule(&self) -> Vec<Duration> {
        self.inner.lock().retry_schedule.clone()
    }

    /// Name used in logs and metrics.
    pub fn name(&self) -> &str {
        if self.config.name.is_empty() {
            UNNAMED_JOB
        } else {
            &self.config.name
        }
    }

    /// Job configuration.
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Returns true if no further retry will be attempted.
    pub fn retries_exhausted(&self) -> bool {
        self.inner.lock().next_retry_index().is_none()
    }

    fn give_up(&self, last_error: Option<JobError>) -> JobResult<()> {
        match last_error {
            Some(err) => {
                if let Some(on_permanent) = &self.config.on_permanent {
                    on_permanent(&err);
                }
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn set_state(&self, state: JobState) {
        self.inner.lock().state = state;
    }
}

async fn deadline_elapsed(deadline: Option<Duration>) {
    match deadline {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Instant;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Handler failing `failures` times before succeeding.
    fn flaky(failures: usize, calls: Arc<AtomicUsize>) -> impl Fn(CancellationToken) -> BoxFuture<'static, JobResult<()>> + Send + Sync {
        move |_token| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    Err(JobError::execution(format!("attempt {} failed", n + 1)))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(JobState::Init.to_string(), "Init");
        assert_eq!(JobState::RetryFailed.to_string(), "RetryFailed");
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::RetryFailed.is_terminal());
        assert!(!JobState::Failed.is_terminal());
        assert!(!JobState::Timeout.is_terminal());
    }

    #[test]
    fn test_new_job_snapshot() {
        let job = Job::from_fn(|_| async { Ok(()) });
        assert_eq!(job.state(), JobState::Init);
        assert_eq!(job.retry_index(), None);
        assert_eq!(job.last_error(), None);
        assert_eq!(job.name(), UNNAMED_JOB);
    }

    #[tokio::test]
    async fn test_execute_success_runs_on_complete() {
        let completed = Arc::new(AtomicUsize::new(0));
        let counter = completed.clone();
        let job = Job::new(
            |_| async { Ok(()) },
            JobConfig::new()
                .with_name("ok")
                .on_complete(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
        );

        let ctx = CancellationToken::new();
        assert!(job.execute(&ctx).await.is_ok());
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(job.last_error(), None);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(job.name(), "ok");
    }

    #[tokio::test]
    async fn test_execute_handler_error() {
        let job = Job::from_fn(|_| async { Err(JobError::execution("disk full")) });

        let err = job.execute(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, JobError::execution("disk full"));
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.last_error(), Some(err));
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let job = Job::new(
            |_| async {
                tokio::time::sleep(ms(50)).await;
                Ok(())
            },
            JobConfig::new().with_timeout(ms(5)),
        );

        let started = Instant::now();
        let err = job.execute(&CancellationToken::new()).await.unwrap_err();
        assert!(started.elapsed() < ms(50));
        assert!(err.is_timeout());
        assert_eq!(job.state(), JobState::Timeout);
        assert_eq!(job.last_error(), Some(JobError::Timeout(ms(5))));
    }

    #[tokio::test]
    async fn test_execute_timeout_cancels_handler_scope() {
        let observed = Arc::new(AtomicBool::new(false));
        let flag = observed.clone();
        let job = Job::new(
            move |token: CancellationToken| {
                let flag = flag.clone();
                async move {
                    token.cancelled().await;
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                }
            },
            JobConfig::new().with_timeout(ms(5)),
        );

        let ctx = CancellationToken::new();
        assert!(job.execute(&ctx).await.is_err());
        tokio::time::sleep(ms(20)).await;
        assert!(observed.load(Ordering::SeqCst));
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_execute_external_cancellation_is_failure() {
        let job = Job::from_fn(|token: CancellationToken| async move {
            token.cancelled().await;
            Ok(())
        });

        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ms(5)).await;
            canceller.cancel();
        });

        let err = job.execute(&ctx).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(job.state(), JobState::Failed);
    }

    #[tokio::test]
    async fn test_execute_with_cancelled_token_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let job = Job::from_fn(flaky(0, calls.clone()));

        let ctx = CancellationToken::new();
        ctx.cancel();

        assert_eq!(job.execute(&ctx).await, Err(JobError::Cancelled));
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_without_deadline() {
        let job = Job::new(
            |_| async {
                tokio::time::sleep(ms(20)).await;
                Ok(())
            },
            JobConfig::new().with_timeout(Duration::ZERO),
        );

        assert!(job.execute(&CancellationToken::new()).await.is_ok());
        assert_eq!(job.state(), JobState::Completed);
    }

    #[tokio::test]
    #[should_panic(expected = "handler exploded")]
    async fn test_handler_panic_propagates() {
        let job = Job::from_fn(|_| async { panic!("handler exploded") });
        let _ = job.execute(&CancellationToken::new()).await;
    }

    #[tokio::test]
    async fn test_retry_with_empty_schedule_gives_up_immediately() {
        let permanent = Arc::new(AtomicUsize::new(0));
        let counter = permanent.clone();
        let job = Job::new(
            |_| async { Err(JobError::execution("nope")) },
            JobConfig::new().on_permanent(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let ctx = CancellationToken::new();
        let _ = job.execute(&ctx).await;

        let started = Instant::now();
        let err = job.retry(&ctx).await.unwrap_err();
        assert!(started.elapsed() < ms(20));
        assert_eq!(err, JobError::execution("nope"));
        assert_eq!(permanent.load(Ordering::SeqCst), 1);
        assert_eq!(job.retry_index(), None);
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let job = Job::new(
            flaky(2, calls.clone()),
            JobConfig::new().with_retries(vec![ms(0), ms(10), ms(20)]),
        );

        assert!(job.run_with_retry(&CancellationToken::new()).await.is_ok());
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(job.retry_index(), Some(1));
        assert_eq!(job.last_error(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_schedule_ends_in_retry_failed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let retries = Arc::new(Mutex::new(Vec::new()));
        let permanent = Arc::new(AtomicUsize::new(0));

        let seen = retries.clone();
        let counter = permanent.clone();
        let job = Job::new(
            flaky(10, calls.clone()),
            JobConfig::new()
                .with_retries(vec![ms(1), ms(2)])
                .on_retry(move |index, next, _| seen.lock().push((index, next)))
                .on_permanent(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
        );

        let err = job.run_with_retry(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, JobError::execution("attempt 3 failed"));
        assert_eq!(job.state(), JobState::RetryFailed);
        assert_eq!(job.retry_index(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(permanent.load(Ordering::SeqCst), 1);
        assert_eq!(*retries.lock(), vec![(0, ms(2)), (1, Duration::ZERO)]);
    }

    #[tokio::test]
    async fn test_retry_waits_scheduled_delay_without_jitter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let job = Job::new(flaky(1, calls), JobConfig::new().with_retries(vec![ms(30)]));
        let ctx = CancellationToken::new();
        let _ = job.execute(&ctx).await;

        let started = Instant::now();
        assert!(job.retry(&ctx).await.is_ok());
        assert!(started.elapsed() >= ms(30));
    }

    #[tokio::test]
    async fn test_retry_backoff_interrupted_by_cancellation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let job = Job::new(flaky(1, calls.clone()), JobConfig::new().with_retries(vec![ms(500)]));
        let ctx = CancellationToken::new();
        let _ = job.execute(&ctx).await;

        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ms(10)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let err = job.retry(&ctx).await.unwrap_err();
        assert!(started.elapsed() < ms(500));
        assert!(err.is_cancelled());
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.last_error(), Some(JobError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_set_retries_allows_reuse() {
        let calls = Arc::new(AtomicUsize::new(0));
        let job = Job::new(flaky(3, calls.clone()), JobConfig::new().with_retries(vec![ms(0)]));
        let ctx = CancellationToken::new();

        assert!(job.run_with_retry(&ctx).await.is_err());
        assert_eq!(job.state(), JobState::RetryFailed);
        assert!(job.retries_exhausted());

        job.set_retries(vec![ms(0), ms(0)]);
        assert_eq!(job.retry_index(), None);
        assert_eq!(job.state(), JobState::Init);
        assert!(!job.retries_exhausted());

        assert!(job.run_with_retry(&ctx).await.is_ok());
        assert_eq!(job.retry_index(), Some(0));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
