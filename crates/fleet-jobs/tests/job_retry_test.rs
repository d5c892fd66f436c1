//! Integration tests for the Job retry state machine with real timers.

mod common;

use common::ms;
use fleet_jobs::{Job, JobConfig, JobError, JobState, RetrySchedule};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Handler failing `failures` times before succeeding.
fn fails_then_succeeds(
    failures: usize,
    calls: Arc<AtomicUsize>,
) -> impl Fn(CancellationToken) -> BoxFuture<'static, Result<(), JobError>> + Send + Sync {
    move |_| {
        let calls = calls.clone();
        async move {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= failures {
                Err(JobError::execution(format!("attempt {attempt}")))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_succeeds_when_schedule_covers_failures() {
    for (failures, retries) in [(0, 0), (1, 1), (2, 3), (3, 3)] {
        let calls = Arc::new(AtomicUsize::new(0));
        let job = Job::new(
            fails_then_succeeds(failures, calls.clone()),
            JobConfig::new().with_retries(RetrySchedule::fixed(Duration::ZERO, retries)),
        );

        let result = job.run_with_retry(&CancellationToken::new()).await;
        assert!(result.is_ok(), "failures={failures} retries={retries}");
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
    }
}

#[tokio::test]
async fn test_fails_with_last_error_when_schedule_is_short() {
    for (failures, retries) in [(1, 0), (2, 1), (4, 3)] {
        let calls = Arc::new(AtomicUsize::new(0));
        let job = Job::new(
            fails_then_succeeds(failures, calls.clone()),
            JobConfig::new().with_retries(RetrySchedule::fixed(Duration::ZERO, retries)),
        );

        let err = job.run_with_retry(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, JobError::execution(format!("attempt {}", retries + 1)));
        assert_eq!(job.last_error(), Some(err));
        assert_eq!(calls.load(Ordering::SeqCst), retries + 1);
    }
}

#[tokio::test]
async fn test_three_step_schedule_scenario() {
    let calls = Arc::new(AtomicUsize::new(0));
    let job = Job::new(
        fails_then_succeeds(2, calls.clone()),
        JobConfig::new()
            .with_name("scenario")
            .with_retries(RetrySchedule::from_millis(&[0, 10, 20])),
    );

    let started = Instant::now();
    assert!(job.run_with_retry(&CancellationToken::new()).await.is_ok());

    assert!(started.elapsed() >= ms(10));
    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(job.retry_index(), Some(1));
    assert_eq!(job.last_error(), None);
}

#[tokio::test]
async fn test_empty_schedule_fires_on_permanent_once() {
    let permanent = Arc::new(Mutex::new(Vec::new()));
    let seen = permanent.clone();
    let job = Job::new(
        |_| async { Err(JobError::execution("unreachable host")) },
        JobConfig::new().on_permanent(move |err| seen.lock().push(err.clone())),
    );

    let started = Instant::now();
    let err = job.run_with_retry(&CancellationToken::new()).await.unwrap_err();

    assert!(started.elapsed() < ms(50));
    assert_eq!(err, JobError::execution("unreachable host"));
    assert_eq!(*permanent.lock(), vec![err]);
    assert_eq!(job.state(), JobState::Failed);
}

#[tokio::test]
async fn test_timeout_is_recorded_and_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let job = Job::new(
        move |_| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(ms(50)).await;
                }
                Ok(())
            }
        },
        JobConfig::new().with_timeout(ms(5)).with_retries(vec![ms(0)]),
    );

    let ctx = CancellationToken::new();
    let err = job.execute(&ctx).await.unwrap_err();
    assert_eq!(err, JobError::Timeout(ms(5)));
    assert_eq!(job.state(), JobState::Timeout);

    assert!(job.retry(&ctx).await.is_ok());
    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_jittered_wait_stays_in_band() {
    let calls = Arc::new(AtomicUsize::new(0));
    let job = Job::new(
        fails_then_succeeds(1, calls),
        JobConfig::new().with_retries(vec![ms(100)]).with_jitter(0.5),
    );
    let ctx = CancellationToken::new();
    let _ = job.execute(&ctx).await;

    let started = Instant::now();
    assert!(job.retry(&ctx).await.is_ok());
    let waited = started.elapsed();

    assert!(waited >= ms(75), "waited {waited:?}");
    assert!(waited < ms(125) + ms(75), "waited {waited:?}");
}

#[tokio::test]
async fn test_on_retry_sees_every_failed_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let retries = Arc::new(Mutex::new(Vec::new()));
    let completes = Arc::new(AtomicUsize::new(0));

    let seen = retries.clone();
    let done = completes.clone();
    let job = Job::new(
        fails_then_succeeds(3, calls),
        JobConfig::new()
            .with_retries(RetrySchedule::from_millis(&[1, 2, 3, 4]))
            .on_retry(move |index, next, err| seen.lock().push((index, next, err.to_string())))
            .on_complete(move || {
                done.fetch_add(1, Ordering::SeqCst);
            }),
    );

    assert!(job.run_with_retry(&CancellationToken::new()).await.is_ok());

    let retries = retries.lock().clone();
    assert_eq!(retries.len(), 2);
    assert_eq!(retries[0].0, 0);
    assert_eq!(retries[0].1, ms(2));
    assert!(retries[0].2.contains("attempt 2"));
    assert_eq!(retries[1].0, 1);
    assert_eq!(retries[1].1, ms(3));
    assert_eq!(completes.load(Ordering::SeqCst), 1);
    assert_eq!(job.retry_index(), Some(2));
}

#[tokio::test]
async fn test_cancellation_during_backoff_ends_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let job = Arc::new(Job::new(
        fails_then_succeeds(10, calls.clone()),
        JobConfig::new().with_retries(vec![Duration::from_secs(10); 3]),
    ));

    let ctx = CancellationToken::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ms(20)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = job.run_with_retry(&ctx).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(job.retries_exhausted());
}
