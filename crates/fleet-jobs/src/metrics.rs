//! Job execution metrics.
//!
//! [`MetricsHook`] is the seam the worker pool reports to. [`PrometheusMetrics`]
//! records through the `metrics` facade; installing an exporter is up to the
//! embedding application.

use crate::error::JobError;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names for the job execution engine.
pub mod names {
    /// Total job runs started by a worker.
    pub const JOBS_STARTED_TOTAL: &str = "fleet_jobs_started_total";
    /// Total job runs that eventually succeeded.
    pub const JOBS_SUCCEEDED_TOTAL: &str = "fleet_jobs_succeeded_total";
    /// Total job runs that ended in failure.
    pub const JOBS_FAILED_TOTAL: &str = "fleet_jobs_failed_total";
    /// Total job runs that exhausted their retry schedule.
    pub const JOBS_PERMANENTLY_FAILED_TOTAL: &str = "fleet_jobs_permanently_failed_total";
    /// Job run duration in seconds, retries included.
    pub const JOB_DURATION_SECONDS: &str = "fleet_job_duration_seconds";
}

/// Receives per-job outcomes from the worker pool.
pub trait MetricsHook: Send + Sync {
    /// A worker picked up the job.
    fn inc_job_started(&self, name: &str);

    /// The job succeeded, possibly after retries.
    fn inc_job_success(&self, name: &str, latency: Duration);

    /// The job failed.
    fn inc_job_failed(&self, name: &str, err: &JobError, latency: Duration);

    /// The job exhausted its retry schedule.
    fn inc_job_permanent_failed(&self, name: &str, err: &JobError);
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        names::JOBS_STARTED_TOTAL,
        "Total number of job runs started"
    );
    describe_counter!(
        names::JOBS_SUCCEEDED_TOTAL,
        "Total number of job runs that succeeded"
    );
    describe_counter!(
        names::JOBS_FAILED_TOTAL,
        "Total number of job runs that failed"
    );
    describe_counter!(
        names::JOBS_PERMANENTLY_FAILED_TOTAL,
        "Total number of job runs that exhausted their retries"
    );
    describe_histogram!(
        names::JOB_DURATION_SECONDS,
        "Job run duration in seconds, retries included"
    );
}

/// [`MetricsHook`] backed by the `metrics` facade.
#[derive(Debug, Clone)]
pub struct PrometheusMetrics {
    pool: String,
}

impl PrometheusMetrics {
    /// Creates a recorder labelling every series with `pool`.
    pub fn new(pool: impl Into<String>) -> Self {
        Self { pool: pool.into() }
    }

    /// Pool label value.
    pub fn pool(&self) -> &str {
        &self.pool
    }
}

impl MetricsHook for PrometheusMetrics {
    fn inc_job_started(&self, name: &str) {
        counter!(
            names::JOBS_STARTED_TOTAL,
            "pool" => self.pool.clone(),
            "job_name" => name.to_string()
        )
        .increment(1);
    }

    fn inc_job_success(&self, name: &str, latency: Duration) {
        counter!(
            names::JOBS_SUCCEEDED_TOTAL,
            "pool" => self.pool.clone(),
            "job_name" => name.to_string()
        )
        .increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "pool" => self.pool.clone(),
            "job_name" => name.to_string(),
            "status" => "succeeded"
        )
        .record(latency.as_secs_f64());
    }

    fn inc_job_failed(&self, name: &str, err: &JobError, latency: Duration) {
        counter!(
            names::JOBS_FAILED_TOTAL,
            "pool" => self.pool.clone(),
            "job_name" => name.to_string(),
            "error_type" => err.kind()
        )
        .increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "pool" => self.pool.clone(),
            "job_name" => name.to_string(),
            "status" => "failed"
        )
        .record(latency.as_secs_f64());
    }

    fn inc_job_permanent_failed(&self, name: &str, err: &JobError) {
        counter!(
            names::JOBS_PERMANENTLY_FAILED_TOTAL,
            "pool" => self.pool.clone(),
            "job_name" => name.to_string(),
            "error_type" => err.kind()
        )
        .increment(1);
    }
}
