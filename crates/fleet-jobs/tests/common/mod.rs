//! Shared fixtures for fleet-jobs integration tests.

use fleet_jobs::{JobError, Logger, MetricsHook};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Log level captured by [`RecordingLogger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// A captured log line.
#[derive(Debug, Clone)]
pub struct Entry {
    pub level: Level,
    pub prefix: Option<String>,
    pub message: String,
}

/// Logger keeping every message in memory.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    prefix: Option<String>,
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().clone()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    fn push(&self, level: Level, message: &str) {
        self.entries.lock().push(Entry {
            level,
            prefix: self.prefix.clone(),
            message: message.to_string(),
        });
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }

    fn with_prefix(&self, prefix: &str) -> Arc<dyn Logger> {
        let prefix = match &self.prefix {
            Some(parent) => format!("{parent}.{prefix}"),
            None => prefix.to_string(),
        };
        Arc::new(Self {
            prefix: Some(prefix),
            entries: self.entries.clone(),
        })
    }
}

/// A captured metrics call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricEvent {
    Started(String),
    Success(String),
    Failed(String, JobError),
    PermanentFailed(String, JobError),
}

/// Metrics hook keeping every call in memory.
#[derive(Clone, Default)]
pub struct RecordingMetrics {
    events: Arc<Mutex<Vec<MetricEvent>>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().clone()
    }
}

impl MetricsHook for RecordingMetrics {
    fn inc_job_started(&self, name: &str) {
        self.events.lock().push(MetricEvent::Started(name.to_string()));
    }

    fn inc_job_success(&self, name: &str, _latency: Duration) {
        self.events.lock().push(MetricEvent::Success(name.to_string()));
    }

    fn inc_job_failed(&self, name: &str, err: &JobError, _latency: Duration) {
        self.events
            .lock()
            .push(MetricEvent::Failed(name.to_string(), err.clone()));
    }

    fn inc_job_permanent_failed(&self, name: &str, err: &JobError) {
        self.events
            .lock()
            .push(MetricEvent::PermanentFailed(name.to_string(), err.clone()));
    }
}

/// Milliseconds shorthand.
pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
