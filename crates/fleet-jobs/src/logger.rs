//! Logger seam used by the worker pool.
//!
//! The pool only needs leveled messages and prefixed children. The default
//! implementation forwards to `tracing`; output format is decided once by
//! `fleet_core::init_logging`.

use std::sync::Arc;

/// Leveled logger consumed by the worker pool and component.
pub trait Logger: Send + Sync {
    /// Logs at debug level.
    fn debug(&self, message: &str);

    /// Logs at info level.
    fn info(&self, message: &str);

    /// Logs at warn level.
    fn warn(&self, message: &str);

    /// Logs at error level.
    fn error(&self, message: &str);

    /// Returns a child logger tagging every message with `prefix`.
    fn with_prefix(&self, prefix: &str) -> Arc<dyn Logger>;
}

/// [`Logger`] emitting `tracing` events with `service` and `prefix` fields.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    service: Arc<str>,
    prefix: Option<Arc<str>>,
}

impl TracingLogger {
    /// Creates a logger for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: Arc::from(service.into()),
            prefix: None,
        }
    }

    /// Creates a shared logger for `service`.
    pub fn shared(service: impl Into<String>) -> Arc<dyn Logger> {
        Arc::new(Self::new(service))
    }

    /// Service name attached to events.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Prefix attached to events, if any. Nested prefixes are dot-joined.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn child(&self, prefix: &str) -> Self {
        let prefix = match &self.prefix {
            Some(parent) => format!("{parent}.{prefix}"),
            None => prefix.to_string(),
        };
        Self {
            service: self.service.clone(),
            prefix: Some(Arc::from(prefix)),
        }
    }

    fn prefix_field(&self) -> &str {
        self.prefix.as_deref().unwrap_or_default()
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(service = %self.service, prefix = self.prefix_field(), "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(service = %self.service, prefix = self.prefix_field(), "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(service = %self.service, prefix = self.prefix_field(), "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(service = %self.service, prefix = self.prefix_field(), "{message}");
    }

    fn with_prefix(&self, prefix: &str) -> Arc<dyn Logger> {
        Arc::new(self.child(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_logger_has_no_prefix() {
        let logger = TracingLogger::new("fleet");
        assert_eq!(logger.service(), "fleet");
        assert_eq!(logger.prefix(), None);
    }

    #[test]
    fn test_prefixes_nest() {
        let logger = TracingLogger::new("fleet");
        let child = logger.child("worker");
        let grandchild = child.child("3");

        assert_eq!(child.prefix(), Some("worker"));
        assert_eq!(grandchild.prefix(), Some("worker.3"));
        assert_eq!(grandchild.service(), "fleet");
        assert_eq!(logger.prefix(), None);
    }

    #[test]
    fn test_logging_without_subscriber_is_noop() {
        let logger = TracingLogger::shared("fleet").with_prefix("pool");
        logger.debug("debug");
        logger.info("info");
        logger.warn("warn");
        logger.error("error");
    }
}
