//! Diagnostic observers for resolution events.
//!
//! Observers are attached to a root or a child injector when it is created and
//! are inherited by every injector created below it. They are called
//! synchronously around each build, so implementations should stay cheap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::Key;

/// Observer trait for resolution events.
///
/// `resolving` fires before an injector builds a value for an identifier,
/// `resolved` after the value was committed to that injector's cache, and
/// `failed` when the build returned an error. Cache hits and delegation to a
/// parent injector fire nothing.
///
/// # Examples
///
/// ```
/// use ferrous_injector::{Injector, Key, ResolutionObserver};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct Print;
///
/// impl ResolutionObserver for Print {
///     fn resolving(&self, injector: &str, key: &Key) {
///         println!("[{}] building {}", injector, key);
///     }
///
///     fn resolved(&self, injector: &str, key: &Key, duration: Duration) {
///         println!("[{}] built {} in {:?}", injector, key, duration);
///     }
/// }
///
/// let app = Injector::builder("App").observer(Arc::new(Print)).build();
/// assert_eq!(app.name(), "App");
/// ```
pub trait ResolutionObserver: Send + Sync {
    /// Called before a value is built.
    fn resolving(&self, injector: &str, key: &Key);

    /// Called after a value is built and cached.
    fn resolved(&self, injector: &str, key: &Key, duration: Duration);

    /// Called when building failed.
    fn failed(&self, injector: &str, key: &Key, error: &DiError) {
        let _ = (injector, key, error);
    }
}

/// Collection of observers attached to an injector.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ResolutionObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn resolving(&self, injector: &str, key: &Key) {
        for observer in &self.observers {
            observer.resolving(injector, key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, injector: &str, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(injector, key, duration);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, injector: &str, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.failed(injector, key, error);
        }
    }
}

/// Observer that forwards events to `tracing`.
///
/// Builds are logged at `debug`, failures at `warn`. Install a subscriber such
/// as `tracing_subscriber::fmt` to see them.
///
/// ```
/// use ferrous_injector::{Injector, LoggingObserver};
/// use std::sync::Arc;
///
/// let app = Injector::builder("App")
///     .observer(Arc::new(LoggingObserver::with_target("app::di")))
///     .build();
/// # let _ = app;
/// ```
pub struct LoggingObserver {
    label: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            label: "ferrous-injector".to_string(),
        }
    }

    /// Observer whose events carry `label` in their `source` field.
    pub fn with_target(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionObserver for LoggingObserver {
    fn resolving(&self, injector: &str, key: &Key) {
        tracing::debug!(source = %self.label, injector, identifier = %key, "resolving");
    }

    fn resolved(&self, injector: &str, key: &Key, duration: Duration) {
        tracing::debug!(
            source = %self.label,
            injector,
            identifier = %key,
            elapsed_us = duration.as_micros() as u64,
            "resolved"
        );
    }

    fn failed(&self, injector: &str, key: &Key, error: &DiError) {
        tracing::warn!(source = %self.label, injector, identifier = %key, %error, "resolution failed");
    }
}

/// Observer counting builds and their cumulative time.
#[derive(Default)]
pub struct MetricsObserver {
    builds: AtomicU64,
    failures: AtomicU64,
    total_nanos: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values built and cached.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn total_build_time(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    pub fn average_build_time(&self) -> Option<Duration> {
        let total = self.total_nanos.load(Ordering::Relaxed);
        total.checked_div(self.build_count()).map(Duration::from_nanos)
    }
}

impl ResolutionObserver for MetricsObserver {
    fn resolving(&self, _injector: &str, _key: &Key) {}

    fn resolved(&self, _injector: &str, _key: &Key, duration: Duration) {
        self.builds.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn failed(&self, _injector: &str, _key: &Key, _error: &DiError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    #[test]
    fn metrics_observer_counts() {
        let metrics = Arc::new(MetricsObserver::new());
        let mut observers = Observers::default();
        assert!(!observers.has_observers());
        observers.add(metrics.clone());
        observers.add(Arc::new(LoggingObserver::new()));
        assert_eq!(observers.len(), 2);

        let key = key_of_type::<u8>();
        observers.resolving("Root", &key);
        observers.resolved("Root", &key, Duration::from_millis(4));
        observers.resolved("Root", &key, Duration::from_millis(2));
        observers.failed("Root", &key, &DiError::DepthExceeded(3));

        assert_eq!(metrics.build_count(), 2);
        assert_eq!(metrics.failure_count(), 1);
        assert_eq!(metrics.average_build_time(), Some(Duration::from_millis(3)));
    }

    #[test]
    fn average_handles_counts_beyond_u32() {
        let metrics = MetricsObserver::new();
        metrics.builds.store(1 << 32, Ordering::Relaxed);
        metrics.total_nanos.store(3 << 32, Ordering::Relaxed);
        assert_eq!(metrics.average_build_time(), Some(Duration::from_nanos(3)));
    }

    #[test]
    fn empty_metrics_have_no_average() {
        assert!(MetricsObserver::new().average_build_time().is_none());
    }
}
