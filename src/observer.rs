//! Diagnostic observers for resolution and disposal events.
//!
//! Observers receive synchronous callbacks while the injector works. They are
//! meant for tracing, metrics and post-mortem debugging of resolution chains.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::scope::Scope;
use crate::token::Token;

/// Observer of injector events.
///
/// Observer calls are made synchronously on the resolving task. Keep
/// implementations lightweight; queue expensive work elsewhere.
///
/// # Examples
///
/// ```
/// use ferrous_injector::{DiObserver, Injector, Token};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct TraceIdObserver {
///     trace_id: String,
/// }
///
/// impl DiObserver for TraceIdObserver {
///     fn resolving(&self, token: &Token) {
///         println!("[{}] resolving {}", self.trace_id, token);
///     }
///
///     fn resolved(&self, token: &Token, duration: Duration) {
///         println!("[{}] resolved {} in {:?}", self.trace_id, token, duration);
///     }
/// }
///
/// let injector = Injector::builder()
///     .observer(Arc::new(TraceIdObserver { trace_id: "run-123".to_string() }))
///     .build()
///     .unwrap();
/// ```
pub trait DiObserver: Send + Sync {
    /// A token is about to be looked up and, if needed, constructed.
    fn resolving(&self, token: &Token);

    /// A token produced a value. `duration` spans lookup and construction.
    fn resolved(&self, token: &Token, duration: Duration);

    /// A required token had no usable provider.
    fn missing(&self, _token: &Token, _ancestry: &[String]) {}

    /// Construction failed; the error is returned to the caller afterwards.
    fn construction_failed(&self, _token: &Token, _error: &DiError) {}

    /// A scope node was disposed.
    fn disposed(&self, _scope: &Scope, _reason: &str) {}
}

/// Registered observers. Cheap to check when empty.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, token: &Token) {
        for observer in &self.observers {
            observer.resolving(token);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, token: &Token, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(token, duration);
        }
    }

    pub(crate) fn missing(&self, token: &Token, ancestry: &[String]) {
        for observer in &self.observers {
            observer.missing(token, ancestry);
        }
    }

    pub(crate) fn construction_failed(&self, token: &Token, error: &DiError) {
        for observer in &self.observers {
            observer.construction_failed(token, error);
        }
    }

    pub(crate) fn disposed(&self, scope: &Scope, reason: &str) {
        for observer in &self.observers {
            observer.disposed(scope, reason);
        }
    }
}

/// Built-in observer that forwards every event to `tracing`.
///
/// Resolution events are emitted at `debug`, failures at `warn`.
///
/// # Examples
///
/// ```
/// use ferrous_injector::{Injector, LoggingObserver};
/// use std::sync::Arc;
///
/// let injector = Injector::builder()
///     .observer(Arc::new(LoggingObserver::with_prefix("app")))
///     .build()
///     .unwrap();
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-injector".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, token: &Token) {
        tracing::debug!(prefix = %self.prefix, token = %token, "resolving");
    }

    fn resolved(&self, token: &Token, duration: Duration) {
        tracing::debug!(prefix = %self.prefix, token = %token, ?duration, "resolved");
    }

    fn missing(&self, token: &Token, ancestry: &[String]) {
        tracing::warn!(
            prefix = %self.prefix,
            token = %token,
            ancestry = %ancestry.join(" -> "),
            "no provider"
        );
    }

    fn construction_failed(&self, token: &Token, error: &DiError) {
        tracing::warn!(prefix = %self.prefix, token = %token, %error, "construction failed");
    }

    fn disposed(&self, scope: &Scope, reason: &str) {
        tracing::debug!(prefix = %self.prefix, scope = %scope, reason, "scope disposed");
    }
}

/// Point-in-time copy of [`MetricsObserver`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub resolving: u64,
    pub resolved: u64,
    pub missing: u64,
    pub failed: u64,
    pub disposed: u64,
    pub total_resolution_nanos: u64,
}

/// Observer that counts events.
///
/// ```
/// use ferrous_injector::{Injector, MetricsObserver, Provider, Token};
/// use std::sync::Arc;
///
/// # tokio_test();
/// # fn tokio_test() {
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let metrics = Arc::new(MetricsObserver::new());
/// let port = Token::named("Port");
/// let injector = Injector::builder()
///     .provider(Provider::value(port.clone(), 8080u16))
///     .observer(metrics.clone())
///     .build()
///     .unwrap();
///
/// injector.inject::<u16>(&port).await.unwrap();
/// assert_eq!(metrics.snapshot().resolved, 1);
/// # });
/// # }
/// ```
#[derive(Default)]
pub struct MetricsObserver {
    resolving: AtomicU64,
    resolved: AtomicU64,
    missing: AtomicU64,
    failed: AtomicU64,
    disposed: AtomicU64,
    total_resolution_nanos: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            resolving: self.resolving.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            disposed: self.disposed.load(Ordering::Relaxed),
            total_resolution_nanos: self.total_resolution_nanos.load(Ordering::Relaxed),
        }
    }
}

impl DiObserver for MetricsObserver {
    fn resolving(&self, _token: &Token) {
        self.resolving.fetch_add(1, Ordering::Relaxed);
    }

    fn resolved(&self, _token: &Token, duration: Duration) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_resolution_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    fn missing(&self, _token: &Token, _ancestry: &[String]) {
        self.missing.fetch_add(1, Ordering::Relaxed);
    }

    fn construction_failed(&self, _token: &Token, _error: &DiError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn disposed(&self, _scope: &Scope, _reason: &str) {
        self.disposed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_observer_counts_each_event() {
        let metrics = Arc::new(MetricsObserver::new());
        let mut observers = Observers::new();
        assert!(!observers.has_observers());
        observers.add(metrics.clone());
        assert!(observers.has_observers());

        let token = Token::named("Thing");
        observers.resolving(&token);
        observers.resolved(&token, Duration::from_nanos(5));
        observers.missing(&token, &[]);
        observers.construction_failed(&token, &DiError::DepthExceeded(1));
        observers.disposed(&Scope::Root, "shutdown");

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                resolving: 1,
                resolved: 1,
                missing: 1,
                failed: 1,
                disposed: 1,
                total_resolution_nanos: 5,
            }
        );
    }
}
