//! Pluggable metrics reporting.
//!
//! The broadcast engine only talks to the narrow [`MetricsReporter`] trait.
//! [`NoOpReporter`] is the default; [`InMemoryReporter`] keeps counters,
//! gauges and timings in process and can produce a serializable
//! [`MetricsSnapshot`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

pub const REQUEST_COUNT: &str = "broadcaster.request.count";
pub const TIMEOUT_COUNT: &str = "broadcaster.timeout.count";
pub const PRIMARY_SUCCESS_COUNT: &str = "primary.success.count";
pub const PRIMARY_FAILURE_COUNT: &str = "primary.failure.count";
pub const PRIMARY_RESPONSE_TIME: &str = "primary.response_time";
pub const SECONDARY_SUCCESS_COUNT: &str = "secondary.success.count";
pub const SECONDARY_FAILURE_COUNT: &str = "secondary.failure.count";
pub const SECONDARY_RESPONSE_TIME: &str = "secondary.response_time";

/// Instrumentation sink shared by every in-flight backend task.
pub trait MetricsReporter: Send + Sync {
    fn increment(&self, tag: &str);
    fn gauge(&self, tag: &str, value: f64);
    fn count(&self, tag: &str, value: i64);
    fn time(&self, tag: &str, elapsed: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpReporter;

impl MetricsReporter for NoOpReporter {
    fn increment(&self, _tag: &str) {}
    fn gauge(&self, _tag: &str, _value: f64) {}
    fn count(&self, _tag: &str, _value: i64) {}
    fn time(&self, _tag: &str, _elapsed: Duration) {}
}

#[must_use]
pub fn noop() -> Arc<dyn MetricsReporter> {
    Arc::new(NoOpReporter)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimingSummary {
    pub count: u64,
    pub total_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, i64>,
    pub gauges: BTreeMap<String, f64>,
    pub timings: BTreeMap<String, TimingSummary>,
}

/// Thread-safe reporter that aggregates everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryReporter {
    inner: Mutex<MetricsSnapshot>,
}

impl InMemoryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn counter(&self, tag: &str) -> i64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .counters
            .get(tag)
            .copied()
            .unwrap_or(0)
    }

    fn with<F: FnOnce(&mut MetricsSnapshot)>(&self, f: F) {
        // A panic while holding the lock leaves plain numbers behind; keep going.
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

impl MetricsReporter for InMemoryReporter {
    fn increment(&self, tag: &str) {
        self.count(tag, 1);
    }

    fn gauge(&self, tag: &str, value: f64) {
        self.with(|m| {
            m.gauges.insert(tag.to_string(), value);
        });
    }

    fn count(&self, tag: &str, value: i64) {
        self.with(|m| *m.counters.entry(tag.to_string()).or_default() += value);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn time(&self, tag: &str, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        self.with(|m| {
            let timing = m.timings.entry(tag.to_string()).or_default();
            timing.count += 1;
            timing.total_ms += ms;
            timing.max_ms = timing.max_ms.max(ms);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let reporter = InMemoryReporter::new();
        reporter.increment(REQUEST_COUNT);
        reporter.increment(REQUEST_COUNT);
        reporter.count(REQUEST_COUNT, 3);
        assert_eq!(reporter.counter(REQUEST_COUNT), 5);
        assert_eq!(reporter.counter(TIMEOUT_COUNT), 0);
    }

    #[test]
    fn timings_track_count_total_and_max() {
        let reporter = InMemoryReporter::new();
        reporter.time(PRIMARY_RESPONSE_TIME, Duration::from_millis(10));
        reporter.time(PRIMARY_RESPONSE_TIME, Duration::from_millis(30));
        let snapshot = reporter.snapshot();
        assert_eq!(
            snapshot.timings[PRIMARY_RESPONSE_TIME],
            TimingSummary {
                count: 2,
                total_ms: 40,
                max_ms: 30,
            }
        );
    }

    #[test]
    fn gauges_keep_last_value() {
        let reporter = InMemoryReporter::new();
        reporter.gauge("inflight", 2.0);
        reporter.gauge("inflight", 1.0);
        assert_eq!(reporter.snapshot().gauges["inflight"], 1.0);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let reporter = Arc::new(InMemoryReporter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reporter = Arc::clone(&reporter);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        reporter.increment(SECONDARY_SUCCESS_COUNT);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(reporter.counter(SECONDARY_SUCCESS_COUNT), 800);
    }

    #[test]
    fn noop_reporter_accepts_everything() {
        let reporter = noop();
        reporter.increment(REQUEST_COUNT);
        reporter.gauge(REQUEST_COUNT, 1.0);
        reporter.count(REQUEST_COUNT, 1);
        reporter.time(REQUEST_COUNT, Duration::from_secs(1));
    }
}
