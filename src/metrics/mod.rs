//! Operation timings and error counts.
//!
//! The sink is write-only from the point of view of the fetch pipeline: nothing it records is
//! ever consulted for retry or cache decisions.

use crate::{error::ErrorClass, platform::PlatformClass};
use dashmap::DashMap;
use metrics::{counter, histogram};
use serde::Serialize;
use std::{fmt::Debug, time::Duration};
use tracing::trace;

/// Outcome of a recorded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeded.
    Success,
    /// The operation failed with the given class.
    Failure(ErrorClass),
}

impl Outcome {
    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure(class) => class.label(),
        }
    }
}

/// Receives one event per remote operation attempt.
pub trait EventSink: Debug + Send + Sync {
    /// Records a finished operation.
    fn record(
        &self,
        operation: &str,
        platform: PlatformClass,
        duration: Duration,
        outcome: &Outcome,
    );
}

/// A sink discarding every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _: &str, _: PlatformClass, _: Duration, _: &Outcome) {}
}

/// Key of an [`OperationMetrics`] bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperationKey {
    /// Operation name, e.g. `raffle.state`.
    pub operation: String,
    /// Platform class of the session.
    pub platform: PlatformClass,
}

/// Aggregated statistics of one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStats {
    /// Number of recorded attempts.
    pub calls: u64,
    /// Number of failed attempts.
    pub errors: u64,
    /// Sum of all attempt durations.
    pub total_duration: Duration,
    /// Longest attempt.
    pub max_duration: Duration,
    /// Class of the most recent failure.
    #[serde(skip)]
    pub last_error: Option<ErrorClass>,
}

impl OperationStats {
    /// Mean attempt duration.
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total_duration.div_f64(self.calls as f64)
        }
    }
}

/// In-memory [`EventSink`] bucketing events per operation and platform.
///
/// Every event is also forwarded to the global [`metrics`] recorder.
#[derive(Debug, Default)]
pub struct OperationMetrics {
    buckets: DashMap<OperationKey, OperationStats>,
}

impl OperationMetrics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of a single bucket.
    pub fn get(&self, operation: &str, platform: PlatformClass) -> Option<OperationStats> {
        let key = OperationKey { operation: operation.to_string(), platform };
        self.buckets.get(&key).map(|entry| entry.value().clone())
    }

    /// All buckets, sorted by key.
    pub fn snapshot(&self) -> Vec<(OperationKey, OperationStats)> {
        let mut buckets: Vec<_> = self
            .buckets
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        buckets.sort_by(|(a, _), (b, _)| a.cmp(b));
        buckets
    }

    /// Total number of failed attempts across all buckets.
    pub fn total_errors(&self) -> u64 {
        self.buckets.iter().map(|entry| entry.errors).sum()
    }

    /// Drops all buckets.
    pub fn reset(&self) {
        self.buckets.clear();
    }
}

impl EventSink for OperationMetrics {
    fn record(
        &self,
        operation: &str,
        platform: PlatformClass,
        duration: Duration,
        outcome: &Outcome,
    ) {
        trace!(operation, %platform, ?duration, outcome = outcome.label(), "Recording operation");

        counter!(
            "raffles.operation.count",
            "operation" => operation.to_string(),
            "platform" => platform.as_str(),
            "outcome" => outcome.label()
        )
        .increment(1);
        histogram!(
            "raffles.operation.latency",
            "operation" => operation.to_string(),
            "platform" => platform.as_str()
        )
        .record(duration.as_millis() as f64);

        let key = OperationKey { operation: operation.to_string(), platform };
        let mut stats = self.buckets.entry(key).or_default();
        stats.calls += 1;
        stats.total_duration += duration;
        stats.max_duration = stats.max_duration.max(duration);
        if let Outcome::Failure(class) = outcome {
            stats.errors += 1;
            stats.last_error = Some(class.clone());
        }
    }
}
