//! Cache metrics for monitoring and observability

use metrics::counter;
use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Cache metrics collector.
///
/// Counts are kept locally for [`CacheMetrics::snapshot`] and mirrored into the global
/// [`metrics`] recorder.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    cache_name: &'static str,
    counts: Arc<Counts>,
}

#[derive(Debug, Default)]
struct Counts {
    hits: AtomicU64,
    misses: AtomicU64,
    clears: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics collector for a cache
    pub fn new(cache_name: &'static str) -> Self {
        Self { cache_name, counts: Arc::default() }
    }

    /// Record a cache hit
    pub fn record_hit(&self, kind: &'static str) {
        self.counts.hits.fetch_add(1, Ordering::Relaxed);
        counter!("raffles.cache.hits", "cache" => self.cache_name, "kind" => kind).increment(1);
    }

    /// Record a cache miss, including reads of expired entries
    pub fn record_miss(&self, kind: &'static str) {
        self.counts.misses.fetch_add(1, Ordering::Relaxed);
        counter!("raffles.cache.misses", "cache" => self.cache_name, "kind" => kind).increment(1);
    }

    /// Record a cache clear operation
    pub fn record_clear(&self) {
        self.counts.clears.fetch_add(1, Ordering::Relaxed);
        counter!("raffles.cache.clears", "cache" => self.cache_name).increment(1);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let hits = self.counts.hits.load(Ordering::Relaxed);
        let misses = self.counts.misses.load(Ordering::Relaxed);
        MetricsSnapshot {
            hits,
            misses,
            clears: self.counts.clears.load(Ordering::Relaxed),
            hit_rate: MetricsSnapshot::calculate_hit_rate(hits, misses),
        }
    }
}

/// Snapshot of cache metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Total clear operations
    pub clears: u64,
    /// Hit rate percentage
    pub hit_rate: f64,
}

impl MetricsSnapshot {
    /// Calculate hit rate from hits and misses
    pub fn calculate_hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 { 0.0 } else { (hits as f64 / total as f64) * 100.0 }
    }
}
