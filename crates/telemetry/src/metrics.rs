//! Internal metrics collection.
//!
//! Counters are updated in-process and exposed as a snapshot on the
//! internal metrics endpoint; the runtime also logs the snapshot
//! periodically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the capture engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion gateway
    pub interactions_received: Counter,
    pub interactions_persisted: Counter,
    pub interactions_filtered: Counter,
    pub interactions_rejected: Counter,
    pub batches_received: Counter,
    pub rate_limited_requests: Counter,

    // Session assembler
    pub chunks_received: Counter,
    pub sessions_completed: Counter,

    // Aggregation engine
    pub heatmaps_generated: Counter,
    pub funnel_analyses: Counter,
    pub anomaly_scans: Counter,
    pub query_budget_exceeded: Counter,

    // Realtime relay
    pub notifications_published: Counter,
    pub relay_frames_received: Counter,
    pub relay_frames_malformed: Counter,

    // Retention
    pub interactions_swept: Counter,

    // Latency histograms
    pub ingest_latency_ms: Histogram,
    pub chunk_latency_ms: Histogram,
    pub aggregation_latency_ms: Histogram,

    // Gauges
    pub active_relay_connections: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub interactions_received: u64,
    pub interactions_persisted: u64,
    pub interactions_filtered: u64,
    pub interactions_rejected: u64,
    pub batches_received: u64,
    pub rate_limited_requests: u64,
    pub chunks_received: u64,
    pub sessions_completed: u64,
    pub heatmaps_generated: u64,
    pub funnel_analyses: u64,
    pub anomaly_scans: u64,
    pub query_budget_exceeded: u64,
    pub notifications_published: u64,
    pub relay_frames_received: u64,
    pub relay_frames_malformed: u64,
    pub interactions_swept: u64,
    pub ingest_latency_mean_ms: f64,
    pub chunk_latency_mean_ms: f64,
    pub aggregation_latency_mean_ms: f64,
    pub active_relay_connections: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            interactions_received: self.interactions_received.get(),
            interactions_persisted: self.interactions_persisted.get(),
            interactions_filtered: self.interactions_filtered.get(),
            interactions_rejected: self.interactions_rejected.get(),
            batches_received: self.batches_received.get(),
            rate_limited_requests: self.rate_limited_requests.get(),
            chunks_received: self.chunks_received.get(),
            sessions_completed: self.sessions_completed.get(),
            heatmaps_generated: self.heatmaps_generated.get(),
            funnel_analyses: self.funnel_analyses.get(),
            anomaly_scans: self.anomaly_scans.get(),
            query_budget_exceeded: self.query_budget_exceeded.get(),
            notifications_published: self.notifications_published.get(),
            relay_frames_received: self.relay_frames_received.get(),
            relay_frames_malformed: self.relay_frames_malformed.get(),
            interactions_swept: self.interactions_swept.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            chunk_latency_mean_ms: self.chunk_latency_ms.mean(),
            aggregation_latency_mean_ms: self.aggregation_latency_ms.mean(),
            active_relay_connections: self.active_relay_connections.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
