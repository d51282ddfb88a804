//! Metrics collection and reporting

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Register descriptions for every metric the engine emits.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    ::metrics::describe_counter!(
        "piiscrub_pages_total",
        "Pages processed, labelled by reconciliation outcome"
    );
    ::metrics::describe_counter!("piiscrub_candidates_total", "Regex candidates found");
    ::metrics::describe_counter!("piiscrub_entities_total", "Authoritative entities after reconciliation");
    ::metrics::describe_counter!("piiscrub_regions_total", "Redaction regions emitted");
    ::metrics::describe_counter!(
        "piiscrub_unlocated_total",
        "Entities that could not be placed and will not be redacted"
    );
    ::metrics::describe_histogram!(
        "piiscrub_classifier_latency_us",
        ::metrics::Unit::Microseconds,
        "Semantic classifier round-trip latency in microseconds"
    );
}

/// Run-level counters shared by all page workers
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    pages_processed: AtomicU64,
    pages_degraded: AtomicU64,
    candidates: AtomicU64,
    entities: AtomicU64,
    regions: AtomicU64,
    unlocated: AtomicU64,
    classifier_calls: AtomicU64,
    classifier_latency_us: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                pages_processed: AtomicU64::new(0),
                pages_degraded: AtomicU64::new(0),
                candidates: AtomicU64::new(0),
                entities: AtomicU64::new(0),
                regions: AtomicU64::new(0),
                unlocated: AtomicU64::new(0),
                classifier_calls: AtomicU64::new(0),
                classifier_latency_us: AtomicU64::new(0),
            }),
        }
    }

    /// Record a finished page
    pub fn record_page(&self, degraded: bool) {
        self.inner.pages_processed.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.inner.pages_degraded.fetch_add(1, Ordering::Relaxed);
            ::metrics::counter!("piiscrub_pages_total", "outcome" => "degraded").increment(1);
        } else {
            ::metrics::counter!("piiscrub_pages_total", "outcome" => "reconciled").increment(1);
        }
    }

    pub fn record_candidates(&self, count: u64) {
        self.inner.candidates.fetch_add(count, Ordering::Relaxed);
        ::metrics::counter!("piiscrub_candidates_total").increment(count);
    }

    pub fn record_entities(&self, count: u64) {
        self.inner.entities.fetch_add(count, Ordering::Relaxed);
        ::metrics::counter!("piiscrub_entities_total").increment(count);
    }

    pub fn record_regions(&self, count: u64) {
        self.inner.regions.fetch_add(count, Ordering::Relaxed);
        ::metrics::counter!("piiscrub_regions_total").increment(count);
    }

    pub fn record_unlocated(&self, count: u64) {
        self.inner.unlocated.fetch_add(count, Ordering::Relaxed);
        ::metrics::counter!("piiscrub_unlocated_total").increment(count);
    }

    /// Record one classifier round trip
    pub fn record_classifier_latency(&self, latency: Duration) {
        let micros = latency.as_micros() as u64;
        self.inner.classifier_calls.fetch_add(1, Ordering::Relaxed);
        self.inner
            .classifier_latency_us
            .fetch_add(micros, Ordering::Relaxed);
        ::metrics::histogram!("piiscrub_classifier_latency_us").record(micros as f64);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_processed: self.inner.pages_processed.load(Ordering::Relaxed),
            pages_degraded: self.inner.pages_degraded.load(Ordering::Relaxed),
            candidates: self.inner.candidates.load(Ordering::Relaxed),
            entities: self.inner.entities.load(Ordering::Relaxed),
            regions: self.inner.regions.load(Ordering::Relaxed),
            unlocated: self.inner.unlocated.load(Ordering::Relaxed),
            classifier_calls: self.inner.classifier_calls.load(Ordering::Relaxed),
            classifier_latency_us: self.inner.classifier_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MetricsCollector").field(&self.snapshot()).finish()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub pages_processed: u64,
    pub pages_degraded: u64,
    pub candidates: u64,
    pub entities: u64,
    pub regions: u64,
    pub unlocated: u64,
    pub classifier_calls: u64,
    pub classifier_latency_us: u64,
}

impl MetricsSnapshot {
    /// Average classifier latency per call
    pub fn avg_classifier_latency_us(&self) -> u64 {
        if self.classifier_calls == 0 {
            0
        } else {
            self.classifier_latency_us / self.classifier_calls
        }
    }

    /// Share of pages that fell back to regex-only detection
    pub fn degraded_rate(&self) -> f64 {
        if self.pages_processed == 0 {
            0.0
        } else {
            self.pages_degraded as f64 / self.pages_processed as f64
        }
    }
}
