use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Process-local counters. Graph-path degradations get their own counter so
/// a silently-empty knowledge graph is visible without log spelunking.
pub struct Metrics {
    ingest_success: AtomicUsize,
    ingest_failure: AtomicUsize,
    graph_degraded: AtomicUsize,
    chunks_processed: AtomicUsize,
    searches: AtomicUsize,
    total_search_time_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ingest_success: AtomicUsize::new(0),
            ingest_failure: AtomicUsize::new(0),
            graph_degraded: AtomicUsize::new(0),
            chunks_processed: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
            total_search_time_us: AtomicU64::new(0),
        })
    }

    pub fn record_ingest(&self, success: bool, chunks: usize) {
        if success {
            self.ingest_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.ingest_failure.fetch_add(1, Ordering::Relaxed);
        }
        self.chunks_processed.fetch_add(chunks, Ordering::Relaxed);
    }

    pub fn record_graph_degraded(&self) {
        self.graph_degraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search(&self, duration: std::time::Duration) {
        self.searches.fetch_add(1, Ordering::Relaxed);
        self.total_search_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let searches = self.searches.load(Ordering::Relaxed);
        let total_us = self.total_search_time_us.load(Ordering::Relaxed);
        let avg_search_time_ms = if searches > 0 {
            total_us as f64 / searches as f64 / 1000.0
        } else {
            0.0
        };

        MetricsSnapshot {
            ingest_success: self.ingest_success.load(Ordering::Relaxed),
            ingest_failure: self.ingest_failure.load(Ordering::Relaxed),
            graph_degraded: self.graph_degraded.load(Ordering::Relaxed),
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            searches,
            avg_search_time_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub ingest_success: usize,
    pub ingest_failure: usize,
    pub graph_degraded: usize,
    pub chunks_processed: usize,
    pub searches: usize,
    pub avg_search_time_ms: f64,
}
