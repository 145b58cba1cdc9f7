//! In-process metrics counters.
//!
//! Counters are plain atomics shared across the server; they are reported
//! through logging and consumed by tests, there is no export pipeline.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared handle to the server metrics.
pub type SharedMetrics = Arc<ServerMetrics>;

/// Create a new shared metrics collector.
pub fn new_shared_metrics() -> SharedMetrics {
    Arc::new(ServerMetrics::default())
}

/// Server metrics collection.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Number of database connections successfully established.
    connections_opened: AtomicU64,

    /// Number of reconnect attempts triggered by broken handles.
    reconnects: AtomicU64,

    /// Total number of queries executed.
    queries_total: AtomicU64,

    /// Total number of failed queries.
    queries_failed: AtomicU64,

    /// Total number of tool invocations served.
    tool_calls: AtomicU64,
}

impl ServerMetrics {
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query(&self) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query_failure(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tool_call(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of connections established so far.
    ///
    /// Exposed directly because connection reuse and reconnect behavior are
    /// observable properties of the server.
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            queries_total: self.queries_total.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time view of the counters, suitable for logging.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub connections_opened: u64,
    pub reconnects: u64,
    pub queries_total: u64,
    pub queries_failed: u64,
    pub tool_calls: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = ServerMetrics::default();
        metrics.record_connection_opened();
        metrics.record_query();
        metrics.record_query();
        metrics.record_query_failure();
        metrics.record_tool_call();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_opened, 1);
        assert_eq!(snapshot.queries_total, 2);
        assert_eq!(snapshot.queries_failed, 1);
        assert_eq!(snapshot.tool_calls, 1);
        assert_eq!(snapshot.reconnects, 0);
        assert_eq!(metrics.connections_opened(), 1);
    }
}
