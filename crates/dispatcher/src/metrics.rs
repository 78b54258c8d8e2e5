//! Per-sink counters
//!
//! Kept in atomics so the dispatcher can report them after the worker is
//! gone. Every write is also mirrored to the `metrics` facade as
//! `syncview_sink_writes_total{sink, status}`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Total successful writes
    write_count: AtomicU64,
    /// Total write failures
    failure_count: AtomicU64,
    /// Encoded bytes handed to successful writes
    bytes_written: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Count a successful write of `bytes`
    pub fn record_write(&self, sink: &str, bytes: usize) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
        ::metrics::counter!("syncview_sink_writes_total", "sink" => sink.to_string(), "status" => "ok")
            .increment(1);
    }

    /// Count a failed write
    pub fn record_failure(&self, sink: &str) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!("syncview_sink_writes_total", "sink" => sink.to_string(), "status" => "error")
            .increment(1);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            bytes_written: self.bytes_written(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_write_and_failure() {
        let m = SinkMetrics::new();
        m.record_write("png", 100);
        m.record_write("png", 20);
        m.record_failure("png");
        m.set_queue_len(3);

        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                queue_len: 3,
                write_count: 2,
                failure_count: 1,
                bytes_written: 120,
            }
        );
    }
}
