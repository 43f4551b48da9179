//! Traffic statistics: cumulative per-device counters and windowed rates.
//!
//! [`TrafficRecorder`] is the shared object both halves of the monitor hang
//! off: the ingest path calls [`TrafficRecorder::on_event`] once per bus
//! message, the report path calls [`TrafficRecorder::build_report`] once per
//! reporting interval. It owns a [`SnapshotTable`] for lifetime counters and
//! a [`SlidingWindow`] for trailing-window rates; each protects itself with
//! its own lock so ingest never waits on a full report build.

pub mod table;
pub mod window;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::topic::display_key;

pub use table::{SnapshotTable, TopicCounters};
pub use window::{Bucket, RateSample, SlidingWindow, DEFAULT_RETENTION_SECS};

/// Current wall-clock time in epoch seconds.
pub fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// One row of the per-device table, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicRow {
    pub key: String,
    pub count: u64,
    pub bytes: u64,
    pub last_seen: f64,
}

/// Everything one report cycle needs: sorted top-N rows, grand totals, and
/// the per-window rate pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// When this report was generated (epoch seconds).
    pub generated_at: f64,
    /// Seconds since the recorder was created.
    pub elapsed_secs: f64,
    pub total_messages: u64,
    pub total_bytes: u64,
    /// Distinct display keys seen, before any row truncation.
    pub topic_count: usize,
    /// Trailing-window rates, one sample per configured window.
    pub window_rates: Vec<RateSample>,
    /// Per-device rows, sorted by descending message count.
    pub rows: Vec<TopicRow>,
}

impl Report {
    /// Lifetime average message rate since the recorder started.
    pub fn lifetime_messages_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.total_messages as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Lifetime average byte rate since the recorder started.
    pub fn lifetime_bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.total_bytes as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

/// Shared traffic state for one monitored bus namespace.
///
/// Constructed once at startup and passed by `Arc` to both the ingest and
/// report paths; there is no ambient or static state. Recording is
/// fire-and-forget and never fails.
#[derive(Debug)]
pub struct TrafficRecorder {
    detail_depth: usize,
    started_at: f64,
    table: SnapshotTable,
    window: SlidingWindow,
}

impl TrafficRecorder {
    /// Create a recorder grouping topics at `detail_depth` and retaining
    /// `retention_secs` of bucket history.
    pub fn new(detail_depth: usize, retention_secs: u64) -> Self {
        Self::with_start_time(detail_depth, retention_secs, now_epoch())
    }

    /// Like [`TrafficRecorder::new`] with an explicit start time, for
    /// deterministic elapsed-time computation in tests and replays.
    pub fn with_start_time(detail_depth: usize, retention_secs: u64, started_at: f64) -> Self {
        Self {
            detail_depth,
            started_at,
            table: SnapshotTable::new(),
            window: SlidingWindow::new(retention_secs),
        }
    }

    /// Ingest entry point: record one bus message.
    ///
    /// Cheap and non-blocking relative to message delivery: two O(1)
    /// critical sections, no allocation beyond first sight of a key.
    pub fn on_event(&self, topic: &str, size: u64, timestamp: f64) {
        let key = display_key(topic, self.detail_depth);
        self.table.record(&key, size, timestamp);
        self.window.record(timestamp, size);
    }

    /// Report entry point: build a consistent [`Report`] as of `now`.
    ///
    /// `max_rows` truncates the per-device table to the top N by message
    /// count; 0 keeps every row. Reflects every `on_event` call that
    /// returned before this was invoked.
    pub fn build_report(&self, now: f64, windows: &[u64], max_rows: usize) -> Report {
        let (total_messages, total_bytes) = self.table.totals();
        let window_rates = self.window.rates(now, windows);

        let mut rows: Vec<TopicRow> = self
            .table
            .snapshot()
            .into_iter()
            .map(|(key, counters)| TopicRow {
                key,
                count: counters.count,
                bytes: counters.bytes,
                last_seen: counters.last_seen,
            })
            .collect();
        let topic_count = rows.len();
        if max_rows > 0 {
            rows.truncate(max_rows);
        }

        Report {
            generated_at: now,
            elapsed_secs: (now - self.started_at).max(0.0),
            total_messages,
            total_bytes,
            topic_count,
            window_rates,
            rows,
        }
    }

    /// Time the recorder was created (epoch seconds).
    pub fn started_at(&self) -> f64 {
        self.started_at
    }
}
