//! Per-device cumulative counters.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

/// Cumulative counters for one display key.
///
/// `count` and `bytes` only ever grow; `last_seen` is the maximum event
/// timestamp observed for the key.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TopicCounters {
    pub count: u64,
    pub bytes: u64,
    pub last_seen: f64,
}

#[derive(Debug, Default)]
struct TableState {
    topics: HashMap<String, TopicCounters>,
    total_count: u64,
    total_bytes: u64,
}

/// Mapping from display key to cumulative counters, with grand totals
/// maintained incrementally so the totals read path stays O(1).
///
/// Thread-safe behind a single internal lock: `record` is O(1), `snapshot`
/// copies and sorts under a bounded critical section. Keys are created
/// lazily on first event and never evicted; unbounded key cardinality is an
/// accepted tradeoff for the observed topic spaces.
#[derive(Debug, Default)]
pub struct SnapshotTable {
    state: Mutex<TableState>,
}

impl SnapshotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event of `size` bytes for `key` at `timestamp`.
    pub fn record(&self, key: &str, size: u64, timestamp: f64) {
        let mut state = self.state.lock();
        state.total_count += 1;
        state.total_bytes += size;

        let counters = state.topics.entry(key.to_string()).or_default();
        counters.count += 1;
        counters.bytes += size;
        if timestamp > counters.last_seen {
            counters.last_seen = timestamp;
        }
    }

    /// A consistent point-in-time copy of all counters, sorted by descending
    /// message count with ties broken by key for determinism.
    pub fn snapshot(&self) -> Vec<(String, TopicCounters)> {
        let mut rows: Vec<(String, TopicCounters)> = {
            let state = self.state.lock();
            state.topics.iter().map(|(k, v)| (k.clone(), *v)).collect()
        };

        // Sorting happens outside the lock; the copy is already consistent.
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));
        rows
    }

    /// Running grand totals: (message count, byte count) across all keys.
    pub fn totals(&self) -> (u64, u64) {
        let state = self.state.lock();
        (state.total_count, state.total_bytes)
    }

    /// Number of distinct display keys seen so far.
    pub fn len(&self) -> usize {
        self.state.lock().topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
