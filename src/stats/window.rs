//! Time-windowed traffic aggregation.
//!
//! [`SlidingWindow`] records every event into per-second buckets and answers
//! multi-interval rate queries ("messages/sec and bytes/sec over the last
//! 60s, 300s, 900s") without unbounded memory growth: all events within the
//! same integer second coalesce into one bucket, and buckets older than the
//! retention window are evicted from the head of the log.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;

/// Default retention window in seconds.
pub const DEFAULT_RETENTION_SECS: u64 = 900;

/// Per-second aggregate of message count and byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// The integer second (floor of the event timestamps) this bucket covers.
    pub second: i64,
    pub messages: u64,
    pub bytes: u64,
}

/// A rate measurement over one trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSample {
    /// Width of the window in seconds.
    pub window_secs: u64,
    pub messages_per_sec: f64,
    pub bytes_per_sec: f64,
}

#[derive(Debug, Default)]
struct WindowState {
    /// Bucket log, ordered by `second`. Strictly increasing as long as the
    /// ingest path delivers non-decreasing timestamps; an out-of-order
    /// timestamp appends a fragment bucket instead of touching the tail.
    buckets: VecDeque<Bucket>,
}

impl WindowState {
    /// Evict every bucket older than `cutoff` from the head.
    fn prune(&mut self, cutoff: i64) {
        while self.buckets.front().is_some_and(|b| b.second < cutoff) {
            self.buckets.pop_front();
        }
    }
}

/// Coalescing, pruning time-bucketed event log.
///
/// Thread-safe: a single internal lock protects the bucket log. `record` is
/// O(1) amortized; `rates` is O(live buckets) per requested interval, with
/// the live bucket count bounded by the retention window regardless of
/// event rate.
///
/// Precondition on queries: every requested interval must be less than or
/// equal to the retention window, otherwise the reported rate silently
/// undercounts (events beyond retention are already gone). Callers are
/// expected to clamp their intervals at configuration time.
#[derive(Debug)]
pub struct SlidingWindow {
    retention_secs: u64,
    state: Mutex<WindowState>,
}

impl SlidingWindow {
    /// Create a window log that retains at most `retention_secs` of
    /// wall-clock history.
    pub fn new(retention_secs: u64) -> Self {
        Self {
            retention_secs,
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Record one event of `size` bytes observed at `timestamp` (epoch
    /// seconds).
    ///
    /// Events within the same integer second coalesce into the tail bucket.
    /// An earlier-than-tail timestamp appends a new bucket rather than
    /// corrupting the tail: coalescing is lost for that event, correctness
    /// is not. Insertion is followed by head eviction of everything older
    /// than the retention window.
    pub fn record(&self, timestamp: f64, size: u64) {
        let second = timestamp.floor() as i64;
        let mut state = self.state.lock();

        match state.buckets.back_mut() {
            Some(tail) if tail.second == second => {
                tail.messages += 1;
                tail.bytes += size;
            }
            _ => state.buckets.push_back(Bucket {
                second,
                messages: 1,
                bytes: size,
            }),
        }

        state.prune(second - self.retention_secs as i64);
    }

    /// Compute messages/sec and bytes/sec over each requested trailing
    /// window, as seen at `now` (epoch seconds).
    ///
    /// Each window sums the buckets newer than `floor(now) - window` and
    /// divides by the full window width: a lone burst is reported spread
    /// over the window, not spiked. Expired buckets are pruned (relative to
    /// the retention window, not the smallest interval) before summing, so
    /// memory stays bounded even when `record` goes quiet.
    pub fn rates(&self, now: f64, windows: &[u64]) -> Vec<RateSample> {
        let now_second = now.floor() as i64;
        let mut state = self.state.lock();
        state.prune(now_second - self.retention_secs as i64);

        windows
            .iter()
            .map(|&window_secs| {
                if window_secs == 0 {
                    return RateSample {
                        window_secs,
                        messages_per_sec: 0.0,
                        bytes_per_sec: 0.0,
                    };
                }

                let cutoff = now_second - window_secs as i64;
                let mut messages = 0u64;
                let mut bytes = 0u64;
                for bucket in state.buckets.iter().filter(|b| b.second > cutoff) {
                    messages += bucket.messages;
                    bytes += bucket.bytes;
                }

                RateSample {
                    window_secs,
                    messages_per_sec: messages as f64 / window_secs as f64,
                    bytes_per_sec: bytes as f64 / window_secs as f64,
                }
            })
            .collect()
    }

    /// The retention window this log was built with.
    pub fn retention_secs(&self) -> u64 {
        self.retention_secs
    }

    /// Number of live buckets currently held.
    pub fn live_buckets(&self) -> usize {
        self.state.lock().buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_in_same_second_coalesce_into_one_bucket() {
        let window = SlidingWindow::new(900);
        for tenth in 1..=10 {
            window.record(100.0 + tenth as f64 / 10.0 - 0.1, 5);
        }

        assert_eq!(window.live_buckets(), 1);
        let rates = window.rates(100.0, &[60]);
        assert!((rates[0].messages_per_sec - 10.0 / 60.0).abs() < 1e-9);
        assert!((rates[0].bytes_per_sec - 50.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn zero_events_reports_zero_rates() {
        let window = SlidingWindow::new(900);
        let rates = window.rates(1234.5, &[60, 300, 900]);
        for sample in rates {
            assert_eq!(sample.messages_per_sec, 0.0);
            assert_eq!(sample.bytes_per_sec, 0.0);
        }
    }

    #[test]
    fn single_event_is_spread_over_the_window() {
        let window = SlidingWindow::new(900);
        window.record(500.0, 120);

        let rates = window.rates(500.0, &[60]);
        assert!((rates[0].messages_per_sec - 1.0 / 60.0).abs() < 1e-9);
        assert!((rates[0].bytes_per_sec - 2.0).abs() < 1e-9);
    }

    #[test]
    fn even_traffic_yields_exact_window_rates() {
        let window = SlidingWindow::new(900);
        let now = 1000.0;
        // 600 bytes spread evenly across 60 distinct seconds ending at now.
        for i in 0..60 {
            window.record(now - 59.0 + i as f64, 10);
        }

        let rates = window.rates(now, &[60]);
        assert!((rates[0].messages_per_sec - 1.0).abs() < 1e-9);
        assert!((rates[0].bytes_per_sec - 10.0).abs() < 1e-9);
    }

    #[test]
    fn each_interval_is_summed_independently() {
        let window = SlidingWindow::new(900);
        let now = 1000.0;
        // One message per second for the last 300 seconds, 6 bytes each.
        for i in 0..300 {
            window.record(now - 299.0 + i as f64, 6);
        }

        let rates = window.rates(now, &[60, 300]);
        assert!((rates[0].messages_per_sec - 1.0).abs() < 1e-9);
        assert!((rates[0].bytes_per_sec - 6.0).abs() < 1e-9);
        assert!((rates[1].messages_per_sec - 1.0).abs() < 1e-9);
        assert!((rates[1].bytes_per_sec - 6.0).abs() < 1e-9);
    }

    #[test]
    fn live_buckets_never_exceed_retention_plus_one() {
        let retention = 30u64;
        let window = SlidingWindow::new(retention);
        for i in 0..10_000 {
            window.record(i as f64 * 0.5, 1);
        }
        assert!(window.live_buckets() <= retention as usize + 1);
    }

    #[test]
    fn record_after_long_gap_evicts_all_prior_buckets() {
        let window = SlidingWindow::new(900);
        for i in 0..10 {
            window.record(100.0 + i as f64, 1);
        }
        assert_eq!(window.live_buckets(), 10);

        // More than the retention window later, one new event remains alone.
        window.record(100.0 + 9.0 + 901.0, 1);
        assert_eq!(window.live_buckets(), 1);
    }

    #[test]
    fn rates_prunes_even_without_new_records() {
        let window = SlidingWindow::new(60);
        for i in 0..30 {
            window.record(i as f64, 1);
        }
        assert_eq!(window.live_buckets(), 30);

        let rates = window.rates(10_000.0, &[60]);
        assert_eq!(rates[0].messages_per_sec, 0.0);
        assert_eq!(window.live_buckets(), 0);
    }

    #[test]
    fn out_of_order_timestamp_appends_a_fragment_bucket() {
        let window = SlidingWindow::new(900);
        window.record(100.2, 10);
        window.record(99.7, 20);
        window.record(100.9, 30);

        // The late event lands in its own bucket; the following in-order
        // event opens a fresh second-100 bucket rather than merging back.
        assert_eq!(window.live_buckets(), 3);
        let rates = window.rates(101.0, &[60]);
        assert!((rates[0].messages_per_sec - 3.0 / 60.0).abs() < 1e-9);
        assert!((rates[0].bytes_per_sec - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rates_is_a_read_operation() {
        let window = SlidingWindow::new(900);
        window.record(50.0, 7);

        let first = window.rates(50.0, &[10]);
        let second = window.rates(50.0, &[10]);
        assert_eq!(first, second);
    }

    #[test]
    fn zero_width_window_reports_zero_without_dividing() {
        let window = SlidingWindow::new(900);
        window.record(10.0, 100);
        let rates = window.rates(10.0, &[0]);
        assert_eq!(rates[0].messages_per_sec, 0.0);
        assert_eq!(rates[0].bytes_per_sec, 0.0);
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        use std::sync::Arc;
        use std::thread;

        let window = Arc::new(SlidingWindow::new(900));
        let mut handles = vec![];
        for _ in 0..8 {
            let w = window.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    w.record(100.5, 2);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let rates = window.rates(100.5, &[100]);
        assert!((rates[0].messages_per_sec - 2000.0 / 100.0).abs() < 1e-9);
        assert!((rates[0].bytes_per_sec - 4000.0 / 100.0).abs() < 1e-9);
        assert_eq!(window.live_buckets(), 1);
    }
}
