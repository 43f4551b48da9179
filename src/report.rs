//! Periodic report cycle.
//!
//! [`ReportDriver`] owns the report half of the monitor: on a fixed period
//! it builds a [`Report`] from the shared recorder and hands it to a
//! [`ReportSink`] (the terminal dashboard in the binary, anything else in
//! library use). The driver runs as a background tokio task until stopped
//! through its handle; shutdown aborts the wait between cycles promptly
//! rather than completing the current sleep.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::warn;

use crate::stats::{now_epoch, Report, TrafficRecorder};

/// Consumer of finished reports.
///
/// `publish` is called once per cycle with the freshly built report. Errors
/// are logged and the cycle continues; a sink failure never stops ingest.
pub trait ReportSink: Send {
    fn publish(&mut self, report: &Report) -> Result<()>;
}

/// Drives the snapshot + rates + render cycle on a fixed period.
pub struct ReportDriver {
    recorder: Arc<TrafficRecorder>,
    sink: Box<dyn ReportSink>,
    interval: Duration,
    windows: Vec<u64>,
    max_rows: usize,
}

impl ReportDriver {
    pub fn new(
        recorder: Arc<TrafficRecorder>,
        sink: Box<dyn ReportSink>,
        interval: Duration,
        windows: Vec<u64>,
        max_rows: usize,
    ) -> Self {
        Self {
            recorder,
            sink,
            interval,
            windows,
            max_rows,
        }
    }

    /// Spawn the report loop as a background task.
    ///
    /// The first report is published immediately, then one per interval.
    /// Returns a handle used to stop the loop.
    pub fn start(mut self) -> DriverHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.recorder.build_report(
                            now_epoch(),
                            &self.windows,
                            self.max_rows,
                        );
                        if let Err(e) = self.sink.publish(&report) {
                            warn!("report sink failed: {}", e);
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        DriverHandle { stop_tx, join }
    }
}

/// Handle for stopping a running [`ReportDriver`].
pub struct DriverHandle {
    stop_tx: watch::Sender<bool>,
    join: tokio::task::JoinHandle<()>,
}

impl DriverHandle {
    /// Signal the report loop to stop without waiting for it.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Sink that collects published reports for inspection.
    struct CapturingSink(Arc<Mutex<Vec<Report>>>);

    impl ReportSink for CapturingSink {
        fn publish(&mut self, report: &Report) -> Result<()> {
            self.0.lock().push(report.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn driver_publishes_reports_periodically() {
        let recorder = Arc::new(TrafficRecorder::new(1, 900));
        recorder.on_event("ns/dev", 10, now_epoch());

        let captured = Arc::new(Mutex::new(Vec::new()));
        let driver = ReportDriver::new(
            recorder.clone(),
            Box::new(CapturingSink(captured.clone())),
            Duration::from_millis(10),
            vec![60],
            0,
        );
        let handle = driver.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        let reports = captured.lock();
        assert!(reports.len() >= 2, "only {} reports", reports.len());
        assert_eq!(reports[0].total_messages, 1);
        assert_eq!(reports[0].window_rates.len(), 1);
    }

    #[tokio::test]
    async fn reports_reflect_events_recorded_between_cycles() {
        let recorder = Arc::new(TrafficRecorder::new(1, 900));

        let captured = Arc::new(Mutex::new(Vec::new()));
        let driver = ReportDriver::new(
            recorder.clone(),
            Box::new(CapturingSink(captured.clone())),
            Duration::from_millis(10),
            vec![60],
            0,
        );
        let handle = driver.start();

        tokio::time::sleep(Duration::from_millis(15)).await;
        recorder.on_event("ns/dev", 1, now_epoch());
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.shutdown().await;

        let reports = captured.lock();
        let last = reports.last().unwrap();
        assert_eq!(last.total_messages, 1);
    }

    #[tokio::test]
    async fn stop_aborts_the_wait_promptly() {
        let recorder = Arc::new(TrafficRecorder::new(1, 900));
        let captured = Arc::new(Mutex::new(Vec::new()));
        let driver = ReportDriver::new(
            recorder,
            Box::new(CapturingSink(captured)),
            Duration::from_secs(3600),
            vec![60],
            0,
        );
        let handle = driver.start();

        // Shutdown must not wait out the hour-long interval.
        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("driver did not stop promptly");
    }

    #[tokio::test]
    async fn sink_errors_do_not_stop_the_loop() {
        struct FailingSink {
            calls: Arc<Mutex<usize>>,
        }
        impl ReportSink for FailingSink {
            fn publish(&mut self, _report: &Report) -> Result<()> {
                *self.calls.lock() += 1;
                anyhow::bail!("sink is broken")
            }
        }

        let calls = Arc::new(Mutex::new(0));
        let recorder = Arc::new(TrafficRecorder::new(1, 900));
        let driver = ReportDriver::new(
            recorder,
            Box::new(FailingSink { calls: calls.clone() }),
            Duration::from_millis(10),
            vec![60],
            0,
        );
        let handle = driver.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        assert!(*calls.lock() >= 2);
    }
}
