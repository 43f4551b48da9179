//! Monitor configuration.
//!
//! Settings come from three layers: built-in defaults, an optional TOML
//! file plus `TOPIC_TRAFFIC_*` environment variables, and finally explicit
//! CLI flags applied in main. [`MonitorConfig::normalize`] runs last and
//! enforces the cross-field rules (rate windows must fit inside the
//! retention window).

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::warn;

use crate::stats::DEFAULT_RETENTION_SECS;

/// All knobs the monitor consumes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Bus namespace being monitored; the first topic segment dropped by
    /// the key extractor.
    pub base_topic: String,
    /// Topic prefixes whose events are dropped before recording.
    pub ignore_prefixes: Vec<String>,
    /// Topic depth shown in the per-device table.
    pub detail_depth: usize,
    /// Seconds between dashboard redraws.
    pub report_interval_secs: u64,
    /// Seconds of bucket history the aggregator retains.
    pub retention_secs: u64,
    /// Trailing windows (seconds) to report rates over.
    pub windows: Vec<u64>,
    /// Cap on per-device table rows; 0 fits the terminal height.
    pub max_rows: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_topic: "zigbee2mqtt".to_string(),
            ignore_prefixes: Vec::new(),
            detail_depth: 1,
            report_interval_secs: 5,
            retention_secs: DEFAULT_RETENTION_SECS,
            windows: vec![60, 300, 900],
            max_rows: 0,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from an optional TOML file layered with
    /// `TOPIC_TRAFFIC_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix("TOPIC_TRAFFIC"));

        let config = builder.build().context("failed to load configuration")?;
        config
            .try_deserialize()
            .context("invalid configuration values")
    }

    /// The reporting period as a [`Duration`].
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs.max(1))
    }

    /// Enforce cross-field rules, logging every adjustment.
    ///
    /// Zero-width windows are dropped; windows wider than the retention
    /// window are clamped to it (a wider window would silently undercount,
    /// since buckets beyond retention are already evicted).
    pub fn normalize(mut self) -> Self {
        self.windows.retain(|&w| {
            if w == 0 {
                warn!("dropping zero-width rate window");
            }
            w > 0
        });

        self.retention_secs = self.retention_secs.max(1);
        for window in &mut self.windows {
            if *window > self.retention_secs {
                warn!(
                    "rate window {}s exceeds retention {}s, clamping",
                    window, self.retention_secs
                );
                *window = self.retention_secs;
            }
        }
        // Clamping can also introduce duplicates, so dedup regardless of
        // the order the windows were given in.
        let mut seen = Vec::with_capacity(self.windows.len());
        self.windows.retain(|&w| {
            if seen.contains(&w) {
                false
            } else {
                seen.push(w);
                true
            }
        });

        if self.windows.is_empty() {
            self.windows = vec![self.retention_secs.min(60)];
        }

        self
    }
}

/// Parse a comma-separated list of window widths, e.g. `"60,300,900"`.
pub fn parse_windows(s: &str) -> Result<Vec<u64>> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .with_context(|| format!("invalid window width: {:?}", part.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn defaults_match_the_monitored_bus() {
        let config = MonitorConfig::default();
        assert_eq!(config.base_topic, "zigbee2mqtt");
        assert_eq!(config.detail_depth, 1);
        assert_eq!(config.report_interval(), Duration::from_secs(5));
        assert_eq!(config.retention_secs, 900);
        assert_eq!(config.windows, vec![60, 300, 900]);
    }

    #[test]
    fn normalize_clamps_oversized_windows() {
        let config = MonitorConfig {
            retention_secs: 300,
            windows: vec![60, 900],
            ..Default::default()
        };
        assert_eq!(config.normalize().windows, vec![60, 300]);
    }

    #[test]
    fn normalize_drops_zero_windows() {
        let config = MonitorConfig {
            windows: vec![0, 60],
            ..Default::default()
        };
        assert_eq!(config.normalize().windows, vec![60]);
    }

    #[test]
    fn normalize_removes_duplicate_windows_regardless_of_order() {
        let config = MonitorConfig {
            windows: vec![60, 300, 60],
            ..Default::default()
        };
        assert_eq!(config.normalize().windows, vec![60, 300]);

        // Duplicates introduced by clamping collapse too.
        let config = MonitorConfig {
            retention_secs: 60,
            windows: vec![60, 300, 900],
            ..Default::default()
        };
        assert_eq!(config.normalize().windows, vec![60]);
    }

    #[test]
    fn normalize_refuses_an_empty_window_list() {
        let config = MonitorConfig {
            windows: vec![],
            ..Default::default()
        };
        assert_eq!(config.normalize().windows, vec![60]);
    }

    #[test]
    fn parse_windows_accepts_spaced_lists() {
        assert_eq!(parse_windows("60, 300,900").unwrap(), vec![60, 300, 900]);
        assert!(parse_windows("60,abc").is_err());
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = MonitorConfig::load(None).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn load_reads_partial_toml() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "base_topic = \"homebus\"").unwrap();
        writeln!(file, "detail_depth = 2").unwrap();
        file.flush().unwrap();

        let config = MonitorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.base_topic, "homebus");
        assert_eq!(config.detail_depth, 2);
        // Unspecified fields keep their defaults.
        assert_eq!(config.retention_secs, 900);
    }
}
