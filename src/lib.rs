// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # topic-traffic
//!
//! A live traffic dashboard for publish/subscribe message bus topics.
//!
//! The monitor ingests a stream of `(topic, payload size, timestamp)` events,
//! keeps cumulative per-device counters plus a time-windowed rate aggregator,
//! and periodically redraws a textual dashboard of throughput and per-device
//! activity.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  source          ingest loop              stats                  │
//! │  ┌────────┐     ┌────────────┐     ┌────────────────────┐        │
//! │  │ File   │────▶│ filter +   │────▶│ TrafficRecorder    │        │
//! │  │ Stream │     │ stamp      │     │  SnapshotTable     │        │
//! │  │ Channel│     └────────────┘     │  SlidingWindow     │        │
//! │  └────────┘                        └─────────┬──────────┘        │
//! │                                              │ Arc               │
//! │                  ┌────────────┐     ┌────────▼──────────┐        │
//! │                  │ render     │◀────│ ReportDriver      │        │
//! │                  │ (terminal) │     │ (periodic cycle)  │        │
//! │                  └────────────┘     └───────────────────┘        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: transport abstraction ([`EventSource`]) with NDJSON
//!   file, TCP stream, and in-process channel implementations
//! - **[`topic`]**: display-key extraction and ignore rules
//! - **[`stats`]**: the concurrent core - per-device counters and the
//!   coalescing per-second bucket log answering multi-window rate queries
//! - **[`report`]**: the periodic report cycle and its sink trait
//! - **[`render`]**: human units and the full-screen dashboard text
//! - **[`config`]**: layered configuration (defaults, TOML file,
//!   environment, CLI)
//!
//! ## Library use
//!
//! ```
//! use topic_traffic::{ChannelSource, TrafficRecorder};
//!
//! // Shared recorder: ingest on one side, reports on the other.
//! let recorder = TrafficRecorder::with_start_time(1, 900, 100.0);
//! recorder.on_event("zigbee2mqtt/kitchen_lamp/state", 42, 100.0);
//!
//! let report = recorder.build_report(101.0, &[60], 10);
//! assert_eq!(report.total_messages, 1);
//! assert_eq!(report.rows[0].key, "kitchen_lamp");
//!
//! // Feed events from your own bus client through a channel.
//! let (tx, source) = ChannelSource::create("mqtt://broker");
//! ```

pub mod config;
pub mod event;
pub mod render;
pub mod report;
pub mod source;
pub mod stats;
pub mod topic;

// Re-export main types for convenience
pub use config::MonitorConfig;
pub use event::BusEvent;
pub use render::TerminalSink;
pub use report::{DriverHandle, ReportDriver, ReportSink};
pub use source::{ChannelSource, EventSource, FileSource, StreamSource};
pub use stats::{
    RateSample, Report, SlidingWindow, SnapshotTable, TopicRow, TrafficRecorder,
};
pub use topic::{display_key, TopicFilter};
