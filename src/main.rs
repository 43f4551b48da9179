// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod event;
mod render;
mod report;
mod source;
mod stats;
mod topic;

use config::{parse_windows, MonitorConfig};
use render::TerminalSink;
use report::ReportDriver;
use source::{EventSource, FileSource, StreamSource};
use stats::{now_epoch, TrafficRecorder};
use topic::TopicFilter;

#[derive(Parser, Debug)]
#[command(name = "topic-traffic")]
#[command(about = "Live traffic dashboard for pub/sub message bus topics")]
struct Args {
    /// Follow an NDJSON event log
    #[arg(short, long, conflicts_with = "connect")]
    file: Option<PathBuf>,

    /// Connect to a live NDJSON event feed (host:port)
    #[arg(short, long)]
    connect: Option<String>,

    /// Path to a TOML config file (flags below override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base bus topic namespace (default: zigbee2mqtt)
    #[arg(long)]
    base_topic: Option<String>,

    /// Ignore <base-topic>/bridge traffic
    #[arg(long)]
    ignore_bridge: bool,

    /// Reporting interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Topic depth to show (default: 1)
    #[arg(short, long)]
    detail: Option<usize>,

    /// Aggregator retention window in seconds
    #[arg(long)]
    retention: Option<u64>,

    /// Rate windows in seconds, comma-separated (default: 60,300,900)
    #[arg(long)]
    windows: Option<String>,

    /// Cap on per-device table rows (0 fits the terminal)
    #[arg(long)]
    max_rows: Option<usize>,

    /// Replay the event log, write one report as JSON, and exit
    #[arg(short, long, requires = "file", conflicts_with = "connect")]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&args)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args, config))
}

/// Merge the layered config with explicit CLI flags.
fn build_config(args: &Args) -> Result<MonitorConfig> {
    let mut config = MonitorConfig::load(args.config.as_deref())?;

    if let Some(ref base_topic) = args.base_topic {
        config.base_topic = base_topic.clone();
    }
    if let Some(interval) = args.interval {
        config.report_interval_secs = interval;
    }
    if let Some(detail) = args.detail {
        config.detail_depth = detail;
    }
    if let Some(retention) = args.retention {
        config.retention_secs = retention;
    }
    if let Some(ref windows) = args.windows {
        config.windows = parse_windows(windows)?;
    }
    if let Some(max_rows) = args.max_rows {
        config.max_rows = max_rows;
    }
    if args.ignore_bridge {
        config.ignore_prefixes.push(format!("{}/bridge", config.base_topic));
    }

    Ok(config.normalize())
}

async fn run(args: Args, config: MonitorConfig) -> Result<()> {
    let source: Box<dyn EventSource> = if let Some(ref addr) = args.connect {
        info!("Connecting to {}...", addr);
        let stream = tokio::net::TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {}", addr))?;
        info!("Connected");
        Box::new(StreamSource::spawn(stream, addr))
    } else if let Some(ref path) = args.file {
        Box::new(FileSource::new(path))
    } else {
        bail!("either --file or --connect is required");
    };

    let recorder = Arc::new(TrafficRecorder::new(
        config.detail_depth,
        config.retention_secs,
    ));
    let filter = TopicFilter::new(config.ignore_prefixes.clone());

    // One-shot export mode: replay the log, dump the report, done.
    if let Some(ref export_path) = args.export {
        return export_report(source, &recorder, &filter, &config, export_path);
    }

    info!(
        "Monitoring {} via {} (interval {}s, windows {:?})",
        config.base_topic,
        source.description(),
        config.report_interval_secs,
        config.windows
    );

    let driver = ReportDriver::new(
        recorder.clone(),
        Box::new(TerminalSink::new()),
        config.report_interval(),
        config.windows.clone(),
        config.max_rows,
    );
    let driver_handle = driver.start();

    // Ctrl-C flips the shutdown flag; both loops watch it.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    ingest_loop(source, recorder, filter, shutdown_rx).await;

    info!("Stopping monitor...");
    driver_handle.shutdown().await;
    Ok(())
}

/// Drain the source into the recorder until shutdown.
///
/// This is the single ingest path: events are filtered, stamped with the
/// arrival time when the transport did not supply one, and recorded.
async fn ingest_loop(
    mut source: Box<dyn EventSource>,
    recorder: Arc<TrafficRecorder>,
    filter: TopicFilter,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut reported_error: Option<String> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let mut drained_any = false;
        while let Some(event) = source.poll() {
            drained_any = true;
            if filter.ignores(&event.topic) {
                continue;
            }
            let timestamp = event.timestamp.unwrap_or_else(now_epoch);
            recorder.on_event(&event.topic, event.size, timestamp);
        }

        // Log source errors once per distinct message, not per poll.
        let error = source.error();
        if error != reported_error {
            if let Some(ref msg) = error {
                warn!("{}: {}", source.description(), msg);
            }
            reported_error = error;
        }

        if !drained_any {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(20)) => {}
                _ = shutdown.changed() => {}
            }
        }
    }
}

/// Replay an event log through the recorder and write the final report as
/// pretty JSON.
fn export_report(
    mut source: Box<dyn EventSource>,
    recorder: &TrafficRecorder,
    filter: &TopicFilter,
    config: &MonitorConfig,
    export_path: &std::path::Path,
) -> Result<()> {
    let mut last_timestamp = None;
    while let Some(event) = source.poll() {
        if filter.ignores(&event.topic) {
            continue;
        }
        let timestamp = event.timestamp.unwrap_or_else(now_epoch);
        last_timestamp = Some(timestamp);
        recorder.on_event(&event.topic, event.size, timestamp);
    }
    if let Some(err) = source.error() {
        warn!("{}: {}", source.description(), err);
    }

    // Report as of the last replayed event so window rates are meaningful.
    let now = last_timestamp.unwrap_or_else(now_epoch);
    let report = recorder.build_report(now, &config.windows, config.max_rows);

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(export_path, json)
        .with_context(|| format!("failed to write {}", export_path.display()))?;

    println!("Exported traffic report to: {}", export_path.display());
    Ok(())
}
