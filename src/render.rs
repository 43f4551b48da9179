//! Dashboard rendering: human units and the full-screen textual report.
//!
//! The dashboard is a plain text table redrawn from scratch every report
//! cycle. Layout adapts to the terminal size queried through crossterm,
//! falling back to 80x24 when there is no terminal (pipes, CI).

use std::fmt::Write as _;
use std::io::{self, Write};

use anyhow::Result;
use chrono::TimeZone;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{self, Clear, ClearType},
};

use crate::report::ReportSink;
use crate::stats::Report;

/// Maximum width of the device/topic column.
const KEY_COLUMN_WIDTH: usize = 40;

/// Header lines above the per-device rows (title, totals, windows, rule,
/// column header, rule).
const HEADER_LINES: u16 = 6;

/// Format a byte count with a 1024 divisor: `" 512.00 B"`, `"   1.21 KB"`.
pub fn format_bytes(size: u64) -> String {
    let mut value = size as f64;
    for unit in ["B", "KB", "MB"] {
        if value < 1024.0 {
            return format!("{:7.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:7.2} GB", value)
}

/// Format a byte rate as both bytes (1024 divisor) and bits (1000 divisor):
/// `"   1.50 KB/s (  12.29 kbps)"`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    let mut byte_value = bytes_per_sec;
    let mut byte_unit = "B/s";
    if byte_value >= 1024.0 {
        byte_value /= 1024.0;
        byte_unit = "KB/s";
    }
    if byte_value >= 1024.0 {
        byte_value /= 1024.0;
        byte_unit = "MB/s";
    }

    let mut bit_value = bytes_per_sec * 8.0;
    let mut bit_unit = "bps";
    if bit_value >= 1000.0 {
        bit_value /= 1000.0;
        bit_unit = "kbps";
    }
    if bit_value >= 1000.0 {
        bit_value /= 1000.0;
        bit_unit = "Mbps";
    }

    format!("{:7.2} {} ({:7.2} {})", byte_value, byte_unit, bit_value, bit_unit)
}

/// Compact byte-rate form for the windows line: `"1.50 KB/s"`.
pub fn format_byte_rate(bytes_per_sec: f64) -> String {
    let mut value = bytes_per_sec;
    for unit in ["B/s", "KB/s"] {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} MB/s", value)
}

/// Build the complete dashboard text for one report.
///
/// Pure with respect to the terminal: `width`/`height` are passed in so the
/// layout is testable.
pub fn render_dashboard(report: &Report, width: u16, height: u16) -> String {
    let width = width.max(20) as usize;
    let mut out = String::new();

    let when = chrono::Local
        .timestamp_opt(report.generated_at as i64, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{:.0}", report.generated_at));

    let _ = writeln!(out, "Bus Traffic Monitor - {}", when);
    let _ = writeln!(
        out,
        "Elapsed: {:.1}s | Total Msg: {} ({:.2}/s) | Total Data: {} | Rate: {}",
        report.elapsed_secs,
        report.total_messages,
        report.lifetime_messages_per_sec(),
        format_bytes(report.total_bytes),
        format_rate(report.lifetime_bytes_per_sec()),
    );

    let windows: Vec<String> = report
        .window_rates
        .iter()
        .map(|s| {
            format!(
                "{}s: {:.2} msg/s {}",
                s.window_secs,
                s.messages_per_sec,
                format_byte_rate(s.bytes_per_sec)
            )
        })
        .collect();
    let _ = writeln!(out, "Windows: {}", windows.join(" | "));

    let _ = writeln!(out, "{}", "-".repeat(width));
    let _ = writeln!(
        out,
        "{:<width$} | {:<10} | {:<12} | {}",
        "Device/Topic",
        "Messages",
        "Data Volume",
        "Last Seen",
        width = KEY_COLUMN_WIDTH
    );
    let _ = writeln!(out, "{}", "-".repeat(width));

    if report.rows.is_empty() {
        let _ = writeln!(out, "Waiting for messages...");
        return out;
    }

    let max_rows = height.saturating_sub(HEADER_LINES + 1).max(1) as usize;
    for row in report.rows.iter().take(max_rows) {
        let key: String = row.key.chars().take(KEY_COLUMN_WIDTH).collect();
        let age = (report.generated_at - row.last_seen).max(0.0);
        let _ = writeln!(
            out,
            "{:<width$} | {:<10} | {:<12} | {:.1}s ago",
            key,
            row.count,
            format_bytes(row.bytes),
            age,
            width = KEY_COLUMN_WIDTH
        );
    }

    if report.topic_count > report.rows.len().min(max_rows) {
        let shown = report.rows.len().min(max_rows);
        let _ = writeln!(out, "... and {} more", report.topic_count - shown);
    }

    out
}

/// Report sink that clears the terminal and redraws the dashboard.
#[derive(Debug)]
pub struct TerminalSink {
    out: io::Stdout,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for TerminalSink {
    fn publish(&mut self, report: &Report) -> Result<()> {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        let text = render_dashboard(report, width, height);

        execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        write!(self.out, "{}", text)?;
        self.out.flush()?;
        Ok(())
    }
}
