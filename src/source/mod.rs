//! Event source abstraction.
//!
//! The monitor is bus-agnostic: anything that can produce [`BusEvent`]s can
//! feed it. Implementations cover an NDJSON event log on disk
//! ([`FileSource`]), a live TCP stream ([`StreamSource`]), and an in-process
//! channel for embedding ([`ChannelSource`]).

mod channel;
mod file;
mod stream;

pub use channel::ChannelSource;
pub use file::FileSource;
pub use stream::StreamSource;

use std::fmt::Debug;

use crate::event::BusEvent;

/// Trait for receiving bus events from a transport.
///
/// `poll` must be non-blocking: it returns the next pending event or `None`
/// when nothing is queued. The ingest loop drains a source and sleeps
/// briefly when it runs dry.
pub trait EventSource: Send + Debug {
    /// Take the next pending event, if any.
    fn poll(&mut self) -> Option<BusEvent>;

    /// Human-readable description of the source, for logs.
    fn description(&self) -> &str;

    /// The most recent error encountered by the source, if any.
    ///
    /// A source with an error may still deliver further events (e.g. one
    /// malformed line in an otherwise healthy stream).
    fn error(&self) -> Option<String>;
}
