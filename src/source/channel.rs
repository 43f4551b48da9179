//! Channel-based event source.
//!
//! Receives bus events via a tokio mpsc channel. This is the integration
//! point for embedding the monitor in another process: the host pushes one
//! event per observed message and the monitor consumes them like any other
//! source.

use tokio::sync::mpsc;

use super::EventSource;
use crate::event::BusEvent;

/// Capacity of the event channel; the bus side blocks (or drops) only when
/// the monitor falls this far behind.
const CHANNEL_CAPACITY: usize = 1024;

/// An event source fed through an in-process channel.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<BusEvent>,
    description: String,
    closed: bool,
}

impl ChannelSource {
    /// Create a sender/source pair.
    ///
    /// The sender goes to the bus integration; the source goes to the
    /// ingest loop.
    pub fn create(source_description: &str) -> (mpsc::Sender<BusEvent>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let source = Self {
            receiver: rx,
            description: format!("channel: {}", source_description),
            closed: false,
        };
        (tx, source)
    }
}

impl EventSource for ChannelSource {
    fn poll(&mut self) -> Option<BusEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.closed.then(|| "event channel closed".to_string())
    }
}
