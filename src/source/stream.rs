//! Stream-based event source.
//!
//! Receives bus events from an async byte stream carrying newline-delimited
//! JSON, one [`BusEvent`] per line. Used for live TCP feeds
//! (`--connect host:port`) but works with any `AsyncRead`.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use super::EventSource;
use crate::event::BusEvent;

/// An event source that reads NDJSON events from an async stream.
///
/// A background task parses lines as they arrive and forwards events over
/// an mpsc channel; `poll` drains that channel without blocking. A bad line
/// is recorded as the source's error and skipped; the stream keeps going.
#[derive(Debug)]
pub struct StreamSource {
    receiver: mpsc::Receiver<BusEvent>,
    description: String,
    last_error: Arc<Mutex<Option<String>>>,
    disconnected: bool,
}

impl StreamSource {
    /// Spawn a background reader task over the given async stream.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1024);
        let last_error = Arc::new(Mutex::new(None));
        let error_handle = last_error.clone();

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        set_error(&error_handle, Some("connection closed".to_string()));
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<BusEvent>(trimmed) {
                            Ok(event) => {
                                // A good line means the stream is healthy
                                // again; stop reporting the stale error.
                                set_error(&error_handle, None);
                                if tx.send(event).await.is_err() {
                                    // Receiver dropped, monitor is gone.
                                    break;
                                }
                            }
                            Err(e) => {
                                set_error(&error_handle, Some(format!("parse error: {}", e)));
                            }
                        }
                    }
                    Err(e) => {
                        set_error(&error_handle, Some(format!("read error: {}", e)));
                        break;
                    }
                }
            }
        });

        Self {
            receiver: rx,
            description: format!("stream: {}", description),
            last_error,
            disconnected: false,
        }
    }
}

fn set_error(slot: &Arc<Mutex<Option<String>>>, value: Option<String>) {
    if let Ok(mut guard) = slot.lock() {
        *guard = value;
    }
}

impl EventSource for StreamSource {
    fn poll(&mut self) -> Option<BusEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.disconnected = true;
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        if let Ok(guard) = self.last_error.lock() {
            if guard.is_some() {
                return guard.clone();
            }
        }
        self.disconnected.then(|| "stream disconnected".to_string())
    }
}
