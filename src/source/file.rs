//! File-based event source.
//!
//! Follows an NDJSON event log on disk, returning lines appended since the
//! previous poll (tail semantics). Useful for replaying captures and for
//! feeding the monitor from a process that only knows how to write a log.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::EventSource;
use crate::event::BusEvent;

/// An event source that tails an NDJSON event log.
///
/// Tracks a byte offset into the file; each poll reads any newly appended
/// complete lines. A partial trailing line (a write in progress) is left
/// for the next poll. If the file shrinks (truncation/rotation) reading
/// restarts from the top.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    offset: u64,
    pending: VecDeque<BusEvent>,
    last_error: Option<String>,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            offset: 0,
            pending: VecDeque::new(),
            last_error: None,
        }
    }

    /// The log file being followed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read newly appended complete lines into the pending queue.
    fn refill(&mut self) {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                self.last_error = Some(format!("read error: {}", e));
                return;
            }
        };

        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        if len < self.offset {
            // File was truncated or rotated; start over.
            self.offset = 0;
        }

        let mut reader = BufReader::new(file);
        if reader.seek(SeekFrom::Start(self.offset)).is_err() {
            return;
        }

        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => {
                    if !line.ends_with('\n') {
                        // Incomplete trailing line; retry next poll.
                        break;
                    }
                    self.offset += n as u64;
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<BusEvent>(trimmed) {
                        Ok(event) => {
                            self.last_error = None;
                            self.pending.push_back(event);
                        }
                        Err(e) => {
                            self.last_error = Some(format!("parse error: {}", e));
                        }
                    }
                }
                Err(e) => {
                    self.last_error = Some(format!("read error: {}", e));
                    break;
                }
            }
        }
    }
}

impl EventSource for FileSource {
    fn poll(&mut self) -> Option<BusEvent> {
        if self.pending.is_empty() {
            self.refill();
        }
        self.pending.pop_front()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
