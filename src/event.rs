//! Wire format for observed bus traffic.
//!
//! A [`BusEvent`] is the unit the transport layer delivers to the monitor:
//! one record per message seen on the bus, carrying the full topic path,
//! the payload size in bytes, and optionally the time the message was
//! observed. Sources exchange events as newline-delimited JSON, one object
//! per line.

use serde::{Deserialize, Serialize};

/// A single observed message on the bus.
///
/// The `timestamp` is epoch seconds at the point of observation. Live feeds
/// may omit it, in which case the ingest path stamps the event with the
/// local arrival time; replayed event logs carry explicit timestamps so the
/// original ordering survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    /// Full topic path as published (e.g. `zigbee2mqtt/kitchen_lamp/state`).
    pub topic: String,

    /// Payload size in bytes. A size of zero is legal (empty retained
    /// messages, tombstones).
    #[serde(default)]
    pub size: u64,

    /// Observation time in epoch seconds, if the source recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl BusEvent {
    /// Create an event without a timestamp (stamped on arrival).
    pub fn new(topic: impl Into<String>, size: u64) -> Self {
        Self {
            topic: topic.into(),
            size,
            timestamp: None,
        }
    }

    /// Create an event with an explicit observation time.
    pub fn at(topic: impl Into<String>, size: u64, timestamp: f64) -> Self {
        Self {
            topic: topic.into(),
            size,
            timestamp: Some(timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_event() {
        let json = r#"{"topic":"zigbee2mqtt/lamp","size":42,"timestamp":1700000000.5}"#;
        let event: BusEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.topic, "zigbee2mqtt/lamp");
        assert_eq!(event.size, 42);
        assert_eq!(event.timestamp, Some(1700000000.5));
    }

    #[test]
    fn timestamp_and_size_are_optional() {
        let json = r#"{"topic":"zigbee2mqtt/lamp"}"#;
        let event: BusEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.size, 0);
        assert!(event.timestamp.is_none());
    }

    #[test]
    fn serialize_omits_missing_timestamp() {
        let json = serde_json::to_string(&BusEvent::new("a/b", 1)).unwrap();
        assert!(!json.contains("timestamp"));

        let json = serde_json::to_string(&BusEvent::at("a/b", 1, 5.0)).unwrap();
        assert!(json.contains("timestamp"));
    }
}
