//! Topic path handling: display keys and ignore rules.

/// Derive the display key used to group events for per-device statistics.
///
/// The topic is split on `/` and the first segment (the bus namespace,
/// e.g. `zigbee2mqtt`) is dropped. The remaining segments are joined up to
/// `detail_depth` levels:
///
/// - depth 1: `zigbee2mqtt/bridge/state` -> `bridge`
/// - depth 2: `zigbee2mqtt/bridge/state` -> `bridge/state`
///
/// If nothing remains after the namespace segment (the topic was only the
/// namespace itself, or depth is 0), the full original topic is returned as
/// a fallback key. Any input string is valid; there are no error cases.
pub fn display_key(topic: &str, detail_depth: usize) -> String {
    let parts: Vec<&str> = topic.split('/').collect();
    let end = parts.len().min(detail_depth + 1);
    let key = if end > 1 {
        parts[1..end].join("/")
    } else {
        String::new()
    };

    if key.is_empty() {
        topic.to_string()
    } else {
        key
    }
}

/// Predicate for dropping uninteresting topics before they reach the
/// recorder.
///
/// Holds a list of topic prefixes to ignore (e.g. `zigbee2mqtt/bridge` when
/// bridge chatter should be excluded). An empty list ignores nothing.
#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    ignored: Vec<String>,
}

impl TopicFilter {
    /// Create a filter from a list of ignored topic prefixes.
    pub fn new(ignored: Vec<String>) -> Self {
        Self { ignored }
    }

    /// True if events on this topic should be dropped.
    pub fn ignores(&self, topic: &str) -> bool {
        self.ignored.iter().any(|prefix| topic.starts_with(prefix.as_str()))
    }
}
