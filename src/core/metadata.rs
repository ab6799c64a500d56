use chrono::{DateTime, Local};
use std::fmt;

/// Token mpv prints whenever the stream's ICY metadata changes.
pub const MARKER: &str = "icy-title:";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Returns the trimmed text after the first marker, or `None` for lines
/// that carry no title. An empty payload yields `Some("")`.
pub fn extract_title(line: &str) -> Option<&str> {
    line.find(MARKER)
        .map(|idx| line[idx + MARKER.len()..].trim())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub title: String,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Local>, title: impl Into<String>) -> Self {
        Self {
            timestamp,
            title: title.into(),
        }
    }

    pub fn now(title: impl Into<String>) -> Self {
        Self::new(Local::now(), title)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format(TIMESTAMP_FORMAT), self.title)
    }
}
