//! Output entry definition

use crate::level::OutputLevel;
use chrono::NaiveTime;

/// One rendered output line
///
/// Immutable once created: the sink hands out clones, never mutable access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    level: OutputLevel,
    timestamp: NaiveTime,
    rendered_text: String,
}

impl LogEntry {
    pub(crate) fn new(level: OutputLevel, timestamp: NaiveTime, rendered_text: String) -> Self {
        Self {
            level,
            timestamp,
            rendered_text,
        }
    }

    pub fn level(&self) -> OutputLevel {
        self.level
    }

    /// Time of day at which the entry was appended
    pub fn timestamp(&self) -> NaiveTime {
        self.timestamp
    }

    pub fn rendered_text(&self) -> &str {
        &self.rendered_text
    }

    /// Timestamp rendered with a chrono format string
    pub fn timestamp_text(&self, format: &str) -> String {
        self.timestamp.format(format).to_string()
    }

    /// Full display line: `[timestamp] text`
    pub fn format(&self, timestamp_format: &str) -> String {
        format!(
            "[{}] {}",
            self.timestamp_text(timestamp_format),
            self.rendered_text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_format() {
        let ts = NaiveTime::from_hms_milli_opt(9, 5, 3, 7).unwrap();
        let entry = LogEntry::new(OutputLevel::Log, ts, "hello".to_string());
        assert_eq!(entry.timestamp_text("%H:%M:%S%.3f"), "09:05:03.007");
        assert_eq!(entry.format("%H:%M:%S%.3f"), "[09:05:03.007] hello");
    }

    #[test]
    fn test_entry_twenty_four_hour_clock() {
        let ts = NaiveTime::from_hms_milli_opt(21, 0, 0, 0).unwrap();
        let entry = LogEntry::new(OutputLevel::Info, ts, String::new());
        assert_eq!(entry.timestamp_text("%H:%M:%S%.3f"), "21:00:00.000");
    }
}
