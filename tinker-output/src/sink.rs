//! The output sink

use crate::clock::{Clock, SystemClock};
use crate::entry::LogEntry;
use crate::level::OutputLevel;
use crate::render::{render_value, render_values, OutputValue};
use crate::view::OutputView;
use std::cell::RefCell;
use std::rc::Rc;
use tinker_config::OutputOptions;
use tracing::trace;

/// Ordered, append-only entry sequence
///
/// The host is single threaded, so interior mutability is plain `RefCell`.
/// The sink never fails: appending formats values in place and cannot error.
pub struct OutputSink {
    entries: RefCell<Vec<LogEntry>>,
    views: RefCell<Vec<Rc<dyn OutputView>>>,
    clock: Box<dyn Clock>,
    timestamp_format: String,
    result_prefix: String,
}

impl OutputSink {
    /// Create a sink timestamping with the local wall clock
    pub fn new(options: &OutputOptions) -> Rc<Self> {
        Self::with_clock(options, SystemClock)
    }

    /// Create a sink with an explicit clock
    pub fn with_clock<C: Clock + 'static>(options: &OutputOptions, clock: C) -> Rc<Self> {
        Rc::new(OutputSink {
            entries: RefCell::new(Vec::new()),
            views: RefCell::new(Vec::new()),
            clock: Box::new(clock),
            timestamp_format: options.timestamp_format.clone(),
            result_prefix: options.result_prefix.clone(),
        })
    }

    /// Attach a view; it only sees entries appended from now on
    pub fn attach_view(&self, view: Rc<dyn OutputView>) {
        self.views.borrow_mut().push(view);
    }

    /// Append one entry rendering `values` independently, space-joined
    pub fn append<V: OutputValue>(&self, level: OutputLevel, values: &[V]) {
        self.push(level, render_values(values));
    }

    /// Append a host message
    pub fn append_text(&self, level: OutputLevel, text: &str) {
        self.push(level, text.to_string());
    }

    /// Append the completion value of a run
    pub fn append_result<V: OutputValue + ?Sized>(&self, value: &V) {
        let rendered = format!("{}{}", self.result_prefix, render_value(value));
        self.push(OutputLevel::Result, rendered);
    }

    fn push(&self, level: OutputLevel, rendered_text: String) {
        // timestamp is taken now, not at run start
        let entry = LogEntry::new(level, self.clock.now(), rendered_text);
        let index = {
            let mut entries = self.entries.borrow_mut();
            entries.push(entry.clone());
            entries.len() - 1
        };
        trace!(target: "tinker::output", %level, index, "appended entry");

        let views = self.views.borrow().clone();
        for view in views {
            view.entry_appended(&entry, index);
            view.scroll_to(index);
        }
    }

    /// Discard every entry at once
    pub fn clear(&self) {
        let discarded = std::mem::take(&mut *self.entries.borrow_mut());
        trace!(target: "tinker::output", discarded = discarded.len(), "cleared output");

        let views = self.views.borrow().clone();
        for view in views {
            view.cleared();
        }
    }

    /// Snapshot of all entries in append order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    /// Rendered text of all entries, without timestamps
    pub fn rendered_lines(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|e| e.rendered_text().to_string())
            .collect()
    }

    /// Entries of one level
    pub fn entries_at(&self, level: OutputLevel) -> Vec<LogEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.level() == level)
            .cloned()
            .collect()
    }

    /// Full dump with timestamps, one entry per line
    pub fn dump(&self) -> String {
        self.entries
            .borrow()
            .iter()
            .map(|e| e.format(&self.timestamp_format))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("entries", &self.len())
            .field("views", &self.views.borrow().len())
            .field("timestamp_format", &self.timestamp_format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::view::MemoryView;

    fn manual_sink() -> (Rc<OutputSink>, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::midnight());
        let sink = OutputSink::with_clock(&OutputOptions::default(), clock.clone());
        (sink, clock)
    }

    #[test]
    fn test_append_and_entries() {
        let (sink, _) = manual_sink();
        assert!(sink.is_empty());

        sink.append(OutputLevel::Log, &["a", "b"]);
        sink.append_text(OutputLevel::Warn, "careful");

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rendered_text(), "a b");
        assert_eq!(entries[1].level(), OutputLevel::Warn);
    }

    #[test]
    fn test_append_result_uses_prefix() {
        let (sink, _) = manual_sink();
        sink.append_result("2");
        let entries = sink.entries_at(OutputLevel::Result);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rendered_text(), "→ 2");
    }

    #[test]
    fn test_timestamps_taken_at_append() {
        let (sink, clock) = manual_sink();
        sink.append_text(OutputLevel::Log, "first");
        clock.advance_ms(250);
        sink.append_text(OutputLevel::Log, "second");

        let dump = sink.dump();
        assert_eq!(dump, "[00:00:00.000] first\n[00:00:00.250] second");
    }

    #[test]
    fn test_clear_is_atomic_and_idempotent() {
        let (sink, _) = manual_sink();
        sink.append_text(OutputLevel::Log, "one");
        sink.append_text(OutputLevel::Log, "two");

        sink.clear();
        assert!(sink.is_empty());
        let once = sink.entries();

        sink.clear();
        assert_eq!(sink.entries(), once);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let (a, _) = manual_sink();
        let (b, _) = manual_sink();
        for sink in [&a, &b] {
            sink.append(OutputLevel::Log, &["x", "y"]);
            sink.append_text(OutputLevel::Error, "boom");
        }
        assert_eq!(a.rendered_lines(), b.rendered_lines());
    }

    #[test]
    fn test_views_auto_scroll_to_newest() {
        let (sink, _) = manual_sink();
        let view = Rc::new(MemoryView::new());
        sink.attach_view(view.clone());

        sink.append_text(OutputLevel::Log, "a");
        assert_eq!(view.scroll_position(), Some(0));
        sink.append_text(OutputLevel::Info, "b");
        assert_eq!(view.scroll_position(), Some(1));
        assert_eq!(view.lines(), vec!["log a".to_string(), "info b".to_string()]);

        sink.clear();
        assert!(view.lines().is_empty());
        assert_eq!(view.scroll_position(), None);
        assert_eq!(view.clear_count(), 1);
    }

    #[test]
    fn test_no_eviction() {
        let (sink, _) = manual_sink();
        for i in 0..5000 {
            sink.append_text(OutputLevel::Log, &i.to_string());
        }
        assert_eq!(sink.len(), 5000);
        assert_eq!(sink.entries()[0].rendered_text(), "0");
    }
}
