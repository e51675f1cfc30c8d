//! Output views observing the sink

use crate::entry::LogEntry;
use std::cell::{Cell, RefCell};

/// An observer that presents sink entries
pub trait OutputView {
    /// A new entry was appended at `index`
    fn entry_appended(&self, entry: &LogEntry, index: usize);

    /// All entries were discarded
    fn cleared(&self);

    /// Bring the entry at `index` into view
    fn scroll_to(&self, index: usize);
}

/// View that keeps rendered lines in memory
///
/// Tracks the scroll position so hosts and tests can check auto-scrolling.
#[derive(Debug, Default)]
pub struct MemoryView {
    lines: RefCell<Vec<String>>,
    scroll: Cell<Option<usize>>,
    clears: Cell<usize>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Index of the entry currently scrolled into view
    pub fn scroll_position(&self) -> Option<usize> {
        self.scroll.get()
    }

    /// How many times the view was cleared
    pub fn clear_count(&self) -> usize {
        self.clears.get()
    }
}

impl OutputView for MemoryView {
    fn entry_appended(&self, entry: &LogEntry, _index: usize) {
        self.lines
            .borrow_mut()
            .push(format!("{} {}", entry.level(), entry.rendered_text()));
    }

    fn cleared(&self) {
        self.lines.borrow_mut().clear();
        self.scroll.set(None);
        self.clears.set(self.clears.get() + 1);
    }

    fn scroll_to(&self, index: usize) {
        self.scroll.set(Some(index));
    }
}
