//! Scenario helpers: a session over an in-memory store and a fixed clock

#![allow(dead_code)]

use std::rc::Rc;
use tinker_workspace::api::{BufferEditor, EditorSurface, RunOutcome};
use tinker_workspace::output::OutputLevel;
use tinker_workspace::store::MemoryStore;
use tinker_workspace::{Dialect, RunConfig, SessionContext};

pub struct Playground {
    pub context: SessionContext,
    pub editor: Rc<BufferEditor>,
    pub store: MemoryStore,
}

impl Playground {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let editor = BufferEditor::new();
        let context = SessionContext::boot(&RunConfig::default(), editor.clone(), Box::new(store.clone()))
            .expect("session boots");
        Self { context, editor, store }
    }

    /// Put `source` in the buffer under `dialect` and run it to idle
    pub fn run(&mut self, source: &str, dialect: Dialect) -> RunOutcome {
        self.context.switch_dialect(dialect);
        self.editor.set_value(source);
        let outcome = self.context.run();
        self.context.run_until_idle();
        outcome
    }

    pub fn entries(&self) -> Vec<(OutputLevel, String)> {
        self.context
            .sink()
            .entries()
            .iter()
            .map(|e| (e.level(), e.rendered_text().to_string()))
            .collect()
    }
}
