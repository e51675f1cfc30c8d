//! The session context
//!
//! Created once when the host finishes loading. It owns the compiler, the
//! sandbox and its event loop, the output sink and the session store, and
//! drives the editing surface it is given. Every run goes through one state
//! machine:
//!
//! ```text
//! Idle → Compiling → CompileFailed → Idle
//!                  → Compiled → Executing → Threw → Idle
//!                                         → Completed → Idle
//! ```

use super::examples::{canned_example, is_pristine};
use super::store::SessionStore;
use crate::config::RunConfig;
use crate::editor::{Command, EditorSurface, CLEAR_CHORD, RUN_CHORD};
use crate::error::{BootError, TinkerError};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tinker_config::{Dialect, OutputOptions};
use tinker_core::runtime::Reporter;
use tinker_core::{CompileResult, CompilerAdapter, EventLoop, Sandbox};
use tinker_output::{OutputLevel, OutputSink};
use tinker_store::KeyValueStore;
use tracing::{debug, error, info, warn};

thread_local! {
    static CONTEXT_LIVE: Cell<bool> = const { Cell::new(false) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Compiling,
    CompileFailed,
    Compiled,
    Executing,
    Threw,
    Completed,
}

impl RunState {
    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Compiling)
                | (Compiling, CompileFailed)
                | (Compiling, Compiled)
                | (Compiled, Executing)
                | (Executing, Threw)
                | (Executing, Completed)
                | (CompileFailed | Threw | Completed, Idle)
        )
    }
}

/// What one run did
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: u64,
    pub dialect: Dialect,
    /// CompileFailed, Threw or Completed
    pub state: RunState,
    /// Every state visited, starting and ending with Idle
    pub trace: Vec<RunState>,
    pub error: Option<TinkerError>,
    /// A `result` entry was appended
    pub has_result: bool,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RunState::Completed
    }
}

pub struct SessionContext {
    editor: Rc<dyn EditorSurface>,
    store: Rc<SessionStore>,
    dialect: Rc<Cell<Dialect>>,
    adapter: CompilerAdapter,
    sandbox: Sandbox,
    sink: Rc<OutputSink>,
    output: OutputOptions,
    state: RunState,
    runs: u64,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("dialect", &self.dialect.get())
            .field("state", &self.state)
            .field("runs", &self.runs)
            .field("entries", &self.sink.len())
            .finish()
    }
}

impl SessionContext {
    /// Bring up the session: load the compiler, restore the saved buffer into
    /// `editor`, and bind the run and clear chords
    ///
    /// A compiler that fails to load replaces the editor with a static error.
    pub fn boot(
        config: &RunConfig,
        editor: Rc<dyn EditorSurface>,
        backend: Box<dyn KeyValueStore>,
    ) -> Result<Self, BootError> {
        if CONTEXT_LIVE.with(Cell::get) {
            return Err(BootError::ContextAlreadyLive);
        }

        let adapter = match CompilerAdapter::load(&config.compiler) {
            Ok(adapter) => adapter,
            Err(err) => {
                let err = BootError::Compiler(err);
                error!(target: "tinker::host", %err, "boot failed");
                editor.show_fatal_error(&err.to_string());
                return Err(err);
            }
        };

        let store = Rc::new(SessionStore::new(backend, &config.storage, config.default_dialect));
        let record = store.load();
        let dialect = Rc::new(Cell::new(record.dialect));
        editor.set_language(record.dialect.language_mode());
        editor.set_value(&record.source);

        {
            let store = store.clone();
            let dialect = dialect.clone();
            editor.on_change(Box::new(move |text| store.save(text, dialect.get())));
        }
        editor.add_keybinding(RUN_CHORD, Command::Run);
        editor.add_keybinding(CLEAR_CHORD, Command::ClearOutput);

        let sink = OutputSink::new(&config.output);
        let sandbox = Sandbox::new(config.limits.clone(), EventLoop::new());

        CONTEXT_LIVE.with(|live| live.set(true));
        info!(
            target: "tinker::host",
            dialect = record.dialect.as_str(),
            backend = adapter.backend_name(),
            "session context ready"
        );
        Ok(Self {
            editor,
            store,
            dialect,
            adapter,
            sandbox,
            sink,
            output: config.output.clone(),
            state: RunState::Idle,
            runs: 0,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect.get()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn sink(&self) -> &Rc<OutputSink> {
        &self.sink
    }

    pub fn editor(&self) -> &Rc<dyn EditorSurface> {
        &self.editor
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn event_loop(&self) -> &Rc<EventLoop> {
        self.sandbox.event_loop()
    }

    /// Also hand uncaught deferred errors to `reporter`
    pub fn set_reporter(&self, reporter: Reporter) {
        self.sandbox.event_loop().set_reporter(reporter);
    }

    /// Compile (if the dialect needs it) and execute the current buffer
    pub fn run(&mut self) -> RunOutcome {
        self.runs += 1;
        let run_id = self.runs;
        let dialect = self.dialect.get();
        let source = self.editor.get_value();
        let mut trace = vec![self.state];
        info!(target: "tinker::session", run_id, dialect = dialect.as_str(), "run started");

        self.advance(RunState::Compiling, &mut trace);
        if self.output.clear_before_run {
            self.sink.clear();
        }

        let text = match self.adapter.compile(&source, dialect) {
            CompileResult::Success { executable_text } => executable_text,
            CompileResult::Failure { diagnostic, .. } => {
                let err = TinkerError::Compile(diagnostic);
                self.sink.append_text(OutputLevel::Error, &err.entry_text());
                return self.finish(run_id, dialect, RunState::CompileFailed, trace, Some(err), false);
            }
        };
        self.advance(RunState::Compiled, &mut trace);

        self.advance(RunState::Executing, &mut trace);
        let result = self.sandbox.execute(&text, self.sink.clone());
        match result.error {
            Some(err) => {
                let err = TinkerError::Runtime(err);
                self.sink.append_text(OutputLevel::Error, &err.entry_text());
                self.finish(run_id, dialect, RunState::Threw, trace, Some(err), false)
            }
            None => {
                if let Some(value) = &result.value {
                    self.sink.append_result(value);
                }
                self.finish(run_id, dialect, RunState::Completed, trace, None, result.has_value)
            }
        }
    }

    fn finish(
        &mut self,
        run_id: u64,
        dialect: Dialect,
        state: RunState,
        mut trace: Vec<RunState>,
        error: Option<TinkerError>,
        has_result: bool,
    ) -> RunOutcome {
        self.advance(state, &mut trace);
        self.advance(RunState::Idle, &mut trace);
        info!(target: "tinker::session", run_id, outcome = ?state, "run finished");
        RunOutcome {
            run_id,
            dialect,
            state,
            trace,
            error,
            has_result,
        }
    }

    fn advance(&mut self, next: RunState, trace: &mut Vec<RunState>) {
        if !self.state.can_advance_to(next) {
            warn!(target: "tinker::session", from = ?self.state, to = ?next, "unexpected run state transition");
        }
        debug!(target: "tinker::session", from = ?self.state, to = ?next, "run state");
        self.state = next;
        trace.push(next);
    }

    /// Discard all output entries
    pub fn clear_output(&self) {
        self.sink.clear();
    }

    /// Switch the session dialect
    ///
    /// Reconfigures the editor, swaps in the new dialect's canned example if
    /// the buffer is pristine, clears the output with one info entry naming
    /// the dialect, and saves. Returns whether the buffer was replaced.
    /// Selecting the current dialect does nothing.
    pub fn switch_dialect(&mut self, dialect: Dialect) -> bool {
        if dialect == self.dialect.get() {
            return false;
        }
        self.dialect.set(dialect);
        self.editor.set_language(dialect.language_mode());

        let swapped = is_pristine(&self.editor.get_value());
        if swapped {
            self.editor.set_value(canned_example(dialect));
        }

        self.sink.clear();
        self.sink.append_text(
            OutputLevel::Info,
            &format!("Switched to {}", dialect.display_name()),
        );
        self.store.save(&self.editor.get_value(), dialect);
        info!(target: "tinker::session", dialect = dialect.as_str(), swapped, "dialect switched");
        swapped
    }

    /// Perform a bound command; runs return their outcome
    pub fn execute(&mut self, command: Command) -> Option<RunOutcome> {
        match command {
            Command::Run => Some(self.run()),
            Command::ClearOutput => {
                self.clear_output();
                None
            }
        }
    }

    /// Drain deferred work, waiting for pending timers
    pub fn run_until_idle(&mut self) {
        self.sandbox.run_until_idle();
    }

    /// Drain microtasks and due timers without waiting
    pub fn run_ready(&mut self) {
        self.sandbox.run_ready();
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        CONTEXT_LIVE.with(|live| live.set(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::BufferEditor;
    use crate::session::examples::{TYPED_MARKER, UNTYPED_MARKER};
    use tinker_config::CompilerOptions;
    use tinker_store::MemoryStore;

    fn boot_with(store: MemoryStore) -> (SessionContext, Rc<BufferEditor>) {
        let editor = BufferEditor::new();
        let context = SessionContext::boot(&RunConfig::default(), editor.clone(), Box::new(store)).unwrap();
        (context, editor)
    }

    #[test]
    fn test_state_transitions() {
        use RunState::*;
        assert!(Idle.can_advance_to(Compiling));
        assert!(Compiling.can_advance_to(CompileFailed));
        assert!(Executing.can_advance_to(Threw));
        assert!(Completed.can_advance_to(Idle));
        assert!(!Idle.can_advance_to(Executing));
        assert!(!Compiled.can_advance_to(Completed));
        assert!(!Threw.can_advance_to(Compiling));
    }

    #[test]
    fn test_boot_shows_default_example() {
        let (context, editor) = boot_with(MemoryStore::new());
        assert_eq!(context.dialect(), Dialect::Typed);
        assert!(editor.get_value().starts_with(TYPED_MARKER));
        assert_eq!(editor.language(), "typescript");
        assert_eq!(editor.command_for(RUN_CHORD), Some(Command::Run));
        assert_eq!(editor.command_for(CLEAR_CHORD), Some(Command::ClearOutput));
        assert_eq!(context.state(), RunState::Idle);
    }

    #[test]
    fn test_only_one_context_at_a_time() {
        let (first, _) = boot_with(MemoryStore::new());
        let err = SessionContext::boot(&RunConfig::default(), BufferEditor::new(), Box::new(MemoryStore::new()))
            .unwrap_err();
        assert_eq!(err, BootError::ContextAlreadyLive);
        drop(first);
        assert!(SessionContext::boot(&RunConfig::default(), BufferEditor::new(), Box::new(MemoryStore::new())).is_ok());
    }

    #[test]
    fn test_compiler_load_failure_replaces_editor() {
        let config = RunConfig {
            compiler: CompilerOptions {
                no_emit: true,
                ..CompilerOptions::default()
            },
            ..RunConfig::default()
        };
        let editor = BufferEditor::new();
        let err = SessionContext::boot(&config, editor.clone(), Box::new(MemoryStore::new())).unwrap_err();
        assert!(matches!(err, BootError::Compiler(_)));
        assert_eq!(editor.fatal_error(), Some(err.to_string()));
        // a failed boot leaves no live context behind
        assert!(SessionContext::boot(&RunConfig::default(), editor, Box::new(MemoryStore::new())).is_ok());
    }

    #[test]
    fn test_completed_run_trace() {
        let (mut context, editor) = boot_with(MemoryStore::new());
        editor.type_text("const n: number = 2;\nn * 21");
        let outcome = context.run();
        assert!(outcome.is_success());
        assert!(outcome.has_result);
        assert_eq!(
            outcome.trace,
            vec![
                RunState::Idle,
                RunState::Compiling,
                RunState::Compiled,
                RunState::Executing,
                RunState::Completed,
                RunState::Idle,
            ]
        );
        assert_eq!(context.sink().rendered_lines(), vec!["→ 42"]);
    }

    #[test]
    fn test_compile_failure_skips_execution() {
        let (mut context, editor) = boot_with(MemoryStore::new());
        editor.type_text("console.log('never');\nconst x: number = 'bad';");
        let outcome = context.run();
        assert_eq!(outcome.state, RunState::CompileFailed);
        assert_eq!(
            outcome.trace,
            vec![RunState::Idle, RunState::Compiling, RunState::CompileFailed, RunState::Idle]
        );
        let entries = context.sink().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level(), OutputLevel::Error);
        assert!(entries[0].rendered_text().starts_with("Compilation error: error TS2322"));
    }

    #[test]
    fn test_throwing_run_reports_runtime_error() {
        let (mut context, editor) = boot_with(MemoryStore::new());
        context.switch_dialect(Dialect::Untyped);
        editor.type_text("console.log('before'); null.x");
        let outcome = context.run();
        assert_eq!(outcome.state, RunState::Threw);
        assert!(!outcome.has_result);
        assert_eq!(
            context.sink().rendered_lines(),
            vec!["before", "Runtime error: Cannot read properties of null (reading 'x')"]
        );
    }

    #[test]
    fn test_run_clears_previous_output() {
        let (mut context, editor) = boot_with(MemoryStore::new());
        context.switch_dialect(Dialect::Untyped);
        editor.type_text("console.log('once')");
        context.run();
        context.run();
        assert_eq!(context.sink().rendered_lines(), vec!["once"]);
        assert_eq!(context.execute(Command::ClearOutput), None);
        assert!(context.sink().is_empty());
    }

    #[test]
    fn test_switch_on_pristine_buffer_swaps_example() {
        let store = MemoryStore::new();
        let (mut context, editor) = boot_with(store.clone());
        assert!(context.switch_dialect(Dialect::Untyped));
        assert!(editor.get_value().starts_with(UNTYPED_MARKER));
        assert_eq!(editor.language(), "javascript");
        assert_eq!(context.sink().rendered_lines(), vec!["Switched to JavaScript"]);
        assert_eq!(context.sink().entries()[0].level(), OutputLevel::Info);
        let saved = context.store().load();
        assert_eq!(saved.dialect, Dialect::Untyped);
        assert_eq!(saved.source, editor.get_value());
    }

    #[test]
    fn test_switch_on_edited_buffer_keeps_text() {
        let (mut context, editor) = boot_with(MemoryStore::new());
        editor.type_text("let kept = 1;");
        context.sink().append_text(OutputLevel::Log, "old");
        assert!(!context.switch_dialect(Dialect::Untyped));
        assert_eq!(editor.get_value(), "let kept = 1;");
        assert_eq!(context.sink().rendered_lines(), vec!["Switched to JavaScript"]);
        assert!(!context.switch_dialect(Dialect::Untyped));
        assert_eq!(context.sink().len(), 1);
    }

    #[test]
    fn test_edits_are_saved_and_restored() {
        let store = MemoryStore::new();
        {
            let (mut context, editor) = boot_with(store.clone());
            context.switch_dialect(Dialect::Untyped);
            editor.type_text("console.log('persisted')");
        }
        let (context, editor) = boot_with(store);
        assert_eq!(context.dialect(), Dialect::Untyped);
        assert_eq!(editor.get_value(), "console.log('persisted')");
        assert_eq!(editor.language(), "javascript");
    }
}
