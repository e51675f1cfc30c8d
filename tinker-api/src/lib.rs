//! Tinker API - run orchestration layer
//!
//! Provides:
//! - the session context with its run state machine and dialect switching
//! - session persistence on top of a key-value store
//! - configuration (`RunConfig`) and the unified error type (`TinkerError`)
//!
//! Interactive hosts use [`SessionContext`]. For one-off library use, prefer
//! the explicit `run(source, dialect, &config, sink)` API.

use std::rc::Rc;
use tinker_core::{CompileResult, CompilerAdapter, EventLoop, ExecutionResult, Sandbox};
use tinker_output::OutputSink;
use tracing::info;

pub mod config;
pub mod editor;
pub mod error;
pub mod session;

pub use config::{config as get_config, init as init_config, is_initialized, RunConfig};
pub use editor::{BufferEditor, ChangeListener, Command, EditorSurface, CLEAR_CHORD, RUN_CHORD};
pub use error::{BootError, ErrorReport, TinkerError, COMPILATION_ERROR_PREFIX, RUNTIME_ERROR_PREFIX};
pub use session::{
    canned_example, is_pristine, RunOutcome, RunState, SessionContext, SessionRecord, SessionStore,
};

pub use tinker_config;
pub use tinker_config::{Dialect, Phase, TinkerConfig};
pub use tinker_core::runtime::{Reporter, UncaughtError, UncaughtKind};
pub use tinker_core::Value;

/// Compile for `dialect` and return the executable text
pub fn compile_with_config(source: &str, dialect: Dialect, config: &RunConfig) -> Result<String, TinkerError> {
    let adapter = CompilerAdapter::load(&config.compiler)?;
    match adapter.compile(source, dialect) {
        CompileResult::Success { executable_text } => Ok(executable_text),
        CompileResult::Failure { diagnostic, .. } => Err(TinkerError::Compile(diagnostic)),
    }
}

/// Compile and execute once with `sink` as the console, then drain deferred
/// work
///
/// Deferred failures go to the event loop's reporter, not into the result.
pub fn run(
    source: &str,
    dialect: Dialect,
    config: &RunConfig,
    sink: Rc<OutputSink>,
) -> Result<ExecutionResult, TinkerError> {
    info!(target: "tinker::host", dialect = dialect.as_str(), "one-shot run");
    let text = compile_with_config(source, dialect, config)?;
    let mut sandbox = Sandbox::new(config.limits.clone(), EventLoop::new());
    let mut result = sandbox.execute(&text, sink);
    sandbox.run_until_idle();
    match result.error.take() {
        Some(err) => Err(TinkerError::Runtime(err)),
        None => Ok(result),
    }
}

/// Compile with the global configuration
pub fn compile(source: &str, dialect: Dialect) -> Result<String, TinkerError> {
    compile_with_config(source, dialect, get_config())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinker_config::OutputOptions;

    #[test]
    fn test_compile_strips_types() {
        assert_eq!(compile("let n: number = 1;", Dialect::Typed).unwrap(), "let n = 1;");
        assert_eq!(compile("let n: = 1;", Dialect::Untyped).unwrap(), "let n: = 1;");
    }

    #[test]
    fn test_compile_failure_is_structured() {
        let err = compile("const s: string = 1;", Dialect::Typed).unwrap_err();
        assert_eq!(err.line(), Some(1));
        assert_eq!(err.to_report().error_kind, "TS2322");
    }

    #[test]
    fn test_one_shot_run() {
        let sink = OutputSink::new(&OutputOptions::default());
        let result = run("console.log('hi'); 40 + 2", Dialect::Untyped, &RunConfig::default(), sink.clone()).unwrap();
        assert_eq!(sink.rendered_lines(), vec!["hi"]);
        assert_eq!(result.value.and_then(|v| v.as_number()), Some(42.0));

        let err = run("throw new RangeError('r')", Dialect::Untyped, &RunConfig::default(), sink).unwrap_err();
        assert_eq!(err.entry_text(), "Runtime error: r");
    }
}
