//! Test helpers
//!
//! Run script text end to end: compile for the dialect, execute in a fresh
//! sandbox with an output sink as the console, then drain deferred work.

#![allow(dead_code)]

use std::rc::Rc;
use tinker_config::{OutputOptions, SandboxLimits};
use tinker_core::{compile, Dialect, EventLoop, ExecutionResult, Sandbox};
use tinker_output::{OutputLevel, OutputSink};

/// Everything one run left behind
pub struct Run {
    pub result: ExecutionResult,
    pub sink: Rc<OutputSink>,
}

impl Run {
    /// `(level, rendered text)` of every entry, in append order
    pub fn entries(&self) -> Vec<(OutputLevel, String)> {
        self.sink
            .entries()
            .iter()
            .map(|e| (e.level(), e.rendered_text().to_string()))
            .collect()
    }

    /// Rendered text of every entry
    pub fn lines(&self) -> Vec<String> {
        self.sink.rendered_lines()
    }

    pub fn error(&self) -> Option<String> {
        self.result.error_message()
    }
}

/// Execute plain script text and drain timers and microtasks
pub fn execute(text: &str) -> Run {
    let sink = OutputSink::new(&OutputOptions::default());
    let mut sandbox = Sandbox::new(SandboxLimits::default(), EventLoop::new());
    let result = sandbox.execute(text, sink.clone());
    sandbox.run_until_idle();
    Run { result, sink }
}

/// Compile for `dialect`, then execute; `Err` carries the diagnostic
pub fn run(source: &str, dialect: Dialect) -> Result<Run, String> {
    let compiled = compile(source, dialect).map_err(|e| e.to_string())?;
    match compiled.executable_text() {
        Some(text) => Ok(execute(text)),
        None => Err(compiled.diagnostic_message().unwrap_or_default().to_string()),
    }
}

/// Rendered console lines of an untyped run
pub fn logs(source: &str) -> Vec<String> {
    execute(source).lines()
}
