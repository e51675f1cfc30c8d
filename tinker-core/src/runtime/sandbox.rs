//! Isolated execution of executable script text
//!
//! Every run gets a fresh function scope below the shared host globals, with
//! `console` bound to the capability the caller passes in. `execute` is
//! synchronous: it returns once the top level finishes or throws, leaving any
//! scheduled work on the event loop.

use super::error::RuntimeError;
use super::event_loop::EventLoop;
use super::function::native;
use super::interpreter::Interpreter;
use super::value::{Object, Value};
use crate::compiler::parser::{parse_program, ParserError, Syntax};
use std::rc::Rc;
use tinker_config::SandboxLimits;
use tinker_output::{OutputLevel, OutputSink};
use tracing::{debug, info};

/// The virtual console handed to executed code
pub trait ConsoleCapability {
    /// One console call: `values` render independently into one entry
    fn emit(&self, level: OutputLevel, values: &[Value]);

    /// `console.clear()`
    fn clear(&self);
}

impl ConsoleCapability for OutputSink {
    fn emit(&self, level: OutputLevel, values: &[Value]) {
        self.append(level, values);
    }

    fn clear(&self) {
        OutputSink::clear(self);
    }
}

/// Outcome of one `execute` call
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// A completion value other than `undefined` was produced
    pub has_value: bool,
    pub value: Option<Value>,
    pub error: Option<RuntimeError>,
}

impl ExecutionResult {
    fn completed(value: Option<Value>) -> Self {
        let value = value.filter(|v| !v.is_undefined());
        Self {
            has_value: value.is_some(),
            value,
            error: None,
        }
    }

    fn failed(error: RuntimeError) -> Self {
        Self {
            has_value: false,
            value: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Message text of the error, if the run threw
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(RuntimeError::message)
    }
}

pub struct Sandbox {
    interpreter: Interpreter,
    runs: u64,
}

impl Sandbox {
    pub fn new(limits: SandboxLimits, event_loop: Rc<EventLoop>) -> Self {
        Self {
            interpreter: Interpreter::with_event_loop(limits, event_loop),
            runs: 0,
        }
    }

    pub fn event_loop(&self) -> &Rc<EventLoop> {
        self.interpreter.event_loop()
    }

    /// Id of the most recent run (0 before the first)
    pub fn last_run_id(&self) -> u64 {
        self.runs
    }

    /// Run `text` once with `console` bound to `capability`
    pub fn execute(&mut self, text: &str, capability: Rc<dyn ConsoleCapability>) -> ExecutionResult {
        self.runs += 1;
        let run_id = self.runs;
        self.interpreter.event_loop().set_current_run(run_id);
        info!(target: "tinker::runtime", run_id, bytes = text.len(), "execution started");

        let program = match parse_program(text, Syntax::Untyped) {
            Ok(program) => program,
            Err(err) => {
                debug!(target: "tinker::runtime", run_id, %err, "executable text did not parse");
                return ExecutionResult::failed(RuntimeError::Syntax(syntax_message(&err)));
            }
        };

        let scope = self.interpreter.run_scope();
        scope.declare(Rc::from("console"), true, Some(console_object(capability)));
        match self.interpreter.run_program(&program, &scope) {
            Ok(value) => {
                let result = ExecutionResult::completed(value);
                info!(target: "tinker::runtime", run_id, has_value = result.has_value, "execution completed");
                result
            }
            Err(thrown) => {
                info!(target: "tinker::runtime", run_id, error = %thrown.describe(), "execution threw");
                ExecutionResult::failed(RuntimeError::Thrown(thrown.message()))
            }
        }
    }

    /// Drain deferred work, sleeping for pending timers
    pub fn run_until_idle(&mut self) {
        self.interpreter.run_until_idle();
    }

    /// Drain microtasks and already-due timers
    pub fn run_ready(&mut self) {
        self.interpreter.run_ready();
    }
}

fn syntax_message(err: &ParserError) -> String {
    format!("{} ({}:{})", err.message(), err.line(), err.column())
}

/// `console` with methods forwarding to `capability`
fn console_object(capability: Rc<dyn ConsoleCapability>) -> Value {
    let console = Object::plain();
    let levels = [
        ("log", OutputLevel::Log),
        ("info", OutputLevel::Info),
        ("warn", OutputLevel::Warn),
        ("error", OutputLevel::Error),
    ];
    for (name, level) in levels {
        let capability = capability.clone();
        console.set_hidden(
            name,
            native(name, 0, move |_, _, args| {
                capability.emit(level, args);
                Ok(Value::Undefined)
            }),
        );
    }
    console.set_hidden(
        "clear",
        native("clear", 0, move |_, _, _| {
            capability.clear();
            Ok(Value::Undefined)
        }),
    );
    Value::Object(console)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        lines: RefCell<Vec<(OutputLevel, String)>>,
    }

    impl ConsoleCapability for Recorder {
        fn emit(&self, level: OutputLevel, values: &[Value]) {
            self.lines
                .borrow_mut()
                .push((level, tinker_output::render_values(values)));
        }

        fn clear(&self) {
            self.lines.borrow_mut().clear();
        }
    }

    fn sandbox() -> Sandbox {
        Sandbox::new(SandboxLimits::default(), EventLoop::new())
    }

    #[test]
    fn test_console_calls_reach_the_capability() {
        let recorder = Rc::new(Recorder::default());
        let result = sandbox().execute("console.log('hi', 1); console.warn({a: 1});", recorder.clone());
        assert!(!result.is_error());
        assert!(!result.has_value);
        assert_eq!(
            *recorder.lines.borrow(),
            vec![
                (OutputLevel::Log, "hi 1".to_string()),
                (OutputLevel::Warn, "{\n  \"a\": 1\n}".to_string()),
            ]
        );
    }

    #[test]
    fn test_completion_value_distinguishes_falsy_values() {
        let mut sb = sandbox();
        let recorder: Rc<dyn ConsoleCapability> = Rc::new(Recorder::default());
        for source in ["0", "false", "null", "''"] {
            let result = sb.execute(source, recorder.clone());
            assert!(result.has_value, "{} should produce a value", source);
        }
        assert!(!sb.execute("undefined", recorder.clone()).has_value);
        assert!(!sb.execute("let x = 1;", recorder).has_value);
    }

    #[test]
    fn test_declarations_do_not_leak_between_runs() {
        let mut sb = sandbox();
        let recorder: Rc<dyn ConsoleCapability> = Rc::new(Recorder::default());
        assert!(!sb.execute("const x = 1;", recorder.clone()).is_error());
        let second = sb.execute("x", recorder);
        assert_eq!(second.error_message().as_deref(), Some("x is not defined"));
    }

    #[test]
    fn test_syntax_errors_are_runtime_errors() {
        let recorder: Rc<dyn ConsoleCapability> = Rc::new(Recorder::default());
        let result = sandbox().execute("let = ;", recorder);
        let message = result.error_message().unwrap_or_default();
        assert!(message.starts_with("SyntaxError: "), "{}", message);
    }

    #[test]
    fn test_thrown_values_become_messages() {
        let recorder: Rc<dyn ConsoleCapability> = Rc::new(Recorder::default());
        let mut sb = sandbox();
        let result = sb.execute("throw new Error('boom')", recorder.clone());
        assert_eq!(result.error_message().as_deref(), Some("boom"));
        let result = sb.execute("throw 'plain'", recorder);
        assert_eq!(result.error_message().as_deref(), Some("plain"));
    }

    #[test]
    fn test_console_clear() {
        let recorder = Rc::new(Recorder::default());
        sandbox().execute("console.log(1); console.clear(); console.info(2);", recorder.clone());
        assert_eq!(*recorder.lines.borrow(), vec![(OutputLevel::Info, "2".to_string())]);
    }

    #[test]
    fn test_run_ids_increase() {
        let mut sb = sandbox();
        let recorder: Rc<dyn ConsoleCapability> = Rc::new(Recorder::default());
        sb.execute("1", recorder.clone());
        sb.execute("2", recorder);
        assert_eq!(sb.last_run_id(), 2);
        assert_eq!(sb.event_loop().current_run(), 2);
    }
}
