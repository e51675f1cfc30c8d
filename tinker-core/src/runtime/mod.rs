//! Script runtime
//!
//! Tree-walking interpreter over the untyped syntax tree, the host globals,
//! the promise machinery and the event loop that runs deferred work.

// ==================== Values ====================

pub mod value;

pub mod function;

pub mod error;

pub mod operators;

/// Conversion to and from JSON structures
pub mod structure;

// ==================== Execution ====================

pub mod scope;

pub mod interpreter;

pub mod realm;

/// Host globals
pub mod stdlib;

pub mod promise;

pub mod event_loop;

pub mod sandbox;

pub use error::{RuntimeError, ScriptResult, Throw};
pub use event_loop::{EventLoop, Reporter, UncaughtError, UncaughtKind};
pub use interpreter::Interpreter;
pub use sandbox::{ConsoleCapability, ExecutionResult, Sandbox};
pub use value::Value;
