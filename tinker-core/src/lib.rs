//! Tinker Core - compiler and sandboxed runtime (pure logic, no IO)
//!
//! Contains the typed-dialect compiler (scanner, parser, strict checker,
//! eraser) and the runtime that executes plain script text.
//! Only operates on in-memory data structures; output leaves through the
//! console capability and tracing events.
//!
//! Configuration is passed explicitly via parameters, not via global state.

pub mod compiler;
pub mod kit;
pub mod runtime;

// Re-export common types
pub use compiler::{compile, CompileResult, CompilerAdapter, CompilerBackend, Diagnostic};
pub use runtime::{ConsoleCapability, EventLoop, ExecutionResult, RuntimeError, Sandbox, Value};

// Re-export config types from tinker-config
pub use tinker_config::{CompilerOptions, Dialect, Phase, SandboxLimits};
