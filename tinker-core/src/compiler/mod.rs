//! Typed-dialect compiler: scan, parse, strict check, erase

pub mod adapter;
pub mod backend;
pub mod checker;
pub mod diagnostic;
pub mod erase;
pub mod lexer;
pub mod parser;

pub use adapter::{compile, CompileResult, CompilerAdapter};
pub use backend::{BackendError, CompilerBackend, TranspileOutput, TypeStripper};
pub use diagnostic::Diagnostic;
