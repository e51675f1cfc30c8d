//! API error types
//!
//! One umbrella error for every layer plus a structured report that hosts
//! can print or serialize.

use serde::Serialize;
use thiserror::Error;
use tinker_core::compiler::BackendError;
use tinker_core::{Diagnostic, RuntimeError};
use tinker_store::StoreError;

/// Prefix of the error entry a failed compile produces
pub const COMPILATION_ERROR_PREFIX: &str = "Compilation error: ";

/// Prefix of the error entry a throwing run produces
pub const RUNTIME_ERROR_PREFIX: &str = "Runtime error: ";

/// Bringing up the host failed; nothing is retried
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BootError {
    #[error("Failed to load the compiler: {0}")]
    Compiler(#[from] BackendError),

    #[error("Configuration already initialized")]
    ConfigAlreadyInitialized,

    /// Only one session context may exist at a time
    #[error("A session context is already running")]
    ContextAlreadyLive,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TinkerError {
    #[error("Compilation error: {}", .0.message)]
    Compile(Diagnostic),

    #[error("Runtime error: {0}")]
    Runtime(RuntimeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Boot(#[from] BootError),
}

impl From<BackendError> for TinkerError {
    fn from(err: BackendError) -> Self {
        TinkerError::Boot(BootError::Compiler(err))
    }
}

impl TinkerError {
    pub fn line(&self) -> Option<usize> {
        match self {
            TinkerError::Compile(d) => Some(d.line),
            _ => None,
        }
    }

    pub fn column(&self) -> Option<usize> {
        match self {
            TinkerError::Compile(d) => Some(d.column),
            _ => None,
        }
    }

    /// Pipeline phase the error came from
    pub fn phase(&self) -> &'static str {
        match self {
            TinkerError::Compile(_) => "compiler",
            TinkerError::Runtime(_) => "runtime",
            TinkerError::Store(_) => "store",
            TinkerError::Boot(_) => "host",
        }
    }

    /// Text of the error-level output entry for this error
    pub fn entry_text(&self) -> String {
        match self {
            TinkerError::Compile(d) => format!("{}{}", COMPILATION_ERROR_PREFIX, d),
            TinkerError::Runtime(e) => format!("{}{}", RUNTIME_ERROR_PREFIX, e.message()),
            other => other.to_string(),
        }
    }

    /// Structured form for hosts that render or serialize errors themselves
    pub fn to_report(&self) -> ErrorReport {
        let (error_kind, message) = match self {
            TinkerError::Compile(d) => (format!("TS{}", d.code), d.message.clone()),
            TinkerError::Runtime(RuntimeError::Syntax(msg)) => ("SyntaxError".to_string(), msg.clone()),
            TinkerError::Runtime(RuntimeError::Thrown(msg)) => ("Uncaught".to_string(), msg.clone()),
            TinkerError::Store(e) => ("StoreError".to_string(), e.to_string()),
            TinkerError::Boot(e) => ("BootError".to_string(), e.to_string()),
        };
        ErrorReport {
            phase: self.phase(),
            line: self.line(),
            column: self.column(),
            error_kind,
            message,
        }
    }
}

/// Structured error report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// compiler, runtime, store or host
    pub phase: &'static str,
    /// 1-based
    pub line: Option<usize>,
    /// 1-based
    pub column: Option<usize>,
    /// Stable kind for programmatic handling (`TS2322`, `SyntaxError`, ...)
    pub error_kind: String,
    pub message: String,
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => write!(f, "[{}:{}] {} error: {}", line, col, self.phase, self.message),
            _ => write!(f, "[{}] {} error: {}", self.phase, self.phase, self.message),
        }
    }
}

impl ErrorReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Terse single-line form
    pub fn to_short(&self) -> String {
        format!("{}: {}", self.phase, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinker_core::kit::lexer::Coordinate;

    fn type_error() -> TinkerError {
        TinkerError::Compile(Diagnostic::new(
            2322,
            "Type 'string' is not assignable to type 'number'.",
            Coordinate::new(1, 7),
        ))
    }

    #[test]
    fn test_compile_error_entry_and_location() {
        let err = type_error();
        assert_eq!(err.line(), Some(1));
        assert_eq!(err.column(), Some(7));
        assert_eq!(err.phase(), "compiler");
        assert_eq!(
            err.entry_text(),
            "Compilation error: error TS2322 at 1:7: Type 'string' is not assignable to type 'number'."
        );
    }

    #[test]
    fn test_runtime_error_entry_carries_message_only() {
        let err = TinkerError::Runtime(RuntimeError::Thrown("boom".to_string()));
        assert_eq!(err.entry_text(), "Runtime error: boom");
        assert_eq!(err.line(), None);
        let err = TinkerError::Runtime(RuntimeError::Syntax("Unexpected token (1:5)".to_string()));
        assert_eq!(err.entry_text(), "Runtime error: SyntaxError: Unexpected token (1:5)");
    }

    #[test]
    fn test_report_display() {
        assert_eq!(
            type_error().to_report().to_string(),
            "[1:7] compiler error: Type 'string' is not assignable to type 'number'."
        );
        let report = TinkerError::Runtime(RuntimeError::Thrown("boom".to_string())).to_report();
        assert_eq!(report.to_string(), "[runtime] runtime error: boom");
        assert_eq!(report.to_short(), "runtime: boom");
    }

    #[test]
    fn test_report_json() {
        let json = type_error().to_report().to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["phase"], "compiler");
        assert_eq!(parsed["line"], 1);
        assert_eq!(parsed["error_kind"], "TS2322");

        let report = TinkerError::Store(StoreError::Io {
            message: "disk \"full\"".to_string(),
        })
        .to_report();
        let parsed: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert!(parsed["line"].is_null());
        assert_eq!(parsed["message"], "IO error: disk \"full\"");
    }

    #[test]
    fn test_backend_failure_is_a_boot_error() {
        let err = TinkerError::from(BackendError::EmitDisabled);
        assert_eq!(err.phase(), "host");
        assert!(matches!(err, TinkerError::Boot(BootError::Compiler(_))));
    }
}
