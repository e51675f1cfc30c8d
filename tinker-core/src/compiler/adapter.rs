//! Dialect-aware front door to the compiler backend

use super::backend::{BackendError, CompilerBackend, TypeStripper};
use super::diagnostic::Diagnostic;
use std::fmt;
use tinker_config::{CompilerOptions, Dialect};
use tracing::debug;

/// Outcome of compiling one buffer; never retained past the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileResult {
    Success { executable_text: String },
    Failure {
        diagnostic_message: String,
        diagnostic: Diagnostic,
    },
}

impl CompileResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileResult::Success { .. })
    }

    pub fn executable_text(&self) -> Option<&str> {
        match self {
            CompileResult::Success { executable_text } => Some(executable_text),
            CompileResult::Failure { .. } => None,
        }
    }

    pub fn diagnostic_message(&self) -> Option<&str> {
        match self {
            CompileResult::Success { .. } => None,
            CompileResult::Failure { diagnostic_message, .. } => Some(diagnostic_message),
        }
    }

    /// The structured first error, on failure
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            CompileResult::Success { .. } => None,
            CompileResult::Failure { diagnostic, .. } => Some(diagnostic),
        }
    }
}

/// Compiles typed source through a backend and passes untyped source through
pub struct CompilerAdapter {
    backend: Box<dyn CompilerBackend>,
}

impl fmt::Debug for CompilerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerAdapter")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl CompilerAdapter {
    /// Load the default backend with the given options
    pub fn load(options: &CompilerOptions) -> Result<Self, BackendError> {
        Ok(Self::with_backend(Box::new(TypeStripper::load(options)?)))
    }

    pub fn with_backend(backend: Box<dyn CompilerBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn compile(&self, source: &str, dialect: Dialect) -> CompileResult {
        if !dialect.requires_compilation() {
            // parse errors surface at execution time as SyntaxError
            return CompileResult::Success {
                executable_text: source.to_string(),
            };
        }
        let output = self.backend.transpile(source, self.backend.options());
        match output.diagnostics.into_iter().next() {
            Some(diagnostic) => {
                debug!(target: "tinker::compiler", code = diagnostic.code, line = diagnostic.line, column = diagnostic.column, "compilation failed");
                CompileResult::Failure {
                    diagnostic_message: diagnostic.to_string(),
                    diagnostic,
                }
            }
            None => {
                debug!(target: "tinker::compiler", bytes = output.text.len(), "compilation succeeded");
                CompileResult::Success {
                    executable_text: output.text,
                }
            }
        }
    }
}

/// One-shot compile with default options
pub fn compile(source: &str, dialect: Dialect) -> Result<CompileResult, BackendError> {
    Ok(CompilerAdapter::load(&CompilerOptions::default())?.compile(source, dialect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::backend::TranspileOutput;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingBackend {
        calls: Rc<Cell<usize>>,
        options: CompilerOptions,
    }

    impl CompilerBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn options(&self) -> &CompilerOptions {
            &self.options
        }

        fn transpile(&self, text: &str, _options: &CompilerOptions) -> TranspileOutput {
            self.calls.set(self.calls.get() + 1);
            if text.contains("fail") {
                TranspileOutput {
                    text: String::new(),
                    diagnostics: vec![
                        Diagnostic::new(1, "first", Default::default()),
                        Diagnostic::new(2, "second", Default::default()),
                    ],
                }
            } else {
                TranspileOutput {
                    text: text.to_uppercase(),
                    diagnostics: Vec::new(),
                }
            }
        }
    }

    fn counting() -> (CompilerAdapter, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let backend = CountingBackend {
            calls: calls.clone(),
            options: CompilerOptions::default(),
        };
        (CompilerAdapter::with_backend(Box::new(backend)), calls)
    }

    #[test]
    fn test_untyped_passes_through_without_backend() {
        let (adapter, calls) = counting();
        let result = adapter.compile("let = broken", Dialect::Untyped);
        assert_eq!(result.executable_text(), Some("let = broken"));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_typed_recompiles_every_time() {
        let (adapter, calls) = counting();
        adapter.compile("x", Dialect::Typed);
        adapter.compile("x", Dialect::Typed);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_failure_keeps_first_diagnostic_only() {
        let (adapter, _) = counting();
        let result = adapter.compile("fail", Dialect::Typed);
        assert_eq!(result.diagnostic_message(), Some("error TS1 at 1:1: first"));
    }

    #[test]
    fn test_type_error_diagnostic_message() {
        let result = compile("const x: number = \"bad\";", Dialect::Typed).unwrap();
        assert_eq!(
            result.diagnostic_message(),
            Some("error TS2322 at 1:7: Type 'string' is not assignable to type 'number'.")
        );
    }

    #[test]
    fn test_typed_success_strips_types() {
        let result = compile("let n: number = 2;\nn * 2", Dialect::Typed).unwrap();
        assert_eq!(result.executable_text(), Some("let n = 2;\nn * 2"));
    }
}
