//! The compiler backend: typed source in, plain script out
//!
//! The only backend shipped is [`TypeStripper`], which checks the program
//! and then deletes its type syntax. It never rewrites the remaining code,
//! so the output is only valid for the one target it supports.

use super::checker::check_program;
use super::diagnostic::Diagnostic;
use super::erase::erase;
use super::parser::{parse_program, Syntax};
use thiserror::Error;
use tinker_config::{CompilerOptions, ScriptTarget};
use tracing::{debug, info};

/// Result of one transpile call
#[derive(Debug, Clone, PartialEq)]
pub struct TranspileOutput {
    /// Emitted script; empty when diagnostics were reported
    pub text: String,
    /// Errors in report order; only the first is ever produced
    pub diagnostics: Vec<Diagnostic>,
}

impl TranspileOutput {
    fn emitted(text: String) -> Self {
        Self {
            text,
            diagnostics: Vec::new(),
        }
    }

    fn failed(diagnostic: Diagnostic) -> Self {
        Self {
            text: String::new(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn first_diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }
}

/// A backend could not be brought up with the requested options
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("target {} is not supported; only ES2020 can be emitted", .0.as_str())]
    UnsupportedTarget(ScriptTarget),
    #[error("noEmit is set; the playground needs emitted code to run")]
    EmitDisabled,
}

pub trait CompilerBackend {
    fn name(&self) -> &str;

    /// Options the backend was loaded with
    fn options(&self) -> &CompilerOptions;

    fn transpile(&self, text: &str, options: &CompilerOptions) -> TranspileOutput;
}

/// Strict checker followed by type erasure
#[derive(Debug, Clone)]
pub struct TypeStripper {
    options: CompilerOptions,
}

impl TypeStripper {
    pub fn load(options: &CompilerOptions) -> Result<Self, BackendError> {
        validate(options)?;
        info!(target: "tinker::compiler", target_level = options.target.as_str(), strict = options.strict, "compiler backend loaded");
        Ok(Self {
            options: options.clone(),
        })
    }
}

fn validate(options: &CompilerOptions) -> Result<(), BackendError> {
    if options.target != ScriptTarget::Es2020 {
        return Err(BackendError::UnsupportedTarget(options.target));
    }
    if options.no_emit {
        return Err(BackendError::EmitDisabled);
    }
    Ok(())
}

impl CompilerBackend for TypeStripper {
    fn name(&self) -> &str {
        "type-stripper"
    }

    fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn transpile(&self, text: &str, options: &CompilerOptions) -> TranspileOutput {
        if let Err(err) = validate(options) {
            // options are checked at load; a mismatch here is a host bug
            return TranspileOutput::failed(Diagnostic::new(5023, err.to_string(), Default::default()));
        }
        let program = match parse_program(text, Syntax::Typed) {
            Ok(program) => program,
            Err(err) => return TranspileOutput::failed(err.into()),
        };
        if let Err(err) = check_program(&program) {
            return TranspileOutput::failed(err.into());
        }
        let emitted = erase(&program.source, &program.erasures);
        debug!(target: "tinker::compiler", bytes = emitted.len(), "emitted script");
        TranspileOutput::emitted(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> TypeStripper {
        TypeStripper::load(&CompilerOptions::default()).unwrap()
    }

    #[test]
    fn test_load_rejects_unsupported_options() {
        let es5 = CompilerOptions {
            target: ScriptTarget::Es5,
            ..CompilerOptions::default()
        };
        assert_eq!(
            TypeStripper::load(&es5).unwrap_err(),
            BackendError::UnsupportedTarget(ScriptTarget::Es5)
        );
        let no_emit = CompilerOptions {
            no_emit: true,
            ..CompilerOptions::default()
        };
        assert_eq!(TypeStripper::load(&no_emit).unwrap_err(), BackendError::EmitDisabled);
    }

    #[test]
    fn test_strips_annotations() {
        let b = backend();
        let out = b.transpile("const x: number = 1 + 1;\nx;", b.options());
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.text, "const x = 1 + 1;\nx;");
    }

    #[test]
    fn test_reports_first_type_error() {
        let b = backend();
        let out = b.transpile("const x: number = \"bad\";", b.options());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.first_diagnostic().unwrap().code, 2322);
        assert!(out.text.is_empty());
    }

    #[test]
    fn test_reports_syntax_error() {
        let b = backend();
        let out = b.transpile("let = ;", b.options());
        assert_eq!(out.diagnostics.len(), 1);
    }
}
