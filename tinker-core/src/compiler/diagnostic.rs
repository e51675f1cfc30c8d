//! Compiler diagnostics in TypeScript's reporting format

use super::checker::TypeError;
use super::parser::ParserError;
use crate::kit::lexer::{Coordinate, LexError};
use thiserror::Error;

/// A single compile-time error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error TS{code} at {line}:{column}: {message}")]
pub struct Diagnostic {
    pub code: u32,
    pub message: String,
    /// 1-based
    pub line: usize,
    /// 1-based, in code points
    pub column: usize,
}

impl Diagnostic {
    pub fn new(code: u32, message: impl Into<String>, at: Coordinate) -> Self {
        Self {
            code,
            message: message.into(),
            line: at.line,
            column: at.column,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.line, self.column)
    }
}

impl From<ParserError> for Diagnostic {
    fn from(err: ParserError) -> Self {
        Diagnostic::new(err.kind.code(), err.kind.message(), err.location.coordinate())
    }
}

impl From<LexError> for Diagnostic {
    fn from(err: LexError) -> Self {
        Diagnostic::new(err.code(), err.message.clone(), err.position.coordinate())
    }
}

impl From<TypeError> for Diagnostic {
    fn from(err: TypeError) -> Self {
        Diagnostic::new(err.code(), err.to_string(), err.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendering() {
        let diag = Diagnostic::new(2322, "Type 'string' is not assignable to type 'number'.", Coordinate::new(1, 7));
        assert_eq!(
            diag.to_string(),
            "error TS2322 at 1:7: Type 'string' is not assignable to type 'number'."
        );
    }

    #[test]
    fn test_from_type_error() {
        let err = TypeError::CannotFindName {
            name: "foo".to_string(),
            location: Coordinate::new(3, 5),
        };
        let diag = Diagnostic::from(err);
        assert_eq!(diag.code, 2304);
        assert_eq!((diag.line, diag.column), (3, 5));
        assert_eq!(diag.message, "Cannot find name 'foo'.");
    }
}
