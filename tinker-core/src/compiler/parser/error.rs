use crate::kit::lexer::{Coordinate, LexError};
use thiserror::Error;

/// Syntax error with its location
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{location}] {}", .kind.message())]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub location: ErrorLocation,
}

/// Where a syntax error was detected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorLocation {
    At(Coordinate),
    /// End of input; carries the position just past the last character
    Eof(Coordinate),
}

impl ErrorLocation {
    pub fn coordinate(&self) -> Coordinate {
        match self {
            ErrorLocation::At(c) | ErrorLocation::Eof(c) => *c,
        }
    }
}

impl std::fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorLocation::At(c) => write!(f, "{}", c),
            ErrorLocation::Eof(c) => write!(f, "{} (end of input)", c),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParserErrorKind {
    /// A specific token was required
    Expected { expected: String, found: String },
    ExpressionExpected { found: String },
    StatementExpected { found: String },
    IdentifierExpected { found: String },
    TypeExpected { found: String },
    /// Syntax outside the supported language subset
    Unsupported(String),
    InvalidAssignmentTarget,
    /// `return` outside a function body
    IllegalReturn,
    IllegalBreak,
    IllegalContinue,
    /// `const` without an initializer
    MissingInitializer,
    /// Syntax tree deeper than the parser accepts
    NestingTooDeep,
    Lex(LexError),
}

impl ParserErrorKind {
    /// TypeScript-compatible diagnostic code
    pub fn code(&self) -> u32 {
        match self {
            ParserErrorKind::Expected { .. } => 1005,
            ParserErrorKind::ExpressionExpected { .. } => 1109,
            ParserErrorKind::StatementExpected { .. }
            | ParserErrorKind::Unsupported(_)
            | ParserErrorKind::NestingTooDeep => 1128,
            ParserErrorKind::IdentifierExpected { .. } => 1003,
            ParserErrorKind::TypeExpected { .. } => 1110,
            ParserErrorKind::InvalidAssignmentTarget => 2364,
            ParserErrorKind::IllegalReturn => 1108,
            ParserErrorKind::IllegalBreak => 1105,
            ParserErrorKind::IllegalContinue => 1104,
            ParserErrorKind::MissingInitializer => 1155,
            ParserErrorKind::Lex(e) => e.code(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ParserErrorKind::Expected { expected, .. } => format!("'{}' expected.", expected),
            ParserErrorKind::ExpressionExpected { .. } => "Expression expected.".to_string(),
            ParserErrorKind::StatementExpected { .. } => {
                "Declaration or statement expected.".to_string()
            }
            ParserErrorKind::IdentifierExpected { .. } => "Identifier expected.".to_string(),
            ParserErrorKind::TypeExpected { .. } => "Type expected.".to_string(),
            ParserErrorKind::Unsupported(what) => format!("{} are not supported.", what),
            ParserErrorKind::InvalidAssignmentTarget => {
                "The left-hand side of an assignment expression must be a variable or a property access."
                    .to_string()
            }
            ParserErrorKind::IllegalReturn => {
                "A 'return' statement can only be used within a function body.".to_string()
            }
            ParserErrorKind::IllegalBreak => {
                "A 'break' statement can only be used within an enclosing iteration or switch statement."
                    .to_string()
            }
            ParserErrorKind::IllegalContinue => {
                "A 'continue' statement can only be used within an enclosing iteration statement."
                    .to_string()
            }
            ParserErrorKind::MissingInitializer => {
                "'const' declarations must be initialized.".to_string()
            }
            ParserErrorKind::NestingTooDeep => "Expression is nested too deeply.".to_string(),
            ParserErrorKind::Lex(e) => e.message.clone(),
        }
    }
}

impl ParserError {
    pub fn at(kind: ParserErrorKind, coordinate: Coordinate) -> Self {
        Self {
            kind,
            location: ErrorLocation::At(coordinate),
        }
    }

    pub fn at_eof(kind: ParserErrorKind, coordinate: Coordinate) -> Self {
        Self {
            kind,
            location: ErrorLocation::Eof(coordinate),
        }
    }

    pub fn line(&self) -> usize {
        self.location.coordinate().line
    }

    pub fn column(&self) -> usize {
        self.location.coordinate().column
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    pub fn message(&self) -> String {
        self.kind.message()
    }
}

impl From<LexError> for ParserError {
    fn from(err: LexError) -> Self {
        let coordinate = err.position.coordinate();
        ParserError::at(ParserErrorKind::Lex(err), coordinate)
    }
}

pub type ParseResult<T> = Result<T, ParserError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::lexer::{LexErrorKind, SourcePosition};

    #[test]
    fn test_error_location() {
        let err = ParserError::at(
            ParserErrorKind::ExpressionExpected {
                found: ")".to_string(),
            },
            Coordinate { line: 3, column: 7 },
        );
        assert_eq!(err.line(), 3);
        assert_eq!(err.column(), 7);
        assert_eq!(err.code(), 1109);
    }

    #[test]
    fn test_display() {
        let err = ParserError::at(
            ParserErrorKind::Expected {
                expected: ")".to_string(),
                found: ";".to_string(),
            },
            Coordinate { line: 1, column: 5 },
        );
        assert_eq!(err.to_string(), "[1:5] ')' expected.");
    }

    #[test]
    fn test_from_lex_error() {
        let lex = LexError::new(LexErrorKind::UnterminatedString, SourcePosition::new(2, 4, 10));
        let err = ParserError::from(lex);
        assert_eq!(err.line(), 2);
        assert_eq!(err.code(), 1002);
        assert_eq!(err.message(), "Unterminated string literal.");
    }
}
