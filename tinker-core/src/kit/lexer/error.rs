//! Lexer error types

use super::position::SourcePosition;
use thiserror::Error;

/// Category of a scanning failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    InvalidChar(char),
    UnterminatedString,
    UnterminatedTemplate,
    UnterminatedComment,
    InvalidEscape,
    InvalidNumber,
}

/// A scanning failure at a position
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: SourcePosition,
    pub message: String,
}

impl LexError {
    pub fn new(kind: LexErrorKind, position: SourcePosition) -> Self {
        let message = match &kind {
            LexErrorKind::InvalidChar(c) => format!("Invalid character '{}'.", c),
            LexErrorKind::UnterminatedString => "Unterminated string literal.".to_string(),
            LexErrorKind::UnterminatedTemplate => "Unterminated template literal.".to_string(),
            LexErrorKind::UnterminatedComment => "'*/' expected.".to_string(),
            LexErrorKind::InvalidEscape => "Invalid escape sequence.".to_string(),
            LexErrorKind::InvalidNumber => "Invalid numeric literal.".to_string(),
        };
        Self {
            kind,
            position,
            message,
        }
    }

    /// TypeScript-compatible diagnostic code
    pub fn code(&self) -> u32 {
        match self.kind {
            LexErrorKind::InvalidChar(_) => 1127,
            LexErrorKind::UnterminatedString => 1002,
            LexErrorKind::UnterminatedTemplate => 1160,
            LexErrorKind::UnterminatedComment => 1010,
            LexErrorKind::InvalidEscape => 1125,
            LexErrorKind::InvalidNumber => 1351,
        }
    }
}
