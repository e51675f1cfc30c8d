//! Character-level lexing primitives
//!
//! - `SourcePosition` / `SourceSpan`: 1-based line/column plus byte offsets
//! - `CharStream`: peekable character cursor over an in-memory source
//! - `LexError`: scanner failures with the position they occurred at

pub mod error;
pub mod position;
pub mod stream;

pub use error::{LexError, LexErrorKind};
pub use position::{Coordinate, SourcePosition, SourceSpan};
pub use stream::CharStream;

/// Identifier start character (`$`, `_`, letters)
pub fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

/// Identifier continuation character
pub fn is_identifier_continue(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit() || c == '\u{200c}' || c == '\u{200d}'
}

/// Line terminators recognised by the scanner
pub fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}
