//! Script lexer: token kinds and the scanner producing them

pub mod scanner;
pub mod token_kind;

pub use scanner::{tokenize, Scanner, TemplatePart, Token, TokenValue};
pub use token_kind::TokenKind;
