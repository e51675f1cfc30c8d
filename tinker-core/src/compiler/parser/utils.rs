use super::super::lexer::token_kind::TokenKind;
use super::expr::{BinaryOp, LogicalOp};

/// Binary operator produced by a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Binding power of an infix token; 0 means "not an infix operator"
pub fn get_precedence(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::QuestionQuestion => 1,
        TokenKind::PipePipe => 2,
        TokenKind::AmpAmp => 3,
        TokenKind::Pipe => 4,
        TokenKind::Caret => 5,
        TokenKind::Amp => 6,
        TokenKind::EqualEqual
        | TokenKind::BangEqual
        | TokenKind::EqualEqualEqual
        | TokenKind::BangEqualEqual => 7,
        TokenKind::Less
        | TokenKind::Greater
        | TokenKind::LessEqual
        | TokenKind::GreaterEqual
        | TokenKind::Instanceof
        | TokenKind::In => 8,
        TokenKind::LessLess | TokenKind::GreaterGreater | TokenKind::GreaterGreaterGreater => 9,
        TokenKind::Plus | TokenKind::Minus => 10,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 11,
        TokenKind::StarStar => 12,
        _ => 0,
    }
}

/// Precedence of `as` casts, which bind like relational operators
pub const AS_PRECEDENCE: u8 = 8;

/// `true` for left-associative operators
pub fn get_associativity(kind: TokenKind) -> bool {
    kind != TokenKind::StarStar
}

pub fn infix_op(kind: TokenKind) -> Option<InfixOp> {
    let op = match kind {
        TokenKind::QuestionQuestion => InfixOp::Logical(LogicalOp::Nullish),
        TokenKind::PipePipe => InfixOp::Logical(LogicalOp::Or),
        TokenKind::AmpAmp => InfixOp::Logical(LogicalOp::And),
        other => InfixOp::Binary(binary_op(other)?),
    };
    Some(op)
}

pub fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::StarStar => BinaryOp::Exp,
        TokenKind::EqualEqual => BinaryOp::Eq,
        TokenKind::BangEqual => BinaryOp::NotEq,
        TokenKind::EqualEqualEqual => BinaryOp::StrictEq,
        TokenKind::BangEqualEqual => BinaryOp::StrictNotEq,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::LessEqual => BinaryOp::LtEq,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::GreaterEqual => BinaryOp::GtEq,
        TokenKind::LessLess => BinaryOp::Shl,
        TokenKind::GreaterGreater => BinaryOp::Shr,
        TokenKind::GreaterGreaterGreater => BinaryOp::UShr,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::In => BinaryOp::In,
        TokenKind::Instanceof => BinaryOp::Instanceof,
        _ => return None,
    };
    Some(op)
}
