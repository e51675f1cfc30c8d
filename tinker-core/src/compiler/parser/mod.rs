pub mod error;
pub mod expr;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod stmt;
pub mod type_expr;
mod utils;

pub use error::{ErrorLocation, ParseResult, ParserError, ParserErrorKind};
pub use expr::{
    Argument, ArrayElement, AssignOp, BinaryOp, Expr, ExprKind, LogicalOp, Pattern,
    PatternElement, PatternProp, PropertyDef, PropertyKey, UnaryOp, UpdateOp,
};
pub use parser::{parse_program, Parser, Program, Syntax};
pub use stmt::{
    CatchClause, Declarator, ForBinding, ForInit, FunctionBody, FunctionNode, InterfaceDecl, Param,
    Stmt, StmtKind, SwitchCase, TypeAliasDecl, VarDecl, VarKind,
};
pub use type_expr::{FunctionTypeParam, TypeExpr, TypeLiteral, TypeMember};

use super::lexer::Scanner;

/// Parse a standalone type such as `(a: number) => string`
pub fn parse_type_text(text: &str) -> ParseResult<TypeExpr> {
    let source: std::rc::Rc<str> = std::rc::Rc::from(text);
    let tokens = Scanner::new(text).scan_all()?;
    let mut parser = Parser::new(tokens, Syntax::Typed, source);
    parser.parse_type_only()
}
