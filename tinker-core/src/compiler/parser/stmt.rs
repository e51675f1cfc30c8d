use super::expr::{Expr, Pattern};
use super::type_expr::{TypeExpr, TypeMember};
use crate::kit::lexer::SourceSpan;
use std::rc::Rc;

/// Statement node with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    VarDecl(VarDecl),
    Function(Rc<FunctionNode>),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        binding: ForBinding,
        iterable: Expr,
        body: Box<Stmt>,
    },
    ForIn {
        binding: ForBinding,
        object: Expr,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Empty,
    /// `interface` declaration (typed dialect, erased)
    Interface(InterfaceDecl),
    /// `type` alias (typed dialect, erased)
    TypeAlias(TypeAliasDecl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarations: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub pattern: Pattern,
    pub type_ann: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    VarDecl(VarDecl),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForBinding {
    Decl { kind: VarKind, pattern: Pattern },
    Target(Pattern),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub type_ann: Option<TypeExpr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Pattern,
    pub type_ann: Option<TypeExpr>,
    pub default: Option<Expr>,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    /// Arrow function with an expression body
    Expr(Box<Expr>),
}

/// Function declaration, expression, arrow, or object method
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub name: Option<Rc<str>>,
    pub type_params: Vec<Rc<str>>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub span: SourceSpan,
    /// Source text of the whole function, used when printing it
    pub source: Rc<str>,
}

impl FunctionNode {
    /// Number of parameters before the first optional, default or rest one
    pub fn required_params(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| !p.optional && !p.rest && p.default.is_none())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: Rc<str>,
    pub type_params: Vec<Rc<str>>,
    pub extends: Vec<TypeExpr>,
    pub members: Vec<TypeMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: Rc<str>,
    pub type_params: Vec<Rc<str>>,
    pub ty: TypeExpr,
}
