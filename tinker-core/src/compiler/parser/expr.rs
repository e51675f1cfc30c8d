use super::stmt::FunctionNode;
use super::type_expr::TypeExpr;
use crate::kit::lexer::SourceSpan;
use std::rc::Rc;

/// Expression node with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

impl Expr {
    pub fn new(kind: ExprKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }

    /// Strip type-only wrappers (`as`, `!`, parentheses)
    pub fn unwrap_type_syntax(&self) -> &Expr {
        match &self.kind {
            ExprKind::TypeAssertion { expr, .. } | ExprKind::NonNull(expr) => {
                expr.unwrap_type_syntax()
            }
            ExprKind::Paren(inner) => inner.unwrap_type_syntax(),
            _ => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    String(Rc<str>),
    /// Template literal: `quasis.len() == exprs.len() + 1`
    Template {
        quasis: Vec<Rc<str>>,
        exprs: Vec<Expr>,
    },
    Bool(bool),
    Null,
    Ident(Rc<str>),
    Array(Vec<ArrayElement>),
    Object(Vec<PropertyDef>),
    Function(Rc<FunctionNode>),
    Paren(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Pattern>,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeExpr>,
        args: Vec<Argument>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        type_args: Vec<TypeExpr>,
        args: Vec<Argument>,
    },
    Member {
        object: Box<Expr>,
        property: Rc<str>,
        property_span: SourceSpan,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    /// Boundary of a chain containing `?.`; short-circuits to `undefined`
    OptionalChain(Box<Expr>),
    Sequence(Vec<Expr>),
    /// `expr as T` (typed dialect only)
    TypeAssertion {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
    /// `expr!` (typed dialect only)
    NonNull(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Expr(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Expr(Expr),
    Spread(Expr),
}

impl Argument {
    pub fn expr(&self) -> &Expr {
        match self {
            Argument::Expr(e) | Argument::Spread(e) => e,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Named(Rc<str>),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDef {
    Init {
        key: PropertyKey,
        value: Expr,
        shorthand: bool,
        span: SourceSpan,
    },
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::In => "in",
            BinaryOp::Instanceof => "instanceof",
        }
    }

    /// Operators requiring numeric operands under strict checking
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Rem
                | BinaryOp::Exp
                | BinaryOp::Shl
                | BinaryOp::Shr
                | BinaryOp::UShr
                | BinaryOp::BitAnd
                | BinaryOp::BitOr
                | BinaryOp::BitXor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
    Logical(LogicalOp),
}

/// Binding or assignment target
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident {
        name: Rc<str>,
        span: SourceSpan,
    },
    Object {
        props: Vec<PatternProp>,
        rest: Option<Box<Pattern>>,
        span: SourceSpan,
    },
    Array {
        elements: Vec<Option<PatternElement>>,
        rest: Option<Box<Pattern>>,
        span: SourceSpan,
    },
    /// Member or index target, only in assignments
    Expr(Box<Expr>),
}

impl Pattern {
    pub fn span(&self) -> SourceSpan {
        match self {
            Pattern::Ident { span, .. }
            | Pattern::Object { span, .. }
            | Pattern::Array { span, .. } => *span,
            Pattern::Expr(e) => e.span,
        }
    }

    /// Names bound by this pattern, in source order
    pub fn bound_names(&self) -> Vec<Rc<str>> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<Rc<str>>) {
        match self {
            Pattern::Ident { name, .. } => names.push(name.clone()),
            Pattern::Object { props, rest, .. } => {
                for prop in props {
                    prop.value.collect_names(names);
                }
                if let Some(rest) = rest {
                    rest.collect_names(names);
                }
            }
            Pattern::Array { elements, rest, .. } => {
                for element in elements.iter().flatten() {
                    element.pattern.collect_names(names);
                }
                if let Some(rest) = rest {
                    rest.collect_names(names);
                }
            }
            Pattern::Expr(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternProp {
    pub key: PropertyKey,
    pub value: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternElement {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}
