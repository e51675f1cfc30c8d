use crate::kit::lexer::SourceSpan;
use std::fmt;
use std::rc::Rc;

/// Type annotation syntax
///
/// Only the typed dialect produces these. They are checked and then erased.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Named type, possibly generic: `number`, `Point`, `Array<T>`
    Named {
        name: Rc<str>,
        args: Vec<TypeExpr>,
        span: SourceSpan,
    },
    Literal(TypeLiteral),
    /// `T[]`
    Array(Box<TypeExpr>),
    /// `[A, B]`
    Tuple(Vec<TypeExpr>),
    Union(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    /// `{ a: T; b?: U }`
    Object(Vec<TypeMember>),
    /// `(a: A, b?: B) => R`
    Function {
        params: Vec<FunctionTypeParam>,
        ret: Box<TypeExpr>,
    },
    /// `typeof name`
    Query(Rc<str>, SourceSpan),
    /// `keyof T`
    Keyof(Box<TypeExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeLiteral {
    Number(f64),
    String(Rc<str>),
    Bool(bool),
    Null,
    Void,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTypeParam {
    pub name: Rc<str>,
    pub ty: Option<TypeExpr>,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeMember {
    Property {
        name: Rc<str>,
        ty: TypeExpr,
        optional: bool,
        readonly: bool,
    },
    Method {
        name: Rc<str>,
        params: Vec<FunctionTypeParam>,
        ret: TypeExpr,
        optional: bool,
    },
    /// `[key: string]: T`
    Index { key: TypeExpr, value: TypeExpr },
}

impl TypeExpr {
    /// Plain named type without arguments
    pub fn named(name: &str, span: SourceSpan) -> Self {
        TypeExpr::Named {
            name: Rc::from(name),
            args: Vec::new(),
            span,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named { name, args, .. } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeExpr::Literal(TypeLiteral::Number(n)) => write!(f, "{}", n),
            TypeExpr::Literal(TypeLiteral::String(s)) => write!(f, "\"{}\"", s),
            TypeExpr::Literal(TypeLiteral::Bool(b)) => write!(f, "{}", b),
            TypeExpr::Literal(TypeLiteral::Null) => write!(f, "null"),
            TypeExpr::Literal(TypeLiteral::Void) => write!(f, "void"),
            TypeExpr::Array(inner) => write!(f, "{}[]", inner),
            TypeExpr::Tuple(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            TypeExpr::Union(items) | TypeExpr::Intersection(items) => {
                let sep = if matches!(self, TypeExpr::Union(_)) { " | " } else { " & " };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            TypeExpr::Object(_) => write!(f, "{{ ... }}"),
            TypeExpr::Function { .. } => write!(f, "(...) => ..."),
            TypeExpr::Query(name, _) => write!(f, "typeof {}", name),
            TypeExpr::Keyof(inner) => write!(f, "keyof {}", inner),
        }
    }
}
