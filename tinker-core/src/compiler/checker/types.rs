//! Semantic types used by the checker

use crate::kit::number::format_number;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    Number,
    String,
    Boolean,
    NumberLit(f64),
    StringLit(Rc<str>),
    BoolLit(bool),
    Array(Box<Type>),
    Tuple(Vec<Type>),
    Object(Rc<ObjectType>),
    Function(Rc<FunctionType>),
    /// Always flattened and deduplicated, see [`Type::union`]
    Union(Vec<Type>),
    Promise(Box<Type>),
    Error,
}

/// Object shape, optionally callable or constructable
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectType {
    /// Interface or alias name, used when printing
    pub name: Option<Rc<str>>,
    pub props: Vec<PropType>,
    /// `[key: string]: T`
    pub index: Option<Type>,
    pub call: Option<Rc<FunctionType>>,
    pub construct: Option<Rc<FunctionType>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropType {
    pub name: Rc<str>,
    pub ty: Type,
    pub optional: bool,
    pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<ParamType>,
    pub ret: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamType {
    pub name: Rc<str>,
    pub ty: Type,
    pub optional: bool,
    /// Rest parameter; `ty` is the array type
    pub rest: bool,
}

impl FunctionType {
    pub fn new(params: Vec<ParamType>, ret: Type) -> Self {
        Self { params, ret }
    }

    pub fn required_count(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| !p.optional && !p.rest)
            .count()
    }

    pub fn has_rest(&self) -> bool {
        self.params.last().is_some_and(|p| p.rest)
    }

    /// Positional parameters, excluding the rest parameter
    pub fn positional_count(&self) -> usize {
        self.params.len() - usize::from(self.has_rest())
    }

    /// Expected type of the argument at `index`
    pub fn param_type(&self, index: usize) -> Option<Type> {
        match self.params.get(index) {
            Some(p) if p.rest => Some(p.ty.element_type()),
            Some(p) => Some(p.ty.clone()),
            None => self
                .params
                .last()
                .filter(|p| p.rest)
                .map(|p| p.ty.element_type()),
        }
    }
}

impl ParamType {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: Rc::from(name),
            ty,
            optional: false,
            rest: false,
        }
    }
}

impl ObjectType {
    pub fn prop(&self, name: &str) -> Option<&PropType> {
        self.props.iter().find(|p| &*p.name == name)
    }
}

impl Type {
    pub fn function(params: Vec<ParamType>, ret: Type) -> Type {
        Type::Function(Rc::new(FunctionType::new(params, ret)))
    }

    pub fn object(props: Vec<PropType>) -> Type {
        Type::Object(Rc::new(ObjectType {
            props,
            ..ObjectType::default()
        }))
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    /// Build a normalized union
    pub fn union(members: impl IntoIterator<Item = Type>) -> Type {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            match member {
                Type::Union(inner) => {
                    for m in inner {
                        push_member(&mut flat, m);
                    }
                }
                other => push_member(&mut flat, other),
            }
        }
        if flat.iter().any(|t| *t == Type::Any) {
            return Type::Any;
        }
        if flat.iter().any(|t| *t == Type::Unknown) {
            return Type::Unknown;
        }
        // literals are absorbed by their base type
        let has = |base: &Type| flat.contains(base);
        let (has_number, has_string, has_boolean) =
            (has(&Type::Number), has(&Type::String), has(&Type::Boolean));
        flat.retain(|t| match t {
            Type::NumberLit(_) => !has_number,
            Type::StringLit(_) => !has_string,
            Type::BoolLit(_) => !has_boolean,
            _ => true,
        });
        if flat.contains(&Type::BoolLit(true)) && flat.contains(&Type::BoolLit(false)) {
            flat.retain(|t| !matches!(t, Type::BoolLit(_)));
            flat.push(Type::Boolean);
        }
        match flat.len() {
            0 => Type::Never,
            1 => flat.pop().unwrap_or(Type::Never),
            _ => Type::Union(flat),
        }
    }

    pub fn members(&self) -> &[Type] {
        match self {
            Type::Union(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    /// Literal types become their primitive base
    pub fn widen(&self) -> Type {
        match self {
            Type::NumberLit(_) => Type::Number,
            Type::StringLit(_) => Type::String,
            Type::BoolLit(_) => Type::Boolean,
            Type::Union(members) => Type::union(members.iter().map(Type::widen)),
            Type::Tuple(items) => Type::Tuple(items.iter().map(Type::widen).collect()),
            other => other.clone(),
        }
    }

    pub fn is_literal(&self) -> bool {
        match self {
            Type::NumberLit(_) | Type::StringLit(_) | Type::BoolLit(_) => true,
            Type::Union(members) => members.iter().any(Type::is_literal),
            _ => false,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Type::Undefined | Type::Null | Type::Void)
    }

    pub fn has_undefined(&self) -> bool {
        self.members()
            .iter()
            .any(|t| matches!(t, Type::Undefined | Type::Void))
    }

    pub fn has_null(&self) -> bool {
        self.members().iter().any(|t| *t == Type::Null)
    }

    /// Remove `undefined` and `null` members
    pub fn non_nullable(&self) -> Type {
        match self {
            Type::Union(members) => Type::union(members.iter().filter(|t| !t.is_nullish()).cloned()),
            other => other.clone(),
        }
    }

    pub fn is_number_like(&self) -> bool {
        self.members()
            .iter()
            .all(|t| matches!(t, Type::Any | Type::Number | Type::NumberLit(_)))
    }

    pub fn is_string_like(&self) -> bool {
        self.members()
            .iter()
            .all(|t| matches!(t, Type::String | Type::StringLit(_)))
    }

    /// Element type of arrays and tuples; `any` otherwise
    pub fn element_type(&self) -> Type {
        match self {
            Type::Array(inner) => (**inner).clone(),
            Type::Tuple(items) => Type::union(items.iter().cloned()),
            Type::Union(members) => Type::union(members.iter().map(Type::element_type)),
            _ => Type::Any,
        }
    }

    /// The value a promise of this type resolves to
    pub fn awaited(&self) -> Type {
        match self {
            Type::Promise(inner) => inner.awaited(),
            other => other.clone(),
        }
    }

    /// Result of the `typeof` operator for values of this type
    pub fn typeof_tag(&self) -> Option<&'static str> {
        Some(match self {
            Type::Number | Type::NumberLit(_) => "number",
            Type::String | Type::StringLit(_) => "string",
            Type::Boolean | Type::BoolLit(_) => "boolean",
            Type::Undefined | Type::Void => "undefined",
            Type::Function(_) => "function",
            Type::Object(obj) if obj.call.is_some() || obj.construct.is_some() => "function",
            Type::Null
            | Type::Array(_)
            | Type::Tuple(_)
            | Type::Object(_)
            | Type::Promise(_)
            | Type::Error => "object",
            _ => return None,
        })
    }

    /// Can a value of this type be falsy
    pub fn can_be_falsy(&self) -> bool {
        self.members().iter().any(|t| match t {
            Type::Any | Type::Unknown | Type::Undefined | Type::Null | Type::Void => true,
            Type::Number | Type::String | Type::Boolean => true,
            Type::NumberLit(n) => *n == 0.0 || n.is_nan(),
            Type::StringLit(s) => s.is_empty(),
            Type::BoolLit(b) => !b,
            _ => false,
        })
    }

    /// Members that survive a truthiness test
    pub fn truthy_part(&self) -> Type {
        match self {
            Type::Union(members) => Type::union(
                members
                    .iter()
                    .filter(|t| !t.is_nullish() && **t != Type::BoolLit(false))
                    .map(|t| if *t == Type::Boolean { Type::BoolLit(true) } else { t.clone() }),
            ),
            Type::Boolean => Type::BoolLit(true),
            other => other.clone(),
        }
    }

    /// Members that survive a falsiness test
    pub fn falsy_part(&self) -> Type {
        match self {
            Type::Any | Type::Unknown => self.clone(),
            _ => Type::union(self.members().iter().filter_map(|t| match t {
                Type::Boolean => Some(Type::BoolLit(false)),
                t if t.can_be_falsy() => Some(t.clone()),
                _ => None,
            })),
        }
    }
}

fn push_member(flat: &mut Vec<Type>, member: Type) {
    if member == Type::Never || flat.contains(&member) {
        return;
    }
    flat.push(member);
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Unknown => write!(f, "unknown"),
            Type::Never => write!(f, "never"),
            Type::Void => write!(f, "void"),
            Type::Undefined => write!(f, "undefined"),
            Type::Null => write!(f, "null"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Boolean => write!(f, "boolean"),
            Type::NumberLit(n) => write!(f, "{}", format_number(*n)),
            Type::StringLit(s) => write!(f, "\"{}\"", s),
            Type::BoolLit(b) => write!(f, "{}", b),
            Type::Array(inner) => match **inner {
                Type::Union(_) | Type::Function(_) => write!(f, "({})[]", inner),
                _ => write!(f, "{}[]", inner),
            },
            Type::Tuple(items) => {
                write!(f, "[")?;
                write_list(f, items, ", ")?;
                write!(f, "]")
            }
            Type::Object(obj) => match &obj.name {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "{}", obj),
            },
            Type::Function(func) => write!(f, "{}", func),
            Type::Union(members) => write_list(f, members, " | "),
            Type::Promise(inner) => write!(f, "Promise<{}>", inner),
            Type::Error => write!(f, "Error"),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.props.is_empty() && self.index.is_none() {
            return write!(f, "{{}}");
        }
        write!(f, "{{ ")?;
        for prop in &self.props {
            if prop.readonly {
                write!(f, "readonly ")?;
            }
            let marker = if prop.optional { "?" } else { "" };
            write!(f, "{}{}: {}; ", prop.name, marker, prop.ty)?;
        }
        if let Some(index) = &self.index {
            write!(f, "[key: string]: {}; ", index)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let rest = if param.rest { "..." } else { "" };
            let marker = if param.optional { "?" } else { "" };
            write!(f, "{}{}{}: {}", rest, param.name, marker, param.ty)?;
        }
        write!(f, ") => {}", self.ret)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Type], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_normalizes() {
        let t = Type::union([Type::NumberLit(1.0), Type::Number, Type::Undefined, Type::Number]);
        assert_eq!(t, Type::Union(vec![Type::Number, Type::Undefined]));
        assert_eq!(Type::union([Type::String]), Type::String);
        assert_eq!(Type::union([Type::String, Type::Any]), Type::Any);
        assert_eq!(
            Type::union([Type::BoolLit(true), Type::BoolLit(false)]),
            Type::Boolean
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::StringLit(Rc::from("bad")).to_string(), "\"bad\"");
        assert_eq!(Type::array(Type::Number).to_string(), "number[]");
        assert_eq!(
            Type::array(Type::union([Type::Number, Type::String])).to_string(),
            "(number | string)[]"
        );
        let obj = Type::object(vec![PropType {
            name: Rc::from("x"),
            ty: Type::Number,
            optional: false,
            readonly: false,
        }]);
        assert_eq!(obj.to_string(), "{ x: number; }");
        let func = Type::function(vec![ParamType::new("a", Type::Number)], Type::Void);
        assert_eq!(func.to_string(), "(a: number) => void");
    }

    #[test]
    fn test_truthiness_parts() {
        let t = Type::union([Type::String, Type::Undefined]);
        assert_eq!(t.truthy_part(), Type::String);
        assert_eq!(t.non_nullable(), Type::String);
        assert!(t.can_be_falsy());
        assert!(!Type::array(Type::Number).can_be_falsy());
    }

    #[test]
    fn test_widen() {
        assert_eq!(Type::NumberLit(3.0).widen(), Type::Number);
        assert_eq!(
            Type::union([Type::StringLit(Rc::from("a")), Type::Null]).widen(),
            Type::union([Type::String, Type::Null])
        );
    }
}
