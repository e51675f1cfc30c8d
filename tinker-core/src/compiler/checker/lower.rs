//! Lowering of annotation syntax to semantic types

use super::types::{ObjectType, ParamType, PropType, Type};
use crate::compiler::parser::{FunctionTypeParam, TypeExpr, TypeLiteral, TypeMember};
use crate::kit::lexer::SourceSpan;
use std::rc::Rc;

/// Resolves the names a type expression refers to
pub trait TypeNames {
    type Error;

    /// A named type that is not a built-in
    fn named(&mut self, name: &str, args: Vec<Type>, span: SourceSpan) -> Result<Type, Self::Error>;

    /// `typeof name`
    fn query(&mut self, name: &str, span: SourceSpan) -> Result<Type, Self::Error>;
}

pub fn lower_type<N: TypeNames>(te: &TypeExpr, names: &mut N) -> Result<Type, N::Error> {
    Ok(match te {
        TypeExpr::Named { name, args, span } => {
            let mut lowered = Vec::with_capacity(args.len());
            for arg in args {
                lowered.push(lower_type(arg, names)?);
            }
            match builtin_named(name, &lowered) {
                Some(ty) => ty,
                None => names.named(name, lowered, *span)?,
            }
        }
        TypeExpr::Literal(lit) => match lit {
            TypeLiteral::Number(n) => Type::NumberLit(*n),
            TypeLiteral::String(s) => Type::StringLit(s.clone()),
            TypeLiteral::Bool(b) => Type::BoolLit(*b),
            TypeLiteral::Null => Type::Null,
            TypeLiteral::Void => Type::Void,
        },
        TypeExpr::Array(inner) => Type::array(lower_type(inner, names)?),
        TypeExpr::Tuple(items) => {
            let mut lowered = Vec::with_capacity(items.len());
            for item in items {
                lowered.push(lower_type(item, names)?);
            }
            Type::Tuple(lowered)
        }
        TypeExpr::Union(items) => {
            let mut lowered = Vec::with_capacity(items.len());
            for item in items {
                lowered.push(lower_type(item, names)?);
            }
            Type::union(lowered)
        }
        TypeExpr::Intersection(items) => {
            let mut lowered = Vec::with_capacity(items.len());
            for item in items {
                lowered.push(lower_type(item, names)?);
            }
            intersect(lowered)
        }
        TypeExpr::Object(members) => Type::Object(Rc::new(lower_members(members, names)?)),
        TypeExpr::Function { params, ret } => {
            let params = lower_params(params, names)?;
            let ret = lower_type(ret, names)?;
            Type::function(params, ret)
        }
        TypeExpr::Query(name, span) => names.query(name, *span)?,
        TypeExpr::Keyof(inner) => match lower_type(inner, names)? {
            Type::Object(obj) if obj.index.is_none() => {
                Type::union(obj.props.iter().map(|p| Type::StringLit(p.name.clone())))
            }
            _ => Type::String,
        },
    })
}

pub fn lower_members<N: TypeNames>(
    members: &[TypeMember],
    names: &mut N,
) -> Result<ObjectType, N::Error> {
    let mut obj = ObjectType::default();
    for member in members {
        match member {
            TypeMember::Property {
                name,
                ty,
                optional,
                readonly,
            } => obj.props.push(PropType {
                name: name.clone(),
                ty: lower_type(ty, names)?,
                optional: *optional,
                readonly: *readonly,
            }),
            TypeMember::Method {
                name,
                params,
                ret,
                optional,
            } => {
                let params = lower_params(params, names)?;
                let ret = lower_type(ret, names)?;
                obj.props.push(PropType {
                    name: name.clone(),
                    ty: Type::function(params, ret),
                    optional: *optional,
                    readonly: false,
                });
            }
            TypeMember::Index { value, .. } => obj.index = Some(lower_type(value, names)?),
        }
    }
    Ok(obj)
}

pub fn lower_params<N: TypeNames>(
    params: &[FunctionTypeParam],
    names: &mut N,
) -> Result<Vec<ParamType>, N::Error> {
    let mut lowered = Vec::with_capacity(params.len());
    for param in params {
        let ty = match &param.ty {
            Some(ty) => lower_type(ty, names)?,
            None if param.rest => Type::array(Type::Any),
            None => Type::Any,
        };
        lowered.push(ParamType {
            name: param.name.clone(),
            ty,
            optional: param.optional,
            rest: param.rest,
        });
    }
    Ok(lowered)
}

/// Names every scope knows
fn builtin_named(name: &str, args: &[Type]) -> Option<Type> {
    let first = || args.first().cloned().unwrap_or(Type::Any);
    Some(match name {
        "any" => Type::Any,
        "unknown" => Type::Unknown,
        "never" => Type::Never,
        "void" => Type::Void,
        "undefined" => Type::Undefined,
        "null" => Type::Null,
        "number" => Type::Number,
        "string" => Type::String,
        "boolean" => Type::Boolean,
        // `const` assertions keep the expression type; handled by the checker
        "const" => Type::Any,
        "object" | "Object" => Type::object(Vec::new()),
        "Function" => Type::function(
            vec![ParamType {
                name: Rc::from("args"),
                ty: Type::array(Type::Any),
                optional: false,
                rest: true,
            }],
            Type::Any,
        ),
        "Error" | "TypeError" | "RangeError" | "ReferenceError" | "SyntaxError" => Type::Error,
        "Array" | "ReadonlyArray" => Type::array(first()),
        "Promise" => Type::Promise(Box::new(first())),
        "Record" => Type::Object(Rc::new(ObjectType {
            index: Some(args.get(1).cloned().unwrap_or(Type::Any)),
            ..ObjectType::default()
        })),
        "Partial" => map_props(first(), |p| PropType {
            optional: true,
            ..p.clone()
        }),
        "Required" => map_props(first(), |p| PropType {
            optional: false,
            ..p.clone()
        }),
        "Readonly" => map_props(first(), |p| PropType {
            readonly: true,
            ..p.clone()
        }),
        "NonNullable" => first().non_nullable(),
        "ReturnType" => match first() {
            Type::Function(f) => f.ret.clone(),
            _ => Type::Any,
        },
        _ => return None,
    })
}

fn map_props(ty: Type, f: impl Fn(&PropType) -> PropType) -> Type {
    match ty {
        Type::Object(obj) => Type::Object(Rc::new(ObjectType {
            name: None,
            props: obj.props.iter().map(f).collect(),
            ..(*obj).clone()
        })),
        other => other,
    }
}

/// `A & B` for object shapes merges their properties; anything else is approximated
fn intersect(members: Vec<Type>) -> Type {
    if members.iter().all(|m| matches!(m, Type::Object(_))) {
        let mut merged = ObjectType::default();
        for member in &members {
            if let Type::Object(obj) = member {
                for prop in &obj.props {
                    merged.props.retain(|p| p.name != prop.name);
                    merged.props.push(prop.clone());
                }
                if obj.index.is_some() {
                    merged.index = obj.index.clone();
                }
            }
        }
        return Type::Object(Rc::new(merged));
    }
    members
        .into_iter()
        .find(|m| !matches!(m, Type::Any | Type::Unknown))
        .unwrap_or(Type::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::parse_type_text;
    use std::convert::Infallible;

    struct NoNames;

    impl TypeNames for NoNames {
        type Error = Infallible;

        fn named(&mut self, _: &str, _: Vec<Type>, _: SourceSpan) -> Result<Type, Infallible> {
            Ok(Type::Any)
        }

        fn query(&mut self, _: &str, _: SourceSpan) -> Result<Type, Infallible> {
            Ok(Type::Any)
        }
    }

    fn lower(text: &str) -> Type {
        let te = parse_type_text(text).unwrap();
        match lower_type(&te, &mut NoNames) {
            Ok(ty) => ty,
            Err(never) => match never {},
        }
    }

    #[test]
    fn test_primitives_and_unions() {
        assert_eq!(lower("number"), Type::Number);
        assert_eq!(lower("string | undefined"), Type::union([Type::String, Type::Undefined]));
        assert_eq!(lower("Array<number>"), Type::array(Type::Number));
        assert_eq!(lower("number[][]"), Type::array(Type::array(Type::Number)));
    }

    #[test]
    fn test_function_type() {
        let ty = lower("(a: number, b?: string) => void");
        let Type::Function(f) = ty else {
            panic!("expected function type");
        };
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.required_count(), 1);
        assert_eq!(f.ret, Type::Void);
    }

    #[test]
    fn test_object_members() {
        let ty = lower("{ readonly x: number; y?: string; f(n: number): boolean }");
        let Type::Object(obj) = ty else {
            panic!("expected object type");
        };
        assert!(obj.prop("x").unwrap().readonly);
        assert!(obj.prop("y").unwrap().optional);
        assert!(matches!(obj.prop("f").unwrap().ty, Type::Function(_)));
    }

    #[test]
    fn test_intersection_merges_props() {
        let ty = lower("{ a: number } & { b: string }");
        let Type::Object(obj) = ty else {
            panic!("expected object type");
        };
        assert_eq!(obj.props.len(), 2);
    }
}
