//! Structural assignability

use super::builtins::member_type;
use super::types::{FunctionType, ObjectType, Type};
use std::rc::Rc;

/// Can a value of `source` be stored where `target` is expected
pub fn is_assignable(source: &Type, target: &Type) -> bool {
    if source == target {
        return true;
    }
    match (source, target) {
        (_, Type::Any | Type::Unknown) => true,
        (Type::Any | Type::Never, _) => true,
        (Type::Union(members), _) => members.iter().all(|m| is_assignable(m, target)),
        (_, Type::Union(members)) => members.iter().any(|m| is_assignable(source, m)),
        (Type::Undefined, Type::Void) => true,
        (Type::NumberLit(_), Type::Number)
        | (Type::StringLit(_), Type::String)
        | (Type::BoolLit(_), Type::Boolean) => true,
        (Type::Array(a), Type::Array(b)) => is_assignable(a, b),
        (Type::Tuple(items), Type::Array(b)) => items.iter().all(|i| is_assignable(i, b)),
        (Type::Tuple(a), Type::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| is_assignable(x, y))
        }
        (Type::Promise(a), Type::Promise(b)) => is_assignable(a, b),
        (Type::Function(f), Type::Function(g)) => function_assignable(f, g),
        (Type::Object(obj), Type::Function(g)) => obj
            .call
            .as_ref()
            .is_some_and(|f| function_assignable(f, g)),
        (Type::Object(obj), Type::Error) => ["name", "message"]
            .iter()
            .all(|name| obj.prop(name).is_some_and(|p| is_assignable(&p.ty, &Type::String))),
        (_, Type::Object(obj)) => object_assignable(source, obj),
        _ => false,
    }
}

fn function_assignable(source: &FunctionType, target: &FunctionType) -> bool {
    // a source may ignore trailing parameters, never demand extra ones
    if !target.has_rest() && source.required_count() > target.params.len() {
        return false;
    }
    for (i, param) in source.params.iter().enumerate() {
        let Some(expected) = target.param_type(i) else {
            break;
        };
        let own = if param.rest {
            param.ty.element_type()
        } else {
            param.ty.clone()
        };
        // parameters are compared bivariantly
        if !is_assignable(&expected, &own) && !is_assignable(&own, &expected) {
            return false;
        }
    }
    matches!(target.ret, Type::Void) || is_assignable(&source.ret, &target.ret)
}

fn object_assignable(source: &Type, target: &ObjectType) -> bool {
    if source.is_nullish() || matches!(source, Type::Unknown) {
        return false;
    }
    if let Some(call) = &target.call {
        let callable = match source {
            Type::Function(f) => function_assignable(f, call),
            Type::Object(obj) => obj.call.as_ref().is_some_and(|f| function_assignable(f, call)),
            _ => false,
        };
        if !callable {
            return false;
        }
    }
    if missing_property(source, target).is_some() {
        return false;
    }
    for prop in &target.props {
        if let Some(actual) = property_type(source, &prop.name) {
            let expected = if prop.optional {
                Type::union([prop.ty.clone(), Type::Undefined])
            } else {
                prop.ty.clone()
            };
            if !is_assignable(&actual, &expected) {
                return false;
            }
        }
    }
    if let (Some(index), Type::Object(obj)) = (&target.index, source) {
        if !obj.props.iter().all(|p| is_assignable(&p.ty, index)) {
            return false;
        }
    }
    true
}

/// First required property of `target` that `source` lacks
pub fn missing_property(source: &Type, target: &ObjectType) -> Option<Rc<str>> {
    if matches!(source, Type::Any) {
        return None;
    }
    target
        .props
        .iter()
        .filter(|p| !p.optional)
        .find(|p| property_type(source, &p.name).is_none())
        .map(|p| p.name.clone())
}

/// Property type without optional widening, for structural comparison
fn property_type(source: &Type, name: &str) -> Option<Type> {
    match source {
        Type::Object(obj) => match obj.prop(name) {
            Some(prop) if prop.optional => Some(Type::union([prop.ty.clone(), Type::Undefined])),
            Some(prop) => Some(prop.ty.clone()),
            None => obj.index.clone(),
        },
        Type::Any => Some(Type::Any),
        other => member_type(other, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::checker::types::{ParamType, PropType};

    fn prop(name: &str, ty: Type, optional: bool) -> PropType {
        PropType {
            name: Rc::from(name),
            ty,
            optional,
            readonly: false,
        }
    }

    #[test]
    fn test_primitives() {
        assert!(is_assignable(&Type::NumberLit(1.0), &Type::Number));
        assert!(!is_assignable(&Type::String, &Type::Number));
        assert!(is_assignable(&Type::Undefined, &Type::union([Type::Number, Type::Undefined])));
        assert!(!is_assignable(&Type::union([Type::Number, Type::Undefined]), &Type::Number));
        assert!(is_assignable(&Type::Any, &Type::Number));
        assert!(!is_assignable(&Type::Unknown, &Type::Number));
    }

    #[test]
    fn test_structural_objects() {
        let point = ObjectType {
            props: vec![prop("x", Type::Number, false), prop("y", Type::Number, true)],
            ..ObjectType::default()
        };
        let only_x = Type::object(vec![prop("x", Type::Number, false)]);
        let only_y = Type::object(vec![prop("y", Type::Number, false)]);
        assert!(is_assignable(&only_x, &Type::Object(Rc::new(point.clone()))));
        assert_eq!(missing_property(&only_y, &point).as_deref(), Some("x"));
    }

    #[test]
    fn test_functions() {
        let takes_number = Type::function(vec![ParamType::new("n", Type::Number)], Type::Number);
        let no_params = Type::function(Vec::new(), Type::String);
        let callback = Type::function(vec![ParamType::new("n", Type::Number)], Type::Void);
        assert!(is_assignable(&no_params, &callback));
        assert!(is_assignable(&takes_number, &callback));
        let two = Type::function(
            vec![ParamType::new("a", Type::Number), ParamType::new("b", Type::Number)],
            Type::Void,
        );
        assert!(!is_assignable(&two, &callback));
    }

    #[test]
    fn test_arrays_and_tuples() {
        let tuple = Type::Tuple(vec![Type::NumberLit(1.0), Type::NumberLit(2.0)]);
        assert!(is_assignable(&tuple, &Type::array(Type::Number)));
        assert!(!is_assignable(&Type::array(Type::String), &Type::array(Type::Number)));
    }

    #[test]
    fn test_string_has_length() {
        let has_length = Type::object(vec![prop("length", Type::Number, false)]);
        assert!(is_assignable(&Type::String, &has_length));
    }
}
