//! `Object` and the methods every object answers to

use super::{attach, methods, Method};
use crate::runtime::error::{type_error, ScriptResult};
use crate::runtime::function::{arg, constructor};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::operators::{to_property_key, to_string};
use crate::runtime::realm::{Proto, Realm};
use crate::runtime::value::{Object, Value};

const STATICS: &[(&str, usize, Method)] = &[
    ("keys", 1, keys),
    ("values", 1, values),
    ("entries", 1, entries),
    ("assign", 2, assign),
    ("freeze", 1, freeze),
    ("isFrozen", 1, is_frozen),
    ("fromEntries", 1, from_entries),
];

const PROTO: &[(&str, usize, Method)] = &[
    ("hasOwnProperty", 1, has_own_property),
    ("toString", 0, object_to_string),
];

pub fn install(realm: &mut Realm) {
    let ctor = constructor("Object", 1, |_, _, args| {
        Ok(match arg(args, 0) {
            value @ Value::Object(_) => value,
            _ => Value::Object(Object::plain()),
        })
    });
    attach(&ctor, STATICS);
    realm.define_global("Object", Value::Object(ctor));
    realm.define_methods(Proto::Object, methods(PROTO));
}

fn require_object(value: &Value, method: &str) -> ScriptResult<()> {
    if value.is_nullish() {
        return Err(type_error(format!(
            "Cannot convert undefined or null to object (Object.{})",
            method
        )));
    }
    Ok(())
}

/// Enumerable own keys of any value, strings included
fn own_keys(value: &Value) -> Vec<std::rc::Rc<str>> {
    match value {
        Value::Object(obj) => obj.keys(),
        Value::String(s) => (0..s.encode_utf16().count()).map(|i| i.to_string().into()).collect(),
        _ => Vec::new(),
    }
}

fn keys(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let target = arg(args, 0);
    require_object(&target, "keys")?;
    let keys = own_keys(&target).into_iter().map(Value::String).collect();
    Ok(Value::Object(Object::array(keys)))
}

fn values(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let target = arg(args, 0);
    require_object(&target, "values")?;
    let mut out = Vec::new();
    for key in own_keys(&target) {
        out.push(interp.get_property(&target, &key)?);
    }
    Ok(Value::Object(Object::array(out)))
}

fn entries(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let target = arg(args, 0);
    require_object(&target, "entries")?;
    let mut out = Vec::new();
    for key in own_keys(&target) {
        let value = interp.get_property(&target, &key)?;
        out.push(Value::Object(Object::array(vec![Value::String(key), value])));
    }
    Ok(Value::Object(Object::array(out)))
}

fn assign(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let target = arg(args, 0);
    require_object(&target, "assign")?;
    for source in args.iter().skip(1) {
        interp.copy_own(source, &target)?;
    }
    Ok(target)
}

fn freeze(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let target = arg(args, 0);
    if let Value::Object(obj) = &target {
        obj.freeze();
    }
    Ok(target)
}

fn is_frozen(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(match arg(args, 0) {
        Value::Object(obj) => obj.is_frozen(),
        _ => true,
    }))
}

fn from_entries(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let obj = Object::plain();
    for entry in interp.iterate(&arg(args, 0))? {
        let key = interp.get_property(&entry, "0")?;
        let value = interp.get_property(&entry, "1")?;
        obj.set(to_property_key(&key), value);
    }
    Ok(Value::Object(obj))
}

fn has_own_property(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let key = to_property_key(&arg(args, 0));
    Ok(Value::Bool(match this {
        Value::Object(obj) => obj.has_own(&key),
        _ => false,
    }))
}

fn object_to_string(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::String(to_string(this)))
}
