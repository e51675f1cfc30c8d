//! Host globals available to every run
//!
//! Each submodule installs one family of globals and the methods its values
//! answer to. Everything here is implemented natively; scripts cannot tell a
//! built-in from a user function except through its source text.

pub mod array;
pub mod error;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod promise;
pub mod string;
pub mod timers;

use super::error::{type_error, ScriptResult};
use super::function::native;
use super::interpreter::Interpreter;
use super::realm::Realm;
use super::value::{ObjectRef, Value};
use std::rc::Rc;

/// Every global name a fresh realm defines
pub const GLOBAL_NAMES: [&str; 23] = [
    "Math",
    "JSON",
    "Object",
    "Array",
    "Number",
    "String",
    "Boolean",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "Error",
    "TypeError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "Promise",
    "setTimeout",
    "clearTimeout",
    "queueMicrotask",
    "NaN",
    "Infinity",
    "undefined",
];

pub fn install(realm: &mut Realm) {
    realm.globals.declare(Rc::from("undefined"), false, Some(Value::Undefined));
    realm.globals.declare(Rc::from("NaN"), false, Some(Value::Number(f64::NAN)));
    realm
        .globals
        .declare(Rc::from("Infinity"), false, Some(Value::Number(f64::INFINITY)));
    object::install(realm);
    array::install(realm);
    string::install(realm);
    number::install(realm);
    math::install(realm);
    json::install(realm);
    error::install(realm);
    promise::install(realm);
    timers::install(realm);
}

pub(crate) type Method = fn(&mut Interpreter, &Value, &[Value]) -> ScriptResult<Value>;

/// Build `(name, function)` pairs from a method table
pub(crate) fn methods(table: &[(&'static str, usize, Method)]) -> Vec<(&'static str, Value)> {
    table
        .iter()
        .map(|(name, arity, f)| (*name, native(name, *arity, *f)))
        .collect()
}

/// Attach functions as properties of a namespace or constructor object
pub(crate) fn attach(target: &ObjectRef, table: &[(&'static str, usize, Method)]) {
    for (name, arity, f) in table {
        target.set_hidden(*name, native(name, *arity, *f));
    }
}

/// The receiver's backing object when it has the expected kind
pub(crate) fn this_object<'a>(this: &'a Value, what: &str, method: &str) -> ScriptResult<&'a ObjectRef> {
    this.as_object().ok_or_else(|| {
        type_error(format!(
            "{}.prototype.{} called on incompatible receiver",
            what, method
        ))
    })
}

/// A callback argument, or the TypeError its absence deserves
pub(crate) fn callback(args: &[Value], i: usize) -> ScriptResult<Value> {
    let value = super::function::arg(args, i);
    if value.is_callable() {
        Ok(value)
    } else {
        Err(type_error(format!(
            "{} is not a function",
            super::interpreter::describe_value(&value)
        )))
    }
}
