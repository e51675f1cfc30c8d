//! `Error` and its subclasses

use super::{methods, Method};
use crate::runtime::error::{make_error, ScriptResult};
use crate::runtime::function::constructor;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::operators::to_string;
use crate::runtime::realm::{Proto, Realm};
use crate::runtime::value::{ErrorKind, Value};

const PROTO: &[(&str, usize, Method)] = &[("toString", 0, error_to_string)];

pub fn install(realm: &mut Realm) {
    for kind in ErrorKind::ALL {
        // `Error("x")` and `new Error("x")` behave the same
        let ctor = constructor(kind.name(), 1, move |_, _, args| {
            let message = match args.first() {
                None | Some(Value::Undefined) => String::new(),
                Some(value) => to_string(value).to_string(),
            };
            Ok(make_error(kind, &message))
        });
        realm.define_global(kind.name(), Value::Object(ctor));
    }
    realm.define_methods(Proto::Error, methods(PROTO));
}

fn error_to_string(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::String(to_string(this)))
}
