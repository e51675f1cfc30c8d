//! The `JSON` namespace, backed by serde_json

use super::{attach, Method};
use crate::runtime::error::{range_error, throw_error, type_error, ScriptResult};
use crate::runtime::function::arg;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::operators::{to_integer, to_string};
use crate::runtime::realm::Realm;
use crate::runtime::structure::{from_json, stringify as write_json, to_structure};
use crate::runtime::value::{ErrorKind, Object, Value};
use tinker_output::StructureError;

const FUNCTIONS: &[(&str, usize, Method)] = &[("parse", 2, parse), ("stringify", 3, stringify)];

pub fn install(realm: &mut Realm) {
    let json = Object::plain();
    attach(&json, FUNCTIONS);
    json.freeze();
    realm.define_global("JSON", Value::Object(json));
}

fn parse(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let text = to_string(&arg(args, 0));
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => Ok(from_json(&json)),
        Err(err) => Err(throw_error(
            ErrorKind::SyntaxError,
            format!(
                "Unexpected token in JSON at line {} column {}",
                err.line(),
                err.column()
            ),
        )),
    }
}

/// Indentation from the `space` argument: a count (capped at 10) or a prefix
fn indent(space: &Value) -> String {
    match space {
        Value::Number(_) => " ".repeat(to_integer(space).clamp(0.0, 10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    }
}

fn stringify(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let value = arg(args, 0);
    match to_structure(&value) {
        Ok(Some(json)) => Ok(Value::from(write_json(&json, &indent(&arg(args, 2))))),
        Ok(None) => Ok(Value::Undefined),
        Err(err @ StructureError::TooDeep) => Err(range_error(err.to_string())),
        // the circular case reads "Converting circular structure to JSON"
        Err(err) => Err(type_error(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_forms() {
        assert_eq!(indent(&Value::Number(2.0)), "  ");
        assert_eq!(indent(&Value::Number(40.0)).len(), 10);
        assert_eq!(indent(&Value::from("\t")), "\t");
        assert_eq!(indent(&Value::Undefined), "");
    }
}
