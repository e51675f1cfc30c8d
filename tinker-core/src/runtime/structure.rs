//! Conversion between runtime values and JSON structures
//!
//! Shared by `JSON.stringify`/`JSON.parse` and the output sink's structured
//! rendering, so a logged object prints the way `JSON.stringify(v, null, 2)`
//! would.

use super::operators::to_string;
use super::value::{Object, ObjectKind, Value};
use crate::kit::number::format_number;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use serde_json::{Map, Number};
use std::borrow::Cow;
use std::io;
use std::rc::Rc;
use tinker_output::{OutputValue, StructureError, ValueKind};

/// Deepest array/object nesting converted before giving up
pub const MAX_VALUE_DEPTH: usize = 512;

/// JSON form of `value`; `None` for values JSON omits (undefined, functions)
pub fn to_structure(value: &Value) -> Result<Option<serde_json::Value>, StructureError> {
    let mut stack = Vec::new();
    structure(value, &mut stack)
}

fn structure(value: &Value, stack: &mut Vec<*const Object>) -> Result<Option<serde_json::Value>, StructureError> {
    Ok(Some(match value {
        Value::Undefined => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number(*n),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Object(obj) => {
            if obj.is_callable() {
                return Ok(None);
            }
            let ptr = Rc::as_ptr(obj);
            if stack.contains(&ptr) {
                return Err(StructureError::Circular);
            }
            if stack.len() >= MAX_VALUE_DEPTH {
                return Err(StructureError::TooDeep);
            }
            stack.push(ptr);
            let out = match &obj.kind {
                ObjectKind::Array(items) => {
                    let items = items.borrow().clone();
                    let mut out = Vec::with_capacity(items.len());
                    for item in &items {
                        out.push(structure(item, stack)?.unwrap_or(serde_json::Value::Null));
                    }
                    serde_json::Value::Array(out)
                }
                _ => {
                    let mut map = Map::new();
                    for key in obj.keys() {
                        let item = obj.get_own(&key).unwrap_or_default();
                        if let Some(json) = structure(&item, stack)? {
                            map.insert(key.to_string(), json);
                        }
                    }
                    serde_json::Value::Object(map)
                }
            };
            stack.pop();
            out
        }
    }))
}

/// Integral numbers print without a fraction; non-finite ones become null
fn number(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Runtime value for parsed JSON
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(items) => Value::Object(Object::array(items.iter().map(from_json).collect())),
        serde_json::Value::Object(map) => {
            let obj = Object::plain();
            for (key, item) in map {
                obj.set(key.as_str(), from_json(item));
            }
            Value::Object(obj)
        }
    }
}

/// Serialize with `indent` (empty for the compact form)
pub fn stringify(json: &serde_json::Value, indent: &str) -> String {
    let mut out = Vec::new();
    let written = if indent.is_empty() {
        serialize_with(json, &mut out, ScriptNumbers(CompactFormatter))
    } else {
        serialize_with(json, &mut out, ScriptNumbers(PrettyFormatter::with_indent(indent.as_bytes())))
    };
    match written {
        Ok(()) => String::from_utf8(out).unwrap_or_default(),
        Err(_) => json.to_string(),
    }
}

fn serialize_with<F: Formatter>(json: &serde_json::Value, out: &mut Vec<u8>, formatter: F) -> serde_json::Result<()> {
    let mut serializer = serde_json::Serializer::with_formatter(out, formatter);
    serde::Serialize::serialize(json, &mut serializer)
}

/// Layout from the wrapped formatter, floats as scripts print them
/// (`1e+21`, `0.000001`)
struct ScriptNumbers<F>(F);

impl<F: Formatter> Formatter for ScriptNumbers<F> {
    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(format_number(value).as_bytes())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }
}

impl OutputValue for Value {
    fn kind(&self) -> ValueKind<'_> {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Bool(_) | Value::Number(_) => ValueKind::Scalar(Cow::Owned(to_string(self).to_string())),
            Value::String(s) => ValueKind::Scalar(Cow::Borrowed(s)),
            Value::Object(obj) => match obj.callable() {
                Some(callable) => ValueKind::Function(Cow::Owned(callable.source_text())),
                None => ValueKind::Structured,
            },
        }
    }

    fn to_structure(&self) -> Result<serde_json::Value, StructureError> {
        to_structure(self)?.ok_or(StructureError::Unsupported)
    }

    fn to_structure_text(&self) -> Result<String, StructureError> {
        let structure = to_structure(self)?.ok_or(StructureError::Unsupported)?;
        Ok(stringify(&structure, "  "))
    }

    fn to_plain_string(&self) -> String {
        to_string(self).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::ErrorKind;
    use serde_json::json;
    use tinker_output::render_value;

    fn obj(pairs: &[(&str, Value)]) -> Value {
        let o = Object::plain();
        for (k, v) in pairs {
            o.set(*k, v.clone());
        }
        Value::Object(o)
    }

    #[test]
    fn test_structure_omits_undefined_members() {
        let value = obj(&[
            ("a", Value::from(1.0)),
            ("skip", Value::Undefined),
            ("n", Value::Number(f64::NAN)),
            ("list", Value::Object(Object::array(vec![Value::Undefined, Value::from(2.5)]))),
        ]);
        assert_eq!(
            to_structure(&value).unwrap(),
            Some(json!({"a": 1, "n": null, "list": [null, 2.5]}))
        );
    }

    #[test]
    fn test_cycles_are_detected() {
        let o = Object::plain();
        o.set("self", Value::Object(o.clone()));
        assert_eq!(to_structure(&Value::Object(o)), Err(StructureError::Circular));
    }

    fn nested_arrays(depth: usize) -> Value {
        let mut value = Value::Object(Object::array(Vec::new()));
        for _ in 0..depth {
            value = Value::Object(Object::array(vec![value]));
        }
        value
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        assert!(to_structure(&nested_arrays(MAX_VALUE_DEPTH - 1)).is_ok());
        assert_eq!(to_structure(&nested_arrays(100_000)), Err(StructureError::TooDeep));
    }

    #[test]
    fn test_deep_value_renders_plain_string() {
        // nested empty arrays flatten to an empty string
        assert_eq!(render_value(&nested_arrays(100_000)), "");
    }

    #[test]
    fn test_shared_references_are_not_cycles() {
        let shared = obj(&[("x", Value::from(1.0))]);
        let value = Value::Object(Object::array(vec![shared.clone(), shared]));
        assert_eq!(to_structure(&value).unwrap(), Some(json!([{"x": 1}, {"x": 1}])));
    }

    #[test]
    fn test_render_through_output_sink_rules() {
        let value = obj(&[("a", Value::from(1.0)), ("b", Value::from("x"))]);
        assert_eq!(render_value(&value), "{\n  \"a\": 1,\n  \"b\": \"x\"\n}");
        assert_eq!(render_value(&Value::from(0.5)), "0.5");
        assert_eq!(render_value(&Value::Undefined), "undefined");
        let err = crate::runtime::error::make_error(ErrorKind::Error, "boom");
        assert_eq!(render_value(&err), "{}");
    }

    #[test]
    fn test_cyclic_value_falls_back_to_plain_string() {
        let o = Object::plain();
        o.set("self", Value::Object(o.clone()));
        assert_eq!(render_value(&Value::Object(o)), "[object Object]");
    }

    #[test]
    fn test_from_json_keeps_key_order() {
        let parsed: serde_json::Value = serde_json::from_str(r#"{"z": 1, "a": [true, null]}"#).unwrap();
        let value = from_json(&parsed);
        let keys: Vec<String> = value.as_object().unwrap().keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_stringify_indent() {
        let json = json!({"a": [1]});
        assert_eq!(stringify(&json, ""), "{\"a\":[1]}");
        assert_eq!(stringify(&json, "    "), "{\n    \"a\": [\n        1\n    ]\n}");
    }

    #[test]
    fn test_floats_print_in_script_form() {
        let value = Value::Object(Object::array(vec![
            Value::from(1e21),
            Value::from(1e17),
            Value::from(0.000001),
            Value::from(-2.5),
        ]));
        let json = to_structure(&value).unwrap().unwrap();
        assert_eq!(stringify(&json, ""), "[1e+21,100000000000000000,0.000001,-2.5]");
        assert_eq!(render_value(&Value::Object(Object::array(vec![Value::from(1e21)]))), "[\n  1e+21\n]");
    }
}
