//! Thrown values and the errors the sandbox reports

use super::operators::to_string;
use super::value::{ErrorKind, Object, ObjectKind, Value};
use thiserror::Error;

/// A script exception unwinding through Rust frames
#[derive(Debug, Clone)]
pub struct Throw {
    pub value: Value,
}

impl Throw {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The `message` of an Error object, otherwise the string conversion
    pub fn message(&self) -> String {
        thrown_message(&self.value)
    }

    /// `Name: message` for Error objects, the string conversion otherwise
    pub fn describe(&self) -> String {
        to_string(&self.value).to_string()
    }
}

pub type ScriptResult<T> = Result<T, Throw>;

/// A fresh Error object of the given kind
pub fn make_error(kind: ErrorKind, message: &str) -> Value {
    let err = Object::new(ObjectKind::Error(kind));
    if !message.is_empty() {
        err.set_hidden("message", Value::from(message));
    }
    let header = if message.is_empty() {
        kind.name().to_string()
    } else {
        format!("{}: {}", kind.name(), message)
    };
    err.set_hidden("stack", Value::from(format!("{}\n    at <anonymous>", header)));
    Value::Object(err)
}

/// Throw a fresh Error object
pub fn throw_error(kind: ErrorKind, message: impl AsRef<str>) -> Throw {
    Throw::new(make_error(kind, message.as_ref()))
}

pub fn type_error(message: impl AsRef<str>) -> Throw {
    throw_error(ErrorKind::TypeError, message)
}

pub fn range_error(message: impl AsRef<str>) -> Throw {
    throw_error(ErrorKind::RangeError, message)
}

pub fn thrown_message(value: &Value) -> String {
    if let Value::Object(obj) = value {
        if let ObjectKind::Error(_) = obj.kind {
            return obj
                .get_own("message")
                .map(|m| to_string(&m).to_string())
                .unwrap_or_default();
        }
    }
    to_string(value).to_string()
}

/// Why a sandboxed run did not complete
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// The executable text did not parse
    #[error("SyntaxError: {0}")]
    Syntax(String),
    /// A synchronous throw escaped the top level
    #[error("{0}")]
    Thrown(String),
}

impl RuntimeError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_of_error_object() {
        let err = Object::new(ObjectKind::Error(ErrorKind::Error));
        err.set_hidden("message", Value::from("boom"));
        let throw = Throw::new(Value::Object(err));
        assert_eq!(throw.message(), "boom");
        assert_eq!(throw.describe(), "Error: boom");
    }

    #[test]
    fn test_make_error_stack() {
        let err = make_error(ErrorKind::TypeError, "bad");
        let obj = err.as_object().unwrap();
        assert_eq!(
            obj.get_own("stack").and_then(|s| s.as_str().map(String::from)),
            Some("TypeError: bad\n    at <anonymous>".to_string())
        );
        assert!(obj.keys().is_empty());
    }

    #[test]
    fn test_message_of_plain_values() {
        assert_eq!(Throw::new(Value::from("oops")).message(), "oops");
        assert_eq!(Throw::new(Value::from(42.0)).message(), "42");
        assert_eq!(Throw::new(Value::Undefined).message(), "undefined");
    }

    #[test]
    fn test_runtime_error_display() {
        assert_eq!(
            RuntimeError::Syntax("Expression expected.".into()).to_string(),
            "SyntaxError: Expression expected."
        );
    }
}
