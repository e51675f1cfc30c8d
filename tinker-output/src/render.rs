//! Per-value rendering policy
//!
//! Each value is rendered independently, then the pieces are joined with a
//! single space:
//! - absence and null render as fixed labels
//! - functions render as their own source text
//! - structured values go through an indented JSON serializer, falling back
//!   to plain string conversion when serialization is impossible
//! - scalars use ordinary string conversion

use std::borrow::Cow;

/// Label for the absence sentinel
pub const UNDEFINED_LABEL: &str = "undefined";

/// Label for the null sentinel
pub const NULL_LABEL: &str = "null";

/// Rendering category of a value
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind<'a> {
    Undefined,
    Null,
    /// Printable source text of the function
    Function(Cow<'a, str>),
    /// Already converted scalar text
    Scalar(Cow<'a, str>),
    /// Needs the structural serializer
    Structured,
}

/// Why a structured value could not be serialized
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructureError {
    #[error("Converting circular structure to JSON")]
    Circular,
    #[error("Maximum nesting depth exceeded")]
    TooDeep,
    #[error("value has no structural representation")]
    Unsupported,
}

/// Anything the sink can render
pub trait OutputValue {
    fn kind(&self) -> ValueKind<'_>;

    /// Structural form used for [`ValueKind::Structured`] values
    fn to_structure(&self) -> Result<serde_json::Value, StructureError> {
        Err(StructureError::Unsupported)
    }

    /// Indented text of [`OutputValue::to_structure`]; implementors with
    /// their own number formatting override this
    fn to_structure_text(&self) -> Result<String, StructureError> {
        let structure = self.to_structure()?;
        serde_json::to_string_pretty(&structure).map_err(|_| StructureError::Unsupported)
    }

    /// Plain string conversion, used as the serializer fallback
    fn to_plain_string(&self) -> String;
}

impl OutputValue for str {
    fn kind(&self) -> ValueKind<'_> {
        ValueKind::Scalar(Cow::Borrowed(self))
    }

    fn to_plain_string(&self) -> String {
        self.to_string()
    }
}

impl OutputValue for String {
    fn kind(&self) -> ValueKind<'_> {
        ValueKind::Scalar(Cow::Borrowed(self.as_str()))
    }

    fn to_plain_string(&self) -> String {
        self.clone()
    }
}

impl<T: OutputValue + ?Sized> OutputValue for &T {
    fn kind(&self) -> ValueKind<'_> {
        (**self).kind()
    }

    fn to_structure(&self) -> Result<serde_json::Value, StructureError> {
        (**self).to_structure()
    }

    fn to_structure_text(&self) -> Result<String, StructureError> {
        (**self).to_structure_text()
    }

    fn to_plain_string(&self) -> String {
        (**self).to_plain_string()
    }
}

/// Render a single value
pub fn render_value<V: OutputValue + ?Sized>(value: &V) -> String {
    match value.kind() {
        ValueKind::Undefined => UNDEFINED_LABEL.to_string(),
        ValueKind::Null => NULL_LABEL.to_string(),
        ValueKind::Function(source) => source.into_owned(),
        ValueKind::Scalar(text) => text.into_owned(),
        ValueKind::Structured => match value.to_structure_text() {
            Ok(text) => text,
            Err(err) => {
                tracing::trace!(target: "tinker::output", %err, "falling back to plain conversion");
                value.to_plain_string()
            }
        },
    }
}

/// Render values independently and join them with single spaces
pub fn render_values<V: OutputValue>(values: &[V]) -> String {
    values
        .iter()
        .map(|v| render_value(v))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    enum Sample {
        Undefined,
        Null,
        Func(&'static str),
        Num(f64),
        Object(serde_json::Value),
        Cyclic,
    }

    impl OutputValue for Sample {
        fn kind(&self) -> ValueKind<'_> {
            match self {
                Sample::Undefined => ValueKind::Undefined,
                Sample::Null => ValueKind::Null,
                Sample::Func(src) => ValueKind::Function(Cow::Borrowed(src)),
                Sample::Num(n) => ValueKind::Scalar(Cow::Owned(n.to_string())),
                Sample::Object(_) | Sample::Cyclic => ValueKind::Structured,
            }
        }

        fn to_structure(&self) -> Result<serde_json::Value, StructureError> {
            match self {
                Sample::Object(v) => Ok(v.clone()),
                _ => Err(StructureError::Circular),
            }
        }

        fn to_plain_string(&self) -> String {
            "[object Object]".to_string()
        }
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(render_value(&Sample::Undefined), "undefined");
        assert_eq!(render_value(&Sample::Null), "null");
    }

    #[test]
    fn test_function_renders_source() {
        assert_eq!(render_value(&Sample::Func("(a) => a + 1")), "(a) => a + 1");
    }

    #[test]
    fn test_structured_is_indented() {
        let v = Sample::Object(json!({ "b": 1, "a": [true, null] }));
        assert_eq!(
            render_value(&v),
            "{\n  \"b\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}"
        );
    }

    #[test]
    fn test_cyclic_falls_back_to_plain() {
        assert_eq!(render_value(&Sample::Cyclic), "[object Object]");
    }

    #[test]
    fn test_values_are_space_joined() {
        let values = [Sample::Num(1.5), Sample::Undefined, Sample::Object(json!({}))];
        assert_eq!(render_values(&values), "1.5 undefined {}");
    }

    #[test]
    fn test_plain_strings() {
        assert_eq!(render_value("hi"), "hi");
        assert_eq!(render_values(&["a", "b"]), "a b");
    }
}
