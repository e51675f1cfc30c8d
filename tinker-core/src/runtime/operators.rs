//! Type conversions and operator semantics
//!
//! Conversions never call back into script code: objects convert through
//! their built-in string form, so a user-defined `toString` is not consulted.

use super::structure::MAX_VALUE_DEPTH;
use super::value::{Object, ObjectKind, Value};
use crate::compiler::parser::BinaryOp;
use crate::kit::number::format_number;
use std::cmp::Ordering;
use std::rc::Rc;

/// ECMAScript ToString
pub fn to_string(value: &Value) -> Rc<str> {
    match value {
        Value::Undefined => Rc::from("undefined"),
        Value::Null => Rc::from("null"),
        Value::Bool(b) => Rc::from(if *b { "true" } else { "false" }),
        Value::Number(n) => Rc::from(format_number(*n)),
        Value::String(s) => s.clone(),
        Value::Object(obj) => Rc::from(object_to_string(obj, &mut Vec::new())),
    }
}

fn object_to_string(obj: &Object, seen: &mut Vec<*const ()>) -> String {
    match &obj.kind {
        ObjectKind::Array(items) => {
            let ptr = obj as *const _ as *const ();
            if seen.contains(&ptr) || seen.len() >= MAX_VALUE_DEPTH {
                return String::new();
            }
            seen.push(ptr);
            let parts: Vec<String> = items
                .borrow()
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    Value::Object(inner) => object_to_string(inner, seen),
                    other => to_string(other).to_string(),
                })
                .collect();
            seen.pop();
            parts.join(",")
        }
        ObjectKind::Function(callable) => callable.source_text(),
        ObjectKind::Error(kind) => {
            let name = obj
                .get_own("name")
                .map(|n| to_string(&n).to_string())
                .unwrap_or_else(|| kind.name().to_string());
            let message = obj
                .get_own("message")
                .map(|m| to_string(&m).to_string())
                .unwrap_or_default();
            match (name.is_empty(), message.is_empty()) {
                (_, true) => name,
                (true, false) => message,
                (false, false) => format!("{}: {}", name, message),
            }
        }
        ObjectKind::Promise(_) => "[object Promise]".to_string(),
        ObjectKind::Plain => "[object Object]".to_string(),
    }
}

/// ECMAScript ToNumber
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Object(_) => string_to_number(&to_string(value)),
    }
}

/// StringToNumber: whitespace-trimmed numeric literal, empty is zero
pub fn string_to_number(s: &str) -> f64 {
    let text = s.trim();
    if text.is_empty() {
        return 0.0;
    }
    let (sign, unsigned) = match text.as_bytes()[0] {
        b'-' => (-1.0, &text[1..]),
        b'+' => (1.0, &text[1..]),
        _ => (1.0, text),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    let radix = match unsigned.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        // prefixed literals take no sign
        if sign < 0.0 || text.starts_with('+') {
            return f64::NAN;
        }
        return parse_radix_digits(&unsigned[2..], radix).unwrap_or(f64::NAN);
    }
    let valid = unsigned
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !valid || unsigned.starts_with(['e', 'E', '+', '-']) {
        return f64::NAN;
    }
    unsigned.parse::<f64>().map(|n| sign * n).unwrap_or(f64::NAN)
}

fn parse_radix_digits(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    let mut n = 0.0;
    for c in digits.chars() {
        n = n * radix as f64 + c.to_digit(radix)? as f64;
    }
    Some(n)
}

/// ECMAScript ToInt32
pub fn to_int32(value: &Value) -> i32 {
    to_uint32(value) as i32
}

/// ECMAScript ToUint32
pub fn to_uint32(value: &Value) -> u32 {
    let n = to_number(value);
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let m = n.trunc().rem_euclid(4_294_967_296.0);
    m as u32
}

/// Integer conversion used for indices and counts
pub fn to_integer(value: &Value) -> f64 {
    let n = to_number(value);
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

/// Property key form of a value
pub fn to_property_key(value: &Value) -> Rc<str> {
    to_string(value)
}

/// `===`
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// SameValueZero, used by `includes`
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_equals(a, b),
    }
}

/// `==`
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(a) == to_number(b)
        }
        (Value::Bool(_), _) => loose_equals(&Value::Number(to_number(a)), b),
        (_, Value::Bool(_)) => loose_equals(a, &Value::Number(to_number(b))),
        (Value::Object(_), Value::Object(_)) => strict_equals(a, b),
        (Value::Object(_), _) => loose_equals(&Value::String(to_string(a)), b),
        (_, Value::Object(_)) => loose_equals(a, &Value::String(to_string(b))),
        _ => strict_equals(a, b),
    }
}

/// Abstract relational comparison; `None` when either side is NaN
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    let pa = primitive(a);
    let pb = primitive(b);
    if let (Value::String(x), Value::String(y)) = (&pa, &pb) {
        return Some(compare_strings(x, y));
    }
    to_number(&pa).partial_cmp(&to_number(&pb))
}

/// Code-unit order, matching string `<`
pub fn compare_strings(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

fn primitive(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::String(to_string(value)),
        other => other.clone(),
    }
}

/// `+`: string concatenation when either primitive is a string
pub fn add(a: &Value, b: &Value) -> Value {
    let pa = primitive(a);
    let pb = primitive(b);
    if matches!(pa, Value::String(_)) || matches!(pb, Value::String(_)) {
        let mut out = to_string(&pa).to_string();
        out.push_str(&to_string(&pb));
        return Value::from(out);
    }
    Value::Number(to_number(&pa) + to_number(&pb))
}

/// Numeric binary operators; `None` for operators handled elsewhere
pub fn arithmetic(op: BinaryOp, a: &Value, b: &Value) -> Option<Value> {
    let n = match op {
        BinaryOp::Add => return Some(add(a, b)),
        BinaryOp::Sub => to_number(a) - to_number(b),
        BinaryOp::Mul => to_number(a) * to_number(b),
        BinaryOp::Div => to_number(a) / to_number(b),
        BinaryOp::Rem => remainder(to_number(a), to_number(b)),
        BinaryOp::Exp => power(to_number(a), to_number(b)),
        BinaryOp::Shl => (to_int32(a).wrapping_shl(to_uint32(b) & 31)) as f64,
        BinaryOp::Shr => (to_int32(a) >> (to_uint32(b) & 31)) as f64,
        BinaryOp::UShr => (to_uint32(a) >> (to_uint32(b) & 31)) as f64,
        BinaryOp::BitAnd => (to_int32(a) & to_int32(b)) as f64,
        BinaryOp::BitOr => (to_int32(a) | to_int32(b)) as f64,
        BinaryOp::BitXor => (to_int32(a) ^ to_int32(b)) as f64,
        _ => return None,
    };
    Some(Value::Number(n))
}

fn remainder(a: f64, b: f64) -> f64 {
    if b.is_infinite() && a.is_finite() {
        return a;
    }
    a % b
}

fn power(base: f64, exp: f64) -> f64 {
    // 1 ** NaN and (-1) ** Infinity are NaN, unlike powf
    if exp.is_nan() || (base.abs() == 1.0 && exp.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exp)
}

/// Comparison operators
pub fn relational(op: BinaryOp, a: &Value, b: &Value) -> Option<bool> {
    let result = match op {
        BinaryOp::Eq => loose_equals(a, b),
        BinaryOp::NotEq => !loose_equals(a, b),
        BinaryOp::StrictEq => strict_equals(a, b),
        BinaryOp::StrictNotEq => !strict_equals(a, b),
        BinaryOp::Lt => compare(a, b) == Some(Ordering::Less),
        BinaryOp::LtEq => matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Gt => compare(a, b) == Some(Ordering::Greater),
        BinaryOp::GtEq => matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal)),
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Object;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("NaN").is_nan());
    }

    #[test]
    fn test_add_concatenates() {
        assert_eq!(to_string(&add(&Value::from("a"), &num(1.0))).as_ref(), "a1");
        assert_eq!(add(&num(1.0), &Value::Bool(true)).as_number(), Some(2.0));
        let arr = Value::Object(Object::array(vec![num(1.0), num(2.0)]));
        assert_eq!(to_string(&add(&arr, &num(3.0))).as_ref(), "1,23");
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_equals(&Value::Null, &Value::Undefined));
        assert!(loose_equals(&num(1.0), &Value::from("1")));
        assert!(loose_equals(&Value::Bool(true), &num(1.0)));
        assert!(!loose_equals(&Value::Null, &num(0.0)));
        assert!(!strict_equals(&num(f64::NAN), &num(f64::NAN)));
        assert!(same_value_zero(&num(f64::NAN), &num(f64::NAN)));
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(arithmetic(BinaryOp::BitOr, &num(5.5), &num(0.0)).and_then(|v| v.as_number()), Some(5.0));
        assert_eq!(arithmetic(BinaryOp::UShr, &num(-1.0), &num(0.0)).and_then(|v| v.as_number()), Some(4294967295.0));
        assert_eq!(arithmetic(BinaryOp::Shl, &num(1.0), &num(33.0)).and_then(|v| v.as_number()), Some(2.0));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(relational(BinaryOp::Lt, &Value::from("a"), &Value::from("b")), Some(true));
        assert_eq!(relational(BinaryOp::Lt, &Value::from("10"), &num(9.0)), Some(false));
        assert_eq!(relational(BinaryOp::GtEq, &num(f64::NAN), &num(1.0)), Some(false));
    }

    #[test]
    fn test_object_strings() {
        assert_eq!(to_string(&Value::Object(Object::plain())).as_ref(), "[object Object]");
        let nested = Object::array(vec![Value::Null, Value::Object(Object::array(vec![num(1.0)]))]);
        assert_eq!(to_string(&Value::Object(nested)).as_ref(), ",1");
    }
}
