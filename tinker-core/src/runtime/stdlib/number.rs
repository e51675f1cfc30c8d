//! `Number`, `Boolean` and the numeric global functions

use super::{attach, methods, Method};
use crate::kit::number::format_number;
use crate::runtime::error::{range_error, type_error, ScriptResult};
use crate::runtime::function::{arg, native, native_object};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::operators::{to_integer, to_number, to_string};
use crate::runtime::realm::{Proto, Realm};
use crate::runtime::value::Value;
use std::rc::Rc;

const NUMBER_STATICS: &[(&str, usize, Method)] = &[
    ("isInteger", 1, is_integer),
    ("isSafeInteger", 1, is_safe_integer),
    ("isFinite", 1, number_is_finite),
    ("isNaN", 1, number_is_nan),
    ("parseFloat", 1, parse_float),
    ("parseInt", 2, parse_int),
];

const NUMBER_CONSTANTS: &[(&str, f64)] = &[
    ("MAX_SAFE_INTEGER", 9_007_199_254_740_991.0),
    ("MIN_SAFE_INTEGER", -9_007_199_254_740_991.0),
    ("EPSILON", f64::EPSILON),
    ("MAX_VALUE", f64::MAX),
    ("MIN_VALUE", 5e-324),
    ("POSITIVE_INFINITY", f64::INFINITY),
    ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
    ("NaN", f64::NAN),
];

const NUMBER_PROTO: &[(&str, usize, Method)] = &[
    ("toFixed", 1, to_fixed),
    ("toPrecision", 1, to_precision),
    ("toString", 1, number_to_string),
    ("valueOf", 0, number_value_of),
];

const BOOLEAN_PROTO: &[(&str, usize, Method)] = &[
    ("toString", 0, boolean_to_string),
    ("valueOf", 0, boolean_value_of),
];

const GLOBALS: &[(&str, usize, Method)] = &[
    ("parseInt", 2, parse_int),
    ("parseFloat", 1, parse_float),
    ("isNaN", 1, global_is_nan),
    ("isFinite", 1, global_is_finite),
];

pub fn install(realm: &mut Realm) {
    let number = native_object("Number", 1, Rc::new(to_number_fn), None);
    attach(&number, NUMBER_STATICS);
    for (name, value) in NUMBER_CONSTANTS {
        number.set_hidden(*name, Value::Number(*value));
    }
    number.freeze();
    realm.define_global("Number", Value::Object(number));
    realm.define_methods(Proto::Number, methods(NUMBER_PROTO));

    let boolean = native_object("Boolean", 1, Rc::new(to_boolean_fn), None);
    realm.define_global("Boolean", Value::Object(boolean));
    realm.define_methods(Proto::Boolean, methods(BOOLEAN_PROTO));

    for (name, arity, f) in GLOBALS {
        realm.define_global(name, native(name, *arity, *f));
    }
}

fn to_number_fn(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Number(args.first().map(to_number).unwrap_or(0.0)))
}

fn to_boolean_fn(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(arg(args, 0).truthy()))
}

fn is_integer(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_finite() && n.fract() == 0.0)))
}

fn is_safe_integer(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(matches!(
        arg(args, 0),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_991.0
    )))
}

fn number_is_finite(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_finite())))
}

fn number_is_nan(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_nan())))
}

fn global_is_nan(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(to_number(&arg(args, 0)).is_nan()))
}

fn global_is_finite(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(to_number(&arg(args, 0)).is_finite()))
}

fn parse_int(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let text = to_string(&arg(args, 0));
    let radix = match arg(args, 1) {
        Value::Undefined => 0,
        other => crate::runtime::operators::to_int32(&other),
    };
    Ok(Value::Number(parse_int_text(&text, radix)))
}

/// `parseInt` on already-converted arguments
pub fn parse_int_text(text: &str, radix: i32) -> f64 {
    let text = text.trim_start();
    let (sign, mut rest) = match text.as_bytes().first() {
        Some(b'-') => (-1.0, &text[1..]),
        Some(b'+') => (1.0, &text[1..]),
        _ => (1.0, text),
    };
    let mut radix = radix;
    let has_prefix = rest.starts_with("0x") || rest.starts_with("0X");
    if radix == 0 {
        radix = if has_prefix { 16 } else { 10 };
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if radix == 16 && has_prefix {
        rest = &rest[2..];
    }
    let digits: Vec<u32> = rest
        .chars()
        .map_while(|c| c.to_digit(radix as u32))
        .collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .into_iter()
        .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
    sign * value
}

fn parse_float(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Number(parse_float_text(&to_string(&arg(args, 0)))))
}

/// Longest decimal literal prefix of `text`, or NaN
pub fn parse_float_text(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if text[end..].starts_with("Infinity") {
        let sign = if bytes.first() == Some(&b'-') { -1.0 } else { 1.0 };
        return sign * f64::INFINITY;
    }
    let digits_from = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_from;
    if end < bytes.len() && bytes[end] == b'.' {
        let dot = end;
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        mantissa_digits += end - dot - 1;
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    let literal = text[..end].trim_end_matches('.');
    let literal = if literal.ends_with(['+', '-']) || literal.is_empty() {
        "0"
    } else {
        literal
    };
    literal.parse::<f64>().unwrap_or(f64::NAN)
}

fn this_number(this: &Value, method: &str) -> ScriptResult<f64> {
    this.as_number().ok_or_else(|| {
        type_error(format!(
            "Number.prototype.{} requires that 'this' be a Number",
            method
        ))
    })
}

/// Add one unit in the last place of a plain decimal digit string
fn increment_decimal(digits: &str) -> String {
    let mut bytes: Vec<u8> = digits.bytes().collect();
    let mut i = bytes.len();
    loop {
        if i == 0 {
            bytes.insert(0, b'1');
            break;
        }
        i -= 1;
        match bytes[i] {
            b'.' => continue,
            b'9' => bytes[i] = b'0',
            d => {
                bytes[i] = d + 1;
                break;
            }
        }
    }
    String::from_utf8(bytes).unwrap_or_default()
}

/// Fixed-point form rounding exact ties away from zero
pub fn fixed(n: f64, digits: usize) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.abs() >= 1e21 || n.is_infinite() {
        return format_number(n);
    }
    let abs = n.abs();
    let rounded = format!("{:.*}", digits, abs);
    // exact digits well past the cut show whether the value sits on a tie
    let exact = format!("{:.*}", digits + 30, abs);
    let cut = exact.len() - 30;
    let tail = &exact[cut..];
    let tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');
    let body = if tie {
        increment_decimal(exact[..cut].trim_end_matches('.'))
    } else {
        rounded
    };
    if n < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

fn to_fixed(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let n = this_number(this, "toFixed")?;
    let digits = to_integer(&arg(args, 0));
    if !(0.0..=100.0).contains(&digits) {
        return Err(range_error("toFixed() digits argument must be between 0 and 100"));
    }
    Ok(Value::from(fixed(n, digits as usize)))
}

fn to_precision(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let n = this_number(this, "toPrecision")?;
    let precision = arg(args, 0);
    if precision.is_undefined() || !n.is_finite() {
        return Ok(Value::from(format_number(n)));
    }
    let p = to_integer(&precision);
    if !(1.0..=100.0).contains(&p) {
        return Err(range_error("toPrecision() argument must be between 1 and 100"));
    }
    Ok(Value::from(precision_text(n, p as usize)))
}

pub fn precision_text(n: f64, p: usize) -> String {
    if n == 0.0 {
        return if p == 1 { "0".to_string() } else { format!("0.{}", "0".repeat(p - 1)) };
    }
    let sci = format!("{:.*e}", p - 1, n);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
    let e: i64 = exponent.parse().unwrap_or(0);
    if e < -6 || e >= p as i64 {
        let sign = if e < 0 { '-' } else { '+' };
        return format!("{}e{}{}", mantissa, sign, e.abs());
    }
    format!("{:.*}", (p as i64 - 1 - e) as usize, n)
}

fn number_to_string(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let n = this_number(this, "toString")?;
    let radix = match arg(args, 0) {
        Value::Undefined => 10.0,
        other => to_integer(&other),
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(range_error("toString() radix must be between 2 and 36"));
    }
    if radix == 10.0 || !n.is_finite() {
        return Ok(Value::from(format_number(n)));
    }
    Ok(Value::from(radix_text(n, radix as u32)))
}

/// Digits of `n` in base `radix`, fraction cut at 20 places
pub fn radix_text(n: f64, radix: u32) -> String {
    let digit = |d: u32| std::char::from_digit(d, radix).unwrap_or('0');
    let abs = n.abs();
    let mut int = abs.trunc();
    let mut frac = abs - int;
    let mut int_digits = Vec::new();
    if int == 0.0 {
        int_digits.push('0');
    }
    while int >= 1.0 {
        int_digits.push(digit((int % radix as f64) as u32));
        int = (int / radix as f64).trunc();
    }
    int_digits.reverse();
    let mut out: String = int_digits.into_iter().collect();
    if frac > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac *= radix as f64;
            let d = frac.trunc();
            out.push(digit(d as u32));
            frac -= d;
            if frac == 0.0 {
                break;
            }
        }
    }
    if n < 0.0 {
        out.insert(0, '-');
    }
    out
}

fn number_value_of(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Number(this_number(this, "valueOf")?))
}

fn this_bool(this: &Value, method: &str) -> ScriptResult<bool> {
    match this {
        Value::Bool(b) => Ok(*b),
        _ => Err(type_error(format!(
            "Boolean.prototype.{} requires that 'this' be a Boolean",
            method
        ))),
    }
}

fn boolean_to_string(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(if this_bool(this, "toString")? { "true" } else { "false" }))
}

fn boolean_value_of(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(this_bool(this, "valueOf")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_rounds_ties_away_from_zero() {
        assert_eq!(fixed(2.5, 0), "3");
        assert_eq!(fixed(-2.5, 0), "-3");
        assert_eq!(fixed(1.005, 2), "1.00");
        assert_eq!(fixed(1.25, 1), "1.3");
        assert_eq!(fixed(3.14159, 2), "3.14");
        assert_eq!(fixed(9.995, 0), "10");
        assert_eq!(fixed(0.0, 2), "0.00");
        assert_eq!(fixed(-0.001, 2), "-0.00");
    }

    #[test]
    fn test_precision() {
        assert_eq!(precision_text(123.456, 4), "123.5");
        assert_eq!(precision_text(0.000123, 2), "0.00012");
        assert_eq!(precision_text(123456.0, 2), "1.2e+5");
        assert_eq!(precision_text(0.0, 3), "0.00");
    }

    #[test]
    fn test_radix() {
        assert_eq!(radix_text(255.0, 16), "ff");
        assert_eq!(radix_text(-10.0, 2), "-1010");
        assert_eq!(radix_text(0.5, 2), "0.1");
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int_text("42px", 0), 42.0);
        assert_eq!(parse_int_text("  -0x1F", 0), -31.0);
        assert_eq!(parse_int_text("101", 2), 5.0);
        assert!(parse_int_text("abc", 10).is_nan());
        assert!(parse_int_text("1", 40).is_nan());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float_text("3.14abc"), 3.14);
        assert_eq!(parse_float_text(" .5"), 0.5);
        assert_eq!(parse_float_text("1e3x"), 1000.0);
        assert_eq!(parse_float_text("1e"), 1.0);
        assert_eq!(parse_float_text("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float_text("x1").is_nan());
    }
}
