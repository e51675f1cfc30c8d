//! The `Math` namespace

use super::{attach, Method};
use crate::runtime::error::ScriptResult;
use crate::runtime::function::arg;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::operators::to_number;
use crate::runtime::realm::Realm;
use crate::runtime::value::{Object, Value};
use rand::Rng;

const CONSTANTS: &[(&str, f64)] = &[
    ("PI", std::f64::consts::PI),
    ("E", std::f64::consts::E),
    ("LN2", std::f64::consts::LN_2),
    ("LN10", std::f64::consts::LN_10),
    ("SQRT2", std::f64::consts::SQRT_2),
];

const FUNCTIONS: &[(&str, usize, Method)] = &[
    ("abs", 1, abs_fn),
    ("floor", 1, floor_fn),
    ("ceil", 1, ceil_fn),
    ("round", 1, round_fn),
    ("trunc", 1, trunc_fn),
    ("sign", 1, sign_fn),
    ("sqrt", 1, sqrt_fn),
    ("cbrt", 1, cbrt_fn),
    ("exp", 1, exp_fn),
    ("log", 1, log_fn),
    ("log2", 1, log2_fn),
    ("log10", 1, log10_fn),
    ("sin", 1, sin_fn),
    ("cos", 1, cos_fn),
    ("tan", 1, tan_fn),
    ("atan", 1, atan_fn),
    ("atan2", 2, atan2),
    ("pow", 2, pow),
    ("random", 0, random),
    ("max", 2, max),
    ("min", 2, min),
    ("hypot", 2, hypot),
];

pub fn install(realm: &mut Realm) {
    let math = Object::plain();
    for (name, value) in CONSTANTS {
        math.set_hidden(*name, Value::Number(*value));
    }
    attach(&math, FUNCTIONS);
    math.freeze();
    realm.define_global("Math", Value::Object(math));
}

/// Native wrappers applying an `f64 -> f64` function to the first argument
macro_rules! unary {
    ($($name:ident => $f:expr),* $(,)?) => {
        $(
            fn $name(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
                let f: fn(f64) -> f64 = $f;
                Ok(Value::Number(f(to_number(&arg(args, 0)))))
            }
        )*
    };
}

unary! {
    abs_fn => f64::abs,
    floor_fn => f64::floor,
    ceil_fn => f64::ceil,
    round_fn => round,
    trunc_fn => f64::trunc,
    sign_fn => sign,
    sqrt_fn => f64::sqrt,
    cbrt_fn => f64::cbrt,
    exp_fn => f64::exp,
    log_fn => f64::ln,
    log2_fn => f64::log2,
    log10_fn => f64::log10,
    sin_fn => f64::sin,
    cos_fn => f64::cos,
    tan_fn => f64::tan,
    atan_fn => f64::atan,
}

/// Halves round toward positive infinity
fn round(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn numbers(args: &[Value]) -> Vec<f64> {
    args.iter().map(to_number).collect()
}

fn atan2(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let y = to_number(&arg(args, 0));
    let x = to_number(&arg(args, 1));
    Ok(Value::Number(y.atan2(x)))
}

fn pow(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let base = to_number(&arg(args, 0));
    let exponent = to_number(&arg(args, 1));
    // 1 ** NaN and (+-1) ** +-Infinity are NaN in script semantics
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(base.powf(exponent)))
}

fn random(_: &mut Interpreter, _: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Number(rand::thread_rng().gen::<f64>()))
}

fn max(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let values = numbers(args);
    if values.iter().any(|n| n.is_nan()) {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(values.into_iter().fold(f64::NEG_INFINITY, f64::max)))
}

fn min(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let values = numbers(args);
    if values.iter().any(|n| n.is_nan()) {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(values.into_iter().fold(f64::INFINITY, f64::min)))
}

fn hypot(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let values = numbers(args);
    if values.iter().any(|n| n.is_infinite()) {
        return Ok(Value::Number(f64::INFINITY));
    }
    Ok(Value::Number(values.iter().map(|n| n * n).sum::<f64>().sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_halves_up() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(-2.6), -3.0);
        assert_eq!(round(0.4), 0.0);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(-3.0), -1.0);
        assert_eq!(sign(0.0), 0.0);
        assert!(sign(f64::NAN).is_nan());
    }
}
