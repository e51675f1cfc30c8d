//! `setTimeout`, `clearTimeout` and `queueMicrotask`

use super::{callback, Method};
use crate::runtime::error::ScriptResult;
use crate::runtime::event_loop::Job;
use crate::runtime::function::{arg, native};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::operators::to_number;
use crate::runtime::realm::Realm;
use crate::runtime::value::Value;
use std::time::Duration;

const GLOBALS: &[(&str, usize, Method)] = &[
    ("setTimeout", 2, set_timeout),
    ("clearTimeout", 1, clear_timeout),
    ("queueMicrotask", 1, queue_microtask),
];

pub fn install(realm: &mut Realm) {
    for (name, arity, f) in GLOBALS {
        realm.define_global(name, native(name, *arity, *f));
    }
}

/// Delay in milliseconds; NaN and negatives mean "as soon as possible"
fn delay(value: &Value) -> Duration {
    let ms = to_number(value);
    if ms.is_nan() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_millis(ms.min(u32::MAX as f64) as u64)
}

fn set_timeout(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let handler = callback(args, 0)?;
    let extra = args.get(2..).map(|a| a.to_vec()).unwrap_or_default();
    let id = interp
        .event_loop()
        .set_timeout(handler, extra, delay(&arg(args, 1)));
    Ok(Value::Number(id as f64))
}

fn clear_timeout(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let id = to_number(&arg(args, 0));
    if id.is_finite() && id > 0.0 && id.fract() == 0.0 {
        interp.event_loop().clear_timeout(id as u64);
    }
    Ok(Value::Undefined)
}

fn queue_microtask(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let task = callback(args, 0)?;
    interp.event_loop().enqueue_microtask(Job::Callback {
        callback: task,
        args: Vec::new(),
    });
    Ok(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_normalization() {
        assert_eq!(delay(&Value::Number(f64::NAN)), Duration::ZERO);
        assert_eq!(delay(&Value::Number(-5.0)), Duration::ZERO);
        assert_eq!(delay(&Value::Undefined), Duration::ZERO);
        assert_eq!(delay(&Value::Number(15.0)), Duration::from_millis(15));
    }
}
