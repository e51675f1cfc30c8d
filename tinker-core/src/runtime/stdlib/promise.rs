//! `Promise` constructor, combinators and prototype methods

use super::{attach, methods, Method};
use crate::runtime::error::{type_error, ScriptResult, Throw};
use crate::runtime::function::{arg, native, native_object};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::promise::{
    construct, new_promise, perform_then, promise_resolve, reject_promise, resolving_functions, then,
};
use crate::runtime::realm::{Proto, Realm};
use crate::runtime::value::{Object, ObjectRef, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const STATICS: &[(&str, usize, Method)] = &[
    ("resolve", 1, resolve),
    ("reject", 1, reject),
    ("all", 1, all),
    ("race", 1, race),
];

const PROTO: &[(&str, usize, Method)] = &[
    ("then", 2, then_method),
    ("catch", 1, catch_method),
    ("finally", 1, finally_method),
];

pub fn install(realm: &mut Realm) {
    let ctor = native_object(
        "Promise",
        1,
        Rc::new(call_without_new),
        Some(Rc::new(construct_promise)),
    );
    attach(&ctor, STATICS);
    realm.define_global("Promise", Value::Object(ctor));
    realm.define_methods(Proto::Promise, methods(PROTO));
}

fn call_without_new(_: &mut Interpreter, _: &Value, _: &[Value]) -> ScriptResult<Value> {
    Err(type_error("Promise constructor cannot be invoked without 'new'"))
}

fn construct_promise(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Object(construct(interp, &arg(args, 0))?))
}

fn this_promise<'a>(this: &'a Value, method: &str) -> ScriptResult<&'a ObjectRef> {
    match this {
        Value::Object(obj) if obj.is_promise() => Ok(obj),
        _ => Err(type_error(format!(
            "Method Promise.prototype.{} called on incompatible receiver {}",
            method,
            crate::runtime::operators::to_string(this)
        ))),
    }
}

fn resolve(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Object(promise_resolve(interp, arg(args, 0))))
}

fn reject(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let promise = new_promise();
    reject_promise(interp, &promise, arg(args, 0));
    Ok(Value::Object(promise))
}

fn all(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = interp.iterate(&arg(args, 0))?;
    let result = new_promise();
    let (resolve_all, reject_all) = resolving_functions(&result);
    if items.is_empty() {
        interp.call(&resolve_all, &Value::Undefined, &[Value::Object(Object::array(Vec::new()))])?;
        return Ok(Value::Object(result));
    }
    let values = Rc::new(RefCell::new(vec![Value::Undefined; items.len()]));
    let remaining = Rc::new(Cell::new(items.len()));
    for (index, item) in items.into_iter().enumerate() {
        let promise = promise_resolve(interp, item);
        let on_fulfilled = {
            let values = values.clone();
            let remaining = remaining.clone();
            let resolve_all = resolve_all.clone();
            native("", 1, move |interp, _, args| {
                values.borrow_mut()[index] = arg(args, 0);
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let collected = values.borrow().clone();
                    interp.call(&resolve_all, &Value::Undefined, &[Value::Object(Object::array(collected))])?;
                }
                Ok(Value::Undefined)
            })
        };
        perform_then(interp, &promise, on_fulfilled, reject_all.clone(), None);
    }
    Ok(Value::Object(result))
}

fn race(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = interp.iterate(&arg(args, 0))?;
    let result = new_promise();
    let (resolve_first, reject_first) = resolving_functions(&result);
    for item in items {
        let promise = promise_resolve(interp, item);
        perform_then(interp, &promise, resolve_first.clone(), reject_first.clone(), None);
    }
    Ok(Value::Object(result))
}

fn then_method(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let promise = this_promise(this, "then")?;
    Ok(Value::Object(then(interp, promise, arg(args, 0), arg(args, 1))))
}

fn catch_method(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let promise = this_promise(this, "catch")?;
    Ok(Value::Object(then(interp, promise, Value::Undefined, arg(args, 0))))
}

/// Run `on_finally`, then pass the original outcome through once its result settles
fn finally_method(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let promise = this_promise(this, "finally")?;
    let on_finally = arg(args, 0);
    if !on_finally.is_callable() {
        return Ok(Value::Object(then(interp, promise, on_finally.clone(), on_finally)));
    }
    let on_fulfilled = {
        let on_finally = on_finally.clone();
        native("", 1, move |interp, _, args| {
            let value = arg(args, 0);
            let result = interp.call(&on_finally, &Value::Undefined, &[])?;
            let waited = promise_resolve(interp, result);
            let pass = native("", 0, move |_, _, _| Ok(value.clone()));
            Ok(Value::Object(then(interp, &waited, pass, Value::Undefined)))
        })
    };
    let on_rejected = native("", 1, move |interp, _, args| {
        let reason = arg(args, 0);
        let result = interp.call(&on_finally, &Value::Undefined, &[])?;
        let waited = promise_resolve(interp, result);
        let rethrow = native("", 0, move |_, _, _| Err(Throw::new(reason.clone())));
        Ok(Value::Object(then(interp, &waited, rethrow, Value::Undefined)))
    });
    Ok(Value::Object(then(interp, promise, on_fulfilled, on_rejected)))
}
