//! `Array` and array methods

use super::{attach, callback, methods, this_object, Method};
use crate::runtime::error::{range_error, type_error, ScriptResult};
use crate::runtime::function::{arg, constructor};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::operators::{compare_strings, same_value_zero, strict_equals, to_integer, to_number, to_string};
use crate::runtime::realm::{Proto, Realm};
use crate::runtime::value::{Object, ObjectRef, Value};
use crate::kit::number::as_index;
use std::cell::RefCell;
use std::cmp::Ordering;

const STATICS: &[(&str, usize, Method)] = &[("isArray", 1, is_array), ("from", 1, from), ("of", 0, of)];

const PROTO: &[(&str, usize, Method)] = &[
    ("push", 1, push),
    ("pop", 0, pop),
    ("shift", 0, shift),
    ("unshift", 1, unshift),
    ("slice", 2, slice),
    ("splice", 2, splice),
    ("concat", 1, concat),
    ("join", 1, join),
    ("reverse", 0, reverse),
    ("indexOf", 1, index_of),
    ("lastIndexOf", 1, last_index_of),
    ("includes", 1, includes),
    ("at", 1, at),
    ("fill", 1, fill),
    ("sort", 1, sort),
    ("forEach", 1, for_each),
    ("map", 1, map),
    ("flatMap", 1, flat_map),
    ("filter", 1, filter),
    ("find", 1, find),
    ("findIndex", 1, find_index),
    ("some", 1, some),
    ("every", 1, every),
    ("reduce", 1, reduce),
    ("flat", 0, flat),
    ("keys", 0, keys),
    ("toString", 0, to_string_method),
];

pub fn install(realm: &mut Realm) {
    let ctor = constructor("Array", 1, |_, _, args| {
        if let [Value::Number(n)] = args {
            let Some(len) = as_index(*n) else {
                return Err(range_error("Invalid array length"));
            };
            return Ok(array(vec![Value::Undefined; len]));
        }
        Ok(array(args.to_vec()))
    });
    attach(&ctor, STATICS);
    realm.define_global("Array", Value::Object(ctor));
    realm.define_methods(Proto::Array, methods(PROTO));
}

pub(crate) fn array(items: Vec<Value>) -> Value {
    Value::Object(Object::array(items))
}

fn elements<'a>(this: &'a Value, method: &str) -> ScriptResult<&'a RefCell<Vec<Value>>> {
    this_object(this, "Array", method)?
        .elements()
        .ok_or_else(|| type_error(format!("Array.prototype.{} called on non-array", method)))
}

fn this_array<'a>(this: &'a Value, method: &str) -> ScriptResult<&'a ObjectRef> {
    let obj = this_object(this, "Array", method)?;
    if obj.is_array() {
        Ok(obj)
    } else {
        Err(type_error(format!("Array.prototype.{} called on non-array", method)))
    }
}

/// Resolve a relative index argument against `len` (negative counts from the end)
fn relative(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = to_integer(value);
    let len_f = len as f64;
    if n < 0.0 {
        (len_f + n).max(0.0) as usize
    } else {
        n.min(len_f) as usize
    }
}

fn writable(obj: &ObjectRef) -> bool {
    !obj.is_frozen()
}

fn is_array(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(arg(args, 0).is_array()))
}

fn from(interp: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let source = arg(args, 0);
    let items = match &source {
        Value::Object(obj) if !obj.is_array() => {
            // array-likes: anything with a numeric length
            let len = to_number(&interp.get_property(&source, "length")?);
            let len = as_index(len.max(0.0).trunc()).unwrap_or(0);
            let mut items = Vec::with_capacity(len);
            for i in 0..len {
                items.push(interp.get_property(&source, &i.to_string())?);
            }
            items
        }
        Value::Undefined | Value::Null => {
            return Err(type_error(format!("{} is not iterable", to_string(&source))))
        }
        Value::Object(_) | Value::String(_) => interp.iterate(&source)?,
        _ => Vec::new(),
    };
    let mapper = arg(args, 1);
    if mapper.is_undefined() {
        return Ok(array(items));
    }
    let mapper = callback(args, 1)?;
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        out.push(interp.call(&mapper, &Value::Undefined, &[item, Value::from(i)])?);
    }
    Ok(array(out))
}

fn of(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(array(args.to_vec()))
}

fn push(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let obj = this_array(this, "push")?;
    let items = elements(this, "push")?;
    if writable(obj) {
        items.borrow_mut().extend(args.iter().cloned());
    }
    Ok(Value::from(items.borrow().len()))
}

fn pop(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let obj = this_array(this, "pop")?;
    if !writable(obj) {
        return Ok(obj.element_values().last().cloned().unwrap_or_default());
    }
    Ok(elements(this, "pop")?.borrow_mut().pop().unwrap_or_default())
}

fn shift(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let obj = this_array(this, "shift")?;
    let items = elements(this, "shift")?;
    if items.borrow().is_empty() {
        return Ok(Value::Undefined);
    }
    if !writable(obj) {
        return Ok(items.borrow()[0].clone());
    }
    Ok(items.borrow_mut().remove(0))
}

fn unshift(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let obj = this_array(this, "unshift")?;
    let items = elements(this, "unshift")?;
    if writable(obj) {
        let mut items = items.borrow_mut();
        let tail = std::mem::take(&mut *items);
        items.extend(args.iter().cloned());
        items.extend(tail);
    }
    Ok(Value::from(items.borrow().len()))
}

fn slice(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = elements(this, "slice")?.borrow();
    let start = relative(&arg(args, 0), items.len(), 0);
    let end = relative(&arg(args, 1), items.len(), items.len());
    Ok(array(items.get(start..end.max(start)).map(|s| s.to_vec()).unwrap_or_default()))
}

fn splice(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let obj = this_array(this, "splice")?;
    let items = elements(this, "splice")?;
    let len = items.borrow().len();
    let start = relative(&arg(args, 0), len, 0);
    let delete = match args.len() {
        0 => 0,
        1 => len - start,
        _ => (to_integer(&args[1]).max(0.0) as usize).min(len - start),
    };
    if !writable(obj) {
        return Ok(array(Vec::new()));
    }
    let inserted = args.get(2..).map(|a| a.to_vec()).unwrap_or_default();
    let removed: Vec<Value> = items.borrow_mut().splice(start..start + delete, inserted).collect();
    Ok(array(removed))
}

fn concat(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut out = elements(this, "concat")?.borrow().clone();
    for item in args {
        match item.as_object().and_then(|o| o.elements()) {
            Some(inner) => out.extend(inner.borrow().iter().cloned()),
            None => out.push(item.clone()),
        }
    }
    Ok(array(out))
}

pub(crate) fn join_values(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                to_string(item).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn join(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let separator = match arg(args, 0) {
        Value::Undefined => ",".into(),
        other => to_string(&other),
    };
    let items = elements(this, "join")?.borrow().clone();
    Ok(Value::from(join_values(&items, &separator)))
}

fn reverse(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let obj = this_array(this, "reverse")?;
    if writable(obj) {
        elements(this, "reverse")?.borrow_mut().reverse();
    }
    Ok(this.clone())
}

fn index_of(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = elements(this, "indexOf")?.borrow();
    let target = arg(args, 0);
    let start = relative(&arg(args, 1), items.len(), 0);
    let found = items
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, item)| strict_equals(item, &target))
        .map(|(i, _)| i as f64);
    Ok(Value::Number(found.unwrap_or(-1.0)))
}

fn last_index_of(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = elements(this, "lastIndexOf")?.borrow();
    let target = arg(args, 0);
    let end = match args.get(1) {
        Some(from) => {
            let n = to_integer(from);
            if n < 0.0 {
                let i = items.len() as f64 + n;
                if i < 0.0 {
                    return Ok(Value::Number(-1.0));
                }
                i as usize
            } else {
                (n as usize).min(items.len().saturating_sub(1))
            }
        }
        None => items.len().saturating_sub(1),
    };
    if items.is_empty() {
        return Ok(Value::Number(-1.0));
    }
    let found = (0..=end).rev().find(|&i| strict_equals(&items[i], &target));
    Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
}

fn includes(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = elements(this, "includes")?.borrow();
    let target = arg(args, 0);
    let start = relative(&arg(args, 1), items.len(), 0);
    Ok(Value::Bool(items.iter().skip(start).any(|item| same_value_zero(item, &target))))
}

fn at(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = elements(this, "at")?.borrow();
    let n = to_integer(&arg(args, 0));
    let i = if n < 0.0 { items.len() as f64 + n } else { n };
    if i < 0.0 {
        return Ok(Value::Undefined);
    }
    Ok(items.get(i as usize).cloned().unwrap_or_default())
}

fn fill(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let obj = this_array(this, "fill")?;
    if writable(obj) {
        let mut items = elements(this, "fill")?.borrow_mut();
        let len = items.len();
        let start = relative(&arg(args, 1), len, 0);
        let end = relative(&arg(args, 2), len, len);
        let value = arg(args, 0);
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    }
    Ok(this.clone())
}

fn sort(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let obj = this_array(this, "sort")?;
    let comparator = arg(args, 0);
    if !comparator.is_undefined() && !comparator.is_callable() {
        return Err(type_error(
            "The comparison function must be either a function or undefined",
        ));
    }
    let items = obj.element_values();
    // undefined always sorts last and never reaches the comparator
    let (mut defined, undefined): (Vec<Value>, Vec<Value>) = items.into_iter().partition(|v| !v.is_undefined());
    let mut compare = |a: &Value, b: &Value| -> ScriptResult<Ordering> {
        if comparator.is_undefined() {
            return Ok(compare_strings(&to_string(a), &to_string(b)));
        }
        let result = to_number(&interp.call(&comparator, &Value::Undefined, &[a.clone(), b.clone()])?);
        Ok(if result < 0.0 {
            Ordering::Less
        } else if result > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        })
    };
    merge_sort(&mut defined, &mut compare)?;
    defined.extend(undefined);
    if writable(obj) {
        if let Some(cell) = obj.elements() {
            *cell.borrow_mut() = defined;
        }
    }
    Ok(this.clone())
}

/// Stable sort with a comparator that may throw
fn merge_sort<F>(items: &mut Vec<Value>, compare: &mut F) -> ScriptResult<()>
where
    F: FnMut(&Value, &Value) -> ScriptResult<Ordering>,
{
    if items.len() <= 1 {
        return Ok(());
    }
    let mut right = items.split_off(items.len() / 2);
    let mut left = std::mem::take(items);
    merge_sort(&mut left, compare)?;
    merge_sort(&mut right, compare)?;
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => compare(a, b)? == Ordering::Greater,
            _ => break,
        };
        if take_right {
            items.extend(right.next());
        } else {
            items.extend(left.next());
        }
    }
    items.extend(left);
    items.extend(right);
    Ok(())
}

/// Call `f(value, index, array)` for each element still present
fn each<F>(interp: &mut Interpreter, this: &Value, method: &str, args: &[Value], mut visit: F) -> ScriptResult<()>
where
    F: FnMut(usize, Value, Value) -> ScriptResult<bool>,
{
    let func = callback(args, 0)?;
    let items = elements(this, method)?;
    let len = items.borrow().len();
    for i in 0..len {
        let Some(item) = items.borrow().get(i).cloned() else {
            break;
        };
        let result = interp.call(&func, &Value::Undefined, &[item.clone(), Value::from(i), this.clone()])?;
        if !visit(i, item, result)? {
            break;
        }
    }
    Ok(())
}

fn for_each(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    each(interp, this, "forEach", args, |_, _, _| Ok(true))?;
    Ok(Value::Undefined)
}

fn map(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut out = Vec::new();
    each(interp, this, "map", args, |_, _, result| {
        out.push(result);
        Ok(true)
    })?;
    Ok(array(out))
}

fn flat_map(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut out = Vec::new();
    each(interp, this, "flatMap", args, |_, _, result| {
        match result.as_object().and_then(|o| o.elements()) {
            Some(inner) => out.extend(inner.borrow().iter().cloned()),
            None => out.push(result),
        }
        Ok(true)
    })?;
    Ok(array(out))
}

fn filter(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut out = Vec::new();
    each(interp, this, "filter", args, |_, item, result| {
        if result.truthy() {
            out.push(item);
        }
        Ok(true)
    })?;
    Ok(array(out))
}

fn find(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut found = Value::Undefined;
    each(interp, this, "find", args, |_, item, result| {
        if result.truthy() {
            found = item;
            return Ok(false);
        }
        Ok(true)
    })?;
    Ok(found)
}

fn find_index(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut found = -1.0;
    each(interp, this, "findIndex", args, |i, _, result| {
        if result.truthy() {
            found = i as f64;
            return Ok(false);
        }
        Ok(true)
    })?;
    Ok(Value::Number(found))
}

fn some(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut any = false;
    each(interp, this, "some", args, |_, _, result| {
        any = result.truthy();
        Ok(!any)
    })?;
    Ok(Value::Bool(any))
}

fn every(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut all = true;
    each(interp, this, "every", args, |_, _, result| {
        all = result.truthy();
        Ok(all)
    })?;
    Ok(Value::Bool(all))
}

fn reduce(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let func = callback(args, 0)?;
    let items = elements(this, "reduce")?;
    let len = items.borrow().len();
    let (mut acc, start) = match args.get(1) {
        Some(initial) => (initial.clone(), 0),
        None => match items.borrow().first() {
            Some(first) => (first.clone(), 1),
            None => return Err(type_error("Reduce of empty array with no initial value")),
        },
    };
    for i in start..len {
        let Some(item) = items.borrow().get(i).cloned() else {
            break;
        };
        acc = interp.call(&func, &Value::Undefined, &[acc, item, Value::from(i), this.clone()])?;
    }
    Ok(acc)
}

fn flatten_into(out: &mut Vec<Value>, items: &[Value], depth: f64) {
    for item in items {
        match item.as_object().and_then(|o| o.elements()) {
            Some(inner) if depth >= 1.0 => {
                let inner = inner.borrow().clone();
                flatten_into(out, &inner, depth - 1.0);
            }
            _ => out.push(item.clone()),
        }
    }
}

fn flat(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let depth = match arg(args, 0) {
        Value::Undefined => 1.0,
        other => to_integer(&other),
    };
    let items = elements(this, "flat")?.borrow().clone();
    let mut out = Vec::new();
    flatten_into(&mut out, &items, depth);
    Ok(array(out))
}

fn keys(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let len = elements(this, "keys")?.borrow().len();
    Ok(array((0..len).map(Value::from).collect()))
}

fn to_string_method(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::String(to_string(this)))
}
