//! `String` and string methods
//!
//! Positions and lengths count UTF-16 code units, so strings are widened to
//! `Vec<u16>` whenever a method needs indices.

use super::array::array;
use super::{attach, Method};
use crate::runtime::error::{range_error, type_error, ScriptResult};
use crate::runtime::function::{arg, native_object};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::operators::{to_integer, to_string, to_uint32};
use crate::runtime::realm::{Proto, Realm};
use crate::runtime::value::Value;
use std::rc::Rc;

const STATICS: &[(&str, usize, Method)] = &[("fromCharCode", 1, from_char_code)];

const PROTO: &[(&str, usize, Method)] = &[
    ("charAt", 1, char_at),
    ("charCodeAt", 1, char_code_at),
    ("at", 1, at),
    ("indexOf", 1, index_of),
    ("lastIndexOf", 1, last_index_of),
    ("includes", 1, includes),
    ("startsWith", 1, starts_with),
    ("endsWith", 1, ends_with),
    ("slice", 2, slice),
    ("substring", 2, substring),
    ("toUpperCase", 0, to_upper_case),
    ("toLowerCase", 0, to_lower_case),
    ("trim", 0, trim),
    ("trimStart", 0, trim_start),
    ("trimEnd", 0, trim_end),
    ("split", 2, split),
    ("replace", 2, replace),
    ("replaceAll", 2, replace_all),
    ("repeat", 1, repeat),
    ("padStart", 2, pad_start),
    ("padEnd", 2, pad_end),
    ("concat", 1, concat),
    ("localeCompare", 1, locale_compare),
    ("toString", 0, value_of),
    ("valueOf", 0, value_of),
];

pub fn install(realm: &mut Realm) {
    let ctor = native_object("String", 1, Rc::new(convert), None);
    attach(&ctor, STATICS);
    realm.define_global("String", Value::Object(ctor));
    realm.define_methods(Proto::String, super::methods(PROTO));
}

/// `String(value)`; not a constructor
fn convert(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(match args.first() {
        Some(value) => Value::String(to_string(value)),
        None => Value::from(""),
    })
}

/// The code unit at `i` as a one-unit string
pub fn code_unit_string(s: &str, i: usize) -> Option<String> {
    s.encode_utf16()
        .nth(i)
        .map(|unit| String::from_utf16_lossy(&[unit]))
}

fn units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn from_units(units: &[u16]) -> Value {
    Value::from(String::from_utf16_lossy(units))
}

fn this_string(this: &Value, method: &str) -> ScriptResult<Rc<str>> {
    if this.is_nullish() {
        return Err(type_error(format!(
            "String.prototype.{} called on null or undefined",
            method
        )));
    }
    Ok(to_string(this))
}

/// Clamp a position argument into `0..=len`
fn clamp(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    to_integer(value).clamp(0.0, len as f64) as usize
}

/// Relative position: negative counts back from the end
fn relative(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = to_integer(value);
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn find(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= haystack.len()).then_some(from);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

fn rfind(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = (haystack.len() - needle.len()).min(from);
    (0..=last).rev().find(|&i| haystack[i..].starts_with(needle))
}

fn from_char_code(_: &mut Interpreter, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let codes: Vec<u16> = args.iter().map(|v| (to_uint32(v) & 0xFFFF) as u16).collect();
    Ok(from_units(&codes))
}

fn char_at(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this_string(this, "charAt")?;
    let i = to_integer(&arg(args, 0));
    if i < 0.0 {
        return Ok(Value::from(""));
    }
    Ok(Value::from(code_unit_string(&s, i as usize).unwrap_or_default()))
}

fn char_code_at(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this_string(this, "charCodeAt")?;
    let i = to_integer(&arg(args, 0));
    if i < 0.0 {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(
        s.encode_utf16().nth(i as usize).map(f64::from).unwrap_or(f64::NAN),
    ))
}

fn at(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this_string(this, "at")?;
    let len = s.encode_utf16().count() as f64;
    let n = to_integer(&arg(args, 0));
    let i = if n < 0.0 { len + n } else { n };
    if i < 0.0 || i >= len {
        return Ok(Value::Undefined);
    }
    Ok(code_unit_string(&s, i as usize).map(Value::from).unwrap_or_default())
}

fn index_of(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = units(&this_string(this, "indexOf")?);
    let needle = units(&to_string(&arg(args, 0)));
    let from = clamp(&arg(args, 1), s.len(), 0);
    Ok(Value::Number(find(&s, &needle, from).map(|i| i as f64).unwrap_or(-1.0)))
}

fn last_index_of(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = units(&this_string(this, "lastIndexOf")?);
    let needle = units(&to_string(&arg(args, 0)));
    let from = match arg(args, 1) {
        Value::Undefined => s.len(),
        other if crate::runtime::operators::to_number(&other).is_nan() => s.len(),
        other => clamp(&other, s.len(), s.len()),
    };
    Ok(Value::Number(rfind(&s, &needle, from).map(|i| i as f64).unwrap_or(-1.0)))
}

fn includes(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = units(&this_string(this, "includes")?);
    let needle = units(&to_string(&arg(args, 0)));
    let from = clamp(&arg(args, 1), s.len(), 0);
    Ok(Value::Bool(find(&s, &needle, from).is_some()))
}

fn starts_with(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = units(&this_string(this, "startsWith")?);
    let needle = units(&to_string(&arg(args, 0)));
    let from = clamp(&arg(args, 1), s.len(), 0);
    Ok(Value::Bool(s[from..].starts_with(&needle)))
}

fn ends_with(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = units(&this_string(this, "endsWith")?);
    let needle = units(&to_string(&arg(args, 0)));
    let end = clamp(&arg(args, 1), s.len(), s.len());
    Ok(Value::Bool(s[..end].ends_with(&needle)))
}

fn slice(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = units(&this_string(this, "slice")?);
    let start = relative(&arg(args, 0), s.len(), 0);
    let end = relative(&arg(args, 1), s.len(), s.len());
    if start >= end {
        return Ok(Value::from(""));
    }
    Ok(from_units(&s[start..end]))
}

fn substring(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = units(&this_string(this, "substring")?);
    let a = clamp(&arg(args, 0), s.len(), 0);
    let b = clamp(&arg(args, 1), s.len(), s.len());
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    Ok(from_units(&s[start..end]))
}

fn to_upper_case(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this_string(this, "toUpperCase")?.to_uppercase()))
}

fn to_lower_case(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this_string(this, "toLowerCase")?.to_lowercase()))
}

fn is_space(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

fn trim(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this_string(this, "trim")?.trim_matches(is_space)))
}

fn trim_start(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this_string(this, "trimStart")?.trim_start_matches(is_space)))
}

fn trim_end(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this_string(this, "trimEnd")?.trim_end_matches(is_space)))
}

fn split(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this_string(this, "split")?;
    let limit = match arg(args, 1) {
        Value::Undefined => usize::MAX,
        other => to_uint32(&other) as usize,
    };
    let separator = arg(args, 0);
    let parts: Vec<Value> = if separator.is_undefined() {
        vec![Value::String(s)]
    } else {
        let separator = to_string(&separator);
        if separator.is_empty() {
            s.encode_utf16().map(|unit| from_units(&[unit])).collect()
        } else {
            s.split(&*separator).map(Value::from).collect()
        }
    };
    Ok(array(parts.into_iter().take(limit).collect()))
}

/// Expand `$$`, `$&`, `` $` `` and `$'` in a replacement template
fn expand_template(template: &str, matched: &str, before: &str, after: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => out.push('$'),
            Some('&') => out.push_str(matched),
            Some('`') => out.push_str(before),
            Some('\'') => out.push_str(after),
            _ => {
                out.push('$');
                continue;
            }
        }
        chars.next();
    }
    out
}

fn replace_with(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    method: &str,
    all: bool,
) -> ScriptResult<Value> {
    let s = this_string(this, method)?;
    let search = to_string(&arg(args, 0));
    let replacement = arg(args, 1);
    let mut out = String::new();
    let mut last = 0;
    let positions: Vec<usize> = if search.is_empty() {
        if all {
            s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len())).collect()
        } else {
            vec![0]
        }
    } else if all {
        s.match_indices(&*search).map(|(i, _)| i).collect()
    } else {
        s.find(&*search).into_iter().collect()
    };
    for pos in positions {
        out.push_str(&s[last..pos]);
        let end = pos + search.len();
        let text = if replacement.is_callable() {
            let offset = s[..pos].encode_utf16().count();
            let result = interp.call(
                &replacement,
                &Value::Undefined,
                &[Value::from(&*search), Value::from(offset), Value::String(s.clone())],
            )?;
            to_string(&result).to_string()
        } else {
            expand_template(&to_string(&replacement), &search, &s[..pos], &s[end..])
        };
        out.push_str(&text);
        last = end;
    }
    out.push_str(&s[last..]);
    Ok(Value::from(out))
}

fn replace(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    replace_with(interp, this, args, "replace", false)
}

fn replace_all(interp: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    replace_with(interp, this, args, "replaceAll", true)
}

fn repeat(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this_string(this, "repeat")?;
    let count = to_integer(&arg(args, 0));
    if count < 0.0 || count.is_infinite() {
        return Err(range_error(format!("Invalid count value: {}", to_string(&Value::Number(count)))));
    }
    if (s.len() as f64) * count > (1u64 << 29) as f64 {
        return Err(range_error("Invalid string length"));
    }
    Ok(Value::from(s.repeat(count as usize)))
}

fn pad(this: &Value, args: &[Value], method: &str, at_start: bool) -> ScriptResult<Value> {
    let s = units(&this_string(this, method)?);
    let target = to_integer(&arg(args, 0)).max(0.0) as usize;
    let fill = match arg(args, 1) {
        Value::Undefined => vec![u16::from(b' ')],
        other => units(&to_string(&other)),
    };
    if target <= s.len() || fill.is_empty() {
        return Ok(from_units(&s));
    }
    let padding: Vec<u16> = fill.iter().copied().cycle().take(target - s.len()).collect();
    let joined = if at_start {
        [padding, s].concat()
    } else {
        [s, padding].concat()
    };
    Ok(from_units(&joined))
}

fn pad_start(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    pad(this, args, "padStart", true)
}

fn pad_end(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    pad(this, args, "padEnd", false)
}

fn concat(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut out = this_string(this, "concat")?.to_string();
    for item in args {
        out.push_str(&to_string(item));
    }
    Ok(Value::from(out))
}

fn locale_compare(_: &mut Interpreter, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this_string(this, "localeCompare")?;
    let other = to_string(&arg(args, 0));
    Ok(Value::Number(match s.cmp(&other) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    }))
}

fn value_of(_: &mut Interpreter, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    match this {
        Value::String(_) => Ok(this.clone()),
        _ => Err(type_error("String.prototype.valueOf requires that 'this' be a String")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_unit_string() {
        assert_eq!(code_unit_string("abc", 1).as_deref(), Some("b"));
        assert_eq!(code_unit_string("abc", 3), None);
    }

    #[test]
    fn test_find_in_units() {
        let hay = units("hello world");
        assert_eq!(find(&hay, &units("o"), 0), Some(4));
        assert_eq!(find(&hay, &units("o"), 5), Some(7));
        assert_eq!(rfind(&hay, &units("o"), hay.len()), Some(7));
        assert_eq!(find(&hay, &units(""), 3), Some(3));
        assert_eq!(find(&hay, &units("xyz"), 0), None);
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(expand_template("[$&]", "b", "a", "c"), "[b]");
        assert_eq!(expand_template("$$", "b", "a", "c"), "$");
        assert_eq!(expand_template("$`$'", "b", "a", "c"), "ac");
        assert_eq!(expand_template("$1", "b", "a", "c"), "$1");
    }
}
