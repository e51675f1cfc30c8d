//! Types of the host globals and of primitive members
//!
//! Signatures are written in annotation syntax and lowered on demand; `T`
//! stands for the element type of the receiver.

use super::lower::{lower_members, lower_type, TypeNames};
use super::types::{FunctionType, ObjectType, Type};
use crate::compiler::parser::{parse_type_text, TypeExpr};
use crate::kit::lexer::SourceSpan;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;
use tracing::warn;

type Table = Lazy<HashMap<&'static str, &'static str>>;

static STRING_MEMBERS: Table = Lazy::new(|| {
    HashMap::from([
        ("length", "number"),
        ("charAt", "(pos: number) => string"),
        ("charCodeAt", "(index: number) => number"),
        ("at", "(index: number) => string | undefined"),
        ("indexOf", "(searchString: string, position?: number) => number"),
        ("lastIndexOf", "(searchString: string, position?: number) => number"),
        ("includes", "(searchString: string, position?: number) => boolean"),
        ("startsWith", "(searchString: string, position?: number) => boolean"),
        ("endsWith", "(searchString: string, endPosition?: number) => boolean"),
        ("slice", "(start?: number, end?: number) => string"),
        ("substring", "(start: number, end?: number) => string"),
        ("toUpperCase", "() => string"),
        ("toLowerCase", "() => string"),
        ("trim", "() => string"),
        ("trimStart", "() => string"),
        ("trimEnd", "() => string"),
        ("split", "(separator: string, limit?: number) => string[]"),
        ("replace", "(searchValue: string, replaceValue: string) => string"),
        ("replaceAll", "(searchValue: string, replaceValue: string) => string"),
        ("repeat", "(count: number) => string"),
        ("padStart", "(maxLength: number, fillString?: string) => string"),
        ("padEnd", "(maxLength: number, fillString?: string) => string"),
        ("concat", "(...strings: any[]) => string"),
        ("localeCompare", "(that: string) => number"),
        ("toString", "() => string"),
        ("valueOf", "() => string"),
    ])
});

static NUMBER_MEMBERS: Table = Lazy::new(|| {
    HashMap::from([
        ("toFixed", "(fractionDigits?: number) => string"),
        ("toPrecision", "(precision?: number) => string"),
        ("toString", "(radix?: number) => string"),
        ("valueOf", "() => number"),
    ])
});

static BOOLEAN_MEMBERS: Table = Lazy::new(|| {
    HashMap::from([("toString", "() => string"), ("valueOf", "() => boolean")])
});

static ARRAY_MEMBERS: Table = Lazy::new(|| {
    HashMap::from([
        ("length", "number"),
        ("push", "(...items: T[]) => number"),
        ("pop", "() => T | undefined"),
        ("shift", "() => T | undefined"),
        ("unshift", "(...items: T[]) => number"),
        ("slice", "(start?: number, end?: number) => T[]"),
        ("splice", "(start: number, deleteCount?: number, ...items: T[]) => T[]"),
        ("concat", "(...items: any[]) => T[]"),
        ("join", "(separator?: string) => string"),
        ("reverse", "() => T[]"),
        ("indexOf", "(searchElement: T, fromIndex?: number) => number"),
        ("lastIndexOf", "(searchElement: T, fromIndex?: number) => number"),
        ("includes", "(searchElement: T, fromIndex?: number) => boolean"),
        ("at", "(index: number) => T | undefined"),
        ("fill", "(value: T, start?: number, end?: number) => T[]"),
        ("sort", "(compareFn?: (a: T, b: T) => number) => T[]"),
        ("forEach", "(callbackfn: (value: T, index: number, array: T[]) => void) => void"),
        ("map", "(callbackfn: (value: T, index: number, array: T[]) => any) => any[]"),
        ("flatMap", "(callback: (value: T, index: number, array: T[]) => any) => any[]"),
        ("filter", "(predicate: (value: T, index: number, array: T[]) => unknown) => T[]"),
        ("find", "(predicate: (value: T, index: number, array: T[]) => unknown) => T | undefined"),
        ("findIndex", "(predicate: (value: T, index: number, array: T[]) => unknown) => number"),
        ("some", "(predicate: (value: T, index: number, array: T[]) => unknown) => boolean"),
        ("every", "(predicate: (value: T, index: number, array: T[]) => unknown) => boolean"),
        (
            "reduce",
            "(callbackfn: (previousValue: any, currentValue: T, currentIndex: number, array: T[]) => any, initialValue?: any) => any",
        ),
        ("flat", "(depth?: number) => any[]"),
        ("keys", "() => number[]"),
        ("toString", "() => string"),
    ])
});

static PROMISE_MEMBERS: Table = Lazy::new(|| {
    HashMap::from([
        (
            "then",
            "(onfulfilled?: (value: T) => any, onrejected?: (reason: any) => any) => Promise<any>",
        ),
        ("catch", "(onrejected?: (reason: any) => any) => Promise<any>"),
        ("finally", "(onfinally?: () => void) => Promise<T>"),
    ])
});

static ERROR_MEMBERS: Table = Lazy::new(|| {
    HashMap::from([
        ("name", "string"),
        ("message", "string"),
        ("stack", "string | undefined"),
        ("toString", "() => string"),
    ])
});

static FUNCTION_MEMBERS: Table =
    Lazy::new(|| HashMap::from([("length", "number"), ("name", "string")]));

/// Host global: static members plus optional call and construct signatures
struct GlobalDecl {
    name: &'static str,
    members: &'static str,
    call: Option<&'static str>,
    construct: Option<&'static str>,
}

const ERROR_CTOR: &str = "(message?: string) => Error";

static GLOBALS: Lazy<Vec<GlobalDecl>> = Lazy::new(|| {
    let decl = |name: &'static str,
                members: &'static str,
                call: Option<&'static str>,
                construct: Option<&'static str>| GlobalDecl {
        name,
        members,
        call,
        construct,
    };
    vec![
        decl(
            "console",
            "{ log(...data: any[]): void; error(...data: any[]): void; warn(...data: any[]): void; info(...data: any[]): void; clear(): void }",
            None,
            None,
        ),
        decl(
            "Math",
            "{ readonly PI: number; readonly E: number; readonly LN2: number; readonly LN10: number; readonly SQRT2: number; \
             abs(x: number): number; floor(x: number): number; ceil(x: number): number; round(x: number): number; \
             trunc(x: number): number; sign(x: number): number; sqrt(x: number): number; cbrt(x: number): number; \
             exp(x: number): number; log(x: number): number; log2(x: number): number; log10(x: number): number; \
             sin(x: number): number; cos(x: number): number; tan(x: number): number; atan(x: number): number; \
             atan2(y: number, x: number): number; pow(x: number, y: number): number; random(): number; \
             max(...values: number[]): number; min(...values: number[]): number; hypot(...values: number[]): number }",
            None,
            None,
        ),
        decl(
            "JSON",
            "{ parse(text: string): any; stringify(value: any, replacer?: any, space?: string | number): string }",
            None,
            None,
        ),
        decl(
            "Object",
            "{ keys(o: any): string[]; values(o: any): any[]; entries(o: any): [string, any][]; \
             assign(target: any, ...sources: any[]): any; freeze(o: any): any; fromEntries(entries: any): any }",
            Some("(value?: any) => any"),
            Some("(value?: any) => any"),
        ),
        decl(
            "Array",
            "{ isArray(value: any): boolean; from(items: any, mapfn?: (v: any, k: number) => any): any[]; of(...items: any[]): any[] }",
            Some("(...items: any[]) => any[]"),
            Some("(...items: any[]) => any[]"),
        ),
        decl(
            "Number",
            "{ isInteger(n: unknown): boolean; isFinite(n: unknown): boolean; isNaN(n: unknown): boolean; \
             isSafeInteger(n: unknown): boolean; parseFloat(s: string): number; parseInt(s: string, radix?: number): number; \
             readonly MAX_SAFE_INTEGER: number; readonly MIN_SAFE_INTEGER: number; readonly EPSILON: number; \
             readonly MAX_VALUE: number; readonly MIN_VALUE: number; readonly POSITIVE_INFINITY: number; \
             readonly NEGATIVE_INFINITY: number; readonly NaN: number }",
            Some("(value?: any) => number"),
            None,
        ),
        decl(
            "String",
            "{ fromCharCode(...codes: number[]): string }",
            Some("(value?: any) => string"),
            None,
        ),
        decl("Boolean", "{}", Some("(value?: any) => boolean"), None),
        decl("Error", "{}", Some(ERROR_CTOR), Some(ERROR_CTOR)),
        decl("TypeError", "{}", Some(ERROR_CTOR), Some(ERROR_CTOR)),
        decl("RangeError", "{}", Some(ERROR_CTOR), Some(ERROR_CTOR)),
        decl("ReferenceError", "{}", Some(ERROR_CTOR), Some(ERROR_CTOR)),
        decl("SyntaxError", "{}", Some(ERROR_CTOR), Some(ERROR_CTOR)),
        decl(
            "Promise",
            "{ resolve(value?: any): Promise<any>; reject(reason?: any): Promise<never>; \
             all(values: any[]): Promise<any[]>; race(values: any[]): Promise<any> }",
            None,
            Some("(executor: (resolve: (value?: any) => void, reject: (reason?: any) => void) => void) => Promise<unknown>"),
        ),
    ]
});

static GLOBAL_FUNCTIONS: Table = Lazy::new(|| {
    HashMap::from([
        ("parseInt", "(string: string, radix?: number) => number"),
        ("parseFloat", "(string: string) => number"),
        ("isNaN", "(number: number) => boolean"),
        ("isFinite", "(number: number) => boolean"),
        (
            "setTimeout",
            "(handler: (...args: any[]) => void, timeout?: number, ...args: any[]) => number",
        ),
        ("clearTimeout", "(id?: number) => void"),
        ("queueMicrotask", "(callback: () => void) => void"),
        ("NaN", "number"),
        ("Infinity", "number"),
    ])
});

/// Resolves `T` (and any other generic placeholder) in builtin signatures
struct Placeholders<'a> {
    element: &'a Type,
}

impl TypeNames for Placeholders<'_> {
    type Error = Infallible;

    fn named(&mut self, name: &str, _args: Vec<Type>, _span: SourceSpan) -> Result<Type, Infallible> {
        Ok(match name {
            "T" => self.element.clone(),
            _ => Type::Any,
        })
    }

    fn query(&mut self, _name: &str, _span: SourceSpan) -> Result<Type, Infallible> {
        Ok(Type::Any)
    }
}

fn parse_signature(text: &str) -> Option<TypeExpr> {
    match parse_type_text(text) {
        Ok(te) => Some(te),
        Err(err) => {
            warn!(target: "tinker::checker", signature = text, %err, "invalid builtin signature");
            None
        }
    }
}

fn signature(text: &str, element: &Type) -> Type {
    let Some(te) = parse_signature(text) else {
        return Type::Any;
    };
    match lower_type(&te, &mut Placeholders { element }) {
        Ok(ty) => ty,
        Err(never) => match never {},
    }
}

fn function_signature(text: &str) -> Option<Rc<FunctionType>> {
    match signature(text, &Type::Any) {
        Type::Function(f) => Some(f),
        _ => None,
    }
}

fn object_signature(text: &str) -> ObjectType {
    let members = match parse_signature(text) {
        Some(TypeExpr::Object(members)) => members,
        _ => return ObjectType::default(),
    };
    match lower_members(&members, &mut Placeholders { element: &Type::Any }) {
        Ok(obj) => obj,
        Err(never) => match never {},
    }
}

/// Types of every host global, in declaration order
pub fn globals() -> Vec<(&'static str, Type)> {
    let mut out: Vec<(&'static str, Type)> = GLOBALS
        .iter()
        .map(|g| {
            let mut obj = object_signature(g.members);
            obj.name = match g.name {
                "console" | "Math" | "JSON" => Some(Rc::from(g.name)),
                name => Some(Rc::from(format!("{}Constructor", name))),
            };
            obj.call = g.call.and_then(function_signature);
            obj.construct = g.construct.and_then(function_signature);
            (g.name, Type::Object(Rc::new(obj)))
        })
        .collect();
    let mut functions: Vec<_> = GLOBAL_FUNCTIONS.iter().collect();
    functions.sort_by_key(|(name, _)| **name);
    for (name, sig) in functions {
        out.push((name, signature(sig, &Type::Any)));
    }
    out.push(("undefined", Type::Undefined));
    out
}

/// Type of `receiver.name` for non-object receivers and the object fallbacks
pub fn member_type(receiver: &Type, name: &str) -> Option<Type> {
    let (table, element): (&Table, Type) = match receiver {
        Type::String | Type::StringLit(_) => (&STRING_MEMBERS, Type::Any),
        Type::Number | Type::NumberLit(_) => (&NUMBER_MEMBERS, Type::Any),
        Type::Boolean | Type::BoolLit(_) => (&BOOLEAN_MEMBERS, Type::Any),
        Type::Array(inner) => (&ARRAY_MEMBERS, (**inner).clone()),
        Type::Tuple(items) => (&ARRAY_MEMBERS, Type::union(items.iter().cloned())),
        Type::Promise(inner) => (&PROMISE_MEMBERS, (**inner).clone()),
        Type::Error => (&ERROR_MEMBERS, Type::Any),
        Type::Function(_) => (&FUNCTION_MEMBERS, Type::Any),
        Type::Object(obj) => {
            if let Some(prop) = obj.prop(name) {
                return Some(if prop.optional {
                    Type::union([prop.ty.clone(), Type::Undefined])
                } else {
                    prop.ty.clone()
                });
            }
            if let Some(index) = &obj.index {
                return Some(index.clone());
            }
            if obj.call.is_some() || obj.construct.is_some() {
                (&FUNCTION_MEMBERS, Type::Any)
            } else {
                return None;
            }
        }
        _ => return None,
    };
    table.get(name).map(|sig| signature(sig, &element))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_signature_parses() {
        let tables: [&Table; 8] = [
            &STRING_MEMBERS,
            &NUMBER_MEMBERS,
            &BOOLEAN_MEMBERS,
            &ARRAY_MEMBERS,
            &PROMISE_MEMBERS,
            &ERROR_MEMBERS,
            &FUNCTION_MEMBERS,
            &GLOBAL_FUNCTIONS,
        ];
        for table in tables {
            for sig in table.values() {
                assert!(parse_type_text(sig).is_ok(), "bad signature {}", sig);
            }
        }
        for g in GLOBALS.iter() {
            assert!(parse_type_text(g.members).is_ok(), "bad members of {}", g.name);
        }
    }

    #[test]
    fn test_array_members_substitute_element() {
        let arr = Type::array(Type::Number);
        let Some(Type::Function(pop)) = member_type(&arr, "pop") else {
            panic!("expected method");
        };
        assert!(pop.params.is_empty());
        assert_eq!(pop.ret, Type::union([Type::Number, Type::Undefined]));
        assert_eq!(member_type(&arr, "length"), Some(Type::Number));
        assert_eq!(member_type(&arr, "nope"), None);
    }

    #[test]
    fn test_string_members() {
        let Some(Type::Function(f)) = member_type(&Type::String, "padStart") else {
            panic!("expected method");
        };
        assert_eq!(f.required_count(), 1);
        assert_eq!(f.ret, Type::String);
    }

    #[test]
    fn test_globals_include_constructors() {
        let globals = globals();
        let (_, promise) = globals.iter().find(|(n, _)| *n == "Promise").unwrap();
        let Type::Object(obj) = promise else {
            panic!("expected object");
        };
        assert!(obj.construct.is_some());
        assert!(obj.prop("resolve").is_some());
        assert!(globals.iter().any(|(n, _)| *n == "setTimeout"));
    }
}
