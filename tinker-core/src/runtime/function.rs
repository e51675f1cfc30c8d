//! Script closures and host-provided native functions

use super::error::ScriptResult;
use super::interpreter::Interpreter;
use super::scope::Scope;
use super::value::{Object, ObjectKind, ObjectRef, Value};
use crate::compiler::parser::FunctionNode;
use std::rc::Rc;

/// Native entry point: interpreter, receiver, arguments
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &Value, &[Value]) -> ScriptResult<Value>>;

pub enum Callable {
    Closure(Closure),
    Native(NativeFunction),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Closure(c) => &c.name,
            Callable::Native(n) => &n.name,
        }
    }

    /// Declared parameter count as `fn.length` reports it
    pub fn arity(&self) -> usize {
        match self {
            Callable::Closure(c) => c.node.required_params(),
            Callable::Native(n) => n.arity,
        }
    }

    /// Printable source text
    pub fn source_text(&self) -> String {
        match self {
            Callable::Closure(c) => c.node.source.to_string(),
            Callable::Native(n) => format!("function {}() {{ [native code] }}", n.name),
        }
    }

    pub fn is_constructor(&self) -> bool {
        match self {
            Callable::Closure(c) => !c.node.is_arrow,
            Callable::Native(n) => n.construct.is_some(),
        }
    }
}

pub struct Closure {
    pub node: Rc<FunctionNode>,
    pub scope: Rc<Scope>,
    pub name: Rc<str>,
}

pub struct NativeFunction {
    pub name: Rc<str>,
    pub arity: usize,
    pub call: NativeFn,
    /// Behaviour under `new`; `None` means not a constructor
    pub construct: Option<NativeFn>,
}

/// Wrap a closure over `node` in a function object
pub fn closure(node: Rc<FunctionNode>, scope: Rc<Scope>, name: Rc<str>) -> Value {
    Value::Object(Object::new(ObjectKind::Function(Callable::Closure(Closure {
        node,
        scope,
        name,
    }))))
}

/// A plain (non-constructor) native function object
pub fn native<F>(name: &str, arity: usize, f: F) -> Value
where
    F: Fn(&mut Interpreter, &Value, &[Value]) -> ScriptResult<Value> + 'static,
{
    Value::Object(native_object(name, arity, Rc::new(f), None))
}

/// A native function that behaves the same with and without `new`
pub fn constructor<F>(name: &str, arity: usize, f: F) -> ObjectRef
where
    F: Fn(&mut Interpreter, &Value, &[Value]) -> ScriptResult<Value> + 'static,
{
    let f: NativeFn = Rc::new(f);
    native_object(name, arity, f.clone(), Some(f))
}

pub fn native_object(name: &str, arity: usize, call: NativeFn, construct: Option<NativeFn>) -> ObjectRef {
    Object::new(ObjectKind::Function(Callable::Native(NativeFunction {
        name: Rc::from(name),
        arity,
        call,
        construct,
    })))
}

/// Argument `i`, or `undefined` when missing
pub fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}
