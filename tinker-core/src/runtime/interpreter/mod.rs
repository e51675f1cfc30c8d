//! Tree-walking interpreter
//!
//! Evaluates parsed programs directly. Expression and statement evaluation
//! live in `expr` and `stmt`; binding patterns in `pattern`. This module owns
//! calls, construction and property access.

mod expr;
mod pattern;
mod stmt;

use super::error::{range_error, throw_error, type_error, ScriptResult};
use super::event_loop::EventLoop;
use super::function::{Callable, Closure};
use super::operators::to_string;
use super::realm::{Proto, Realm};
use super::scope::{Scope, ScopeError, ScopeKind};
use super::value::{array_index, ErrorKind, Object, ObjectKind, Value};
use crate::compiler::parser::{FunctionBody, Program};
use crate::kit::stack;
use crate::kit::number::as_index;
use std::rc::Rc;
use tinker_config::SandboxLimits;
use tracing::trace;

pub(crate) use stmt::Flow;

pub struct Interpreter {
    realm: Rc<Realm>,
    event_loop: Rc<EventLoop>,
    limits: SandboxLimits,
    depth: usize,
    /// Value of the last top-level expression statement
    completion: Option<Value>,
}

impl Interpreter {
    pub fn new(limits: SandboxLimits) -> Self {
        Self::with_event_loop(limits, EventLoop::new())
    }

    pub fn with_event_loop(limits: SandboxLimits, event_loop: Rc<EventLoop>) -> Self {
        Self {
            realm: Realm::new(),
            event_loop,
            limits,
            depth: 0,
            completion: None,
        }
    }

    pub fn realm(&self) -> &Rc<Realm> {
        &self.realm
    }

    pub fn event_loop(&self) -> &Rc<EventLoop> {
        &self.event_loop
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Scope for one run: a function scope directly under the globals
    pub fn run_scope(&self) -> Rc<Scope> {
        Scope::child(&self.realm.globals, ScopeKind::Function)
    }

    /// Execute a whole program; returns the completion value, if any
    pub fn run_program(&mut self, program: &Program, scope: &Rc<Scope>) -> ScriptResult<Option<Value>> {
        self.completion = None;
        self.depth = 0;
        self.hoist(&program.body, scope);
        for stmt in &program.body {
            if !matches!(self.exec_stmt(stmt, scope)?, Flow::Normal) {
                break;
            }
        }
        Ok(self.completion.take())
    }

    /// Drain microtasks and timers, sleeping until the last timer fires
    pub fn run_until_idle(&mut self) {
        let event_loop = self.event_loop.clone();
        event_loop.run_until_idle(self);
    }

    /// Drain microtasks and already-due timers
    pub fn run_ready(&mut self) {
        let event_loop = self.event_loop.clone();
        event_loop.run_ready(self);
    }

    pub fn call(&mut self, func: &Value, this: &Value, args: &[Value]) -> ScriptResult<Value> {
        let Value::Object(obj) = func else {
            return Err(type_error(format!("{} is not a function", to_string(func))));
        };
        let obj = obj.clone();
        let Some(callable) = obj.callable() else {
            return Err(type_error(format!("{} is not a function", to_string(func))));
        };
        if self.depth >= self.limits.max_call_depth {
            trace!(target: "tinker::runtime", depth = self.depth, "call depth exceeded");
            return Err(range_error("Maximum call stack size exceeded"));
        }
        self.depth += 1;
        let result = stack::guarded(|| match callable {
            Callable::Native(native) => {
                let f = native.call.clone();
                f(self, this, args)
            }
            Callable::Closure(closure) => self.call_closure(closure, args),
        });
        self.depth -= 1;
        result
    }

    fn call_closure(&mut self, closure: &Closure, args: &[Value]) -> ScriptResult<Value> {
        let scope = Scope::child(&closure.scope, ScopeKind::Function);
        self.bind_params(&closure.node.params, args, &scope)?;
        match &closure.node.body {
            FunctionBody::Block(stmts) => {
                self.hoist(stmts, &scope);
                match self.exec_stmts(stmts, &scope)? {
                    Flow::Return(value) => Ok(value),
                    _ => Ok(Value::Undefined),
                }
            }
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
        }
    }

    /// `new func(...args)`
    pub fn construct(&mut self, func: &Value, args: &[Value]) -> ScriptResult<Value> {
        let not_constructor = || type_error(format!("{} is not a constructor", describe_function(func)));
        let Value::Object(obj) = func else {
            return Err(not_constructor());
        };
        let obj = obj.clone();
        match obj.callable() {
            Some(Callable::Native(native)) => {
                let Some(construct) = native.construct.clone() else {
                    return Err(not_constructor());
                };
                if self.depth >= self.limits.max_call_depth {
                    return Err(range_error("Maximum call stack size exceeded"));
                }
                self.depth += 1;
                let result = stack::guarded(|| construct(self, &Value::Undefined, args));
                self.depth -= 1;
                result
            }
            Some(Callable::Closure(closure)) if !closure.node.is_arrow => {
                let instance = Object::plain();
                instance.set_constructed_by(obj.clone());
                let result = self.call(func, &Value::Object(instance.clone()), args)?;
                Ok(match result {
                    Value::Object(_) => result,
                    _ => Value::Object(instance),
                })
            }
            _ => Err(not_constructor()),
        }
    }

    pub fn get_property(&self, target: &Value, key: &str) -> ScriptResult<Value> {
        let proto = match target {
            Value::Undefined | Value::Null => {
                return Err(type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    to_string(target),
                    key
                )))
            }
            Value::Bool(_) => Proto::Boolean,
            Value::Number(_) => Proto::Number,
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::from(s.encode_utf16().count()));
                }
                if let Some(i) = array_index(key) {
                    return Ok(super::stdlib::string::code_unit_string(s, i as usize)
                        .map(Value::from)
                        .unwrap_or_default());
                }
                Proto::String
            }
            Value::Object(obj) => {
                if let Some(value) = obj.get_own(key) {
                    return Ok(value);
                }
                match &obj.kind {
                    ObjectKind::Function(callable) => match key {
                        "name" => return Ok(Value::string(callable.name())),
                        "length" => return Ok(Value::from(callable.arity())),
                        _ => Proto::Function,
                    },
                    ObjectKind::Error(kind) if key == "name" => return Ok(Value::from(kind.name())),
                    ObjectKind::Error(_) => Proto::Error,
                    ObjectKind::Array(_) => Proto::Array,
                    ObjectKind::Promise(_) => Proto::Promise,
                    ObjectKind::Plain => Proto::Object,
                }
            }
        };
        Ok(self.realm.method(proto, key).unwrap_or_default())
    }

    pub fn set_property(&self, target: &Value, key: &str, value: Value) -> ScriptResult<()> {
        let obj = match target {
            Value::Undefined | Value::Null => {
                return Err(type_error(format!(
                    "Cannot set properties of {} (setting '{}')",
                    to_string(target),
                    key
                )))
            }
            Value::Object(obj) => obj,
            _ => return Ok(()),
        };
        if let Some(items) = obj.elements() {
            if obj.is_frozen() {
                return Ok(());
            }
            if key == "length" {
                let len = super::operators::to_number(&value);
                let Some(len) = as_index(len) else {
                    return Err(range_error("Invalid array length"));
                };
                items.borrow_mut().resize(len, Value::Undefined);
                return Ok(());
            }
            if let Some(i) = array_index(key) {
                let i = i as usize;
                let mut items = items.borrow_mut();
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
                return Ok(());
            }
        }
        obj.set(key, value);
        Ok(())
    }

    /// Own property, array element or built-in method
    pub fn has_property(&self, target: &Value, key: &str) -> bool {
        match target {
            Value::Object(obj) if obj.has_own(key) => true,
            Value::Object(_) => self.get_property(target, key).is_ok_and(|v| !v.is_undefined()),
            _ => false,
        }
    }

    /// `left instanceof right`
    pub fn instance_of(&self, left: &Value, right: &Value) -> ScriptResult<bool> {
        let Some(ctor) = right.as_object().filter(|o| o.is_callable()) else {
            return Err(type_error("Right-hand side of 'instanceof' is not callable"));
        };
        let Value::Object(obj) = left else {
            return Ok(false);
        };
        Ok(match ctor.callable() {
            Some(Callable::Closure(_)) => obj
                .constructed_by()
                .is_some_and(|c| Rc::ptr_eq(&c, ctor)),
            Some(Callable::Native(native)) => match (&*native.name, &obj.kind) {
                ("Object", _) => true,
                ("Array", ObjectKind::Array(_)) => true,
                ("Promise", ObjectKind::Promise(_)) => true,
                ("Error", ObjectKind::Error(_)) => true,
                (name, ObjectKind::Error(kind)) => ErrorKind::from_name(name) == Some(*kind),
                _ => false,
            },
            None => false,
        })
    }

    /// Values produced by iterating `value` (arrays and strings)
    pub fn iterate(&self, value: &Value) -> ScriptResult<Vec<Value>> {
        match value {
            Value::Object(obj) if obj.is_array() => Ok(obj.element_values()),
            Value::String(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
            _ => Err(type_error(format!("{} is not iterable", describe_value(value)))),
        }
    }
}

pub(crate) fn scope_error(err: ScopeError) -> super::error::Throw {
    match err {
        ScopeError::NotDefined(name) => throw_error(ErrorKind::ReferenceError, format!("{} is not defined", name)),
        ScopeError::Uninitialized(name) => throw_error(
            ErrorKind::ReferenceError,
            format!("Cannot access '{}' before initialization", name),
        ),
        ScopeError::ConstAssignment(_) => type_error("Assignment to constant variable."),
    }
}

fn describe_function(value: &Value) -> String {
    match value.as_object().and_then(|o| o.callable()) {
        Some(callable) if !callable.name().is_empty() => callable.name().to_string(),
        _ => describe_value(value),
    }
}

/// Short description for error messages
pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Object(obj) if obj.is_array() => "object".to_string(),
        Value::Object(obj) if obj.is_callable() => "function".to_string(),
        Value::Object(_) => "object".to_string(),
        other => to_string(other).to_string(),
    }
}

#[cfg(test)]
mod tests;
