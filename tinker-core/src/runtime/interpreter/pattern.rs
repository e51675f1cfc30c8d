//! Binding and assignment patterns

use super::{scope_error, Interpreter};
use crate::compiler::parser::{Param, Pattern, PropertyKey};
use crate::runtime::error::{type_error, ScriptResult};
use crate::runtime::operators::to_string;
use crate::runtime::scope::Scope;
use crate::runtime::value::{Object, Value};
use std::collections::HashSet;
use std::rc::Rc;

/// How a pattern's names receive their values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BindMode {
    /// `var`: the hoisted function-scope binding
    Var,
    /// `let`/`const`: the binding created by hoisting in this scope
    Lexical { mutable: bool },
    /// Fresh parameter binding
    Param,
    /// Plain assignment to existing bindings or properties
    Assign,
}

impl Interpreter {
    pub(super) fn bind_params(&mut self, params: &[Param], args: &[Value], scope: &Rc<Scope>) -> ScriptResult<()> {
        for (i, param) in params.iter().enumerate() {
            let value = if param.rest {
                Value::Object(Object::array(args.get(i..).map(|a| a.to_vec()).unwrap_or_default()))
            } else {
                match (args.get(i), &param.default) {
                    (Some(v), _) if !v.is_undefined() => v.clone(),
                    (_, Some(default)) => self.eval_named(default, &param.pattern, scope)?,
                    _ => Value::Undefined,
                }
            };
            self.bind_pattern(&param.pattern, value, scope, BindMode::Param)?;
        }
        Ok(())
    }

    pub(super) fn bind_pattern(&mut self, pattern: &Pattern, value: Value, scope: &Rc<Scope>, mode: BindMode) -> ScriptResult<()> {
        match pattern {
            Pattern::Ident { name, .. } => self.bind_name(name, value, scope, mode),
            Pattern::Object { props, rest, .. } => {
                if value.is_nullish() {
                    return Err(type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        to_string(&value),
                        to_string(&value)
                    )));
                }
                let mut used = HashSet::new();
                for prop in props {
                    let key: Rc<str> = match &prop.key {
                        PropertyKey::Named(name) => name.clone(),
                        PropertyKey::Computed(expr) => to_string(&self.eval(expr, scope)?),
                    };
                    let mut item = self.get_property(&value, &key)?;
                    if item.is_undefined() {
                        if let Some(default) = &prop.default {
                            item = self.eval_named(default, &prop.value, scope)?;
                        }
                    }
                    used.insert(key);
                    self.bind_pattern(&prop.value, item, scope, mode)?;
                }
                if let Some(rest) = rest {
                    let remaining = Object::plain();
                    if let Value::Object(obj) = &value {
                        for key in obj.keys() {
                            if !used.contains(&key) {
                                remaining.set(key.clone(), self.get_property(&value, &key)?);
                            }
                        }
                    }
                    self.bind_pattern(rest, Value::Object(remaining), scope, mode)?;
                }
                Ok(())
            }
            Pattern::Array { elements, rest, .. } => {
                let items = self.iterate(&value)?;
                for (i, element) in elements.iter().enumerate() {
                    let Some(element) = element else {
                        continue;
                    };
                    let mut item = items.get(i).cloned().unwrap_or_default();
                    if item.is_undefined() {
                        if let Some(default) = &element.default {
                            item = self.eval_named(default, &element.pattern, scope)?;
                        }
                    }
                    self.bind_pattern(&element.pattern, item, scope, mode)?;
                }
                if let Some(rest) = rest {
                    let tail = items.get(elements.len()..).map(|t| t.to_vec()).unwrap_or_default();
                    self.bind_pattern(rest, Value::Object(Object::array(tail)), scope, mode)?;
                }
                Ok(())
            }
            Pattern::Expr(expr) => {
                let reference = self.reference(expr, scope)?;
                self.put_reference(&reference, value, scope)
            }
        }
    }

    fn bind_name(&mut self, name: &Rc<str>, value: Value, scope: &Rc<Scope>, mode: BindMode) -> ScriptResult<()> {
        match mode {
            BindMode::Var => scope.function_scope().initialize(name.clone(), true, value),
            BindMode::Lexical { mutable } => scope.initialize(name.clone(), mutable, value),
            BindMode::Param => scope.declare(name.clone(), true, Some(value)),
            BindMode::Assign => return scope.assign(name, value).map_err(scope_error),
        }
        Ok(())
    }
}
