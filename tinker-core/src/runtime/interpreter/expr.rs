//! Expression evaluation

use super::{scope_error, Interpreter};
use crate::compiler::parser::{
    Argument, ArrayElement, AssignOp, BinaryOp, Expr, ExprKind, FunctionNode, LogicalOp, Pattern,
    PropertyDef, PropertyKey, UnaryOp, UpdateOp,
};
use crate::runtime::error::{throw_error, type_error, ScriptResult};
use crate::kit::stack;
use crate::runtime::function::closure;
use crate::runtime::operators::{arithmetic, relational, to_int32, to_number, to_property_key, to_string};
use crate::runtime::scope::{Scope, ScopeKind};
use crate::runtime::value::{array_index, ErrorKind, Object, Value};
use std::rc::Rc;

/// An assignable location
pub(super) enum Reference {
    Binding(Rc<str>),
    Property(Value, Rc<str>),
}

impl Interpreter {
    pub(super) fn eval(&mut self, expr: &Expr, scope: &Rc<Scope>) -> ScriptResult<Value> {
        stack::guarded(|| self.eval_expr(expr, scope))
    }

    fn eval_expr(&mut self, expr: &Expr, scope: &Rc<Scope>) -> ScriptResult<Value> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::String(s) => Ok(Value::String(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Template { quasis, exprs } => self.eval_template(quasis, exprs, scope),
            ExprKind::Ident(name) => self.lookup(name, scope),
            ExprKind::Array(elements) => self.eval_array(elements, scope),
            ExprKind::Object(props) => self.eval_object(props, scope),
            ExprKind::Function(node) => Ok(self.eval_function(node, None, scope)),
            ExprKind::Paren(inner) | ExprKind::NonNull(inner) => self.eval(inner, scope),
            ExprKind::TypeAssertion { expr, .. } => self.eval(expr, scope),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, scope),
            ExprKind::Update { op, prefix, target } => self.eval_update(*op, *prefix, target, scope),
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                self.binary(*op, &left, &right)
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                if short_circuits(*op, &left) {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            ExprKind::Assign { op, target, value } => self.eval_assign(*op, target, value, scope),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            ExprKind::Call { .. } | ExprKind::Member { .. } | ExprKind::Index { .. } | ExprKind::OptionalChain(_) => {
                Ok(self.eval_chain(expr, scope)?.unwrap_or_default())
            }
            ExprKind::New { callee, args, .. } => {
                let func = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                if !func.is_callable() {
                    return Err(type_error(format!("{} is not a constructor", callee_text(callee))));
                }
                self.construct(&func, &args)
            }
            ExprKind::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for e in exprs {
                    last = self.eval(e, scope)?;
                }
                Ok(last)
            }
        }
    }

    /// Evaluate an initializer, naming anonymous functions after their binding
    pub(super) fn eval_named(&mut self, expr: &Expr, target: &Pattern, scope: &Rc<Scope>) -> ScriptResult<Value> {
        match (&expr.kind, target) {
            (ExprKind::Function(node), Pattern::Ident { name, .. }) if node.name.is_none() => {
                Ok(self.eval_function(node, Some(name.clone()), scope))
            }
            _ => self.eval(expr, scope),
        }
    }

    fn eval_function(&mut self, node: &Rc<FunctionNode>, inferred: Option<Rc<str>>, scope: &Rc<Scope>) -> Value {
        match &node.name {
            // a named function expression sees its own name
            Some(name) => {
                let own = Scope::child(scope, ScopeKind::Block);
                let func = closure(node.clone(), own.clone(), name.clone());
                own.declare(name.clone(), false, Some(func.clone()));
                func
            }
            None => closure(node.clone(), scope.clone(), inferred.unwrap_or_else(|| Rc::from(""))),
        }
    }

    fn eval_template(&mut self, quasis: &[Rc<str>], exprs: &[Expr], scope: &Rc<Scope>) -> ScriptResult<Value> {
        let mut out = String::new();
        for (i, quasi) in quasis.iter().enumerate() {
            out.push_str(quasi);
            if let Some(expr) = exprs.get(i) {
                out.push_str(&to_string(&self.eval(expr, scope)?));
            }
        }
        Ok(Value::from(out))
    }

    fn eval_array(&mut self, elements: &[ArrayElement], scope: &Rc<Scope>) -> ScriptResult<Value> {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                ArrayElement::Expr(e) => items.push(self.eval(e, scope)?),
                ArrayElement::Spread(e) => {
                    let value = self.eval(e, scope)?;
                    items.extend(self.iterate(&value)?);
                }
                ArrayElement::Hole => items.push(Value::Undefined),
            }
        }
        Ok(Value::Object(Object::array(items)))
    }

    fn eval_object(&mut self, props: &[PropertyDef], scope: &Rc<Scope>) -> ScriptResult<Value> {
        let obj = Object::plain();
        let target = Value::Object(obj.clone());
        for prop in props {
            match prop {
                PropertyDef::Init { key, value, .. } => {
                    let key = self.property_key(key, scope)?;
                    let value = match &value.kind {
                        ExprKind::Function(node) if node.name.is_none() => {
                            self.eval_function(node, Some(key.clone()), scope)
                        }
                        _ => self.eval(value, scope)?,
                    };
                    self.set_property(&target, &key, value)?;
                }
                PropertyDef::Spread(e) => {
                    let source = self.eval(e, scope)?;
                    self.copy_own(&source, &target)?;
                }
            }
        }
        Ok(target)
    }

    /// Copy enumerable own properties, as object spread and `Object.assign` do
    pub(crate) fn copy_own(&mut self, source: &Value, target: &Value) -> ScriptResult<()> {
        match source {
            Value::Object(src) => {
                for key in src.keys() {
                    let value = self.get_property(source, &key)?;
                    self.set_property(target, &key, value)?;
                }
            }
            Value::String(s) => {
                for (i, c) in s.chars().enumerate() {
                    self.set_property(target, &i.to_string(), Value::from(c.to_string()))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn property_key(&mut self, key: &PropertyKey, scope: &Rc<Scope>) -> ScriptResult<Rc<str>> {
        Ok(match key {
            PropertyKey::Named(name) => name.clone(),
            PropertyKey::Computed(expr) => to_property_key(&self.eval(expr, scope)?),
        })
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, scope: &Rc<Scope>) -> ScriptResult<Value> {
        match op {
            UnaryOp::Typeof => {
                if let ExprKind::Ident(name) = &operand.unwrap_type_syntax().kind {
                    if !scope.has(name) {
                        return Ok(Value::from("undefined"));
                    }
                }
                Ok(Value::from(self.eval(operand, scope)?.type_of()))
            }
            UnaryOp::Delete => self.eval_delete(operand, scope),
            _ => {
                let value = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Minus => Value::Number(-to_number(&value)),
                    UnaryOp::Plus => Value::Number(to_number(&value)),
                    UnaryOp::BitNot => Value::Number(!to_int32(&value) as f64),
                    _ => Value::Undefined,
                })
            }
        }
    }

    fn eval_delete(&mut self, operand: &Expr, scope: &Rc<Scope>) -> ScriptResult<Value> {
        let reference = match &operand.unwrap_type_syntax().kind {
            ExprKind::Member { .. } | ExprKind::Index { .. } => self.reference(operand, scope)?,
            _ => {
                self.eval(operand, scope)?;
                return Ok(Value::Bool(true));
            }
        };
        if let Reference::Property(Value::Object(obj), key) = reference {
            if obj.is_frozen() {
                return Ok(Value::Bool(false));
            }
            match (obj.elements(), array_index(&key)) {
                (Some(items), Some(i)) => {
                    if let Some(slot) = items.borrow_mut().get_mut(i as usize) {
                        *slot = Value::Undefined;
                    }
                }
                _ => {
                    obj.remove(&key);
                }
            }
        }
        Ok(Value::Bool(true))
    }

    fn eval_update(&mut self, op: UpdateOp, prefix: bool, target: &Expr, scope: &Rc<Scope>) -> ScriptResult<Value> {
        let reference = self.reference(target, scope)?;
        let old = to_number(&self.get_reference(&reference, scope)?);
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.put_reference(&reference, Value::Number(new), scope)?;
        Ok(Value::Number(if prefix { new } else { old }))
    }

    pub(crate) fn binary(&mut self, op: BinaryOp, left: &Value, right: &Value) -> ScriptResult<Value> {
        match op {
            BinaryOp::In => {
                if !matches!(right, Value::Object(_)) {
                    return Err(type_error(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        to_string(left),
                        to_string(right)
                    )));
                }
                Ok(Value::Bool(self.has_property(right, &to_property_key(left))))
            }
            BinaryOp::Instanceof => Ok(Value::Bool(self.instance_of(left, right)?)),
            _ => {
                if let Some(result) = relational(op, left, right) {
                    return Ok(Value::Bool(result));
                }
                Ok(arithmetic(op, left, right).unwrap_or_default())
            }
        }
    }

    fn eval_assign(&mut self, op: AssignOp, target: &Pattern, value: &Expr, scope: &Rc<Scope>) -> ScriptResult<Value> {
        let reference = match target {
            Pattern::Ident { name, .. } => Reference::Binding(name.clone()),
            Pattern::Expr(expr) => self.reference(expr, scope)?,
            Pattern::Object { .. } | Pattern::Array { .. } => {
                let value = self.eval(value, scope)?;
                self.bind_pattern(target, value.clone(), scope, super::pattern::BindMode::Assign)?;
                return Ok(value);
            }
        };
        match op {
            AssignOp::Assign => {
                let value = self.eval_named(value, target, scope)?;
                self.put_reference(&reference, value.clone(), scope)?;
                Ok(value)
            }
            AssignOp::Compound(binary) => {
                let old = self.get_reference(&reference, scope)?;
                let rhs = self.eval(value, scope)?;
                let result = self.binary(binary, &old, &rhs)?;
                self.put_reference(&reference, result.clone(), scope)?;
                Ok(result)
            }
            AssignOp::Logical(logical) => {
                let old = self.get_reference(&reference, scope)?;
                if short_circuits(logical, &old) {
                    return Ok(old);
                }
                let value = self.eval_named(value, target, scope)?;
                self.put_reference(&reference, value.clone(), scope)?;
                Ok(value)
            }
        }
    }

    pub(super) fn reference(&mut self, expr: &Expr, scope: &Rc<Scope>) -> ScriptResult<Reference> {
        match &expr.kind {
            ExprKind::Ident(name) => Ok(Reference::Binding(name.clone())),
            ExprKind::Member { object, property, .. } => {
                let object = self.eval(object, scope)?;
                Ok(Reference::Property(object, property.clone()))
            }
            ExprKind::Index { object, index, .. } => {
                let object = self.eval(object, scope)?;
                let key = to_property_key(&self.eval(index, scope)?);
                Ok(Reference::Property(object, key))
            }
            ExprKind::Paren(inner) | ExprKind::NonNull(inner) => self.reference(inner, scope),
            ExprKind::TypeAssertion { expr, .. } => self.reference(expr, scope),
            _ => Err(throw_error(
                ErrorKind::SyntaxError,
                "Invalid left-hand side in assignment",
            )),
        }
    }

    fn get_reference(&mut self, reference: &Reference, scope: &Rc<Scope>) -> ScriptResult<Value> {
        match reference {
            Reference::Binding(name) => self.lookup(name, scope),
            Reference::Property(object, key) => self.get_property(object, key),
        }
    }

    pub(super) fn put_reference(&mut self, reference: &Reference, value: Value, scope: &Rc<Scope>) -> ScriptResult<()> {
        match reference {
            Reference::Binding(name) => scope.assign(name, value).map_err(scope_error),
            Reference::Property(object, key) => self.set_property(object, key, value),
        }
    }

    pub(super) fn eval_args(&mut self, args: &[Argument], scope: &Rc<Scope>) -> ScriptResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Argument::Expr(e) => values.push(self.eval(e, scope)?),
                Argument::Spread(e) => {
                    let value = self.eval(e, scope)?;
                    values.extend(self.iterate(&value)?);
                }
            }
        }
        Ok(values)
    }

    /// Member, index and call links; `None` when an optional link short-circuits
    fn eval_chain(&mut self, expr: &Expr, scope: &Rc<Scope>) -> ScriptResult<Option<Value>> {
        match &expr.kind {
            ExprKind::OptionalChain(inner) => Ok(Some(self.eval_chain(inner, scope)?.unwrap_or_default())),
            ExprKind::Member {
                object,
                property,
                optional,
                ..
            } => {
                let Some(object) = self.eval_link(object, *optional, scope)? else {
                    return Ok(None);
                };
                self.get_property(&object, property).map(Some)
            }
            ExprKind::Index {
                object,
                index,
                optional,
            } => {
                let Some(object) = self.eval_link(object, *optional, scope)? else {
                    return Ok(None);
                };
                let key = to_property_key(&self.eval(index, scope)?);
                self.get_property(&object, &key).map(Some)
            }
            ExprKind::Call {
                callee,
                args,
                optional,
                ..
            } => {
                let Some((this, func)) = self.eval_callee(callee, scope)? else {
                    return Ok(None);
                };
                if *optional && func.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_args(args, scope)?;
                if !func.is_callable() {
                    return Err(type_error(format!("{} is not a function", callee_text(callee))));
                }
                self.call(&func, &this, &args).map(Some)
            }
            _ => self.eval(expr, scope).map(Some),
        }
    }

    fn eval_link(&mut self, object: &Expr, optional: bool, scope: &Rc<Scope>) -> ScriptResult<Option<Value>> {
        let Some(value) = self.eval_chain(object, scope)? else {
            return Ok(None);
        };
        if optional && value.is_nullish() {
            return Ok(None);
        }
        Ok(Some(value))
    }

    /// Callee with its receiver
    fn eval_callee(&mut self, callee: &Expr, scope: &Rc<Scope>) -> ScriptResult<Option<(Value, Value)>> {
        match &callee.kind {
            ExprKind::Member {
                object,
                property,
                optional,
                ..
            } => {
                let Some(object) = self.eval_link(object, *optional, scope)? else {
                    return Ok(None);
                };
                let func = self.get_property(&object, property)?;
                Ok(Some((object, func)))
            }
            ExprKind::Index {
                object,
                index,
                optional,
            } => {
                let Some(object) = self.eval_link(object, *optional, scope)? else {
                    return Ok(None);
                };
                let key = to_property_key(&self.eval(index, scope)?);
                let func = self.get_property(&object, &key)?;
                Ok(Some((object, func)))
            }
            _ => Ok(self.eval_chain(callee, scope)?.map(|func| (Value::Undefined, func))),
        }
    }
}

fn short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !left.truthy(),
        LogicalOp::Or => left.truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

/// Source-like rendering of a callee for "is not a function" messages
fn callee_text(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.to_string(),
        ExprKind::Member { object, property, .. } => format!("{}.{}", callee_text(object), property),
        ExprKind::Index { object, .. } => format!("{}[...]", callee_text(object)),
        ExprKind::Paren(inner) | ExprKind::NonNull(inner) | ExprKind::OptionalChain(inner) => callee_text(inner),
        ExprKind::Call { callee, .. } => format!("{}(...)", callee_text(callee)),
        _ => "expression".to_string(),
    }
}
