//! Expression typing

use super::checker::{narrow_by_assignment, Site, TypeChecker};
use super::env::{BindingKind, FrameKind};
use super::error::{TypeCheckResult, TypeError};
use super::narrow::{path_of, property_of};
use super::relation::{is_assignable, missing_property};
use super::types::{ObjectType, PropType, Type};
use crate::compiler::parser::{
    ArrayElement, AssignOp, BinaryOp, Expr, ExprKind, LogicalOp, Pattern, PropertyDef,
    PropertyKey, TypeExpr, UnaryOp,
};
use crate::kit::lexer::SourceSpan;
use crate::kit::number::format_number;
use crate::kit::stack;
use std::rc::Rc;

fn strip_parens(expr: &Expr) -> &Expr {
    match &expr.kind {
        ExprKind::Paren(inner) => strip_parens(inner),
        _ => expr,
    }
}

fn may_be_string(ty: &Type) -> bool {
    ty.members()
        .iter()
        .any(|t| matches!(t, Type::String | Type::StringLit(_)))
}

/// Reference written as an assignment target
fn target_expr(pattern: &Pattern) -> Option<Expr> {
    match pattern {
        Pattern::Ident { name, span } => Some(Expr::new(ExprKind::Ident(name.clone()), *span)),
        Pattern::Expr(expr) => Some((**expr).clone()),
        _ => None,
    }
}

/// Type of `recv[idx]`
fn index_type(recv: &Type, idx: &Type) -> Type {
    match recv {
        Type::Any => Type::Any,
        Type::Union(members) => Type::union(members.iter().map(|m| index_type(m, idx))),
        Type::Array(element) => match idx {
            Type::StringLit(name) => super::builtins::member_type(recv, name).unwrap_or(Type::Any),
            _ => (**element).clone(),
        },
        Type::Tuple(items) => match idx {
            Type::NumberLit(n) if *n >= 0.0 && n.fract() == 0.0 => {
                items.get(*n as usize).cloned().unwrap_or(Type::Undefined)
            }
            Type::StringLit(name) => super::builtins::member_type(recv, name).unwrap_or(Type::Any),
            _ => Type::union(items.iter().cloned()),
        },
        Type::String | Type::StringLit(_) => match idx {
            Type::StringLit(name) => {
                super::builtins::member_type(&Type::String, name).unwrap_or(Type::Any)
            }
            _ => Type::String,
        },
        Type::Object(obj) => {
            let key = match idx {
                Type::StringLit(s) => Some(s.to_string()),
                Type::NumberLit(n) => Some(format_number(*n)),
                _ => None,
            };
            match key.as_deref().and_then(|k| obj.prop(k)) {
                Some(prop) if prop.optional => Type::union([prop.ty.clone(), Type::Undefined]),
                Some(prop) => prop.ty.clone(),
                None => obj.index.clone().unwrap_or(Type::Any),
            }
        }
        _ => Type::Any,
    }
}

impl TypeChecker {
    pub(super) fn check_expr(&mut self, expr: &Expr, expected: Option<&Type>) -> TypeCheckResult<Type> {
        stack::guarded(|| self.check_expr_kind(expr, expected))
    }

    fn check_expr_kind(&mut self, expr: &Expr, expected: Option<&Type>) -> TypeCheckResult<Type> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Type::NumberLit(*n)),
            ExprKind::String(s) => Ok(Type::StringLit(s.clone())),
            ExprKind::Template { exprs, .. } => {
                for part in exprs {
                    self.check_expr(part, None)?;
                }
                Ok(Type::String)
            }
            ExprKind::Bool(b) => Ok(Type::BoolLit(*b)),
            ExprKind::Null => Ok(Type::Null),
            ExprKind::Ident(name) => self.check_ident(name, expr.span),
            ExprKind::Array(elements) => self.check_array(elements, expected),
            ExprKind::Object(props) => self.check_object(props, expected, false),
            ExprKind::Function(func) => self.check_function(func, expected),
            ExprKind::Paren(inner) => self.check_expr(inner, expected),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand),
            ExprKind::Update { target, .. } => self.check_update(target),
            ExprKind::Binary { op, left, right } => {
                let lt = self.check_expr(left, None)?;
                let rt = self.check_expr(right, None)?;
                self.binary_result(*op, lt, rt, left, right)
            }
            ExprKind::Logical { op, left, right } => self.check_logical(*op, left, right, expected),
            ExprKind::Assign { op, target, value } => self.check_assign(*op, target, value),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.check_expr(test, None)?;
                let yes = self.in_branch(test, true, |c| c.check_expr(consequent, expected))?;
                let no = self.in_branch(test, false, |c| c.check_expr(alternate, expected))?;
                Ok(Type::union([yes, no]))
            }
            ExprKind::Call {
                callee,
                args,
                optional,
                ..
            } => self.check_call(callee, args, *optional),
            ExprKind::New {
                callee,
                type_args,
                args,
            } => self.check_new(callee, type_args, args),
            ExprKind::Member {
                object,
                property,
                property_span,
                optional,
            } => {
                let recv = self.check_expr(object, None)?;
                let recv = self.receiver(recv, object, *optional)?;
                self.member_of(&recv, expr, property, *property_span)
            }
            ExprKind::Index {
                object,
                index,
                optional,
            } => {
                let recv = self.check_expr(object, None)?;
                let recv = self.receiver(recv, object, *optional)?;
                let idx = self.check_expr(index, None)?;
                Ok(index_type(&recv, &idx))
            }
            ExprKind::OptionalChain(inner) => {
                let outer = std::mem::replace(&mut self.chain_short, false);
                let result = self.check_expr(inner, expected);
                let short = std::mem::replace(&mut self.chain_short, outer);
                let ty = result?;
                Ok(if short {
                    Type::union([ty, Type::Undefined])
                } else {
                    ty
                })
            }
            ExprKind::Sequence(items) => {
                let mut last = Type::Undefined;
                for (i, item) in items.iter().enumerate() {
                    let context = if i + 1 == items.len() { expected } else { None };
                    last = self.check_expr(item, context)?;
                }
                Ok(last)
            }
            ExprKind::TypeAssertion { expr: inner, ty } => match ty {
                TypeExpr::Named { name, .. } if &**name == "const" => self.check_const(inner),
                _ => {
                    let target = self.lower(ty)?;
                    self.check_expr(inner, Some(&target))?;
                    Ok(target)
                }
            },
            ExprKind::NonNull(inner) => Ok(self.check_expr(inner, expected)?.non_nullable()),
        }
    }

    /// Check `body` with the narrowings implied by `test` being `truthy`
    fn in_branch(
        &mut self,
        test: &Expr,
        truthy: bool,
        body: impl FnOnce(&mut Self) -> TypeCheckResult<Type>,
    ) -> TypeCheckResult<Type> {
        self.env.push(FrameKind::Branch);
        self.narrow_condition(test, truthy);
        let result = body(self);
        self.env.pop();
        result
    }

    fn check_ident(&mut self, name: &Rc<str>, span: SourceSpan) -> TypeCheckResult<Type> {
        self.env.current(name).ok_or_else(|| TypeError::CannotFindName {
            name: name.to_string(),
            location: span.coordinate(),
        })
    }

    fn check_array(&mut self, elements: &[ArrayElement], expected: Option<&Type>) -> TypeCheckResult<Type> {
        let context = expected.map(Type::non_nullable);
        let tuple = match &context {
            Some(Type::Tuple(items)) => Some(items.clone()),
            _ => None,
        };
        let element_context = context.as_ref().map(Type::element_type);
        let mut parts = Vec::with_capacity(elements.len());
        let mut spread = false;
        for (i, element) in elements.iter().enumerate() {
            match element {
                ArrayElement::Expr(item) => {
                    let item_context = tuple
                        .as_ref()
                        .and_then(|items| items.get(i).cloned())
                        .or_else(|| element_context.clone());
                    parts.push(self.check_expr(item, item_context.as_ref())?);
                }
                ArrayElement::Spread(inner) => {
                    spread = true;
                    let ty = self.check_expr(inner, None)?;
                    parts.push(self.iterated_type(&ty, inner)?);
                }
                ArrayElement::Hole => parts.push(Type::Undefined),
            }
        }
        if let Some(items) = tuple.filter(|items| !spread && items.len() == parts.len()) {
            return Ok(Type::Tuple(
                parts
                    .into_iter()
                    .zip(items)
                    .map(|(part, item)| if item.is_literal() { part } else { part.widen() })
                    .collect(),
            ));
        }
        if parts.is_empty() {
            return Ok(Type::array(element_context.unwrap_or(Type::Any)));
        }
        let element = Type::union(parts);
        let keep_literals = element_context.as_ref().is_some_and(Type::is_literal);
        Ok(Type::array(if keep_literals { element } else { element.widen() }))
    }

    fn check_object(
        &mut self,
        props: &[PropertyDef],
        expected: Option<&Type>,
        keep_literals: bool,
    ) -> TypeCheckResult<Type> {
        let mut obj = ObjectType::default();
        let mut computed = Vec::new();
        let mut opaque = false;
        for prop in props {
            match prop {
                PropertyDef::Init {
                    key: PropertyKey::Named(name),
                    value,
                    ..
                } => {
                    let context = expected.and_then(|e| self.expected_property(e, name));
                    let ty = self.check_expr(value, context.as_ref())?;
                    let keep = keep_literals || context.as_ref().is_some_and(Type::is_literal);
                    obj.props.retain(|p| p.name != *name);
                    obj.props.push(PropType {
                        name: name.clone(),
                        ty: if keep { ty } else { ty.widen() },
                        optional: false,
                        readonly: keep_literals,
                    });
                }
                PropertyDef::Init {
                    key: PropertyKey::Computed(key),
                    value,
                    ..
                } => {
                    self.check_expr(key, None)?;
                    computed.push(self.check_expr(value, None)?.widen());
                }
                PropertyDef::Spread(inner) => match self.check_expr(inner, None)?.non_nullable() {
                    Type::Object(source) => {
                        for p in &source.props {
                            obj.props.retain(|own| own.name != p.name);
                            obj.props.push(p.clone());
                        }
                        if let Some(index) = &source.index {
                            computed.push(index.clone());
                        }
                    }
                    Type::Any => opaque = true,
                    _ => {}
                },
            }
        }
        if opaque {
            return Ok(Type::Any);
        }
        if !computed.is_empty() {
            obj.index = Some(Type::union(computed));
        }
        Ok(Type::Object(Rc::new(obj)))
    }

    /// Contextual type of property `name` within `expected`
    fn expected_property(&self, expected: &Type, name: &str) -> Option<Type> {
        let mut found = Vec::new();
        for member in expected.non_nullable().members() {
            match member {
                Type::Object(obj) => {
                    if let Some(prop) = obj.prop(name) {
                        found.push(prop.ty.clone());
                    } else if let Some(index) = &obj.index {
                        found.push(index.clone());
                    }
                }
                Type::Any => found.push(Type::Any),
                _ => {}
            }
        }
        (!found.is_empty()).then(|| Type::union(found))
    }

    /// `expr as const`: arrays become tuples and literals are kept
    fn check_const(&mut self, inner: &Expr) -> TypeCheckResult<Type> {
        match &strip_parens(inner).kind {
            ExprKind::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(match element {
                        ArrayElement::Expr(item) => self.check_const(item)?,
                        ArrayElement::Spread(item) => {
                            let ty = self.check_expr(item, None)?;
                            self.iterated_type(&ty, item)?
                        }
                        ArrayElement::Hole => Type::Undefined,
                    });
                }
                Ok(Type::Tuple(items))
            }
            ExprKind::Object(props) => self.check_object(props, None, true),
            _ => self.check_expr(inner, None),
        }
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr) -> TypeCheckResult<Type> {
        let ty = self.check_expr(operand, None)?;
        match op {
            UnaryOp::Not | UnaryOp::Delete => Ok(Type::Boolean),
            UnaryOp::Typeof => Ok(Type::String),
            UnaryOp::Void => Ok(Type::Undefined),
            UnaryOp::Plus => Ok(Type::Number),
            UnaryOp::Minus | UnaryOp::BitNot => {
                let ty = self.require_present(ty, operand)?;
                if let (UnaryOp::Minus, Type::NumberLit(n)) = (op, &ty) {
                    return Ok(Type::NumberLit(-n));
                }
                if ty.is_number_like() {
                    Ok(Type::Number)
                } else {
                    Err(TypeError::ArithmeticOperand {
                        location: operand.span.coordinate(),
                    })
                }
            }
        }
    }

    fn check_update(&mut self, target: &Expr) -> TypeCheckResult<Type> {
        self.check_writable(target)?;
        let ty = self.check_expr(target, None)?;
        let ty = self.require_present(ty, target)?;
        if !ty.is_number_like() {
            return Err(TypeError::ArithmeticOperand {
                location: target.span.coordinate(),
            });
        }
        if let Some(path) = path_of(target) {
            self.env.invalidate(&path);
        }
        Ok(Type::Number)
    }

    /// Result of a binary operator applied to already checked operands
    fn binary_result(
        &mut self,
        op: BinaryOp,
        lt: Type,
        rt: Type,
        left: &Expr,
        right: &Expr,
    ) -> TypeCheckResult<Type> {
        match op {
            BinaryOp::Add => self.check_addition(lt, rt, left, right),
            op if op.is_arithmetic() => {
                self.arithmetic_operand(lt, left, true)?;
                self.arithmetic_operand(rt, right, false)?;
                Ok(Type::Number)
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                self.check_comparison(op, lt, rt, left, right)?;
                Ok(Type::Boolean)
            }
            _ => Ok(Type::Boolean),
        }
    }

    fn arithmetic_operand(&mut self, ty: Type, expr: &Expr, is_left: bool) -> TypeCheckResult<()> {
        if ty.is_any() {
            return Ok(());
        }
        let ty = self.require_present(ty, expr)?;
        if ty.is_number_like() {
            return Ok(());
        }
        let location = expr.span.coordinate();
        Err(if is_left {
            TypeError::ArithmeticLeft { location }
        } else {
            TypeError::ArithmeticRight { location }
        })
    }

    fn check_addition(&mut self, lt: Type, rt: Type, left: &Expr, right: &Expr) -> TypeCheckResult<Type> {
        if may_be_string(&lt) || may_be_string(&rt) {
            return Ok(Type::String);
        }
        if lt.is_any() || rt.is_any() {
            return Ok(Type::Any);
        }
        let lt = self.require_present(lt, left)?;
        let rt = self.require_present(rt, right)?;
        if lt.is_number_like() && rt.is_number_like() {
            return Ok(Type::Number);
        }
        Err(TypeError::OperatorMismatch {
            op: BinaryOp::Add.symbol().to_string(),
            left: lt.widen().to_string(),
            right: rt.widen().to_string(),
            location: left.span.coordinate(),
        })
    }

    fn check_comparison(
        &mut self,
        op: BinaryOp,
        lt: Type,
        rt: Type,
        left: &Expr,
        right: &Expr,
    ) -> TypeCheckResult<()> {
        if lt.is_any() || rt.is_any() {
            return Ok(());
        }
        let lt = self.require_present(lt, left)?;
        let rt = self.require_present(rt, right)?;
        let numbers = lt.is_number_like() && rt.is_number_like();
        let strings = lt.is_string_like() && rt.is_string_like();
        if numbers || strings {
            return Ok(());
        }
        Err(TypeError::OperatorMismatch {
            op: op.symbol().to_string(),
            left: lt.widen().to_string(),
            right: rt.widen().to_string(),
            location: left.span.coordinate(),
        })
    }

    fn check_logical(
        &mut self,
        op: LogicalOp,
        left: &Expr,
        right: &Expr,
        expected: Option<&Type>,
    ) -> TypeCheckResult<Type> {
        let lt = self.check_expr(left, expected)?;
        let rt = match op {
            LogicalOp::And => self.in_branch(left, true, |c| c.check_expr(right, expected))?,
            LogicalOp::Or => self.in_branch(left, false, |c| c.check_expr(right, expected))?,
            LogicalOp::Nullish => self.check_expr(right, expected)?,
        };
        Ok(match op {
            LogicalOp::And => Type::union([lt.falsy_part(), rt]),
            LogicalOp::Or => Type::union([lt.truthy_part(), rt]),
            LogicalOp::Nullish => Type::union([lt.non_nullable(), rt]),
        })
    }

    // ---- assignment ----

    /// Reject writes to constants and undeclared names
    fn check_writable(&mut self, target: &Expr) -> TypeCheckResult<()> {
        let ExprKind::Ident(name) = &strip_parens(target).kind else {
            return Ok(());
        };
        match self.env.lookup(name) {
            None => Err(TypeError::CannotFindName {
                name: name.to_string(),
                location: target.span.coordinate(),
            }),
            Some(binding) if binding.kind == BindingKind::Const => Err(TypeError::ConstAssignment {
                name: name.to_string(),
                location: target.span.coordinate(),
            }),
            Some(_) => Ok(()),
        }
    }

    /// Type a value written through `target` must have
    fn assignment_target_type(&mut self, target: &Expr) -> TypeCheckResult<Type> {
        match &target.kind {
            ExprKind::Ident(name) => self
                .env
                .lookup(name)
                .map(|b| b.declared.clone())
                .ok_or_else(|| TypeError::CannotFindName {
                    name: name.to_string(),
                    location: target.span.coordinate(),
                }),
            ExprKind::Paren(inner) => self.assignment_target_type(inner),
            ExprKind::Member {
                object,
                property,
                property_span,
                ..
            } => {
                let recv = self.check_expr(object, None)?;
                let recv = self.require_present(recv, object)?;
                self.property_type(&recv, property, *property_span)
            }
            ExprKind::Index { object, index, .. } => {
                let recv = self.check_expr(object, None)?;
                let recv = self.require_present(recv, object)?;
                let idx = self.check_expr(index, None)?;
                Ok(match recv {
                    Type::Tuple(_) | Type::Object(_) => index_type(&recv, &idx),
                    other => other.element_type(),
                })
            }
            _ => self.check_expr(target, None),
        }
    }

    /// Record that `target` now holds a value of type `assigned`
    fn record_assignment(&mut self, target: &Expr, declared: &Type, assigned: &Type) {
        let Some(path) = path_of(target) else {
            return;
        };
        self.env.invalidate(&path);
        let narrowed = narrow_by_assignment(declared, assigned);
        if narrowed != *declared {
            self.env.narrow(path, narrowed);
        }
    }

    fn check_assign(&mut self, op: AssignOp, target: &Pattern, value: &Expr) -> TypeCheckResult<Type> {
        let Some(left) = target_expr(target) else {
            let ty = self.check_expr(value, None)?;
            self.assign_pattern(target, &ty)?;
            return Ok(ty);
        };
        self.check_writable(&left)?;
        let declared = self.assignment_target_type(&left)?;
        let at = Site::Assign(left.span.coordinate());
        match op {
            AssignOp::Assign => {
                let ty = self.check_expr(value, Some(&declared))?;
                self.expect_assignable(Some(value), &ty, &declared, at)?;
                self.record_assignment(&left, &declared, &ty);
                Ok(ty)
            }
            AssignOp::Compound(bin) => {
                let current = self.check_expr(&left, None)?;
                let rt = self.check_expr(value, None)?;
                let result = self.binary_result(bin, current, rt, &left, value)?;
                self.expect_assignable(None, &result, &declared, at)?;
                self.record_assignment(&left, &declared, &result);
                Ok(result)
            }
            AssignOp::Logical(logical) => {
                let current = self.check_expr(&left, None)?;
                let rt = self.check_expr(value, Some(&declared))?;
                self.expect_assignable(Some(value), &rt, &declared, at)?;
                let kept = match logical {
                    LogicalOp::And => current.falsy_part(),
                    LogicalOp::Or => current.truthy_part(),
                    LogicalOp::Nullish => current.non_nullable(),
                };
                let result = Type::union([kept, rt]);
                self.record_assignment(&left, &declared, &result);
                Ok(result)
            }
        }
    }

    /// Destructuring assignment and `for (target of ...)`
    pub(super) fn assign_pattern(&mut self, pattern: &Pattern, value: &Type) -> TypeCheckResult<()> {
        match pattern {
            Pattern::Ident { .. } | Pattern::Expr(_) => {
                let Some(target) = target_expr(pattern) else {
                    return Ok(());
                };
                self.check_writable(&target)?;
                let declared = self.assignment_target_type(&target)?;
                self.expect_assignable(None, value, &declared, Site::Assign(target.span.coordinate()))?;
                self.record_assignment(&target, &declared, value);
                Ok(())
            }
            Pattern::Object { props, rest, .. } => {
                for prop in props {
                    let ty = match &prop.key {
                        PropertyKey::Named(key) => property_of(value, key).unwrap_or(Type::Any),
                        PropertyKey::Computed(key) => {
                            self.check_expr(key, None)?;
                            Type::Any
                        }
                    };
                    let ty = self.with_default(ty, prop.default.as_ref())?;
                    self.assign_pattern(&prop.value, &ty)?;
                }
                if let Some(rest) = rest {
                    self.assign_pattern(rest, &Type::Any)?;
                }
                Ok(())
            }
            Pattern::Array { elements, rest, .. } => {
                for (i, element) in elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    let ty = match value {
                        Type::Tuple(items) => items.get(i).cloned().unwrap_or(Type::Undefined),
                        other => other.element_type(),
                    };
                    let ty = self.with_default(ty, element.default.as_ref())?;
                    self.assign_pattern(&element.pattern, &ty)?;
                }
                if let Some(rest) = rest {
                    self.assign_pattern(rest, &Type::array(value.element_type()))?;
                }
                Ok(())
            }
        }
    }

    // ---- member access ----

    /// Receiver of a member access after the presence check
    pub(super) fn receiver(&mut self, recv: Type, object: &Expr, optional: bool) -> TypeCheckResult<Type> {
        if !optional {
            return self.require_present(recv, object);
        }
        match recv {
            Type::Any => {
                self.chain_short = true;
                Ok(Type::Any)
            }
            Type::Unknown => Err(self.unknown_error(object)),
            ty if ty.is_nullish() => {
                self.chain_short = true;
                Ok(Type::Any)
            }
            ty => {
                if ty.has_undefined() || ty.has_null() {
                    self.chain_short = true;
                }
                Ok(ty.non_nullable())
            }
        }
    }

    /// `recv.property`, honoring a narrowing of the member's path
    pub(super) fn member_of(
        &mut self,
        recv: &Type,
        member: &Expr,
        property: &str,
        property_span: SourceSpan,
    ) -> TypeCheckResult<Type> {
        let ty = self.property_type(recv, property, property_span)?;
        if let Some(path) = path_of(member) {
            if let Some(narrowed) = self.env.narrowed(&path) {
                return Ok(narrowed.clone());
            }
        }
        Ok(ty)
    }

    fn property_type(&mut self, recv: &Type, property: &str, span: SourceSpan) -> TypeCheckResult<Type> {
        property_of(recv, property).ok_or_else(|| TypeError::PropertyMissing {
            property: property.to_string(),
            ty: recv.to_string(),
            location: span.coordinate(),
        })
    }

    /// The value of `expr` must not be `unknown`, `undefined` or `null`
    pub(super) fn require_present(&mut self, ty: Type, expr: &Expr) -> TypeCheckResult<Type> {
        let location = expr.span.coordinate();
        if ty.is_any() {
            return Ok(ty);
        }
        if ty == Type::Unknown {
            return Err(self.unknown_error(expr));
        }
        if ty.has_undefined() {
            return Err(match path_of(expr) {
                Some(name) => TypeError::NamePossiblyUndefined { name, location },
                None => TypeError::PossiblyUndefined { location },
            });
        }
        if ty.has_null() {
            return Err(match path_of(expr) {
                Some(name) => TypeError::NamePossiblyNull { name, location },
                None => TypeError::PossiblyNull { location },
            });
        }
        Ok(ty)
    }

    pub(super) fn unknown_error(&self, expr: &Expr) -> TypeError {
        let location = expr.span.coordinate();
        match path_of(expr) {
            Some(name) => TypeError::UnknownValue { name, location },
            None => TypeError::UnknownObject { location },
        }
    }

    // ---- relations ----

    /// `source` must be assignable to `target`; `expr` is the value's syntax, when known
    pub(super) fn expect_assignable(
        &mut self,
        expr: Option<&Expr>,
        source: &Type,
        target: &Type,
        site: Site,
    ) -> TypeCheckResult<()> {
        let literal = expr.map(strip_parens);
        if let Some(ExprKind::Object(props)) = literal.map(|e| &e.kind) {
            self.check_excess(props, target)?;
        }
        if is_assignable(source, target) {
            return Ok(());
        }
        match literal.map(|e| &e.kind) {
            Some(ExprKind::Object(props)) => self.elaborate_object(props, target)?,
            Some(ExprKind::Array(elements)) => {
                if let Type::Array(element) = target.non_nullable() {
                    let element = *element;
                    for item in elements {
                        let ArrayElement::Expr(item) = item else { continue };
                        let ty = self.check_expr(item, Some(&element))?;
                        let at = Site::Assign(item.span.coordinate());
                        self.expect_assignable(Some(item), &ty, &element, at)?;
                    }
                }
            }
            _ => {}
        }
        Err(relation_error(source, target, site))
    }

    /// Fresh object literals may not name properties the target lacks
    fn check_excess(&mut self, props: &[PropertyDef], target: &Type) -> TypeCheckResult<()> {
        let target = target.non_nullable();
        let Type::Object(obj) = &target else {
            return Ok(());
        };
        if obj.index.is_some() || obj.call.is_some() {
            return Ok(());
        }
        for prop in props {
            let PropertyDef::Init {
                key: PropertyKey::Named(name),
                value,
                span,
                ..
            } = prop
            else {
                continue;
            };
            let Some(expected) = obj.prop(name) else {
                return Err(TypeError::ExcessProperty {
                    property: name.to_string(),
                    target: target.to_string(),
                    location: span.coordinate(),
                });
            };
            if let ExprKind::Object(inner) = &strip_parens(value).kind {
                self.check_excess(inner, &expected.ty)?;
            }
        }
        Ok(())
    }

    /// Blame the first property of an object literal whose value does not fit
    fn elaborate_object(&mut self, props: &[PropertyDef], target: &Type) -> TypeCheckResult<()> {
        let Type::Object(obj) = target.non_nullable() else {
            return Ok(());
        };
        for prop in props {
            let PropertyDef::Init {
                key: PropertyKey::Named(name),
                value,
                span,
                ..
            } = prop
            else {
                continue;
            };
            let Some(expected) = obj.prop(name) else {
                continue;
            };
            let expected = if expected.optional {
                Type::union([expected.ty.clone(), Type::Undefined])
            } else {
                expected.ty.clone()
            };
            let ty = self.check_expr(value, Some(&expected))?;
            if !is_assignable(&ty, &expected) {
                self.expect_assignable(Some(value), &ty, &expected, Site::Assign(span.coordinate()))?;
            }
        }
        Ok(())
    }
}

/// Error for a failed relation check at `site`
fn relation_error(source: &Type, target: &Type, site: Site) -> TypeError {
    let shown = if target.is_literal() {
        source.clone()
    } else {
        source.widen()
    };
    if let (Type::Object(obj), Type::Object(_), Site::Assign(location)) =
        (target.non_nullable(), source, site)
    {
        if let Some(property) = missing_property(source, &obj) {
            return TypeError::MissingProperty {
                property: property.to_string(),
                source_ty: shown.to_string(),
                target: Type::Object(obj).to_string(),
                location,
            };
        }
    }
    match site {
        Site::Assign(location) => TypeError::NotAssignable {
            source_ty: shown.to_string(),
            target: target.to_string(),
            location,
        },
        Site::Argument(location) => TypeError::ArgumentMismatch {
            source_ty: shown.to_string(),
            target: target.to_string(),
            location,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::{parse_program, Syntax};
    use crate::kit::lexer::Coordinate;

    fn check(source: &str) -> TypeCheckResult<()> {
        let program = parse_program(source, Syntax::Typed).unwrap();
        super::super::checker::check_program(&program)
    }

    #[test]
    fn test_index_type() {
        let tuple = Type::Tuple(vec![Type::String, Type::Number]);
        assert_eq!(index_type(&tuple, &Type::NumberLit(1.0)), Type::Number);
        assert_eq!(index_type(&tuple, &Type::NumberLit(5.0)), Type::Undefined);
        assert_eq!(index_type(&Type::array(Type::Boolean), &Type::Number), Type::Boolean);
        assert_eq!(index_type(&Type::String, &Type::StringLit(Rc::from("length"))), Type::Number);
    }

    #[test]
    fn test_string_concatenation() {
        assert!(check("const s: string = 'n = ' + 1;").is_ok());
        let err = check("const b = true + 1;").unwrap_err();
        assert_eq!(err.code(), 2365);
        assert_eq!(err.to_string(), "Operator '+' cannot be applied to types 'boolean' and 'number'.");
    }

    #[test]
    fn test_property_elaboration() {
        let err = check("interface P { x: number }\nconst p: P = { x: 'a' };").unwrap_err();
        assert_eq!(err.code(), 2322);
        assert_eq!(err.location(), Coordinate::new(2, 16));
        assert_eq!(err.to_string(), "Type 'string' is not assignable to type 'number'.");
    }

    #[test]
    fn test_literal_targets_keep_literal_source() {
        let err = check("let d: 'up' | 'down' = 'left';").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type '\"left\"' is not assignable to type '\"up\" | \"down\"'."
        );
    }

    #[test]
    fn test_optional_chain_adds_undefined() {
        let source = "interface L { v: number }\ninterface N { next?: L }\nfunction f(n: N) { const v: number = n.next?.v; }";
        assert_eq!(check(source).unwrap_err().code(), 2322);
        let source = "interface L { v: number }\ninterface N { next?: L }\nfunction f(n: N) { const v = n.next?.v ?? 0; return v + 1; }";
        assert!(check(source).is_ok());
    }

    #[test]
    fn test_compound_assignment() {
        assert!(check("let s = 'a'; s += 1;").is_ok());
        assert_eq!(check("let n = 1; n += 'a';").unwrap_err().code(), 2322);
        assert_eq!(check("const n = 1; n += 1;").unwrap_err().code(), 2588);
    }

    #[test]
    fn test_as_const_keeps_literals() {
        assert!(check("const dirs = ['up', 'down'] as const; const d: 'up' | 'down' = dirs[0];").is_ok());
    }
}
