//! Calls, construction and function bodies

use super::builtins::member_type;
use super::checker::{param_name, FunctionContext, Site, TypeChecker};
use super::env::{BindingKind, FrameKind, TypeDecl};
use super::error::{TypeCheckResult, TypeError};
use super::types::{FunctionType, ParamType, Type};
use crate::compiler::parser::{
    Argument, ArrayElement, Expr, ExprKind, FunctionBody, FunctionNode, Param, Pattern, TypeExpr,
};
use std::rc::Rc;

/// Signature a value of type `ty` can be called through
fn call_signature(ty: &Type) -> Option<Rc<FunctionType>> {
    match ty {
        Type::Function(f) => Some(f.clone()),
        Type::Object(obj) => obj.call.clone(),
        _ => None,
    }
}

/// Signature contextually typing a function expression
fn contextual_signature(expected: &Type) -> Option<Rc<FunctionType>> {
    expected
        .non_nullable()
        .members()
        .iter()
        .find_map(call_signature)
}

fn callable(ty: &Type) -> bool {
    ty.is_any() || call_signature(ty).is_some()
}

/// Return type of a callback argument
fn callback_return(ty: &Type) -> Type {
    call_signature(ty).map_or(Type::Any, |f| f.ret.clone())
}

fn arity(required: usize, positional: usize) -> String {
    if required == positional {
        required.to_string()
    } else {
        format!("{}-{}", required, positional)
    }
}

/// Expected type of argument `index`; optional parameters also accept `undefined`
fn argument_type(sig: &FunctionType, index: usize) -> Option<Type> {
    match sig.params.get(index) {
        Some(p) if p.optional && !p.rest => Some(Type::union([p.ty.clone(), Type::Undefined])),
        _ => sig.param_type(index),
    }
}

/// Inferred return type from the collected `return` statements
fn infer_return(ctx: &FunctionContext, falls_through: bool) -> Type {
    if ctx.returns.is_empty() {
        return Type::Void;
    }
    let keep_literals = ctx.contextual.as_ref().is_some_and(Type::is_literal);
    let mut parts: Vec<Type> = ctx
        .returns
        .iter()
        .map(|t| if keep_literals { t.clone() } else { t.widen() })
        .collect();
    if falls_through || ctx.bare_return {
        parts.push(Type::Undefined);
    }
    Type::union(parts)
}

impl TypeChecker {
    pub(super) fn check_call(
        &mut self,
        callee: &Expr,
        args: &[Argument],
        optional: bool,
    ) -> TypeCheckResult<Type> {
        let callee_ty = match &callee.kind {
            ExprKind::Member {
                object,
                property,
                property_span,
                optional: member_optional,
            } => {
                let recv = self.check_expr(object, None)?;
                let recv = self.receiver(recv, object, *member_optional)?;
                if let Some(ty) = self.check_builtin_method(&recv, property, args, callee)? {
                    return Ok(ty);
                }
                self.member_of(&recv, callee, property, *property_span)?
            }
            _ => self.check_expr(callee, None)?,
        };
        let callee_ty = if optional && !callee_ty.is_any() {
            if callee_ty.has_undefined() || callee_ty.has_null() {
                self.chain_short = true;
            }
            callee_ty.non_nullable()
        } else {
            callee_ty
        };
        self.call_through(&callee_ty, callee, args)
    }

    fn call_through(&mut self, callee_ty: &Type, callee: &Expr, args: &[Argument]) -> TypeCheckResult<Type> {
        let location = callee.span.coordinate();
        if let Some(sig) = call_signature(callee_ty) {
            self.check_arguments(&sig, args, callee)?;
            return Ok(sig.ret.clone());
        }
        match callee_ty {
            Type::Any => {
                self.check_untyped_arguments(args)?;
                Ok(Type::Any)
            }
            Type::Unknown => Err(self.unknown_error(callee)),
            ty if ty.has_undefined() => Err(TypeError::InvokePossiblyUndefined { location }),
            ty if ty.has_null() => Err(TypeError::PossiblyNull { location }),
            Type::Union(members) if members.iter().all(callable) => {
                self.check_untyped_arguments(args)?;
                Ok(Type::union(members.iter().map(callback_return)))
            }
            ty => Err(TypeError::NotCallable {
                ty: ty.to_string(),
                location,
            }),
        }
    }

    /// Arguments of a call whose signature is unknown
    fn check_untyped_arguments(&mut self, args: &[Argument]) -> TypeCheckResult<Vec<Type>> {
        let mut types = Vec::with_capacity(args.len());
        for arg in args {
            types.push(self.check_expr(arg.expr(), Some(&Type::Any))?);
        }
        Ok(types)
    }

    /// Check arguments against `sig`: contextual typing, then arity, then each argument
    pub(super) fn check_arguments(
        &mut self,
        sig: &FunctionType,
        args: &[Argument],
        callee: &Expr,
    ) -> TypeCheckResult<Vec<Type>> {
        let mut types = Vec::with_capacity(args.len());
        let mut spread = false;
        for (i, arg) in args.iter().enumerate() {
            match arg {
                Argument::Expr(expr) => {
                    let expected = sig.param_type(i).unwrap_or(Type::Any);
                    types.push(self.check_expr(expr, Some(&expected))?);
                }
                Argument::Spread(expr) => {
                    spread = true;
                    types.push(self.check_expr(expr, None)?);
                }
            }
        }
        if !spread {
            let (required, positional) = (sig.required_count(), sig.positional_count());
            if args.len() < required {
                let got = args.len();
                let location = callee.span.coordinate();
                return Err(if sig.has_rest() {
                    TypeError::TooFewArguments {
                        min: required,
                        got,
                        location,
                    }
                } else {
                    TypeError::ArgumentCount {
                        expected: arity(required, positional),
                        got,
                        location,
                    }
                });
            }
            if !sig.has_rest() && args.len() > positional {
                return Err(TypeError::ArgumentCount {
                    expected: arity(required, positional),
                    got: args.len(),
                    location: args[positional].expr().span.coordinate(),
                });
            }
        }
        for (i, arg) in args.iter().enumerate() {
            let Argument::Expr(expr) = arg else { continue };
            let Some(expected) = argument_type(sig, i) else {
                continue;
            };
            let at = Site::Argument(expr.span.coordinate());
            self.expect_assignable(Some(expr), &types[i], &expected, at)?;
        }
        Ok(types)
    }

    /// Library methods whose result depends on their callbacks or arguments
    fn check_builtin_method(
        &mut self,
        recv: &Type,
        name: &str,
        args: &[Argument],
        callee: &Expr,
    ) -> TypeCheckResult<Option<Type>> {
        let is_array = matches!(recv, Type::Array(_) | Type::Tuple(_));
        let promised = match recv {
            Type::Promise(inner) => Some((**inner).clone()),
            _ => None,
        };
        let is_promise_ctor =
            matches!(recv, Type::Object(obj) if obj.name.as_deref() == Some("PromiseConstructor"));
        match name {
            "map" | "flatMap" if is_array => {
                let Some(Type::Function(sig)) = member_type(recv, name) else {
                    return Ok(None);
                };
                let types = self.check_arguments(&sig, args, callee)?;
                let ret = types.first().map_or(Type::Any, callback_return);
                let element = match (name, ret) {
                    ("flatMap", Type::Array(inner)) => *inner,
                    ("flatMap", Type::Tuple(items)) => Type::union(items),
                    (_, other) => other,
                };
                Ok(Some(Type::array(element.widen())))
            }
            "reduce" if is_array => {
                let element = recv.element_type();
                let acc = match args.get(1) {
                    Some(Argument::Expr(init)) => self.check_expr(init, None)?.widen(),
                    Some(Argument::Spread(_)) => Type::Any,
                    None => element.clone(),
                };
                let callback = Type::function(
                    vec![
                        ParamType::new("previousValue", acc.clone()),
                        ParamType::new("currentValue", element.clone()),
                        ParamType::new("currentIndex", Type::Number),
                        ParamType::new("array", Type::array(element)),
                    ],
                    acc.clone(),
                );
                let sig = FunctionType::new(
                    vec![
                        ParamType::new("callbackfn", callback),
                        ParamType {
                            optional: true,
                            ..ParamType::new("initialValue", acc.clone())
                        },
                    ],
                    acc.clone(),
                );
                self.check_arguments(&sig, args, callee)?;
                Ok(Some(acc))
            }
            "then" | "catch" => {
                let Some(inner) = promised else {
                    return Ok(None);
                };
                let Some(Type::Function(sig)) = member_type(recv, name) else {
                    return Ok(None);
                };
                let types = self.check_arguments(&sig, args, callee)?;
                let settled = |t: &Type| callback_return(t).awaited();
                let value = if name == "then" {
                    let fulfilled = match types.first() {
                        Some(t) if callable(t) => settled(t),
                        _ => inner,
                    };
                    let rejected = types.get(1).filter(|t| callable(t)).map(settled);
                    Type::union(std::iter::once(fulfilled).chain(rejected))
                } else {
                    let recovered = types.first().filter(|t| callable(t)).map(settled);
                    Type::union(std::iter::once(inner).chain(recovered))
                };
                Ok(Some(Type::Promise(Box::new(value))))
            }
            "resolve" | "all" | "race" if is_promise_ctor => {
                let Some(Type::Function(sig)) = member_type(recv, name) else {
                    return Ok(None);
                };
                let types = self.check_arguments(&sig, args, callee)?;
                let value = match name {
                    "resolve" => types.first().map_or(Type::Void, |t| t.awaited().widen()),
                    "all" => self.all_settled_value(args, types.first())?,
                    _ => types
                        .first()
                        .map_or(Type::Any, |t| t.element_type().awaited()),
                };
                Ok(Some(Type::Promise(Box::new(value))))
            }
            _ => Ok(None),
        }
    }

    /// Value of `Promise.all(values)`
    fn all_settled_value(&mut self, args: &[Argument], values: Option<&Type>) -> TypeCheckResult<Type> {
        if let Some(Argument::Expr(expr)) = args.first() {
            if let ExprKind::Array(elements) = &expr.kind {
                if elements.iter().all(|e| matches!(e, ArrayElement::Expr(_))) {
                    let mut items = Vec::with_capacity(elements.len());
                    for element in elements {
                        if let ArrayElement::Expr(item) = element {
                            items.push(self.check_expr(item, None)?.awaited().widen());
                        }
                    }
                    return Ok(Type::Tuple(items));
                }
            }
        }
        Ok(match values {
            Some(Type::Tuple(items)) => Type::Tuple(items.iter().map(Type::awaited).collect()),
            Some(other) => Type::array(other.element_type().awaited()),
            None => Type::array(Type::Any),
        })
    }

    pub(super) fn check_new(
        &mut self,
        callee: &Expr,
        type_args: &[TypeExpr],
        args: &[Argument],
    ) -> TypeCheckResult<Type> {
        let callee_ty = self.check_expr(callee, None)?;
        let builtin = match &callee_ty {
            Type::Object(obj) => obj.name.as_deref().map(str::to_string),
            _ => None,
        };
        match builtin.as_deref() {
            Some("PromiseConstructor") => return self.check_new_promise(type_args, args, callee),
            Some("ArrayConstructor") if !type_args.is_empty() => {
                let element = self.lower(&type_args[0])?;
                self.check_untyped_arguments(args)?;
                return Ok(Type::array(element));
            }
            _ => {}
        }
        match &callee_ty {
            Type::Object(obj) if obj.construct.is_some() => {
                let Some(sig) = obj.construct.clone() else {
                    return Ok(Type::Any);
                };
                self.check_arguments(&sig, args, callee)?;
                Ok(sig.ret.clone())
            }
            Type::Any | Type::Function(_) => {
                self.check_untyped_arguments(args)?;
                Ok(Type::Any)
            }
            Type::Unknown => Err(self.unknown_error(callee)),
            ty => Err(TypeError::NotConstructable {
                ty: ty.to_string(),
                location: callee.span.coordinate(),
            }),
        }
    }

    /// `new Promise<T>(executor)`; without `T` the value is `unknown`
    fn check_new_promise(
        &mut self,
        type_args: &[TypeExpr],
        args: &[Argument],
        callee: &Expr,
    ) -> TypeCheckResult<Type> {
        let value = match type_args.first() {
            Some(te) => self.lower(te)?,
            None => Type::Unknown,
        };
        let resolve = Type::function(
            vec![ParamType {
                optional: matches!(value, Type::Void | Type::Unknown | Type::Any),
                ..ParamType::new("value", value.clone())
            }],
            Type::Void,
        );
        let reject = Type::function(
            vec![ParamType {
                optional: true,
                ..ParamType::new("reason", Type::Any)
            }],
            Type::Void,
        );
        let executor = Type::function(
            vec![
                ParamType::new("resolve", resolve),
                ParamType::new("reject", reject),
            ],
            Type::Void,
        );
        let promise = Type::Promise(Box::new(value));
        let sig = FunctionType::new(vec![ParamType::new("executor", executor)], promise.clone());
        self.check_arguments(&sig, args, callee)?;
        Ok(promise)
    }

    // ---- function bodies ----

    /// Type a function and check its body; `expected` gives untyped parameters their types
    pub(super) fn check_function(
        &mut self,
        func: &FunctionNode,
        expected: Option<&Type>,
    ) -> TypeCheckResult<Type> {
        let contextual = expected.and_then(contextual_signature);
        let loose = matches!(expected, Some(Type::Any));
        self.env.push(FrameKind::Function);
        let result = self.check_function_in_scope(func, contextual.as_deref(), loose);
        self.env.pop();
        result
    }

    fn check_function_in_scope(
        &mut self,
        func: &FunctionNode,
        contextual: Option<&FunctionType>,
        loose: bool,
    ) -> TypeCheckResult<Type> {
        for tp in &func.type_params {
            self.env.define_type(tp.clone(), TypeDecl::Param);
        }
        let mut params = Vec::with_capacity(func.params.len());
        for (i, param) in func.params.iter().enumerate() {
            let declared = self.param_type(param, i, contextual, loose)?;
            if let Some(default) = &param.default {
                if param.type_ann.is_some() || contextual.is_some() {
                    let ty = self.check_expr(default, Some(&declared))?;
                    let at = Site::Assign(default.span.coordinate());
                    self.expect_assignable(Some(default), &ty, &declared, at)?;
                }
            }
            let inside = if param.optional && param.default.is_none() {
                Type::union([declared.clone(), Type::Undefined])
            } else {
                declared.clone()
            };
            self.bind_pattern(&param.pattern, inside, BindingKind::Param)?;
            params.push(ParamType {
                name: param_name(param, i),
                ty: declared,
                optional: param.optional || param.default.is_some(),
                rest: param.rest,
            });
        }

        let declared_ret = match &func.return_type {
            Some(te) => Some(self.lower(te)?),
            None => None,
        };
        let contextual_ret = match declared_ret {
            Some(_) => None,
            None => contextual.map(|sig| sig.ret.clone()),
        };
        self.functions.push(FunctionContext {
            declared: declared_ret.clone(),
            contextual: contextual_ret,
            ..FunctionContext::default()
        });
        let body = self.check_function_body(func, declared_ret.as_ref());
        let ctx = self.functions.pop().unwrap_or_default();
        let falls_through = body?;
        let ret = match declared_ret {
            Some(ret) => ret,
            None => infer_return(&ctx, falls_through),
        };
        Ok(Type::function(params, ret))
    }

    fn param_type(
        &mut self,
        param: &Param,
        index: usize,
        contextual: Option<&FunctionType>,
        loose: bool,
    ) -> TypeCheckResult<Type> {
        if let Some(te) = &param.type_ann {
            return self.lower(te);
        }
        if let Some(sig) = contextual {
            let ty = sig.param_type(index).unwrap_or(Type::Any);
            return Ok(if param.rest { Type::array(ty) } else { ty });
        }
        if param.rest {
            return Ok(Type::array(Type::Any));
        }
        if loose {
            return Ok(Type::Any);
        }
        if let Some(default) = &param.default {
            return Ok(self.check_expr(default, None)?.widen());
        }
        let location = param.pattern.span().coordinate();
        Err(match &param.pattern {
            Pattern::Ident { name, .. } => TypeError::ImplicitAny {
                name: name.to_string(),
                location,
            },
            pattern => TypeError::BindingImplicitAny {
                name: pattern
                    .bound_names()
                    .first()
                    .map_or_else(|| param_name(param, index).to_string(), |n| n.to_string()),
                location,
            },
        })
    }

    /// Check the body; true when control can reach its end
    fn check_function_body(
        &mut self,
        func: &FunctionNode,
        declared_ret: Option<&Type>,
    ) -> TypeCheckResult<bool> {
        match &func.body {
            FunctionBody::Block(stmts) => {
                self.hoist_vars(stmts)?;
                self.check_block_body(stmts)?;
                Ok(!self.env.is_terminated())
            }
            FunctionBody::Expr(expr) => {
                let contextual = self.functions.last().and_then(|ctx| ctx.contextual.clone());
                let expected = declared_ret.or(contextual.as_ref());
                let ty = self.check_expr(expr, expected)?;
                if let Some(target) = declared_ret {
                    let at = Site::Assign(expr.span.coordinate());
                    self.expect_assignable(Some(expr), &ty, target, at)?;
                }
                if let Some(ctx) = self.functions.last_mut() {
                    ctx.returns.push(ty);
                }
                Ok(false)
            }
        }
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
    fn test_arity_messages() {
        let err = check("function f(a: number, b?: number) {}\nf();").unwrap_err();
        assert_eq!(err.to_string(), "Expected 1-2 arguments, but got 0.");
        assert_eq!(err.location(), Coordinate::new(2, 1));
        let err = check("function f(a: number) {}\nf(1, 2, 3);").unwrap_err();
        assert_eq!(err.to_string(), "Expected 1 arguments, but got 3.");
        assert_eq!(err.location(), Coordinate::new(2, 6));
        let err = check("function f(a: number, ...rest: number[]) {}\nf();").unwrap_err();
        assert_eq!(err.code(), 2555);
    }

    #[test]
    fn test_optional_parameter_accepts_undefined() {
        assert!(check("function f(x?: number) { return x; }\nf(undefined);").is_ok());
    }

    #[test]
    fn test_callbacks_are_contextually_typed() {
        assert!(check("[1, 2].forEach((n) => console.log(n.toFixed(1)));").is_ok());
        let err = check("const xs: string[] = [1, 2].map((n) => n * 2);").unwrap_err();
        assert_eq!(err.code(), 2322);
    }

    #[test]
    fn test_return_inference() {
        assert!(check("function f(b: boolean) { if (b) { return 1; } }\nconst n: number | undefined = f(true);").is_ok());
        let err = check("function f(b: boolean) { if (b) { return 1; } }\nconst n: number = f(true);").unwrap_err();
        assert_eq!(err.to_string(), "Type 'number | undefined' is not assignable to type 'number'.");
    }

    #[test]
    fn test_promise_values() {
        assert!(check("const p = Promise.resolve(1).then((n) => n.toFixed(2));\np.then((s) => s.length);").is_ok());
        let err = check("new Promise<number>((resolve) => resolve());").unwrap_err();
        assert_eq!(err.code(), 2554);
        assert!(check("new Promise((resolve) => resolve());").is_ok());
    }

    #[test]
    fn test_not_callable_or_constructable() {
        assert_eq!(check("const s = 'a'; s();").unwrap_err().code(), 2349);
        assert_eq!(check("const n = 1; new n();").unwrap_err().code(), 2351);
        assert_eq!(
            check("function f(cb?: () => void) { cb(); }").unwrap_err().code(),
            2722
        );
    }
}
