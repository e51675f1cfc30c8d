//! Strict type checker for the typed dialect
//!
//! Walks the program once in source order and stops at the first error.
//! Every block is hoisted before it is checked: type names first, then
//! function signatures and lexical bindings. Flow narrowing lives in the
//! scope frames, see [`super::env`].

use super::builtins;
use super::env::{Binding, BindingKind, FrameKind, TypeDecl, TypeEnv};
use super::error::{TypeCheckResult, TypeError};
use super::lower::{lower_members, lower_type, TypeNames};
use super::types::{ObjectType, ParamType, Type};
use crate::compiler::parser::{
    CatchClause, Expr, ExprKind, ForBinding, ForInit, FunctionNode, InterfaceDecl, Param, Pattern,
    Program, PropertyKey, Stmt, StmtKind, SwitchCase, TypeExpr, VarDecl, VarKind,
};
use crate::kit::lexer::{Coordinate, SourceSpan};
use crate::kit::stack;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Library type names accepted without a declaration and checked as `any`
const LIBRARY_TYPES: &[&str] = &[
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "Date",
    "RegExp",
    "Symbol",
    "Iterable",
    "Iterator",
    "IterableIterator",
    "PromiseLike",
    "ArrayLike",
    "Awaited",
    "Pick",
    "Omit",
    "Exclude",
    "Extract",
    "Parameters",
    "bigint",
    "symbol",
];

/// Return bookkeeping of the function being checked
#[derive(Debug, Default)]
pub(super) struct FunctionContext {
    /// Annotated return type
    pub declared: Option<Type>,
    /// Return type of the contextual signature, when the function has none
    pub contextual: Option<Type>,
    pub returns: Vec<Type>,
    pub bare_return: bool,
}

pub struct TypeChecker {
    pub(super) env: TypeEnv,
    pub(super) functions: Vec<FunctionContext>,
    /// Named types being expanded; a recursive reference lowers to `any`
    expanding: Vec<Rc<str>>,
    /// An optional link of the chain being checked may short-circuit
    pub(super) chain_short: bool,
}

/// Check a parsed typed-dialect program, reporting the first error
pub fn check_program(program: &Program) -> TypeCheckResult<()> {
    let mut checker = TypeChecker::new();
    let result = checker.check_script(&program.body);
    match &result {
        Ok(()) => debug!(target: "tinker::checker", statements = program.body.len(), "program checked"),
        Err(err) => debug!(target: "tinker::checker", code = err.code(), %err, "type error"),
    }
    result
}

impl TypeChecker {
    pub fn new() -> Self {
        let mut env = TypeEnv::new();
        for (name, ty) in builtins::globals() {
            env.define(Rc::from(name), Binding::new(ty, BindingKind::Global));
        }
        // user code runs in its own function scope and may shadow globals
        env.push(FrameKind::Function);
        Self {
            env,
            functions: Vec::new(),
            expanding: Vec::new(),
            chain_short: false,
        }
    }

    pub fn check_script(&mut self, body: &[Stmt]) -> TypeCheckResult<()> {
        self.hoist_vars(body)?;
        self.check_block_body(body)
    }

    /// Hoist and check a statement list in the current frame
    pub(super) fn check_block_body(&mut self, body: &[Stmt]) -> TypeCheckResult<()> {
        self.hoist(body)?;
        for stmt in body {
            self.check_statement(stmt)?;
        }
        Ok(())
    }

    pub(super) fn lower(&mut self, te: &TypeExpr) -> TypeCheckResult<Type> {
        lower_type(te, self)
    }

    // ---- hoisting ----

    fn hoist(&mut self, body: &[Stmt]) -> TypeCheckResult<()> {
        let mut interfaces: Vec<(Rc<str>, Vec<InterfaceDecl>)> = Vec::new();
        for stmt in body {
            match &stmt.kind {
                StmtKind::Interface(decl) => {
                    match interfaces.iter_mut().find(|(name, _)| *name == decl.name) {
                        Some((_, decls)) => decls.push(decl.clone()),
                        None => interfaces.push((decl.name.clone(), vec![decl.clone()])),
                    }
                }
                StmtKind::TypeAlias(alias) => self
                    .env
                    .define_type(alias.name.clone(), TypeDecl::Alias(Rc::new(alias.clone()))),
                _ => {}
            }
        }
        for (name, decls) in interfaces {
            self.env.define_type(name, TypeDecl::Interface(Rc::new(decls)));
        }

        // first declaration of each lexical name, and whether it was a function
        let mut lexical: HashMap<Rc<str>, (Coordinate, bool)> = HashMap::new();
        for stmt in body {
            match &stmt.kind {
                StmtKind::VarDecl(decl) if decl.kind != VarKind::Var => {
                    let kind = binding_kind(decl.kind);
                    for declarator in &decl.declarations {
                        let declared = match (&declarator.pattern, &declarator.type_ann) {
                            (Pattern::Ident { .. }, Some(te)) => self.lower(te)?,
                            _ => Type::Any,
                        };
                        for (name, at) in pattern_bindings(&declarator.pattern) {
                            if let Some((first, _)) = lexical.get(&name) {
                                return Err(TypeError::Redeclared {
                                    name: name.to_string(),
                                    location: *first,
                                });
                            }
                            lexical.insert(name.clone(), (at, false));
                            self.env.define(
                                name,
                                Binding {
                                    declared: declared.clone(),
                                    kind,
                                    pending: true,
                                },
                            );
                        }
                    }
                }
                StmtKind::Function(func) => {
                    let Some(name) = &func.name else { continue };
                    match lexical.get(name) {
                        Some((first, false)) => {
                            return Err(TypeError::Redeclared {
                                name: name.to_string(),
                                location: *first,
                            })
                        }
                        Some(_) => {}
                        None => {
                            lexical.insert(name.clone(), (stmt.span.coordinate(), true));
                        }
                    }
                    let signature = self.function_signature(func)?;
                    self.env
                        .define(name.clone(), Binding::new(signature, BindingKind::Function));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// `var` declarations anywhere in a function body, outside nested functions
    pub(super) fn hoist_vars(&mut self, body: &[Stmt]) -> TypeCheckResult<()> {
        for stmt in body {
            self.hoist_vars_in(stmt)?;
        }
        Ok(())
    }

    fn hoist_vars_in(&mut self, stmt: &Stmt) -> TypeCheckResult<()> {
        match &stmt.kind {
            StmtKind::VarDecl(decl) => self.hoist_var_decl(decl),
            StmtKind::If {
                consequent,
                alternate,
                ..
            } => {
                self.hoist_vars_in(consequent)?;
                if let Some(alt) = alternate {
                    self.hoist_vars_in(alt)?;
                }
                Ok(())
            }
            StmtKind::Block(body) => self.hoist_vars(body),
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => self.hoist_vars_in(body),
            StmtKind::For { init, body, .. } => {
                if let Some(ForInit::VarDecl(decl)) = init {
                    self.hoist_var_decl(decl)?;
                }
                self.hoist_vars_in(body)
            }
            StmtKind::ForOf { binding, body, .. } | StmtKind::ForIn { binding, body, .. } => {
                if let ForBinding::Decl {
                    kind: VarKind::Var,
                    pattern,
                } = binding
                {
                    for (name, _) in pattern_bindings(pattern) {
                        self.define_pending_var(name, Type::Any);
                    }
                }
                self.hoist_vars_in(body)
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.hoist_vars(block)?;
                if let Some(CatchClause { body, .. }) = handler {
                    self.hoist_vars(body)?;
                }
                if let Some(fin) = finalizer {
                    self.hoist_vars(fin)?;
                }
                Ok(())
            }
            StmtKind::Switch { cases, .. } => {
                for case in cases {
                    self.hoist_vars(&case.body)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn hoist_var_decl(&mut self, decl: &VarDecl) -> TypeCheckResult<()> {
        if decl.kind != VarKind::Var {
            return Ok(());
        }
        for declarator in &decl.declarations {
            let declared = match (&declarator.pattern, &declarator.type_ann) {
                (Pattern::Ident { .. }, Some(te)) => self.lower(te)?,
                _ => Type::Any,
            };
            for (name, _) in pattern_bindings(&declarator.pattern) {
                self.define_pending_var(name, declared.clone());
            }
        }
        Ok(())
    }

    fn define_pending_var(&mut self, name: Rc<str>, declared: Type) {
        self.env.define_var(
            name,
            Binding {
                declared,
                kind: BindingKind::Var,
                pending: true,
            },
        );
    }

    /// Declared signature of a function, unannotated parts as `any`
    fn function_signature(&mut self, func: &FunctionNode) -> TypeCheckResult<Type> {
        self.env.push(FrameKind::Branch);
        for tp in &func.type_params {
            self.env.define_type(tp.clone(), TypeDecl::Param);
        }
        let result = self.signature_parts(func);
        self.env.pop();
        result
    }

    fn signature_parts(&mut self, func: &FunctionNode) -> TypeCheckResult<Type> {
        let mut params = Vec::with_capacity(func.params.len());
        for (i, param) in func.params.iter().enumerate() {
            let ty = match &param.type_ann {
                Some(te) => self.lower(te)?,
                None if param.rest => Type::array(Type::Any),
                None => Type::Any,
            };
            params.push(ParamType {
                name: param_name(param, i),
                ty,
                optional: param.optional || param.default.is_some(),
                rest: param.rest,
            });
        }
        let ret = match &func.return_type {
            Some(te) => self.lower(te)?,
            None => Type::Any,
        };
        Ok(Type::function(params, ret))
    }

    // ---- statements ----

    pub(super) fn check_statement(&mut self, stmt: &Stmt) -> TypeCheckResult<()> {
        stack::guarded(|| self.check_statement_kind(stmt))
    }

    fn check_statement_kind(&mut self, stmt: &Stmt) -> TypeCheckResult<()> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.check_expr(expr, None)?;
            }
            StmtKind::VarDecl(decl) => self.check_var_decl(decl)?,
            StmtKind::Function(func) => {
                let ty = self.check_function(func, None)?;
                if let Some(name) = &func.name {
                    self.env.redeclare(name, ty);
                }
            }
            StmtKind::Return(value) => self.check_return(value.as_ref(), stmt.span)?,
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.check_expr(test, None)?;
                self.env.push(FrameKind::Branch);
                self.narrow_condition(test, true);
                self.check_statement(consequent)?;
                let taken = self.env.pop();
                self.env.push(FrameKind::Branch);
                self.narrow_condition(test, false);
                if let Some(alt) = alternate {
                    self.check_statement(alt)?;
                }
                let skipped = self.env.pop();
                self.merge_branches(vec![taken, skipped]);
            }
            StmtKind::Block(body) => {
                self.env.push(FrameKind::Block);
                let result = self.check_block_body(body);
                self.env.pop();
                result?;
            }
            StmtKind::While { test, body } => {
                self.check_expr(test, None)?;
                self.env.push(FrameKind::Branch);
                self.narrow_condition(test, true);
                self.check_statement(body)?;
                let frame = self.env.pop();
                self.merge_with_outer(vec![frame]);
            }
            StmtKind::DoWhile { body, test } => {
                self.env.push(FrameKind::Branch);
                self.check_statement(body)?;
                let frame = self.env.pop();
                self.merge_with_outer(vec![frame]);
                self.check_expr(test, None)?;
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.env.push(FrameKind::Block);
                let result = self.check_for(init.as_ref(), test.as_ref(), update.as_ref(), body);
                self.env.pop();
                result?;
            }
            StmtKind::ForOf {
                binding,
                iterable,
                body,
            } => {
                let iterable_ty = self.check_expr(iterable, None)?;
                let element = self.iterated_type(&iterable_ty, iterable)?;
                self.check_for_binding(binding, element, body)?;
            }
            StmtKind::ForIn {
                binding,
                object,
                body,
            } => {
                self.check_expr(object, None)?;
                self.check_for_binding(binding, Type::String, body)?;
            }
            StmtKind::Break | StmtKind::Continue => self.env.break_out(),
            StmtKind::Throw(value) => {
                self.check_expr(value, None)?;
                self.env.terminate();
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => self.check_try(block, handler.as_ref(), finalizer.as_deref())?,
            StmtKind::Switch {
                discriminant,
                cases,
            } => self.check_switch(discriminant, cases)?,
            StmtKind::Empty | StmtKind::Interface(_) | StmtKind::TypeAlias(_) => {}
        }
        Ok(())
    }

    fn check_var_decl(&mut self, decl: &VarDecl) -> TypeCheckResult<()> {
        let kind = binding_kind(decl.kind);
        for declarator in &decl.declarations {
            let annotated = match &declarator.type_ann {
                Some(te) => Some(self.lower(te)?),
                None => None,
            };
            let init_ty = match &declarator.init {
                Some(init) => {
                    let ty = self.check_expr(init, annotated.as_ref())?;
                    if let Some(target) = &annotated {
                        let at = declarator.pattern.span().coordinate();
                        self.expect_assignable(Some(init), &ty, target, Site::Assign(at))?;
                    }
                    Some(ty)
                }
                None => None,
            };
            let keeps_literals = kind == BindingKind::Const
                || declarator
                    .init
                    .as_ref()
                    .is_some_and(|init| is_const_assertion(&init.kind));
            let declared = match (&annotated, &init_ty) {
                (Some(ty), _) => ty.clone(),
                (None, Some(ty)) if keeps_literals => ty.clone(),
                (None, Some(ty)) => ty.widen(),
                (None, None) => Type::Any,
            };
            self.bind_pattern(&declarator.pattern, declared.clone(), kind)?;
            if let (Some(_), Some(init_ty), Pattern::Ident { name, .. }) =
                (&annotated, &init_ty, &declarator.pattern)
            {
                let narrowed = narrow_by_assignment(&declared, init_ty);
                if narrowed != declared {
                    self.env.narrow(name.to_string(), narrowed);
                }
            }
        }
        Ok(())
    }

    fn check_return(
        &mut self,
        value: Option<&Expr>,
        span: SourceSpan,
    ) -> TypeCheckResult<()> {
        let (declared, contextual) = match self.functions.last() {
            Some(ctx) => (ctx.declared.clone(), ctx.contextual.clone()),
            None => (None, None),
        };
        match value {
            Some(expr) => {
                let expected = declared.as_ref().or(contextual.as_ref());
                let ty = self.check_expr(expr, expected)?;
                if let Some(target) = &declared {
                    self.expect_assignable(Some(expr), &ty, target, Site::Assign(span.coordinate()))?;
                }
                if let Some(ctx) = self.functions.last_mut() {
                    ctx.returns.push(ty);
                }
            }
            None => {
                if let Some(ctx) = self.functions.last_mut() {
                    ctx.bare_return = true;
                }
            }
        }
        self.env.terminate();
        Ok(())
    }

    fn check_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> TypeCheckResult<()> {
        match init {
            Some(ForInit::VarDecl(decl)) => self.check_var_decl(decl)?,
            Some(ForInit::Expr(expr)) => {
                self.check_expr(expr, None)?;
            }
            None => {}
        }
        if let Some(test) = test {
            self.check_expr(test, None)?;
        }
        self.env.push(FrameKind::Branch);
        if let Some(test) = test {
            self.narrow_condition(test, true);
        }
        let result = self.check_statement(body).and_then(|()| match update {
            Some(update) => self.check_expr(update, None).map(|_| ()),
            None => Ok(()),
        });
        let frame = self.env.pop();
        result?;
        self.merge_with_outer(vec![frame]);
        Ok(())
    }

    fn check_for_binding(
        &mut self,
        binding: &ForBinding,
        element: Type,
        body: &Stmt,
    ) -> TypeCheckResult<()> {
        self.env.push(FrameKind::Block);
        let result = self.check_for_body(binding, element, body);
        self.env.pop();
        result
    }

    fn check_for_body(&mut self, binding: &ForBinding, element: Type, body: &Stmt) -> TypeCheckResult<()> {
        match binding {
            ForBinding::Decl { kind, pattern } => {
                self.bind_pattern(pattern, element, binding_kind(*kind))?
            }
            ForBinding::Target(pattern) => self.assign_pattern(pattern, &element)?,
        }
        self.env.push(FrameKind::Branch);
        let result = self.check_statement(body);
        let frame = self.env.pop();
        result?;
        self.merge_with_outer(vec![frame]);
        Ok(())
    }

    /// Element type produced by iterating a value with `for...of`
    pub(super) fn iterated_type(
        &mut self,
        ty: &Type,
        expr: &Expr,
    ) -> TypeCheckResult<Type> {
        let ty = self.require_present(ty.clone(), expr)?;
        let mut elements = Vec::new();
        for member in ty.members() {
            match member {
                Type::Any => return Ok(Type::Any),
                Type::Array(_) | Type::Tuple(_) => elements.push(member.element_type()),
                Type::String | Type::StringLit(_) => elements.push(Type::String),
                _ => {
                    return Err(TypeError::NotIterable {
                        ty: ty.to_string(),
                        location: expr.span.coordinate(),
                    })
                }
            }
        }
        Ok(Type::union(elements))
    }

    fn check_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
    ) -> TypeCheckResult<()> {
        self.env.push(FrameKind::Branch);
        let result = self.check_block_body(block);
        let tried = self.env.pop();
        result?;
        let mut frames = vec![tried];
        if let Some(handler) = handler {
            self.env.push(FrameKind::Branch);
            let result = self.check_catch(handler);
            frames.push(self.env.pop());
            result?;
        }
        self.merge_branches(frames);
        if let Some(finalizer) = finalizer {
            self.env.push(FrameKind::Block);
            let result = self.check_block_body(finalizer);
            self.env.pop();
            result?;
        }
        Ok(())
    }

    fn check_catch(&mut self, handler: &CatchClause) -> TypeCheckResult<()> {
        if let Some(param) = &handler.param {
            let ty = match &handler.type_ann {
                Some(te) => self.lower(te)?,
                None => Type::Unknown,
            };
            self.bind_pattern(param, ty, BindingKind::Let)?;
        }
        self.check_block_body(&handler.body)
    }

    fn check_switch(
        &mut self,
        discriminant: &Expr,
        cases: &[SwitchCase],
    ) -> TypeCheckResult<()> {
        self.check_expr(discriminant, None)?;
        for case in cases {
            if let Some(test) = &case.test {
                self.check_expr(test, None)?;
            }
        }
        let has_default = cases.iter().any(|c| c.test.is_none());
        let mut frames = Vec::new();
        let mut group: Vec<&SwitchCase> = Vec::new();
        let mut fell_through = false;
        for (i, case) in cases.iter().enumerate() {
            group.push(case);
            if case.body.is_empty() && i + 1 < cases.len() {
                continue;
            }
            self.env.push(FrameKind::Branch);
            if !fell_through {
                self.narrow_switch_group(discriminant, &group, cases);
            }
            let result = self.check_block_body(&case.body);
            let frame = self.env.pop();
            result?;
            fell_through = !frame.terminated;
            frames.push(frame);
            group.clear();
        }
        let live: Vec<_> = frames
            .into_iter()
            .filter(|f| !f.terminated || f.broken)
            .collect();
        if has_default {
            if live.is_empty() {
                self.env.terminate();
            } else {
                self.merge_live(live, false);
            }
        } else {
            self.merge_with_outer(live);
        }
        Ok(())
    }

    /// Narrow the discriminant for a group of cases sharing one body
    fn narrow_switch_group(
        &mut self,
        discriminant: &Expr,
        group: &[&SwitchCase],
        cases: &[SwitchCase],
    ) {
        if group.iter().any(|c| c.test.is_none()) {
            if group.len() == 1 {
                for test in cases.iter().filter_map(|c| c.test.as_ref()) {
                    self.narrow_equality(discriminant, test, true, false);
                }
            }
            return;
        }
        let mut frames = Vec::with_capacity(group.len());
        for test in group.iter().filter_map(|c| c.test.as_ref()) {
            self.env.push(FrameKind::Branch);
            self.narrow_equality(discriminant, test, true, true);
            frames.push(self.env.pop());
        }
        self.merge_live(frames, false);
    }

    // ---- bindings ----

    /// Bind the names of a declaration pattern to the parts of `ty`
    pub(super) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        ty: Type,
        kind: BindingKind,
    ) -> TypeCheckResult<()> {
        match pattern {
            Pattern::Ident { name, .. } => {
                let binding = Binding::new(ty, kind);
                if kind == BindingKind::Var {
                    self.env.define_var(name.clone(), binding);
                } else {
                    self.env.define(name.clone(), binding);
                }
                Ok(())
            }
            Pattern::Object { props, rest, .. } => {
                let mut taken = Vec::new();
                for prop in props {
                    let prop_ty = match &prop.key {
                        PropertyKey::Named(key) => {
                            taken.push(key.clone());
                            self.destructured_property(&ty, key, prop.value.span())?
                        }
                        PropertyKey::Computed(expr) => {
                            self.check_expr(expr, None)?;
                            Type::Any
                        }
                    };
                    let prop_ty = self.with_default(prop_ty, prop.default.as_ref())?;
                    self.bind_pattern(&prop.value, prop_ty, kind)?;
                }
                if let Some(rest) = rest {
                    let rest_ty = match &ty {
                        Type::Object(obj) => Type::Object(Rc::new(ObjectType {
                            name: None,
                            props: obj
                                .props
                                .iter()
                                .filter(|p| !taken.contains(&p.name))
                                .cloned()
                                .collect(),
                            ..ObjectType::default()
                        })),
                        _ => Type::Any,
                    };
                    self.bind_pattern(rest, rest_ty, kind)?;
                }
                Ok(())
            }
            Pattern::Array { elements, rest, .. } => {
                for (i, element) in elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    let item = match &ty {
                        Type::Tuple(items) => items.get(i).cloned().unwrap_or(Type::Undefined),
                        Type::String | Type::StringLit(_) => Type::String,
                        other => other.element_type(),
                    };
                    let item = self.with_default(item, element.default.as_ref())?;
                    self.bind_pattern(&element.pattern, item, kind)?;
                }
                if let Some(rest) = rest {
                    let rest_ty = match &ty {
                        Type::Tuple(items) => {
                            Type::Tuple(items.iter().skip(elements.len()).cloned().collect())
                        }
                        other => Type::array(other.element_type()),
                    };
                    self.bind_pattern(rest, rest_ty, kind)?;
                }
                Ok(())
            }
            Pattern::Expr(_) => Ok(()),
        }
    }

    fn destructured_property(&mut self, ty: &Type, key: &str, span: SourceSpan) -> TypeCheckResult<Type> {
        if matches!(ty, Type::Any | Type::Unknown) {
            return Ok(Type::Any);
        }
        match self.lookup_property(ty, key) {
            Some(prop) => Ok(prop),
            None => Err(TypeError::PropertyMissing {
                property: key.to_string(),
                ty: ty.to_string(),
                location: span.coordinate(),
            }),
        }
    }

    /// A default initializer replaces `undefined`
    pub(super) fn with_default(
        &mut self,
        ty: Type,
        default: Option<&Expr>,
    ) -> TypeCheckResult<Type> {
        let Some(default) = default else {
            return Ok(ty);
        };
        let present = without_undefined(&ty);
        let default_ty = self.check_expr(default, Some(&present))?;
        Ok(Type::union([present, default_ty.widen()]))
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeNames for TypeChecker {
    type Error = TypeError;

    fn named(&mut self, name: &str, args: Vec<Type>, span: SourceSpan) -> TypeCheckResult<Type> {
        let Some(decl) = self.env.lookup_type(name).cloned() else {
            if LIBRARY_TYPES.contains(&name) {
                return Ok(Type::Any);
            }
            return Err(TypeError::CannotFindName {
                name: name.to_string(),
                location: span.coordinate(),
            });
        };
        if self.expanding.iter().any(|n| &**n == name) {
            return Ok(Type::Any);
        }
        self.expanding.push(Rc::from(name));
        let result = self.expand(name, &decl, &args);
        self.expanding.pop();
        result
    }

    fn query(&mut self, name: &str, span: SourceSpan) -> TypeCheckResult<Type> {
        self.env.current(name).ok_or_else(|| TypeError::CannotFindName {
            name: name.to_string(),
            location: span.coordinate(),
        })
    }
}

impl TypeChecker {
    fn expand(&mut self, name: &str, decl: &TypeDecl, args: &[Type]) -> TypeCheckResult<Type> {
        let display: Rc<str> = if args.is_empty() {
            Rc::from(name)
        } else {
            let args: Vec<String> = args.iter().map(Type::to_string).collect();
            Rc::from(format!("{}<{}>", name, args.join(", ")))
        };
        match decl {
            TypeDecl::Param => Ok(Type::Any),
            TypeDecl::Alias(alias) => {
                self.env.push(FrameKind::Branch);
                for tp in &alias.type_params {
                    self.env.define_type(tp.clone(), TypeDecl::Param);
                }
                let lowered = lower_type(&alias.ty, self);
                self.env.pop();
                Ok(match lowered? {
                    Type::Object(obj) if obj.name.is_none() => Type::Object(Rc::new(ObjectType {
                        name: Some(display),
                        ..(*obj).clone()
                    })),
                    other => other,
                })
            }
            TypeDecl::Interface(decls) => {
                let mut merged = ObjectType {
                    name: Some(display),
                    ..ObjectType::default()
                };
                for decl in decls.iter() {
                    self.env.push(FrameKind::Branch);
                    for tp in &decl.type_params {
                        self.env.define_type(tp.clone(), TypeDecl::Param);
                    }
                    let result = self.interface_members(decl, &mut merged);
                    self.env.pop();
                    result?;
                }
                Ok(Type::Object(Rc::new(merged)))
            }
        }
    }

    fn interface_members(&mut self, decl: &InterfaceDecl, merged: &mut ObjectType) -> TypeCheckResult<()> {
        for base in &decl.extends {
            if let Type::Object(obj) = lower_type(base, self)? {
                merge_props(merged, &obj);
            }
        }
        let own = lower_members(&decl.members, self)?;
        merge_props(merged, &own);
        Ok(())
    }
}

fn merge_props(into: &mut ObjectType, from: &ObjectType) {
    for prop in &from.props {
        into.props.retain(|p| p.name != prop.name);
        into.props.push(prop.clone());
    }
    if from.index.is_some() {
        into.index = from.index.clone();
    }
    if from.call.is_some() {
        into.call = from.call.clone();
    }
}

/// Where a relation check happens, deciding the error reported
#[derive(Debug, Clone, Copy)]
pub(super) enum Site {
    /// Declaration, assignment or return
    Assign(Coordinate),
    /// Call argument
    Argument(Coordinate),
}

pub(super) fn binding_kind(kind: VarKind) -> BindingKind {
    match kind {
        VarKind::Var => BindingKind::Var,
        VarKind::Let => BindingKind::Let,
        VarKind::Const => BindingKind::Const,
    }
}

/// Names bound by a pattern with their locations
pub(super) fn pattern_bindings(pattern: &Pattern) -> Vec<(Rc<str>, Coordinate)> {
    let mut out = Vec::new();
    collect_bindings(pattern, &mut out);
    out
}

fn collect_bindings(pattern: &Pattern, out: &mut Vec<(Rc<str>, Coordinate)>) {
    match pattern {
        Pattern::Ident { name, span } => out.push((name.clone(), span.coordinate())),
        Pattern::Object { props, rest, .. } => {
            for prop in props {
                collect_bindings(&prop.value, out);
            }
            if let Some(rest) = rest {
                collect_bindings(rest, out);
            }
        }
        Pattern::Array { elements, rest, .. } => {
            for element in elements.iter().flatten() {
                collect_bindings(&element.pattern, out);
            }
            if let Some(rest) = rest {
                collect_bindings(rest, out);
            }
        }
        Pattern::Expr(_) => {}
    }
}

pub(super) fn param_name(param: &Param, index: usize) -> Rc<str> {
    match &param.pattern {
        Pattern::Ident { name, .. } => name.clone(),
        _ => Rc::from(format!("__{}", index)),
    }
}

fn is_const_assertion(kind: &ExprKind) -> bool {
    match kind {
        ExprKind::TypeAssertion {
            ty: TypeExpr::Named { name, .. },
            ..
        } => &**name == "const",
        ExprKind::Paren(inner) => is_const_assertion(&inner.kind),
        _ => false,
    }
}

pub(super) fn without_undefined(ty: &Type) -> Type {
    match ty {
        Type::Union(members) => Type::union(
            members
                .iter()
                .filter(|t| !matches!(t, Type::Undefined | Type::Void))
                .cloned(),
        ),
        other => other.clone(),
    }
}

/// Declared type filtered to the members an assigned value can inhabit
pub(super) fn narrow_by_assignment(declared: &Type, assigned: &Type) -> Type {
    match declared {
        Type::Unknown if !assigned.is_any() => assigned.widen(),
        Type::Union(members) if !assigned.is_any() => {
            let kept = Type::union(members.iter().filter(|m| {
                assigned
                    .members()
                    .iter()
                    .any(|a| super::relation::is_assignable(a, m))
            }).cloned());
            if kept == Type::Never {
                declared.clone()
            } else {
                kept
            }
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::{parse_program, Syntax};

    fn check(source: &str) -> TypeCheckResult<()> {
        let program = parse_program(source, Syntax::Typed).unwrap();
        check_program(&program)
    }

    fn code(source: &str) -> u32 {
        match check(source) {
            Ok(()) => panic!("expected a type error in {:?}", source),
            Err(err) => err.code(),
        }
    }

    #[test]
    fn test_annotation_mismatch() {
        let err = check(r#"const x: number = "bad";"#).unwrap_err();
        assert_eq!(err.code(), 2322);
        assert_eq!(err.to_string(), "Type 'string' is not assignable to type 'number'.");
        assert_eq!(err.location(), Coordinate::new(1, 7));
    }

    #[test]
    fn test_valid_programs() {
        let sources = [
            "const x: number = 1 + 1;",
            "let s: string | undefined; s = 'a'; console.log(s.length);",
            "function add(a: number, b: number): number { return a + b; }\nadd(1, 2);",
            "const xs = [1, 2, 3].map((n) => n * 2); const y: number = xs[0];",
            "interface Point { x: number; y?: number }\nconst p: Point = { x: 1 };\nconsole.log(p.y ?? 0);",
            "type Shape = { kind: 'circle'; r: number } | { kind: 'square'; side: number };\n\
             function area(s: Shape): number { switch (s.kind) { case 'circle': return s.r * s.r; case 'square': return s.side * s.side; } }",
            "let total = 0; for (const n of [1, 2]) { total += n; }",
            "try { JSON.parse('x'); } catch (e) { if (e instanceof Error) { console.log(e.message); } }",
            "const p = new Promise<number>((resolve) => setTimeout(() => resolve(1), 10));\np.then((v) => v + 1);",
            "function f(x?: string) { if (!x) { return 0; } return x.length; }",
            "const sum = [1, 2, 3].reduce((acc, n) => acc + n, 0); const t: number = sum;",
            "function hoisted() { return later(); }\nfunction later(): number { return 1; }",
        ];
        for source in sources {
            if let Err(err) = check(source) {
                panic!("unexpected error in {:?}: {}", source, err);
            }
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(code("undefinedName;"), 2304);
        assert_eq!(code("const o = { a: 1 }; o.b;"), 2339);
        assert_eq!(code("const c = 1; c = 2;"), 2588);
        assert_eq!(code("function f(x) { return x; }"), 7006);
        assert_eq!(code("function f(a: number) {} f(1, 2);"), 2554);
        assert_eq!(code("function f(a: number) {} f('a');"), 2345);
        assert_eq!(code("const s = 'a' - 1;"), 2362);
        assert_eq!(code("const n = 1; n();"), 2349);
        assert_eq!(code("let a = 1; let a = 2;"), 2451);
        assert_eq!(code("interface P { x: number } const p: P = {};"), 2741);
        assert_eq!(code("interface P { x: number } const p: P = { x: 1, y: 2 };"), 2353);
        assert_eq!(code("function f(s?: string) { return s.length; }"), 18048);
        assert_eq!(code("function f(v: unknown) { return v.x; }"), 18046);
        assert_eq!(code("const t: Nope = 1;"), 2304);
    }

    #[test]
    fn test_early_return_narrows() {
        let source = "function f(x: string | null) { if (x === null) { return; } return x.length; }";
        assert!(check(source).is_ok());
        let source = "function f(x: string | null) { if (x === null) { console.log(1); } return x.length; }";
        assert_eq!(code(source), 18047);
    }

    #[test]
    fn test_assignment_narrowing_resets() {
        let source = "let x: string | undefined = 'a'; x.length; x = undefined; x.length;";
        let err = check(source).unwrap_err();
        assert_eq!(err.code(), 18048);
        assert_eq!(err.location().column, 59);
    }
}
