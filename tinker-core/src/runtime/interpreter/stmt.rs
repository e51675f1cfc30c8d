//! Statement execution and declaration hoisting

use super::pattern::BindMode;
use super::{scope_error, Interpreter};
use crate::compiler::parser::{
    CatchClause, Expr, ForBinding, ForInit, Stmt, StmtKind, SwitchCase, VarDecl, VarKind,
};
use crate::runtime::error::{ScriptResult, Throw};
use crate::kit::stack;
use crate::runtime::function::closure;
use crate::runtime::operators::strict_equals;
use crate::runtime::scope::{Scope, ScopeKind};
use crate::runtime::value::Value;
use std::rc::Rc;

/// Completion of a statement
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

impl Interpreter {
    /// Create bindings for a statement list before it runs: `var` names in
    /// the function scope, `let`/`const` uninitialized, functions ready
    pub(super) fn hoist(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::VarDecl(decl) if decl.kind != VarKind::Var => {
                    for declarator in &decl.declarations {
                        for name in declarator.pattern.bound_names() {
                            scope.declare(name, decl.kind == VarKind::Let, None);
                        }
                    }
                }
                StmtKind::Function(node) => {
                    if let Some(name) = &node.name {
                        let value = closure(node.clone(), scope.clone(), name.clone());
                        scope.declare(name.clone(), true, Some(value));
                    }
                }
                _ => {}
            }
            hoist_vars(stmt, scope);
        }
    }

    pub(super) fn exec_stmts(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> ScriptResult<Flow> {
        for stmt in stmts {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> ScriptResult<Flow> {
        let block = Scope::child(scope, ScopeKind::Block);
        self.hoist(stmts, &block);
        self.exec_stmts(stmts, &block)
    }

    pub(super) fn exec_stmt(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> ScriptResult<Flow> {
        stack::guarded(|| self.exec_stmt_kind(stmt, scope))
    }

    fn exec_stmt_kind(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> ScriptResult<Flow> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                let value = self.eval(expr, scope)?;
                if self.depth == 0 {
                    self.completion = Some(value);
                }
                Ok(Flow::Normal)
            }
            StmtKind::VarDecl(decl) => {
                self.exec_var_decl(decl, scope)?;
                Ok(Flow::Normal)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.exec_stmt(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec_stmt(alternate, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::Block(stmts) => self.exec_block(stmts, scope),
            StmtKind::While { test, body } => {
                while self.eval(test, scope)?.truthy() {
                    match self.exec_stmt(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::DoWhile { body, test } => {
                loop {
                    match self.exec_stmt(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if !self.eval(test, scope)?.truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body, scope),
            StmtKind::ForOf {
                binding,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable, scope)?;
                let items = self.iterate(&iterable)?;
                self.exec_for_each(binding, items, body, scope)
            }
            StmtKind::ForIn {
                binding,
                object,
                body,
            } => {
                let object = self.eval(object, scope)?;
                let keys: Vec<Value> = match &object {
                    Value::Object(obj) => obj.keys().into_iter().map(Value::String).collect(),
                    Value::String(s) => (0..s.encode_utf16().count()).map(|i| Value::from(i.to_string())).collect(),
                    _ => Vec::new(),
                };
                self.exec_for_each(binding, keys, body, scope)
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Throw(expr) => Err(Throw::new(self.eval(expr, scope)?)),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => self.exec_try(block, handler.as_ref(), finalizer.as_deref(), scope),
            StmtKind::Switch {
                discriminant,
                cases,
            } => self.exec_switch(discriminant, cases, scope),
            StmtKind::Function(_) | StmtKind::Empty | StmtKind::Interface(_) | StmtKind::TypeAlias(_) => {
                Ok(Flow::Normal)
            }
        }
    }

    pub(super) fn exec_var_decl(&mut self, decl: &VarDecl, scope: &Rc<Scope>) -> ScriptResult<()> {
        for declarator in &decl.declarations {
            let mode = match decl.kind {
                VarKind::Var => BindMode::Var,
                VarKind::Let => BindMode::Lexical { mutable: true },
                VarKind::Const => BindMode::Lexical { mutable: false },
            };
            let value = match &declarator.init {
                Some(init) => self.eval_named(init, &declarator.pattern, scope)?,
                // `var x;` leaves an existing value alone
                None if decl.kind == VarKind::Var => continue,
                None => Value::Undefined,
            };
            self.bind_pattern(&declarator.pattern, value, scope, mode)?;
        }
        Ok(())
    }

    fn exec_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        scope: &Rc<Scope>,
    ) -> ScriptResult<Flow> {
        let loop_scope = Scope::child(scope, ScopeKind::Block);
        let mut per_iteration: Vec<Rc<str>> = Vec::new();
        match init {
            Some(ForInit::VarDecl(decl)) => {
                if decl.kind != VarKind::Var {
                    for declarator in &decl.declarations {
                        for name in declarator.pattern.bound_names() {
                            loop_scope.declare(name.clone(), decl.kind == VarKind::Let, None);
                            per_iteration.push(name);
                        }
                    }
                }
                self.exec_var_decl(decl, &loop_scope)?;
            }
            Some(ForInit::Expr(expr)) => {
                self.eval(expr, &loop_scope)?;
            }
            None => {}
        }
        // each iteration sees its own copy of the loop's lexical bindings
        let mut iteration = loop_scope.copy_of(&per_iteration);
        loop {
            if let Some(test) = test {
                if !self.eval(test, &iteration)?.truthy() {
                    break;
                }
            }
            match self.exec_stmt(body, &iteration)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            iteration = iteration.copy_of(&per_iteration);
            if let Some(update) = update {
                self.eval(update, &iteration)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_for_each(&mut self, binding: &ForBinding, items: Vec<Value>, body: &Stmt, scope: &Rc<Scope>) -> ScriptResult<Flow> {
        for item in items {
            let iteration = Scope::child(scope, ScopeKind::Block);
            match binding {
                ForBinding::Decl { kind, pattern } => {
                    let mode = match kind {
                        VarKind::Var => BindMode::Var,
                        VarKind::Let => BindMode::Lexical { mutable: true },
                        VarKind::Const => BindMode::Lexical { mutable: false },
                    };
                    self.bind_pattern(pattern, item, &iteration, mode)?;
                }
                ForBinding::Target(pattern) => self.bind_pattern(pattern, item, scope, BindMode::Assign)?,
            }
            match self.exec_stmt(body, &iteration)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
        scope: &Rc<Scope>,
    ) -> ScriptResult<Flow> {
        let result = match (self.exec_block(block, scope), handler) {
            (Err(thrown), Some(handler)) => {
                let catch_scope = Scope::child(scope, ScopeKind::Block);
                match &handler.param {
                    Some(param) => self
                        .bind_pattern(param, thrown.value, &catch_scope, BindMode::Lexical { mutable: true })
                        .and_then(|()| self.exec_block(&handler.body, &catch_scope)),
                    None => self.exec_block(&handler.body, &catch_scope),
                }
            }
            (result, _) => result,
        };
        if let Some(finalizer) = finalizer {
            match self.exec_block(finalizer, scope)? {
                Flow::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        result
    }

    fn exec_switch(
        &mut self,
        discriminant: &Expr,
        cases: &[SwitchCase],
        scope: &Rc<Scope>,
    ) -> ScriptResult<Flow> {
        let value = self.eval(discriminant, scope)?;
        let block = Scope::child(scope, ScopeKind::Block);
        for case in cases {
            self.hoist(&case.body, &block);
        }
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if strict_equals(&value, &self.eval(test, &block)?) {
                    start = Some(i);
                    break;
                }
            }
        }
        let start = start.or_else(|| cases.iter().position(|c| c.test.is_none()));
        let Some(start) = start else {
            return Ok(Flow::Normal);
        };
        for case in &cases[start..] {
            match self.exec_stmts(&case.body, &block)? {
                Flow::Normal => {}
                Flow::Break => return Ok(Flow::Normal),
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }

    /// Read a binding, mapping scope failures to script errors
    pub(super) fn lookup(&self, name: &str, scope: &Rc<Scope>) -> ScriptResult<Value> {
        scope.get(name).map_err(scope_error)
    }
}

/// `var` declarations anywhere in `stmt` outside nested functions
fn hoist_vars(stmt: &Stmt, scope: &Rc<Scope>) {
    let declare = |decl: &VarDecl| {
        if decl.kind == VarKind::Var {
            for declarator in &decl.declarations {
                for name in declarator.pattern.bound_names() {
                    scope.declare_var(name);
                }
            }
        }
    };
    let each = |stmts: &[Stmt]| {
        for s in stmts {
            hoist_vars(s, scope);
        }
    };
    match &stmt.kind {
        StmtKind::VarDecl(decl) => declare(decl),
        StmtKind::If {
            consequent,
            alternate,
            ..
        } => {
            hoist_vars(consequent, scope);
            if let Some(alternate) = alternate {
                hoist_vars(alternate, scope);
            }
        }
        StmtKind::Block(stmts) => each(stmts),
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => hoist_vars(body, scope),
        StmtKind::For { init, body, .. } => {
            if let Some(ForInit::VarDecl(decl)) = init {
                declare(decl);
            }
            hoist_vars(body, scope);
        }
        StmtKind::ForOf { binding, body, .. } | StmtKind::ForIn { binding, body, .. } => {
            if let ForBinding::Decl {
                kind: VarKind::Var,
                pattern,
            } = binding
            {
                for name in pattern.bound_names() {
                    scope.declare_var(name);
                }
            }
            hoist_vars(body, scope);
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            each(block);
            if let Some(handler) = handler {
                each(&handler.body);
            }
            if let Some(finalizer) = finalizer {
                each(finalizer);
            }
        }
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                each(&case.body);
            }
        }
        _ => {}
    }
}
