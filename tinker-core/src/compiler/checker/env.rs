//! Scopes of the type checker
//!
//! Each frame holds declared bindings, declared type names and a narrowing
//! overlay. Narrowings are keyed by access path (`x`, `p.next.value`) and
//! shadow the declared type until the frame is popped or the path is
//! reassigned. A reassignment leaves a tombstone (`None`) in the current
//! frame, hiding outer narrowings of the path and of everything below it.

use super::types::Type;
use crate::compiler::parser::{InterfaceDecl, TypeAliasDecl};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Param,
    /// Host global
    Global,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub declared: Type,
    pub kind: BindingKind,
    /// Hoisted but not yet checked; its type is provisional
    pub pending: bool,
}

impl Binding {
    pub fn new(declared: Type, kind: BindingKind) -> Self {
        Self {
            declared,
            kind,
            pending: false,
        }
    }
}

/// Declared type name
#[derive(Debug, Clone)]
pub enum TypeDecl {
    Interface(Rc<Vec<InterfaceDecl>>),
    Alias(Rc<TypeAliasDecl>),
    /// Generic type parameter, checked as `any`
    Param,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Plain block; assignments and termination flow to the parent
    Block,
    /// Conditionally executed region; merged by the statement that pushed it
    Branch,
    /// Function body
    Function,
}

#[derive(Debug)]
pub struct Frame {
    pub kind: FrameKind,
    pub bindings: HashMap<Rc<str>, Binding>,
    pub types: HashMap<Rc<str>, TypeDecl>,
    pub narrowed: HashMap<String, Option<Type>>,
    /// Control cannot reach the end of this frame
    pub terminated: bool,
    /// Ended by `break` or `continue`, so control resumes after the enclosing statement
    pub broken: bool,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            bindings: HashMap::new(),
            types: HashMap::new(),
            narrowed: HashMap::new(),
            terminated: false,
            broken: false,
        }
    }

    /// Narrowings of paths declared outside this frame
    pub fn escaping(&self) -> impl Iterator<Item = (&String, &Option<Type>)> {
        self.narrowed
            .iter()
            .filter(|(path, _)| !self.bindings.contains_key(path_root(path)))
    }
}

/// Root identifier of an access path
pub fn path_root(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// Strict prefixes of a path: `a.b.c` yields `a` and `a.b`
fn path_prefixes(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('.').map(move |(i, _)| &path[..i])
}

#[derive(Debug)]
pub struct TypeEnv {
    frames: Vec<Frame>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(FrameKind::Function)],
        }
    }

    pub fn push(&mut self, kind: FrameKind) {
        self.frames.push(Frame::new(kind));
    }

    /// Pop the innermost frame; plain blocks hand their outer effects to the parent
    pub fn pop(&mut self) -> Frame {
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return Frame::new(FrameKind::Function),
        };
        if frame.kind == FrameKind::Block {
            let escaping: Vec<(String, Option<Type>)> = frame
                .escaping()
                .map(|(path, ty)| (path.clone(), ty.clone()))
                .collect();
            if let Some(parent) = self.frames.last_mut() {
                for (path, ty) in escaping {
                    if ty.is_none() {
                        let prefix = format!("{}.", path);
                        parent.narrowed.retain(|key, _| !key.starts_with(&prefix));
                    }
                    parent.narrowed.insert(path, ty);
                }
                parent.terminated |= frame.terminated;
                parent.broken |= frame.broken;
            }
        }
        frame
    }

    pub fn define(&mut self, name: Rc<str>, binding: Binding) {
        if let Some(frame) = self.frames.last_mut() {
            let prefix = format!("{}.", name);
            frame
                .narrowed
                .retain(|key, _| key.as_str() != &*name && !key.starts_with(&prefix));
            frame.bindings.insert(name, binding);
        }
    }

    /// Replace the declared type of a binding where it lives
    pub fn redeclare(&mut self, name: &str, declared: Type) {
        if let Some(binding) = self
            .frames
            .iter_mut()
            .rev()
            .find_map(|f| f.bindings.get_mut(name))
        {
            binding.declared = declared;
            binding.pending = false;
        }
    }

    /// `var` bindings live in the nearest function frame
    pub fn define_var(&mut self, name: Rc<str>, binding: Binding) {
        if let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|f| f.kind == FrameKind::Function)
        {
            frame.bindings.insert(name, binding);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|f| f.bindings.get(name))
    }

    /// Narrowed type of an access path, if any applies
    pub fn narrowed(&self, path: &str) -> Option<&Type> {
        let root = path_root(path);
        for frame in self.frames.iter().rev() {
            if let Some(entry) = frame.narrowed.get(path) {
                return entry.as_ref();
            }
            if path_prefixes(path).any(|p| matches!(frame.narrowed.get(p), Some(None))) {
                return None;
            }
            if frame.bindings.contains_key(root) {
                return None;
            }
        }
        None
    }

    /// Current type of a variable: its narrowing or its declared type
    pub fn current(&self, name: &str) -> Option<Type> {
        if let Some(ty) = self.narrowed(name) {
            return Some(ty.clone());
        }
        self.lookup(name).map(|b| b.declared.clone())
    }

    pub fn narrow(&mut self, path: String, ty: Type) {
        if let Some(frame) = self.frames.last_mut() {
            frame.narrowed.insert(path, Some(ty));
        }
    }

    /// Forget narrowings of `path` and everything below it
    pub fn invalidate(&mut self, path: &str) {
        if let Some(frame) = self.frames.last_mut() {
            let prefix = format!("{}.", path);
            frame.narrowed.retain(|key, _| !key.starts_with(&prefix));
            frame.narrowed.insert(path.to_string(), None);
        }
    }

    pub fn define_type(&mut self, name: Rc<str>, decl: TypeDecl) {
        if let Some(frame) = self.frames.last_mut() {
            frame.types.insert(name, decl);
        }
    }

    pub fn lookup_type(&self, name: &str) -> Option<&TypeDecl> {
        self.frames.iter().rev().find_map(|f| f.types.get(name))
    }

    pub fn terminate(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.terminated = true;
        }
    }

    /// `break` or `continue`: the rest of the frame is unreachable
    pub fn break_out(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.terminated = true;
            frame.broken = true;
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.frames.last().is_some_and(|f| f.terminated)
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outward() {
        let mut env = TypeEnv::new();
        env.define(Rc::from("x"), Binding::new(Type::Number, BindingKind::Let));
        env.push(FrameKind::Block);
        env.define(Rc::from("y"), Binding::new(Type::String, BindingKind::Const));
        assert_eq!(env.current("x"), Some(Type::Number));
        assert_eq!(env.current("y"), Some(Type::String));
        env.pop();
        assert!(env.lookup("y").is_none());
    }

    #[test]
    fn test_narrowing_overlay() {
        let mut env = TypeEnv::new();
        let declared = Type::union([Type::String, Type::Undefined]);
        env.define(Rc::from("x"), Binding::new(declared.clone(), BindingKind::Let));
        env.push(FrameKind::Branch);
        env.narrow("x".to_string(), Type::String);
        assert_eq!(env.current("x"), Some(Type::String));
        env.pop();
        assert_eq!(env.current("x"), Some(declared));
    }

    #[test]
    fn test_shadowing_hides_outer_narrowing() {
        let mut env = TypeEnv::new();
        env.define(Rc::from("x"), Binding::new(Type::Any, BindingKind::Let));
        env.narrow("x".to_string(), Type::Number);
        env.push(FrameKind::Block);
        env.define(Rc::from("x"), Binding::new(Type::String, BindingKind::Let));
        assert_eq!(env.current("x"), Some(Type::String));
    }

    #[test]
    fn test_block_effects_flow_to_parent() {
        let mut env = TypeEnv::new();
        env.define(Rc::from("x"), Binding::new(Type::Any, BindingKind::Let));
        env.push(FrameKind::Block);
        env.narrow("x".to_string(), Type::Number);
        env.terminate();
        env.pop();
        assert_eq!(env.current("x"), Some(Type::Number));
        assert!(env.is_terminated());
    }

    #[test]
    fn test_invalidate_removes_subpaths() {
        let mut env = TypeEnv::new();
        env.define(Rc::from("p"), Binding::new(Type::Any, BindingKind::Const));
        env.narrow("p.next".to_string(), Type::Number);
        env.narrow("p.next.value".to_string(), Type::Number);
        env.narrow("pq".to_string(), Type::Number);
        env.invalidate("p.next");
        assert!(env.narrowed("p.next").is_none());
        assert!(env.narrowed("p.next.value").is_none());
        assert!(env.narrowed("pq").is_some());
    }

    #[test]
    fn test_branch_invalidation_stays_in_branch() {
        let mut env = TypeEnv::new();
        env.define(Rc::from("x"), Binding::new(Type::Any, BindingKind::Let));
        env.narrow("x".to_string(), Type::String);
        env.narrow("x.length".to_string(), Type::Number);
        env.push(FrameKind::Branch);
        env.invalidate("x");
        assert!(env.narrowed("x").is_none());
        assert!(env.narrowed("x.length").is_none());
        let frame = env.pop();
        assert_eq!(frame.narrowed.get("x"), Some(&None));
        assert_eq!(env.current("x"), Some(Type::String));
    }

    #[test]
    fn test_break_marks_frame() {
        let mut env = TypeEnv::new();
        env.push(FrameKind::Block);
        env.break_out();
        env.pop();
        assert!(env.is_terminated());
    }
}
