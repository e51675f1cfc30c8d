//! Lexical environments

use super::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// Why a name could not be read or written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    NotDefined(Rc<str>),
    /// Read or write inside the temporal dead zone
    Uninitialized(Rc<str>),
    ConstAssignment(Rc<str>),
}

struct Binding {
    /// `None` until a `let`/`const` declaration runs
    value: Option<Value>,
    mutable: bool,
}

pub struct Scope {
    kind: ScopeKind,
    bindings: RefCell<HashMap<Rc<str>, Binding>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn global() -> Rc<Self> {
        Rc::new(Self {
            kind: ScopeKind::Global,
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    pub fn child(parent: &Rc<Scope>, kind: ScopeKind) -> Rc<Self> {
        Rc::new(Self {
            kind,
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Create or replace a binding in this scope; `None` leaves it uninitialized
    pub fn declare(&self, name: Rc<str>, mutable: bool, value: Option<Value>) {
        self.bindings.borrow_mut().insert(name, Binding { value, mutable });
    }

    /// Hoist a `var` to the nearest function scope, keeping any existing value
    pub fn declare_var(self: &Rc<Self>, name: Rc<str>) {
        let target = self.function_scope();
        let mut bindings = target.bindings.borrow_mut();
        bindings.entry(name).or_insert(Binding {
            value: Some(Value::Undefined),
            mutable: true,
        });
    }

    /// Run a lexical declaration: set the binding created by hoisting
    pub fn initialize(&self, name: Rc<str>, mutable: bool, value: Value) {
        let mut bindings = self.bindings.borrow_mut();
        match bindings.get_mut(&name) {
            Some(binding) => {
                binding.value = Some(value);
                binding.mutable = mutable;
            }
            None => {
                bindings.insert(
                    name,
                    Binding {
                        value: Some(value),
                        mutable,
                    },
                );
            }
        }
    }

    pub fn function_scope(self: &Rc<Self>) -> Rc<Scope> {
        let mut scope = self.clone();
        while scope.kind == ScopeKind::Block {
            match &scope.parent {
                Some(parent) => scope = parent.clone(),
                None => break,
            }
        }
        scope
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.has(name))
    }

    pub fn get(&self, name: &str) -> Result<Value, ScopeError> {
        if let Some(binding) = self.bindings.borrow().get(name) {
            return binding
                .value
                .clone()
                .ok_or_else(|| ScopeError::Uninitialized(Rc::from(name)));
        }
        match &self.parent {
            Some(parent) => parent.get(name),
            None => Err(ScopeError::NotDefined(Rc::from(name))),
        }
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), ScopeError> {
        if let Some(binding) = self.bindings.borrow_mut().get_mut(name) {
            if binding.value.is_none() {
                return Err(ScopeError::Uninitialized(Rc::from(name)));
            }
            if !binding.mutable {
                return Err(ScopeError::ConstAssignment(Rc::from(name)));
            }
            binding.value = Some(value);
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(ScopeError::NotDefined(Rc::from(name))),
        }
    }

    /// Fresh sibling scope carrying the current values of `names`
    pub fn copy_of(self: &Rc<Self>, names: &[Rc<str>]) -> Rc<Scope> {
        let parent = self.parent.clone().unwrap_or_else(|| self.clone());
        let copy = Scope::child(&parent, self.kind);
        let bindings = self.bindings.borrow();
        for name in names {
            if let Some(binding) = bindings.get(name) {
                copy.declare(name.clone(), binding.mutable, binding.value.clone());
            }
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Rc<str> {
        Rc::from(s)
    }

    #[test]
    fn test_lookup_walks_parents() {
        let global = Scope::global();
        global.declare(name("x"), true, Some(Value::from(1.0)));
        let block = Scope::child(&global, ScopeKind::Block);
        assert_eq!(block.get("x").ok().and_then(|v| v.as_number()), Some(1.0));
        assert_eq!(block.get("y").unwrap_err(), ScopeError::NotDefined(name("y")));
    }

    #[test]
    fn test_temporal_dead_zone() {
        let scope = Scope::global();
        scope.declare(name("x"), true, None);
        assert_eq!(scope.get("x").unwrap_err(), ScopeError::Uninitialized(name("x")));
        scope.initialize(name("x"), true, Value::Null);
        assert!(scope.get("x").is_ok());
    }

    #[test]
    fn test_const_assignment() {
        let scope = Scope::global();
        scope.initialize(name("c"), false, Value::Null);
        assert_eq!(
            scope.assign("c", Value::Undefined).unwrap_err(),
            ScopeError::ConstAssignment(name("c"))
        );
    }

    #[test]
    fn test_var_hoists_past_blocks() {
        let global = Scope::global();
        let func = Scope::child(&global, ScopeKind::Function);
        let block = Scope::child(&func, ScopeKind::Block);
        block.declare_var(name("v"));
        assert!(func.bindings.borrow().contains_key("v"));
        assert!(!global.has("v"));
    }

    #[test]
    fn test_copy_of_detaches_bindings() {
        let global = Scope::global();
        let first = Scope::child(&global, ScopeKind::Block);
        first.initialize(name("i"), true, Value::from(0.0));
        let second = first.copy_of(&[name("i")]);
        second.assign("i", Value::from(1.0)).unwrap();
        assert_eq!(first.get("i").ok().and_then(|v| v.as_number()), Some(0.0));
        assert_eq!(second.get("i").ok().and_then(|v| v.as_number()), Some(1.0));
    }
}
