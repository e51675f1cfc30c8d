//! Host globals and the built-in method tables
//!
//! A realm is built once per interpreter and shared by every run it
//! executes; runs get their own scopes below `globals`.

use super::scope::Scope;
use super::stdlib;
use super::value::Value;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Which built-in method table a receiver falls back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Proto {
    Object,
    Function,
    Array,
    String,
    Number,
    Boolean,
    Error,
    Promise,
}

pub struct Realm {
    pub globals: Rc<Scope>,
    methods: HashMap<Proto, HashMap<&'static str, Value>>,
}

impl Realm {
    pub fn new() -> Rc<Self> {
        let mut realm = Realm {
            globals: Scope::global(),
            methods: HashMap::new(),
        };
        stdlib::install(&mut realm);
        debug!(target: "tinker::runtime", globals = stdlib::GLOBAL_NAMES.len(), "realm initialized");
        Rc::new(realm)
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.declare(Rc::from(name), true, Some(value));
    }

    /// Register methods shared by every receiver of one kind
    pub fn define_methods(&mut self, proto: Proto, methods: Vec<(&'static str, Value)>) {
        self.methods.entry(proto).or_default().extend(methods);
    }

    /// Method lookup, falling back to the methods every object has
    pub fn method(&self, proto: Proto, name: &str) -> Option<Value> {
        self.methods
            .get(&proto)
            .and_then(|table| table.get(name))
            .or_else(|| self.methods.get(&Proto::Object).and_then(|table| table.get(name)))
            .cloned()
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).ok()
    }
}
