//! Runtime values
//!
//! Primitives are stored inline; everything else is an `Rc<Object>` and
//! compares by pointer identity. Nothing here is `Send`.

use super::function::Callable;
use super::promise::PromiseState;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
}

pub type ObjectRef = Rc<Object>;

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Object(obj) if obj.is_callable())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Object(obj) if obj.is_array())
    }

    pub fn is_promise(&self) -> bool {
        matches!(self, Value::Object(obj) if obj.is_promise())
    }

    /// ECMAScript ToBoolean
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(obj) if obj.is_callable() => "function",
            Value::Object(_) => "object",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", crate::kit::number::format_number(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Object(obj) => write!(f, "[{} {:p}]", obj.class_name(), Rc::as_ptr(obj)),
        }
    }
}

/// Built-in error constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

pub enum ObjectKind {
    Plain,
    Array(RefCell<Vec<Value>>),
    Function(Callable),
    Error(ErrorKind),
    Promise(RefCell<PromiseState>),
}

#[derive(Clone)]
pub struct Property {
    pub value: Value,
    pub enumerable: bool,
}

/// Own properties in insertion order
#[derive(Default)]
pub struct PropertyMap {
    entries: Vec<(Rc<str>, Property)>,
}

impl PropertyMap {
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.entries.iter().find(|(k, _)| &**k == key).map(|(_, p)| p)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: Rc<str>, property: Property) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => slot.value = property.value,
            None => self.entries.push((key, property)),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| &**k != key);
        self.entries.len() != before
    }

    /// Enumerable keys: integer-like keys ascending, then the rest in insertion order
    pub fn keys(&self) -> Vec<Rc<str>> {
        let mut indexed: Vec<(u32, Rc<str>)> = Vec::new();
        let mut named = Vec::new();
        for (key, prop) in &self.entries {
            if !prop.enumerable {
                continue;
            }
            match array_index(key) {
                Some(i) => indexed.push((i, key.clone())),
                None => named.push(key.clone()),
            }
        }
        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, k)| k).chain(named).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical array index form of a key (`"3"` but not `"03"`)
pub fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|i| *i != u32::MAX)
}

pub struct Object {
    pub kind: ObjectKind,
    props: RefCell<PropertyMap>,
    frozen: Cell<bool>,
    /// User function that constructed this object via `new`
    constructor: RefCell<Option<ObjectRef>>,
}

impl Object {
    pub fn new(kind: ObjectKind) -> ObjectRef {
        Rc::new(Object {
            kind,
            props: RefCell::new(PropertyMap::default()),
            frozen: Cell::new(false),
            constructor: RefCell::new(None),
        })
    }

    pub fn plain() -> ObjectRef {
        Self::new(ObjectKind::Plain)
    }

    pub fn array(items: Vec<Value>) -> ObjectRef {
        Self::new(ObjectKind::Array(RefCell::new(items)))
    }

    pub fn class_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Plain => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error(kind) => kind.name(),
            ObjectKind::Promise(_) => "Promise",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array(_))
    }

    pub fn is_promise(&self) -> bool {
        matches!(self.kind, ObjectKind::Promise(_))
    }

    pub fn callable(&self) -> Option<&Callable> {
        match &self.kind {
            ObjectKind::Function(callable) => Some(callable),
            _ => None,
        }
    }

    pub fn elements(&self) -> Option<&RefCell<Vec<Value>>> {
        match &self.kind {
            ObjectKind::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Snapshot of the array elements, empty for non-arrays
    pub fn element_values(&self) -> Vec<Value> {
        self.elements().map(|e| e.borrow().clone()).unwrap_or_default()
    }

    pub fn promise(&self) -> Option<&RefCell<PromiseState>> {
        match &self.kind {
            ObjectKind::Promise(state) => Some(state),
            _ => None,
        }
    }

    pub fn get_own(&self, key: &str) -> Option<Value> {
        if let Some(items) = self.elements() {
            if key == "length" {
                return Some(Value::from(items.borrow().len()));
            }
            if let Some(i) = array_index(key) {
                return items.borrow().get(i as usize).cloned();
            }
        }
        self.props.borrow().get(key).map(|p| p.value.clone())
    }

    pub fn has_own(&self, key: &str) -> bool {
        if let Some(items) = self.elements() {
            if key == "length" {
                return true;
            }
            if let Some(i) = array_index(key) {
                return (i as usize) < items.borrow().len();
            }
        }
        self.props.borrow().contains(key)
    }

    /// Define or overwrite an enumerable property; ignored once frozen
    pub fn set(&self, key: impl Into<Rc<str>>, value: Value) {
        self.define(key, value, true);
    }

    /// Define a property that `Object.keys` and the serializers skip
    pub fn set_hidden(&self, key: impl Into<Rc<str>>, value: Value) {
        self.define(key, value, false);
    }

    fn define(&self, key: impl Into<Rc<str>>, value: Value, enumerable: bool) {
        if self.frozen.get() {
            return;
        }
        let key = key.into();
        self.props.borrow_mut().insert(key, Property { value, enumerable });
    }

    pub fn remove(&self, key: &str) -> bool {
        if self.frozen.get() {
            return false;
        }
        self.props.borrow_mut().remove(key)
    }

    /// Enumerable own keys as `Object.keys` reports them
    pub fn keys(&self) -> Vec<Rc<str>> {
        let mut keys: Vec<Rc<str>> = match self.elements() {
            Some(items) => (0..items.borrow().len())
                .map(|i| Rc::from(i.to_string()))
                .collect(),
            None => Vec::new(),
        };
        keys.extend(self.props.borrow().keys());
        keys
    }

    pub fn freeze(&self) {
        self.frozen.set(true);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub fn constructed_by(&self) -> Option<ObjectRef> {
        self.constructor.borrow().clone()
    }

    pub fn set_constructed_by(&self, ctor: ObjectRef) {
        *self.constructor.borrow_mut() = Some(ctor);
    }

    fn take_children(&mut self) -> Vec<Value> {
        let mut children = Vec::new();
        if let ObjectKind::Array(items) = &mut self.kind {
            children.append(items.get_mut());
        }
        children.extend(self.props.get_mut().entries.drain(..).map(|(_, prop)| prop.value));
        children
    }
}

// Nested arrays and objects are released with a worklist instead of recursion
impl Drop for Object {
    fn drop(&mut self) {
        let mut pending = self.take_children();
        while let Some(value) = pending.pop() {
            if let Value::Object(obj) = value {
                if let Ok(mut inner) = Rc::try_unwrap(obj) {
                    pending.append(&mut inner.take_children());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(!Value::from("").truthy());
        assert!(Value::from("0").truthy());
        assert!(Value::Object(Object::plain()).truthy());
        assert!(!Value::Null.truthy());
    }

    #[test]
    fn test_keys_put_indices_first() {
        let obj = Object::plain();
        obj.set("b", Value::Null);
        obj.set("2", Value::Null);
        obj.set("a", Value::Null);
        obj.set("1", Value::Null);
        obj.set_hidden("secret", Value::Null);
        let keys: Vec<String> = obj.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["1", "2", "b", "a"]);
    }

    #[test]
    fn test_array_own_properties() {
        let arr = Object::array(vec![Value::from(1.0), Value::from(2.0)]);
        assert_eq!(arr.get_own("length").and_then(|v| v.as_number()), Some(2.0));
        assert!(arr.has_own("1"));
        assert!(!arr.has_own("2"));
        assert!(!arr.has_own("01"));
    }

    #[test]
    fn test_frozen_ignores_writes() {
        let obj = Object::plain();
        obj.set("x", Value::from(1.0));
        obj.freeze();
        obj.set("x", Value::from(2.0));
        obj.set("y", Value::from(3.0));
        assert_eq!(obj.get_own("x").and_then(|v| v.as_number()), Some(1.0));
        assert!(!obj.has_own("y"));
    }

    #[test]
    fn test_deep_nesting_drops_on_a_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let mut value = Value::Object(Object::array(Vec::new()));
                for _ in 0..200_000 {
                    value = Value::Object(Object::array(vec![value]));
                }
                let wrapper = Object::plain();
                wrapper.set("inner", value);
                drop(wrapper);
            })
            .unwrap();
        assert!(handle.join().is_ok());
    }

    #[test]
    fn test_type_of() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::from(1.0).type_of(), "number");
        assert_eq!(Value::Undefined.type_of(), "undefined");
    }
}
