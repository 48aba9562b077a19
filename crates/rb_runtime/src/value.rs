//! Values stored in constant, class-variable and instance-variable slots.

use std::fmt;
use std::sync::Arc;

use rb_core::MutableString;

use crate::ids::ModuleId;
use crate::object::ObjectRef;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Symbol(Arc<str>),
    /// Shared strings are frozen before they are stored.
    Str(Arc<MutableString>),
    Module(ModuleId),
    Object(ObjectRef),
}

impl Value {
    /// Wraps a string, freezing it so the shared copy cannot change.
    pub fn string(mut s: MutableString) -> Self {
        s.freeze();
        Value::Str(Arc::new(s))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_module(&self) -> Option<ModuleId> {
        match self {
            Value::Module(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&MutableString> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Symbol(s) => write!(f, ":{s}"),
            Value::Str(s) => f.write_str(&s.inspect()),
            Value::Module(id) => write!(f, "{id:?}"),
            Value::Object(obj) => write!(f, "#<object of {:?}>", obj.class()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(MutableString::from(s))
    }
}

impl From<ModuleId> for Value {
    fn from(id: ModuleId) -> Self {
        Value::Module(id)
    }
}
