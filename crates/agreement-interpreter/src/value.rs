//! Runtime values.
//!
//! Collections are persistent values: an array or map is never changed in
//! place once another binding can see it. Index assignment and the
//! collection builtins produce new values, so a contract that mentions an
//! argument still sees the argument as it was passed in.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use agreement_ast::Block;
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::Environment;

/// Runtime values
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Nil value (absence of value)
    #[default]
    Nil,

    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point number
    Float(f64),

    String(SmolStr),

    /// Symbolic constant, written `:name`
    Atom(SmolStr),

    Array(Rc<Vec<Value>>),

    /// Map with string keys, in insertion order
    Map(Rc<IndexMap<SmolStr, Value>>),

    /// Integer range (for iteration)
    Range {
        start: i64,
        end: i64,
        inclusive: bool,
    },

    /// User-defined function, possibly instrumented
    Function(Rc<UserFunction>),

    /// Built-in function
    BuiltinFunction(BuiltinFn),
}

/// A function defined in source. For contracted functions `body` is the
/// woven body.
#[derive(Debug, Clone)]
pub struct UserFunction {
    pub name: SmolStr,
    pub params: Vec<SmolStr>,
    pub body: Block,
    pub closure: Rc<RefCell<Environment>>,
}

/// A built-in function implemented in Rust.
#[derive(Clone)]
pub struct BuiltinFn {
    pub name: SmolStr,
    pub arity: Option<usize>, // None means variadic
    pub func: fn(Vec<Value>) -> crate::Result<Value>,
}

impl fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinFn({})", self.name)
    }
}

impl Value {
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Rc::new(values))
    }

    pub fn map<K: Into<SmolStr>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(Rc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn string(s: impl Into<SmolStr>) -> Self {
        Value::String(s.into())
    }

    pub fn atom(s: impl Into<SmolStr>) -> Self {
        Value::Atom(s.into())
    }

    /// Get the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Atom(_) => "Atom",
            Value::Array(_) => "Array",
            Value::Map(_) => "Map",
            Value::Range { .. } => "Range",
            Value::Function(_) | Value::BuiltinFunction(_) => "Function",
        }
    }

    /// Only `nil` and `false` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Atom(s) => write!(f, ":{}", s),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Range {
                start,
                end,
                inclusive,
            } => {
                if *inclusive {
                    write!(f, "{}..={}", start, end)
                } else {
                    write!(f, "{}..{}", start, end)
                }
            }
            Value::Function(func) => write!(f, "<fn {}>", func.name),
            Value::BuiltinFunction(func) => write!(f, "<builtin {}>", func.name),
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
            (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Atom(a), Value::Atom(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (
                Value::Range {
                    start: s1,
                    end: e1,
                    inclusive: i1,
                },
                Value::Range {
                    start: s2,
                    end: e2,
                    inclusive: i2,
                },
            ) => s1 == s2 && e1 == e2 && i1 == i2,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::array(values)
    }
}
