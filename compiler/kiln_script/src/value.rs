//! Runtime values and their static types.

use std::fmt;
use std::sync::Arc;

/// Static type of an expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Str,
    Bool,
    Unit,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Int => "int",
            Type::Str => "str",
            Type::Bool => "bool",
            Type::Unit => "unit",
        })
    }
}

/// A runtime value. Strings are shared so snapshots clone cheaply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(Arc<str>),
    Bool(bool),
    Unit,
}

impl Value {
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Str(_) => Type::Str,
            Value::Bool(_) => Type::Bool,
            Value::Unit => Type::Unit,
        }
    }

    /// Interactive display: strings are quoted and escaped.
    pub fn render(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", &**s),
            other => other.to_string(),
        }
    }
}

/// `print` / `str` display: strings appear verbatim.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Unit => f.write_str("()"),
        }
    }
}
