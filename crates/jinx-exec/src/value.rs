//! Dynamic values produced by evaluation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::eval::Renderer;
use crate::varargs::VarArgs;
use crate::ExecError;

/// Something that can be invoked from an expression: a declared macro or a
/// host function.
pub trait Callable: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Invoke with the call-site arguments. Failures come back as
    /// [`Value::Error`], never as a panic.
    fn call(&self, renderer: &dyn Renderer, ctx: &mut Context, args: VarArgs) -> Value;
}

/// A host function exposed to templates.
pub struct Function {
    name: String,
    func: Box<dyn Fn(VarArgs) -> Value + Send + Sync>,
}

impl Function {
    pub fn new(name: impl Into<String>, func: impl Fn(VarArgs) -> Value + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, _renderer: &dyn Renderer, _ctx: &mut Context, args: VarArgs) -> Value {
        (self.func)(args)
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Markup-safe text, such as the output of a macro.
    SafeString(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Callable(Arc<dyn Callable>),
    /// An evaluation failure travelling as a value.
    Error(Arc<ExecError>),
}

impl Value {
    pub fn from_error(err: ExecError) -> Self {
        Value::Error(Arc::new(err))
    }

    pub fn function(
        name: impl Into<String>,
        func: impl Fn(VarArgs) -> Value + Send + Sync + 'static,
    ) -> Self {
        Value::Callable(Arc::new(Function::new(name, func)))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn error(&self) -> Option<&ExecError> {
        match self {
            Value::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Python-style truthiness: empty containers, zero and null are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Error(_) => false,
            Value::Bool(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) | Value::SafeString(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Callable(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) | Value::SafeString(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Callable(_) => "callable",
            Value::Error(_) => "error",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::SafeString(s) => Some(s),
            _ => None,
        }
    }

    /// Map key for this value: strings as-is, anything else in display form.
    pub fn to_key(&self) -> String {
        match self.as_str() {
            Some(s) => s.to_string(),
            None => self.to_string(),
        }
    }

    fn write_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::String(s) | Value::SafeString(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            other => write!(f, "{other}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => Arc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => a == b,
            (a, b) => match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n:?}"),
            Value::String(s) | Value::SafeString(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write_repr(f)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{key}': ")?;
                    value.write_repr(f)?;
                }
                f.write_str("}")
            }
            Value::Callable(callable) => write!(f, "<callable {}>", callable.name()),
            Value::Error(err) => write!(f, "{err}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}
