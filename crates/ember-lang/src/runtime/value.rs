use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::runtime::env::Env;
use crate::syntax::ast::FnDecl;
use crate::types::object::NativeObject;

/// Host closure behind a native function value.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, RuntimeError>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Function(Rc<Function>),
    Native(Rc<dyn NativeObject>),
}

pub enum Function {
    /// Declared in script; `closure` is the environment active at declaration.
    Script {
        decl: Rc<FnDecl>,
        closure: Env,
    },
    /// Registered by the host. `arity: None` leaves argument checking to `func`.
    Native {
        name: String,
        arity: Option<usize>,
        func: Box<NativeFn>,
    },
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Self::Script { decl, .. } => &decl.name,
            Self::Native { name, .. } => name,
        }
    }

    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::Script { decl, .. } => Some(decl.params.len()),
            Self::Native { arity, .. } => *arity,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script { decl, .. } => f.debug_struct("Script")
                .field("name", &decl.name)
                .field("params", &decl.params)
                .finish_non_exhaustive(),
            Self::Native { name, arity, .. } => f.debug_struct("Native")
                .field("name", name)
                .field("arity", arity)
                .finish_non_exhaustive(),
        }
    }
}

impl Value {
    pub fn native(object: impl NativeObject + 'static) -> Self {
        Self::Native(Rc::new(object))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
            Self::Function(_) => "function",
            Self::Native(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric value widened to f64.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Double(x) => Some(*x),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Native(a), Self::Native(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Self::Double(x) => f.debug_tuple("Double").field(x).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Function(func) => f.debug_tuple("Function").field(func).finish(),
            Self::Native(obj) => f.debug_tuple("Native").field(&obj.type_name()).finish(),
        }
    }
}

/// Script-facing rendering. Literal forms render as source text that
/// evaluates back to an equal value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Double(x) => f.write_str(&format_double(*x)),
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Function(func) => write!(f, "<function {}>", func.name()),
            Self::Native(obj) => write!(f, "<{} object>", obj.type_name()),
        }
    }
}

/// Shortest round-trip decimal, always with a fractional part when finite.
fn format_double(x: f64) -> String {
    let s = x.to_string();
    if x.is_finite() && !s.contains('.') { format!("{s}.0") } else { s }
}

// ─── Host conversions ─────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self { Self::Bool(b) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self { Self::Int(n.into()) }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self { Self::Double(x) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Self::Str(s) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::Str(s.to_string()) }
}

impl From<()> for Value {
    fn from(_: ()) -> Self { Self::Null }
}

fn conversion_error(expected: &str, got: &Value) -> RuntimeError {
    RuntimeError::host(format!("expected {expected}, got `{}`", got.type_name()))
}

impl TryFrom<Value> for bool {
    type Error = RuntimeError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bool(b) => Ok(b),
            other => Err(conversion_error("bool", &other)),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = RuntimeError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Int(n) => Ok(n),
            other => Err(conversion_error("int", &other)),
        }
    }
}

/// Ints widen to f64, matching the arithmetic promotion rule.
impl TryFrom<Value> for f64 {
    type Error = RuntimeError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        v.as_double().ok_or_else(|| conversion_error("number", &v))
    }
}

impl TryFrom<Value> for String {
    type Error = RuntimeError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Str(s) => Ok(s),
            other => Err(conversion_error("string", &other)),
        }
    }
}
