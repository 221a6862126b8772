use std::{fmt, rc::Rc};

use indexmap::IndexMap;

use crate::engine::{ast::Stmt, environment::ScopeRef};

/// A script value. Cheap to clone; the payload is shared.
#[derive(Clone)]
pub struct Value(pub(crate) Rc<ValueKind>);

#[derive(Debug)]
pub enum ValueKind {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Function(UserFunction),
    Native(NativeFunction),
    Promise(PromiseState),
}

/// Promises in this engine are created already settled; `then` reactions are
/// deferred through the engine job queue rather than through promise state
/// transitions.
#[derive(Debug, Clone)]
pub enum PromiseState {
    Fulfilled(Value),
}

#[derive(Clone)]
pub struct UserFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub env: ScopeRef,
}

impl fmt::Debug for UserFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Host-provided function callable from script code.
pub type HostFn = fn(&[Value]) -> Result<Value, ErrorValue>;

#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub callback: HostFn,
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn undefined() -> Self {
        Self::new(ValueKind::Undefined)
    }

    pub fn null() -> Self {
        Self::new(ValueKind::Null)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn number(value: f64) -> Self {
        Self::new(ValueKind::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(values))
    }

    pub fn object(entries: IndexMap<String, Value>) -> Self {
        Self::new(ValueKind::Object(entries))
    }

    pub fn native(name: &'static str, callback: HostFn) -> Self {
        Self::new(ValueKind::Native(NativeFunction { name, callback }))
    }

    pub fn fulfilled_promise(value: Value) -> Self {
        Self::new(ValueKind::Promise(PromiseState::Fulfilled(value)))
    }

    pub fn kind(&self) -> &ValueKind {
        &self.0
    }

    pub fn is_truthy(&self) -> bool {
        match &*self.0 {
            ValueKind::Undefined | ValueKind::Null => false,
            ValueKind::Bool(b) => *b,
            ValueKind::Number(n) => *n != 0.0 && !n.is_nan(),
            ValueKind::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &*self.0 {
            ValueKind::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match &*self.0 {
            ValueKind::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &*self.0 {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(&*self.0, ValueKind::Function(_) | ValueKind::Native(_))
    }

    /// `typeof` result for this value.
    pub fn type_of(&self) -> &'static str {
        match &*self.0 {
            ValueKind::Undefined => "undefined",
            ValueKind::Bool(_) => "boolean",
            ValueKind::Number(_) => "number",
            ValueKind::String(_) => "string",
            ValueKind::Function(_) | ValueKind::Native(_) => "function",
            _ => "object",
        }
    }

    /// Numeric coercion used by arithmetic and comparisons.
    pub fn to_number(&self) -> f64 {
        match &*self.0 {
            ValueKind::Undefined => f64::NAN,
            ValueKind::Null => 0.0,
            ValueKind::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ValueKind::Number(n) => *n,
            ValueKind::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    pub fn strict_eq(&self, other: &Value) -> bool {
        match (&*self.0, &*other.0) {
            (ValueKind::Undefined, ValueKind::Undefined) => true,
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::Number(a), ValueKind::Number(b)) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            _ => Rc::ptr_eq(&self.0, &other.0),
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        match (&*self.0, &*other.0) {
            (ValueKind::Undefined | ValueKind::Null, ValueKind::Undefined | ValueKind::Null) => {
                true
            }
            (ValueKind::Number(_), ValueKind::String(_))
            | (ValueKind::String(_), ValueKind::Number(_)) => self.to_number() == other.to_number(),
            (ValueKind::Bool(_), _) => Value::number(self.to_number()).loose_eq(other),
            (_, ValueKind::Bool(_)) => self.loose_eq(&Value::number(other.to_number())),
            _ => self.strict_eq(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::Undefined => write!(f, "undefined"),
            ValueKind::Null => write!(f, "null"),
            ValueKind::Bool(b) => write!(f, "{b}"),
            ValueKind::Number(n) => write!(f, "{}", format_number(*n)),
            ValueKind::String(s) => write!(f, "{s}"),
            ValueKind::Array(values) => {
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    match &*value.0 {
                        ValueKind::Undefined | ValueKind::Null => {}
                        _ => write!(f, "{value}")?,
                    }
                }
                Ok(())
            }
            ValueKind::Object(_) => write!(f, "[object Object]"),
            ValueKind::Promise(_) => write!(f, "[object Promise]"),
            ValueKind::Function(fun) => write!(
                f,
                "function {}() {{ [code] }}",
                fun.name.as_deref().unwrap_or("")
            ),
            ValueKind::Native(fun) => write!(f, "function {}() {{ [native code] }}", fun.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::String(s) => write!(f, "{s:?}"),
            ValueKind::Array(values) => f.debug_list().entries(values.iter()).finish(),
            ValueKind::Object(map) => f.debug_map().entries(map.iter()).finish(),
            _ => write!(f, "{self}"),
        }
    }
}

/// Render a number the way script output does: integral values print without
/// a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == n.trunc() && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// An error produced by engine evaluation: a JS-style error name plus a
/// message. Consuming one of these is the analogue of clearing an engine
/// error flag. A fatal error (the `assert` primitive) terminates the host.
#[derive(Debug, Clone)]
pub struct ErrorValue {
    name: Option<&'static str>,
    message: String,
    fatal: bool,
}

impl ErrorValue {
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            name: Some("SyntaxError"),
            message: format!("{} [line: {line}, column: {column}]", message.into()),
            fatal: false,
        }
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self {
            name: Some("ReferenceError"),
            message: message.into(),
            fatal: false,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self {
            name: Some("TypeError"),
            message: message.into(),
            fatal: false,
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self {
            name: Some("RangeError"),
            message: message.into(),
            fatal: false,
        }
    }

    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            name: Some("Error"),
            message: message.into(),
            fatal: false,
        }
    }

    pub fn assertion() -> Self {
        Self {
            name: None,
            message: "assertion failed".into(),
            fatal: true,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn is_syntax_error(&self) -> bool {
        self.name == Some("SyntaxError")
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "{name}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ErrorValue {}
