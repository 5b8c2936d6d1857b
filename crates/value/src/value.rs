//! The `ez` runtime value universe.
//!
//! `Value` is a closed sum of variants (§3). Every variant carries a stable
//! textual type-tag and knows how to render its own inspect form; pattern
//! match on it throughout the evaluator rather than reaching for a trait
//! object hierarchy.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::environment::SharedEnv;

/// Opaque handle to a function body.
///
/// The real AST type for a function body belongs to the parser, which is
/// external to this crate. `Value` only needs to carry the body around and
/// hand it back to the evaluator untouched, so it is type-erased behind
/// `Any` rather than forcing this crate (and everything built on it) to be
/// generic over the host language's node type.
#[derive(Clone)]
pub struct BodyHandle(Rc<dyn Any>);

impl BodyHandle {
    pub fn new<T: 'static>(body: T) -> Self {
        Self(Rc::new(body))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyHandle(..)")
    }
}

impl PartialEq for BodyHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A builtin's callable implementation, identity-compared.
#[derive(Clone)]
pub struct Builtin(pub Rc<dyn Fn(&[Value]) -> Value>);

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin(..)")
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A declared function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_name: Option<String>,
}

/// Hashable subset of `Value`, valid as a `Map` key (§3 Hashability).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Integer(i64),
    Boolean(bool),
    String(String),
    Char(char),
}

impl MapKey {
    /// Try to derive a `MapKey` from a `Value`. `None` for non-hashable
    /// variants (Float, Array, Map, Struct, ...).
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value {
            Value::Integer(i) => Some(MapKey::Integer(i.value)),
            Value::Boolean(b) => Some(MapKey::Boolean(*b)),
            Value::String(s) => Some(MapKey::String(s.value.clone())),
            Value::Char(c) => Some(MapKey::Char(*c)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Integer(i) => Value::integer(*i),
            MapKey::Boolean(b) => Value::Boolean(*b),
            MapKey::String(s) => Value::string(s.clone()),
            MapKey::Char(c) => Value::Char(*c),
        }
    }

    /// Deterministic key string derived from the variant tag and value
    /// (§3: `s:<string>`, `i:<decimal>`, `b:<bool>`, `c:<codepoint-decimal>`).
    pub fn key_string(&self) -> String {
        match self {
            MapKey::Integer(i) => format!("i:{i}"),
            MapKey::Boolean(b) => format!("b:{b}"),
            MapKey::String(s) => format!("s:{s}"),
            MapKey::Char(c) => format!("c:{}", *c as u32),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerValue {
    pub value: i64,
    pub declared_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringValue {
    pub value: String,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub message: String,
    pub code: i64,
    pub line: u32,
    pub column: u32,
    pub help: Option<String>,
    pub preformatted: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub params: Vec<Param>,
    pub return_types: Vec<String>,
    pub body: BodyHandle,
    pub env: SharedEnv,
}

// A closure's environment is compared by identity: two functions declared
// from the same body at the same site share an Rc, but the environment
// itself (full of `Value`s, some of which may themselves be functions)
// should never be walked structurally just to answer "are these equal".
impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
            && self.return_types == other.return_types
            && self.body == other.body
            && Rc::ptr_eq(&self.env, &other.env)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub elements: Rc<RefCell<Vec<Value>>>,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    pub entries: Rc<RefCell<IndexMap<MapKey, Value>>>,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub type_name: String,
    pub fields: Rc<RefCell<IndexMap<String, Value>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub members: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumInstance {
    pub enum_name: String,
    pub member_name: String,
    pub value: Box<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleValue {
    pub name: String,
    pub exports: Rc<RefCell<IndexMap<String, Value>>>,
}

/// The runtime value universe (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(IntegerValue),
    Float(f64),
    String(StringValue),
    Char(char),
    Boolean(bool),
    Nil,
    ReturnValue(Vec<Value>),
    Error(ErrorValue),
    Function(FunctionValue),
    Builtin(Builtin),
    Array(ArrayValue),
    Map(MapValue),
    Struct(StructValue),
    Break,
    Continue,
    Enum(EnumDef),
    EnumValue(EnumInstance),
    Module(ModuleValue),
}

impl Value {
    pub fn integer(value: i64) -> Self {
        Value::Integer(IntegerValue {
            value,
            declared_type: "int".to_string(),
        })
    }

    pub fn typed_integer(value: i64, declared_type: impl Into<String>) -> Self {
        Value::Integer(IntegerValue {
            value,
            declared_type: declared_type.into(),
        })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String(StringValue {
            value: value.into(),
            mutable: false,
        })
    }

    pub fn mutable_string(value: impl Into<String>) -> Self {
        Value::String(StringValue {
            value: value.into(),
            mutable: true,
        })
    }

    pub fn array(elements: Vec<Value>, mutable: bool) -> Self {
        Value::Array(ArrayValue {
            elements: Rc::new(RefCell::new(elements)),
            mutable,
        })
    }

    pub fn map(entries: IndexMap<MapKey, Value>, mutable: bool) -> Self {
        Value::Map(MapValue {
            entries: Rc::new(RefCell::new(entries)),
            mutable,
        })
    }

    /// Stable textual type-tag (§3).
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Char(_) => "char",
            Value::Boolean(_) => "boolean",
            Value::Nil => "nil",
            Value::ReturnValue(_) => "return_value",
            Value::Error(_) => "error",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Break => "break",
            Value::Continue => "continue",
            Value::Enum(_) => "enum",
            Value::EnumValue(_) => "enum_value",
            Value::Module(_) => "module",
        }
    }

    /// The canonical human-readable inspect form (§3, §4.1).
    pub fn inspect(&self) -> String {
        match self {
            Value::Integer(i) => i.value.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => escape_string(&s.value),
            Value::Char(c) => c.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Nil => "nil".to_string(),
            Value::ReturnValue(values) => values
                .iter()
                .map(Value::inspect)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Error(e) => {
                if e.preformatted {
                    e.message.clone()
                } else {
                    format!("ERROR: {}", e.message)
                }
            }
            Value::Function(_) => "function".to_string(),
            Value::Builtin(_) => "builtin function".to_string(),
            Value::Array(a) => {
                let parts: Vec<String> = a.elements.borrow().iter().map(Value::inspect).collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Map(m) => {
                let parts: Vec<String> = m
                    .entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.to_value().inspect(), v.inspect()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Struct(s) => {
                let parts: Vec<String> = s
                    .fields
                    .borrow()
                    .iter()
                    .map(|(name, v)| format!("{}: {}", name, v.inspect()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Break => "break".to_string(),
            Value::Continue => "continue".to_string(),
            Value::Enum(e) => {
                let parts: Vec<String> = e
                    .members
                    .iter()
                    .map(|(name, v)| format!("{} = {}", name, v.inspect()))
                    .collect();
                format!("enum {} {{ {} }}", e.name, parts.join(", "))
            }
            Value::EnumValue(ev) => ev.value.inspect(),
            Value::Module(m) => format!("<{}>", m.name),
        }
    }
}

/// Render a float per §3: up to 10 fractional digits, trailing zeros
/// stripped, terminal `.0` preserved.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let s = format!("{f:.10}");
    let trimmed = s.trim_end_matches('0');
    if let Some(stripped) = trimmed.strip_suffix('.') {
        format!("{stripped}.0")
    } else {
        trimmed.to_string()
    }
}

/// Double-quoted, escape-encoded string (§3).
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
