//! Shared value graph handed to the redaction engine.
//!
//! Containers are reference-counted, so one map or list may appear at several
//! places in a payload, including inside itself. `serde_json::Value` converts
//! into a `Payload` tree without any sharing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

/// Shared map container.
pub type SharedMap = Arc<RwLock<BTreeMap<String, Payload>>>;

/// Shared list container.
pub type SharedList = Arc<RwLock<Vec<Payload>>>;

/// A payload value. Cloning a container clones the handle, not the contents.
#[derive(Clone)]
pub enum Payload {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    List(SharedList),
    Map(SharedMap),
}

impl Payload {
    /// New empty map.
    pub fn map() -> Self {
        Payload::Map(Arc::new(RwLock::new(BTreeMap::new())))
    }

    /// New empty list.
    pub fn list() -> Self {
        Payload::List(Arc::new(RwLock::new(Vec::new())))
    }

    /// Build a map from key/value pairs.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Payload>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<BTreeMap<_, _>>();
        Payload::from(map)
    }

    /// Insert into a map. Returns `false` if `self` is not a map.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Payload>) -> bool {
        match self {
            Payload::Map(map) => {
                map.write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    /// Append to a list. Returns `false` if `self` is not a list.
    pub fn push(&self, value: impl Into<Payload>) -> bool {
        match self {
            Payload::List(list) => {
                list.write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(value.into());
                true
            }
            _ => false,
        }
    }

    /// Look up a map entry. The returned container shares storage with `self`.
    pub fn get(&self, key: &str) -> Option<Payload> {
        match self {
            Payload::Map(map) => map
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned(),
            _ => None,
        }
    }

    /// String content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Payload::List(_) | Payload::Map(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Null)
    }

    /// Identity of a container, used for cycle detection.
    pub fn container_id(&self) -> Option<usize> {
        match self {
            Payload::List(list) => Some(Arc::as_ptr(list) as *const () as usize),
            Payload::Map(map) => Some(Arc::as_ptr(map) as *const () as usize),
            _ => None,
        }
    }

    /// Whether two payloads are the same container.
    pub fn same_container(&self, other: &Payload) -> bool {
        match (self.container_id(), other.container_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Null
    }
}

// Containers print as handles only; a cyclic payload must not recurse.
impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Null => write!(f, "Null"),
            Payload::Bool(b) => write!(f, "Bool({})", b),
            Payload::Int(i) => write!(f, "Int({})", i),
            Payload::UInt(u) => write!(f, "UInt({})", u),
            Payload::Float(x) => write!(f, "Float({})", x),
            Payload::String(s) => write!(f, "String({:?})", s),
            Payload::List(list) => write!(f, "List({:p})", Arc::as_ptr(list)),
            Payload::Map(map) => write!(f, "Map({:p})", Arc::as_ptr(map)),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Payload::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Payload::UInt(u)
                } else {
                    Payload::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Payload::String(s),
            Value::Array(items) => Payload::from(items.into_iter().map(Payload::from).collect::<Vec<_>>()),
            Value::Object(map) => Payload::from(
                map.into_iter()
                    .map(|(k, v)| (k, Payload::from(v)))
                    .collect::<BTreeMap<_, _>>(),
            ),
        }
    }
}

impl From<&Value> for Payload {
    fn from(value: &Value) -> Self {
        Payload::from(value.clone())
    }
}

impl From<BTreeMap<String, Payload>> for Payload {
    fn from(map: BTreeMap<String, Payload>) -> Self {
        Payload::Map(Arc::new(RwLock::new(map)))
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(items: Vec<Payload>) -> Self {
        Payload::List(Arc::new(RwLock::new(items)))
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::String(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::String(s)
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Bool(b)
    }
}

impl From<i32> for Payload {
    fn from(i: i32) -> Self {
        Payload::Int(i64::from(i))
    }
}

impl From<i64> for Payload {
    fn from(i: i64) -> Self {
        Payload::Int(i)
    }
}

impl From<u64> for Payload {
    fn from(u: u64) -> Self {
        Payload::UInt(u)
    }
}

impl From<f64> for Payload {
    fn from(x: f64) -> Self {
        Payload::Float(x)
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Payload::Null)
    }
}
