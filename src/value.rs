// Dynamic value model for packed/unpacked data
// Struct and bitfield values are key->value maps; unions carry their own
// overlay state (see desc::unions).

use crate::desc::unions::UnionValue;
use std::collections::BTreeMap;
use std::fmt;

/// A host-language value that a descriptor can pack or produce on unpack.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value; produced by a standalone Pad unpack.
    Null,
    /// Integer wide enough for the full u64 and i64 domains.
    Int(i128),
    /// Byte string; octets, no code-page conversion.
    Bytes(Vec<u8>),
    /// Symbolic name (enum symbol or bitmap flag).
    Sym(String),
    List(Vec<Value>),
    Map(ValueMap),
    Union(Box<UnionValue>),
}

impl Value {
    pub fn sym(name: impl Into<String>) -> Value {
        Value::Sym(name.into())
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_sym(&self) -> Option<&str> {
        match self {
            Value::Sym(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_union_mut(&mut self) -> Option<&mut UnionValue> {
        match self {
            Value::Union(u) => Some(u),
            _ => None,
        }
    }

    /// Byte string decoded as UTF-8, lossily.
    pub fn as_str_lossy(&self) -> Option<String> {
        match self {
            Value::Bytes(b) => Some(String::from_utf8_lossy(b).to_string()),
            Value::Sym(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Convert to a serde_json value for dumping decoded data.
    ///
    /// Byte strings become (lossy) JSON strings; a union renders as an
    /// object holding its cached active member plus the raw buffer in hex.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(v) => {
                if let Ok(n) = i64::try_from(*v) {
                    serde_json::Value::from(n)
                } else if let Ok(n) = u64::try_from(*v) {
                    serde_json::Value::from(n)
                } else {
                    serde_json::Value::from(v.to_string())
                }
            }
            Value::Bytes(b) => serde_json::Value::from(String::from_utf8_lossy(b).to_string()),
            Value::Sym(s) => serde_json::Value::from(s.as_str()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(m) => {
                let obj = m
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(obj)
            }
            Value::Union(u) => {
                let mut obj = serde_json::Map::new();
                if let Some((name, value)) = u.cached() {
                    obj.insert(name.to_string(), value.to_json());
                }
                let hex: String = u.raw().iter().map(|b| format!("{b:02x}")).collect();
                obj.insert("raw".to_string(), serde_json::Value::from(hex));
                serde_json::Value::Object(obj)
            }
        }
    }

    /// Build a value from serde_json, for loading pack inputs from JSON.
    /// Strings become byte strings; booleans become 0/1.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Int(i128::from(*b)),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::Int(v.into())
                } else if let Some(v) = n.as_u64() {
                    Value::Int(v.into())
                } else {
                    Value::Int(n.as_f64().unwrap_or(0.0) as i128)
                }
            }
            serde_json::Value::String(s) => Value::Bytes(s.as_bytes().to_vec()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Value::Sym(s) => write!(f, "{s}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Value {
                Value::Int(v as i128)
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, i128);

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Bytes(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Value {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Value {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Value {
        Value::List(items)
    }
}

impl From<ValueMap> for Value {
    fn from(m: ValueMap) -> Value {
        Value::Map(m)
    }
}

/// Key->value map used for struct and bitfield values.
/// Equality is plain map equality, independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: BTreeMap<String, Value>,
}

impl ValueMap {
    pub fn new() -> ValueMap {
        ValueMap::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Integer field shortcut, handy inside size predicates.
    pub fn get_int(&self, key: &str) -> Option<i128> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(Value::as_bytes)
    }

    pub fn get_map(&self, key: &str) -> Option<&ValueMap> {
        self.get(key).and_then(Value::as_map)
    }
}

impl FromIterator<(String, Value)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> ValueMap {
        ValueMap {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, Value)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, Value)>>(iter: T) -> ValueMap {
        ValueMap {
            entries: iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

impl IntoIterator for ValueMap {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
