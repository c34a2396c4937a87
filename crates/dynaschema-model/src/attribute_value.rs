//! Typed attribute values stored in items.
//!
//! `AttributeValue` is a tagged union where exactly one variant is present.
//! The JSON wire format uses single-key objects like `{"S": "hello"}`.
//!
//! Caller parameters arrive as plain JSON ([`serde_json::Value`]); the
//! [`AttributeValue::from_json`] / [`AttributeValue::to_json`] pair converts
//! between that loose shape and the typed store representation.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single stored attribute value.
///
/// Numbers are always string-encoded to preserve arbitrary precision.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Number value (string-encoded for arbitrary precision).
    N(String),
    /// Binary value (base64-encoded in JSON).
    B(bytes::Bytes),
    /// Boolean value.
    Bool(bool),
    /// Null value.
    Null(bool),
    /// List of attribute values.
    L(Vec<AttributeValue>),
    /// Map of attribute values.
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Returns `true` if this is a null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(true))
    }

    /// Returns the string value if this is an `S` variant.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number string if this is an `N` variant.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the map if this is an `M` variant.
    #[must_use]
    pub fn as_m(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the list if this is an `L` variant.
    #[must_use]
    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::L(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the boolean if this is a `Bool` variant.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the type descriptor string (e.g., "S", "N", "BOOL").
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }

    /// Convert a loose JSON value into its natural attribute value.
    ///
    /// Strings become `S`, numbers `N`, booleans `BOOL`, `null` becomes
    /// `NULL`, arrays `L` and objects `M`. Binary data has no JSON form and
    /// is never produced here.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null(true),
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::N(n.to_string()),
            serde_json::Value::String(s) => Self::S(s.clone()),
            serde_json::Value::Array(items) => Self::L(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(map) => Self::M(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert this attribute value back into a loose JSON value.
    ///
    /// Numbers that do not fit a JSON number are kept as strings; binary is
    /// rendered as standard base64.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::S(s) => serde_json::Value::String(s.clone()),
            Self::N(n) => serde_json::from_str::<serde_json::Number>(n)
                .map_or_else(|_| serde_json::Value::String(n.clone()), serde_json::Value::Number),
            Self::B(b) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Null(_) => serde_json::Value::Null,
            Self::L(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::M(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttributeValue {
                fn from(value: $ty) -> Self {
                    Self::N(value.to_string())
                }
            }
        )*
    };
}

number_from!(i32, i64, u32, u64, f64);

impl Eq for AttributeValue {}

impl std::hash::Hash for AttributeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::S(s) | Self::N(s) => s.hash(state),
            Self::B(b) => b.hash(state),
            Self::Bool(b) | Self::Null(b) => b.hash(state),
            Self::L(v) => v.hash(state),
            Self::M(m) => {
                // Deterministic hash for maps: sort keys.
                let mut pairs: Vec<_> = m.iter().collect();
                pairs.sort_by_key(|(k, _)| *k);
                for (k, v) in pairs {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{{S: {s}}}"),
            Self::N(n) => write!(f, "{{N: {n}}}"),
            Self::B(b) => write!(f, "{{B: {} bytes}}", b.len()),
            Self::Bool(b) => write!(f, "{{BOOL: {b}}}"),
            Self::Null(b) => write!(f, "{{NULL: {b}}}"),
            Self::L(v) => write!(f, "{{L: {} items}}", v.len()),
            Self::M(m) => write!(f, "{{M: {} keys}}", m.len()),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::S(s) => map.serialize_entry("S", s)?,
            Self::N(n) => map.serialize_entry("N", n)?,
            Self::B(b) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(b);
                map.serialize_entry("B", &encoded)?;
            }
            Self::Bool(b) => map.serialize_entry("BOOL", b)?,
            Self::Null(b) => map.serialize_entry("NULL", b)?,
            Self::L(list) => map.serialize_entry("L", list)?,
            Self::M(m) => map.serialize_entry("M", m)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeValueVisitor)
    }
}

struct AttributeValueVisitor;

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an AttributeValue object with exactly one type key")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let Some(key) = map.next_key::<String>()? else {
            return Err(de::Error::custom(
                "AttributeValue must have exactly one key",
            ));
        };

        let value = match key.as_str() {
            "S" => AttributeValue::S(map.next_value()?),
            "N" => AttributeValue::N(map.next_value()?),
            "B" => {
                let encoded: String = map.next_value()?;
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(&encoded)
                    .map_err(de::Error::custom)?;
                AttributeValue::B(bytes::Bytes::from(decoded))
            }
            "BOOL" => AttributeValue::Bool(map.next_value()?),
            "NULL" => AttributeValue::Null(map.next_value()?),
            "L" => AttributeValue::L(map.next_value()?),
            "M" => AttributeValue::M(map.next_value()?),
            other => {
                return Err(de::Error::unknown_field(
                    other,
                    &["S", "N", "B", "BOOL", "NULL", "L", "M"],
                ));
            }
        };

        Ok(value)
    }
}
