//! Caller-supplied parameters.

use dynaschema_model::Item;
use serde_json::{Map, Value};

use crate::validate::{ValidationError, json_kind};

/// A JSON object of raw field values.
///
/// Parameters are what callers hand to `create`/`update` and what key and
/// derived-field functions read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    /// An empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key`, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Raw value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `key` as a string, if it is one.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// `self` overlaid with `overrides`; keys in `overrides` win.
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut out = self.0.clone();
        for (key, value) in &overrides.0 {
            out.insert(key.clone(), value.clone());
        }
        Self(out)
    }

    /// Parameters holding the JSON form of every attribute in `item`.
    #[must_use]
    pub fn from_item(item: &Item) -> Self {
        Self(
            item.iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }

    /// Parameters from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidType`] when `value` is not an object.
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        Self::try_from(value)
    }

    /// The parameters as a JSON object.
    #[must_use]
    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Params {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ValidationError::InvalidType {
                expected: "object",
                received: json_kind(&other),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
