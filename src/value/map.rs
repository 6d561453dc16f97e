use super::{FromValue, Value};
use crate::error::{ContextError, FlowError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A string-keyed map of dynamically-typed values.
///
/// The same structure backs both the shared run state (`Context`) and the
/// per-node configuration (`Params`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueMap {
    entries: AHashMap<String, Value>,
}

/// The single mutable key/value store shared across an entire flow run.
pub type Context = ValueMap;

/// Per-node configuration, assigned by the orchestrator before each node runs.
pub type Params = ValueMap;

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a flat JSON object into a map.
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        serde_json::from_str(json)
            .map_err(|e| FlowError::InvalidConfig(format!("Failed to parse value map JSON: {}", e)))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Reads `key` as a concrete type, distinguishing a missing key from a value
    /// of the wrong kind.
    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T, ContextError> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| ContextError::MissingKey {
                key: key.to_string(),
            })?;
        T::from_value(value).ok_or_else(|| ContextError::WrongKind {
            key: key.to_string(),
            expected: T::KIND,
            found: value.kind(),
        })
    }

    /// Reads `key` as a concrete type, falling back to `default` when the key is
    /// absent or holds another kind. The latter case is logged.
    pub fn get_or<T: FromValue>(&self, key: &str, default: T) -> T {
        match self.get_as(key) {
            Ok(value) => value,
            Err(ContextError::MissingKey { .. }) => default,
            Err(e) => {
                warn!(key, error = %e, "Falling back to default for mistyped value");
                default
            }
        }
    }

    /// Inserts a value, returning the previous one under that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
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

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Returns a new map holding `self` overlaid with `overrides`.
    /// Keys present in both take the value from `overrides`.
    pub fn overlay(&self, overrides: &ValueMap) -> ValueMap {
        let mut merged = self.clone();
        for (key, value) in &overrides.entries {
            merged.entries.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for ValueMap {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}
