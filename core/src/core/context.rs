// pipewright/src/core/context.rs

//! Defines `Context`, the open-ended per-request key/value container.
//!
//! Pipelines whose steps are known at compile time should use their own
//! struct as context data. `Context` covers the dynamic case: an
//! insertion-ordered map of JSON values with accessors that fail loudly on a
//! missing key or a value of the wrong shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
  #[error("Context key not found: {key}")]
  MissingKey { key: String },

  #[error("Context key '{key}' does not hold a {expected}. Source: {source}")]
  TypeMismatch {
    key: String,
    expected: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("Value for context key '{key}' could not be serialized. Source: {source}")]
  Unserializable {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
  entries: Map<String, Value>,
}

impl Context {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stores `value` under `key`, returning the previous value if any.
  pub fn insert<V: Serialize>(&mut self, key: impl Into<String>, value: V) -> Result<Option<Value>, ContextError> {
    let key = key.into();
    let value = serde_json::to_value(value).map_err(|source| ContextError::Unserializable {
      key: key.clone(),
      source,
    })?;
    Ok(self.entries.insert(key, value))
  }

  pub fn insert_value(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
    self.entries.insert(key.into(), value)
  }

  /// Reads `key` as a `V`. Missing keys and shape mismatches are errors, never defaults.
  pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<V, ContextError> {
    let value = self.require(key)?;
    V::deserialize(value).map_err(|source| ContextError::TypeMismatch {
      key: key.to_string(),
      expected: std::any::type_name::<V>(),
      source,
    })
  }

  /// Like [`get`](Context::get) but treats a missing key as `None`.
  pub fn get_opt<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, ContextError> {
    if self.entries.contains_key(key) {
      self.get(key).map(Some)
    } else {
      Ok(None)
    }
  }

  pub fn require(&self, key: &str) -> Result<&Value, ContextError> {
    self
      .entries
      .get(key)
      .ok_or_else(|| ContextError::MissingKey { key: key.to_string() })
  }

  pub fn get_value(&self, key: &str) -> Option<&Value> {
    self.entries.get(key)
  }

  pub fn get_value_mut(&mut self, key: &str) -> Option<&mut Value> {
    self.entries.get_mut(key)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.entries.remove(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &String> {
    self.entries.keys()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl From<Map<String, Value>> for Context {
  fn from(entries: Map<String, Value>) -> Self {
    Self { entries }
  }
}
