use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::class_name::{is_atomic_class_name, is_css_identifier, ATOMIC_GROUP_LENGTH};

#[derive(Debug, thiserror::Error)]
pub enum CompressionMapError {
  #[error("compression map is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("compression map must be a flat JSON object, found {0}")]
  NotAnObject(&'static str),
}

/// An entry of a supplied compression map that was ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidCompressionEntry {
  pub key: String,
  pub value: String,
  pub reason: &'static str,
}

/// Externally supplied table shortening canonical class names.
///
/// Keys are canonical class names without the leading `_` (`syaz5scu`), values are the
/// replacement tokens (`a`). The map is read-only for the duration of a compilation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
  from = "BTreeMap<String, String>",
  into = "BTreeMap<String, String>"
)]
pub struct CompressionMap {
  entries: BTreeMap<String, String>,
  invalid: Vec<InvalidCompressionEntry>,
}

impl From<BTreeMap<String, String>> for CompressionMap {
  fn from(entries: BTreeMap<String, String>) -> Self {
    Self::from_entries(entries)
  }
}

impl From<CompressionMap> for BTreeMap<String, String> {
  fn from(map: CompressionMap) -> Self {
    map.entries
  }
}

impl CompressionMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a map from key/value pairs. Entries whose key is not a canonical class name,
  /// or whose value is not a valid CSS identifier, are dropped and kept aside in
  /// [`CompressionMap::invalid_entries`].
  pub fn from_entries<I, K, V>(entries: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let mut map = Self::default();
    for (key, value) in entries {
      map.insert_checked(key.into(), value.into());
    }
    map
  }

  pub fn from_json(json: &str) -> Result<Self, CompressionMapError> {
    let value: Value = serde_json::from_str(json)?;
    let object = match value {
      Value::Object(object) => object,
      other => return Err(CompressionMapError::NotAnObject(json_kind(&other))),
    };

    let mut map = Self::default();
    for (key, value) in object {
      match value {
        Value::String(token) => map.insert_checked(key, token),
        other => map.reject(key, other.to_string(), "value is not a string"),
      }
    }

    Ok(map)
  }

  pub fn from_path(path: &Path) -> anyhow::Result<Self> {
    let contents = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read compression map {}", path.display()))?;

    Self::from_json(&contents)
      .with_context(|| format!("Failed to parse compression map {}", path.display()))
  }

  /// Compressed token for a canonical class name given with or without the leading `_`.
  pub fn get(&self, class_name: &str) -> Option<&str> {
    let key = class_name.strip_prefix('_').unwrap_or(class_name);
    self.entries.get(key).map(String::as_str)
  }

  /// Runtime form of a compressed class, `_gggg_token`, keeping the slot for `ax`.
  pub fn compress(&self, class_name: &str) -> Option<String> {
    if !is_atomic_class_name(class_name) {
      return None;
    }

    self
      .get(class_name)
      .map(|token| format!("{}_{}", &class_name[..ATOMIC_GROUP_LENGTH], token))
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn invalid_entries(&self) -> &[InvalidCompressionEntry] {
    &self.invalid
  }

  fn insert_checked(&mut self, key: String, value: String) {
    if !is_atomic_class_name(&format!("_{key}")) {
      self.reject(key, value, "key is not an atomic class name");
    } else if !is_css_identifier(&value) {
      self.reject(key, value, "value is not a valid CSS identifier");
    } else {
      self.entries.insert(key, value);
    }
  }

  fn reject(&mut self, key: String, value: String, reason: &'static str) {
    tracing::warn!(%key, %value, reason, "Ignoring compression map entry");
    self.invalid.push(InvalidCompressionEntry { key, value, reason });
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
