use std::path::Path;

use anyhow::Context;
use compiled_atomic_runtime::CompressionMap;
use serde::Deserialize;

use crate::sheet::{RenderOptions, SortOptions};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
  ///
  /// Leave rules out of the transformed source so they can be aggregated into a single
  /// stylesheet with `Compiler::extract`.
  ///
  /// Defaults to `false`
  ///
  pub extract: bool,
  ///
  /// Prepend an import of the runtime helpers to units that contain style sites.
  ///
  /// Defaults to `true`
  ///
  pub import_framework_runtime: bool,
  ///
  /// Security nonce passed along with the runtime stylesheet rules.
  ///
  /// Defaults to `None`
  ///
  pub nonce: Option<String>,
  ///
  /// Table replacing atomic class names with shorter tokens.
  ///
  /// Defaults to `None`
  ///
  pub class_name_compression_map: Option<CompressionMap>,
  ///
  /// Whether to sort at-rules, including media queries, by name and condition.
  /// Source order is kept otherwise.
  ///
  /// Defaults to `false`
  pub sort_at_rules: bool,
  ///
  /// Emit shorthand properties before the longhands they cover, so a longhand always
  /// wins over its shorthand.
  ///
  /// Defaults to `true`
  pub sort_shorthand: bool,
  ///
  /// Increases the specificity of all generated rules.
  /// Generally you would only use this for migration purposes when mixing two or more styling
  /// solutions.
  ///
  /// Defaults to `false`
  pub increase_specificity: bool,
  ///
  /// Adds a defined prefix to the generated classes' hashes.
  /// Useful in micro frontend environments to avoid clashing/specificity issues.
  /// Must be a valid CSS identifier.
  ///
  /// Defaults to `None`
  ///
  pub class_hash_prefix: Option<String>,
  ///
  /// Namespace separating entries of a shared rule group cache.
  ///
  /// Defaults to `None`
  ///
  pub cache_namespace: Option<String>,
  ///
  /// Reuse rule groups of identical declaration trees.
  ///
  /// Defaults to `true`.
  pub cache: bool,
}

impl Default for CompileOptions {
  fn default() -> Self {
    Self {
      cache: true,
      cache_namespace: None,
      class_hash_prefix: None,
      class_name_compression_map: None,
      extract: false,
      import_framework_runtime: true,
      increase_specificity: false,
      nonce: None,
      sort_at_rules: false,
      sort_shorthand: true,
    }
  }
}

impl CompileOptions {
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  pub fn from_path(path: &Path) -> anyhow::Result<Self> {
    let contents = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read compile options {}", path.display()))?;

    Self::from_json(&contents)
      .with_context(|| format!("Failed to parse compile options {}", path.display()))
  }

  pub fn sort_options(&self) -> SortOptions {
    SortOptions {
      sort_at_rules: self.sort_at_rules,
      sort_shorthand: self.sort_shorthand,
    }
  }

  pub fn render_options(&self) -> RenderOptions<'_> {
    RenderOptions {
      increase_specificity: self.increase_specificity,
      compression: self.class_name_compression_map.as_ref(),
    }
  }
}
