use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{Node, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
  /// `import { imported as local } from "..."`
  Named(String),
  /// `import local from "..."`
  Default,
  /// `import * as local from "..."`
  Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
  pub local: String,
  pub kind: ImportKind,
  pub source: String,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
  /// `export { local as exported }`, `export const exported = ...` or `export default`.
  Local { exported: String, local: String },
  /// `export { imported as exported } from "source"`
  ReExport {
    exported: String,
    imported: String,
    source: String,
  },
  /// `export * from "source"`
  All { source: String },
}

/// A place in the source where styles are applied (a `css` prop, a `css()` call, a
/// styled template). `input` is replaced by the compiled class names.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSite {
  pub span: Span,
  pub input: Node,
}

/// One compilation unit: a source file mapped into the internal node tree.
///
/// Only what the compiler needs is kept: top-level `const` bindings, the import and
/// export tables and the style sites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceUnit {
  pub path: PathBuf,
  pub source: String,
  pub imports: Vec<Import>,
  pub bindings: IndexMap<String, Node>,
  pub exports: Vec<Export>,
  pub style_sites: Vec<StyleSite>,
}

impl SourceUnit {
  pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      source: source.into(),
      ..Default::default()
    }
  }

  pub fn with_const(mut self, name: impl Into<String>, init: Node) -> Self {
    self.bindings.insert(name.into(), init);
    self
  }

  pub fn with_export_const(mut self, name: impl Into<String>, init: Node) -> Self {
    let name = name.into();
    self.exports.push(Export::Local {
      exported: name.clone(),
      local: name.clone(),
    });
    self.bindings.insert(name, init);
    self
  }

  pub fn with_export(mut self, export: Export) -> Self {
    self.exports.push(export);
    self
  }

  pub fn with_import(mut self, local: impl Into<String>, kind: ImportKind, source: impl Into<String>) -> Self {
    self.imports.push(Import {
      local: local.into(),
      kind,
      source: source.into(),
      span: Span::DUMMY,
    });
    self
  }

  pub fn with_style_site(mut self, span: Span, input: Node) -> Self {
    self.style_sites.push(StyleSite { span, input });
    self
  }

  /// Add a style site covering the first occurrence of `needle` in the source.
  pub fn with_style_site_at(self, needle: &str, input: Node) -> Self {
    let span = Span::find(&self.source, needle).unwrap_or(Span::DUMMY);
    let input = input.with_span(span);
    self.with_style_site(span, input)
  }

  pub fn import(&self, local: &str) -> Option<&Import> {
    self.imports.iter().find(|import| import.local == local)
  }

  pub fn display_path(&self) -> String {
    self.path.display().to_string()
  }
}

/// Maps import specifiers to other compilation units.
pub trait ModuleResolver: Send + Sync {
  fn resolve(&self, from: &SourceUnit, specifier: &str) -> Option<Arc<SourceUnit>>;
}

/// Resolves nothing; every import degrades to a runtime value.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

impl ModuleResolver for NoopResolver {
  fn resolve(&self, _from: &SourceUnit, _specifier: &str) -> Option<Arc<SourceUnit>> {
    None
  }
}

const EXTENSIONS: [&str; 4] = ["ts", "tsx", "js", "jsx"];

/// In-memory module graph keyed by path.
///
/// Relative specifiers are joined onto the importing unit's directory and tried as is,
/// with each known extension, then as a directory index. Bare specifiers match units
/// registered under exactly that name.
#[derive(Debug, Default, Clone)]
pub struct MemoryModuleGraph {
  units: HashMap<PathBuf, Arc<SourceUnit>>,
}

impl MemoryModuleGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, unit: SourceUnit) -> Arc<SourceUnit> {
    let unit = Arc::new(unit);
    self.units.insert(normalize(&unit.path), unit.clone());
    unit
  }

  pub fn get(&self, path: &Path) -> Option<Arc<SourceUnit>> {
    self.units.get(&normalize(path)).cloned()
  }

  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  fn lookup(&self, base: &Path) -> Option<Arc<SourceUnit>> {
    if let Some(unit) = self.get(base) {
      return Some(unit);
    }

    let file_name = base.file_name()?.to_string_lossy().to_string();
    for extension in EXTENSIONS {
      let candidate = base.with_file_name(format!("{file_name}.{extension}"));
      if let Some(unit) = self.get(&candidate) {
        return Some(unit);
      }
    }

    EXTENSIONS
      .iter()
      .find_map(|extension| self.get(&base.join(format!("index.{extension}"))))
  }
}

impl ModuleResolver for MemoryModuleGraph {
  fn resolve(&self, from: &SourceUnit, specifier: &str) -> Option<Arc<SourceUnit>> {
    let resolved = if specifier.starts_with("./") || specifier.starts_with("../") {
      let dir = from.path.parent().unwrap_or_else(|| Path::new(""));
      self.lookup(&dir.join(specifier))
    } else {
      self.lookup(Path::new(specifier))
    };

    if resolved.is_none() {
      tracing::debug!(
        from = %from.display_path(),
        specifier,
        "Module not found in graph"
      );
    }
    resolved
  }
}

fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        normalized.pop();
      }
      other => normalized.push(other.as_os_str()),
    }
  }
  normalized
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::str_lit;

  fn graph() -> MemoryModuleGraph {
    let mut graph = MemoryModuleGraph::new();
    graph.insert(SourceUnit::new("/src/tokens.ts", "").with_export_const("red", str_lit("red")));
    graph.insert(SourceUnit::new("/src/theme/index.js", ""));
    graph.insert(SourceUnit::new("@design/tokens", ""));
    graph
  }

  #[test]
  fn resolves_relative_specifiers() {
    let graph = graph();
    let from = SourceUnit::new("/src/components/button.tsx", "");

    let tokens = graph.resolve(&from, "../tokens").unwrap();
    assert_eq!(tokens.path, PathBuf::from("/src/tokens.ts"));

    let theme = graph.resolve(&from, "../theme").unwrap();
    assert_eq!(theme.path, PathBuf::from("/src/theme/index.js"));

    assert!(graph.resolve(&from, "./missing").is_none());
  }

  #[test]
  fn resolves_bare_specifiers() {
    let graph = graph();
    let from = SourceUnit::new("/src/app.tsx", "");
    assert!(graph.resolve(&from, "@design/tokens").is_some());
    assert!(graph.resolve(&from, "react").is_none());
  }

  #[test]
  fn style_site_spans_follow_source() {
    let unit = SourceUnit::new("/a.tsx", "<div css={styles} />")
      .with_style_site_at("styles", crate::ast::ident("styles"));
    let site = &unit.style_sites[0];
    assert_eq!(site.span.slice(&unit.source), Some("styles"));
  }
}
