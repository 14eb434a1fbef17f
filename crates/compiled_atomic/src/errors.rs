use compiled_atomic_runtime::InvalidCompressionEntry;
use serde::Serialize;

use crate::ast::Span;

/// Failure that aborts compilation of a unit. The unit's source is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CompileError {
  /// Malformed style text. `line` and `column` are 1-based and relative to the style
  /// text; `span` locates the style expression in the unit.
  #[error("{message} at {line}:{column}")]
  Syntax {
    message: String,
    span: Span,
    line: usize,
    column: usize,
  },
  #[error("`{local}` from `{specifier}` could not be resolved; selector keys must be statically known")]
  UnresolvableImport {
    specifier: String,
    local: String,
    span: Span,
  },
  #[error("selector keys must be statically known")]
  DynamicSelectorKey { span: Span },
  #[error("{message}")]
  Unsupported { message: String, span: Span },
  #[error("class hash prefix `{prefix}` is not a valid CSS identifier")]
  InvalidClassHashPrefix { prefix: String },
}

impl CompileError {
  /// Syntax error at byte `offset` of `text`.
  pub fn syntax(message: impl Into<String>, text: &str, offset: usize, span: Span) -> Self {
    let (line, column) = line_column(text, offset);
    CompileError::Syntax {
      message: message.into(),
      span,
      line,
      column,
    }
  }

  pub fn unsupported(message: impl Into<String>, span: Span) -> Self {
    CompileError::Unsupported {
      message: message.into(),
      span,
    }
  }
}

/// Problems that were worked around.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CompileWarning {
  #[error("ignored compression map entry `{}`: {}", .0.key, .0.reason)]
  InvalidCompressionEntry(InvalidCompressionEntry),
  #[error("`{local}` from `{specifier}` could not be resolved and is applied at runtime")]
  DegradedImport {
    specifier: String,
    local: String,
    span: Span,
  },
}

fn line_column(text: &str, offset: usize) -> (usize, usize) {
  let mut offset = offset.min(text.len());
  while !text.is_char_boundary(offset) {
    offset -= 1;
  }

  let before = &text[..offset];
  let line = before.matches('\n').count() + 1;
  let column = match before.rfind('\n') {
    Some(newline) => before[newline + 1..].chars().count() + 1,
    None => before.chars().count() + 1,
  };
  (line, column)
}
