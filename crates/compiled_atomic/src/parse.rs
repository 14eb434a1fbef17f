//! Style parsing: object entries and CSS text into a declaration tree.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::ast::Span;
use crate::errors::CompileError;
use crate::evaluate::{number_to_string, DynamicRef, Value};
use crate::input::{EntryValue, StyleEntry};
use crate::shorthand::collapse_whitespace;

const SLOT_PREFIX: &str = "__CMPLD_SLOT_";
const SLOT_SUFFIX: &str = "__";

/// Marker standing in for a dynamic interpolation inside CSS text.
pub fn slot_placeholder(index: usize) -> String {
  format!("{SLOT_PREFIX}{index}{SLOT_SUFFIX}")
}

/// Properties whose numeric values are not given a `px` unit.
static UNITLESS_PROPERTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  [
    "animation-iteration-count",
    "aspect-ratio",
    "border-image-outset",
    "border-image-slice",
    "border-image-width",
    "box-flex",
    "box-flex-group",
    "box-ordinal-group",
    "column-count",
    "columns",
    "fill-opacity",
    "flex",
    "flex-grow",
    "flex-negative",
    "flex-order",
    "flex-positive",
    "flex-shrink",
    "flood-opacity",
    "font-weight",
    "grid-area",
    "grid-column",
    "grid-column-end",
    "grid-column-span",
    "grid-column-start",
    "grid-row",
    "grid-row-end",
    "grid-row-span",
    "grid-row-start",
    "line-clamp",
    "line-height",
    "opacity",
    "order",
    "orphans",
    "scale",
    "stop-opacity",
    "stroke-dasharray",
    "stroke-dashoffset",
    "stroke-miterlimit",
    "stroke-opacity",
    "stroke-width",
    "tab-size",
    "widows",
    "z-index",
    "zoom",
  ]
  .into_iter()
  .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValuePart {
  Text(String),
  Dynamic(DynamicRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
  pub property: String,
  pub value: Vec<ValuePart>,
  pub important: bool,
}

impl Declaration {
  /// Builds a declaration, splitting a trailing `!important` off the value.
  pub fn new(property: impl Into<String>, mut value: Vec<ValuePart>) -> Self {
    let mut important = false;
    if let Some(ValuePart::Text(last)) = value.last_mut() {
      let (text, is_important) = split_important(last);
      important = is_important;
      *last = text;
    }
    value.retain(|part| !matches!(part, ValuePart::Text(text) if text.is_empty()));

    Self {
      property: property.into(),
      value,
      important,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockItem {
  Declaration(Declaration),
  /// Nested rule. Each selector is one entry of a flattened selector list.
  Rule { selectors: Vec<String>, block: Block },
  AtRule {
    name: String,
    params: String,
    block: Block,
  },
}

/// Declarations, nested rules and at-rules in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Block {
  pub items: Vec<BlockItem>,
}

impl Block {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn extend(&mut self, other: Block) {
    self.items.extend(other.items);
  }
}

/// Kebab-case a style object key: `backgroundColor` becomes `background-color` and
/// vendor prefixes (`WebkitTransition`, `msFlex`) gain their leading dash. Custom
/// properties are kept as written.
pub fn property_name(key: &str) -> String {
  if key.starts_with("--") {
    return key.to_string();
  }

  let mut name = String::with_capacity(key.len() + 4);
  if key.starts_with("ms") && key[2..].starts_with(|c: char| c.is_ascii_uppercase()) {
    name.push('-');
  }
  for (index, c) in key.chars().enumerate() {
    if c.is_ascii_uppercase() {
      if index > 0 || matches!(key.get(..6), Some("Webkit")) || key.starts_with("Moz") {
        name.push('-');
      }
      name.push(c.to_ascii_lowercase());
    } else {
      name.push(c);
    }
  }
  name
}

pub fn is_unitless(property: &str) -> bool {
  property.starts_with("--") || UNITLESS_PROPERTIES.contains(property)
}

/// True when an object key addresses a nested selector rather than a property.
pub fn is_selector_key(key: &str) -> bool {
  key.contains('&')
    || key.contains(',')
    || key.contains(char::is_whitespace)
    || key.starts_with([':', '[', '>', '+', '~', '*', '.', '#'])
}

/// Text of a scalar style value. `None` drops the declaration.
pub fn format_scalar(property: &str, value: &Value) -> Result<Option<String>, &'static str> {
  match value {
    Value::Undefined | Value::Null | Value::Bool(false) => Ok(None),
    Value::Str(text) if text.trim().is_empty() => Ok(None),
    Value::Str(text) => Ok(Some(text.clone())),
    Value::Num(n) if *n == 0.0 || is_unitless(property) => Ok(Some(number_to_string(*n))),
    Value::Num(n) => Ok(Some(format!("{}px", number_to_string(*n)))),
    Value::Bool(true) => Err("`true` is not a valid style value"),
    Value::Array(_) => Err("arrays are not valid style values"),
    Value::Object(_) => Err("objects are only valid for selector and at-rule keys"),
    Value::Function(_) | Value::Module(_) => Err("unsupported style value"),
  }
}

/// Split `!important` off the end of a value.
pub fn split_important(value: &str) -> (String, bool) {
  let trimmed = value.trim_end();
  let lower = trimmed.to_ascii_lowercase();
  if let Some(without) = lower.strip_suffix("important") {
    let without = without.trim_end();
    if let Some(bang) = without.strip_suffix('!') {
      return (trimmed[..bang.len()].trim_end().to_string(), true);
    }
  }
  (value.to_string(), false)
}

/// `@media (min-width: 30rem)` into `("media", "(min-width: 30rem)")`.
pub fn split_at_rule(prelude: &str) -> (String, String) {
  let prelude = prelude.trim().trim_start_matches('@');
  let end = prelude
    .find(|c: char| c.is_whitespace() || c == '(')
    .unwrap_or(prelude.len());

  let name = prelude[..end].to_ascii_lowercase();
  let params = collapse_whitespace(&prelude[end..]);
  (name, params)
}

/// Split a selector list on top-level commas.
pub fn split_selector_list(selectors: &str) -> Vec<String> {
  let mut parts = Vec::new();
  let mut depth = 0i32;
  let mut quote: Option<char> = None;
  let mut start = 0;

  for (index, c) in selectors.char_indices() {
    match (quote, c) {
      (Some(q), c) if c == q => quote = None,
      (Some(_), _) => {}
      (None, '"' | '\'') => quote = Some(c),
      (None, '(' | '[') => depth += 1,
      (None, ')' | ']') => depth -= 1,
      (None, ',') if depth == 0 => {
        parts.push(selectors[start..index].trim().to_string());
        start = index + 1;
      }
      _ => {}
    }
  }
  parts.push(selectors[start..].trim().to_string());
  parts.retain(|part| !part.is_empty());
  parts
}

/// Declaration tree of a style object.
pub fn block_from_entries(entries: &[StyleEntry]) -> Result<Block, CompileError> {
  let mut block = Block::new();

  for entry in entries {
    let key = entry.key.trim();
    match &entry.value {
      EntryValue::Block(children) if key.starts_with('@') => {
        let (name, params) = split_at_rule(key);
        block.items.push(BlockItem::AtRule {
          name,
          params,
          block: block_from_entries(children)?,
        });
      }
      EntryValue::Block(children) => {
        block.items.push(BlockItem::Rule {
          selectors: split_selector_list(key),
          block: block_from_entries(children)?,
        });
      }
      _ if key.starts_with('@') || is_selector_key(key) => {
        return Err(CompileError::unsupported(
          format!("`{key}` needs an object value"),
          entry.span,
        ));
      }
      EntryValue::Scalar(value) => {
        let property = property_name(key);
        let text = format_scalar(&property, value)
          .map_err(|message| CompileError::unsupported(format!("{message} (`{key}`)"), entry.span))?;
        if let Some(text) = text {
          block.items.push(BlockItem::Declaration(Declaration::new(
            property,
            vec![ValuePart::Text(text)],
          )));
        }
      }
      EntryValue::Interpolated(parts) => {
        block.items.push(BlockItem::Declaration(Declaration::new(
          property_name(key),
          parts.clone(),
        )));
      }
    }
  }

  Ok(block)
}

/// Parse CSS text. Dynamic interpolations appear as [`slot_placeholder`] markers that
/// index into `slots`, and are only accepted in declaration values.
pub fn parse_css(text: &str, slots: &[DynamicRef], span: Span) -> Result<Block, CompileError> {
  let mut parser = CssParser {
    text,
    bytes: text.as_bytes(),
    pos: 0,
    slots,
    span,
  };
  parser.block(false)
}

struct CssParser<'a> {
  text: &'a str,
  bytes: &'a [u8],
  pos: usize,
  slots: &'a [DynamicRef],
  span: Span,
}

enum Terminator {
  Semicolon,
  Open,
  Close,
  End,
}

impl<'a> CssParser<'a> {
  fn error(&self, message: impl Into<String>, offset: usize) -> CompileError {
    CompileError::syntax(message, self.text, offset, self.span)
  }

  fn block(&mut self, nested: bool) -> Result<Block, CompileError> {
    let open = self.pos.saturating_sub(1);
    let mut block = Block::new();

    loop {
      self.skip_trivia()?;
      match self.bytes.get(self.pos) {
        None if nested => return Err(self.error("unclosed block", open)),
        None => return Ok(block),
        Some(b'}') if nested => {
          self.pos += 1;
          return Ok(block);
        }
        Some(b'}') => return Err(self.error("unexpected `}`", self.pos)),
        Some(b';') => {
          self.pos += 1;
          continue;
        }
        Some(_) => {}
      }

      let start = self.pos;
      let terminator = self.scan_prelude()?;
      self.pos = self.pos.min(self.bytes.len());
      let prelude = strip_comments(&self.text[start..self.pos]);
      let prelude = prelude.trim();

      match terminator {
        Terminator::Open => {
          if prelude.is_empty() {
            return Err(self.error("expected a selector before `{`", start));
          }
          if prelude.contains(SLOT_PREFIX) {
            return Err(self.error(
              "interpolations are only allowed in declaration values",
              start,
            ));
          }
          self.pos += 1;
          let inner = self.block(true)?;

          if prelude.starts_with('@') {
            let (name, params) = split_at_rule(prelude);
            block.items.push(BlockItem::AtRule {
              name,
              params,
              block: inner,
            });
          } else {
            block.items.push(BlockItem::Rule {
              selectors: split_selector_list(prelude),
              block: inner,
            });
          }
        }
        terminator => {
          if prelude.starts_with('@') {
            return Err(self.error(format!("unsupported at-rule `{prelude}`"), start));
          }
          block
            .items
            .push(BlockItem::Declaration(self.declaration(prelude, start)?));
          if matches!(terminator, Terminator::Semicolon) {
            self.pos += 1;
          }
        }
      }
    }
  }

  fn declaration(&self, text: &str, start: usize) -> Result<Declaration, CompileError> {
    let Some(colon) = find_top_level(text, ':') else {
      return Err(self.error(format!("expected `:` in `{text}`"), start));
    };

    let property = text[..colon].trim();
    let value = collapse_whitespace(&text[colon + 1..]);

    if property.is_empty() {
      return Err(self.error("expected a property name", start));
    }
    if property.contains(SLOT_PREFIX) {
      return Err(self.error(
        "interpolations are only allowed in declaration values",
        start,
      ));
    }
    if value.is_empty() {
      return Err(self.error(format!("empty value for `{property}`"), start));
    }

    let property = if property.starts_with("--") {
      property.to_string()
    } else {
      property.to_ascii_lowercase()
    };

    Ok(Declaration::new(property, self.value_parts(&value, start)?))
  }

  fn value_parts(&self, value: &str, start: usize) -> Result<Vec<ValuePart>, CompileError> {
    let mut parts = Vec::new();
    let mut rest = value;

    while let Some(found) = rest.find(SLOT_PREFIX) {
      if found > 0 {
        parts.push(ValuePart::Text(rest[..found].to_string()));
      }
      let after = &rest[found + SLOT_PREFIX.len()..];
      let digits = after
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after.len());
      let slot = after[..digits]
        .parse::<usize>()
        .ok()
        .and_then(|index| self.slots.get(index))
        .filter(|_| after[digits..].starts_with(SLOT_SUFFIX))
        .ok_or_else(|| self.error("invalid interpolation marker", start))?;

      parts.push(ValuePart::Dynamic(slot.clone()));
      rest = &after[digits + SLOT_SUFFIX.len()..];
    }

    if !rest.is_empty() {
      parts.push(ValuePart::Text(rest.to_string()));
    }
    Ok(parts)
  }

  fn skip_trivia(&mut self) -> Result<(), CompileError> {
    loop {
      while self
        .bytes
        .get(self.pos)
        .is_some_and(|b| b.is_ascii_whitespace())
      {
        self.pos += 1;
      }
      if self
        .bytes
        .get(self.pos..)
        .is_some_and(|rest| rest.starts_with(b"/*"))
      {
        self.skip_comment()?;
      } else {
        return Ok(());
      }
    }
  }

  fn skip_comment(&mut self) -> Result<(), CompileError> {
    match self.text[self.pos + 2..].find("*/") {
      Some(end) => {
        self.pos += end + 4;
        Ok(())
      }
      None => Err(self.error("unterminated comment", self.pos)),
    }
  }

  /// Advance to the `;`, `{` or `}` ending the current prelude.
  fn scan_prelude(&mut self) -> Result<Terminator, CompileError> {
    let mut parens = 0i32;

    while let Some(&byte) = self.bytes.get(self.pos) {
      match byte {
        b'"' | b'\'' => {
          self.skip_string(byte)?;
          continue;
        }
        b'\\' => {
          self.pos += 2;
          continue;
        }
        b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => {
          self.skip_comment()?;
          continue;
        }
        b'(' | b'[' => parens += 1,
        b')' | b']' => {
          parens -= 1;
          if parens < 0 {
            return Err(self.error(format!("unexpected `{}`", byte as char), self.pos));
          }
        }
        b';' if parens == 0 => return Ok(Terminator::Semicolon),
        b'{' if parens == 0 => return Ok(Terminator::Open),
        b'}' if parens == 0 => return Ok(Terminator::Close),
        _ => {}
      }
      self.pos += 1;
    }

    if parens > 0 {
      return Err(self.error("unclosed parenthesis", self.pos));
    }
    Ok(Terminator::End)
  }

  fn skip_string(&mut self, quote: u8) -> Result<(), CompileError> {
    let start = self.pos;
    self.pos += 1;
    while let Some(&byte) = self.bytes.get(self.pos) {
      match byte {
        b'\\' => self.pos += 2,
        b'\n' => break,
        b if b == quote => {
          self.pos += 1;
          return Ok(());
        }
        _ => self.pos += 1,
      }
    }
    Err(self.error("unterminated string", start))
  }
}

fn find_top_level(text: &str, needle: char) -> Option<usize> {
  let mut depth = 0i32;
  let mut quote: Option<char> = None;
  for (index, c) in text.char_indices() {
    match (quote, c) {
      (Some(q), c) if c == q => quote = None,
      (Some(_), _) => {}
      (None, '"' | '\'') => quote = Some(c),
      (None, '(' | '[') => depth += 1,
      (None, ')' | ']') => depth -= 1,
      (None, c) if c == needle && depth == 0 => return Some(index),
      _ => {}
    }
  }
  None
}

fn strip_comments(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  while let Some(start) = rest.find("/*") {
    out.push_str(&rest[..start]);
    match rest[start + 2..].find("*/") {
      Some(end) => rest = &rest[start + 2 + end + 2..],
      None => {
        rest = "";
      }
    }
  }
  out.push_str(rest);
  out
}
