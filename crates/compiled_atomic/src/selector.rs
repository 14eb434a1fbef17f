//! Selector contexts of atomic rules.
//!
//! Selectors are kept relative to the styled element, which `&` stands for. Nesting
//! substitutes the parent for `&`, selectors without `&` become descendants of the
//! parent, and orphaned pseudo selectors (`:hover`) attach to the parent (`&:hover`).

use compiled_atomic_runtime::Bucket;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AtRuleWrapper {
  pub name: String,
  pub params: String,
}

impl AtRuleWrapper {
  pub fn new(name: impl Into<String>, params: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      params: params.into(),
    }
  }

  /// `@media (min-width: 30rem)`
  pub fn prelude(&self) -> String {
    if self.params.is_empty() {
      format!("@{}", self.name)
    } else {
      format!("@{} {}", self.name, self.params)
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Combinator {
  Descendant,
  Child,
  Adjacent,
  GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorContext {
  pub at_rules: Vec<AtRuleWrapper>,
  /// Normalized selector with `&` for the styled element.
  pub selector: String,
  /// Trailing pseudo-class or pseudo-element of the selector.
  pub pseudo: Option<String>,
  /// Last combinator of the selector.
  pub combinator: Option<Combinator>,
}

impl SelectorContext {
  pub fn new(at_rules: Vec<AtRuleWrapper>, selector: &str) -> Self {
    let selector = normalize(selector);
    Self {
      pseudo: trailing_pseudo(&selector),
      combinator: last_combinator(&selector),
      at_rules,
      selector,
    }
  }

  pub fn root() -> Self {
    Self::new(Vec::new(), "&")
  }

  /// The at-rule part of the class name seed: `undefined` for unwrapped rules,
  /// otherwise every wrapper's name and params concatenated.
  pub fn at_rule_label(&self) -> String {
    if self.at_rules.is_empty() {
      return "undefined".to_string();
    }

    self
      .at_rules
      .iter()
      .map(|at_rule| format!("{}{}", at_rule.name, at_rule.params))
      .collect()
  }

  pub fn bucket(&self) -> Bucket {
    Bucket::from_selector(&self.selector)
  }

  pub fn has_nested_selector(&self) -> bool {
    self.combinator.is_some()
  }

  /// The selector with `&` replaced by `class_selector` (e.g. `._syaz5scu`).
  pub fn render(&self, class_selector: &str) -> String {
    let mut out = String::with_capacity(self.selector.len() + class_selector.len());
    let mut quote: Option<char> = None;

    for c in self.selector.chars() {
      match (quote, c) {
        (Some(q), c) if c == q => {
          quote = None;
          out.push(c);
        }
        (None, '"' | '\'') => {
          quote = Some(c);
          out.push(c);
        }
        (None, '&') => out.push_str(class_selector),
        _ => out.push(c),
      }
    }
    out
  }
}

/// Selector `child` nested inside the resolved `parent`.
pub fn nest(parent: &str, child: &str) -> String {
  let child = normalize(child);

  if contains_self_reference(&child) {
    replace_self_reference(&child, parent)
  } else if child.starts_with(':') {
    format!("{parent}{child}")
  } else if child.starts_with(['>', '+', '~']) {
    format!("{parent}{child}")
  } else {
    format!("{parent} {child}")
  }
}

/// Collapse whitespace and drop the spaces around `>`, `+` and `~` combinators. Text
/// inside brackets, parentheses and strings is kept as written.
pub fn normalize(selector: &str) -> String {
  let mut out = String::with_capacity(selector.len());
  let mut depth = 0i32;
  let mut quote: Option<char> = None;
  let mut pending_space = false;
  let mut after_combinator = false;

  for c in selector.trim().chars() {
    if let Some(q) = quote {
      out.push(c);
      if c == q {
        quote = None;
      }
      continue;
    }

    if depth > 0 {
      match c {
        '(' | '[' => depth += 1,
        ')' | ']' => depth -= 1,
        '"' | '\'' => quote = Some(c),
        _ => {}
      }
      out.push(c);
      continue;
    }

    match c {
      c if c.is_whitespace() => pending_space = true,
      '>' | '+' | '~' => {
        out.push(c);
        pending_space = false;
        after_combinator = true;
      }
      c => {
        if pending_space && !after_combinator && !out.is_empty() {
          out.push(' ');
        }
        pending_space = false;
        after_combinator = false;
        match c {
          '(' | '[' => depth += 1,
          '"' | '\'' => quote = Some(c),
          _ => {}
        }
        out.push(c);
      }
    }
  }

  out
}

fn contains_self_reference(selector: &str) -> bool {
  top_level_chars(selector).any(|(_, c)| c == '&')
}

fn replace_self_reference(selector: &str, parent: &str) -> String {
  let mut out = String::new();
  let mut last = 0;
  for (index, c) in top_level_chars(selector) {
    if c == '&' {
      out.push_str(&selector[last..index]);
      out.push_str(parent);
      last = index + 1;
    }
  }
  out.push_str(&selector[last..]);
  out
}

/// Characters outside brackets, parentheses and strings, with their byte offsets.
fn top_level_chars(selector: &str) -> impl Iterator<Item = (usize, char)> + '_ {
  let mut depth = 0i32;
  let mut quote: Option<char> = None;

  selector.char_indices().filter(move |&(_, c)| {
    if let Some(q) = quote {
      if c == q {
        quote = None;
      }
      return false;
    }
    match c {
      '"' | '\'' => {
        quote = Some(c);
        false
      }
      '(' | '[' => {
        depth += 1;
        false
      }
      ')' | ']' => {
        depth -= 1;
        false
      }
      _ => depth == 0,
    }
  })
}

fn trailing_pseudo(selector: &str) -> Option<String> {
  let compound_start = top_level_chars(selector)
    .filter(|(_, c)| matches!(c, ' ' | '>' | '+' | '~'))
    .map(|(index, c)| index + c.len_utf8())
    .last()
    .unwrap_or(0);

  let compound = &selector[compound_start..];
  let colon = top_level_chars(compound)
    .filter(|(_, c)| *c == ':')
    .map(|(index, _)| index)
    .last()?;

  let start = if colon > 0 && compound.as_bytes()[colon - 1] == b':' {
    colon - 1
  } else {
    colon
  };
  Some(compound[start..].to_string())
}

fn last_combinator(selector: &str) -> Option<Combinator> {
  top_level_chars(selector)
    .filter_map(|(_, c)| match c {
      ' ' => Some(Combinator::Descendant),
      '>' => Some(Combinator::Child),
      '+' => Some(Combinator::Adjacent),
      '~' => Some(Combinator::GeneralSibling),
      _ => None,
    })
    .last()
}
