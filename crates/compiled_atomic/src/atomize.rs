//! Atomization: a declaration tree becomes one atomic rule per declaration.

use compiled_atomic_runtime::{Bucket, CompressionMap};
use indexmap::IndexMap;
use serde::Serialize;

use crate::evaluate::SourceRef;
use crate::hash::{hash, hash_token};
use crate::parse::{Block, BlockItem, Declaration, ValuePart};
use crate::selector::{nest, AtRuleWrapper, SelectorContext};
use crate::shorthand::{canonical_value, expand, reorder_line_value};
use crate::sheet::RenderOptions;

/// Appended after each generated class when specificity is increased.
pub const INCREASE_SPECIFICITY_SELECTOR: &str = ":not(#\\#)";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicRule {
  pub context: SelectorContext,
  pub property: String,
  pub value: String,
  pub important: bool,
  pub bucket: Bucket,
  pub class_name: String,
}

impl AtomicRule {
  /// `color:red` or `color:red!important`.
  pub fn declaration(&self) -> String {
    if self.important {
      format!("{}:{}!important", self.property, self.value)
    } else {
      format!("{}:{}", self.property, self.value)
    }
  }

  /// Class name used in the stylesheet: the compressed token when the map has one.
  pub fn css_class<'a>(&'a self, compression: Option<&'a CompressionMap>) -> &'a str {
    compression
      .and_then(|map| map.get(&self.class_name))
      .unwrap_or(&self.class_name)
  }

  /// Class name placed on the element.
  pub fn runtime_class(&self, compression: Option<&CompressionMap>) -> String {
    compression
      .and_then(|map| map.compress(&self.class_name))
      .unwrap_or_else(|| self.class_name.clone())
  }

  pub fn selector(&self, options: &RenderOptions) -> String {
    let mut class_selector = format!(".{}", self.css_class(options.compression));
    if options.increase_specificity {
      class_selector.push_str(INCREASE_SPECIFICITY_SELECTOR);
    }
    self.context.render(&class_selector)
  }

  /// Rule text without its at-rule wrappers.
  pub fn rule_text(&self, options: &RenderOptions) -> String {
    format!("{}{{{}}}", self.selector(options), self.declaration())
  }

  /// Self-contained rule text including at-rule wrappers.
  pub fn to_css(&self, options: &RenderOptions) -> String {
    self
      .context
      .at_rules
      .iter()
      .rev()
      .fold(self.rule_text(options), |css, at_rule| {
        format!("{}{{{css}}}", at_rule.prelude())
      })
  }

  pub fn uses_variable(&self) -> bool {
    self.value.contains("var(--_")
  }

  pub fn has_inline_image(&self) -> bool {
    ["url(data:", "url(\"data:", "url('data:"]
      .iter()
      .any(|pattern| self.value.contains(pattern))
  }
}

/// Custom property the host sets on the element to the runtime value of `expression`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CssVariable {
  pub name: String,
  pub expression: SourceRef,
  pub prefix: String,
  pub suffix: String,
}

/// Atomic rules of one style declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroup {
  pub rules: Vec<AtomicRule>,
  pub variables: Vec<CssVariable>,
  pub group_hash: String,
}

impl RuleGroup {
  pub fn new(rules: Vec<AtomicRule>, variables: Vec<CssVariable>) -> Self {
    let group_hash = hash(
      &rules
        .iter()
        .map(|rule| rule.class_name.as_str())
        .collect::<Vec<_>>()
        .join(" "),
    );
    Self {
      rules,
      variables,
      group_hash,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  pub fn class_names(&self) -> Vec<&str> {
    self.rules.iter().map(|rule| rule.class_name.as_str()).collect()
  }

  /// Space separated class names in rule order.
  pub fn class_list(&self) -> String {
    self.class_names().join(" ")
  }
}

#[derive(Default)]
struct GroupBuilder {
  rules: IndexMap<(SelectorContext, String), AtomicRule>,
  variables: IndexMap<String, CssVariable>,
}

impl GroupBuilder {
  fn push(&mut self, rule: AtomicRule) {
    let key = (rule.context.clone(), rule.property.clone());
    // Last write wins and takes the later position.
    self.rules.shift_remove(&key);
    self.rules.insert(key, rule);
  }

  /// Variables whose rule was overridden are dropped with it.
  fn finish(self) -> RuleGroup {
    let rules: Vec<AtomicRule> = self.rules.into_values().collect();
    let variables = self
      .variables
      .into_values()
      .filter(|variable| {
        let reference = format!("var({})", variable.name);
        rules.iter().any(|rule| rule.value.contains(&reference))
      })
      .collect();

    RuleGroup::new(rules, variables)
  }
}

/// Turns declaration trees into [`RuleGroup`]s.
#[derive(Debug, Clone, Default)]
pub struct Atomizer {
  prefix: String,
}

impl Atomizer {
  pub fn new(class_hash_prefix: Option<&str>) -> Self {
    Self {
      prefix: class_hash_prefix.unwrap_or_default().to_string(),
    }
  }

  pub fn atomize(&self, block: &Block) -> RuleGroup {
    let mut builder = GroupBuilder::default();
    self.walk(block, &mut Vec::new(), "&", &mut builder);
    builder.finish()
  }

  /// `_` followed by the group token and the value token.
  pub fn class_name(
    &self,
    context: &SelectorContext,
    property: &str,
    value: &str,
    important: bool,
  ) -> String {
    let group = hash_token(&format!(
      "{}{}{}{}",
      self.prefix,
      context.at_rule_label(),
      context.selector,
      property
    ));
    let value = if important {
      hash_token(&format!("{value}true"))
    } else {
      hash_token(value)
    };
    format!("_{group}{value}")
  }

  fn walk(
    &self,
    block: &Block,
    at_rules: &mut Vec<AtRuleWrapper>,
    selector: &str,
    builder: &mut GroupBuilder,
  ) {
    for item in &block.items {
      match item {
        BlockItem::Declaration(declaration) => {
          let context = SelectorContext::new(at_rules.clone(), selector);
          self.declare(context, declaration, builder);
        }
        BlockItem::Rule { selectors, block } => {
          for child in selectors {
            self.walk(block, at_rules, &nest(selector, child), builder);
          }
        }
        BlockItem::AtRule { name, params, block } => {
          let params = params.split_whitespace().collect::<Vec<_>>().join(" ");
          at_rules.push(AtRuleWrapper::new(name.as_str(), params));
          self.walk(block, at_rules, selector, builder);
          at_rules.pop();
        }
      }
    }
  }

  fn declare(&self, context: SelectorContext, declaration: &Declaration, builder: &mut GroupBuilder) {
    let property = declaration.property.as_str();
    let value = canonical_value(&self.value_text(&context, declaration, builder));
    if value.is_empty() {
      return;
    }

    let value = reorder_line_value(property, &value).unwrap_or(value);
    let declarations = expand(property, &value).unwrap_or_else(|| vec![(property.to_string(), value)]);

    for (property, value) in declarations {
      let class_name = self.class_name(&context, &property, &value, declaration.important);
      builder.push(AtomicRule {
        bucket: context.bucket(),
        context: context.clone(),
        property,
        value,
        important: declaration.important,
        class_name,
      });
    }
  }

  /// Value text with every dynamic part replaced by a `var()` reference. A unit glued
  /// after the interpolation, a leading minus and surrounding quotes move into the
  /// variable so the runtime value stays a valid CSS token. Variable names are seeded
  /// with the interpolation's slot, so every expression of a site gets its own property.
  fn value_text(
    &self,
    context: &SelectorContext,
    declaration: &Declaration,
    builder: &mut GroupBuilder,
  ) -> String {
    let mut parts = declaration.value.clone();
    let mut out = String::new();

    for index in 0..parts.len() {
      let dynamic = match &parts[index] {
        ValuePart::Text(text) => {
          out.push_str(text);
          continue;
        }
        ValuePart::Dynamic(dynamic) => dynamic.clone(),
      };

      let mut prefix = String::new();
      let mut suffix = String::new();

      if out.ends_with('-') && out[..out.len() - 1].ends_with(|c: char| c.is_whitespace() || c == '(')
        || out == "-"
      {
        out.pop();
        prefix.push('-');
      }

      let quote = out.chars().last().filter(|c| matches!(c, '"' | '\''));

      if let Some(ValuePart::Text(next)) = parts.get_mut(index + 1) {
        let unit_len = next
          .find(|c: char| !(c.is_ascii_alphabetic() || c == '%'))
          .unwrap_or(next.len());
        suffix.push_str(&next[..unit_len]);
        next.replace_range(..unit_len, "");

        if let Some(quote) = quote {
          if next.starts_with(quote) {
            next.remove(0);
            out.pop();
            prefix.insert(0, quote);
            suffix.push(quote);
          }
        }
      }

      let name = format!(
        "--_{}",
        hash(&format!(
          "{}{}{}{}",
          context.at_rule_label(),
          context.selector,
          declaration.property,
          dynamic.slot
        ))
      );

      out.push_str(&format!("var({name})"));
      builder.variables.insert(
        name.clone(),
        CssVariable {
          name,
          expression: dynamic.source,
          prefix,
          suffix,
        },
      );
    }

    out
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::ast::Span;
  use crate::evaluate::DynamicRef;

  fn text(value: &str) -> ValuePart {
    ValuePart::Text(value.to_string())
  }

  fn dynamic(source: &str, slot: usize) -> ValuePart {
    ValuePart::Dynamic(DynamicRef {
      source: SourceRef {
        span: Span::DUMMY,
        text: source.to_string(),
      },
      slot,
    })
  }

  fn declare(property: &str, value: &str) -> BlockItem {
    BlockItem::Declaration(Declaration::new(property, vec![text(value)]))
  }

  fn block(items: Vec<BlockItem>) -> Block {
    Block { items }
  }

  #[test]
  fn hashes_class_names() {
    let group = Atomizer::default().atomize(&block(vec![
      declare("color", "blue"),
      declare("font-size", "12px"),
      declare("color", "red !important"),
    ]));

    assert_eq!(group.class_names(), vec!["_1wyb1fwx", "_syaz1qpq"]);
    assert_eq!(group.rules[1].declaration(), "color:red!important");
    assert_eq!(group.group_hash, hash("_1wyb1fwx _syaz1qpq"));
  }

  #[test]
  fn nests_selectors_and_at_rules() {
    let group = Atomizer::default().atomize(&block(vec![
      BlockItem::Rule {
        selectors: vec![":hover".into(), "&:focus".into()],
        block: block(vec![declare("user-select", "none")]),
      },
      BlockItem::AtRule {
        name: "media".into(),
        params: "(min-width:  30rem)".into(),
        block: block(vec![declare("user-select", "none")]),
      },
    ]));

    let rules = &group.rules;
    assert_eq!(rules[0].context.selector, "&:hover");
    assert_eq!(rules[0].bucket, Bucket::Hover);
    assert_eq!(&rules[0].class_name[..5], "_180h");
    assert_eq!(&rules[1].class_name[..5], "_1j5p");
    assert_eq!(&rules[2].class_name[..5], "_ufx4");
    assert_eq!(
      rules[2].to_css(&RenderOptions::default()),
      format!("@media (min-width: 30rem){{.{}{{user-select:none}}}}", rules[2].class_name)
    );
  }

  #[test]
  fn expands_shorthands_and_keeps_last_write() {
    let group = Atomizer::default().atomize(&block(vec![
      declare("margin-top", "4px"),
      declare("margin", "0 auto"),
    ]));

    let declarations: Vec<String> = group.rules.iter().map(AtomicRule::declaration).collect();
    assert_eq!(
      declarations,
      vec![
        "margin-top:0",
        "margin-right:auto",
        "margin-bottom:0",
        "margin-left:auto"
      ]
    );
  }

  #[test]
  fn equivalent_border_values_share_a_class() {
    let atomizer = Atomizer::default();
    let a = atomizer.atomize(&block(vec![declare("column-rule", "thick inset blue")]));
    let b = atomizer.atomize(&block(vec![declare("column-rule", "blue  inset thick")]));
    assert_eq!(a.class_names(), b.class_names());
  }

  #[test]
  fn dynamic_values_become_variables() {
    let group = Atomizer::default().atomize(&block(vec![
      BlockItem::Declaration(Declaration::new(
        "width",
        vec![dynamic("props.width", 0), text("px")],
      )),
      BlockItem::Declaration(Declaration::new(
        "margin",
        vec![text("0 -"), dynamic("gap", 1), text("rem")],
      )),
      BlockItem::Declaration(Declaration::new(
        "content",
        vec![text("\""), dynamic("label", 2), text("\"")],
      )),
    ]));

    let width = &group.variables[0];
    assert_eq!(width.name, format!("--_{}", hash("undefined&width0")));
    assert_eq!(width.expression.text, "props.width");
    assert_eq!((width.prefix.as_str(), width.suffix.as_str()), ("", "px"));
    assert_eq!(group.rules[0].value, format!("var({})", width.name));

    let gap = &group.variables[1];
    assert_eq!((gap.prefix.as_str(), gap.suffix.as_str()), ("-", "rem"));
    assert_eq!(group.rules[1].value, format!("0 var({})", gap.name));
    assert_eq!(group.rules[1].property, "margin");

    let label = &group.variables[2];
    assert_eq!((label.prefix.as_str(), label.suffix.as_str()), ("\"", "\""));
    assert!(group.rules.iter().all(|rule| rule.uses_variable()));
  }

  #[test]
  fn separate_expressions_for_one_property_get_separate_variables() {
    let atomizer = Atomizer::default();
    let base = atomizer.atomize(&block(vec![BlockItem::Declaration(Declaration::new(
      "color",
      vec![dynamic("props.base", 0)],
    ))]));
    let active = atomizer.atomize(&block(vec![BlockItem::Declaration(Declaration::new(
      "color",
      vec![dynamic("props.active", 1)],
    ))]));

    assert_ne!(base.variables[0].name, active.variables[0].name);
    assert_ne!(base.class_names(), active.class_names());
    assert_eq!(base.rules[0].value, format!("var({})", base.variables[0].name));
    assert_eq!(active.rules[0].value, format!("var({})", active.variables[0].name));
  }

  #[test]
  fn overridden_dynamic_value_drops_its_variable() {
    let group = Atomizer::default().atomize(&block(vec![
      BlockItem::Declaration(Declaration::new("width", vec![dynamic("props.w", 0)])),
      declare("width", "10px"),
      BlockItem::Declaration(Declaration::new("height", vec![dynamic("props.h", 1)])),
    ]));

    let declarations: Vec<String> = group.rules.iter().map(AtomicRule::declaration).collect();
    assert_eq!(declarations[0], "width:10px");
    assert_eq!(group.variables.len(), 1);
    assert_eq!(group.variables[0].expression.text, "props.h");
  }

  #[test]
  fn class_hash_prefix_changes_group_token() {
    let context = SelectorContext::root();
    let plain = Atomizer::default().class_name(&context, "color", "blue", false);
    let prefixed = Atomizer::new(Some("app")).class_name(&context, "color", "blue", false);

    assert_eq!(plain, "_syaz13q2");
    assert_ne!(&plain[..5], &prefixed[..5]);
    assert_eq!(&plain[5..], &prefixed[5..]);
  }

  #[test]
  fn renders_with_increased_specificity_and_compression() {
    let group = Atomizer::default().atomize(&block(vec![declare("color", "blue")]));
    let map = CompressionMap::from_entries([("syaz13q2", "a")]);
    let rule = &group.rules[0];

    let options = RenderOptions {
      increase_specificity: true,
      compression: Some(&map),
    };
    assert_eq!(rule.to_css(&options), ".a:not(#\\#){color:blue}");
    assert_eq!(rule.runtime_class(Some(&map)), "_syaz_a");
    assert_eq!(rule.runtime_class(None), "_syaz13q2");
  }
}
