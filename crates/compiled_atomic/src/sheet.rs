//! Ordering and deduplication of atomic rules into a stylesheet.
//!
//! Rules are sorted by bucket so pseudo-class rules keep their cascade order (`:link`
//! before `:hover` before `:active`) no matter where they were declared, and at-rule
//! wrapped rules follow plain rules so they can override them.

use std::collections::HashSet;

use compiled_atomic_runtime::CompressionMap;
use indexmap::IndexMap;
use serde::Serialize;

use crate::atomize::{AtomicRule, RuleGroup};
use crate::selector::AtRuleWrapper;
use crate::shorthand::shorthand_depth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOptions {
  /// Sort at-rule blocks by name and condition instead of keeping encounter order.
  pub sort_at_rules: bool,
  /// Emit shorthands before the longhands they cover.
  pub sort_shorthand: bool,
}

impl Default for SortOptions {
  fn default() -> Self {
    Self {
      sort_at_rules: false,
      sort_shorthand: true,
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions<'a> {
  pub increase_specificity: bool,
  pub compression: Option<&'a CompressionMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SheetItem {
  Rule(AtomicRule),
  AtRule(AtRuleBlock),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtRuleBlock {
  pub wrapper: AtRuleWrapper,
  pub items: Vec<SheetItem>,
}

/// Counts describing an emitted stylesheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetReport {
  pub total_rules: usize,
  pub nested_selector_rules: usize,
  pub css_variable_rules: usize,
  pub inline_image_rules: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyleSheet {
  pub items: Vec<SheetItem>,
}

impl StyleSheet {
  /// Every atomic rule in output order, descending into at-rule blocks.
  pub fn rules(&self) -> Vec<&AtomicRule> {
    fn collect<'a>(items: &'a [SheetItem], out: &mut Vec<&'a AtomicRule>) {
      for item in items {
        match item {
          SheetItem::Rule(rule) => out.push(rule),
          SheetItem::AtRule(block) => collect(&block.items, out),
        }
      }
    }

    let mut out = Vec::new();
    collect(&self.items, &mut out);
    out
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Stylesheet text with one atomic rule or merged at-rule block per line.
  pub fn to_css(&self, options: &RenderOptions) -> String {
    let mut lines: Vec<String> = self
      .items
      .iter()
      .map(|item| render_item(item, options))
      .collect();
    lines.retain(|line| !line.is_empty());
    lines.join("\n")
  }

  /// One self-contained rule per atomic class, for runtime insertion.
  pub fn rule_texts(&self, options: &RenderOptions) -> Vec<String> {
    self.rules().into_iter().map(|rule| rule.to_css(options)).collect()
  }

  pub fn report(&self) -> SheetReport {
    self
      .rules()
      .into_iter()
      .fold(SheetReport::default(), |mut report, rule| {
        report.total_rules += 1;
        if rule.context.has_nested_selector() {
          report.nested_selector_rules += 1;
        }
        if rule.uses_variable() {
          report.css_variable_rules += 1;
        }
        if rule.has_inline_image() {
          report.inline_image_rules += 1;
        }
        report
      })
  }
}

fn render_item(item: &SheetItem, options: &RenderOptions) -> String {
  match item {
    SheetItem::Rule(rule) => rule.rule_text(options),
    SheetItem::AtRule(block) => {
      let inner: String = block
        .items
        .iter()
        .map(|item| render_item(item, options))
        .collect();
      format!("{}{{{inner}}}", block.wrapper.prelude())
    }
  }
}

#[derive(Default)]
struct SheetNode {
  rules: Vec<AtomicRule>,
  at_rules: IndexMap<AtRuleWrapper, SheetNode>,
}

impl SheetNode {
  fn insert(&mut self, rule: AtomicRule) {
    let mut node = self;
    for wrapper in &rule.context.at_rules {
      node = node.at_rules.entry(wrapper.clone()).or_default();
    }
    node.rules.push(rule);
  }

  fn into_items(self, options: &SortOptions) -> Vec<SheetItem> {
    let mut rules = self.rules;
    // Stable: ties keep encounter order.
    rules.sort_by_key(|rule| {
      let depth = if options.sort_shorthand {
        shorthand_depth(&rule.property).unwrap_or(u32::MAX)
      } else {
        0
      };
      (rule.bucket, depth)
    });

    let mut at_rules: Vec<(AtRuleWrapper, SheetNode)> = self.at_rules.into_iter().collect();
    if options.sort_at_rules {
      at_rules.sort_by(|(a, _), (b, _)| a.cmp(b));
    }

    rules
      .into_iter()
      .map(SheetItem::Rule)
      .chain(at_rules.into_iter().map(|(wrapper, node)| {
        SheetItem::AtRule(AtRuleBlock {
          wrapper,
          items: node.into_items(options),
        })
      }))
      .collect()
  }
}

/// Merge rule groups into a deduplicated, cascade-ordered stylesheet.
pub fn sort_atomic_style_sheet<'a, I>(groups: I, options: &SortOptions) -> StyleSheet
where
  I: IntoIterator<Item = &'a RuleGroup>,
{
  let mut seen_groups = HashSet::new();
  let mut seen_rules = HashSet::new();
  let mut root = SheetNode::default();

  for group in groups {
    if !seen_groups.insert(group.group_hash.as_str()) {
      tracing::trace!(group_hash = %group.group_hash, "Skipping repeated rule group");
      continue;
    }

    for rule in &group.rules {
      let key = (&rule.context, &rule.property, &rule.value, rule.important);
      if seen_rules.insert(key) {
        root.insert(rule.clone());
      }
    }
  }

  StyleSheet {
    items: root.into_items(options),
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::atomize::Atomizer;
  use crate::parse::{Block, BlockItem, Declaration, ValuePart};

  fn declare(property: &str, value: &str) -> BlockItem {
    BlockItem::Declaration(Declaration::new(
      property,
      vec![ValuePart::Text(value.to_string())],
    ))
  }

  fn rule(selector: &str, items: Vec<BlockItem>) -> BlockItem {
    BlockItem::Rule {
      selectors: vec![selector.to_string()],
      block: Block { items },
    }
  }

  fn media(params: &str, items: Vec<BlockItem>) -> BlockItem {
    BlockItem::AtRule {
      name: "media".to_string(),
      params: params.to_string(),
      block: Block { items },
    }
  }

  fn group(items: Vec<BlockItem>) -> RuleGroup {
    Atomizer::default().atomize(&Block { items })
  }

  fn selectors(sheet: &StyleSheet) -> Vec<String> {
    sheet
      .rules()
      .into_iter()
      .map(|rule| format!("{}|{}", rule.context.selector, rule.declaration()))
      .collect()
  }

  #[test]
  fn orders_pseudo_classes_by_bucket() {
    let styles = group(vec![
      rule(":active", vec![declare("color", "red")]),
      rule(":hover", vec![declare("color", "blue")]),
      declare("color", "black"),
      rule(":link", vec![declare("color", "green")]),
      rule(":focus", vec![declare("color", "pink")]),
    ]);

    let sheet = sort_atomic_style_sheet([&styles], &SortOptions::default());
    assert_eq!(
      selectors(&sheet),
      vec![
        "&|color:black",
        "&:link|color:green",
        "&:focus|color:pink",
        "&:hover|color:blue",
        "&:active|color:red",
      ]
    );
  }

  #[test]
  fn deduplicates_rules_and_groups() {
    let first = group(vec![declare("color", "red"), declare("display", "block")]);
    let second = group(vec![declare("display", "block"), declare("color", "blue")]);

    let sheet = sort_atomic_style_sheet([&first, &second, &first], &SortOptions::default());
    assert_eq!(
      selectors(&sheet),
      vec!["&|color:red", "&|display:block", "&|color:blue"]
    );
  }

  #[test]
  fn merges_at_rules_after_plain_rules() {
    let first = group(vec![
      media("(min-width: 500px)", vec![declare("color", "red")]),
      declare("color", "blue"),
    ]);
    let second = group(vec![
      media("(max-width: 100px)", vec![declare("display", "none")]),
      media("(min-width: 500px)", vec![declare("display", "block")]),
    ]);

    let options = RenderOptions::default();
    let sheet = sort_atomic_style_sheet([&first, &second], &SortOptions::default());
    let css = sheet.to_css(&options);
    let lines: Vec<&str> = css.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("{color:blue}"));
    assert!(lines[1].starts_with("@media (min-width: 500px){"));
    assert!(lines[1].contains("{color:red}") && lines[1].contains("{display:block}"));
    assert!(lines[2].starts_with("@media (max-width: 100px){"));

    let sorted = sort_atomic_style_sheet(
      [&first, &second],
      &SortOptions {
        sort_at_rules: true,
        ..SortOptions::default()
      },
    );
    let css = sorted.to_css(&options);
    let lines: Vec<&str> = css.lines().collect();
    assert!(lines[1].starts_with("@media (max-width: 100px){"));
    assert!(lines[2].starts_with("@media (min-width: 500px){"));
  }

  #[test]
  fn longhands_follow_shorthands() {
    let styles = group(vec![
      declare("padding-top", "4px"),
      declare("border-top", "1px solid red"),
      declare("border", "none"),
    ]);

    let sheet = sort_atomic_style_sheet([&styles], &SortOptions::default());
    assert_eq!(
      selectors(&sheet),
      vec!["&|border:none", "&|border-top:1px solid red", "&|padding-top:4px"]
    );

    let unsorted = sort_atomic_style_sheet(
      [&styles],
      &SortOptions {
        sort_shorthand: false,
        ..SortOptions::default()
      },
    );
    assert_eq!(
      selectors(&unsorted),
      vec!["&|padding-top:4px", "&|border-top:1px solid red", "&|border:none"]
    );
  }

  #[test]
  fn rule_texts_are_self_contained() {
    let styles = group(vec![media(
      "screen",
      vec![rule(":hover", vec![declare("color", "red")])],
    )]);
    let sheet = sort_atomic_style_sheet([&styles], &SortOptions::default());
    let class = &styles.rules[0].class_name;

    assert_eq!(
      sheet.rule_texts(&RenderOptions::default()),
      vec![format!("@media screen{{.{class}:hover{{color:red}}}}")]
    );
    assert_eq!(
      sheet.rule_texts(&RenderOptions {
        increase_specificity: true,
        compression: None,
      }),
      vec![format!("@media screen{{.{class}:not(#\\#):hover{{color:red}}}}")]
    );
  }

  #[test]
  fn reports_rule_kinds() {
    let styles = group(vec![
      declare("color", "red"),
      rule("> div", vec![declare("display", "none")]),
      declare("background-image", "url(data:image/png;base64,AAAA)"),
      declare("width", "var(--_abc)"),
    ]);
    let sheet = sort_atomic_style_sheet([&styles], &SortOptions::default());

    assert_eq!(
      sheet.report(),
      SheetReport {
        total_rules: 4,
        nested_selector_rules: 1,
        css_variable_rules: 1,
        inline_image_rules: 1,
      }
    );
  }
}
