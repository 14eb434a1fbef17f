use serde::Serialize;

/// Pseudo-classes in ascending cascade priority (LVFHA ordering).
pub const STYLE_ORDER: [&str; 7] = [
  ":link",
  ":visited",
  ":focus-within",
  ":focus",
  ":focus-visible",
  ":hover",
  ":active",
];

/// Priority class of an atomic rule.
///
/// Rules are emitted (and inserted into a live document) bucket by bucket so that
/// pseudo-class precedence survives atomic decomposition: a `:hover` rule always lands
/// after a `:link` rule even though the two were declared by unrelated selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
  Catchall,
  Link,
  Visited,
  FocusWithin,
  Focus,
  FocusVisible,
  Hover,
  Active,
}

impl Bucket {
  pub const ALL: [Bucket; 8] = [
    Bucket::Catchall,
    Bucket::Link,
    Bucket::Visited,
    Bucket::FocusWithin,
    Bucket::Focus,
    Bucket::FocusVisible,
    Bucket::Hover,
    Bucket::Active,
  ];

  /// Bucket for a pseudo-class name such as `:hover` or `hover`.
  /// Unknown pseudo-classes fall back to `Catchall`.
  pub fn from_pseudo(pseudo: &str) -> Bucket {
    let pseudo = pseudo.trim();
    let pseudo = pseudo.strip_prefix(':').unwrap_or(pseudo);

    STYLE_ORDER
      .iter()
      .position(|candidate| &candidate[1..] == pseudo)
      .map(Bucket::from_style_order_index)
      .unwrap_or(Bucket::Catchall)
  }

  /// Bucket for a selector, decided by the pseudo-class it ends with.
  pub fn from_selector(selector: &str) -> Bucket {
    let selector = selector.trim();

    STYLE_ORDER
      .iter()
      .position(|pseudo| selector.ends_with(pseudo))
      .map(Bucket::from_style_order_index)
      .unwrap_or(Bucket::Catchall)
  }

  /// Short identifier used in insertion point tags.
  pub fn name(self) -> &'static str {
    match self {
      Bucket::Catchall => "c",
      Bucket::Link => "l",
      Bucket::Visited => "v",
      Bucket::FocusWithin => "w",
      Bucket::Focus => "f",
      Bucket::FocusVisible => "i",
      Bucket::Hover => "h",
      Bucket::Active => "a",
    }
  }

  fn from_style_order_index(index: usize) -> Bucket {
    Bucket::ALL[index + 1]
  }
}

/// Style element of a live stylesheet a rule is inserted into.
///
/// Plain rules come first in bucket order, followed by at-rule wrapped rules, again in
/// the bucket order of their innermost selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertionPoint {
  pub at_rule: bool,
  pub bucket: Bucket,
}

impl InsertionPoint {
  pub fn new(at_rule: bool, bucket: Bucket) -> Self {
    Self { at_rule, bucket }
  }

  /// Insertion point of a complete rule text, e.g. `._syaz5scu:hover{color:red}` or
  /// `@media (min-width:500px){._a:hover{color:red}}`.
  pub fn from_rule(css: &str) -> Self {
    let mut css = css.trim_start();
    let at_rule = css.starts_with('@');

    while css.starts_with('@') {
      let Some(open) = css.find('{') else {
        break;
      };
      css = css[open + 1..].trim_start();
    }

    let selector = css.split('{').next().unwrap_or_default();
    Self::new(at_rule, Bucket::from_selector(selector))
  }

  /// `data-cmpld` value: the bucket name, prefixed with `m` inside at-rules.
  pub fn name(self) -> String {
    if self.at_rule {
      format!("m{}", self.bucket.name())
    } else {
      self.bucket.name().to_string()
    }
  }
}
