//! Shorthand property handling.
//!
//! Static shorthand values are expanded into longhands so that a later longhand and an
//! earlier shorthand compete on the same atomic slot. Border-like shorthands are not
//! expanded, but their values are put into a canonical order so equivalent spellings
//! share a class name.

const GLOBAL_VALUES: &[&str] = &["inherit", "initial", "unset", "revert", "revert-layer"];

const LINE_STYLES: &[&str] = &[
  "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

const LINE_WIDTHS: &[&str] = &["thin", "medium", "thick"];

const WIDTH_KEYWORDS: &[&str] = &["auto", "min-content", "max-content", "fit-content"];

const FLEX_BASIS_DEFAULT: &str = "0%";

/// Longhand declarations replacing `property: value`, or `None` when the declaration
/// is kept as written.
pub fn expand(property: &str, value: &str) -> Option<Vec<(String, String)>> {
  if value.contains("var(") {
    return None;
  }

  let words = split_words(value);
  if words.is_empty() || words.iter().any(|word| GLOBAL_VALUES.contains(word)) {
    return None;
  }

  let longhands = match property {
    "margin" | "padding" | "scroll-margin" | "scroll-padding" => box_model(
      &words,
      [
        format!("{property}-top"),
        format!("{property}-right"),
        format!("{property}-bottom"),
        format!("{property}-left"),
      ],
    )?,
    "inset" => box_model(&words, ["top", "right", "bottom", "left"].map(String::from))?,
    "border-width" | "border-style" | "border-color" => {
      let suffix = &property["border-".len()..];
      box_model(
        &words,
        ["top", "right", "bottom", "left"].map(|side| format!("border-{side}-{suffix}")),
      )?
    }
    "overflow" => two_axis(&words, "overflow-x", "overflow-y")?,
    "gap" => two_axis(&words, "row-gap", "column-gap")?,
    "place-content" => {
      if words.len() == 1 && matches!(words[0], "left" | "right" | "baseline") {
        return None;
      }
      two_axis(&words, "align-content", "justify-content")?
    }
    "place-items" => two_axis(&words, "align-items", "justify-items")?,
    "place-self" => two_axis(&words, "align-self", "justify-self")?,
    "flex-flow" => flex_flow(&words)?,
    "flex" => flex(&words)?,
    "outline" => outline(&words)?,
    _ => return None,
  };

  Some(
    longhands
      .into_iter()
      .map(|(property, value)| (property, value.to_string()))
      .collect(),
  )
}

fn box_model<'a>(words: &[&'a str], properties: [String; 4]) -> Option<Vec<(String, &'a str)>> {
  if words.len() > 4 {
    return None;
  }

  let top = words[0];
  let right = words.get(1).copied().unwrap_or(top);
  let bottom = words.get(2).copied().unwrap_or(top);
  let left = words.get(3).copied().unwrap_or(right);

  Some(properties.into_iter().zip([top, right, bottom, left]).collect())
}

fn two_axis<'a>(words: &[&'a str], first: &str, second: &str) -> Option<Vec<(String, &'a str)>> {
  if words.len() > 2 {
    return None;
  }

  let first_value = words[0];
  let second_value = words.get(1).copied().unwrap_or(first_value);
  Some(vec![
    (first.to_string(), first_value),
    (second.to_string(), second_value),
  ])
}

fn flex_flow<'a>(words: &[&'a str]) -> Option<Vec<(String, &'a str)>> {
  let mut direction = None;
  let mut wrap = None;

  for &word in words {
    let slot = match word {
      "row" | "row-reverse" | "column" | "column-reverse" => &mut direction,
      "nowrap" | "wrap" | "wrap-reverse" => &mut wrap,
      _ => return None,
    };
    if slot.replace(word).is_some() {
      return None;
    }
  }

  Some(vec![
    ("flex-direction".to_string(), direction.unwrap_or("row")),
    ("flex-wrap".to_string(), wrap.unwrap_or("nowrap")),
  ])
}

fn flex<'a>(words: &[&'a str]) -> Option<Vec<(String, &'a str)>> {
  let (grow, shrink, basis) = match *words {
    ["auto"] => ("1", "1", "auto"),
    ["none"] => ("0", "0", "auto"),
    ["initial"] => ("0", "1", "auto"),
    [grow] if is_number(grow) => (grow, "1", FLEX_BASIS_DEFAULT),
    [basis] if is_flex_basis(basis) => ("1", "1", flex_basis(basis)),
    [grow, shrink] if is_number(grow) && is_number(shrink) => (grow, shrink, FLEX_BASIS_DEFAULT),
    [grow, basis] if is_number(grow) && is_flex_basis(basis) => (grow, "1", flex_basis(basis)),
    [grow, shrink, basis] if is_number(grow) && is_number(shrink) && is_flex_basis(basis) => {
      (grow, shrink, flex_basis(basis))
    }
    _ => return None,
  };

  Some(vec![
    ("flex-grow".to_string(), grow),
    ("flex-shrink".to_string(), shrink),
    ("flex-basis".to_string(), basis),
  ])
}

fn is_flex_basis(word: &str) -> bool {
  word == "content" || word == "0" || is_length(word) || WIDTH_KEYWORDS.contains(&word)
}

fn flex_basis(word: &str) -> &str {
  if word == "0" {
    FLEX_BASIS_DEFAULT
  } else {
    word
  }
}

fn outline<'a>(words: &[&'a str]) -> Option<Vec<(String, &'a str)>> {
  if words.len() > 3 {
    return None;
  }

  let mut color = None;
  let mut style = None;
  let mut width = None;

  for &word in words {
    let slot = match classify_line_part(word) {
      LinePart::Width => &mut width,
      LinePart::Style => &mut style,
      LinePart::Color => &mut color,
    };
    if slot.replace(word).is_some() {
      return None;
    }
  }

  Some(vec![
    ("outline-color".to_string(), color.unwrap_or("currentColor")),
    ("outline-style".to_string(), style.unwrap_or("none")),
    ("outline-width".to_string(), width.unwrap_or("medium")),
  ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LinePart {
  Width,
  Style,
  Color,
}

fn classify_line_part(word: &str) -> LinePart {
  if LINE_WIDTHS.contains(&word) || word == "0" || is_length(word) {
    LinePart::Width
  } else if LINE_STYLES.contains(&word) {
    LinePart::Style
  } else {
    LinePart::Color
  }
}

fn is_border_like(property: &str) -> bool {
  matches!(
    property,
    "border"
      | "border-top"
      | "border-right"
      | "border-bottom"
      | "border-left"
      | "border-block"
      | "border-block-start"
      | "border-block-end"
      | "border-inline"
      | "border-inline-start"
      | "border-inline-end"
      | "column-rule"
  )
}

/// Width, style and color parts of a border-like shorthand in canonical order.
/// `column-rule: blue inset thick` becomes `thick inset blue`.
pub fn reorder_line_value(property: &str, value: &str) -> Option<String> {
  if !is_border_like(property) || value.contains("var(") {
    return None;
  }

  let mut words = split_words(value);
  if words.len() < 2 || words.len() > 3 {
    return None;
  }

  let mut seen = Vec::with_capacity(words.len());
  for word in &words {
    let part = classify_line_part(word);
    if seen.contains(&part) {
      return None;
    }
    seen.push(part);
  }

  words.sort_by_key(|word| classify_line_part(word));
  Some(words.join(" "))
}

/// Collapse whitespace outside strings and spell `currentcolor` as `currentColor`.
pub fn canonical_value(value: &str) -> String {
  let value = collapse_whitespace(value);
  split_words(&value)
    .into_iter()
    .map(|word| {
      if word.eq_ignore_ascii_case("currentcolor") || word.eq_ignore_ascii_case("current-color") {
        "currentColor"
      } else {
        word
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

/// Trim and collapse whitespace runs to one space, leaving quoted strings untouched.
pub fn collapse_whitespace(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  let mut quote: Option<char> = None;
  let mut escaped = false;
  let mut space = false;

  for c in value.chars() {
    if let Some(q) = quote {
      out.push(c);
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == q {
        quote = None;
      }
      continue;
    }

    if c.is_whitespace() {
      space = !out.is_empty();
      continue;
    }
    if space {
      out.push(' ');
      space = false;
    }
    if matches!(c, '"' | '\'') {
      quote = Some(c);
    }
    out.push(c);
  }

  out
}

/// Sort depth of a shorthand. Lower depths are emitted first so that longhands,
/// which have no depth, override them.
pub fn shorthand_depth(property: &str) -> Option<u32> {
  let depth = match property {
    "all" => 0,
    "animation"
    | "animation-range"
    | "background"
    | "border"
    | "border-image"
    | "border-radius"
    | "column-rule"
    | "columns"
    | "contain-intrinsic-size"
    | "container"
    | "flex"
    | "flex-flow"
    | "font"
    | "font-synthesis"
    | "gap"
    | "grid"
    | "grid-area"
    | "inset"
    | "list-style"
    | "margin"
    | "mask"
    | "mask-border"
    | "offset"
    | "outline"
    | "overflow"
    | "overscroll-behavior"
    | "padding"
    | "place-content"
    | "place-items"
    | "place-self"
    | "scroll-margin"
    | "scroll-padding"
    | "scroll-timeline"
    | "text-decoration"
    | "text-emphasis"
    | "transition" => 1,
    "border-color"
    | "border-style"
    | "border-width"
    | "font-variant"
    | "grid-column"
    | "grid-row"
    | "grid-template"
    | "inset-block"
    | "inset-inline"
    | "margin-block"
    | "margin-inline"
    | "padding-block"
    | "padding-inline"
    | "scroll-margin-block"
    | "scroll-margin-inline"
    | "scroll-padding-block"
    | "scroll-padding-inline" => 2,
    "border-block" | "border-inline" => 3,
    "border-top" | "border-right" | "border-bottom" | "border-left" => 4,
    "border-block-start" | "border-block-end" | "border-inline-start" | "border-inline-end" => 5,
    _ => return None,
  };

  Some(depth)
}

/// Top-level words of a value. Whitespace inside parentheses and strings does not split.
fn split_words(value: &str) -> Vec<&str> {
  let mut words = Vec::new();
  let mut depth = 0i32;
  let mut quote: Option<char> = None;
  let mut start: Option<usize> = None;

  for (index, c) in value.char_indices() {
    if let Some(q) = quote {
      if c == q {
        quote = None;
      }
      continue;
    }

    match c {
      c if c.is_whitespace() && depth == 0 => {
        if let Some(begin) = start.take() {
          words.push(&value[begin..index]);
        }
        continue;
      }
      '"' | '\'' => quote = Some(c),
      '(' => depth += 1,
      ')' => depth -= 1,
      _ => {}
    }
    start.get_or_insert(index);
  }

  if let Some(begin) = start {
    words.push(&value[begin..]);
  }
  words
}

fn is_number(word: &str) -> bool {
  !word.is_empty() && word.parse::<f64>().is_ok()
}

/// A dimension, percentage or math function.
fn is_length(word: &str) -> bool {
  if ["calc(", "min(", "max(", "clamp("]
    .iter()
    .any(|function| word.starts_with(function))
  {
    return true;
  }

  let unit_start = word
    .find(|c: char| c.is_ascii_alphabetic() || c == '%')
    .unwrap_or(word.len());
  let (number, unit) = word.split_at(unit_start);
  !unit.is_empty()
    && is_number(number)
    && (unit == "%" || unit.chars().all(|c| c.is_ascii_alphabetic()))
}
