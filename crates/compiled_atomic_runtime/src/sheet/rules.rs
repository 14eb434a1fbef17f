use crate::error::SheetError;

/// Split CSS text into its top-level rules, e.g. the contents of a server-rendered
/// style element. Comments and strings are skipped when matching braces.
pub fn split_rules(css: &str) -> Result<Vec<&str>, SheetError> {
  let bytes = css.as_bytes();
  let mut rules = Vec::new();
  let mut depth = 0usize;
  let mut start: Option<usize> = None;
  let mut i = 0;

  while i < bytes.len() {
    let byte = bytes[i];
    match byte {
      b'/' if bytes.get(i + 1) == Some(&b'*') => {
        let Some(end) = css[i + 2..].find("*/") else {
          return Err(malformed(css, "unterminated comment"));
        };
        i += end + 4;
        continue;
      }
      b'"' | b'\'' => {
        start.get_or_insert(i);
        i = skip_string(css, i)?;
        continue;
      }
      b'\\' => {
        start.get_or_insert(i);
        i += 2;
        continue;
      }
      b'{' => {
        start.get_or_insert(i);
        depth += 1;
      }
      b'}' => {
        if depth == 0 {
          return Err(malformed(css, "unexpected `}`"));
        }
        depth -= 1;
        if depth == 0 {
          if let Some(begin) = start.take() {
            rules.push(css[begin..=i].trim());
          }
        }
      }
      _ if byte.is_ascii_whitespace() => {}
      _ => {
        start.get_or_insert(i);
      }
    }
    i += 1;
  }

  if depth != 0 {
    return Err(malformed(css, "unbalanced braces"));
  }

  if let Some(begin) = start {
    if !css[begin..].trim().is_empty() {
      return Err(malformed(css, "trailing text without a block"));
    }
  }

  Ok(rules)
}

/// Validate that `css` is exactly one complete rule.
pub fn check_rule(css: &str) -> Result<(), SheetError> {
  let trimmed = css.trim();
  if trimmed.is_empty() {
    return Err(malformed(css, "empty rule"));
  }

  match split_rules(trimmed)?.as_slice() {
    [single] if *single == trimmed => Ok(()),
    _ => Err(malformed(css, "expected exactly one rule")),
  }
}

/// Class names of every atomic rule inside `css`, descending into at-rule blocks.
pub fn rule_keys(css: &str) -> Result<Vec<String>, SheetError> {
  let mut keys = Vec::new();
  for rule in split_rules(css)? {
    collect_keys(rule, &mut keys)?;
  }
  Ok(keys)
}

/// Identity of a single rule in the insertion state: its first class name, or the
/// whole rule text when it selects no class.
pub fn rule_key(css: &str) -> String {
  let css = css.trim();
  rule_keys(css)
    .ok()
    .and_then(|keys| keys.into_iter().next())
    .unwrap_or_else(|| css.to_string())
}

/// Contents of every `<style data-cmpld ...>` element in server-rendered markup.
pub fn server_style_contents(html: &str) -> Vec<&str> {
  let mut contents = Vec::new();
  let mut rest = html;

  while let Some(open) = rest.find("<style") {
    let after_open = &rest[open..];
    let Some(tag_end) = after_open.find('>') else {
      break;
    };
    let tag = &after_open[..tag_end];
    let body = &after_open[tag_end + 1..];
    let Some(close) = body.find("</style>") else {
      break;
    };

    if tag.contains("data-cmpld") {
      contents.push(&body[..close]);
    }
    rest = &body[close + "</style>".len()..];
  }

  contents
}

fn collect_keys(rule: &str, keys: &mut Vec<String>) -> Result<(), SheetError> {
  let Some(open) = rule.find('{') else {
    return Err(malformed(rule, "missing block"));
  };

  if rule.starts_with('@') {
    let inner = &rule[open + 1..rule.len() - 1];
    for child in split_rules(inner)? {
      collect_keys(child, keys)?;
    }
    return Ok(());
  }

  match first_class_name(&rule[..open]) {
    Some(class_name) => keys.push(class_name.to_string()),
    None => keys.push(rule.to_string()),
  }
  Ok(())
}

fn first_class_name(selector: &str) -> Option<&str> {
  let start = selector.find('.')? + 1;
  let len = selector[start..]
    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
    .unwrap_or(selector.len() - start);

  (len > 0).then(|| &selector[start..start + len])
}

fn skip_string(css: &str, start: usize) -> Result<usize, SheetError> {
  let bytes = css.as_bytes();
  let quote = bytes[start];
  let mut i = start + 1;
  while i < bytes.len() {
    match bytes[i] {
      b'\\' => i += 2,
      b if b == quote => return Ok(i + 1),
      _ => i += 1,
    }
  }
  Err(malformed(css, "unterminated string"))
}

fn malformed(css: &str, reason: &'static str) -> SheetError {
  SheetError::MalformedRule {
    rule: css.to_string(),
    reason,
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn splits_top_level_rules() {
    let css = "._syaz5scu{color:red}\n@media (min-width:500px){._a{color:blue}._b:hover{color:green}}";

    assert_eq!(
      split_rules(css).unwrap(),
      vec![
        "._syaz5scu{color:red}",
        "@media (min-width:500px){._a{color:blue}._b:hover{color:green}}"
      ]
    );
  }

  #[test]
  fn ignores_braces_in_strings_and_comments() {
    let css = r#"/* } */._a:before{content:"}"}._b{color:red}"#;

    assert_eq!(
      split_rules(css).unwrap(),
      vec![r#"._a:before{content:"}"}"#, "._b{color:red}"]
    );
  }

  #[test]
  fn collects_keys_inside_at_rules() {
    let keys =
      rule_keys("._a{color:red}@media screen{@supports (display:grid){._b{display:grid}}}").unwrap();
    assert_eq!(keys, vec!["_a", "_b"]);
  }

  #[test]
  fn keys_ignore_specificity_suffix() {
    assert_eq!(rule_key(r"._syaz5scu:not(#\#):hover{color:red}"), "_syaz5scu");
    assert_eq!(rule_key("div{color:red}"), "div{color:red}");
  }

  #[test]
  fn rejects_malformed_rules() {
    assert!(check_rule("._a{color:red}").is_ok());
    assert!(check_rule("._a{color:red").is_err());
    assert!(check_rule("._a{color:red}}").is_err());
    assert!(check_rule("._a{color:red}._b{color:blue}").is_err());
    assert!(check_rule("   ").is_err());
  }

  #[test]
  fn finds_server_style_elements() {
    let html = r#"<div><style data-cmpld="c" nonce="k">._a{color:red}</style><style>body{}</style><style data-cmpld="h">._b:hover{color:blue}</style></div>"#;

    assert_eq!(
      server_style_contents(html),
      vec!["._a{color:red}", "._b:hover{color:blue}"]
    );
  }
}
