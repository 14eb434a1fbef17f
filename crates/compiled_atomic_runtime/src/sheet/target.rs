use crate::bucket::InsertionPoint;
use crate::error::SheetError;

/// The live document a stylesheet manager writes into.
///
/// Implementations hold one style element per [`InsertionPoint`]. The manager
/// decides when an insertion point is needed and where it goes; the target only has to
/// perform the structural mutation.
pub trait StyleTarget {
  /// Create `point` at `position` among the insertion points created so far.
  fn create_insertion_point(
    &mut self,
    point: InsertionPoint,
    position: usize,
    nonce: Option<&str>,
  ) -> Result<(), SheetError>;

  /// Append a rule to the style element of `point`.
  fn insert_rule(&mut self, point: InsertionPoint, css: &str) -> Result<(), SheetError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleElement {
  pub point: InsertionPoint,
  pub nonce: Option<String>,
  pub rules: Vec<String>,
}

/// In-process document: used by tests, by non-browser hosts and as the server render
/// collector whose [`MemoryDocument::to_html`] output is sent with the markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDocument {
  elements: Vec<StyleElement>,
}

impl MemoryDocument {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn elements(&self) -> &[StyleElement] {
    &self.elements
  }

  /// Every rule in document order.
  pub fn rules(&self) -> impl Iterator<Item = &str> {
    self
      .elements
      .iter()
      .flat_map(|element| element.rules.iter().map(String::as_str))
  }

  pub fn css_text(&self) -> String {
    self.rules().collect::<Vec<_>>().join("")
  }

  /// Render the style elements for a server response.
  pub fn to_html(&self) -> String {
    let mut html = String::new();
    for element in &self.elements {
      html.push_str("<style data-cmpld=\"");
      html.push_str(&element.point.name());
      html.push('"');
      if let Some(nonce) = &element.nonce {
        html.push_str(" nonce=\"");
        html.push_str(&escape_attribute(nonce));
        html.push('"');
      }
      html.push('>');
      for rule in &element.rules {
        html.push_str(rule);
      }
      html.push_str("</style>");
    }
    html
  }
}

impl StyleTarget for MemoryDocument {
  fn create_insertion_point(
    &mut self,
    point: InsertionPoint,
    position: usize,
    nonce: Option<&str>,
  ) -> Result<(), SheetError> {
    let position = position.min(self.elements.len());
    self.elements.insert(
      position,
      StyleElement {
        point,
        nonce: nonce.map(str::to_string),
        rules: Vec::new(),
      },
    );
    Ok(())
  }

  fn insert_rule(&mut self, point: InsertionPoint, css: &str) -> Result<(), SheetError> {
    let element = self
      .elements
      .iter_mut()
      .find(|element| element.point == point)
      .ok_or(SheetError::MissingInsertionPoint(point))?;

    element.rules.push(css.to_string());
    Ok(())
  }
}

fn escape_attribute(value: &str) -> String {
  value
    .replace('&', "&amp;")
    .replace('"', "&quot;")
    .replace('<', "&lt;")
}
