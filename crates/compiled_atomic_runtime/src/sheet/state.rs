use std::collections::{BTreeSet, HashSet};

use xxhash_rust::xxh3::Xxh3Builder;

use super::rules::{rule_keys, server_style_contents};
use crate::bucket::InsertionPoint;
use crate::error::SheetError;

/// Rules already present in a document plus the insertion points created so far.
///
/// Lives as long as the page (browser) or the server render it belongs to. A client
/// taking over a server-rendered page starts from the server's rules so nothing is
/// inserted twice.
#[derive(Debug, Clone, Default)]
pub struct StylesheetInsertionState {
  inserted: HashSet<String, Xxh3Builder>,
  points: BTreeSet<InsertionPoint>,
}

impl StylesheetInsertionState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start from class names known to be present already.
  pub fn from_class_names<I, S>(class_names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut state = Self::default();
    for class_name in class_names {
      state.inserted.insert(class_name.into());
    }
    state
  }

  /// Start from the text of server-emitted style elements.
  pub fn from_server_css(css: &str) -> Result<Self, SheetError> {
    Ok(Self::from_class_names(rule_keys(css)?))
  }

  /// Start from server-rendered markup containing `<style data-cmpld>` elements.
  pub fn from_server_html(html: &str) -> Result<Self, SheetError> {
    let mut state = Self::default();
    for contents in server_style_contents(html) {
      state.inserted.extend(rule_keys(contents)?);
    }
    Ok(state)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.inserted.contains(key)
  }

  pub fn len(&self) -> usize {
    self.inserted.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inserted.is_empty()
  }

  pub fn has_insertion_point(&self, point: InsertionPoint) -> bool {
    self.points.contains(&point)
  }

  /// Position a new `point` takes among the existing ones.
  pub(crate) fn insertion_position(&self, point: InsertionPoint) -> usize {
    self.points.range(..point).count()
  }

  pub(crate) fn add_insertion_point(&mut self, point: InsertionPoint) {
    self.points.insert(point);
  }

  pub(crate) fn record(&mut self, key: String) -> bool {
    self.inserted.insert(key)
  }
}
