use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use super::rules::{check_rule, rule_key};
use super::state::StylesheetInsertionState;
use super::target::StyleTarget;
use crate::bucket::InsertionPoint;
use crate::error::SheetError;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetOptions {
  ///
  /// Security nonce applied to every style element the manager creates.
  ///
  /// Defaults to `None`
  ///
  pub nonce: Option<String>,
}

/// Ownership of a document's stylesheet state.
///
/// Cloning the context shares the same document. Only one [`OwnershipToken`] can be
/// alive per document at a time, which catches two copies of the styling runtime
/// fighting over the same page.
#[derive(Clone, Debug, Default)]
pub struct DocumentContext {
  owned: Arc<AtomicBool>,
}

impl DocumentContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn claim(&self) -> Result<OwnershipToken, SheetError> {
    self
      .owned
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .map_err(|_| SheetError::DuplicateStylesheetOwner)?;

    Ok(OwnershipToken {
      owned: self.owned.clone(),
    })
  }

  pub fn is_owned(&self) -> bool {
    self.owned.load(Ordering::Acquire)
  }
}

/// Released when dropped.
#[derive(Debug)]
pub struct OwnershipToken {
  owned: Arc<AtomicBool>,
}

impl Drop for OwnershipToken {
  fn drop(&mut self) {
    self.owned.store(false, Ordering::Release);
  }
}

/// Inserts atomic rules into a live document exactly once, at their bucket position.
#[derive(Debug)]
pub struct StyleSheetManager<T: StyleTarget> {
  target: T,
  state: StylesheetInsertionState,
  options: SheetOptions,
  _ownership: OwnershipToken,
}

impl<T: StyleTarget> StyleSheetManager<T> {
  pub fn new(
    document: &DocumentContext,
    target: T,
    options: SheetOptions,
  ) -> Result<Self, SheetError> {
    Self::hydrate(document, target, options, StylesheetInsertionState::default())
  }

  /// Take over a document whose rules (as recorded in `state`) were written elsewhere,
  /// typically by a server render.
  pub fn hydrate(
    document: &DocumentContext,
    target: T,
    options: SheetOptions,
    state: StylesheetInsertionState,
  ) -> Result<Self, SheetError> {
    let ownership = document.claim()?;
    tracing::debug!(present = state.len(), "Initialized stylesheet manager");

    Ok(Self {
      target,
      state,
      options,
      _ownership: ownership,
    })
  }

  /// Insert every rule not yet present. Returns how many rules were inserted.
  pub fn ensure_inserted<I, S>(&mut self, rules: I) -> Result<usize, SheetError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut inserted = 0;

    for rule in rules {
      let css = rule.as_ref().trim();
      let key = rule_key(css);
      if self.state.contains(&key) {
        continue;
      }

      check_rule(css)?;
      let point = InsertionPoint::from_rule(css);
      self.ensure_insertion_point(point)?;
      self.target.insert_rule(point, css)?;
      self.state.record(key);
      inserted += 1;

      tracing::trace!(?point, css, "Inserted rule");
    }

    Ok(inserted)
  }

  pub fn is_inserted(&self, class_name: &str) -> bool {
    self.state.contains(class_name)
  }

  pub fn state(&self) -> &StylesheetInsertionState {
    &self.state
  }

  pub fn target(&self) -> &T {
    &self.target
  }

  /// Give up ownership of the document and return the target.
  pub fn into_target(self) -> T {
    self.target
  }

  fn ensure_insertion_point(&mut self, point: InsertionPoint) -> Result<(), SheetError> {
    if self.state.has_insertion_point(point) {
      return Ok(());
    }

    let position = self.state.insertion_position(point);
    self
      .target
      .create_insertion_point(point, position, self.options.nonce.as_deref())?;
    self.state.add_insertion_point(point);
    Ok(())
  }
}

/// A stylesheet manager shared between threads of a multi-threaded host.
#[derive(Debug)]
pub struct SharedStyleSheet<T: StyleTarget> {
  inner: Arc<Mutex<StyleSheetManager<T>>>,
}

impl<T: StyleTarget> Clone for SharedStyleSheet<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<T: StyleTarget> SharedStyleSheet<T> {
  pub fn new(manager: StyleSheetManager<T>) -> Self {
    Self {
      inner: Arc::new(Mutex::new(manager)),
    }
  }

  pub fn ensure_inserted<I, S>(&self, rules: I) -> Result<usize, SheetError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.inner.lock().ensure_inserted(rules)
  }

  pub fn with_target<R>(&self, f: impl FnOnce(&T) -> R) -> R {
    f(self.inner.lock().target())
  }
}
