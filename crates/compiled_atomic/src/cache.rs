use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

use parking_lot::RwLock;
use xxhash_rust::xxh3::Xxh3Builder;

use crate::atomize::RuleGroup;
use crate::parse::Block;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  namespace: String,
  class_hash_prefix: String,
  digest: u64,
}

impl CacheKey {
  pub fn new(namespace: Option<&str>, class_hash_prefix: Option<&str>, block: &Block) -> Self {
    let mut hasher = Xxh3Builder::new().build_hasher();
    block.hash(&mut hasher);

    Self {
      namespace: namespace.unwrap_or_default().to_string(),
      class_hash_prefix: class_hash_prefix.unwrap_or_default().to_string(),
      digest: hasher.finish(),
    }
  }
}

/// Rule groups shared between compilations, keyed by the parsed declaration tree.
///
/// Two threads may compute the same group concurrently; both results are identical so
/// the later insert simply wins.
#[derive(Default)]
pub struct RuleGroupCache {
  inner: RwLock<HashMap<CacheKey, RuleGroup, Xxh3Builder>>,
}

impl RuleGroupCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &CacheKey) -> Option<RuleGroup> {
    self.inner.read().get(key).cloned()
  }

  pub fn insert(&self, key: CacheKey, group: RuleGroup) {
    self.inner.write().insert(key, group);
  }

  pub fn get_or_insert_with(&self, key: CacheKey, compute: impl FnOnce() -> RuleGroup) -> RuleGroup {
    if let Some(group) = self.get(&key) {
      tracing::trace!(group_hash = %group.group_hash, "Rule group cache hit");
      return group;
    }

    let group = compute();
    self.insert(key, group.clone());
    group
  }

  pub fn len(&self) -> usize {
    self.inner.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.read().is_empty()
  }

  pub fn clear(&self) {
    self.inner.write().clear();
  }
}
