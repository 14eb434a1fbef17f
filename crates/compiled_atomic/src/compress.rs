//! Class name compression through a supplied [`CompressionMap`].

use std::collections::BTreeSet;

use compiled_atomic_runtime::CompressionMap;

/// Runtime form of each class name: mapped atomic classes become `_gggg_token`, every
/// other name passes through in order.
pub fn compress_class_names<'a, I>(names: I, map: &CompressionMap) -> Vec<String>
where
  I: IntoIterator<Item = &'a str>,
{
  names
    .into_iter()
    .map(|name| map.compress(name).unwrap_or_else(|| name.to_string()))
    .collect()
}

/// [`compress_class_names`] over a space separated class list.
pub fn compress_class_list(class_list: &str, map: &CompressionMap) -> String {
  compress_class_names(class_list.split_whitespace(), map).join(" ")
}

/// Map keys that none of `class_names` used.
pub fn unused_entries<'a, I>(map: &CompressionMap, class_names: I) -> Vec<String>
where
  I: IntoIterator<Item = &'a str>,
{
  let used: BTreeSet<&str> = class_names
    .into_iter()
    .map(|name| name.strip_prefix('_').unwrap_or(name))
    .collect();

  map
    .keys()
    .filter(|key| !used.contains(key))
    .map(str::to_string)
    .collect()
}
