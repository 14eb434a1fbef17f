use indexmap::IndexMap;

use crate::class_name::{atomic_slot, split_compressed};

/// Join class name lists, with later atomic class names overriding earlier ones that
/// target the same slot (same property in the same selector context).
///
/// Lists are given from lowest to highest priority. The losing class name is removed
/// rather than left for the cascade to resolve, so the stylesheet's bucket order never
/// has to know about composition. Compressed names (`_syaz_a`) compete on their slot and
/// render as their short token. Non-atomic class names are kept and deduplicated.
///
/// ```
/// use compiled_atomic_runtime::ax;
///
/// assert_eq!(ax(["_syaz5scu _1wyb1fwx", "_syaz13q2"]), "_1wyb1fwx _syaz13q2");
/// ```
pub fn ax<I, S>(class_names: I) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let lists: Vec<S> = class_names.into_iter().collect();

  if let [only] = lists.as_slice() {
    let only = only.as_ref().trim();
    if !only.contains(char::is_whitespace) && split_compressed(only).is_none() {
      return only.to_string();
    }
  }

  let mut found: IndexMap<&str, &str> = IndexMap::new();
  for list in &lists {
    for class_name in list.as_ref().split_whitespace() {
      let slot = atomic_slot(class_name);
      let rendered = split_compressed(class_name)
        .map(|(_, token)| token)
        .unwrap_or(class_name);

      found.shift_remove(slot);
      found.insert(slot, rendered);
    }
  }

  found.values().copied().collect::<Vec<_>>().join(" ")
}

/// Format the runtime value of a generated CSS custom property.
///
/// `None` leaves the property unset so the `var()` reference falls back to the
/// property's initial value. The suffix carries a unit that was written directly after
/// the interpolation in source (`${width}px`).
pub fn ix(value: Option<&str>, suffix: &str, prefix: &str) -> Option<String> {
  value.map(|value| format!("{prefix}{value}{suffix}"))
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn later_slot_wins() {
    assert_eq!(ax(["_syaz5scu _1wyb1fwx", "_syaz13q2"]), "_1wyb1fwx _syaz13q2");
  }

  #[test]
  fn keeps_non_colliding_order() {
    assert_eq!(
      ax(["_1e0c1ule _syaz5scu", "_1wyb1fwx"]),
      "_1e0c1ule _syaz5scu _1wyb1fwx"
    );
  }

  #[test]
  fn skips_empty_lists() {
    assert_eq!(ax(["", "_syaz5scu", "   "]), "_syaz5scu");
    assert_eq!(ax(Vec::<&str>::new()), "");
  }

  #[test]
  fn single_list_passes_through() {
    assert_eq!(ax(["_syaz5scu"]), "_syaz5scu");
    assert_eq!(ax([" button "]), "button");
  }

  #[test]
  fn dedupes_plain_class_names() {
    assert_eq!(ax(["button active", "active primary"]), "button active primary");
  }

  #[test]
  fn decompresses_and_overrides_compressed_names() {
    assert_eq!(ax(["_syaz_a _1wyb1fwx"]), "a _1wyb1fwx");
    assert_eq!(ax(["_syaz_a", "_syaz13q2"]), "_syaz13q2");
    assert_eq!(ax(["_syaz13q2", "_syaz_a"]), "a");
  }

  #[test]
  fn optional_lists_flatten() {
    let is_active = false;
    let lists = [Some("_syaz5scu"), is_active.then_some("_syaz13q2")];
    assert_eq!(ax(lists.into_iter().flatten()), "_syaz5scu");
  }

  #[test]
  fn formats_variable_values() {
    assert_eq!(ix(Some("12"), "px", ""), Some("12px".to_string()));
    assert_eq!(ix(Some("a"), "", "\""), Some("\"a".to_string()));
    assert_eq!(ix(None, "px", ""), None);
  }
}
