//! Shape of generated atomic class names.
//!
//! An atomic class is `_` followed by a 4 character group token (property and selector
//! context) and a 4 character value token, e.g. `_syaz5scu`. The leading five characters
//! form the slot that `ax` uses to decide which class names override each other.
//! A compressed class keeps its slot and swaps the value token for a short name from the
//! compression map: `_syaz_a`.

/// Length of the slot prefix, `_` plus the group token.
pub const ATOMIC_GROUP_LENGTH: usize = 5;

/// Length of a complete canonical class name.
pub const ATOMIC_CLASS_LENGTH: usize = 9;

/// Returns true for canonical (uncompressed) atomic class names such as `_syaz5scu`.
pub fn is_atomic_class_name(name: &str) -> bool {
  name.len() == ATOMIC_CLASS_LENGTH
    && name.starts_with('_')
    && name[1..]
      .bytes()
      .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

/// Splits a compressed class name (`_syaz_a`) into its slot and token.
pub fn split_compressed(name: &str) -> Option<(&str, &str)> {
  if name.len() <= ATOMIC_GROUP_LENGTH + 1 || !name.starts_with('_') {
    return None;
  }

  if name.as_bytes()[ATOMIC_GROUP_LENGTH] != b'_' {
    return None;
  }

  Some((&name[..ATOMIC_GROUP_LENGTH], &name[ATOMIC_GROUP_LENGTH + 1..]))
}

/// Slot identity of a class name. Non-atomic names are their own slot.
pub fn atomic_slot(name: &str) -> &str {
  if name.starts_with('_') && name.len() >= ATOMIC_GROUP_LENGTH && name.is_char_boundary(ATOMIC_GROUP_LENGTH) {
    &name[..ATOMIC_GROUP_LENGTH]
  } else {
    name
  }
}

/// Accepted characters are `^[a-zA-Z\-_]+[a-zA-Z\-_0-9]*$`.
pub fn is_css_identifier(value: &str) -> bool {
  let mut chars = value.chars();
  match chars.next() {
    Some(first) if first.is_ascii_alphabetic() || first == '-' || first == '_' => {}
    _ => return false,
  }

  chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
