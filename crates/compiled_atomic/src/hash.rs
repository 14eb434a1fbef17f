//! Class name hashing.
//!
//! 32-bit murmurhash2 rendered in base36. Class names built from these tokens are part
//! of the output contract: changing anything here changes every emitted class name, so
//! bump [`HASH_ALGORITHM`] along with it.

/// Version tag of the class name scheme.
pub const HASH_ALGORITHM: &str = "murmur2-base36/v1";

/// Width of the group and value tokens of a class name.
pub const TOKEN_LENGTH: usize = 4;

const M: u32 = 0x5bd1e995;

/// murmurhash2 of the UTF-8 bytes of `key`.
pub fn murmur2(key: &str, seed: u32) -> u32 {
  let bytes = key.as_bytes();
  let mut h = seed ^ (bytes.len() as u32);

  let mut chunks = bytes.chunks_exact(4);
  for chunk in &mut chunks {
    let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    k = k.wrapping_mul(M);
    k ^= k >> 24;
    k = k.wrapping_mul(M);
    h = h.wrapping_mul(M) ^ k;
  }

  let tail = chunks.remainder();
  if !tail.is_empty() {
    if tail.len() >= 3 {
      h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
      h ^= (tail[1] as u32) << 8;
    }
    h ^= tail[0] as u32;
    h = h.wrapping_mul(M);
  }

  h ^= h >> 13;
  h = h.wrapping_mul(M);
  h ^ (h >> 15)
}

/// Base36 murmurhash2 of `key` with seed 0.
pub fn hash(key: &str) -> String {
  to_base36(murmur2(key, 0))
}

/// The first [`TOKEN_LENGTH`] characters of [`hash`], left padded with `0` so every token
/// has the same width.
pub fn hash_token(key: &str) -> String {
  let full = hash(key);
  let token: String = full.chars().take(TOKEN_LENGTH).collect();
  format!("{token:0>width$}", width = TOKEN_LENGTH)
}

fn to_base36(mut num: u32) -> String {
  const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

  if num == 0 {
    return "0".to_string();
  }

  let mut digits = Vec::with_capacity(7);
  while num > 0 {
    digits.push(DIGITS[(num % 36) as usize] as char);
    num /= 36;
  }

  digits.iter().rev().collect()
}
