//! Cache-key hashing.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::Result;

/// SHA-256 of raw bytes as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 of the canonical JSON form of `value`.
///
/// The value is round-tripped through `serde_json::Value`, whose maps are
/// key-sorted, so field and map order never change the key.
pub fn canonical_json_hash<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let canonical = serde_json::to_value(value)?;
    Ok(sha256_hex(serde_json::to_string(&canonical)?.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(sha256_hex(b"abc"), sha256_hex(b"abc"));
        assert_eq!(sha256_hex(b"abc").len(), 64);
    }

    #[test]
    fn test_map_order_does_not_matter() {
        let a: HashMap<&str, i32> = [("x", 1), ("y", 2)].into_iter().collect();
        let b: HashMap<&str, i32> = [("y", 2), ("x", 1)].into_iter().collect();
        assert_eq!(
            canonical_json_hash(&a).unwrap(),
            canonical_json_hash(&b).unwrap()
        );
    }

    #[test]
    fn test_different_content_different_hash() {
        assert_ne!(
            canonical_json_hash(&[1, 2]).unwrap(),
            canonical_json_hash(&[2, 1]).unwrap()
        );
    }
}
