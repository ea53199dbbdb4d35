//! Canonical serialization for deterministic fingerprints.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap for maps in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(value)
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<u64> {
    let bytes = to_canonical_bytes(value)?;
    Ok(xxh64(&bytes, 0))
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    Ok(format!("{:016x}", canonical_hash(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct TestStruct {
        name: String,
        value: i32,
    }

    #[test]
    fn test_determinism() {
        let s = TestStruct {
            name: "test".to_string(),
            value: 42,
        };

        let h1 = canonical_hash(&s).unwrap();
        let h2 = canonical_hash(&s).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_map_insertion_order_irrelevant() {
        let mut a = BTreeMap::new();
        a.insert("b", 2);
        a.insert("a", 1);

        let mut b = BTreeMap::new();
        b.insert("a", 1);
        b.insert("b", 2);

        assert_eq!(canonical_hash_hex(&a).unwrap(), canonical_hash_hex(&b).unwrap());
        assert_eq!(canonical_hash_hex(&a).unwrap().len(), 16);
    }
}
