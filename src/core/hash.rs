//! Commitment Hashing
//!
//! SHA-256 helpers shared by the Merkle tree, the leaf encoding and
//! replica hashing. Every hash is domain-separated; field order is part
//! of the commitment format and must never change.

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type CommitHash = [u8; 32];

/// Length of a hex-encoded [`CommitHash`].
pub const COMMIT_HASH_HEX_LEN: usize = 64;

/// Incremental hasher with length-prefixed field helpers.
///
/// Variable-length fields (ids, salts) are prefixed with their length so
/// that `("ab", "c")` and `("a", "bc")` never hash to the same value.
pub struct CellHasher {
    hasher: Sha256,
}

impl CellHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a match-state replica.
    pub fn for_match_state() -> Self {
        Self::new(b"FLEET_COMMIT_STATE_V1")
    }

    /// Update with raw bytes (no length prefix).
    #[inline]
    pub fn update_raw(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with length-prefixed bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.update_u32(bytes.len() as u32);
        self.hasher.update(bytes);
    }

    /// Update with a length-prefixed UTF-8 string.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_bytes(value.as_bytes());
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> CommitHash {
        self.hasher.finalize().into()
    }
}

/// Compute hash with domain separator.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> CommitHash {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a hash as lowercase hex.
pub fn hash_to_hex(hash: &CommitHash) -> String {
    hex::encode(hash)
}

/// Check that a string is exactly 64 hex characters (either case).
pub fn is_well_formed_hash_hex(value: &str) -> bool {
    value.len() == COMMIT_HASH_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parse a 64-character hex string into a hash. Case-insensitive.
pub fn hash_from_hex(value: &str) -> Option<CommitHash> {
    if !is_well_formed_hash_hex(value) {
        return None;
    }
    let bytes = hex::decode(value).ok()?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Some(out)
}

/// Serde adapter: `CommitHash` as a lowercase hex string.
pub mod serde_hex {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde::de::Error;

    use super::{hash_from_hex, hash_to_hex, CommitHash};

    /// Serialize as hex.
    pub fn serialize<S: Serializer>(hash: &CommitHash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hash_to_hex(hash))
    }

    /// Deserialize from hex (either case).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CommitHash, D::Error> {
        let s = String::deserialize(deserializer)?;
        hash_from_hex(&s).ok_or_else(|| D::Error::custom("expected 64 hex characters"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hasher_determinism() {
        let make_hash = || {
            let mut hasher = CellHasher::for_match_state();
            hasher.update_str("match");
            hasher.update_u32(7);
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_length_prefix_prevents_ambiguity() {
        let hash1 = {
            let mut h = CellHasher::new(b"test");
            h.update_str("ab");
            h.update_str("c");
            h.finalize()
        };

        let hash2 = {
            let mut h = CellHasher::new(b"test");
            h.update_str("a");
            h.update_str("bc");
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_domain_separation() {
        let data = [1u8, 2, 3, 4];
        assert_ne!(hash_with_domain(b"DOMAIN_A", &data), hash_with_domain(b"DOMAIN_B", &data));
    }

    #[test]
    fn test_hex_parsing_is_case_insensitive() {
        let hash = hash_with_domain(b"x", b"y");
        let lower = hash_to_hex(&hash);
        let upper = lower.to_uppercase();

        assert_eq!(hash_from_hex(&lower), Some(hash));
        assert_eq!(hash_from_hex(&upper), Some(hash));
    }

    #[test]
    fn test_malformed_hex_rejected() {
        assert!(!is_well_formed_hash_hex(""));
        assert!(!is_well_formed_hash_hex(&"a".repeat(63)));
        assert!(!is_well_formed_hash_hex(&"a".repeat(65)));
        assert!(!is_well_formed_hash_hex(&"g".repeat(64)));
        assert!(is_well_formed_hash_hex(&"aB".repeat(32)));
        assert_eq!(hash_from_hex(&"z".repeat(64)), None);
    }
}
