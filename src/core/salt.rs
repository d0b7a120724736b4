//! Per-Cell Salts
//!
//! One secret salt per board cell, generated once per match and player.
//! Salts stay local until a cell is revealed or the whole board is disclosed.

use rand::{CryptoRng, RngCore};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::CELL_COUNT;

/// Minimum length of a freshly generated salt (bytes).
pub const MIN_SALT_BYTES: usize = 16;

/// Errors raised while parsing salts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaltError {
    /// Salt was an empty string.
    #[error("salt is empty")]
    Empty,
    /// Salt was not valid hex.
    #[error("salt is not valid hex: {0}")]
    InvalidHex(String),
    /// Wrong number of salts for a board.
    #[error("expected {expected} salts, got {got}")]
    WrongCount {
        /// Required count (one per cell).
        expected: usize,
        /// Supplied count.
        got: usize,
    },
}

/// A single cell salt. Hashed as its decoded bytes, so hex case is irrelevant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Parse from a hex string.
    pub fn from_hex(value: &str) -> Result<Self, SaltError> {
        if value.is_empty() {
            return Err(SaltError::Empty);
        }
        hex::decode(value)
            .map(Self)
            .map_err(|_| SaltError::InvalidHex(value.to_string()))
    }

    /// Draw a fresh salt of `len` bytes.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> Self {
        let mut bytes = vec![0u8; len.max(MIN_SALT_BYTES)];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Decoded salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

// Salts are secrets; keep them out of logs.
impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Salt(<{} bytes>)", self.0.len())
    }
}

impl TryFrom<String> for Salt {
    type Error = SaltError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Salt::from_hex(&value)
    }
}

impl From<Salt> for String {
    fn from(value: Salt) -> Self {
        value.to_hex()
    }
}

/// Exactly one salt per board cell, in index order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Salt>", into = "Vec<Salt>")]
pub struct CellSalts(Vec<Salt>);

impl CellSalts {
    /// Wrap a salt list, checking there is one per cell.
    pub fn new(salts: Vec<Salt>) -> Result<Self, SaltError> {
        if salts.len() != CELL_COUNT {
            return Err(SaltError::WrongCount {
                expected: CELL_COUNT,
                got: salts.len(),
            });
        }
        Ok(Self(salts))
    }

    /// Parse from hex strings.
    pub fn from_hex<S: AsRef<str>>(values: &[S]) -> Result<Self, SaltError> {
        let salts = values
            .iter()
            .map(|v| Salt::from_hex(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(salts)
    }

    /// Generate 100 fresh salts of `salt_bytes` bytes each (at least 16).
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, salt_bytes: usize) -> Self {
        Self((0..CELL_COUNT).map(|_| Salt::generate(rng, salt_bytes)).collect())
    }

    /// Salt for one cell.
    #[inline]
    pub fn get(&self, index: usize) -> &Salt {
        &self.0[index]
    }

    /// Hex encodings in index order.
    pub fn to_hex(&self) -> Vec<String> {
        self.0.iter().map(Salt::to_hex).collect()
    }

    /// Iterate in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Salt> {
        self.0.iter()
    }
}

impl TryFrom<Vec<Salt>> for CellSalts {
    type Error = SaltError;

    fn try_from(value: Vec<Salt>) -> Result<Self, Self::Error> {
        CellSalts::new(value)
    }
}

impl From<CellSalts> for Vec<Salt> {
    fn from(value: CellSalts) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_hex_case_does_not_matter() {
        let lower = Salt::from_hex("abcdef").unwrap();
        let upper = Salt::from_hex("ABCDEF").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.to_hex(), "abcdef");
    }

    #[test]
    fn test_invalid_salts_rejected() {
        assert_eq!(Salt::from_hex(""), Err(SaltError::Empty));
        assert!(matches!(Salt::from_hex("abc"), Err(SaltError::InvalidHex(_))));
        assert!(matches!(Salt::from_hex("zz"), Err(SaltError::InvalidHex(_))));
    }

    #[test]
    fn test_generated_salts_are_long_and_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let salts = CellSalts::generate(&mut rng, 4);

        assert!(salts.iter().all(|s| s.as_bytes().len() >= MIN_SALT_BYTES));
        let mut hexes = salts.to_hex();
        hexes.sort();
        hexes.dedup();
        assert_eq!(hexes.len(), CELL_COUNT);
    }

    #[test]
    fn test_wrong_salt_count() {
        let salts: Vec<String> = (0..99).map(|i| format!("{:02x}", i)).collect();
        assert_eq!(
            CellSalts::from_hex(&salts),
            Err(SaltError::WrongCount { expected: 100, got: 99 })
        );
    }

    #[test]
    fn test_debug_hides_salt() {
        let salt = Salt::from_hex("deadbeef").unwrap();
        assert!(!format!("{:?}", salt).contains("deadbeef"));
    }
}
