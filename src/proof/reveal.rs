//! Cell Reveals
//!
//! A reveal discloses one cell (bit + salt) with its Merkle path. The
//! verifier never sees the committer's other salts: it rebuilds the single
//! leaf and folds it up the path to the published root.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::coord::CellIndex;
use crate::core::hash::CommitHash;
use crate::core::salt::{Salt, SaltError};
use crate::proof::commitment::leaf_hash;
use crate::proof::merkle::{verify_proof, MerkleProofStep};

/// Reasons a reveal cannot even be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevealError {
    /// Index outside the board.
    #[error("cell index {0} out of range")]
    IndexOutOfRange(usize),
    /// Bit other than 0 or 1.
    #[error("cell bit must be 0 or 1, got {0}")]
    InvalidBit(u8),
    /// Salt is not valid hex.
    #[error("invalid salt: {0}")]
    Salt(#[from] SaltError),
}

/// One disclosed cell with its inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellReveal {
    /// Match the committed board belongs to.
    pub game_id: String,
    /// Owner of the committed board.
    pub owner_id: String,
    /// Cell index (`y * 10 + x`).
    pub index: usize,
    /// 1 = ship, 0 = water.
    pub bit: u8,
    /// Hex salt of this cell.
    pub salt_hex: String,
    /// Path from the leaf to the root.
    pub proof: Vec<MerkleProofStep>,
}

impl CellReveal {
    /// Recompute the leaf this reveal claims.
    pub fn leaf_hash(&self) -> Result<CommitHash, RevealError> {
        let index = CellIndex::new(self.index).ok_or(RevealError::IndexOutOfRange(self.index))?;
        if self.bit > 1 {
            return Err(RevealError::InvalidBit(self.bit));
        }
        let salt = Salt::from_hex(&self.salt_hex)?;
        Ok(leaf_hash(&self.game_id, &self.owner_id, index, self.bit, &salt))
    }

    /// Does this reveal verify against `root_hex`?
    ///
    /// Malformed reveals never verify.
    pub fn verify(&self, root_hex: &str) -> bool {
        match self.leaf_hash() {
            Ok(leaf) => verify_proof(&leaf, &self.proof, root_hex),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::bits::BoardBits;
    use crate::board::fleet::random_fleet;
    use crate::core::salt::CellSalts;
    use crate::proof::commitment::{cell_proof, commitment_root_hex, BoardCommitment};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sequential_salts() -> CellSalts {
        let hexes: Vec<String> = (0..100).map(|i| format!("{:02x}", i)).collect();
        CellSalts::from_hex(&hexes).unwrap()
    }

    #[test]
    fn test_single_set_cell_scenario() {
        let mut bits = BoardBits::empty();
        bits.set(CellIndex::new(0).unwrap(), true);
        let salts = sequential_salts();

        let root_hex = commitment_root_hex("m", "1", &bits, &salts);
        let index = CellIndex::new(0).unwrap();
        let proof = cell_proof("m", "1", &bits, &salts, index);
        let leaf = leaf_hash("m", "1", index, 1, salts.get(0));

        assert!(verify_proof(&leaf, &proof, &root_hex));
    }

    #[test]
    fn test_tampered_reveals_fail() {
        let mut rng = StdRng::seed_from_u64(11);
        let bits = BoardBits::from_ships(&random_fleet(&mut rng)).unwrap();
        let commitment = BoardCommitment::build("m", "1", bits, CellSalts::generate(&mut rng, 16));
        let root_hex = commitment.root_hex();

        let honest = commitment.reveal(CellIndex::new(17).unwrap());
        assert!(honest.verify(&root_hex));
        assert!(honest.verify(&root_hex.to_uppercase()));

        let mut lie = honest.clone();
        lie.bit ^= 1;
        assert!(!lie.verify(&root_hex));

        let mut lie = honest.clone();
        lie.salt_hex = "00".repeat(16);
        assert!(!lie.verify(&root_hex));

        let mut lie = honest.clone();
        lie.owner_id = "0".to_string();
        assert!(!lie.verify(&root_hex));

        let mut lie = honest.clone();
        lie.index = 18;
        assert!(!lie.verify(&root_hex));
    }

    #[test]
    fn test_malformed_reveals_do_not_hash() {
        let commitment = BoardCommitment::build("m", "1", BoardBits::empty(), sequential_salts());
        let mut reveal = commitment.reveal(CellIndex::new(3).unwrap());

        reveal.bit = 2;
        assert_eq!(reveal.leaf_hash(), Err(RevealError::InvalidBit(2)));

        reveal.bit = 0;
        reveal.salt_hex = "xyz".to_string();
        assert!(matches!(reveal.leaf_hash(), Err(RevealError::Salt(_))));

        reveal.index = 100;
        assert_eq!(reveal.leaf_hash(), Err(RevealError::IndexOutOfRange(100)));
        assert!(!reveal.verify(&commitment.root_hex()));
    }

    proptest! {
        #[test]
        fn prop_every_cell_proof_verifies(seed in any::<u64>(), index in 0usize..100) {
            let mut rng = StdRng::seed_from_u64(seed);
            let bits = BoardBits::from_ships(&random_fleet(&mut rng)).unwrap();
            let salts = CellSalts::generate(&mut rng, 16);
            let cell = CellIndex::new(index).unwrap();

            let root_hex = commitment_root_hex("g", "o", &bits, &salts);
            let proof = cell_proof("g", "o", &bits, &salts, cell);
            let leaf = leaf_hash("g", "o", cell, bits.bit(cell), salts.get(index));
            prop_assert!(verify_proof(&leaf, &proof, &root_hex));

            let forged = leaf_hash("g", "o", cell, bits.bit(cell) ^ 1, salts.get(index));
            prop_assert!(!verify_proof(&forged, &proof, &root_hex));
        }
    }
}
