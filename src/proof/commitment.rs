//! Board Commitment
//!
//! Binds a player to a ship layout before play starts. Each of the 100
//! cells becomes a salted leaf
//!
//! ```text
//! leaf[i] = SHA256(LEAF_DOMAIN || len|gameId || len|ownerId || i:u32 || bit:u8 || len|salt)
//! ```
//!
//! and the Merkle root over all leaves is the published commitment.
//! Including the game and owner ids stops a commitment from being replayed
//! in another match or attributed to another player.

use crate::board::bits::BoardBits;
use crate::core::coord::CellIndex;
use crate::core::hash::{CellHasher, CommitHash, hash_to_hex};
use crate::core::salt::{CellSalts, Salt};
use crate::proof::merkle::{MerkleProofStep, MerkleTree};
use crate::proof::reveal::CellReveal;

/// Domain separator for cell leaves.
const LEAF_DOMAIN: &[u8] = b"FLEET_COMMIT_LEAF_V1";

/// Hash one cell record.
pub fn leaf_hash(game_id: &str, owner_id: &str, index: CellIndex, bit: u8, salt: &Salt) -> CommitHash {
    let mut hasher = CellHasher::new(LEAF_DOMAIN);
    hasher.update_str(game_id);
    hasher.update_str(owner_id);
    hasher.update_u32(index.get() as u32);
    hasher.update_u8(bit);
    hasher.update_bytes(salt.as_bytes());
    hasher.finalize()
}

/// All 100 leaf hashes in index order.
fn board_leaves(game_id: &str, owner_id: &str, bits: &BoardBits, salts: &CellSalts) -> Vec<CommitHash> {
    CellIndex::all()
        .map(|index| leaf_hash(game_id, owner_id, index, bits.bit(index), salts.get(index.get())))
        .collect()
}

/// Commitment root for a board. Pure: same inputs, same root.
pub fn commitment_root(game_id: &str, owner_id: &str, bits: &BoardBits, salts: &CellSalts) -> CommitHash {
    MerkleTree::from_leaf_hashes(&board_leaves(game_id, owner_id, bits, salts)).root()
}

/// Commitment root as lowercase hex.
pub fn commitment_root_hex(game_id: &str, owner_id: &str, bits: &BoardBits, salts: &CellSalts) -> String {
    hash_to_hex(&commitment_root(game_id, owner_id, bits, salts))
}

/// Inclusion proof for one cell, rebuilt from the full board.
pub fn cell_proof(
    game_id: &str,
    owner_id: &str,
    bits: &BoardBits,
    salts: &CellSalts,
    index: CellIndex,
) -> Vec<MerkleProofStep> {
    MerkleTree::from_leaf_hashes(&board_leaves(game_id, owner_id, bits, salts))
        .generate_proof(index.get())
        .unwrap_or_default()
}

/// An owner's committed board with its tree kept for answering guesses.
#[derive(Clone, Debug)]
pub struct BoardCommitment {
    game_id: String,
    owner_id: String,
    bits: BoardBits,
    salts: CellSalts,
    tree: MerkleTree,
}

impl BoardCommitment {
    /// Build the commitment for a board.
    pub fn build(game_id: &str, owner_id: &str, bits: BoardBits, salts: CellSalts) -> Self {
        let tree = MerkleTree::from_leaf_hashes(&board_leaves(game_id, owner_id, &bits, &salts));
        Self {
            game_id: game_id.to_string(),
            owner_id: owner_id.to_string(),
            bits,
            salts,
            tree,
        }
    }

    /// Root hash.
    pub fn root(&self) -> CommitHash {
        self.tree.root()
    }

    /// Root as lowercase hex.
    pub fn root_hex(&self) -> String {
        hash_to_hex(&self.root())
    }

    /// Committed bits.
    pub fn bits(&self) -> &BoardBits {
        &self.bits
    }

    /// Committed salts.
    pub fn salts(&self) -> &CellSalts {
        &self.salts
    }

    /// Game the commitment is bound to.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Owner the commitment is bound to.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Inclusion proof for one cell.
    pub fn proof(&self, index: CellIndex) -> Vec<MerkleProofStep> {
        self.tree.generate_proof(index.get()).unwrap_or_default()
    }

    /// Everything an attacker needs to check one cell.
    pub fn reveal(&self, index: CellIndex) -> CellReveal {
        CellReveal {
            game_id: self.game_id.clone(),
            owner_id: self.owner_id.clone(),
            index: index.get(),
            bit: self.bits.bit(index),
            salt_hex: self.salts.get(index.get()).to_hex(),
            proof: self.proof(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::fleet::random_fleet;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sequential_salts() -> CellSalts {
        let hexes: Vec<String> = (0..100).map(|i| format!("{:02x}", i)).collect();
        CellSalts::from_hex(&hexes).unwrap()
    }

    fn random_board(seed: u64) -> (BoardBits, CellSalts) {
        let mut rng = StdRng::seed_from_u64(seed);
        let bits = BoardBits::from_ships(&random_fleet(&mut rng)).unwrap();
        let salts = CellSalts::generate(&mut rng, 16);
        (bits, salts)
    }

    #[test]
    fn test_root_is_deterministic() {
        let (bits, salts) = random_board(1);
        assert_eq!(
            commitment_root("m", "1", &bits, &salts),
            commitment_root("m", "1", &bits, &salts)
        );
    }

    #[test]
    fn test_root_binds_game_and_owner() {
        let (bits, salts) = random_board(2);
        let root = commitment_root("m", "1", &bits, &salts);
        assert_ne!(root, commitment_root("m2", "1", &bits, &salts));
        assert_ne!(root, commitment_root("m", "0", &bits, &salts));
    }

    #[test]
    fn test_id_boundaries_are_unambiguous() {
        let (bits, salts) = random_board(3);
        assert_ne!(
            commitment_root("ab", "c", &bits, &salts),
            commitment_root("a", "bc", &bits, &salts)
        );
    }

    #[test]
    fn test_board_commitment_matches_free_functions() {
        let (bits, salts) = random_board(4);
        let commitment = BoardCommitment::build("m", "1", bits, salts.clone());

        assert_eq!(commitment.root(), commitment_root("m", "1", &bits, &salts));
        let index = CellIndex::new(42).unwrap();
        assert_eq!(commitment.proof(index), cell_proof("m", "1", &bits, &salts, index));
    }

    #[test]
    fn test_reveal_carries_cell_data() {
        let mut bits = BoardBits::empty();
        bits.set(CellIndex::new(0).unwrap(), true);
        let commitment = BoardCommitment::build("m", "1", bits, sequential_salts());

        let reveal = commitment.reveal(CellIndex::new(0).unwrap());
        assert_eq!(reveal.index, 0);
        assert_eq!(reveal.bit, 1);
        assert_eq!(reveal.salt_hex, "00");
        assert_eq!(reveal.proof.len(), 7);

        let reveal = commitment.reveal(CellIndex::new(99).unwrap());
        assert_eq!(reveal.bit, 0);
        assert_eq!(reveal.salt_hex, "63");
    }

    proptest! {
        #[test]
        fn prop_single_change_changes_root(seed in any::<u64>(), index in 0usize..100, salt_byte in any::<u8>()) {
            let (bits, salts) = random_board(seed);
            let root = commitment_root("m", "1", &bits, &salts);
            let cell = CellIndex::new(index).unwrap();

            let mut flipped = bits;
            flipped.set(cell, !bits.is_set(index));
            prop_assert_ne!(root, commitment_root("m", "1", &flipped, &salts));

            let mut hexes = salts.to_hex();
            let replacement = format!("{:02x}", salt_byte);
            prop_assume!(hexes[index] != replacement);
            hexes[index] = replacement;
            let resalted = CellSalts::from_hex(&hexes).unwrap();
            prop_assert_ne!(root, commitment_root("m", "1", &bits, &resalted));
        }
    }
}
