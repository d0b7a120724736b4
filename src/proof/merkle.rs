//! Merkle Tree Commitments
//!
//! Binary Merkle tree using SHA-256 over pre-hashed cell leaves.
//!
//! Odd levels never occur: leaves are padded with a domain-separated empty
//! hash up to the next power of two (100 cells become 128 leaves, depth 7).
//! Tree construction and proof verification both depend on this rule.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use crate::core::hash::{CommitHash, hash_from_hex, serde_hex};

/// Domain separator for Merkle tree internal nodes.
const MERKLE_NODE_DOMAIN: &[u8] = b"FLEET_COMMIT_MERKLE_NODE_V1";

/// Padding leaf (hash of empty domain).
fn empty_hash() -> CommitHash {
    let mut hasher = Sha256::new();
    hasher.update(b"FLEET_COMMIT_MERKLE_EMPTY_V1");
    hasher.finalize().into()
}

/// Which side of the running hash a sibling sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingPosition {
    /// Sibling is the left child: `H(sibling || current)`.
    Left,
    /// Sibling is the right child: `H(current || sibling)`.
    Right,
}

/// One step on the path from a leaf to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProofStep {
    /// Sibling hash at this level.
    #[serde(with = "serde_hex", rename = "siblingHex")]
    pub sibling: CommitHash,
    /// Side the sibling sits on.
    pub position: SiblingPosition,
}

/// Binary Merkle tree over pre-hashed leaves.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// All tree levels (padded leaves at index 0, root at last index)
    levels: Vec<Vec<CommitHash>>,
    /// Number of real (unpadded) leaves
    leaf_count: usize,
}

impl MerkleTree {
    /// Build a tree from leaf hashes.
    pub fn from_leaf_hashes(leaves: &[CommitHash]) -> Self {
        let mut levels = Vec::new();

        if leaves.is_empty() {
            return Self { levels, leaf_count: 0 };
        }

        let mut current_level = leaves.to_vec();

        // Pad to power of 2 for balanced tree
        let target_size = current_level.len().next_power_of_two();
        current_level.resize(target_size, empty_hash());

        levels.push(current_level.clone());

        // Build up to root
        while current_level.len() > 1 {
            let next_level: Vec<CommitHash> = current_level
                .chunks(2)
                .map(|pair| hash_nodes(&pair[0], &pair[1]))
                .collect();

            levels.push(next_level.clone());
            current_level = next_level;
        }

        Self { levels, leaf_count: leaves.len() }
    }

    /// Root hash. An empty tree has the padding hash as its root.
    pub fn root(&self) -> CommitHash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(empty_hash)
    }

    /// Number of real leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Leaf hash at `index`.
    pub fn leaf(&self, index: usize) -> Option<CommitHash> {
        if index >= self.leaf_count {
            return None;
        }
        self.levels.first()?.get(index).copied()
    }

    /// Inclusion proof for the leaf at `index`, `None` when out of range.
    pub fn generate_proof(&self, index: usize) -> Option<Vec<MerkleProofStep>> {
        if index >= self.leaf_count {
            return None;
        }

        let mut steps = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut current_index = index;

        // Walk up the tree, collecting sibling hashes
        for level in &self.levels[..self.levels.len().saturating_sub(1)] {
            let (sibling_index, position) = if current_index % 2 == 0 {
                (current_index + 1, SiblingPosition::Right)
            } else {
                (current_index - 1, SiblingPosition::Left)
            };

            steps.push(MerkleProofStep {
                sibling: level[sibling_index],
                position,
            });

            current_index /= 2;
        }

        Some(steps)
    }
}

/// Fold a leaf hash up a proof path.
pub fn compute_root(leaf_hash: &CommitHash, proof: &[MerkleProofStep]) -> CommitHash {
    proof.iter().fold(*leaf_hash, |current, step| match step.position {
        SiblingPosition::Right => hash_nodes(&current, &step.sibling),
        SiblingPosition::Left => hash_nodes(&step.sibling, &current),
    })
}

/// Verify a leaf hash and proof against a hex root (case-insensitive).
///
/// A malformed root never verifies.
pub fn verify_proof(leaf_hash: &CommitHash, proof: &[MerkleProofStep], root_hex: &str) -> bool {
    match hash_from_hex(root_hex) {
        Some(root) => compute_root(leaf_hash, proof) == root,
        None => false,
    }
}

/// Hash two child nodes with domain separation.
fn hash_nodes(left: &CommitHash, right: &CommitHash) -> CommitHash {
    let mut hasher = Sha256::new();
    hasher.update(MERKLE_NODE_DOMAIN);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}
