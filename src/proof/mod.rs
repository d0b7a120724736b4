//! Commitment and Proof System
//!
//! Binds each player to a board before play and lets every later claim
//! about that board be checked against the binding:
//! - Salted per-cell leaves hashed into a Merkle root
//! - Single-cell reveals with inclusion proofs
//! - Full disclosure audit after game over
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  merkle.rs      - Padded binary Merkle tree (128 leaves)    │
//! │  commitment.rs  - Cell leaves, board root, BoardCommitment  │
//! │  reveal.rs      - CellReveal and proof verification         │
//! │  audit.rs       - Full-disclosure audit, DisclosureRecord   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod merkle;
pub mod commitment;
pub mod reveal;
pub mod audit;

// Re-export key types
pub use merkle::{MerkleTree, MerkleProofStep, SiblingPosition, compute_root, verify_proof};
pub use commitment::{
    leaf_hash, commitment_root, commitment_root_hex, cell_proof, BoardCommitment,
};
pub use reveal::{CellReveal, RevealError};
pub use audit::{
    audit, AuditRequest, AuditReport, GuessMismatch,
    DisclosureRecord, DisclosureError,
};
