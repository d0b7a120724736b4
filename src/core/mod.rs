//! Core primitives.
//!
//! Coordinates, hashing and salts. Everything here is pure and deterministic
//! except salt generation, which draws from the caller's CSPRNG.

pub mod coord;
pub mod hash;
pub mod salt;

// Re-export core types
pub use coord::{Coord, CellIndex};
pub use hash::{CommitHash, CellHasher, hash_to_hex, hash_from_hex, is_well_formed_hash_hex};
pub use salt::{Salt, CellSalts, SaltError, MIN_SALT_BYTES};
