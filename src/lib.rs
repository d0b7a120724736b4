//! # Fleet Commit
//!
//! Commitment, proof and audit protocol for peer-to-peer Battleship without
//! a trusted referee.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    FLEET COMMIT                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── coord.rs    - Board coordinates and cell indices        │
//! │  ├── hash.rs     - Domain-separated SHA-256, hex helpers     │
//! │  └── salt.rs     - Per-cell salts                            │
//! │                                                              │
//! │  board/          - Layouts                                   │
//! │  ├── bits.rs     - 100-cell occupancy grid                   │
//! │  ├── fleet.rs    - Fleet legality, random placement          │
//! │  └── cache.rs    - Persisted local layout                    │
//! │                                                              │
//! │  proof/          - Commitments and proofs                    │
//! │  ├── merkle.rs   - Padded binary Merkle tree                 │
//! │  ├── commitment.rs - Board root, BoardCommitment             │
//! │  ├── reveal.rs   - Single-cell reveals                       │
//! │  └── audit.rs    - Full-disclosure audit                     │
//! │                                                              │
//! │  game/           - Replicated match (deterministic)          │
//! │  ├── state.rs    - Match and player state                    │
//! │  └── protocol.rs - Commit and reveal moves                   │
//! │                                                              │
//! │  network/        - Signalling (non-deterministic)            │
//! │  ├── signal.rs   - Signal messages                           │
//! │  ├── transport.rs- Local bus, WebSocket channel              │
//! │  └── session.rs  - Per-player session driver                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Trust Model
//!
//! Each player commits to a Merkle root over 100 salted cell leaves before
//! play. Every answer to a guess carries the cell's bit, salt and inclusion
//! proof, so a lie is caught on the spot. After game over a full disclosure
//! lets each side check the fleet was legal and that every recorded outcome
//! agrees with the committed board.
//!
//! The `core/`, `board/`, `proof/` and `game/` modules are pure: identical
//! inputs give identical roots, proofs and states on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod board;
pub mod proof;
pub mod game;
pub mod network;
pub mod config;

// Re-export commonly used types
pub use core::{Coord, CellIndex, CommitHash, Salt, CellSalts};
pub use board::{BoardBits, PlacedShip, Orientation, validate_fleet};
pub use proof::{BoardCommitment, CellReveal, MerkleProofStep, AuditReport};
pub use game::{MatchState, PlayerState, PlayerId, MatchPhase, Rejection};
pub use network::{PeerSession, SignalMessage, SignalTransport};
pub use config::PeerConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Board side length.
pub const BOARD_SIZE: usize = 10;

/// Cells per board.
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// Ship lengths of the fleet.
pub const FLEET_SIZES: [u8; 5] = [5, 4, 3, 3, 2];

/// Cells covered by the whole fleet (sum of `FLEET_SIZES`).
pub const FLEET_CELL_COUNT: usize = 17;

/// Players per match.
pub const PLAYER_COUNT: usize = 2;

/// Merkle proof length for a board (100 leaves padded to 128).
pub const PROOF_DEPTH: usize = CELL_COUNT.next_power_of_two().trailing_zeros() as usize;
