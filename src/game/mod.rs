//! Game Logic Module
//!
//! Replicated match state and the protocol moves that mutate it. Pure and
//! synchronous: no I/O, no clocks, no randomness.
//!
//! ## Module Structure
//!
//! - `state`: Match state, player state, guess log
//! - `protocol`: Commit and reveal moves, rejections, replay

pub mod state;
pub mod protocol;

// Re-export key types
pub use state::{MatchState, PlayerState, PlayerId, MatchPhase, Mark, GuessResult, GuessRecord};
pub use protocol::{
    publish_commitment, apply_reveal, abandon, battle_ready, winner, is_terminal, replay,
    Rejection, RejectionKind, CommitOutcome, RevealOutcome, ProtocolMove,
};
