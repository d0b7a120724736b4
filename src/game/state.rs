//! Match State Definitions
//!
//! Shared match state replicated on both peers.
//! Uses BTreeMap for deterministic iteration order, so two replicas that
//! applied the same moves hash identically.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::coord::{CellIndex, Coord};
use crate::core::hash::{CellHasher, CommitHash};
use crate::{CELL_COUNT, FLEET_CELL_COUNT};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Player identifier as used by the turn framework (e.g. `"0"`, `"1"`).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// =============================================================================
// MARKS AND GUESSES
// =============================================================================

/// What a player knows about one cell of the opponent's board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Mark {
    /// Not yet revealed
    #[default]
    Unknown = 0,
    /// Revealed ship cell
    Hit = 1,
    /// Revealed water
    Miss = 2,
}

/// Outcome of a resolved guess.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessResult {
    /// Ship cell
    Hit,
    /// Water
    Miss,
}

impl GuessResult {
    /// Outcome implied by a cell bit.
    pub fn from_bit(bit: u8) -> Self {
        if bit == 1 {
            GuessResult::Hit
        } else {
            GuessResult::Miss
        }
    }

    /// Mark recorded for this outcome.
    pub fn mark(self) -> Mark {
        match self {
            GuessResult::Hit => Mark::Hit,
            GuessResult::Miss => Mark::Miss,
        }
    }
}

impl fmt::Display for GuessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuessResult::Hit => f.write_str("hit"),
            GuessResult::Miss => f.write_str("miss"),
        }
    }
}

/// One resolved guess. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessRecord {
    /// Guessing player
    pub by: PlayerId,
    /// Targeted cell on the opponent's board
    pub target: Coord,
    /// Proof-verified outcome
    pub result: GuessResult,
    /// Timestamp (ms since epoch) chosen by the board owner
    pub at: i64,
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// Per-player slice of the match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Commitment published and locked
    pub placement_confirmed: bool,

    /// Published Merkle root (lowercase hex), set at most once
    pub commitment_root_hex: Option<String>,

    /// This player's view of the opponent's board (100 cells)
    pub opponent_marks: Vec<Mark>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerState {
    /// Fresh player with nothing committed and nothing revealed.
    pub fn new() -> Self {
        Self {
            placement_confirmed: false,
            commitment_root_hex: None,
            opponent_marks: vec![Mark::Unknown; CELL_COUNT],
        }
    }

    /// Mark at a cell of the opponent's board.
    #[inline]
    pub fn mark(&self, index: CellIndex) -> Mark {
        self.opponent_marks
            .get(index.get())
            .copied()
            .unwrap_or_default()
    }

    /// Confirmed hits on the opponent's board.
    pub fn hit_count(&self) -> usize {
        self.opponent_marks.iter().filter(|m| **m == Mark::Hit).count()
    }

    /// Has this player sunk the whole fleet?
    pub fn has_sunk_fleet(&self) -> bool {
        self.hit_count() >= FLEET_CELL_COUNT
    }

    /// Hash this player's state for replica comparison.
    pub fn hash_into(&self, hasher: &mut CellHasher) {
        hasher.update_bool(self.placement_confirmed);
        match &self.commitment_root_hex {
            Some(root) => {
                hasher.update_u8(1);
                hasher.update_str(root);
            }
            None => hasher.update_u8(0),
        }
        for mark in &self.opponent_marks {
            hasher.update_u8(*mark as u8);
        }
    }
}

// =============================================================================
// MATCH PHASE
// =============================================================================

/// Current phase of the match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchPhase {
    /// Players place ships and publish commitments
    #[default]
    Placement,
    /// Guesses are answered with proof-carrying reveals
    Battle,
    /// Terminal: winner decided or match abandoned
    GameOver,
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPhase::Placement => f.write_str("placement"),
            MatchPhase::Battle => f.write_str("battle"),
            MatchPhase::GameOver => f.write_str("gameOver"),
        }
    }
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Complete shared state of a match.
///
/// Mutated only through the protocol moves in [`crate::game::protocol`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    /// Match identifier (bound into every commitment leaf)
    pub game_id: String,

    /// Current match phase
    pub phase: MatchPhase,

    /// Players who have committed (BTreeMap for deterministic iteration)
    pub players: BTreeMap<PlayerId, PlayerState>,

    /// Resolved guesses in order
    pub guesses: Vec<GuessRecord>,

    /// Set once a player confirms 17 hits
    pub winner: Option<PlayerId>,
}

impl MatchState {
    /// Create a new match with no players.
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            phase: MatchPhase::Placement,
            players: BTreeMap::new(),
            guesses: Vec::new(),
            winner: None,
        }
    }

    /// Get a player by ID.
    pub fn get_player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    /// The other registered player.
    pub fn opponent_of(&self, id: &PlayerId) -> Option<&PlayerId> {
        if !self.players.contains_key(id) {
            return None;
        }
        self.players.keys().find(|other| *other != id)
    }

    /// Check if match has ended.
    pub fn is_ended(&self) -> bool {
        matches!(self.phase, MatchPhase::GameOver)
    }

    /// Guesses made against `owner`'s board.
    pub fn guesses_against<'a>(&'a self, owner: &'a PlayerId) -> impl Iterator<Item = &'a GuessRecord> + 'a {
        self.guesses.iter().filter(move |g| &g.by != owner)
    }

    /// Compute hash of current state for replica comparison.
    pub fn compute_hash(&self) -> CommitHash {
        let mut hasher = CellHasher::for_match_state();
        hasher.update_str(&self.game_id);
        hasher.update_u8(self.phase as u8);

        // Hash all players in sorted order (BTreeMap guarantees this)
        hasher.update_u32(self.players.len() as u32);
        for (id, player) in &self.players {
            hasher.update_str(id.as_str());
            player.hash_into(&mut hasher);
        }

        hasher.update_u32(self.guesses.len() as u32);
        for guess in &self.guesses {
            hasher.update_str(guess.by.as_str());
            hasher.update_i32(guess.target.x);
            hasher.update_i32(guess.target.y);
            hasher.update_bool(guess.result == GuessResult::Hit);
            hasher.update_u64(guess.at as u64);
        }

        match &self.winner {
            Some(winner) => {
                hasher.update_u8(1);
                hasher.update_str(winner.as_str());
            }
            None => hasher.update_u8(0),
        }

        hasher.finalize()
    }
}

// =============================================================================
// TESTS
// =============================================================================
