//! Signal Messages
//!
//! Out-of-band messages exchanged between the two peers. JSON on the wire,
//! tagged by `"type"`. Every payload is validated at the boundary before it
//! reaches the protocol moves: shape errors are caught here, proof errors
//! are caught by the moves.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::board::bits::{BitsError, BoardBits};
use crate::core::coord::Coord;
use crate::core::salt::{CellSalts, Salt, SaltError};
use crate::proof::merkle::MerkleProofStep;
use crate::proof::reveal::CellReveal;
use crate::core::hash::is_well_formed_hash_hex;
use crate::PROOF_DEPTH;

// =============================================================================
// SIGNALS
// =============================================================================

/// Any signal a peer can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SignalMessage {
    /// Commitment publication.
    Commit(CommitSignal),
    /// Attacker asks the owner about a cell.
    Guess(GuessSignal),
    /// Owner answers with a proof-carrying reveal.
    Reveal(RevealSignal),
    /// Whole board and salts, after game over.
    FullReveal(FullRevealSignal),
}

/// Publishes a player's commitment root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSignal {
    /// Match id.
    pub game_id: String,
    /// Committing player.
    pub player_id: String,
    /// Merkle root (64 hex chars).
    pub root_hex: String,
}

/// A shot at the owner's board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessSignal {
    /// Match id.
    pub game_id: String,
    /// Attacker.
    pub from_player_id: String,
    /// Targeted cell.
    pub coord: Coord,
}

/// The owner's answer to a guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealSignal {
    /// Match id.
    pub game_id: String,
    /// Attacker the reveal answers.
    pub to_player_id: String,
    /// Board owner.
    pub owner_id: String,
    /// Targeted cell.
    pub coord: Coord,
    /// `coord` as a cell index.
    pub index: usize,
    /// 1 = ship, 0 = water.
    pub bit: u8,
    /// Cell salt.
    pub salt_hex: String,
    /// Inclusion proof.
    pub proof: Vec<MerkleProofStep>,
    /// Owner's timestamp (ms).
    pub at: i64,
}

/// Full disclosure of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullRevealSignal {
    /// Match id.
    pub game_id: String,
    /// Recipient.
    pub to_player_id: String,
    /// Board owner.
    pub owner_id: String,
    /// 100 cells of 0/1.
    pub board_bits: Vec<u8>,
    /// 100 hex salts.
    pub salts_hex: Vec<String>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Why an incoming signal was dropped.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Not a signal at all.
    #[error("malformed signal JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Required id is empty.
    #[error("signal field {0} is empty")]
    EmptyField(&'static str),

    /// Root is not 64 hex characters.
    #[error("root is not 64 hex characters")]
    MalformedRoot,

    /// Coordinate off the board.
    #[error("coordinate {0} is off the board")]
    CoordOutOfRange(Coord),

    /// Index disagrees with the coordinate.
    #[error("index {index} does not match coordinate {coord}")]
    IndexMismatch {
        /// Claimed coordinate.
        coord: Coord,
        /// Claimed index.
        index: usize,
    },

    /// Bit other than 0 or 1.
    #[error("bit must be 0 or 1, got {0}")]
    InvalidBit(u8),

    /// Proof has the wrong number of steps.
    #[error("proof must have {expected} steps, got {got}")]
    ProofLength {
        /// Tree depth.
        expected: usize,
        /// Steps supplied.
        got: usize,
    },

    /// Salt is not valid hex, or the wrong number of salts.
    #[error("invalid salt: {0}")]
    Salt(#[from] SaltError),

    /// Board bits malformed.
    #[error("invalid board bits: {0}")]
    Bits(#[from] BitsError),
}

// =============================================================================
// VALIDATION
// =============================================================================

fn require_non_empty(value: &str, field: &'static str) -> Result<(), SignalError> {
    if value.is_empty() {
        return Err(SignalError::EmptyField(field));
    }
    Ok(())
}

fn require_on_board(coord: Coord) -> Result<usize, SignalError> {
    coord
        .to_index()
        .map(|i| i.get())
        .ok_or(SignalError::CoordOutOfRange(coord))
}

impl SignalMessage {
    /// Match this signal belongs to.
    pub fn game_id(&self) -> &str {
        match self {
            SignalMessage::Commit(s) => &s.game_id,
            SignalMessage::Guess(s) => &s.game_id,
            SignalMessage::Reveal(s) => &s.game_id,
            SignalMessage::FullReveal(s) => &s.game_id,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Commit(_) => "commit",
            SignalMessage::Guess(_) => "guess",
            SignalMessage::Reveal(_) => "reveal",
            SignalMessage::FullReveal(_) => "fullReveal",
        }
    }

    /// Check payload shape.
    pub fn validate(&self) -> Result<(), SignalError> {
        require_non_empty(self.game_id(), "gameId")?;

        match self {
            SignalMessage::Commit(s) => {
                require_non_empty(&s.player_id, "playerId")?;
                if !is_well_formed_hash_hex(&s.root_hex) {
                    return Err(SignalError::MalformedRoot);
                }
            }
            SignalMessage::Guess(s) => {
                require_non_empty(&s.from_player_id, "fromPlayerId")?;
                require_on_board(s.coord)?;
            }
            SignalMessage::Reveal(s) => {
                require_non_empty(&s.to_player_id, "toPlayerId")?;
                require_non_empty(&s.owner_id, "ownerId")?;
                let index = require_on_board(s.coord)?;
                if index != s.index {
                    return Err(SignalError::IndexMismatch { coord: s.coord, index: s.index });
                }
                if s.bit > 1 {
                    return Err(SignalError::InvalidBit(s.bit));
                }
                Salt::from_hex(&s.salt_hex)?;
                if s.proof.len() != PROOF_DEPTH {
                    return Err(SignalError::ProofLength {
                        expected: PROOF_DEPTH,
                        got: s.proof.len(),
                    });
                }
            }
            SignalMessage::FullReveal(s) => {
                require_non_empty(&s.to_player_id, "toPlayerId")?;
                require_non_empty(&s.owner_id, "ownerId")?;
                s.disclosure()?;
            }
        }

        Ok(())
    }

    /// Serialize to JSON.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse and validate.
    pub fn decode(text: &str) -> Result<Self, SignalError> {
        let message: SignalMessage = serde_json::from_str(text)?;
        message.validate()?;
        Ok(message)
    }
}

impl RevealSignal {
    /// Wrap a reveal for transmission.
    pub fn new(to_player_id: &str, coord: Coord, reveal: CellReveal, at: i64) -> Self {
        Self {
            game_id: reveal.game_id,
            to_player_id: to_player_id.to_string(),
            owner_id: reveal.owner_id,
            coord,
            index: reveal.index,
            bit: reveal.bit,
            salt_hex: reveal.salt_hex,
            proof: reveal.proof,
            at,
        }
    }

    /// The reveal the protocol move consumes.
    pub fn to_cell_reveal(&self) -> CellReveal {
        CellReveal {
            game_id: self.game_id.clone(),
            owner_id: self.owner_id.clone(),
            index: self.index,
            bit: self.bit,
            salt_hex: self.salt_hex.clone(),
            proof: self.proof.clone(),
        }
    }
}

impl FullRevealSignal {
    /// Decode the disclosed board.
    pub fn disclosure(&self) -> Result<(BoardBits, CellSalts), SignalError> {
        let bits = BoardBits::from_slice(&self.board_bits)?;
        let salts = CellSalts::from_hex(&self.salts_hex)?;
        Ok((bits, salts))
    }
}
