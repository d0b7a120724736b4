//! Protocol Moves
//!
//! The only mutators of [`MatchState`]. Each move validates everything
//! first and mutates last, so a rejected move leaves the state untouched.
//! Rejections are values, never panics: a malformed or malicious peer
//! cannot crash the other side's state machine.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::core::coord::Coord;
use crate::core::hash::is_well_formed_hash_hex;
use crate::game::state::{GuessRecord, GuessResult, Mark, MatchPhase, MatchState, PlayerId, PlayerState};
use crate::proof::merkle::verify_proof;
use crate::proof::reveal::{CellReveal, RevealError};
use crate::PLAYER_COUNT;

/// Rejection category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectionKind {
    /// Bad hex, out-of-range coordinate, bad bit or salt.
    MalformedInput,
    /// Move attempted outside its phase.
    PhaseViolation,
    /// Duplicate commitment or reveal, wrong player, wrong match.
    ProtocolViolation,
    /// Proof does not verify against the published root.
    ProofFailure,
}

/// Why a move was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Move not allowed in the current phase.
    #[error("move requires phase {expected}, match is in {actual}")]
    WrongPhase {
        /// Phase the move needs.
        expected: MatchPhase,
        /// Phase the match is in.
        actual: MatchPhase,
    },

    /// Root is not 64 hex characters.
    #[error("commitment root is not 64 hex characters")]
    MalformedRoot,

    /// Player already published a commitment.
    #[error("player {0} already committed")]
    AlreadyCommitted(PlayerId),

    /// A third player tried to join.
    #[error("match already has {} players", PLAYER_COUNT)]
    MatchFull,

    /// Player is not part of this match.
    #[error("player {0} is not in this match")]
    UnknownPlayer(PlayerId),

    /// Target is off the board.
    #[error("target {0} is off the board")]
    TargetOutOfRange(Coord),

    /// Reveal belongs to another match.
    #[error("reveal is for match {got}, not {expected}")]
    WrongGame {
        /// This match.
        expected: String,
        /// Match named by the reveal.
        got: String,
    },

    /// Revealed board does not belong to the guesser's opponent.
    #[error("reveal owner {owner} is not the opponent of {guesser}")]
    NotOpponent {
        /// Guessing player.
        guesser: PlayerId,
        /// Owner named by the reveal.
        owner: String,
    },

    /// Reveal index does not match the target coordinate.
    #[error("reveal index {got} does not match target index {expected}")]
    IndexMismatch {
        /// Index of the target.
        expected: usize,
        /// Index in the reveal.
        got: usize,
    },

    /// Bit or salt cannot be hashed.
    #[error("malformed reveal: {0}")]
    MalformedReveal(#[from] RevealError),

    /// Guesser already has a mark at this index.
    #[error("cell {index} already revealed")]
    AlreadyRevealed {
        /// Cell index.
        index: usize,
    },

    /// Opponent has no published root to verify against.
    #[error("opponent {0} has not published a commitment")]
    OpponentNotCommitted(PlayerId),

    /// Proof does not verify.
    #[error("proof for cell {index} does not verify against {owner}'s commitment")]
    ProofFailed {
        /// Board owner.
        owner: PlayerId,
        /// Cell index.
        index: usize,
    },
}

impl Rejection {
    /// Category of this rejection.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::WrongPhase { .. } => RejectionKind::PhaseViolation,
            Rejection::MalformedRoot
            | Rejection::TargetOutOfRange(_)
            | Rejection::MalformedReveal(_) => RejectionKind::MalformedInput,
            Rejection::AlreadyCommitted(_)
            | Rejection::MatchFull
            | Rejection::UnknownPlayer(_)
            | Rejection::WrongGame { .. }
            | Rejection::NotOpponent { .. }
            | Rejection::IndexMismatch { .. }
            | Rejection::AlreadyRevealed { .. }
            | Rejection::OpponentNotCommitted(_) => RejectionKind::ProtocolViolation,
            Rejection::ProofFailed { .. } => RejectionKind::ProofFailure,
        }
    }
}

/// Result of an accepted commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// This commit moved the match into battle.
    pub battle_started: bool,
}

/// Result of an accepted reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealOutcome {
    /// Cell index marked.
    pub index: usize,
    /// Outcome recorded.
    pub result: GuessResult,
    /// Set when this reveal ended the match.
    pub winner: Option<PlayerId>,
}

fn require_phase(state: &MatchState, expected: MatchPhase) -> Result<(), Rejection> {
    if state.phase != expected {
        return Err(Rejection::WrongPhase {
            expected,
            actual: state.phase,
        });
    }
    Ok(())
}

/// Lock in `player`'s commitment root.
///
/// Registers the player on first commit. Battle starts once both players
/// have confirmed.
pub fn publish_commitment(
    state: &mut MatchState,
    player: &PlayerId,
    root_hex: &str,
) -> Result<CommitOutcome, Rejection> {
    require_phase(state, MatchPhase::Placement)?;

    if !is_well_formed_hash_hex(root_hex) {
        return Err(Rejection::MalformedRoot);
    }

    match state.players.get(player) {
        Some(existing) if existing.placement_confirmed => {
            return Err(Rejection::AlreadyCommitted(player.clone()));
        }
        Some(_) => {}
        None if state.players.len() >= PLAYER_COUNT => return Err(Rejection::MatchFull),
        None => {}
    }

    // All checks passed: mutate.
    let entry = state.players.entry(player.clone()).or_insert_with(PlayerState::new);
    entry.commitment_root_hex = Some(root_hex.to_ascii_lowercase());
    entry.placement_confirmed = true;

    let battle_started = battle_ready(state);
    if battle_started {
        state.phase = MatchPhase::Battle;
        debug!(game_id = %state.game_id, "both commitments locked, battle begins");
    }

    Ok(CommitOutcome { battle_started })
}

/// Apply a proof-carrying reveal answering `guesser`'s shot at `target`.
pub fn apply_reveal(
    state: &mut MatchState,
    guesser: &PlayerId,
    target: Coord,
    reveal: &CellReveal,
    at: i64,
) -> Result<RevealOutcome, Rejection> {
    require_phase(state, MatchPhase::Battle)?;

    let target_index = target.to_index().ok_or(Rejection::TargetOutOfRange(target))?;

    if reveal.game_id != state.game_id {
        return Err(Rejection::WrongGame {
            expected: state.game_id.clone(),
            got: reveal.game_id.clone(),
        });
    }

    let guesser_state = state
        .get_player(guesser)
        .ok_or_else(|| Rejection::UnknownPlayer(guesser.clone()))?;

    let opponent = match state.opponent_of(guesser) {
        Some(opponent) if opponent.as_str() == reveal.owner_id => opponent.clone(),
        _ => {
            return Err(Rejection::NotOpponent {
                guesser: guesser.clone(),
                owner: reveal.owner_id.clone(),
            })
        }
    };

    if reveal.index != target_index.get() {
        return Err(Rejection::IndexMismatch {
            expected: target_index.get(),
            got: reveal.index,
        });
    }

    if guesser_state.mark(target_index) != Mark::Unknown {
        return Err(Rejection::AlreadyRevealed { index: target_index.get() });
    }

    let root_hex = state
        .get_player(&opponent)
        .and_then(|p| p.commitment_root_hex.as_deref())
        .ok_or_else(|| Rejection::OpponentNotCommitted(opponent.clone()))?;

    let leaf = reveal.leaf_hash()?;
    if !verify_proof(&leaf, &reveal.proof, root_hex) {
        return Err(Rejection::ProofFailed {
            owner: opponent,
            index: target_index.get(),
        });
    }

    // All checks passed: mutate.
    let result = GuessResult::from_bit(reveal.bit);
    let sunk_fleet = match state.players.get_mut(guesser) {
        Some(player) => {
            player.opponent_marks[target_index.get()] = result.mark();
            player.has_sunk_fleet()
        }
        None => return Err(Rejection::UnknownPlayer(guesser.clone())),
    };

    state.guesses.push(GuessRecord {
        by: guesser.clone(),
        target,
        result,
        at,
    });

    if sunk_fleet {
        state.winner = Some(guesser.clone());
        state.phase = MatchPhase::GameOver;
        debug!(game_id = %state.game_id, winner = %guesser, "fleet sunk");
    }

    Ok(RevealOutcome {
        index: target_index.get(),
        result,
        winner: state.winner.clone(),
    })
}

/// End the match without a winner. Idempotent.
pub fn abandon(state: &mut MatchState) {
    state.phase = MatchPhase::GameOver;
}

/// Placement is over: exactly two players, both confirmed.
pub fn battle_ready(state: &MatchState) -> bool {
    state.players.len() == PLAYER_COUNT && state.players.values().all(|p| p.placement_confirmed)
}

/// Player whose confirmed hits reached the fleet size, if any.
pub fn winner(state: &MatchState) -> Option<&PlayerId> {
    state
        .players
        .iter()
        .find(|(_, p)| p.has_sunk_fleet())
        .map(|(id, _)| id)
}

/// No further moves will apply.
pub fn is_terminal(state: &MatchState) -> bool {
    state.is_ended()
}

/// A verified move, as replayed by each peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "move", rename_all = "camelCase")]
pub enum ProtocolMove {
    /// `publish_commitment`
    #[serde(rename_all = "camelCase")]
    PublishCommitment {
        /// Committing player.
        player: PlayerId,
        /// Published root.
        root_hex: String,
    },
    /// `apply_reveal`
    #[serde(rename_all = "camelCase")]
    ApplyReveal {
        /// Guessing player.
        guesser: PlayerId,
        /// Targeted cell.
        target: Coord,
        /// Owner's answer.
        reveal: CellReveal,
        /// Owner's timestamp.
        at: i64,
    },
}

impl ProtocolMove {
    /// Apply this move to `state`.
    pub fn apply(&self, state: &mut MatchState) -> Result<(), Rejection> {
        match self {
            ProtocolMove::PublishCommitment { player, root_hex } => {
                publish_commitment(state, player, root_hex).map(|_| ())
            }
            ProtocolMove::ApplyReveal { guesser, target, reveal, at } => {
                apply_reveal(state, guesser, *target, reveal, *at).map(|_| ())
            }
        }
    }
}

/// Rebuild a match from its move log. Rejected moves are skipped, exactly
/// as they were skipped live.
pub fn replay(game_id: &str, moves: &[ProtocolMove]) -> (MatchState, Vec<(usize, Rejection)>) {
    let mut state = MatchState::new(game_id);
    let mut rejected = Vec::new();

    for (i, mv) in moves.iter().enumerate() {
        if let Err(rejection) = mv.apply(&mut state) {
            rejected.push((i, rejection));
        }
    }

    (state, rejected)
}
