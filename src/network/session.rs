//! Peer Session
//!
//! One player's side of a match: the private layout (ships, salts, tree),
//! the local replica of the shared state and the move log. Turns incoming
//! signals into protocol moves and produces the signals to send back.
//!
//! Echoes are expected (a broadcast bus delivers a peer's own signals back
//! to it) and are ignored.

use std::collections::BTreeMap;

use rand::{CryptoRng, Rng};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::board::bits::BoardBits;
use crate::board::cache::{CacheError, LocalLayoutCache};
use crate::board::fleet::{random_fleet, validate_fleet, FleetError, PlacedShip, PlacementError};
use crate::core::coord::{CellIndex, Coord};
use crate::core::hash::hash_from_hex;
use crate::core::salt::CellSalts;
use crate::game::protocol::{self, ProtocolMove, Rejection};
use crate::game::state::{Mark, MatchPhase, MatchState, PlayerId};
use crate::network::signal::{
    CommitSignal, FullRevealSignal, GuessSignal, RevealSignal, SignalError, SignalMessage,
};
use crate::proof::audit::{AuditReport, DisclosureRecord};
use crate::proof::commitment::BoardCommitment;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Ships do not rasterize.
    #[error("invalid placement: {0}")]
    Placement(#[from] PlacementError),

    /// Layout is not a legal fleet.
    #[error("illegal fleet: {0}")]
    Fleet(#[from] FleetError),

    /// Cached layout unusable.
    #[error("layout cache: {0}")]
    Cache(#[from] CacheError),

    /// Protocol move rejected.
    #[error("move rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Signal payload unusable.
    #[error("bad signal: {0}")]
    Signal(#[from] SignalError),

    /// Operation needs another phase.
    #[error("not allowed in phase {0}")]
    WrongPhase(MatchPhase),

    /// No opponent registered yet.
    #[error("no opponent has joined")]
    NoOpponent,

    /// Target already resolved.
    #[error("cell {0} already resolved")]
    AlreadyResolved(Coord),

    /// Target off the board.
    #[error("target {0} is off the board")]
    OffBoard(Coord),

    /// Opponent disclosed before committing.
    #[error("no published root for {0}")]
    NoPublishedRoot(PlayerId),

    /// Owner already disclosed a different board.
    #[error("conflicting disclosure from {0}")]
    ConflictingDisclosure(PlayerId),
}

/// A local player's driver for one match.
pub struct PeerSession {
    player_id: PlayerId,
    ships: Vec<PlacedShip>,
    commitment: BoardCommitment,
    state: MatchState,
    moves: Vec<ProtocolMove>,
    disclosures: BTreeMap<PlayerId, DisclosureRecord>,
    audits: BTreeMap<PlayerId, AuditReport>,
}

impl PeerSession {
    /// Start a session with a chosen layout. The layout must be a legal fleet.
    pub fn new(
        game_id: &str,
        player_id: PlayerId,
        ships: Vec<PlacedShip>,
        salts: CellSalts,
    ) -> Result<Self, SessionError> {
        let bits = BoardBits::from_ships(&ships)?;
        validate_fleet(&bits)?;
        let commitment = BoardCommitment::build(game_id, player_id.as_str(), bits, salts);

        Ok(Self {
            player_id,
            ships,
            commitment,
            state: MatchState::new(game_id),
            moves: Vec::new(),
            disclosures: BTreeMap::new(),
            audits: BTreeMap::new(),
        })
    }

    /// Start a session with a random fleet and fresh salts.
    pub fn with_random_fleet<R: Rng + CryptoRng>(
        game_id: &str,
        player_id: PlayerId,
        rng: &mut R,
        salt_bytes: usize,
    ) -> Result<Self, SessionError> {
        let ships = random_fleet(rng);
        let salts = CellSalts::generate(rng, salt_bytes);
        Self::new(game_id, player_id, ships, salts)
    }

    /// Resume from a cached layout, checking it against the root already
    /// published for this player.
    pub fn restore(
        game_id: &str,
        player_id: PlayerId,
        cache: &LocalLayoutCache,
        published_root_hex: &str,
    ) -> Result<Self, SessionError> {
        let (_, salts) = cache.check_against_root(game_id, player_id.as_str(), published_root_hex)?;
        Self::new(game_id, player_id, cache.placed_ships.clone(), salts)
    }

    /// Layout to persist locally.
    pub fn layout_cache(&self) -> LocalLayoutCache {
        LocalLayoutCache::new(self.ships.clone(), Some(self.commitment.salts()))
    }

    /// Local player.
    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    /// Local replica.
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Own commitment root.
    pub fn root_hex(&self) -> String {
        self.commitment.root_hex()
    }

    /// Accepted moves in the order applied.
    pub fn moves(&self) -> &[ProtocolMove] {
        &self.moves
    }

    /// Audit of `owner`'s disclosure, once received.
    pub fn audit_report(&self, owner: &PlayerId) -> Option<&AuditReport> {
        self.audits.get(owner)
    }

    /// Archived disclosure from `owner`.
    pub fn disclosure(&self, owner: &PlayerId) -> Option<&DisclosureRecord> {
        self.disclosures.get(owner)
    }

    /// Opponent, once both players committed.
    pub fn opponent(&self) -> Option<&PlayerId> {
        self.state.opponent_of(&self.player_id)
    }

    /// Has the local player resolved `target`?
    pub fn knows(&self, target: Coord) -> bool {
        match (self.state.get_player(&self.player_id), target.to_index()) {
            (Some(player), Some(index)) => player.mark(index) != Mark::Unknown,
            _ => false,
        }
    }

    /// Opponent cells not yet resolved.
    pub fn unknown_targets(&self) -> Vec<Coord> {
        match self.state.get_player(&self.player_id) {
            Some(player) => player
                .opponent_marks
                .iter()
                .enumerate()
                .filter(|(_, m)| **m == Mark::Unknown)
                .filter_map(|(i, _)| CellIndex::new(i))
                .map(|i| i.to_coord())
                .collect(),
            None => Vec::new(),
        }
    }

    /// End the match locally without a winner.
    pub fn abandon(&mut self) {
        protocol::abandon(&mut self.state);
    }

    fn apply(&mut self, mv: ProtocolMove) -> Result<(), Rejection> {
        mv.apply(&mut self.state)?;
        self.moves.push(mv);
        Ok(())
    }

    // =========================================================================
    // OUTGOING
    // =========================================================================

    /// Publish the local commitment and produce the signal announcing it.
    pub fn commit_signal(&mut self) -> Result<SignalMessage, SessionError> {
        let root_hex = self.root_hex();
        self.apply(ProtocolMove::PublishCommitment {
            player: self.player_id.clone(),
            root_hex: root_hex.clone(),
        })?;
        info!(player = %self.player_id, root = %root_hex, "Commitment published");

        Ok(SignalMessage::Commit(CommitSignal {
            game_id: self.state.game_id.clone(),
            player_id: self.player_id.to_string(),
            root_hex,
        }))
    }

    /// Shot at `target` on the opponent's board.
    pub fn guess_signal(&self, target: Coord) -> Result<SignalMessage, SessionError> {
        if self.state.phase != MatchPhase::Battle {
            return Err(SessionError::WrongPhase(self.state.phase));
        }
        if target.to_index().is_none() {
            return Err(SessionError::OffBoard(target));
        }
        if self.knows(target) {
            return Err(SessionError::AlreadyResolved(target));
        }

        Ok(SignalMessage::Guess(GuessSignal {
            game_id: self.state.game_id.clone(),
            from_player_id: self.player_id.to_string(),
            coord: target,
        }))
    }

    /// Disclose the whole board to the opponent. Only after game over.
    pub fn full_reveal_signal(&self) -> Result<SignalMessage, SessionError> {
        if !self.state.is_ended() {
            return Err(SessionError::WrongPhase(self.state.phase));
        }
        let opponent = self.opponent().ok_or(SessionError::NoOpponent)?;

        Ok(SignalMessage::FullReveal(FullRevealSignal {
            game_id: self.state.game_id.clone(),
            to_player_id: opponent.to_string(),
            owner_id: self.player_id.to_string(),
            board_bits: self.commitment.bits().to_vec(),
            salts_hex: self.commitment.salts().to_hex(),
        }))
    }

    // =========================================================================
    // INCOMING
    // =========================================================================

    /// Handle one delivered signal. Returns signals to send in response.
    ///
    /// `now` is the local clock in milliseconds, used to timestamp answers.
    pub fn handle_signal(&mut self, signal: &SignalMessage, now: i64) -> Result<Vec<SignalMessage>, SessionError> {
        if signal.game_id() != self.state.game_id {
            debug!(game = signal.game_id(), "Ignoring signal for another match");
            return Ok(Vec::new());
        }

        match signal {
            SignalMessage::Commit(s) => {
                if s.player_id == self.player_id.as_str() {
                    return Ok(Vec::new());
                }
                self.on_commit(s)?;
                Ok(Vec::new())
            }
            SignalMessage::Guess(s) => {
                if s.from_player_id == self.player_id.as_str() {
                    return Ok(Vec::new());
                }
                Ok(vec![self.on_guess(s, now)?])
            }
            SignalMessage::Reveal(s) => {
                if s.owner_id == self.player_id.as_str() || s.to_player_id != self.player_id.as_str() {
                    return Ok(Vec::new());
                }
                self.on_reveal(s)?;
                Ok(Vec::new())
            }
            SignalMessage::FullReveal(s) => {
                if s.owner_id == self.player_id.as_str() || s.to_player_id != self.player_id.as_str() {
                    return Ok(Vec::new());
                }
                self.on_full_reveal(s)?;
                Ok(Vec::new())
            }
        }
    }

    fn on_commit(&mut self, signal: &CommitSignal) -> Result<(), SessionError> {
        let player = PlayerId::new(signal.player_id.clone());
        self.apply(ProtocolMove::PublishCommitment {
            player: player.clone(),
            root_hex: signal.root_hex.clone(),
        })?;
        info!(%player, phase = %self.state.phase, "Opponent commitment recorded");
        Ok(())
    }

    /// Answer a guess against the local board and apply the answer locally.
    fn on_guess(&mut self, signal: &GuessSignal, now: i64) -> Result<SignalMessage, SessionError> {
        let guesser = PlayerId::new(signal.from_player_id.clone());
        let target = signal.coord;
        let index = target.to_index().ok_or(SessionError::OffBoard(target))?;
        let reveal = self.commitment.reveal(index);

        // A repeated guess means our answer may have been lost: resend it
        // with the timestamp already on record.
        let recorded_at = self
            .state
            .guesses
            .iter()
            .find(|g| g.by == guesser && g.target == target)
            .map(|g| g.at);

        let at = match recorded_at {
            Some(at) => {
                debug!(%guesser, %target, "Resending answer to repeated guess");
                at
            }
            None => {
                self.apply(ProtocolMove::ApplyReveal {
                    guesser: guesser.clone(),
                    target,
                    reveal: reveal.clone(),
                    at: now,
                })?;
                now
            }
        };

        Ok(SignalMessage::Reveal(RevealSignal::new(guesser.as_str(), target, reveal, at)))
    }

    fn on_reveal(&mut self, signal: &RevealSignal) -> Result<(), SessionError> {
        let result = self.apply(ProtocolMove::ApplyReveal {
            guesser: self.player_id.clone(),
            target: signal.coord,
            reveal: signal.to_cell_reveal(),
            at: signal.at,
        });

        match result {
            Ok(()) => {
                if let Some(winner) = &self.state.winner {
                    info!(%winner, "Fleet sunk, match over");
                }
                Ok(())
            }
            // A duplicate answer to a resent guess.
            Err(Rejection::AlreadyRevealed { .. }) => Ok(()),
            Err(rejection) => {
                warn!(
                    kind = ?rejection.kind(),
                    owner = %signal.owner_id,
                    "Rejected reveal: {}",
                    rejection
                );
                Err(rejection.into())
            }
        }
    }

    /// Audit and archive a disclosure. The first record per owner is final.
    fn on_full_reveal(&mut self, signal: &FullRevealSignal) -> Result<(), SessionError> {
        if !self.state.is_ended() {
            return Err(SessionError::WrongPhase(self.state.phase));
        }
        let owner = PlayerId::new(signal.owner_id.clone());
        let (bits, salts) = signal.disclosure()?;

        let published_root = self
            .state
            .get_player(&owner)
            .and_then(|p| p.commitment_root_hex.as_deref())
            .and_then(hash_from_hex)
            .ok_or_else(|| SessionError::NoPublishedRoot(owner.clone()))?;

        let record = DisclosureRecord {
            game_id: self.state.game_id.clone(),
            owner_id: owner.clone(),
            bits,
            salts,
            published_root,
        };

        if let Some(archived) = self.disclosures.get(&owner) {
            if archived.digest() == record.digest() {
                debug!(%owner, "Ignoring repeated disclosure");
                return Ok(());
            }
            warn!(%owner, "Rejected disclosure that differs from the archived one");
            return Err(SessionError::ConflictingDisclosure(owner));
        }

        let report = record.audit(&self.state);

        if report.is_clean() {
            info!(%owner, "Disclosure audit clean");
        } else {
            warn!(
                %owner,
                root_matches = report.root_matches,
                fleet_ok = report.fleet_ok,
                mismatches = report.guess_mismatches.len(),
                "Disclosure audit found problems"
            );
        }

        self.disclosures.insert(owner.clone(), record);
        self.audits.insert(owner, report);
        Ok(())
    }
}
