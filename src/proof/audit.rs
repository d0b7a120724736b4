//! Post-Game Audit
//!
//! After game over a player may disclose the whole board and every salt.
//! The audit reconciles that disclosure against the three things it must
//! agree with:
//!
//! 1. the root published before play (binding),
//! 2. the fleet rules (legality, never checked during play),
//! 3. every guess outcome recorded against that player.
//!
//! The report is informational. It never changes the winner.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::board::bits::BoardBits;
use crate::board::fleet::validate_fleet;
use crate::core::coord::Coord;
use crate::core::hash::{hash_from_hex, hash_to_hex, CellHasher, CommitHash};
use crate::core::salt::CellSalts;
use crate::game::state::{GuessResult, MatchState, PlayerId};
use crate::proof::commitment::commitment_root;

/// Everything needed to audit one player's board.
#[derive(Clone, Copy, Debug)]
pub struct AuditRequest<'a> {
    /// Match id bound into the leaves.
    pub game_id: &'a str,
    /// Disclosing player.
    pub owner_id: &'a PlayerId,
    /// Disclosed occupancy.
    pub bits: &'a BoardBits,
    /// Disclosed salts.
    pub salts: &'a CellSalts,
    /// Root published during placement.
    pub expected_root_hex: &'a str,
    /// Local replica holding the guess log.
    pub match_state: &'a MatchState,
}

/// A recorded guess outcome contradicted by the disclosure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessMismatch {
    /// Guessing player.
    pub by: PlayerId,
    /// Targeted cell.
    pub target: Coord,
    /// Outcome implied by the disclosed bit.
    pub expected: GuessResult,
    /// Outcome recorded during play.
    pub got: GuessResult,
}

/// Result of an audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Root recomputed from the disclosure.
    pub computed_root_hex: String,
    /// Recomputed root equals the published one.
    pub root_matches: bool,
    /// Disclosed bits form a legal fleet.
    pub fleet_ok: bool,
    /// Why the fleet is illegal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet_reason: Option<String>,
    /// Recorded outcomes that disagree with the disclosure.
    pub guess_mismatches: Vec<GuessMismatch>,
}

impl AuditReport {
    /// Root matches, fleet legal, no mismatched guesses.
    pub fn is_clean(&self) -> bool {
        self.root_matches && self.fleet_ok && self.guess_mismatches.is_empty()
    }
}

/// Audit a full disclosure.
pub fn audit(request: &AuditRequest<'_>) -> AuditReport {
    let computed = commitment_root(
        request.game_id,
        request.owner_id.as_str(),
        request.bits,
        request.salts,
    );

    let root_matches = hash_from_hex(request.expected_root_hex) == Some(computed);

    let (fleet_ok, fleet_reason) = match validate_fleet(request.bits) {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    let guess_mismatches = request
        .match_state
        .guesses_against(request.owner_id)
        .filter_map(|guess| {
            // Recorded guesses are always in range; skip anything that is not.
            let index = guess.target.to_index()?;
            let expected = GuessResult::from_bit(request.bits.bit(index));
            (expected != guess.result).then(|| GuessMismatch {
                by: guess.by.clone(),
                target: guess.target,
                expected,
                got: guess.result,
            })
        })
        .collect();

    AuditReport {
        computed_root_hex: hash_to_hex(&computed),
        root_matches,
        fleet_ok,
        fleet_reason,
        guess_mismatches,
    }
}

/// Errors decoding an archived disclosure.
#[derive(Debug, Error)]
pub enum DisclosureError {
    /// Record could not be serialized.
    #[error("failed to encode disclosure record: {0}")]
    Encode(bincode::Error),

    /// Bytes are not a disclosure record.
    #[error("failed to decode disclosure record: {0}")]
    Decode(#[from] bincode::Error),
}

/// Immutable record of a full disclosure, kept for later re-audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureRecord {
    /// Match id.
    pub game_id: String,
    /// Disclosing player.
    pub owner_id: PlayerId,
    /// Disclosed occupancy.
    pub bits: BoardBits,
    /// Disclosed salts.
    pub salts: CellSalts,
    /// Root the disclosure was checked against.
    pub published_root: CommitHash,
}

impl DisclosureRecord {
    /// Serialize with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DisclosureError> {
        bincode::serialize(self).map_err(DisclosureError::Encode)
    }

    /// Deserialize from bincode.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DisclosureError> {
        Ok(bincode::deserialize(data)?)
    }

    /// Content digest of the record.
    pub fn digest(&self) -> CommitHash {
        let mut hasher = CellHasher::new(b"FLEET_COMMIT_DISCLOSURE_V1");
        hasher.update_str(&self.game_id);
        hasher.update_str(self.owner_id.as_str());
        hasher.update_bytes(&self.bits.to_vec());
        for salt in self.salts.iter() {
            hasher.update_bytes(salt.as_bytes());
        }
        hasher.update_raw(&self.published_root);
        hasher.finalize()
    }

    /// Re-run the audit against a replica.
    pub fn audit(&self, match_state: &MatchState) -> AuditReport {
        let root_hex = hash_to_hex(&self.published_root);
        audit(&AuditRequest {
            game_id: &self.game_id,
            owner_id: &self.owner_id,
            bits: &self.bits,
            salts: &self.salts,
            expected_root_hex: &root_hex,
            match_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::fleet::random_fleet;
    use crate::core::coord::CellIndex;
    use crate::game::state::GuessRecord;
    use crate::proof::commitment::commitment_root_hex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sequential_salts() -> CellSalts {
        let hexes: Vec<String> = (0..100).map(|i| format!("{:02x}", i)).collect();
        CellSalts::from_hex(&hexes).unwrap()
    }

    fn guess(by: &str, x: i32, y: i32, result: GuessResult) -> GuessRecord {
        GuessRecord {
            by: PlayerId::from(by),
            target: Coord::new(x, y),
            result,
            at: 0,
        }
    }

    #[test]
    fn test_honest_disclosure_is_clean() {
        let mut rng = StdRng::seed_from_u64(5);
        let bits = BoardBits::from_ships(&random_fleet(&mut rng)).unwrap();
        let salts = CellSalts::generate(&mut rng, 16);
        let owner = PlayerId::from("1");
        let root_hex = commitment_root_hex("m", "1", &bits, &salts);

        let mut state = MatchState::new("m");
        for index in CellIndex::all().step_by(7) {
            let target = index.to_coord();
            let result = GuessResult::from_bit(bits.bit(index));
            state.guesses.push(guess("0", target.x, target.y, result));
        }

        let report = audit(&AuditRequest {
            game_id: "m",
            owner_id: &owner,
            bits: &bits,
            salts: &salts,
            expected_root_hex: &root_hex.to_uppercase(),
            match_state: &state,
        });

        assert!(report.root_matches);
        assert!(report.fleet_ok);
        assert_eq!(report.fleet_reason, None);
        assert!(report.guess_mismatches.is_empty());
        assert!(report.is_clean());
        assert_eq!(report.computed_root_hex, root_hex);
    }

    #[test]
    fn test_claimed_hit_on_water_is_reported() {
        let mut bits = BoardBits::empty();
        bits.set(CellIndex::new(5).unwrap(), true);
        let salts = sequential_salts();
        let owner = PlayerId::from("1");
        let root_hex = commitment_root_hex("m", "1", &bits, &salts);

        let mut state = MatchState::new("m");
        state.guesses.push(guess("0", 0, 0, GuessResult::Hit));
        // The owner's own guesses are not about this board.
        state.guesses.push(guess("1", 0, 0, GuessResult::Hit));

        let report = audit(&AuditRequest {
            game_id: "m",
            owner_id: &owner,
            bits: &bits,
            salts: &salts,
            expected_root_hex: &root_hex,
            match_state: &state,
        });

        assert!(report.root_matches);
        assert_eq!(
            report.guess_mismatches,
            vec![GuessMismatch {
                by: PlayerId::from("0"),
                target: Coord::new(0, 0),
                expected: GuessResult::Miss,
                got: GuessResult::Hit,
            }]
        );
        // One ship cell is not a fleet.
        assert!(!report.fleet_ok);
        assert!(report.fleet_reason.is_some());
    }

    #[test]
    fn test_altered_disclosure_breaks_binding() {
        let mut rng = StdRng::seed_from_u64(6);
        let bits = BoardBits::from_ships(&random_fleet(&mut rng)).unwrap();
        let salts = CellSalts::generate(&mut rng, 16);
        let owner = PlayerId::from("1");
        let root_hex = commitment_root_hex("m", "1", &bits, &salts);

        let mut moved = bits;
        let first = CellIndex::all().find(|i| bits.bit(*i) == 1).unwrap();
        let empty = CellIndex::all().find(|i| bits.bit(*i) == 0).unwrap();
        moved.set(first, false);
        moved.set(empty, true);

        let state = MatchState::new("m");
        let report = audit(&AuditRequest {
            game_id: "m",
            owner_id: &owner,
            bits: &moved,
            salts: &salts,
            expected_root_hex: &root_hex,
            match_state: &state,
        });
        assert!(!report.root_matches);
        assert!(!report.is_clean());

        let report = audit(&AuditRequest {
            game_id: "m",
            owner_id: &owner,
            bits: &bits,
            salts: &salts,
            expected_root_hex: "not hex",
            match_state: &state,
        });
        assert!(!report.root_matches);
    }

    #[test]
    fn test_report_json_shape() {
        let report = AuditReport {
            computed_root_hex: "00".repeat(32),
            root_matches: true,
            fleet_ok: true,
            fleet_reason: None,
            guess_mismatches: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rootMatches"], true);
        assert!(json.get("fleetReason").is_none());
        assert!(json["guessMismatches"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_disclosure_record_archive() {
        let mut rng = StdRng::seed_from_u64(7);
        let bits = BoardBits::from_ships(&random_fleet(&mut rng)).unwrap();
        let salts = CellSalts::generate(&mut rng, 16);
        let record = DisclosureRecord {
            game_id: "m".to_string(),
            owner_id: PlayerId::from("1"),
            bits,
            salts: salts.clone(),
            published_root: commitment_root("m", "1", &bits, &salts),
        };

        let bytes = record.to_bytes().unwrap();
        let restored = DisclosureRecord::from_bytes(&bytes).unwrap();
        assert_eq!(restored, record);
        assert_eq!(restored.digest(), record.digest());
        assert!(restored.audit(&MatchState::new("m")).is_clean());

        let mut tampered = record.clone();
        tampered.game_id = "n".to_string();
        assert_ne!(tampered.digest(), record.digest());

        assert!(matches!(
            DisclosureRecord::from_bytes(&bytes[..10]),
            Err(DisclosureError::Decode(_))
        ));
    }

    #[test]
    fn test_archive_round_trip_uses_one_error_type() {
        fn archive(record: &DisclosureRecord) -> Result<DisclosureRecord, DisclosureError> {
            DisclosureRecord::from_bytes(&record.to_bytes()?)
        }

        let mut rng = StdRng::seed_from_u64(8);
        let bits = BoardBits::from_ships(&random_fleet(&mut rng)).unwrap();
        let salts = CellSalts::generate(&mut rng, 16);
        let record = DisclosureRecord {
            game_id: "m".to_string(),
            owner_id: PlayerId::from("0"),
            bits,
            salts: salts.clone(),
            published_root: commitment_root("m", "0", &bits, &salts),
        };

        assert_eq!(archive(&record).unwrap(), record);
    }
}
