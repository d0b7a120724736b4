//! Local Layout Cache
//!
//! A player's own placement, persisted locally between sessions as
//! `{placedShips, salts?}`. On reload the root is rebuilt from the cache and
//! compared with the root already published, so stale or corrupted local
//! state is caught before it is used to answer guesses.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::board::bits::BoardBits;
use crate::board::fleet::{PlacedShip, PlacementError};
use crate::core::hash::{hash_from_hex, hash_to_hex};
use crate::core::salt::{CellSalts, SaltError};
use crate::proof::commitment::commitment_root;

/// Cache load failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Not valid cache JSON.
    #[error("malformed layout cache: {0}")]
    Json(#[from] serde_json::Error),

    /// Cached ships do not rasterize.
    #[error("cached ships are invalid: {0}")]
    Placement(#[from] PlacementError),

    /// Cached salts are invalid.
    #[error("cached salts are invalid: {0}")]
    Salt(#[from] SaltError),

    /// A commitment was published but the cache has no salts.
    #[error("layout cache has no salts for a published commitment")]
    MissingSalts,

    /// Cache does not reproduce the published root.
    #[error("layout cache rebuilds root {computed}, published root is {published}")]
    RootMismatch {
        /// Root rebuilt from the cache.
        computed: String,
        /// Root on record.
        published: String,
    },
}

/// Persisted placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalLayoutCache {
    /// Ships as placed.
    pub placed_ships: Vec<PlacedShip>,
    /// Hex salts, present once committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salts: Option<Vec<String>>,
}

/// Storage key for a player's layout in a match.
pub fn cache_key(game_id: &str, player_id: &str) -> String {
    format!("fleet-commit:layout:{}:{}", game_id, player_id)
}

impl LocalLayoutCache {
    /// Cache a placement with its salts.
    pub fn new(placed_ships: Vec<PlacedShip>, salts: Option<&CellSalts>) -> Self {
        Self {
            placed_ships,
            salts: salts.map(CellSalts::to_hex),
        }
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, CacheError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, CacheError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild bits and salts.
    pub fn restore(&self) -> Result<(BoardBits, Option<CellSalts>), CacheError> {
        let bits = BoardBits::from_ships(&self.placed_ships)?;
        let salts = self
            .salts
            .as_deref()
            .map(CellSalts::from_hex)
            .transpose()?;
        Ok((bits, salts))
    }

    /// Check the cache reproduces `published_root_hex` for this match and owner.
    pub fn check_against_root(
        &self,
        game_id: &str,
        owner_id: &str,
        published_root_hex: &str,
    ) -> Result<(BoardBits, CellSalts), CacheError> {
        let (bits, salts) = self.restore()?;
        let salts = salts.ok_or(CacheError::MissingSalts)?;

        let computed = commitment_root(game_id, owner_id, &bits, &salts);
        if hash_from_hex(published_root_hex) != Some(computed) {
            return Err(CacheError::RootMismatch {
                computed: hash_to_hex(&computed),
                published: published_root_hex.to_string(),
            });
        }

        Ok((bits, salts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::fleet::{random_fleet, Orientation};
    use crate::core::coord::Coord;
    use crate::proof::commitment::commitment_root_hex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cached_layout(seed: u64) -> (LocalLayoutCache, String) {
        let mut rng = StdRng::seed_from_u64(seed);
        let ships = random_fleet(&mut rng);
        let salts = CellSalts::generate(&mut rng, 16);
        let bits = BoardBits::from_ships(&ships).unwrap();
        let root_hex = commitment_root_hex("m", "0", &bits, &salts);
        (LocalLayoutCache::new(ships, Some(&salts)), root_hex)
    }

    #[test]
    fn test_cache_key_includes_match_and_player() {
        assert_ne!(cache_key("m", "0"), cache_key("m", "1"));
        assert_ne!(cache_key("m", "0"), cache_key("n", "0"));
    }

    #[test]
    fn test_cache_reproduces_published_root() {
        let (cache, root_hex) = cached_layout(1);
        let json = cache.to_json().unwrap();
        assert!(json.contains("placedShips"));

        let loaded = LocalLayoutCache::from_json(&json).unwrap();
        assert_eq!(loaded, cache);
        assert!(loaded.check_against_root("m", "0", &root_hex).is_ok());
    }

    #[test]
    fn test_stale_cache_detected() {
        let (mut cache, root_hex) = cached_layout(2);
        cache.placed_ships[0].orientation = match cache.placed_ships[0].orientation {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        };
        // The flipped ship may now leave the board or overlap; either way it fails.
        assert!(cache.check_against_root("m", "0", &root_hex).is_err());

        let (cache, root_hex) = cached_layout(3);
        assert!(matches!(
            cache.check_against_root("m", "1", &root_hex),
            Err(CacheError::RootMismatch { .. })
        ));
    }

    #[test]
    fn test_uncommitted_cache_has_no_salts() {
        let ships = vec![PlacedShip::new(0, Coord::new(0, 0), Orientation::Horizontal, 5)];
        let cache = LocalLayoutCache::new(ships, None);

        let json = cache.to_json().unwrap();
        assert!(!json.contains("salts"));

        let (bits, salts) = cache.restore().unwrap();
        assert_eq!(bits.count_occupied(), 5);
        assert!(salts.is_none());
        assert!(matches!(
            cache.check_against_root("m", "0", &"00".repeat(32)),
            Err(CacheError::MissingSalts)
        ));
    }

    #[test]
    fn test_corrupted_salts_rejected() {
        let (mut cache, root_hex) = cached_layout(4);
        if let Some(salts) = cache.salts.as_mut() {
            salts[3] = "zz".to_string();
        }
        assert!(matches!(
            cache.check_against_root("m", "0", &root_hex),
            Err(CacheError::Salt(_))
        ));

        assert!(matches!(
            LocalLayoutCache::from_json("{\"salts\":[]}"),
            Err(CacheError::Json(_))
        ));
    }
}
