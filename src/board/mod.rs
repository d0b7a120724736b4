//! Board Layouts
//!
//! Occupancy grids, fleet legality and the persisted local layout.
//!
//! ## Module Structure
//!
//! - `bits`: 100-cell occupancy grid
//! - `fleet`: Ships, fleet legality check, random placement
//! - `cache`: Persisted `{placedShips, salts?}` layout

pub mod bits;
pub mod fleet;
pub mod cache;

pub use bits::{BoardBits, BitsError};
pub use fleet::{
    validate_fleet, random_fleet,
    FleetError, PlacementError, PlacedShip, Orientation,
};
pub use cache::{LocalLayoutCache, CacheError, cache_key};
