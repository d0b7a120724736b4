//! Fleet Legality
//!
//! Decides whether an occupancy grid could have come from a legal placement
//! of the fleet {5, 4, 3, 3, 2}. Ships may touch or abut at right angles, so
//! component sizes are not enough: the occupied cells must be partitioned
//! into straight segments whose lengths are exactly the fleet.

use rand::Rng;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::trace;

use crate::board::bits::BoardBits;
use crate::core::coord::Coord;
use crate::{BOARD_SIZE, CELL_COUNT, FLEET_CELL_COUNT, FLEET_SIZES};

/// Why a grid is not a legal fleet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    /// Total occupied cells is not 17.
    #[error("fleet must occupy {expected} cells, found {found}")]
    WrongCellCount {
        /// Required count (sum of ship sizes).
        expected: usize,
        /// Occupied cells on the board.
        found: usize,
    },
    /// Occupied cells cannot be split into straight ships of the fleet sizes.
    #[error("occupied cells cannot be split into straight ships of sizes 5, 4, 3, 3, 2")]
    NoDecomposition,
}

/// Errors raised while rasterizing a ship list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// A ship leaves the board.
    #[error("ship {id} does not fit on the board")]
    OutOfBounds {
        /// Ship id.
        id: u32,
    },
    /// Two ships claim the same cell.
    #[error("ship {id} overlaps another ship at {at}")]
    Overlap {
        /// Ship id.
        id: u32,
        /// First shared cell.
        at: Coord,
    },
}

/// Ship orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Extends towards +x.
    Horizontal,
    /// Extends towards +y.
    Vertical,
}

impl Orientation {
    /// Both orientations.
    pub const ALL: [Orientation; 2] = [Orientation::Horizontal, Orientation::Vertical];

    /// Step `dist` cells from `start`.
    #[inline]
    pub fn step(self, start: Coord, dist: i32) -> Coord {
        match self {
            Orientation::Horizontal => Coord::new(start.x + dist, start.y),
            Orientation::Vertical => Coord::new(start.x, start.y + dist),
        }
    }
}

/// A ship as placed by its owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedShip {
    /// Ship identifier (unique within a fleet)
    pub id: u32,
    /// Top-left cell
    pub start: Coord,
    /// Direction the ship extends in
    pub orientation: Orientation,
    /// Length in cells
    pub size: u8,
}

impl PlacedShip {
    /// Create a ship.
    pub fn new(id: u32, start: Coord, orientation: Orientation, size: u8) -> Self {
        Self { id, start, orientation, size }
    }

    /// Every cell the ship covers, in order from `start`.
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.size as i32).map(move |d| self.orientation.step(self.start, d))
    }

    /// Does the whole ship lie on the board?
    pub fn in_bounds(&self) -> bool {
        self.size > 0 && self.cells().all(|c| c.in_bounds())
    }
}

impl BoardBits {
    /// Rasterize a ship list, rejecting ships off the board or overlapping.
    pub fn from_ships(ships: &[PlacedShip]) -> Result<Self, PlacementError> {
        let mut bits = BoardBits::empty();
        for ship in ships {
            if !ship.in_bounds() {
                return Err(PlacementError::OutOfBounds { id: ship.id });
            }
            for cell in ship.cells() {
                let Some(index) = cell.to_index() else {
                    return Err(PlacementError::OutOfBounds { id: ship.id });
                };
                if bits.is_set(index.get()) {
                    return Err(PlacementError::Overlap { id: ship.id, at: cell });
                }
                bits.set(index, true);
            }
        }
        Ok(bits)
    }
}

/// Validate that `bits` is a legal fleet.
pub fn validate_fleet(bits: &BoardBits) -> Result<(), FleetError> {
    let found = bits.count_occupied();
    if found != FLEET_CELL_COUNT {
        return Err(FleetError::WrongCellCount {
            expected: FLEET_CELL_COUNT,
            found,
        });
    }

    let mut covered = [false; CELL_COUNT];
    let mut remaining: Vec<u8> = FLEET_SIZES.to_vec();

    if cover_from(bits, &mut covered, &mut remaining) {
        Ok(())
    } else {
        Err(FleetError::NoDecomposition)
    }
}

/// Exact-cover search over straight segments.
///
/// The lowest-index uncovered occupied cell can only be the top/left end of
/// its ship: every cell before it in row-major order is already covered.
/// So each step only tries segments starting at that cell.
fn cover_from(bits: &BoardBits, covered: &mut [bool; CELL_COUNT], remaining: &mut Vec<u8>) -> bool {
    let next = (0..CELL_COUNT).find(|&i| bits.is_set(i) && !covered[i]);
    let Some(start) = next else {
        return remaining.is_empty();
    };

    let origin = Coord::new((start % BOARD_SIZE) as i32, (start / BOARD_SIZE) as i32);

    for slot in 0..remaining.len() {
        let size = remaining[slot];
        // Equal sizes are interchangeable.
        if remaining[..slot].contains(&size) {
            continue;
        }

        for orientation in Orientation::ALL {
            let Some(cells) = free_segment(bits, covered, origin, orientation, size) else {
                continue;
            };

            for &c in &cells {
                covered[c] = true;
            }
            remaining.remove(slot);
            trace!(start, size, ?orientation, "trying segment");

            if cover_from(bits, covered, remaining) {
                return true;
            }

            remaining.insert(slot, size);
            for &c in &cells {
                covered[c] = false;
            }
        }
    }

    false
}

/// Indices of a straight segment if every cell is occupied and not yet covered.
fn free_segment(
    bits: &BoardBits,
    covered: &[bool; CELL_COUNT],
    origin: Coord,
    orientation: Orientation,
    size: u8,
) -> Option<Vec<usize>> {
    (0..size as i32)
        .map(|d| {
            let index = orientation.step(origin, d).to_index()?.get();
            (bits.is_set(index) && !covered[index]).then_some(index)
        })
        .collect()
}

/// Place the standard fleet at random, non-overlapping positions.
pub fn random_fleet<R: Rng + ?Sized>(rng: &mut R) -> Vec<PlacedShip> {
    let mut ships: Vec<PlacedShip> = Vec::with_capacity(FLEET_SIZES.len());
    let mut occupied = BoardBits::empty();

    for (id, &size) in FLEET_SIZES.iter().enumerate() {
        loop {
            let orientation = if rng.gen::<bool>() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let start = Coord::new(
                rng.gen_range(0..BOARD_SIZE as i32),
                rng.gen_range(0..BOARD_SIZE as i32),
            );
            let ship = PlacedShip::new(id as u32, start, orientation, size);
            if !ship.in_bounds() {
                continue;
            }
            let indices: Vec<_> = ship.cells().filter_map(|c| c.to_index()).collect();
            if indices.iter().any(|i| occupied.is_set(i.get())) {
                continue;
            }
            for index in indices {
                occupied.set(index, true);
            }
            ships.push(ship);
            break;
        }
    }

    ships
}
