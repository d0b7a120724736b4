//! Board Coordinates
//!
//! `Coord` is what travels on the wire and may be out of range;
//! `CellIndex` is the validated `y * 10 + x` form used by the core.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::{BOARD_SIZE, CELL_COUNT};

/// A board coordinate. Signed so that hostile out-of-range input stays representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Column (0..10)
    pub x: i32,
    /// Row (0..10)
    pub y: i32,
}

impl Coord {
    /// Create a coordinate (not range-checked).
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Check if the coordinate lies on the board.
    #[inline]
    pub fn in_bounds(&self) -> bool {
        let size = BOARD_SIZE as i32;
        (0..size).contains(&self.x) && (0..size).contains(&self.y)
    }

    /// Convert to a cell index, `None` when off the board.
    pub fn to_index(&self) -> Option<CellIndex> {
        if !self.in_bounds() {
            return None;
        }
        CellIndex::new((self.y as usize) * BOARD_SIZE + self.x as usize)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Validated cell index in `[0, 100)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct CellIndex(u8);

impl CellIndex {
    /// Create from a raw index, `None` when out of range.
    pub fn new(index: usize) -> Option<Self> {
        (index < CELL_COUNT).then_some(Self(index as u8))
    }

    /// Raw index value.
    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Convert back to a coordinate.
    pub fn to_coord(self) -> Coord {
        let i = self.get();
        Coord::new((i % BOARD_SIZE) as i32, (i / BOARD_SIZE) as i32)
    }

    /// Iterate over every cell of the board in index order.
    pub fn all() -> impl Iterator<Item = CellIndex> {
        (0..CELL_COUNT as u8).map(CellIndex)
    }
}

impl TryFrom<usize> for CellIndex {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        CellIndex::new(value).ok_or_else(|| format!("cell index {} out of range", value))
    }
}

impl From<CellIndex> for usize {
    fn from(value: CellIndex) -> Self {
        value.get()
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_to_index() {
        assert_eq!(Coord::new(0, 0).to_index().map(CellIndex::get), Some(0));
        assert_eq!(Coord::new(3, 2).to_index().map(CellIndex::get), Some(23));
        assert_eq!(Coord::new(9, 9).to_index().map(CellIndex::get), Some(99));
    }

    #[test]
    fn test_out_of_range_coords() {
        assert_eq!(Coord::new(10, 0).to_index(), None);
        assert_eq!(Coord::new(0, 10).to_index(), None);
        assert_eq!(Coord::new(-1, 4).to_index(), None);
    }

    #[test]
    fn test_index_coord_inverse() {
        for index in CellIndex::all() {
            assert_eq!(index.to_coord().to_index(), Some(index));
        }
        assert_eq!(CellIndex::all().count(), CELL_COUNT);
    }

    #[test]
    fn test_index_bounds() {
        assert!(CellIndex::new(99).is_some());
        assert!(CellIndex::new(100).is_none());
    }
}
