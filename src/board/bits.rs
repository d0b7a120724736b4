//! Board Occupancy Bits
//!
//! The raw 100-cell grid a commitment is built over. Legality is judged on
//! these bits alone, never on a ship list.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::coord::CellIndex;
use crate::CELL_COUNT;

/// Errors raised while building board bits from raw values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitsError {
    /// Wrong number of cells.
    #[error("expected {expected} cells, got {got}")]
    WrongLength {
        /// Required length.
        expected: usize,
        /// Supplied length.
        got: usize,
    },
    /// A cell value other than 0 or 1.
    #[error("cell {index} has value {value}, expected 0 or 1")]
    InvalidBit {
        /// Cell index.
        index: usize,
        /// Offending value.
        value: u8,
    },
}

/// Occupancy of all 100 cells in index order (`y * 10 + x`).
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct BoardBits([bool; CELL_COUNT]);

impl Default for BoardBits {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoardBits {
    /// An empty (all-water) board.
    pub const fn empty() -> Self {
        Self([false; CELL_COUNT])
    }

    /// Build from 0/1 values.
    pub fn from_slice(values: &[u8]) -> Result<Self, BitsError> {
        if values.len() != CELL_COUNT {
            return Err(BitsError::WrongLength {
                expected: CELL_COUNT,
                got: values.len(),
            });
        }
        let mut bits = [false; CELL_COUNT];
        for (index, &value) in values.iter().enumerate() {
            bits[index] = match value {
                0 => false,
                1 => true,
                _ => return Err(BitsError::InvalidBit { index, value }),
            };
        }
        Ok(Self(bits))
    }

    /// Is the cell occupied?
    #[inline]
    pub fn is_set(&self, index: usize) -> bool {
        self.0[index]
    }

    /// Cell value as 0/1.
    #[inline]
    pub fn bit(&self, index: CellIndex) -> u8 {
        self.0[index.get()] as u8
    }

    /// Set or clear a cell.
    #[inline]
    pub fn set(&mut self, index: CellIndex, occupied: bool) {
        self.0[index.get()] = occupied;
    }

    /// Number of occupied cells.
    pub fn count_occupied(&self) -> usize {
        self.0.iter().filter(|b| **b).count()
    }

    /// Values as 0/1 bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.iter().map(|b| *b as u8).collect()
    }
}

impl std::fmt::Debug for BoardBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "BoardBits [")?;
        for row in self.0.chunks(crate::BOARD_SIZE) {
            let line: String = row.iter().map(|b| if *b { '#' } else { '.' }).collect();
            writeln!(f, "  {}", line)?;
        }
        write!(f, "]")
    }
}

impl TryFrom<Vec<u8>> for BoardBits {
    type Error = BitsError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        BoardBits::from_slice(&value)
    }
}

impl From<BoardBits> for Vec<u8> {
    fn from(value: BoardBits) -> Self {
        value.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_round_trip() {
        let mut values = vec![0u8; CELL_COUNT];
        values[0] = 1;
        values[57] = 1;

        let bits = BoardBits::from_slice(&values).unwrap();
        assert_eq!(bits.count_occupied(), 2);
        assert!(bits.is_set(57));
        assert_eq!(bits.to_vec(), values);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            BoardBits::from_slice(&[0; 99]),
            Err(BitsError::WrongLength { expected: 100, got: 99 })
        );

        let mut values = vec![0u8; CELL_COUNT];
        values[3] = 2;
        assert_eq!(
            BoardBits::from_slice(&values),
            Err(BitsError::InvalidBit { index: 3, value: 2 })
        );
    }
}
