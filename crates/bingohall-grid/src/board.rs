//! Card validation and random card suggestions.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::GridDims;

/// Why a submitted card was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The card does not have exactly `grid_size²` cells.
    #[error("board must have exactly {expected} numbers, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A value falls outside `1..=max`.
    #[error("all numbers must be between 1 and {max}, got {value}")]
    OutOfRange { value: i64, max: usize },

    /// A value appears more than once.
    #[error("number {value} appears more than once")]
    Duplicate { value: u32 },
}

/// Checks a submitted card and returns it in stored form.
///
/// Checks run in a fixed order and the first failure is reported: length,
/// then every value's range, then uniqueness.
pub fn validate_board(
    board: &[i64],
    dims: GridDims,
) -> Result<Vec<u32>, BoardError> {
    let expected = dims.grid_size * dims.grid_size;
    if board.len() != expected {
        return Err(BoardError::InvalidLength {
            expected,
            actual: board.len(),
        });
    }

    let max = dims.total_numbers;
    let mut values = Vec::with_capacity(board.len());
    for &value in board {
        match u32::try_from(value) {
            Ok(v) if v >= 1 && (v as usize) <= max => values.push(v),
            _ => return Err(BoardError::OutOfRange { value, max }),
        }
    }

    let mut seen = HashSet::with_capacity(values.len());
    if let Some(&value) = values.iter().find(|v| !seen.insert(**v)) {
        return Err(BoardError::Duplicate { value });
    }

    Ok(values)
}

/// A random card for `dims`: a shuffled selection of distinct values from
/// `1..=total_numbers`. Always passes [`validate_board`].
pub fn suggest_board<R: Rng + ?Sized>(dims: GridDims, rng: &mut R) -> Vec<u32> {
    let cells = dims.grid_size * dims.grid_size;
    let mut pool: Vec<u32> = (1..=dims.total_numbers as u32).collect();
    pool.shuffle(rng);
    pool.truncate(cells);
    pool
}
