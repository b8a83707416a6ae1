//! Grid geometry: sizes, winning lines and win detection.
//!
//! Cards are stored row-major, so the cell at `(row, col)` lives at
//! position `row * grid_size + col`.

use std::collections::BTreeSet;
use std::fmt;

/// Fewest seats a room can have.
pub const MIN_PLAYERS: u8 = 2;

/// Most seats a room can have.
pub const MAX_PLAYERS: u8 = 6;

/// Letters awarded for completed lines, in completion order.
const BINGO: [char; 5] = ['B', 'I', 'N', 'G', 'O'];

// ---------------------------------------------------------------------------
// Grid dimensions
// ---------------------------------------------------------------------------

/// Size of the card for a given number of seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDims {
    /// Cells per side.
    pub grid_size: usize,
    /// `grid_size²`. Card values are drawn from `1..=total_numbers`.
    pub total_numbers: usize,
}

/// Grid for a room with `players` seats: two players get 5×5, six get 9×9.
pub const fn grid_size_for_players(players: u8) -> GridDims {
    let grid_size = players as usize + 3;
    GridDims {
        grid_size,
        total_numbers: grid_size * grid_size,
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// Orientation of a winning line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Row,
    Column,
    Diagonal,
}

/// One row, column or diagonal of a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    /// Row/column number, or 0 for the main diagonal and 1 for the anti-diagonal.
    pub index: usize,
    /// Card positions covered, in order.
    pub positions: Vec<usize>,
}

impl Line {
    /// Returns `true` if every position on the line is in `marked`.
    pub fn is_complete(&self, marked: &BTreeSet<usize>) -> bool {
        self.positions.iter().all(|p| marked.contains(p))
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.index) {
            (LineKind::Row, i) => write!(f, "Row {}", i + 1),
            (LineKind::Column, i) => write!(f, "Column {}", i + 1),
            (LineKind::Diagonal, 0) => write!(f, "Diagonal \\"),
            (LineKind::Diagonal, _) => write!(f, "Diagonal /"),
        }
    }
}

/// Every line on a `grid_size`×`grid_size` card: rows by index, then
/// columns by index, then the main and anti-diagonal. `2 * grid_size + 2`
/// lines in total.
pub fn winning_lines(grid_size: usize) -> Vec<Line> {
    let n = grid_size;
    let mut lines = Vec::with_capacity(2 * n + 2);

    for row in 0..n {
        lines.push(Line {
            kind: LineKind::Row,
            index: row,
            positions: (0..n).map(|col| row * n + col).collect(),
        });
    }
    for col in 0..n {
        lines.push(Line {
            kind: LineKind::Column,
            index: col,
            positions: (0..n).map(|row| row * n + col).collect(),
        });
    }
    lines.push(Line {
        kind: LineKind::Diagonal,
        index: 0,
        positions: (0..n).map(|i| i * n + i).collect(),
    });
    lines.push(Line {
        kind: LineKind::Diagonal,
        index: 1,
        positions: (0..n).map(|i| i * n + (n - 1 - i)).collect(),
    });

    lines
}

/// The lines fully covered by `marked`, in [`winning_lines`] order.
pub fn completed_lines(marked: &BTreeSet<usize>, grid_size: usize) -> Vec<Line> {
    winning_lines(grid_size)
        .into_iter()
        .filter(|line| line.is_complete(marked))
        .collect()
}

/// A card wins once it has `grid_size` completed lines.
///
/// The threshold grows with the grid: 5 lines on a 5×5 card, 9 on a 9×9.
pub fn has_won(marked: &BTreeSet<usize>, grid_size: usize) -> bool {
    completed_lines(marked, grid_size).len() >= grid_size
}

/// The letters earned so far, one per completed line: `"BIN"` after three.
/// Cycles back to `B` past the fifth line on larger grids.
pub fn bingo_letters(marked: &BTreeSet<usize>, grid_size: usize) -> String {
    (0..completed_lines(marked, grid_size).len())
        .map(|i| BINGO[i % BINGO.len()])
        .collect()
}
