//! Board representations and move simulation.
//!
//! Two interchangeable board backends implement [`Position`]:
//! - [`Board`]: a 4x4 board packed into a `u64` (16 nibbles of tile
//!   exponents), with moves realized as per-row lookups into a precomputed
//!   table. This is the fast path the search normally runs on.
//! - [`Grid`]: a heap-backed N x N board for sizes other than 4, moved by the
//!   same compact-and-merge routine the table is built from.
//!
//! Lookup tables are built once per process on first use; [`new`] forces the
//! build up front. Safe to call multiple times.

use std::hash::Hash;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

mod board;
mod grid;
pub(crate) mod rows;

pub use board::Board;
pub use grid::Grid;

/// A direction to move/merge tiles.
///
/// Variant order is the tie-break priority: when two directions evaluate
/// equally, the one declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Left,
    Down,
    Right,
}

impl Direction {
    /// All four directions in tie-break priority order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Left => "left",
            Direction::Down => "down",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// Result of sliding a board in one direction.
///
/// `moved == false` marks an illegal move for that position: the board is
/// returned unchanged and must not be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftOutcome<B> {
    pub board: B,
    /// Sum of the face values of tiles produced by merges in this move.
    pub score_delta: u32,
    pub moved: bool,
}

/// One simulated move for [`simulate_moves`].
#[derive(Debug, Clone)]
pub struct MoveSim<B> {
    pub dir: Direction,
    pub board: B,
    pub score_delta: u32,
    pub legal: bool,
}

/// Board operations the search is generic over.
///
/// Implementations must be cheap to clone and hashable so positions can key
/// the transposition table directly.
pub trait Position: Clone + Eq + Hash {
    /// Side length N of the N x N board.
    fn size(&self) -> usize;

    /// Tile exponent at (row, col); 0 means the cell is empty.
    fn exponent(&self, row: usize, col: usize) -> u8;

    /// Number of empty cells.
    fn empty_count(&self) -> u32;

    /// Row-major indices of the empty cells, in ascending order.
    fn empty_cells(&self) -> SmallVec<[u8; 16]>;

    /// Slide/merge tiles in `dir`. No randomness.
    fn shift(&self, dir: Direction) -> ShiftOutcome<Self>;

    /// Copy of this board with `exponent` written into the empty cell at
    /// row-major index `cell`.
    fn with_spawn(&self, cell: u8, exponent: u8) -> Self;

    /// True when no direction changes the board (game over).
    fn is_dead(&self) -> bool {
        Direction::ALL.iter().all(|&dir| !self.shift(dir).moved)
    }
}

/// Simulate all four directions from `board`, in tie-break priority order.
///
/// Illegal moves are reported with `legal == false`; both the search and any
/// caller-facing "can move" check must skip them.
pub fn simulate_moves<B: Position>(board: &B) -> [MoveSim<B>; 4] {
    Direction::ALL.map(|dir| {
        let out = board.shift(dir);
        MoveSim {
            dir,
            board: out.board,
            score_delta: out.score_delta,
            legal: out.moved,
        }
    })
}

/// Codec failure: the input grid cannot be represented as a packed board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// A cell holds a value that is not 0 or a power of two in `2..=32768`.
    /// Raised at encode time; values are never silently truncated.
    #[error("cell ({row}, {col}) holds {value}, which is not 0 or a power of two in 2..=32768")]
    InvalidTileValue { row: usize, col: usize, value: u64 },
    /// The flat cell slice does not match the configured board size.
    #[error("expected {expected} cells for the configured board size, got {got}")]
    InvalidDimensions { expected: usize, got: usize },
    /// Board side length outside the supported range.
    #[error("unsupported board size {size}; sizes 2..=16 are supported")]
    UnsupportedSize { size: usize },
}

/// Initialize internal tables on first use. Safe to call multiple times.
pub fn new() {
    rows::row_table();
}

/// Nibble exponent for a tile value: 0 for empty, log2(v) for powers of two
/// in `2..=32768`. `None` for anything else (including 1, whose exponent
/// would collide with the empty encoding).
pub(crate) fn exponent_for(value: u64) -> Option<u8> {
    if value == 0 {
        return Some(0);
    }
    if value.is_power_of_two() && (2..=32768).contains(&value) {
        Some(value.trailing_zeros() as u8)
    } else {
        None
    }
}

/// Tile value for a nibble exponent (0 stays 0).
pub(crate) fn tile_value(exponent: u8) -> u64 {
    if exponent == 0 {
        0
    } else {
        1u64 << exponent
    }
}
