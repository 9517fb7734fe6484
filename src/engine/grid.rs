//! Heap-backed board for side lengths other than 4.

use std::fmt;

use smallvec::SmallVec;

use super::rows::shift_row_left;
use super::{exponent_for, tile_value, BoardError, Direction, Position, ShiftOutcome};

/// An N x N board holding one tile exponent per cell, row-major.
///
/// Same merge semantics as [`Board`](super::Board), produced by the same
/// compact-and-merge routine the 4x4 lookup table is built from, applied
/// per line instead of through the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    size: usize,
    cells: Box<[u8]>,
}

impl Grid {
    /// Smallest supported side length.
    pub const MIN_SIZE: usize = 2;
    /// Largest supported side length. Cell indices must fit a `u8`.
    pub const MAX_SIZE: usize = 16;

    /// An empty `size` x `size` board.
    pub fn empty(size: usize) -> Result<Grid, BoardError> {
        check_size(size)?;
        Ok(Grid {
            size,
            cells: vec![0; size * size].into_boxed_slice(),
        })
    }

    /// Build a board from `size * size` row-major tile values (`0`, or powers
    /// of two in `2..=32768`).
    pub fn from_cells(size: usize, cells: &[u64]) -> Result<Grid, BoardError> {
        check_size(size)?;
        if cells.len() != size * size {
            return Err(BoardError::InvalidDimensions {
                expected: size * size,
                got: cells.len(),
            });
        }
        let mut grid = Grid::empty(size)?;
        for (idx, &value) in cells.iter().enumerate() {
            grid.cells[idx] = exponent_for(value).ok_or(BoardError::InvalidTileValue {
                row: idx / size,
                col: idx % size,
                value,
            })?;
        }
        Ok(grid)
    }

    /// Decode back to row-major tile values.
    pub fn to_cells(&self) -> Vec<u64> {
        self.cells.iter().map(|&exp| tile_value(exp)).collect()
    }

    /// Largest tile exponent on the board (0 for an empty board).
    pub fn highest_exponent(&self) -> u8 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Row-major cell index for position `i` of `lane`, where a lane is a row
    /// for horizontal moves and a column for vertical ones, walked from the
    /// edge the tiles compact toward.
    fn lane_index(&self, dir: Direction, lane: usize, i: usize) -> usize {
        let n = self.size;
        match dir {
            Direction::Left => lane * n + i,
            Direction::Right => lane * n + (n - 1 - i),
            Direction::Up => i * n + lane,
            Direction::Down => (n - 1 - i) * n + lane,
        }
    }
}

fn check_size(size: usize) -> Result<(), BoardError> {
    if (Grid::MIN_SIZE..=Grid::MAX_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(BoardError::UnsupportedSize { size })
    }
}

impl Position for Grid {
    fn size(&self) -> usize {
        self.size
    }

    fn exponent(&self, row: usize, col: usize) -> u8 {
        self.cells[row * self.size + col]
    }

    fn empty_count(&self) -> u32 {
        self.cells.iter().filter(|&&exp| exp == 0).count() as u32
    }

    fn empty_cells(&self) -> SmallVec<[u8; 16]> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &exp)| exp == 0)
            .map(|(idx, _)| idx as u8)
            .collect()
    }

    fn shift(&self, dir: Direction) -> ShiftOutcome<Self> {
        let n = self.size;
        let mut out = self.clone();
        let mut score_delta = 0u32;
        let mut moved = false;
        let mut line: SmallVec<[u8; 16]> = SmallVec::with_capacity(n);
        for lane in 0..n {
            line.clear();
            for i in 0..n {
                line.push(self.cells[self.lane_index(dir, lane, i)]);
            }
            let (delta, changed) = shift_row_left(&mut line);
            score_delta += delta;
            moved |= changed;
            for i in 0..n {
                out.cells[self.lane_index(dir, lane, i)] = line[i];
            }
        }
        ShiftOutcome {
            board: out,
            score_delta,
            moved,
        }
    }

    fn with_spawn(&self, cell: u8, exponent: u8) -> Self {
        let mut out = self.clone();
        out.cells[cell as usize] = exponent;
        out
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.size {
            if row > 0 {
                for _ in 0..self.size {
                    write!(f, "-------")?;
                }
                writeln!(f)?;
            }
            for col in 0..self.size {
                if col > 0 {
                    write!(f, "|")?;
                }
                match tile_value(self.cells[row * self.size + col]) {
                    0 => write!(f, "{:>6}", ".")?,
                    v => write!(f, "{v:>6}")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
