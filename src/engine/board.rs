//! The 4x4 bit-packed board.

use std::fmt;

use smallvec::SmallVec;

use super::rows;
use super::{exponent_for, tile_value, BoardError, Direction, Position, ShiftOutcome};

/// A 4x4 board packed into a `u64`: 16 nibbles of tile exponents in row-major
/// order, cell (0, 0) in the most significant nibble. A nibble of 0 is an
/// empty cell; nibble `e >= 1` is the tile `2^e`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board(u64);

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board(0);

    /// Construct a `Board` from its raw packed representation.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Board(raw)
    }

    /// Consume this `Board`, returning the raw packed `u64`.
    #[inline]
    pub fn into_raw(self) -> u64 {
        self.0
    }

    /// Borrow the raw packed `u64` for this `Board`.
    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Encode 16 row-major tile values (`0`, or powers of two in `2..=32768`).
    ///
    /// Any other value is rejected with [`BoardError::InvalidTileValue`];
    /// nothing is silently truncated. [`to_cells`](Board::to_cells) of the
    /// result reproduces the input exactly.
    ///
    /// ```
    /// use twenty48_solver::engine::Board;
    ///
    /// let board = Board::from_cells(&[
    ///     2, 0, 0, 0,
    ///     0, 4, 0, 0,
    ///     0, 0, 8, 0,
    ///     0, 0, 0, 16,
    /// ])?;
    /// assert_eq!(board.raw(), 0x1000_0200_0030_0004);
    /// # Ok::<(), twenty48_solver::engine::BoardError>(())
    /// ```
    pub fn from_cells(cells: &[u64]) -> Result<Board, BoardError> {
        if cells.len() != 16 {
            return Err(BoardError::InvalidDimensions {
                expected: 16,
                got: cells.len(),
            });
        }
        let mut raw = 0u64;
        for (idx, &value) in cells.iter().enumerate() {
            let exp = exponent_for(value).ok_or(BoardError::InvalidTileValue {
                row: idx / 4,
                col: idx % 4,
                value,
            })?;
            raw = (raw << 4) | exp as u64;
        }
        Ok(Board(raw))
    }

    /// Decode back to 16 row-major tile values.
    pub fn to_cells(self) -> [u64; 16] {
        let mut cells = [0u64; 16];
        for (idx, cell) in cells.iter_mut().enumerate() {
            *cell = tile_value(self.exponent_at(idx));
        }
        cells
    }

    /// Tile exponent at row-major index `idx` (0 = top-left, 15 = bottom-right).
    #[inline]
    pub(crate) fn exponent_at(self, idx: usize) -> u8 {
        ((self.0 >> ((15 - idx) * 4)) & 0xf) as u8
    }

    #[inline]
    fn with_exponent_at(self, idx: usize, exp: u8) -> Board {
        let shift = (15 - idx) * 4;
        Board((self.0 & !(0xf << shift)) | ((exp as u64) << shift))
    }

    /// Return the board resulting from sliding/merging tiles in `dir` (no
    /// random insert), with the score gained and whether anything moved.
    ///
    /// ```
    /// use twenty48_solver::engine::{self, Board, Direction};
    ///
    /// engine::new();
    /// let out = Board::from_raw(0x0000_0000_0000_1122).shift(Direction::Left);
    /// assert_eq!(out.board.raw(), 0x0000_0000_0000_2300);
    /// assert_eq!(out.score_delta, 12);
    /// ```
    pub fn shift(self, dir: Direction) -> ShiftOutcome<Board> {
        let (board, score_delta) = match dir {
            Direction::Left => self.shift_rows_left(),
            Direction::Right => {
                let (shifted, delta) = self.reverse_rows().shift_rows_left();
                (shifted.reverse_rows(), delta)
            }
            Direction::Up => {
                let (shifted, delta) = self.transpose().shift_rows_left();
                (shifted.transpose(), delta)
            }
            Direction::Down => {
                let (shifted, delta) = self.transpose().reverse_rows().shift_rows_left();
                (shifted.reverse_rows().transpose(), delta)
            }
        };
        ShiftOutcome {
            board,
            score_delta,
            moved: board != self,
        }
    }

    /// Shift every row left through the precomputed table.
    fn shift_rows_left(self) -> (Board, u32) {
        let table = rows::row_table();
        let mut out = 0u64;
        let mut delta = 0u32;
        for r in 0..4 {
            let shift = (3 - r) * 16;
            let entry = table[((self.0 >> shift) & 0xffff) as usize];
            out |= (entry.row as u64) << shift;
            delta += entry.delta;
        }
        (Board(out), delta)
    }

    /// Mirror each row horizontally.
    fn reverse_rows(self) -> Board {
        let x = self.0;
        Board(
            ((x & 0x000f_000f_000f_000f) << 12)
                | ((x & 0x00f0_00f0_00f0_00f0) << 4)
                | ((x & 0x0f00_0f00_0f00_0f00) >> 4)
                | ((x & 0xf000_f000_f000_f000) >> 12),
        )
    }

    /// Reflect the board across its main diagonal so columns become rows.
    pub(crate) fn transpose(self) -> Board {
        let x = self.0;
        let a1 = x & 0xf0f0_0f0f_f0f0_0f0f;
        let a2 = x & 0x0000_f0f0_0000_f0f0;
        let a3 = x & 0x0f0f_0000_0f0f_0000;
        let a = a1 | (a2 << 12) | (a3 >> 12);
        let b1 = a & 0xff00_ff00_00ff_00ff;
        let b2 = a & 0x00ff_00ff_0000_0000;
        let b3 = a & 0x0000_0000_ff00_ff00;
        Board(b1 | (b2 >> 24) | (b3 << 24))
    }

    /// Number of empty cells, without touching each nibble individually.
    pub fn count_empty(self) -> u32 {
        let mut x = self.0;
        x |= (x >> 2) & 0x3333_3333_3333_3333;
        x |= x >> 1;
        (!x & 0x1111_1111_1111_1111).count_ones()
    }

    /// Largest tile exponent on the board (0 for an empty board).
    pub fn highest_exponent(self) -> u8 {
        let mut max = 0u8;
        let mut x = self.0;
        while x != 0 {
            let nib = (x & 0xf) as u8;
            if nib > max {
                max = nib;
            }
            x >>= 4;
        }
        max
    }
}

impl Position for Board {
    fn size(&self) -> usize {
        4
    }

    fn exponent(&self, row: usize, col: usize) -> u8 {
        self.exponent_at(row * 4 + col)
    }

    fn empty_count(&self) -> u32 {
        self.count_empty()
    }

    fn empty_cells(&self) -> SmallVec<[u8; 16]> {
        let mut cells = SmallVec::new();
        for idx in 0..16u8 {
            if self.exponent_at(idx as usize) == 0 {
                cells.push(idx);
            }
        }
        cells
    }

    fn shift(&self, dir: Direction) -> ShiftOutcome<Self> {
        Board::shift(*self, dir)
    }

    fn with_spawn(&self, cell: u8, exponent: u8) -> Self {
        self.with_exponent_at(cell as usize, exponent)
    }
}

impl From<u64> for Board {
    fn from(v: u64) -> Self {
        Board::from_raw(v)
    }
}

impl From<Board> for u64 {
    fn from(b: Board) -> Self {
        b.into_raw()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..4 {
            if row > 0 {
                writeln!(f, "-----------------------------")?;
            }
            for col in 0..4 {
                if col > 0 {
                    write!(f, "|")?;
                }
                match tile_value(self.exponent_at(row * 4 + col)) {
                    0 => write!(f, "{:>6}", ".")?,
                    v => write!(f, "{v:>6}")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
