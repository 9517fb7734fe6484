//! Row compaction and the precomputed move table.
//!
//! [`shift_row_left`] is the single source of merge semantics: compact toward
//! index 0, merge adjacent equal pairs left-to-right with each tile merging at
//! most once, and never re-merge a tile produced in the same pass. The 65,536
//! entry table is built from it for the 4-cell fast path; longer rows call it
//! directly.

use std::sync::OnceLock;

/// One entry per 16-bit row pattern.
pub(crate) const ROW_TABLE_SIZE: usize = 0x1_0000;

/// Largest representable tile exponent with 4 bits per cell.
pub(crate) const MAX_EXPONENT: u8 = 15;

/// Left-shift result for one 4-cell row. `changed` is derivable: the move was
/// a no-op exactly when `row` equals the table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowShift {
    pub row: u16,
    pub delta: u32,
}

static ROW_TABLE: OnceLock<Box<[RowShift]>> = OnceLock::new();

pub(crate) fn row_table() -> &'static [RowShift] {
    ROW_TABLE.get_or_init(build_row_table).as_ref()
}

fn build_row_table() -> Box<[RowShift]> {
    // Heap allocation keeps the 512 KiB table off the stack.
    let mut table = vec![RowShift { row: 0, delta: 0 }; ROW_TABLE_SIZE];
    for (key, slot) in table.iter_mut().enumerate() {
        let mut cells = unpack_row(key as u16);
        let (delta, _) = shift_row_left(&mut cells);
        *slot = RowShift {
            row: pack_row(&cells),
            delta,
        };
    }
    table.into_boxed_slice()
}

/// Compact and merge a row of tile exponents toward index 0, in place.
///
/// Returns the score delta (sum of face values of tiles produced by merges)
/// and whether the row changed. Works on any row length; exponents already at
/// [`MAX_EXPONENT`] never merge, since the merged tile would not fit a nibble.
pub(crate) fn shift_row_left(cells: &mut [u8]) -> (u32, bool) {
    let mut write = 0usize;
    let mut delta = 0u32;
    let mut changed = false;
    // Index of the last written cell still eligible to merge.
    let mut open: Option<usize> = None;
    for read in 0..cells.len() {
        let exp = cells[read];
        if exp == 0 {
            continue;
        }
        if let Some(prev) = open {
            if cells[prev] == exp && exp < MAX_EXPONENT {
                cells[prev] += 1;
                delta += 1u32 << cells[prev];
                open = None;
                changed = true;
                continue;
            }
        }
        if write != read {
            cells[write] = exp;
            changed = true;
        }
        open = Some(write);
        write += 1;
    }
    for cell in cells[write..].iter_mut() {
        *cell = 0;
    }
    (delta, changed)
}

/// Split a 16-bit row into 4 exponents, leftmost cell first.
pub(crate) fn unpack_row(row: u16) -> [u8; 4] {
    [
        ((row >> 12) & 0xf) as u8,
        ((row >> 8) & 0xf) as u8,
        ((row >> 4) & 0xf) as u8,
        (row & 0xf) as u8,
    ]
}

/// Inverse of [`unpack_row`].
pub(crate) fn pack_row(cells: &[u8; 4]) -> u16 {
    ((cells[0] as u16) << 12) | ((cells[1] as u16) << 8) | ((cells[2] as u16) << 4) | cells[3] as u16
}
