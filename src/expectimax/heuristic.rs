//! Board evaluation: a weighted sum of four handcrafted terms.
//!
//! Evaluation is pure. It reads the board and the weight set and touches no
//! other state, so cached scores stay valid for as long as the weights do.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::engine::Position;

use super::ConfigError;

/// Heuristic term weights.
///
/// Each term carries its own sign internally (penalties subtract), so every
/// weight is a non-negative scale factor. Components must be finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Reward per empty cell.
    pub openness: f64,
    /// Scale of the penalty on exponent gaps between adjacent tiles.
    pub smoothness: f64,
    /// Scale of the penalty on non-monotonic rows and columns.
    pub monotonicity: f64,
    /// Scale of the reward for parking the largest tile in a corner.
    pub corner_bonus: f64,
}

impl Weights {
    /// Reject weight sets the evaluator cannot use. Nothing is applied on
    /// error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("openness", self.openness),
            ("smoothness", self.smoothness),
            ("monotonicity", self.monotonicity),
            ("corner_bonus", self.corner_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { field, value });
            }
        }
        Ok(())
    }
}

impl Default for Weights {
    fn default() -> Self {
        Difficulty::Normal.weights()
    }
}

/// Preset weight tiers. Selecting a tier swaps the whole weight set at once;
/// there is no string-keyed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl Difficulty {
    /// All tiers, weakest first.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// The tier's weight set.
    ///
    /// | tier   | openness | smoothness | monotonicity | corner_bonus |
    /// |--------|----------|------------|--------------|--------------|
    /// | easy   | 1.0      | 0.05       | 0.3          | 0.5          |
    /// | normal | 2.7      | 0.1        | 1.0          | 1.0          |
    /// | hard   | 4.0      | 0.2        | 2.0          | 1.8          |
    /// | expert | 4.5      | 0.25       | 2.5          | 2.2          |
    pub fn weights(self) -> Weights {
        match self {
            Difficulty::Easy => Weights {
                openness: 1.0,
                smoothness: 0.05,
                monotonicity: 0.3,
                corner_bonus: 0.5,
            },
            Difficulty::Normal => Weights {
                openness: 2.7,
                smoothness: 0.1,
                monotonicity: 1.0,
                corner_bonus: 1.0,
            },
            Difficulty::Hard => Weights {
                openness: 4.0,
                smoothness: 0.2,
                monotonicity: 2.0,
                corner_bonus: 1.8,
            },
            Difficulty::Expert => Weights {
                openness: 4.5,
                smoothness: 0.25,
                monotonicity: 2.5,
                corner_bonus: 2.2,
            },
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        };
        f.write_str(name)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            other => Err(format!(
                "unknown difficulty `{other}`; expected easy, normal, hard or expert"
            )),
        }
    }
}

/// Score a position. Higher is better for the moving player.
///
/// Terms:
/// - openness: `empty_count * openness`
/// - smoothness: `-sum(|exp(a) - exp(b)|)` over orthogonally adjacent nonzero
///   pairs, scaled by `smoothness`
/// - monotonicity: for each row and column, the smaller of its total upward
///   and total downward exponent steps (0 for a perfectly monotone line, in
///   either direction, counting empties as exponent 0), summed, negated, and
///   scaled by `monotonicity`
/// - corner bonus: `corner_bonus * max_exponent` when some maximum tile sits
///   in a corner, half that when the best-placed one sits on an edge, else 0
pub fn evaluate<B: Position>(board: &B, weights: &Weights) -> f64 {
    let n = board.size();
    let mut exps: SmallVec<[u8; 16]> = SmallVec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            exps.push(board.exponent(row, col));
        }
    }

    let empties = exps.iter().filter(|&&e| e == 0).count() as f64;

    let mut gaps = 0u32;
    for row in 0..n {
        for col in 0..n {
            let e = exps[row * n + col];
            if e == 0 {
                continue;
            }
            if col + 1 < n {
                let right = exps[row * n + col + 1];
                if right != 0 {
                    gaps += e.abs_diff(right) as u32;
                }
            }
            if row + 1 < n {
                let below = exps[(row + 1) * n + col];
                if below != 0 {
                    gaps += e.abs_diff(below) as u32;
                }
            }
        }
    }

    let mut disorder = 0u32;
    for row in 0..n {
        disorder += line_penalty(n, |i| exps[row * n + i]);
    }
    for col in 0..n {
        disorder += line_penalty(n, |i| exps[i * n + col]);
    }

    let best = exps.iter().copied().max().unwrap_or(0);
    let corner = if best == 0 {
        0.0
    } else {
        // Best placement among all cells holding the maximum tile:
        // corner beats edge beats interior.
        let mut placement = 0u8;
        for row in 0..n {
            for col in 0..n {
                if exps[row * n + col] != best {
                    continue;
                }
                let row_edge = row == 0 || row == n - 1;
                let col_edge = col == 0 || col == n - 1;
                let class = match (row_edge, col_edge) {
                    (true, true) => 2,
                    (false, false) => 0,
                    _ => 1,
                };
                placement = placement.max(class);
            }
        }
        match placement {
            2 => weights.corner_bonus * best as f64,
            1 => 0.5 * weights.corner_bonus * best as f64,
            _ => 0.0,
        }
    };

    empties * weights.openness - gaps as f64 * weights.smoothness
        - disorder as f64 * weights.monotonicity
        + corner
}

/// Smaller of a line's total upward and total downward exponent steps. Zero
/// for a line that is monotone in either direction.
fn line_penalty(n: usize, at: impl Fn(usize) -> u8) -> u32 {
    let mut rises = 0u32;
    let mut falls = 0u32;
    for i in 1..n {
        let prev = at(i - 1);
        let next = at(i);
        if next > prev {
            rises += (next - prev) as u32;
        } else {
            falls += (prev - next) as u32;
        }
    }
    rises.min(falls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Board, Grid};

    const ZERO: Weights = Weights {
        openness: 0.0,
        smoothness: 0.0,
        monotonicity: 0.0,
        corner_bonus: 0.0,
    };

    #[test]
    fn tiers_escalate() {
        for pair in Difficulty::ALL.windows(2) {
            let (lo, hi) = (pair[0].weights(), pair[1].weights());
            assert!(lo.openness < hi.openness);
            assert!(lo.smoothness < hi.smoothness);
            assert!(lo.monotonicity < hi.monotonicity);
            assert!(lo.corner_bonus < hi.corner_bonus);
        }
    }

    #[test]
    fn validate_rejects_bad_components() {
        assert!(Weights::default().validate().is_ok());

        let w = Weights {
            smoothness: -0.1,
            ..Weights::default()
        };
        assert_eq!(
            w.validate(),
            Err(ConfigError::InvalidWeight {
                field: "smoothness",
                value: -0.1
            })
        );

        let w = Weights {
            openness: f64::NAN,
            ..Weights::default()
        };
        assert!(matches!(
            w.validate(),
            Err(ConfigError::InvalidWeight {
                field: "openness",
                ..
            })
        ));

        let w = Weights {
            corner_bonus: f64::INFINITY,
            ..Weights::default()
        };
        assert!(matches!(
            w.validate(),
            Err(ConfigError::InvalidWeight {
                field: "corner_bonus",
                ..
            })
        ));
    }

    #[test]
    fn openness_counts_empty_cells() {
        let w = Weights {
            openness: 1.0,
            ..ZERO
        };
        assert_eq!(evaluate(&Board::EMPTY, &w), 16.0);
        assert_eq!(evaluate(&Board::from_raw(0x1000_0000_0000_0002), &w), 14.0);
    }

    #[test]
    fn smoothness_penalizes_adjacent_gaps() {
        let w = Weights {
            smoothness: 1.0,
            ..ZERO
        };
        // 2 next to 8: one horizontal pair with exponent gap 2. The lone-tile
        // corner term is off, so the gap is the whole score.
        let board = Board::from_raw(0x1300_0000_0000_0000);
        assert_eq!(evaluate(&board, &w), -2.0);
        // Empty neighbors contribute nothing.
        assert_eq!(evaluate(&Board::from_raw(0x1010_0000_0000_0000), &w), 0.0);
    }

    #[test]
    fn monotone_lines_carry_no_penalty() {
        let w = Weights {
            monotonicity: 1.0,
            ..ZERO
        };
        // Top row 2,4,8,16 ascending; columns fall off to empties. Both
        // directions are monotone, so no line is penalized.
        assert_eq!(evaluate(&Board::from_raw(0x1234_0000_0000_0000), &w), 0.0);
        // 2,8,2: two rises against three falls leaves a penalty of two.
        assert_eq!(evaluate(&Board::from_raw(0x1310_0000_0000_0000), &w), -2.0);
    }

    #[test]
    fn corner_bonus_prefers_corner_then_edge() {
        let w = Weights {
            corner_bonus: 1.0,
            ..ZERO
        };
        let corner = Board::EMPTY.with_spawn(0, 5);
        let edge = Board::EMPTY.with_spawn(1, 5);
        let interior = Board::EMPTY.with_spawn(5, 5);
        assert_eq!(evaluate(&corner, &w), 5.0);
        assert_eq!(evaluate(&edge, &w), 2.5);
        assert_eq!(evaluate(&interior, &w), 0.0);
    }

    #[test]
    fn backends_evaluate_identically() {
        let cells = [
            2, 2, 4, 4, //
            0, 2, 0, 2, //
            8, 0, 8, 0, //
            2, 4, 8, 16,
        ];
        let board = Board::from_cells(&cells).unwrap();
        let grid = Grid::from_cells(4, &cells).unwrap();
        for tier in Difficulty::ALL {
            let w = tier.weights();
            assert_eq!(evaluate(&board, &w), evaluate(&grid, &w));
        }
    }

    #[test]
    fn evaluation_is_pure() {
        let board = Board::from_raw(0x1234_1332_2002_1002);
        let w = Difficulty::Hard.weights();
        assert_eq!(evaluate(&board, &w), evaluate(&board, &w));
    }

    #[test]
    fn difficulty_round_trips_through_strings() {
        for tier in Difficulty::ALL {
            assert_eq!(tier.to_string().parse::<Difficulty>(), Ok(tier));
        }
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());
    }
}
