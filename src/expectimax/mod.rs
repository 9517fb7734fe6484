//! Expectimax move selection (single-threaded and parallel).
//!
//! This module provides two search engines over the same evaluation:
//! - [`Expectimax`]: single-threaded, generic over any board backend.
//! - [`ExpectimaxParallel`]: rayon-based variant for the 4x4 bitboard that
//!   evaluates the four root branches in parallel.
//!
//! Notes
//! - The engine's lookup tables are initialized lazily; the constructors warm
//!   them for you. It is still fine to call `engine::new()` yourself.
//! - Search is deterministic for fixed weights and depth; randomness only
//!   exists in callers that actually spawn tiles.
//!
//! Quick start
//! ```
//! use twenty48_solver::engine::{self, Board};
//! use twenty48_solver::expectimax::heuristic::Weights;
//! use twenty48_solver::expectimax::{Expectimax, SearchConfig};
//!
//! engine::new();
//! let board = Board::from_raw(0x0000_0000_0000_0011);
//! let mut search = Expectimax::new(SearchConfig::default(), Weights::default());
//! assert!(search.best_move(&board, 3).is_some());
//! ```

use serde::{Deserialize, Serialize};

use crate::engine::{self, Direction};

pub(crate) mod cache;
pub mod depth;
pub mod heuristic;
mod search_par;
mod search_seq;

pub use search_par::ExpectimaxParallel;
pub use search_seq::Expectimax;

/// Configurable knobs for the search. Defaults match the solver's defaults.
///
/// - `chance_candidates`: most empty cells expanded per chance ply; beyond it
///   a deterministic stride-spread subset of the row-major empty list is used.
/// - `cache_capacity`: transposition table size, in entries.
/// - `cache_enabled`: enable/disable transposition caching.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Most empty cells expanded per chance ply.
    pub chance_candidates: usize,
    /// Transposition table capacity, in entries.
    pub cache_capacity: usize,
    /// Enable/disable transposition caching.
    pub cache_enabled: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            chance_candidates: 8,
            cache_capacity: 1 << 17,
            cache_enabled: true,
        }
    }
}

impl SearchConfig {
    /// Reject configurations the search cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chance_candidates == 0 {
            return Err(ConfigError::ZeroChanceCandidates);
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }
        Ok(())
    }
}

/// Per-branch expected value at the root (no normalization).
///
/// - `ev` is the expected value for taking `dir` from the current board.
/// - `legal` is false when the move is a no-op for the current board; `ev` is
///   meaningless for those branches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BranchEval {
    pub dir: Direction,
    pub ev: f64,
    pub legal: bool,
}

/// Counters for the most recent search, plus cumulative cache totals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SearchStats {
    /// Nodes visited by the most recent call.
    pub nodes: u64,
    /// Largest per-call node count observed since the last reset.
    pub peak_nodes: u64,
    /// Transposition hits, cumulative across calls.
    pub cache_hits: u64,
    /// Transposition misses, cumulative across calls.
    pub cache_misses: u64,
    /// Wall-clock time of the most recent call, in milliseconds.
    pub last_move_time_ms: u64,
    /// Search depth used by the most recent call.
    pub last_depth: u32,
}

/// Rejected configuration. Raised when a solver or search is constructed or
/// updated; the previous configuration stays in effect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Board side length outside the supported range.
    #[error("unsupported board size {size}; sizes 2..=16 are supported")]
    UnsupportedSize { size: usize },
    /// A heuristic weight is NaN, infinite or negative.
    #[error("weight `{field}` must be finite and non-negative, got {value}")]
    InvalidWeight { field: &'static str, value: f64 },
    /// Depth bounds that cross or start at zero.
    #[error("invalid depth range {min}..={max}; need 1 <= min <= max")]
    InvalidDepthRange { min: u32, max: u32 },
    #[error("transposition cache capacity must be nonzero")]
    ZeroCacheCapacity,
    #[error("chance candidate bound must be nonzero")]
    ZeroChanceCandidates,
}

/// Common helper for constructors to ensure tables are initialized.
fn warm_tables() {
    // Safe to call multiple times.
    engine::new();
}
