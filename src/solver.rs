//! The caller-facing solver: configuration, backend selection, move API.
//!
//! A [`Solver`] is one configured instance bound to a board size for its
//! lifetime. Callers hand it a row-major snapshot of tile values and get back
//! a direction (or `None` when the position is dead); applying the move and
//! spawning the next tile stay on the caller's side.

use serde::{Deserialize, Serialize};

use crate::engine::{Board, BoardError, Direction, Grid, Position};
use crate::expectimax::depth::{DepthController, DepthProfile};
use crate::expectimax::heuristic::{Difficulty, Weights};
use crate::expectimax::{Expectimax, SearchConfig, SearchStats};

pub use crate::expectimax::ConfigError;

/// Solver construction parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Board side length. 4 binds the bit-packed table-driven backend; other
    /// sizes in `2..=16` bind the direct grid backend.
    pub size: usize,
    /// Difficulty tier supplying the weight set.
    pub difficulty: Difficulty,
    /// Explicit weight override. `None` uses the tier's weights.
    pub weights: Option<Weights>,
    pub search: SearchConfig,
    pub depth: DepthProfile,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            size: 4,
            difficulty: Difficulty::Normal,
            weights: None,
            search: SearchConfig::default(),
            depth: DepthProfile::default(),
        }
    }
}

enum Backend {
    Tabled(Expectimax<Board>),
    Direct(Expectimax<Grid>),
}

/// Move-selection engine for one board size and one weight set at a time.
///
/// ```
/// use twenty48_solver::solver::{Solver, SolverConfig};
///
/// let mut solver = Solver::new(SolverConfig::default())?;
/// let cells = [
///     2, 0, 0, 0, //
///     0, 0, 0, 0, //
///     0, 0, 0, 2, //
///     0, 0, 0, 0,
/// ];
/// assert!(solver.best_move(&cells)?.is_some());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Solver {
    size: usize,
    difficulty: Difficulty,
    backend: Backend,
    controller: DepthController,
}

impl Solver {
    /// Validate `config` and build a solver. Nothing is applied on error.
    pub fn new(config: SolverConfig) -> Result<Solver, ConfigError> {
        if !(Grid::MIN_SIZE..=Grid::MAX_SIZE).contains(&config.size) {
            return Err(ConfigError::UnsupportedSize { size: config.size });
        }
        config.search.validate()?;
        config.depth.validate()?;
        let weights = match config.weights {
            Some(weights) => {
                weights.validate()?;
                weights
            }
            None => config.difficulty.weights(),
        };
        let backend = if config.size == 4 {
            Backend::Tabled(Expectimax::new(config.search, weights))
        } else {
            Backend::Direct(Expectimax::new(config.search, weights))
        };
        log::info!(
            "solver ready: {0}x{0} board, {1} difficulty",
            config.size,
            config.difficulty
        );
        Ok(Solver {
            size: config.size,
            difficulty: config.difficulty,
            backend,
            controller: DepthController::new(config.depth),
        })
    }

    /// Best direction for the position in `cells` (row-major, length N², each
    /// value 0 or a power of two in `2..=32768`).
    ///
    /// `Ok(None)` means no direction changes the board: the game is over.
    pub fn best_move(&mut self, cells: &[u64]) -> Result<Option<Direction>, BoardError> {
        let best = match &mut self.backend {
            Backend::Tabled(search) => {
                let board = Board::from_cells(cells)?;
                let depth = self.controller.choose(board.count_empty());
                search.best_move(&board, depth)
            }
            Backend::Direct(search) => {
                let grid = Grid::from_cells(self.size, cells)?;
                let depth = self.controller.choose(grid.empty_count());
                search.best_move(&grid, depth)
            }
        };
        self.controller.record(self.stats().last_move_time_ms);
        Ok(best)
    }

    /// Replace the weight set. Rejected weights leave the old set in effect.
    pub fn set_weights(&mut self, weights: Weights) -> Result<(), ConfigError> {
        weights.validate()?;
        match &mut self.backend {
            Backend::Tabled(search) => search.set_weights(weights),
            Backend::Direct(search) => search.set_weights(weights),
        }
        Ok(())
    }

    /// Switch difficulty tier, swapping in its weight set.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        let weights = difficulty.weights();
        match &mut self.backend {
            Backend::Tabled(search) => search.set_weights(weights),
            Backend::Direct(search) => search.set_weights(weights),
        }
        log::debug!("difficulty set to {difficulty}");
    }

    /// Counters from the most recent search.
    pub fn stats(&self) -> SearchStats {
        match &self.backend {
            Backend::Tabled(search) => search.last_stats(),
            Backend::Direct(search) => search.last_stats(),
        }
    }

    /// Start a fresh game: forget evaluations cached for the previous one.
    pub fn new_game(&mut self) {
        match &mut self.backend {
            Backend::Tabled(search) => search.clear_cache(),
            Backend::Direct(search) => search.clear_cache(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// The weight set currently in effect.
    pub fn weights(&self) -> Weights {
        match &self.backend {
            Backend::Tabled(search) => *search.weights(),
            Backend::Direct(search) => *search.weights(),
        }
    }
}
