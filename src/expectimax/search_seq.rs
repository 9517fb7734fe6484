//! Single-threaded expectimax search.

use std::time::Instant;

use smallvec::SmallVec;

use crate::engine::{simulate_moves, Direction, Position};

use super::cache::TranspositionTable;
use super::heuristic::{evaluate, Weights};
use super::{warm_tables, BranchEval, SearchConfig, SearchStats};

/// Spawn distribution: a new tile is a 2 with probability 0.9, else a 4.
pub(crate) const SPAWN_TWO_PROB: f64 = 0.9;
pub(crate) const SPAWN_FOUR_PROB: f64 = 0.1;

/// Single-threaded expectimax over any board backend.
///
/// MAX plies take the best legal direction, CHANCE plies average the spawn
/// outcomes by probability, and both descend at depth minus one. The
/// transposition table persists across calls and stores chance-ply values
/// only; a `(board, depth)` key identifies those unambiguously, while max
/// values are cheap to recompute from the table-backed shifts.
pub struct Expectimax<B: Position> {
    config: SearchConfig,
    weights: Weights,
    table: TranspositionTable<B>,
    stats: SearchStats,
}

impl<B: Position> Expectimax<B> {
    /// Build a search engine. Warms the engine's lookup tables.
    pub fn new(config: SearchConfig, weights: Weights) -> Self {
        warm_tables();
        Self {
            config,
            weights,
            table: TranspositionTable::new(config.cache_capacity),
            stats: SearchStats::default(),
        }
    }

    /// Best direction from `board` searching `depth` plies, or `None` when no
    /// direction changes the board. `depth` is clamped to at least 1.
    ///
    /// Deterministic for fixed weights and depth. Ties break in the fixed
    /// order Up, Left, Down, Right; only a strictly better expected value
    /// displaces an earlier direction.
    pub fn best_move(&mut self, board: &B, depth: u32) -> Option<Direction> {
        let depth = depth.max(1);
        let started = Instant::now();
        self.table.advance_generation();
        let mut nodes = 1u64;
        let mut best_dir = None;
        let mut best_score = f64::NEG_INFINITY;
        for dir in Direction::ALL {
            let out = board.shift(dir);
            if !out.moved {
                continue;
            }
            let ev = self.chance_value(&out.board, depth - 1, &mut nodes);
            if ev > best_score {
                best_score = ev;
                best_dir = Some(dir);
            }
        }
        self.finish(depth, nodes, started);
        log::debug!(
            "search depth {depth}: best {best_dir:?}, {} nodes in {} ms",
            self.stats.nodes,
            self.stats.last_move_time_ms
        );
        best_dir
    }

    /// Expected value for each direction at the root (no normalization), in
    /// tie-break order. Illegal branches have `legal == false` and an `ev`
    /// of 0.
    pub fn branch_evals(&mut self, board: &B, depth: u32) -> [BranchEval; 4] {
        let depth = depth.max(1);
        let started = Instant::now();
        self.table.advance_generation();
        let mut nodes = 1u64;
        let out = simulate_moves(board).map(|sim| {
            let ev = if sim.legal {
                self.chance_value(&sim.board, depth - 1, &mut nodes)
            } else {
                0.0
            };
            BranchEval {
                dir: sim.dir,
                ev,
                legal: sim.legal,
            }
        });
        self.finish(depth, nodes, started);
        out
    }

    /// Statistics from the most recent `best_move` or `branch_evals` call.
    #[inline]
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    /// Zero the stats, including the cumulative cache counters.
    pub fn reset_stats(&mut self) {
        self.stats = SearchStats::default();
        self.table.reset_counters();
    }

    /// Forget every cached evaluation.
    pub fn clear_cache(&mut self) {
        self.table.clear();
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Swap the weight set. Cached scores were computed under the old
    /// weights, so the transposition table is cleared.
    pub fn set_weights(&mut self, weights: Weights) {
        self.weights = weights;
        self.table.clear();
    }

    fn max_value(&mut self, board: &B, depth: u32, nodes: &mut u64) -> f64 {
        *nodes += 1;
        if depth == 0 {
            return evaluate(board, &self.weights);
        }
        let mut best = f64::NEG_INFINITY;
        for dir in Direction::ALL {
            let out = board.shift(dir);
            if !out.moved {
                continue;
            }
            let value = self.chance_value(&out.board, depth - 1, nodes);
            if value > best {
                best = value;
            }
        }
        if best == f64::NEG_INFINITY {
            // Dead position: nothing to expand.
            return evaluate(board, &self.weights);
        }
        best
    }

    fn chance_value(&mut self, board: &B, depth: u32, nodes: &mut u64) -> f64 {
        *nodes += 1;
        if depth == 0 {
            return evaluate(board, &self.weights);
        }
        if self.config.cache_enabled {
            if let Some(score) = self.table.get(board, depth) {
                return score;
            }
        }
        let empties = board.empty_cells();
        if empties.is_empty() {
            // Unreachable after a legal move, which always leaves a slot.
            return evaluate(board, &self.weights);
        }
        let candidates = bound_candidates(&empties, self.config.chance_candidates);
        let weight = 1.0 / candidates.len() as f64;
        let mut score = 0.0;
        for &cell in &candidates {
            let with_two = board.with_spawn(cell, 1);
            score += SPAWN_TWO_PROB * weight * self.max_value(&with_two, depth - 1, nodes);
            let with_four = board.with_spawn(cell, 2);
            score += SPAWN_FOUR_PROB * weight * self.max_value(&with_four, depth - 1, nodes);
        }
        if self.config.cache_enabled {
            self.table.put(board.clone(), depth, score);
        }
        score
    }

    fn finish(&mut self, depth: u32, nodes: u64, started: Instant) {
        self.stats.nodes = nodes;
        self.stats.peak_nodes = self.stats.peak_nodes.max(nodes);
        self.stats.cache_hits = self.table.hits();
        self.stats.cache_misses = self.table.misses();
        self.stats.last_depth = depth;
        self.stats.last_move_time_ms = started.elapsed().as_millis() as u64;
    }
}

impl<B: Position> Default for Expectimax<B> {
    fn default() -> Self {
        Self::new(SearchConfig::default(), Weights::default())
    }
}

/// Deterministic subset of the row-major empty-cell list when it is longer
/// than `cap`: one index per stride step, spread across the whole list.
pub(crate) fn bound_candidates(cells: &[u8], cap: usize) -> SmallVec<[u8; 16]> {
    if cells.len() <= cap {
        return SmallVec::from_slice(cells);
    }
    (0..cap).map(|i| cells[i * cells.len() / cap]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Board, Grid};
    use crate::expectimax::heuristic::Difficulty;

    fn search() -> Expectimax<Board> {
        Expectimax::new(SearchConfig::default(), Weights::default())
    }

    #[test]
    fn candidate_bounding_spreads_deterministically() {
        let all: Vec<u8> = (0..16).collect();
        assert_eq!(
            bound_candidates(&all, 8).as_slice(),
            &[0, 2, 4, 6, 8, 10, 12, 14]
        );
        assert_eq!(bound_candidates(&all[..5], 8).as_slice(), &all[..5]);
        assert_eq!(bound_candidates(&all[..3], 2).as_slice(), &[0, 1]);
        assert_eq!(bound_candidates(&all, 1).as_slice(), &[0]);
    }

    #[test]
    fn ties_break_in_fixed_direction_order() {
        // Two 2s on the bottom row. Left and Right both merge into a corner
        // and evaluate identically; Left is declared first, so Left wins.
        let board = Board::from_raw(0x0000_0000_0000_0011);
        assert_eq!(search().best_move(&board, 1), Some(Direction::Left));
    }

    #[test]
    fn best_move_is_deterministic() {
        let board = Board::from_raw(0x0123_1011_2021_1012);
        let mut cached = search();
        let first = cached.best_move(&board, 3);
        assert!(first.is_some());
        for _ in 0..3 {
            assert_eq!(cached.best_move(&board, 3), first);
        }

        let mut uncached = Expectimax::new(
            SearchConfig {
                cache_enabled: false,
                ..SearchConfig::default()
            },
            Weights::default(),
        );
        for _ in 0..3 {
            assert_eq!(uncached.best_move(&board, 3), first);
        }
    }

    #[test]
    fn dead_board_yields_no_move() {
        let board = Board::from_raw(0x1212_2121_1212_2121);
        assert_eq!(search().best_move(&board, 4), None);
        let evals = search().branch_evals(&board, 4);
        assert!(evals.iter().all(|eval| !eval.legal));
    }

    #[test]
    fn repeated_search_reuses_cached_subtrees() {
        let board = Board::from_raw(0x0123_1011_2021_1012);
        let mut search = search();

        search.best_move(&board, 4);
        let first = search.last_stats();
        search.best_move(&board, 4);
        let second = search.last_stats();

        assert!(second.cache_hits > first.cache_hits);
        assert!(second.nodes < first.nodes);
    }

    #[test]
    fn disabling_the_cache_repeats_full_searches() {
        let board = Board::from_raw(0x0123_1011_2021_1012);
        let mut search = Expectimax::new(
            SearchConfig {
                cache_enabled: false,
                ..SearchConfig::default()
            },
            Weights::default(),
        );

        search.best_move(&board, 3);
        let first = search.last_stats();
        search.best_move(&board, 3);
        let second = search.last_stats();

        assert_eq!(first.cache_hits, 0);
        assert_eq!(second.cache_hits, 0);
        assert_eq!(first.nodes, second.nodes);
    }

    #[test]
    fn changing_weights_invalidates_cached_scores() {
        let board = Board::from_raw(0x0123_1011_2021_1012);
        let mut search = search();

        search.best_move(&board, 3);
        let first = search.last_stats();
        search.set_weights(Difficulty::Hard.weights());
        search.best_move(&board, 3);
        let second = search.last_stats();

        // Same tree shape, no reusable entries: the second search revisits
        // exactly as many nodes as the first.
        assert_eq!(second.nodes, first.nodes);
    }

    #[test]
    fn branch_evals_agree_with_best_move() {
        let board = Board::from_raw(0x0123_1011_2021_1012);
        let mut search = search();
        let evals = search.branch_evals(&board, 3);
        let best = search.best_move(&board, 3);

        let mut expect = None;
        let mut expect_ev = f64::NEG_INFINITY;
        for eval in evals {
            if eval.legal && eval.ev > expect_ev {
                expect_ev = eval.ev;
                expect = Some(eval.dir);
            }
        }
        assert_eq!(best, expect);
    }

    #[test]
    fn zero_depth_is_clamped() {
        let board = Board::from_raw(0x0000_0000_0000_0011);
        let mut search = search();
        assert_eq!(search.best_move(&board, 0), search.best_move(&board, 1));
        assert_eq!(search.last_stats().last_depth, 1);
    }

    #[test]
    fn stats_track_peaks_and_reset() {
        let board = Board::from_raw(0x0123_1011_2021_1012);
        let mut search = search();

        search.best_move(&board, 4);
        let deep = search.last_stats();
        search.clear_cache();
        search.best_move(&board, 1);
        let shallow = search.last_stats();

        assert!(shallow.nodes < deep.nodes);
        assert_eq!(shallow.peak_nodes, deep.peak_nodes.max(shallow.nodes));
        assert_eq!(shallow.last_depth, 1);

        search.reset_stats();
        let reset = search.last_stats();
        assert_eq!(reset.nodes, 0);
        assert_eq!(reset.peak_nodes, 0);
        assert_eq!(reset.cache_hits, 0);
        assert_eq!(reset.cache_misses, 0);
    }

    #[test]
    fn grid_and_bitboard_choose_the_same_move() {
        let cells = [
            2, 2, 4, 4, //
            0, 2, 0, 2, //
            8, 0, 8, 0, //
            2, 4, 8, 16,
        ];
        let board = Board::from_cells(&cells).unwrap();
        let grid = Grid::from_cells(4, &cells).unwrap();

        let mut tabled: Expectimax<Board> = Expectimax::default();
        let mut direct: Expectimax<Grid> = Expectimax::default();
        for depth in 1..=3 {
            assert_eq!(
                tabled.best_move(&board, depth),
                direct.best_move(&grid, depth),
                "depth {depth}"
            );
        }
    }
}
