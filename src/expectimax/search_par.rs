//! Root-parallel expectimax over the 4x4 bitboard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use ahash::RandomState as AHasher;
use dashmap::DashMap;
use rayon::prelude::*;

use crate::engine::{Board, Direction, Position};

use super::heuristic::{evaluate, Weights};
use super::search_seq::{bound_candidates, SPAWN_FOUR_PROB, SPAWN_TWO_PROB};
use super::{warm_tables, BranchEval, SearchConfig, SearchStats};

#[derive(Clone, Copy)]
struct CacheEntry {
    score: f64,
    depth: u32,
}

type ShardMap = DashMap<Board, CacheEntry, AHasher>;

#[derive(Default)]
struct Counters {
    nodes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Parallel expectimax: the four root branches are evaluated on rayon workers
/// over immutable board snapshots, sharing one `DashMap` transposition map
/// for the duration of the call. Below the root the search is sequential.
///
/// Branch results are merged in the fixed tie-break order: ties resolve by
/// declaration order, never by which worker finished first. Depth-subsumed
/// hits in the shared map can still vary branch values from run to run at
/// deeper depths.
pub struct ExpectimaxParallel {
    config: SearchConfig,
    weights: Weights,
    stats: SearchStats,
}

impl ExpectimaxParallel {
    /// Build a parallel search engine. Warms the engine's lookup tables.
    pub fn new(config: SearchConfig, weights: Weights) -> Self {
        warm_tables();
        Self {
            config,
            weights,
            stats: SearchStats::default(),
        }
    }

    /// Best direction from `board` searching `depth` plies, or `None` when no
    /// direction changes the board. `depth` is clamped to at least 1.
    #[inline]
    pub fn best_move(&mut self, board: &Board, depth: u32) -> Option<Direction> {
        self.best_move_with_branches(board, depth).0
    }

    /// Best direction plus the per-branch evaluations it was picked from.
    pub fn best_move_with_branches(
        &mut self,
        board: &Board,
        depth: u32,
    ) -> (Option<Direction>, [BranchEval; 4]) {
        let branches = self.branch_evals(board, depth);
        let mut best = None;
        let mut best_ev = f64::NEG_INFINITY;
        for branch in &branches {
            if branch.legal && branch.ev > best_ev {
                best_ev = branch.ev;
                best = Some(branch.dir);
            }
        }
        (best, branches)
    }

    /// Expected value for each direction at the root, in tie-break order,
    /// with the four branches searched in parallel.
    pub fn branch_evals(&mut self, board: &Board, depth: u32) -> [BranchEval; 4] {
        let depth = depth.max(1);
        let started = Instant::now();
        let map: ShardMap = DashMap::with_hasher(AHasher::new());
        let counters = Counters::default();
        counters.nodes.fetch_add(1, Ordering::Relaxed);

        let evals: Vec<(usize, BranchEval)> = Direction::ALL
            .par_iter()
            .enumerate()
            .map(|(i, &dir)| {
                let shifted = board.shift(dir);
                if shifted.moved {
                    let ev = self.chance_value(shifted.board, depth - 1, &map, &counters);
                    (
                        i,
                        BranchEval {
                            dir,
                            ev,
                            legal: true,
                        },
                    )
                } else {
                    (
                        i,
                        BranchEval {
                            dir,
                            ev: 0.0,
                            legal: false,
                        },
                    )
                }
            })
            .collect();

        let mut out = Direction::ALL.map(|dir| BranchEval {
            dir,
            ev: 0.0,
            legal: false,
        });
        for (i, eval) in evals {
            out[i] = eval;
        }

        let nodes = counters.nodes.load(Ordering::Relaxed);
        self.stats.nodes = nodes;
        self.stats.peak_nodes = self.stats.peak_nodes.max(nodes);
        self.stats.cache_hits += counters.hits.load(Ordering::Relaxed);
        self.stats.cache_misses += counters.misses.load(Ordering::Relaxed);
        self.stats.last_depth = depth;
        self.stats.last_move_time_ms = started.elapsed().as_millis() as u64;
        out
    }

    /// Statistics from the most recent call.
    #[inline]
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    /// Zero the stats.
    #[inline]
    pub fn reset_stats(&mut self) {
        self.stats = SearchStats::default();
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Swap the weight set. The transposition map lives per call, so there is
    /// nothing stale to clear.
    pub fn set_weights(&mut self, weights: Weights) {
        self.weights = weights;
    }

    fn max_value(&self, board: Board, depth: u32, map: &ShardMap, counters: &Counters) -> f64 {
        counters.nodes.fetch_add(1, Ordering::Relaxed);
        if depth == 0 {
            return evaluate(&board, &self.weights);
        }
        let mut best = f64::NEG_INFINITY;
        for dir in Direction::ALL {
            let out = board.shift(dir);
            if !out.moved {
                continue;
            }
            let value = self.chance_value(out.board, depth - 1, map, counters);
            if value > best {
                best = value;
            }
        }
        if best == f64::NEG_INFINITY {
            return evaluate(&board, &self.weights);
        }
        best
    }

    fn chance_value(&self, board: Board, depth: u32, map: &ShardMap, counters: &Counters) -> f64 {
        counters.nodes.fetch_add(1, Ordering::Relaxed);
        if depth == 0 {
            return evaluate(&board, &self.weights);
        }
        if self.config.cache_enabled {
            if let Some(entry) = map.get(&board) {
                if entry.depth >= depth {
                    counters.hits.fetch_add(1, Ordering::Relaxed);
                    return entry.score;
                }
            }
            counters.misses.fetch_add(1, Ordering::Relaxed);
        }
        let empties = board.empty_cells();
        if empties.is_empty() {
            return evaluate(&board, &self.weights);
        }
        let candidates = bound_candidates(&empties, self.config.chance_candidates);
        let weight = 1.0 / candidates.len() as f64;
        let mut score = 0.0;
        for &cell in &candidates {
            let with_two = board.with_spawn(cell, 1);
            score += SPAWN_TWO_PROB * weight * self.max_value(with_two, depth - 1, map, counters);
            let with_four = board.with_spawn(cell, 2);
            score += SPAWN_FOUR_PROB * weight * self.max_value(with_four, depth - 1, map, counters);
        }
        if self.config.cache_enabled {
            map.insert(board, CacheEntry { score, depth });
        }
        score
    }
}

impl Default for ExpectimaxParallel {
    fn default() -> Self {
        Self::new(SearchConfig::default(), Weights::default())
    }
}
