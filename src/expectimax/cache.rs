//! Depth-aware transposition table with generation-based eviction.
//!
//! Entries are keyed by the board alone; only chance-ply values are stored,
//! so the key never has to distinguish node kinds. An entry answers a lookup
//! only when it was computed at least as deep as the caller is asking for.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use ahash::RandomState;

/// A cached chance-ply evaluation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TtEntry {
    pub score: f64,
    pub depth: u32,
    pub generation: u64,
}

/// Bounded map from board to [`TtEntry`].
///
/// The generation counter advances once per root search. When an insert would
/// push the map past `capacity`, whole generations are dropped oldest-first
/// until at most three quarters of the capacity remains.
pub(crate) struct TranspositionTable<B> {
    map: HashMap<B, TtEntry, RandomState>,
    capacity: usize,
    generation: u64,
    hits: u64,
    misses: u64,
}

impl<B: Eq + Hash> TranspositionTable<B> {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_hasher(RandomState::new()),
            capacity,
            generation: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Stamp subsequent inserts with a fresh generation. Call once per root
    /// search.
    pub fn advance_generation(&mut self) {
        self.generation += 1;
    }

    /// Usable cached score for `board`, if one was stored at `depth` or
    /// deeper. Shallower entries count as misses.
    pub fn get(&mut self, board: &B, depth: u32) -> Option<f64> {
        match self.map.get(board) {
            Some(entry) if entry.depth >= depth => {
                self.hits += 1;
                Some(entry.score)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert or overwrite the entry for `board`, evicting old generations
    /// first if the table is full.
    pub fn put(&mut self, board: B, depth: u32, score: f64) {
        if self.map.len() >= self.capacity && !self.map.contains_key(&board) {
            self.evict();
        }
        self.map.insert(
            board,
            TtEntry {
                score,
                depth,
                generation: self.generation,
            },
        );
    }

    /// Drop whole generations, oldest first, until at most ~3/4 of capacity
    /// remains. The current generation goes too when it is the only one left.
    fn evict(&mut self) {
        let target = self.capacity * 3 / 4;
        let mut by_generation: BTreeMap<u64, usize> = BTreeMap::new();
        for entry in self.map.values() {
            *by_generation.entry(entry.generation).or_default() += 1;
        }
        let mut remaining = self.map.len();
        let mut cutoff = 0u64;
        for (generation, count) in by_generation {
            if remaining <= target {
                break;
            }
            remaining -= count;
            cutoff = generation + 1;
        }
        if cutoff > 0 {
            let before = self.map.len();
            self.map.retain(|_, entry| entry.generation >= cutoff);
            log::trace!(
                "transposition table evicted {} entries below generation {cutoff}",
                before - self.map.len()
            );
        }
    }

    /// Forget every entry. Counters and the generation stamp survive.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn reset_counters(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
