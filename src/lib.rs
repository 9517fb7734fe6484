//! twenty48-solver: move selection for 2048-style sliding-tile games
//!
//! This crate provides:
//! - A bit-packed `Board` for the classic 4x4 game and a heap-backed `Grid`
//!   for side lengths 2..=16 (`engine` module)
//! - An expectimax search over either board type, with sequential and
//!   parallel variants (`expectimax` module)
//! - A `Solver` facade that validates configuration, picks a search depth per
//!   position and maps plain tile values in and out (`solver` module)
//!
//! Quick start:
//! ```
//! use twenty48_solver::solver::{Solver, SolverConfig};
//!
//! let mut solver = Solver::new(SolverConfig::default())?;
//! let cells = [
//!     2, 0, 0, 0, //
//!     0, 0, 0, 0, //
//!     0, 0, 2, 0, //
//!     0, 0, 0, 0,
//! ];
//! let dir = solver.best_move(&cells)?;
//! assert!(dir.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The engine types are usable on their own when a caller wants to drive the
//! search directly:
//! ```
//! use twenty48_solver::engine::{self, Board, Direction};
//!
//! // One-time table init
//! engine::new();
//!
//! let board = Board::from_raw(0x1100_0000_0000_0000);
//! let out = board.shift(Direction::Left);
//! assert_eq!(out.board.raw(), 0x2000_0000_0000_0000);
//! assert_eq!(out.score_delta, 4);
//! ```
pub mod engine;
pub mod expectimax;
pub mod solver;
