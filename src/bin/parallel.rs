use std::time::{Duration, Instant};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use twenty48_solver::engine::{self, Board, Position};
use twenty48_solver::expectimax::heuristic::Difficulty;
use twenty48_solver::expectimax::{ExpectimaxParallel, SearchConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    engine::new();

    let mut search = ExpectimaxParallel::new(SearchConfig::default(), args.difficulty.weights());
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let board = spawn_tile(&mut rng, Board::EMPTY);
    let mut board = spawn_tile(&mut rng, board);

    let pb = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} | Moves: {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let start = Instant::now();
    let mut move_count: u64 = 0;
    let mut score: u64 = 0;

    while let Some(dir) = search.best_move(&board, args.depth) {
        let out = board.shift(dir);
        score += u64::from(out.score_delta);
        board = spawn_tile(&mut rng, out.board);
        move_count += 1;

        if let Some(limit) = args.steps {
            if move_count >= limit {
                break;
            }
        }
        if let Some(target) = args.stop_tile {
            if (1u64 << board.highest_exponent()) >= target {
                break;
            }
        }
        if let Some(pb) = &pb {
            let rate = (move_count as f64) / start.elapsed().as_secs_f64().max(1e-6);
            pb.set_message(format!(
                "{} | moves/sec: {:.1} | score: {} | nodes/move: {}",
                move_count,
                rate,
                score,
                search.last_stats().nodes
            ));
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let elapsed = start.elapsed().as_secs_f64().max(1e-6);
    let stats = search.last_stats();
    println!(
        "Moves: {} | moves/sec: {:.1} | score: {} | highest tile: {} | peak nodes/move: {}",
        move_count,
        (move_count as f64) / elapsed,
        score,
        1u64 << board.highest_exponent(),
        stats.peak_nodes
    );
    Ok(())
}

fn spawn_tile(rng: &mut StdRng, board: Board) -> Board {
    let empties = board.empty_cells();
    if empties.is_empty() {
        return board;
    }
    let cell = empties[rng.gen_range(0..empties.len())];
    let exponent = if rng.gen_bool(0.9) { 1 } else { 2 };
    board.with_spawn(cell, exponent)
}

#[derive(Debug, Parser)]
#[command(name = "parallel", about = "Parallel 2048 expectimax runner")]
struct Args {
    /// Search depth for every move
    #[arg(long, default_value_t = 4)]
    depth: u32,

    /// Difficulty tier: easy, normal, hard or expert
    #[arg(long, default_value = "normal")]
    difficulty: Difficulty,

    /// Stop after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// Stop once the highest tile reaches this value
    #[arg(long)]
    stop_tile: Option<u64>,

    /// RNG seed for tile spawns (omit for a random game)
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress the status line
    #[arg(long)]
    quiet: bool,
}
