use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use twenty48_solver::engine::{Grid, Position};
use twenty48_solver::expectimax::heuristic::Difficulty;
use twenty48_solver::solver::{Solver, SolverConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = SolverConfig {
        size: args.size,
        difficulty: args.difficulty,
        ..SolverConfig::default()
    };
    if let Some(path) = &args.weights {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading weights from {}", path.display()))?;
        config.weights = Some(serde_json::from_str(&text)?);
    }
    if let Some(depth) = args.depth {
        config.depth.fixed_depth = Some(depth);
    }
    let mut solver = Solver::new(config)?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut grid = Grid::empty(args.size)?;
    grid = spawn_tile(&mut rng, &grid);
    grid = spawn_tile(&mut rng, &grid);

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

    loop {
        if let Some(limit) = args.steps {
            if move_count >= limit {
                break;
            }
        }
        let Some(dir) = solver.best_move(&grid.to_cells())? else {
            break;
        };
        let out = grid.shift(dir);
        score += u64::from(out.score_delta);
        grid = spawn_tile(&mut rng, &out.board);
        move_count += 1;
        if args.show_boards {
            println!("{dir}:\n{grid}");
        }
        if let Some(pb) = &pb {
            let rate = (move_count as f64) / start.elapsed().as_secs_f64().max(1e-6);
            pb.set_message(format!(
                "{} | moves/sec: {:.1} | score: {} | depth: {}",
                move_count,
                rate,
                score,
                solver.stats().last_depth
            ));
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let stats = solver.stats();
    let lookups = (stats.cache_hits + stats.cache_misses).max(1);
    let highest = match grid.highest_exponent() {
        0 => 0,
        exp => 1u64 << exp,
    };
    if !args.quiet {
        println!("{grid}");
    }
    println!(
        "Moves: {} | score: {} | highest tile: {} | peak nodes/move: {} | cache hit rate: {:.1}%",
        move_count,
        score,
        highest,
        stats.peak_nodes,
        100.0 * (stats.cache_hits as f64) / (lookups as f64)
    );
    if let Some(path) = &args.stats_out {
        let text = serde_json::to_string_pretty(&stats)?;
        fs::write(path, text).with_context(|| format!("writing stats to {}", path.display()))?;
    }
    Ok(())
}

fn spawn_tile(rng: &mut StdRng, grid: &Grid) -> Grid {
    let empties = grid.empty_cells();
    if empties.is_empty() {
        return grid.clone();
    }
    let cell = empties[rng.gen_range(0..empties.len())];
    let exponent = if rng.gen_bool(0.9) { 1 } else { 2 };
    grid.with_spawn(cell, exponent)
}

#[derive(Debug, Parser)]
#[command(
    name = "twenty48-solver",
    about = "Self-playing 2048 demo driven by the expectimax solver"
)]
struct Args {
    /// Board side length (2..=16; 4 uses the bit-packed fast path)
    #[arg(long, default_value_t = 4)]
    size: usize,

    /// Difficulty tier: easy, normal, hard or expert
    #[arg(long, default_value = "normal")]
    difficulty: Difficulty,

    /// JSON file with a weight set, overriding the tier weights
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Fix the search depth instead of adapting it per position
    #[arg(long)]
    depth: Option<u32>,

    /// Stop after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// RNG seed for tile spawns (omit for a random game)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the final search stats as JSON to this file
    #[arg(long)]
    stats_out: Option<PathBuf>,

    /// Print the board after every move
    #[arg(long)]
    show_boards: bool,

    /// Suppress the status line
    #[arg(long)]
    quiet: bool,
}
