use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::ThreadPoolBuilder;
use std::hint::black_box;

use twenty48_solver::engine::{self, Board, Direction, Position};
use twenty48_solver::expectimax::heuristic::Weights;
use twenty48_solver::expectimax::{Expectimax, ExpectimaxParallel, SearchConfig};

fn warm() {
    engine::new();
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

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(1337);
    let mut boards = Vec::new();
    let b = spawn_tile(&mut rng, Board::EMPTY);
    let mut b = spawn_tile(&mut rng, b);
    boards.push(b);
    for i in 0..16 {
        let dir = Direction::ALL[i % Direction::ALL.len()];
        let out = b.shift(dir);
        if out.moved {
            b = spawn_tile(&mut rng, out.board);
        }
        boards.push(b);
    }
    boards
}

fn bench_sequential(c: &mut Criterion) {
    warm();
    let boards = corpus();
    let mut ex = Expectimax::new(SearchConfig::default(), Weights::default());

    c.bench_function("expectimax/best_move_depth3", |bch| {
        bch.iter(|| {
            let mut acc = 0u64;
            for bd in &boards {
                let m = ex.best_move(bd, 3);
                acc ^= m.map(|dir| dir as u64).unwrap_or(0);
            }
            black_box(acc)
        })
    });

    c.bench_function("expectimax/branch_evals_depth3", |bch| {
        bch.iter(|| {
            let mut acc = 0.0;
            for bd in &boards {
                for be in ex.branch_evals(bd, 3) {
                    if be.legal {
                        acc += be.ev;
                    }
                }
            }
            black_box(acc)
        })
    });
}

fn bench_parallel(c: &mut Criterion) {
    warm();
    // Pin a small pool for stability
    let pool = ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    let boards = corpus();
    let mut ex = ExpectimaxParallel::new(SearchConfig::default(), Weights::default());

    c.bench_function("expectimax_par/best_move_depth4", |bch| {
        bch.iter(|| {
            pool.install(|| {
                let mut acc = 0u64;
                for bd in &boards {
                    let m = ex.best_move(bd, 4);
                    acc ^= m.map(|dir| dir as u64).unwrap_or(0);
                }
                black_box(acc)
            })
        })
    });
}

fn bench_e2e(c: &mut Criterion) {
    warm();
    let mut ex = Expectimax::new(SearchConfig::default(), Weights::default());
    c.bench_function("e2e/64_moves_depth3", |bch| {
        bch.iter(|| {
            let mut rng = StdRng::seed_from_u64(13);
            let b = spawn_tile(&mut rng, Board::EMPTY);
            let mut b = spawn_tile(&mut rng, b);
            let mut steps = 0;
            while steps < 64 {
                let Some(dir) = ex.best_move(&b, 3) else {
                    break;
                };
                b = spawn_tile(&mut rng, b.shift(dir).board);
                steps += 1;
            }
            black_box((b.raw(), steps))
        })
    });
}

criterion_group!(search, bench_sequential, bench_parallel, bench_e2e);
criterion_main!(search);
