// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Centrality strategy benchmarks

use congruence::centrality::{CentralityStrategy, ExactCentrality, MonteCarloCentrality};
use congruence::graph::CollaborationGraph;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Ring plus deterministic chords, weights in [1, 4)
fn team_graph(n: usize) -> CollaborationGraph {
    let mut g = CollaborationGraph::new((0..n).map(|i| format!("dev{i}"))).unwrap();
    let mut rng = fastrand::Rng::with_seed(n as u64);
    for u in 0..n {
        g.add_weight(u, (u + 1) % n, 1.0 + rng.f64() * 3.0).unwrap();
        for _ in 0..2 {
            let v = rng.usize(..n);
            if v != u {
                g.add_weight(u, v, 1.0 + rng.f64() * 3.0).unwrap();
            }
        }
    }
    g
}

fn bench_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_centrality");
    for n in [10, 50, 150] {
        let g = team_graph(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &g, |b, g| {
            b.iter(|| ExactCentrality::new().compute(black_box(g)).unwrap());
        });
    }
    group.finish();
}

fn bench_monte_carlo(c: &mut Criterion) {
    let mut group = c.benchmark_group("monte_carlo_centrality");
    group.sample_size(20);
    for n in [50, 150] {
        let g = team_graph(n);
        let strategy = MonteCarloCentrality::new(1_000, Some(1), 0, 0);
        group.bench_with_input(BenchmarkId::from_parameter(n), &g, |b, g| {
            b.iter(|| strategy.compute(black_box(g)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_exact, bench_monte_carlo);
criterion_main!(benches);
