// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Monte Carlo spanning-tree centrality
//!
//! Samples weighted-uniform random spanning trees with Wilson's algorithm
//! (loop-erased random walks) and reports how often each edge appears.
//! Samples are independent: they run on a rayon pool, each with its own
//! seeded RNG, and per-edge counts are merged by summation after the join.

use super::exact::component_log_tree_count;
use super::{CentralityReport, CentralityStrategy, EdgeParticipation};
use crate::error::{CongruenceError, Result};
use crate::graph::CollaborationGraph;
use crate::types::CentralityMode;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

/// Sampling strategy; `iterations` trees per connected component
#[derive(Debug, Clone)]
pub struct MonteCarloCentrality {
    iterations: usize,
    seed: Option<u64>,
    threads: usize,
    exact_count_limit: usize,
}

impl MonteCarloCentrality {
    /// `seed = None` draws a fresh seed per computation; `threads = 0`
    /// uses rayon's global pool. Components no larger than
    /// `exact_count_limit` also get an exact spanning-tree count.
    #[must_use]
    pub fn new(iterations: usize, seed: Option<u64>, threads: usize, exact_count_limit: usize) -> Self {
        Self {
            iterations,
            seed,
            threads,
            exact_count_limit,
        }
    }

    /// Trees sampled per component
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn sample_component(&self, component: &ComponentWalk, seed: u64) -> Vec<u64> {
        let m = component.edge_count;
        (0..self.iterations)
            .into_par_iter()
            .fold(
                || vec![0u64; m],
                |mut counts, sample| {
                    let mut rng = fastrand::Rng::with_seed(splitmix64(seed ^ sample as u64));
                    for edge in component.wilson_tree(&mut rng) {
                        counts[edge] += 1;
                    }
                    counts
                },
            )
            .reduce(
                || vec![0u64; m],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                    a
                },
            )
    }

    fn compute_inner(&self, graph: &CollaborationGraph, seed: u64) -> Result<CentralityReport> {
        let components = graph.components();
        let edges_by_component = graph.edges_by_component(&components);
        let mut participation = EdgeParticipation::default();
        let mut log_counts = Vec::with_capacity(components.len());

        for (ci, (comp, edges)) in components.iter().zip(&edges_by_component).enumerate() {
            if comp.len() < 2 {
                log_counts.push(Some(0.0));
                continue;
            }
            // Dense Laplacians only for components small enough to count
            if comp.len() <= self.exact_count_limit {
                let laplacian = graph.component_laplacian(comp);
                log_counts.push(Some(component_log_tree_count(&laplacian)?));
            } else {
                log_counts.push(None);
            }

            let walk = ComponentWalk::new(comp, edges);
            let counts = self.sample_component(&walk, splitmix64(seed.wrapping_add(ci as u64)));
            for (edge, &(u, v)) in walk.edges.iter().enumerate() {
                participation.insert(u, v, counts[edge] as f64 / self.iterations as f64);
            }
            debug!(size = comp.len(), edges = walk.edge_count, "component sampled");
        }

        Ok(CentralityReport::assemble(
            graph,
            CentralityMode::MonteCarlo,
            &components,
            log_counts,
            participation,
            Some(self.iterations),
        ))
    }
}

impl CentralityStrategy for MonteCarloCentrality {
    fn mode(&self) -> CentralityMode {
        CentralityMode::MonteCarlo
    }

    #[instrument(skip_all, fields(nodes = graph.node_count(), iterations = self.iterations))]
    fn compute(&self, graph: &CollaborationGraph) -> Result<CentralityReport> {
        if graph.is_empty() {
            return Err(CongruenceError::InvalidData("graph has no contributors".into()));
        }
        if self.iterations == 0 {
            return Err(CongruenceError::Validation(
                "Monte Carlo needs at least one iteration".into(),
            ));
        }
        let seed = self.seed.unwrap_or_else(|| fastrand::u64(..));
        info!(seed, "sampling random spanning trees");

        if self.threads == 0 {
            return self.compute_inner(graph, seed);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| CongruenceError::Computation(format!("failed to build sampling pool: {e}")))?;
        pool.install(|| self.compute_inner(graph, seed))
    }
}

/// Adjacency of one connected component in local indices, with cumulative
/// weights for O(log d) weighted neighbour selection.
struct ComponentWalk {
    /// Global `(u, v)` per local edge id
    edges: Vec<(usize, usize)>,
    edge_count: usize,
    /// Per local node: (neighbour local index, edge id)
    adjacency: Vec<Vec<(usize, usize)>>,
    /// Per local node: running sum of incident weights
    cumulative: Vec<Vec<f64>>,
}

impl ComponentWalk {
    /// `component` sorted, `edges` exactly the edges inside it
    fn new(component: &[usize], component_edges: &[(usize, usize, f64)]) -> Self {
        let k = component.len();
        let mut edges = Vec::with_capacity(component_edges.len());
        let mut adjacency = vec![Vec::new(); k];
        let mut cumulative = vec![Vec::new(); k];

        for &(u, v, w) in component_edges {
            let (Ok(a), Ok(b)) = (component.binary_search(&u), component.binary_search(&v)) else {
                continue;
            };
            let id = edges.len();
            edges.push((u, v));
            for (from, to) in [(a, b), (b, a)] {
                let running = cumulative[from].last().copied().unwrap_or(0.0) + w;
                adjacency[from].push((to, id));
                cumulative[from].push(running);
            }
        }

        Self {
            edge_count: edges.len(),
            edges,
            adjacency,
            cumulative,
        }
    }

    fn step(&self, node: usize, rng: &mut fastrand::Rng) -> (usize, usize) {
        let sums = &self.cumulative[node];
        let total = sums[sums.len() - 1];
        let target = rng.f64() * total;
        let pick = sums.partition_point(|&s| s <= target).min(sums.len() - 1);
        self.adjacency[node][pick]
    }

    /// Wilson's algorithm rooted at local node 0; returns tree edge ids
    fn wilson_tree(&self, rng: &mut fastrand::Rng) -> Vec<usize> {
        let k = self.adjacency.len();
        let mut in_tree = vec![false; k];
        let mut next = vec![(usize::MAX, usize::MAX); k];
        in_tree[0] = true;

        for start in 1..k {
            let mut u = start;
            while !in_tree[u] {
                next[u] = self.step(u, rng);
                u = next[u].0;
            }
            u = start;
            while !in_tree[u] {
                in_tree[u] = true;
                u = next[u].0;
            }
        }

        (1..k).map(|u| next[u].1).collect()
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
