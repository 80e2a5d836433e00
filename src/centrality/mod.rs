// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Spanning-tree centrality
//!
//! Every strategy turns a [`CollaborationGraph`] into a
//! [`CentralityReport`]: the weighted spanning-tree count and, for each
//! edge, the fraction of weighted spanning trees that contain it. The
//! scorer only ever sees the report, so the strategies are
//! interchangeable.

pub mod exact;
pub mod monte_carlo;

pub use exact::ExactCentrality;
pub use monte_carlo::MonteCarloCentrality;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::graph::CollaborationGraph;
use crate::types::CentralityMode;
use std::collections::BTreeMap;

/// Edge → share of weighted spanning trees containing it, in [0, 1]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeParticipation {
    values: BTreeMap<(usize, usize), f64>,
}

impl EdgeParticipation {
    /// Record participation for `{u, v}`
    pub fn insert(&mut self, u: usize, v: usize, value: f64) {
        self.values.insert((u.min(v), u.max(v)), value.clamp(0.0, 1.0));
    }

    /// Participation for `{u, v}`, 0 for non-edges and isolated nodes
    #[must_use]
    pub fn get(&self, u: usize, v: usize) -> f64 {
        self.values.get(&(u.min(v), u.max(v))).copied().unwrap_or(0.0)
    }

    /// Iterate `((u, v), value)` with `u < v`
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.values.iter().map(|(&k, &v)| (k, v))
    }

    /// Number of edges with a recorded value
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no edge has a value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum over all edges
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }
}

/// Output of a centrality strategy
#[derive(Debug, Clone)]
pub struct CentralityReport {
    /// Strategy that produced this report
    pub mode: CentralityMode,
    /// Weighted spanning-tree count of the whole graph: 0 when disconnected.
    /// `None` when a component was too large to count exactly.
    pub spanning_tree_count: Option<f64>,
    /// Per-component counts (a lone node counts 1)
    pub component_tree_counts: Vec<Option<f64>>,
    /// Natural log of the spanning-forest weight (product over components)
    pub log_forest_count: Option<f64>,
    /// Connected components, including isolated nodes
    pub component_count: usize,
    /// Per-edge participation
    pub participation: EdgeParticipation,
    /// Σ participation over each node's incident edges
    pub node_scores: Vec<f64>,
    /// `node_scores` divided by (component size − 1); 0 for isolated nodes
    pub normalized_node_scores: Vec<f64>,
    /// Spanning trees sampled per component (Monte Carlo only)
    pub samples: Option<usize>,
}

impl CentralityReport {
    /// Assemble a report, deriving node scores from edge participation
    #[must_use]
    pub fn assemble(
        graph: &CollaborationGraph,
        mode: CentralityMode,
        components: &[Vec<usize>],
        component_log_counts: Vec<Option<f64>>,
        participation: EdgeParticipation,
        samples: Option<usize>,
    ) -> Self {
        let n = graph.node_count();
        let mut node_scores = vec![0.0; n];
        for ((u, v), p) in participation.iter() {
            node_scores[u] += p;
            node_scores[v] += p;
        }

        let mut normalized_node_scores = vec![0.0; n];
        for comp in components {
            if comp.len() < 2 {
                continue;
            }
            let denom = (comp.len() - 1) as f64;
            for &i in comp {
                normalized_node_scores[i] = node_scores[i] / denom;
            }
        }

        let log_forest_count = component_log_counts
            .iter()
            .copied()
            .sum::<Option<f64>>();
        let spanning_tree_count = match components.len() {
            0 => Some(0.0),
            1 => log_forest_count.map(f64::exp),
            _ => Some(0.0),
        };

        Self {
            mode,
            spanning_tree_count,
            component_tree_counts: component_log_counts
                .iter()
                .map(|c| c.map(f64::exp))
                .collect(),
            log_forest_count,
            component_count: components.len(),
            participation,
            node_scores,
            normalized_node_scores,
            samples,
        }
    }
}

/// A way of computing spanning-tree centrality
pub trait CentralityStrategy: Send + Sync {
    /// Which strategy this is
    fn mode(&self) -> CentralityMode;

    /// Compute the report for `graph`
    fn compute(&self, graph: &CollaborationGraph) -> Result<CentralityReport>;
}

/// Pick exact or Monte Carlo for a graph of `node_count` contributors.
/// Monte Carlo is used when requested or when the graph exceeds the exact
/// threshold; `iterations` must already be validated.
#[must_use]
pub fn select_strategy(
    engine: &EngineConfig,
    node_count: usize,
    use_monte_carlo: bool,
    iterations: usize,
) -> Box<dyn CentralityStrategy> {
    if use_monte_carlo || node_count > engine.exact_threshold {
        Box::new(MonteCarloCentrality::new(
            iterations,
            engine.monte_carlo.seed,
            engine.monte_carlo.threads,
            engine.exact_threshold,
        ))
    } else {
        Box::new(ExactCentrality::new())
    }
}
