// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Weighted undirected collaboration graphs over contributors

use crate::error::{CongruenceError, Result};
use nalgebra::DMatrix;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

/// Contributor graph with petgraph backing for algorithms.
///
/// Node `i` of the petgraph is always contributor `i` in insertion order;
/// nodes are never removed, so indices are stable and two graphs built from
/// the same contributor list are index-compatible.
#[derive(Debug, Clone)]
pub struct CollaborationGraph {
    /// The underlying undirected graph; node weight is the contributor id
    graph: UnGraph<String, f64>,
    /// Map from contributor id to node index
    node_indices: HashMap<String, NodeIndex>,
}

/// Serializable view of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Contributor ids in index order
    pub nodes: Vec<String>,
    /// Weighted edges with `source < target`
    pub edges: Vec<SnapshotEdge>,
}

/// One edge of a [`GraphSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    /// Lower contributor index
    pub source: usize,
    /// Higher contributor index
    pub target: usize,
    /// Coordination weight
    pub weight: f64,
}

impl CollaborationGraph {
    /// Create a graph with one isolated node per contributor
    pub fn new<I, S>(contributors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = UnGraph::default();
        let mut node_indices = HashMap::new();
        for id in contributors {
            let id = id.into();
            if node_indices.contains_key(&id) {
                return Err(CongruenceError::InvalidData(format!(
                    "duplicate contributor id: {id}"
                )));
            }
            let idx = graph.add_node(id.clone());
            node_indices.insert(id, idx);
        }
        Ok(Self {
            graph,
            node_indices,
        })
    }

    /// Empty graph over the same node set (same order) as `other`
    #[must_use]
    pub fn with_nodes_of(other: &Self) -> Self {
        let mut graph = UnGraph::with_capacity(other.node_count(), 0);
        for id in other.graph.node_weights() {
            graph.add_node(id.clone());
        }
        Self {
            graph,
            node_indices: other.node_indices.clone(),
        }
    }

    /// Rebuild a graph from its snapshot
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<Self> {
        let mut g = Self::new(snapshot.nodes.iter().cloned())?;
        for e in &snapshot.edges {
            g.add_weight(e.source, e.target, e.weight)?;
        }
        Ok(g)
    }

    /// Add `weight` to the edge `{u, v}`, creating it if needed.
    /// Zero weights and self-loops are ignored.
    pub fn add_weight(&mut self, u: usize, v: usize, weight: f64) -> Result<()> {
        let n = self.node_count();
        if u >= n || v >= n {
            return Err(CongruenceError::InvalidData(format!(
                "edge ({u}, {v}) out of range for {n} contributors"
            )));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(CongruenceError::InvalidData(format!(
                "edge ({u}, {v}) has invalid weight {weight}"
            )));
        }
        if u == v || weight == 0.0 {
            return Ok(());
        }
        let (a, b) = (NodeIndex::new(u), NodeIndex::new(v));
        match self.graph.find_edge(a, b) {
            Some(e) => self.graph[e] += weight,
            None => {
                self.graph.add_edge(a, b, weight);
            }
        }
        Ok(())
    }

    /// Weight of `{u, v}`, 0 when absent
    #[must_use]
    pub fn weight(&self, u: usize, v: usize) -> f64 {
        if u >= self.node_count() || v >= self.node_count() {
            return 0.0;
        }
        self.graph
            .find_edge(NodeIndex::new(u), NodeIndex::new(v))
            .map_or(0.0, |e| self.graph[e])
    }

    /// Weight between two contributors by id
    #[must_use]
    pub fn weight_between(&self, a: &str, b: &str) -> f64 {
        match (self.index_of(a), self.index_of(b)) {
            (Some(u), Some(v)) => self.weight(u, v),
            _ => 0.0,
        }
    }

    /// Index of a contributor id
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.node_indices.get(id).map(|idx| idx.index())
    }

    /// Contributor id at an index
    #[must_use]
    pub fn contributor(&self, idx: usize) -> &str {
        &self.graph[NodeIndex::new(idx)]
    }

    /// All contributor ids in index order
    #[must_use]
    pub fn contributors(&self) -> Vec<&str> {
        self.graph.node_weights().map(String::as_str).collect()
    }

    /// Get node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// True when there are no contributors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Same contributors in the same order
    #[must_use]
    pub fn same_nodes(&self, other: &Self) -> bool {
        self.graph.node_weights().eq(other.graph.node_weights())
    }

    /// Edges as `(u, v, weight)` with `u < v`, sorted
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, usize, f64)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| {
                let (a, b) = (e.source().index(), e.target().index());
                (a.min(b), a.max(b), *e.weight())
            })
            .collect();
        edges.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        edges
    }

    /// Neighbours of `u` with edge weights
    pub fn neighbors(&self, u: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.graph
            .edges(NodeIndex::new(u))
            .map(move |e| {
                let other = if e.source().index() == u {
                    e.target().index()
                } else {
                    e.source().index()
                };
                (other, *e.weight())
            })
    }

    /// Weighted degree of `u`
    #[must_use]
    pub fn degree(&self, u: usize) -> f64 {
        self.neighbors(u).map(|(_, w)| w).sum()
    }

    /// Largest edge weight, 0 for an edgeless graph
    #[must_use]
    pub fn max_weight(&self) -> f64 {
        self.graph.edge_weights().copied().fold(0.0, f64::max)
    }

    /// Kirchhoff matrix L = D − W over every contributor
    #[must_use]
    pub fn laplacian(&self) -> DMatrix<f64> {
        let all: Vec<usize> = (0..self.node_count()).collect();
        self.component_laplacian(&all)
    }

    /// Kirchhoff matrix of the subgraph induced by `nodes` (sorted), in
    /// local indices. Edges leaving `nodes` are ignored.
    #[must_use]
    pub fn component_laplacian(&self, nodes: &[usize]) -> DMatrix<f64> {
        let k = nodes.len();
        let mut l = DMatrix::zeros(k, k);
        for (a, &u) in nodes.iter().enumerate() {
            for (v, weight) in self.neighbors(u) {
                if let Ok(b) = nodes.binary_search(&v) {
                    if a < b {
                        l[(a, b)] -= weight;
                        l[(b, a)] -= weight;
                        l[(a, a)] += weight;
                        l[(b, b)] += weight;
                    }
                }
            }
        }
        l
    }

    /// Connected components as sorted index lists, ordered by smallest member
    #[must_use]
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.node_count();
        let mut uf = UnionFind::<usize>::new(n);
        for (u, v, _) in self.edges() {
            uf.union(u, v);
        }
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..n {
            groups.entry(uf.find(i)).or_default().push(i);
        }
        let mut comps: Vec<Vec<usize>> = groups.into_values().collect();
        comps.sort_by_key(|c| c[0]);
        comps
    }

    /// Edges grouped by the component (index into `components`) holding them
    #[must_use]
    pub fn edges_by_component(&self, components: &[Vec<usize>]) -> Vec<Vec<(usize, usize, f64)>> {
        let mut component_of = vec![0usize; self.node_count()];
        for (ci, comp) in components.iter().enumerate() {
            for &node in comp {
                component_of[node] = ci;
            }
        }
        let mut grouped = vec![Vec::new(); components.len()];
        for (u, v, w) in self.edges() {
            grouped[component_of[u]].push((u, v, w));
        }
        grouped
    }

    /// Serializable snapshot
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.contributors().into_iter().map(String::from).collect(),
            edges: self
                .edges()
                .into_iter()
                .map(|(source, target, weight)| SnapshotEdge {
                    source,
                    target,
                    weight,
                })
                .collect(),
        }
    }

    /// Export to DOT format for Graphviz
    #[must_use]
    pub fn to_dot(&self, name: &str) -> String {
        let mut dot = format!("graph {name} {{\n");
        dot.push_str("  layout=neato;\n");
        dot.push_str("  node [shape=ellipse];\n\n");

        for id in self.graph.node_weights() {
            let _ = writeln!(dot, "  \"{id}\";");
        }

        dot.push('\n');

        for (u, v, weight) in self.edges() {
            let _ = writeln!(
                dot,
                "  \"{}\" -- \"{}\" [label=\"{}\", weight={}];",
                self.contributor(u),
                self.contributor(v),
                format_weight(weight),
                format_weight(weight)
            );
        }

        dot.push_str("}\n");
        dot
    }
}

fn format_weight(w: f64) -> String {
    if w.fract() == 0.0 && w.abs() < 1e15 {
        format!("{w:.0}")
    } else {
        format!("{w:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_plus_isolated() -> CollaborationGraph {
        let mut g = CollaborationGraph::new(["alice", "bob", "carol", "dave"]).unwrap();
        g.add_weight(0, 1, 2.0).unwrap();
        g.add_weight(1, 2, 1.0).unwrap();
        g.add_weight(2, 0, 1.0).unwrap();
        g
    }

    #[test]
    fn test_add_weight_accumulates_symmetrically() {
        let mut g = triangle_plus_isolated();
        g.add_weight(1, 0, 0.5).unwrap();

        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.weight(0, 1), 2.5);
        assert_eq!(g.weight(1, 0), 2.5);
        assert_eq!(g.weight_between("alice", "bob"), 2.5);
        assert_eq!(g.weight_between("alice", "dave"), 0.0);
    }

    #[test]
    fn test_duplicate_contributor_rejected() {
        let err = CollaborationGraph::new(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, CongruenceError::InvalidData(_)));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut g = CollaborationGraph::new(["a", "b"]).unwrap();
        assert!(g.add_weight(0, 1, -1.0).is_err());
        assert!(g.add_weight(0, 1, f64::NAN).is_err());
        assert!(g.add_weight(0, 5, 1.0).is_err());
    }

    #[test]
    fn test_laplacian_rows_sum_to_zero() {
        let g = triangle_plus_isolated();
        let l = g.laplacian();

        assert_eq!(l[(0, 0)], 3.0);
        assert_eq!(l[(0, 1)], -2.0);
        for i in 0..4 {
            assert!(l.row(i).sum().abs() < 1e-12);
        }
        assert_eq!(l, l.transpose());
    }

    #[test]
    fn test_component_laplacian_uses_local_indices() {
        let g = triangle_plus_isolated();
        let l = g.component_laplacian(&[1, 2]);

        // Only the bob-carol edge survives
        assert_eq!(l.nrows(), 2);
        assert_eq!(l[(0, 0)], 1.0);
        assert_eq!(l[(0, 1)], -1.0);
        assert_eq!(g.component_laplacian(&[3])[(0, 0)], 0.0);
    }

    #[test]
    fn test_edges_grouped_by_component() {
        let g = triangle_plus_isolated();
        let grouped = g.edges_by_component(&g.components());

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].len(), 3);
        assert!(grouped[1].is_empty());
    }

    #[test]
    fn test_isolated_contributor_is_its_own_component() {
        let g = triangle_plus_isolated();
        assert_eq!(g.components(), vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_with_nodes_of_preserves_order() {
        let g = triangle_plus_isolated();
        let empty = CollaborationGraph::with_nodes_of(&g);

        assert!(empty.same_nodes(&g));
        assert_eq!(empty.edge_count(), 0);
        assert_eq!(empty.index_of("dave"), Some(3));
    }

    #[test]
    fn test_snapshot_rebuilds_same_graph() {
        let g = triangle_plus_isolated();
        let back = CollaborationGraph::from_snapshot(&g.snapshot()).unwrap();
        assert_eq!(back.edges(), g.edges());
        assert!(back.same_nodes(&g));
    }

    #[test]
    fn test_to_dot() {
        let g = triangle_plus_isolated();
        insta::assert_snapshot!(g.to_dot("requirement"), @r###"
        graph requirement {
          layout=neato;
          node [shape=ellipse];

          "alice";
          "bob";
          "carol";
          "dave";

          "alice" -- "bob" [label="2", weight=2];
          "alice" -- "carol" [label="1", weight=1];
          "bob" -- "carol" [label="1", weight=1];
        }
        "###);
    }
}
