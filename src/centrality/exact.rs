// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Exact spanning-tree centrality via Kirchhoff's Matrix-Tree theorem

use super::{CentralityReport, CentralityStrategy, EdgeParticipation};
use crate::error::{CongruenceError, Result};
use crate::graph::CollaborationGraph;
use crate::types::CentralityMode;
use nalgebra::DMatrix;
use tracing::{debug, instrument};

/// O(n³) per component: one cofactor for the count, one pseudo-inverse
/// for every edge's effective resistance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactCentrality;

impl ExactCentrality {
    /// New exact strategy
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Laplacian divided by its largest weighted degree, and that degree.
/// Factorising the rescaled matrix keeps pivots near 1 whatever the
/// magnitude of the edge weights.
fn rescaled(laplacian: &DMatrix<f64>) -> (DMatrix<f64>, f64) {
    let scale = laplacian.diagonal().max();
    if scale > 0.0 && scale.is_finite() {
        (laplacian.map(|x| x / scale), scale)
    } else {
        (laplacian.clone(), 1.0)
    }
}

fn not_positive_definite(k: usize) -> CongruenceError {
    CongruenceError::Computation(format!(
        "Laplacian cofactor of a connected component of {k} contributors is not positive definite"
    ))
}

/// Natural log of the weighted spanning-tree count of one connected
/// component, given that component's Laplacian. The (0, 0) cofactor is
/// symmetric positive definite, so its Cholesky factor yields the log
/// determinant directly.
pub fn component_log_tree_count(laplacian: &DMatrix<f64>) -> Result<f64> {
    let k = laplacian.nrows();
    if k < 2 {
        return Ok(0.0);
    }
    let (scaled, scale) = rescaled(laplacian);
    let cofactor = scaled.remove_row(0).remove_column(0);
    let cholesky = cofactor.cholesky().ok_or_else(|| not_positive_definite(k))?;
    let log_det: f64 = cholesky.l_dirty().diagonal().iter().map(|d| 2.0 * d.ln()).sum();
    if !log_det.is_finite() {
        return Err(not_positive_definite(k));
    }
    // det(c·M) over k − 1 rows = c^(k−1)·det(M)
    Ok(log_det + (k - 1) as f64 * scale.ln())
}

/// Moore-Penrose pseudo-inverse of a connected component's Laplacian:
/// (L + J/k)⁻¹ − J/k, where J is the all-ones matrix.
pub fn component_pseudo_inverse(laplacian: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let k = laplacian.nrows();
    let shift = 1.0 / k as f64;
    let (scaled, scale) = rescaled(laplacian);
    let inverse = scaled
        .add_scalar(shift)
        .cholesky()
        .ok_or_else(|| not_positive_definite(k))?
        .inverse();
    // (L/c)⁺ = c·L⁺
    Ok(inverse.add_scalar(-shift).map(|x| x / scale))
}

impl CentralityStrategy for ExactCentrality {
    fn mode(&self) -> CentralityMode {
        CentralityMode::Exact
    }

    #[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
    fn compute(&self, graph: &CollaborationGraph) -> Result<CentralityReport> {
        if graph.is_empty() {
            return Err(CongruenceError::InvalidData("graph has no contributors".into()));
        }
        let components = graph.components();
        let edges_by_component = graph.edges_by_component(&components);

        let mut local = vec![0usize; graph.node_count()];
        for comp in &components {
            for (pos, &node) in comp.iter().enumerate() {
                local[node] = pos;
            }
        }

        let mut log_counts = Vec::with_capacity(components.len());
        let mut participation = EdgeParticipation::default();

        for (comp, edges) in components.iter().zip(&edges_by_component) {
            if comp.len() < 2 {
                log_counts.push(Some(0.0));
                continue;
            }
            let laplacian = graph.component_laplacian(comp);
            log_counts.push(Some(component_log_tree_count(&laplacian)?));
            let pinv = component_pseudo_inverse(&laplacian)?;

            for &(u, v, w) in edges {
                let (a, b) = (local[u], local[v]);
                let resistance = pinv[(a, a)] + pinv[(b, b)] - 2.0 * pinv[(a, b)];
                if !resistance.is_finite() {
                    return Err(CongruenceError::Computation(format!(
                        "non-finite effective resistance between {} and {}",
                        graph.contributor(u),
                        graph.contributor(v)
                    )));
                }
                participation.insert(u, v, w * resistance);
            }
            debug!(size = comp.len(), edges = edges.len(), "component centrality computed");
        }

        Ok(CentralityReport::assemble(
            graph,
            CentralityMode::Exact,
            &components,
            log_counts,
            participation,
            None,
        ))
    }
}
