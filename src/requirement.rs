// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Requirement graph construction from the contributor×file matrix

use crate::error::{CongruenceError, Result};
use crate::graph::CollaborationGraph;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Contributor×file modification intensities
#[derive(Debug, Clone)]
pub struct ContributionMatrix {
    contributors: Vec<String>,
    files: Vec<String>,
    intensities: DMatrix<f64>,
}

impl ContributionMatrix {
    /// Validate and wrap a dense matrix; rows are contributors, columns files
    pub fn new(contributors: Vec<String>, files: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() || contributors.is_empty() {
            return Err(CongruenceError::InvalidData(
                "modification matrix has no contributors".into(),
            ));
        }
        if files.is_empty() || rows.iter().all(Vec::is_empty) {
            return Err(CongruenceError::InvalidData(
                "modification matrix has no files".into(),
            ));
        }
        let intensities = matrix_from_rows(rows)?;
        if intensities.nrows() != contributors.len() {
            return Err(CongruenceError::InvalidData(format!(
                "matrix has {} rows but {} contributors were named",
                intensities.nrows(),
                contributors.len()
            )));
        }
        if intensities.ncols() != files.len() {
            return Err(CongruenceError::InvalidData(format!(
                "matrix has {} columns but {} files were named",
                intensities.ncols(),
                files.len()
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if !v.is_finite() || v < 0.0 {
                    return Err(CongruenceError::InvalidData(format!(
                        "intensity for {} on {} is {v}; must be finite and non-negative",
                        contributors[i], files[j]
                    )));
                }
            }
        }
        let mut seen = HashSet::new();
        if let Some(dup) = contributors.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(CongruenceError::InvalidData(format!(
                "duplicate contributor id: {dup}"
            )));
        }
        Ok(Self {
            contributors,
            files,
            intensities,
        })
    }

    /// Contributor ids (row labels)
    #[must_use]
    pub fn contributors(&self) -> &[String] {
        &self.contributors
    }

    /// File paths (column labels)
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Intensity of contributor `c` on file `f`
    #[must_use]
    pub fn intensity(&self, c: usize, f: usize) -> f64 {
        self.intensities[(c, f)]
    }

    /// The underlying matrix
    #[must_use]
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.intensities
    }

    /// Σ intensity over every file for contributor `c`
    #[must_use]
    pub fn total_modifications(&self, c: usize) -> f64 {
        self.intensities.row(c).sum()
    }

    /// Number of files contributor `c` touched
    #[must_use]
    pub fn files_modified(&self, c: usize) -> usize {
        self.intensities.row(c).iter().filter(|&&v| v > 0.0).count()
    }

    /// Contributors with a positive intensity on file `f`
    #[must_use]
    pub fn modifiers_of(&self, f: usize) -> Vec<usize> {
        (0..self.contributors.len())
            .filter(|&c| self.intensities[(c, f)] > 0.0)
            .collect()
    }
}

/// How the weight between two contributors is derived from their files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKernel {
    /// Number of files both modified
    #[default]
    SharedFiles,
    /// Σ over shared files of min(intensity_u, intensity_v)
    MinIntensity,
    /// Σ over files of intensity_u · intensity_v (A·Aᵀ)
    DotProduct,
    /// Σ over file pairs of intensity_u · dependency · intensity_v (A·D·Aᵀ, symmetrised)
    FileDependency,
}

impl std::str::FromStr for RequirementKernel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "shared_files" | "shared-files" => Ok(Self::SharedFiles),
            "min_intensity" | "min-intensity" => Ok(Self::MinIntensity),
            "dot_product" | "dot-product" => Ok(Self::DotProduct),
            "file_dependency" | "file-dependency" => Ok(Self::FileDependency),
            other => Err(format!(
                "Unknown kernel: {other}. Valid: shared_files, min_intensity, dot_product, file_dependency"
            )),
        }
    }
}

/// Requirement graph plus the shared-file evidence behind each edge
#[derive(Debug, Clone)]
pub struct RequirementGraph {
    /// Weighted contributor graph
    pub graph: CollaborationGraph,
    /// Number of files in the source matrix
    pub files_count: usize,
    pub(crate) shared_files: BTreeMap<(usize, usize), Vec<String>>,
}

impl RequirementGraph {
    /// Files both contributors modified, in column order
    #[must_use]
    pub fn shared_files(&self, u: usize, v: usize) -> &[String] {
        self.shared_files
            .get(&(u.min(v), u.max(v)))
            .map_or(&[], Vec::as_slice)
    }
}

/// Builds the requirement graph from modification data
#[derive(Debug, Clone, Default)]
pub struct RequirementGraphBuilder {
    kernel: RequirementKernel,
    dependencies: Option<DMatrix<f64>>,
}

impl RequirementGraphBuilder {
    /// Builder with the given weight kernel
    #[must_use]
    pub fn new(kernel: RequirementKernel) -> Self {
        Self {
            kernel,
            dependencies: None,
        }
    }

    /// Attach a file×file dependency matrix (required by [`RequirementKernel::FileDependency`])
    pub fn with_dependencies(mut self, rows: &[Vec<f64>]) -> Result<Self> {
        let deps = matrix_from_rows(rows)?;
        if !deps.is_square() {
            return Err(CongruenceError::InvalidData(format!(
                "dependency matrix must be square, got {}x{}",
                deps.nrows(),
                deps.ncols()
            )));
        }
        if let Some(i) = rows
            .iter()
            .position(|row| row.iter().any(|v| !v.is_finite() || *v < 0.0))
        {
            return Err(CongruenceError::InvalidData(format!(
                "dependency matrix row {i} has a negative or non-finite entry"
            )));
        }
        self.dependencies = Some(deps);
        Ok(self)
    }

    /// Selected kernel
    #[must_use]
    pub fn kernel(&self) -> RequirementKernel {
        self.kernel
    }

    /// Build the requirement graph. Contributors with no shared files stay
    /// as isolated nodes.
    pub fn build(&self, matrix: &ContributionMatrix) -> Result<RequirementGraph> {
        let n = matrix.contributors().len();
        let f = matrix.files().len();
        let mut graph = CollaborationGraph::new(matrix.contributors().iter().cloned())?;

        let mut shared_files: BTreeMap<(usize, usize), Vec<String>> = BTreeMap::new();
        for file in 0..f {
            let modifiers = matrix.modifiers_of(file);
            for (k, &u) in modifiers.iter().enumerate() {
                for &v in &modifiers[k + 1..] {
                    shared_files
                        .entry((u, v))
                        .or_default()
                        .push(matrix.files()[file].clone());
                }
            }
        }

        match self.kernel {
            RequirementKernel::SharedFiles => {
                for (&(u, v), files) in &shared_files {
                    graph.add_weight(u, v, files.len() as f64)?;
                }
            }
            RequirementKernel::MinIntensity => {
                for &(u, v) in shared_files.keys() {
                    let w: f64 = (0..f)
                        .map(|file| matrix.intensity(u, file).min(matrix.intensity(v, file)))
                        .sum();
                    graph.add_weight(u, v, w)?;
                }
            }
            RequirementKernel::DotProduct => {
                let a = matrix.as_matrix();
                let cr = a * a.transpose();
                add_upper_triangle(&mut graph, &cr, n)?;
            }
            RequirementKernel::FileDependency => {
                let deps = self.dependencies.as_ref().ok_or_else(|| {
                    CongruenceError::InvalidData(
                        "file_dependency kernel needs a file dependency matrix".into(),
                    )
                })?;
                if deps.nrows() != f {
                    return Err(CongruenceError::InvalidData(format!(
                        "dependency matrix is {}x{} but there are {f} files",
                        deps.nrows(),
                        deps.ncols()
                    )));
                }
                let a = matrix.as_matrix();
                let cr = a * deps * a.transpose();
                let sym = (&cr + cr.transpose()) * 0.5;
                add_upper_triangle(&mut graph, &sym, n)?;
            }
        }

        debug!(
            kernel = ?self.kernel,
            shared_pairs = shared_files.len(),
            "requirement kernel applied"
        );
        info!(
            contributors = n,
            files = f,
            edges = graph.edge_count(),
            "requirement graph built"
        );

        Ok(RequirementGraph {
            graph,
            files_count: f,
            shared_files,
        })
    }
}

/// Dense matrix from nested rows; every row must have the same length
fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let cols = rows.first().map_or(0, Vec::len);
    if let Some(i) = rows.iter().position(|row| row.len() != cols) {
        return Err(CongruenceError::InvalidData(format!(
            "row {i} has {} columns, expected {cols}",
            rows[i].len()
        )));
    }
    Ok(DMatrix::from_fn(rows.len(), cols, |i, j| rows[i][j]))
}

fn add_upper_triangle(graph: &mut CollaborationGraph, m: &DMatrix<f64>, n: usize) -> Result<()> {
    for u in 0..n {
        for v in u + 1..n {
            let w = m[(u, v)];
            if w > 0.0 {
                graph.add_weight(u, v, w)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| (*s).to_string()).collect()
    }

    fn sample_matrix() -> ContributionMatrix {
        // alice and bob share x.rs; bob and carol share y.rs; dave works alone
        ContributionMatrix::new(
            names(&["alice", "bob", "carol", "dave"]),
            names(&["x.rs", "y.rs", "z.rs"]),
            &[
                vec![3.0, 0.0, 0.0],
                vec![1.0, 2.0, 0.0],
                vec![0.0, 5.0, 0.0],
                vec![0.0, 0.0, 7.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shared_files_kernel() {
        let req = RequirementGraphBuilder::new(RequirementKernel::SharedFiles)
            .build(&sample_matrix())
            .unwrap();

        assert_eq!(req.graph.edge_count(), 2);
        assert_eq!(req.graph.weight_between("alice", "bob"), 1.0);
        assert_eq!(req.graph.weight_between("bob", "carol"), 1.0);
        assert_eq!(req.shared_files(1, 0), ["x.rs".to_string()]);
        assert_eq!(req.files_count, 3);
    }

    #[test]
    fn test_isolated_contributor_kept() {
        let req = RequirementGraphBuilder::default()
            .build(&sample_matrix())
            .unwrap();

        assert_eq!(req.graph.node_count(), 4);
        assert_eq!(req.graph.index_of("dave"), Some(3));
        assert_eq!(req.graph.degree(3), 0.0);
    }

    #[test]
    fn test_min_intensity_kernel() {
        let req = RequirementGraphBuilder::new(RequirementKernel::MinIntensity)
            .build(&sample_matrix())
            .unwrap();

        assert_eq!(req.graph.weight_between("alice", "bob"), 1.0);
        assert_eq!(req.graph.weight_between("bob", "carol"), 2.0);
    }

    #[test]
    fn test_dot_product_kernel() {
        let req = RequirementGraphBuilder::new(RequirementKernel::DotProduct)
            .build(&sample_matrix())
            .unwrap();

        assert_eq!(req.graph.weight_between("alice", "bob"), 3.0);
        assert_eq!(req.graph.weight_between("bob", "carol"), 10.0);
        assert_eq!(req.graph.weight_between("alice", "carol"), 0.0);
    }

    #[test]
    fn test_file_dependency_kernel_links_dependent_files() {
        // z.rs depends on x.rs, so alice and dave must coordinate
        let deps = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![1.0, 0.0, 1.0],
        ];
        let req = RequirementGraphBuilder::new(RequirementKernel::FileDependency)
            .with_dependencies(&deps)
            .unwrap()
            .build(&sample_matrix())
            .unwrap();

        // A·D·Aᵀ[dave][alice] = 7 * 1 * 3 = 21, symmetrised to 10.5
        assert_eq!(req.graph.weight_between("alice", "dave"), 10.5);
        assert_eq!(
            req.graph.weight_between("alice", "dave"),
            req.graph.weight_between("dave", "alice")
        );
    }

    #[test]
    fn test_file_dependency_without_matrix_fails() {
        let err = RequirementGraphBuilder::new(RequirementKernel::FileDependency)
            .build(&sample_matrix())
            .unwrap_err();
        assert!(matches!(err, CongruenceError::InvalidData(_)));
    }

    #[test]
    fn test_invalid_matrices_rejected() {
        let empty = ContributionMatrix::new(vec![], vec![], &[]);
        assert!(matches!(empty, Err(CongruenceError::InvalidData(_))));

        let ragged = ContributionMatrix::new(
            names(&["a", "b"]),
            names(&["f", "g"]),
            &[vec![1.0, 0.0], vec![1.0]],
        );
        assert!(matches!(ragged, Err(CongruenceError::InvalidData(_))));

        let negative = ContributionMatrix::new(
            names(&["a", "b"]),
            names(&["f"]),
            &[vec![1.0], vec![-2.0]],
        );
        assert!(matches!(negative, Err(CongruenceError::InvalidData(_))));

        let mislabeled = ContributionMatrix::new(names(&["a"]), names(&["f"]), &[vec![1.0, 1.0]]);
        assert!(matches!(mislabeled, Err(CongruenceError::InvalidData(_))));
    }

    #[test]
    fn test_modification_totals() {
        let m = sample_matrix();
        assert_eq!(m.total_modifications(1), 3.0);
        assert_eq!(m.files_modified(1), 2);
        assert_eq!(m.files_modified(3), 1);
    }

    #[test]
    fn test_ragged_dependency_matrix_rejected() {
        let err = RequirementGraphBuilder::new(RequirementKernel::FileDependency)
            .with_dependencies(&[vec![1.0, 0.0], vec![1.0]])
            .unwrap_err();
        assert!(matches!(err, CongruenceError::InvalidData(_)));
    }
}
