// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Analysis input bundles
//!
//! A bundle is one JSON document carrying everything a run needs: the
//! contributor×file matrix, optional file dependencies, observed
//! coordination events and role assignments.

use crate::error::{CongruenceError, Result};
use crate::requirement::ContributionMatrix;
use crate::types::{CoordinationEvent, FunctionalRole};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Modification matrix, dense rows or sparse `{row: {col: value}}`.
/// Sparse keys are indices or contributor ids / file paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatrixData {
    /// One row per contributor
    Dense(Vec<Vec<f64>>),
    /// Only non-zero cells
    Sparse(BTreeMap<String, BTreeMap<String, f64>>),
}

/// Everything one analysis consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBundle {
    /// Project reference
    #[serde(default)]
    pub project: String,
    /// Branch the data was mined from
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Row labels
    #[serde(default)]
    pub contributors: Vec<String>,
    /// Column labels
    #[serde(default)]
    pub files: Vec<String>,
    /// Modification intensities; absent means no requirement data
    #[serde(default)]
    pub matrix: Option<MatrixData>,
    /// File×file dependency weights
    #[serde(default)]
    pub dependencies: Option<Vec<Vec<f64>>>,
    /// Observed coordination
    #[serde(default)]
    pub events: Vec<CoordinationEvent>,
    /// Functional role per contributor id
    #[serde(default)]
    pub roles: BTreeMap<String, FunctionalRole>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl InputBundle {
    /// Read and parse a bundle file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CongruenceError::io(path, e))?;
        let bundle: Self = serde_json::from_str(&content)?;
        debug!(
            path = %path.display(),
            contributors = bundle.contributors.len(),
            files = bundle.files.len(),
            events = bundle.events.len(),
            "input bundle loaded"
        );
        Ok(bundle)
    }

    /// SHA-256 of the canonical JSON form, hex encoded
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// True when the bundle can yield a requirement graph
    #[must_use]
    pub fn has_requirement_data(&self) -> bool {
        self.matrix.is_some() && !self.contributors.is_empty() && !self.files.is_empty()
    }

    /// Dense rows of the modification matrix, if present
    pub fn dense_rows(&self) -> Result<Option<Vec<Vec<f64>>>> {
        match &self.matrix {
            None => Ok(None),
            Some(MatrixData::Dense(rows)) => Ok(Some(rows.clone())),
            Some(MatrixData::Sparse(cells)) => {
                let mut rows = vec![vec![0.0; self.files.len()]; self.contributors.len()];
                for (row_key, cols) in cells {
                    let r = resolve(row_key, &self.contributors, "contributor")?;
                    for (col_key, &value) in cols {
                        let c = resolve(col_key, &self.files, "file")?;
                        rows[r][c] = value;
                    }
                }
                Ok(Some(rows))
            }
        }
    }

    /// Validated contribution matrix, if the bundle has one
    pub fn contribution_matrix(&self) -> Result<Option<ContributionMatrix>> {
        if !self.has_requirement_data() {
            return Ok(None);
        }
        let Some(rows) = self.dense_rows()? else {
            return Ok(None);
        };
        ContributionMatrix::new(self.contributors.clone(), self.files.clone(), &rows).map(Some)
    }
}

fn resolve(key: &str, labels: &[String], what: &str) -> Result<usize> {
    if let Ok(i) = key.parse::<usize>() {
        if i < labels.len() {
            return Ok(i);
        }
    }
    labels.iter().position(|l| l == key).ok_or_else(|| {
        CongruenceError::InvalidData(format!("sparse matrix names unknown {what} '{key}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BUNDLE: &str = r#"{
        "project": "demo",
        "contributors": ["alice", "bob"],
        "files": ["a.rs", "b.rs"],
        "matrix": [[1.0, 0.0], [2.0, 1.0]],
        "events": [{"a": "alice", "b": "bob"}],
        "roles": {"alice": "developer", "bob": "sec"}
    }"#;

    #[test]
    fn test_dense_bundle() {
        let bundle: InputBundle = serde_json::from_str(BUNDLE).unwrap();
        assert_eq!(bundle.branch, "main");
        assert_eq!(bundle.events[0].weight, 1.0);
        assert_eq!(bundle.roles["bob"], FunctionalRole::Security);

        let matrix = bundle.contribution_matrix().unwrap().unwrap();
        assert_eq!(matrix.intensity(1, 0), 2.0);
    }

    #[test]
    fn test_sparse_bundle_by_index_and_name() {
        let bundle: InputBundle = serde_json::from_str(
            r#"{"contributors": ["alice", "bob"], "files": ["a.rs", "b.rs"],
                "matrix": {"0": {"0": 1.0}, "bob": {"b.rs": 3.0}}}"#,
        )
        .unwrap();
        let rows = bundle.dense_rows().unwrap().unwrap();
        assert_eq!(rows, vec![vec![1.0, 0.0], vec![0.0, 3.0]]);
    }

    #[test]
    fn test_sparse_unknown_label_rejected() {
        let bundle: InputBundle = serde_json::from_str(
            r#"{"contributors": ["alice"], "files": ["a.rs"], "matrix": {"carol": {"0": 1.0}}}"#,
        )
        .unwrap();
        assert!(matches!(bundle.dense_rows(), Err(CongruenceError::InvalidData(_))));
    }

    #[test]
    fn test_missing_matrix_is_not_an_error_here() {
        let bundle: InputBundle = serde_json::from_str(r#"{"project": "p"}"#).unwrap();
        assert!(!bundle.has_requirement_data());
        assert!(bundle.contribution_matrix().unwrap().is_none());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a: InputBundle = serde_json::from_str(BUNDLE).unwrap();
        let b: InputBundle = serde_json::from_str(BUNDLE).unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);

        let mut c = a.clone();
        c.branch = "dev".into();
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUNDLE.as_bytes()).unwrap();
        let bundle = InputBundle::load(file.path()).unwrap();
        assert_eq!(bundle.project, "demo");

        let missing = InputBundle::load(Path::new("/nonexistent/bundle.json")).unwrap_err();
        assert_eq!(missing.code(), "IO_ERROR");
    }
}
