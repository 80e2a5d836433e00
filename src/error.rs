// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error taxonomy for the congruence engine

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by graph construction, centrality, scoring and run orchestration
#[derive(Debug, Error)]
pub enum CongruenceError {
    /// Malformed or empty input matrices or event streams
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// No requirement graph inputs for the requested project/branch
    #[error("no requirement data for project '{project}' on branch '{branch}'")]
    MissingRequirementData {
        /// Project reference
        project: String,
        /// Branch reference
        branch: String,
    },

    /// A configuration value outside its allowed bounds
    #[error("validation failed: {0}")]
    Validation(String),

    /// Start attempted on a run that already completed
    #[error("analysis run {0} already completed; create a new run to re-analyse")]
    AlreadyCompleted(Uuid),

    /// Start attempted on a run that is running or failed
    #[error("analysis run {id} cannot start from state '{state}'")]
    InvalidTransition {
        /// Run id
        id: Uuid,
        /// Current state name
        state: &'static str,
    },

    /// Numerical failure mid-algorithm
    #[error("computation failed: {0}")]
    Computation(String),

    /// No run with this id
    #[error("analysis run not found: {0}")]
    RunNotFound(String),

    /// Filesystem failure while loading or saving
    #[error("i/o error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CongruenceError {
    /// Short machine-readable code, stable across versions
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidData(_) => "INVALID_DATA",
            Self::MissingRequirementData { .. } => "REQUIREMENT_DATA_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::AlreadyCompleted(_) => "ANALYSIS_ALREADY_COMPLETED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Computation(_) => "COMPUTATION_ERROR",
            Self::RunNotFound(_) => "RUN_NOT_FOUND",
            Self::Io { .. } => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the library
pub type Result<T, E = CongruenceError> = std::result::Result<T, E>;
