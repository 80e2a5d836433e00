// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Congruence library - socio-technical congruence for development teams
//!
//! This crate measures how well the coordination a team actually does
//! (reviews, comments, co-commits) matches the coordination its codebase
//! requires (shared and inter-dependent files). Both sides are modelled as
//! weighted contributor graphs; spanning-tree centrality (exact via the
//! Kirchhoff matrix, or Monte Carlo via random spanning trees) turns each
//! into edge participation scores that are compared pair by pair.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod actual;
pub mod centrality;
pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod input;
pub mod requirement;
pub mod roles;
pub mod run;
pub mod scorer;
pub mod service;
pub mod store;

/// Core data types shared by every analysis stage
pub mod types {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;

    // =========================================================================
    // Functional Roles
    // =========================================================================

    /// Functional team a contributor belongs to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum FunctionalRole {
        /// Feature and business-logic development
        #[serde(alias = "dev")]
        Developer,
        /// Security reviews and vulnerability fixes
        #[serde(alias = "sec")]
        Security,
        /// Infrastructure and deployment
        #[serde(alias = "operations")]
        Ops,
        /// Role not yet determined
        #[default]
        Unclassified,
    }

    impl FunctionalRole {
        /// Every role, in matrix order
        pub const ALL: [Self; 4] = [Self::Developer, Self::Security, Self::Ops, Self::Unclassified];

        /// Position in [`Self::ALL`]
        #[must_use]
        pub fn index(self) -> usize {
            match self {
                Self::Developer => 0,
                Self::Security => 1,
                Self::Ops => 2,
                Self::Unclassified => 3,
            }
        }

        /// Wire name
        #[must_use]
        pub fn code(self) -> &'static str {
            match self {
                Self::Developer => "developer",
                Self::Security => "security",
                Self::Ops => "ops",
                Self::Unclassified => "unclassified",
            }
        }
    }

    impl fmt::Display for FunctionalRole {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.code())
        }
    }

    impl FromStr for FunctionalRole {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_lowercase().as_str() {
                "developer" | "dev" => Ok(Self::Developer),
                "security" | "sec" => Ok(Self::Security),
                "ops" | "operations" => Ok(Self::Ops),
                "unclassified" => Ok(Self::Unclassified),
                other => Err(format!(
                    "Invalid functional role: {other}. Valid: developer, security, ops, unclassified"
                )),
            }
        }
    }

    // =========================================================================
    // Coordination Events
    // =========================================================================

    /// Channel a coordination event was observed on
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EventKind {
        /// Code review
        Review,
        /// Issue or PR comment
        Comment,
        /// Both modified the same file
        CoCommit,
        /// Anything else
        #[default]
        Other,
    }

    /// Observed coordination between two contributors
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CoordinationEvent {
        /// First contributor id
        pub a: String,
        /// Second contributor id
        pub b: String,
        /// Intensity of the interaction
        #[serde(default = "default_event_weight")]
        pub weight: f64,
        /// File the interaction concerned, if any
        #[serde(default)]
        pub file: Option<String>,
        /// Channel
        #[serde(default)]
        pub kind: EventKind,
    }

    fn default_event_weight() -> f64 {
        1.0
    }

    impl CoordinationEvent {
        /// Event of unit weight on an unspecified channel
        #[must_use]
        pub fn new(a: impl Into<String>, b: impl Into<String>, weight: f64) -> Self {
            Self {
                a: a.into(),
                b: b.into(),
                weight,
                file: None,
                kind: EventKind::Other,
            }
        }
    }

    // =========================================================================
    // Pairwise Classification
    // =========================================================================

    /// How a contributor pair's actual coordination compares to the requirement
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum CoordinationStatus {
        /// Actual matches requirement within tolerance
        Congruent,
        /// Required but not happening
        Missed,
        /// Happening without technical need
        Unnecessary,
    }

    impl fmt::Display for CoordinationStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Congruent => "congruent",
                Self::Missed => "missed",
                Self::Unnecessary => "unnecessary",
            })
        }
    }

    impl FromStr for CoordinationStatus {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_lowercase().as_str() {
                "congruent" | "adequate" => Ok(Self::Congruent),
                "missed" => Ok(Self::Missed),
                "unnecessary" => Ok(Self::Unnecessary),
                other => Err(format!(
                    "Invalid status: {other}. Valid: congruent, missed, unnecessary"
                )),
            }
        }
    }

    /// Heatmap cell tag
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum HeatmapCell {
        /// No requirement and no coordination
        #[default]
        None,
        /// See [`CoordinationStatus::Congruent`]
        Congruent,
        /// See [`CoordinationStatus::Missed`]
        Missed,
        /// See [`CoordinationStatus::Unnecessary`]
        Unnecessary,
    }

    impl From<CoordinationStatus> for HeatmapCell {
        fn from(status: CoordinationStatus) -> Self {
            match status {
                CoordinationStatus::Congruent => Self::Congruent,
                CoordinationStatus::Missed => Self::Missed,
                CoordinationStatus::Unnecessary => Self::Unnecessary,
            }
        }
    }

    /// Scored contributor pair, ready for ranking and display
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CoordinationPair {
        /// First contributor id
        pub contributor1: String,
        /// Role of the first contributor
        pub contributor1_role: FunctionalRole,
        /// Second contributor id
        pub contributor2: String,
        /// Role of the second contributor
        pub contributor2_role: FunctionalRole,
        /// Required coordination (normalized)
        pub requirement: f64,
        /// Actual coordination (normalized)
        pub actual: f64,
        /// `actual - requirement`
        pub gap: f64,
        /// `|gap| * max(requirement, actual)`
        pub impact_score: f64,
        /// Classification
        pub status: CoordinationStatus,
        /// Contributors hold different roles
        pub is_inter_class: bool,
        /// Files both contributors modified
        #[serde(default)]
        pub shared_files: Vec<String>,
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Which centrality strategy produced a result
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CentralityMode {
        /// Kirchhoff matrix and pseudo-inverse
        Exact,
        /// Sampled random spanning trees
        MonteCarlo,
    }

    impl fmt::Display for CentralityMode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Exact => "exact",
                Self::MonteCarlo => "monte_carlo",
            })
        }
    }

    /// Coarse label for a congruence value
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Health {
        /// ≥ 0.8
        Excellent,
        /// ≥ 0.6
        Good,
        /// ≥ 0.4
        Fair,
        /// below 0.4
        Poor,
    }

    impl Health {
        /// Classify a value in [0, 1]
        #[must_use]
        pub fn from_value(value: f64) -> Self {
            if value >= 0.8 {
                Self::Excellent
            } else if value >= 0.6 {
                Self::Good
            } else if value >= 0.4 {
                Self::Fair
            } else {
                Self::Poor
            }
        }
    }

    impl fmt::Display for Health {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Excellent => "excellent",
                Self::Good => "good",
                Self::Fair => "fair",
                Self::Poor => "poor",
            })
        }
    }

    /// Aggregate STC result; immutable once its run completes
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct StcResult {
        /// Congruence in [0, 1]
        pub stc_value: f64,
        /// Σ requirement over scored pairs
        pub coordination_requirements_total: f64,
        /// Σ actual over scored pairs
        pub coordination_actuals_total: f64,
        /// Pairs classified missed
        pub missed_coordination_count: usize,
        /// Pairs classified unnecessary
        pub unnecessary_coordination_count: usize,
        /// Pairs classified congruent
        pub congruent_coordination_count: usize,
        /// Σ min(req, act) / Σ req, in [0, 1]
        pub coordination_efficiency: f64,
        /// Contributors in the analysis
        pub contributors_count: usize,
        /// Files in the modification matrix
        pub files_count: usize,
        /// Branch the inputs were mined from
        pub branch_analyzed: String,
        /// Strategy used for both graphs
        pub centrality_mode: CentralityMode,
        /// Label for `stc_value`
        pub health: Health,
    }

    /// Contributor-level centrality, ranked
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ContributorCentrality {
        /// Contributor id
        pub contributor_id: String,
        /// Normalized spanning-tree centrality on the requirement graph
        pub stc_value: f64,
        /// 1 = most central
        pub rank: usize,
    }

    /// Per-contributor coordination summary
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ContributorSummary {
        /// Contributor id
        pub contributor_id: String,
        /// Pairs involving this contributor classified missed
        pub missed_coordination_count: usize,
        /// Peers this contributor is required to coordinate with
        pub required_coordination: usize,
        /// Peers this contributor actually coordinates with
        pub actual_coordination: usize,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{CongruenceError, Result};
    pub use crate::graph::CollaborationGraph;
    pub use crate::types::*;
}
