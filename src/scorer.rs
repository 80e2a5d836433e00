// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Pairwise comparison of requirement and actual coordination

use crate::centrality::CentralityReport;
use crate::config::ScoringConfig;
use crate::error::{CongruenceError, Result};
use crate::graph::CollaborationGraph;
use crate::requirement::ContributionMatrix;
use crate::types::{
    CentralityMode, ContributorCentrality, ContributorSummary, CoordinationStatus, FunctionalRole,
    Health, HeatmapCell, StcResult,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

/// Scale the comparison runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBasis {
    /// Spanning-tree edge participation of each graph
    #[default]
    Participation,
    /// Raw weights divided by each graph's largest weight
    Weight,
}

/// One contributor pair with both sides on the same [0, 1] scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    /// Lower contributor index
    pub u: usize,
    /// Higher contributor index
    pub v: usize,
    /// Required coordination
    pub requirement: f64,
    /// Actual coordination
    pub actual: f64,
    /// `actual - requirement`
    pub gap: f64,
    /// Classification
    pub status: CoordinationStatus,
}

/// Aggregate figures over a set of scored pairs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PairTotals {
    /// Σ requirement
    pub requirements: f64,
    /// Σ actual
    pub actuals: f64,
    /// Σ |gap|
    pub absolute_gap: f64,
    /// Σ min(requirement, actual)
    pub overlap: f64,
    /// Pairs counted
    pub pairs: usize,
}

impl PairTotals {
    /// Sum over `pairs`
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a ScoredPair>) -> Self {
        pairs.into_iter().fold(Self::default(), |mut t, p| {
            t.requirements += p.requirement;
            t.actuals += p.actual;
            t.absolute_gap += p.gap.abs();
            t.overlap += p.requirement.min(p.actual);
            t.pairs += 1;
            t
        })
    }

    /// 1 − Σ|gap| / (Σreq + Σact), clamped to [0, 1]; 1 when both totals are 0
    #[must_use]
    pub fn congruence(&self) -> f64 {
        let denom = self.requirements + self.actuals;
        if denom <= 0.0 {
            return 1.0;
        }
        (1.0 - self.absolute_gap / denom).clamp(0.0, 1.0)
    }

    /// Σ min(req, act) / Σ req, clamped to [0, 1]; 1 when nothing is required
    #[must_use]
    pub fn efficiency(&self) -> f64 {
        if self.requirements <= 0.0 {
            return 1.0;
        }
        (self.overlap / self.requirements).clamp(0.0, 1.0)
    }
}

/// Everything the scorer derives from the two graphs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scorecard {
    /// Pairs present in either graph, ordered by `(u, v)`
    pub pairs: Vec<ScoredPair>,
    /// Totals over `pairs`
    pub totals: PairTotals,
    /// Pairs per status
    pub missed: usize,
    /// See `missed`
    pub unnecessary: usize,
    /// See `missed`
    pub congruent: usize,
    /// Contributor ids, index order
    pub contributors: Vec<String>,
    /// Strategy that produced the centrality reports
    pub mode: CentralityMode,
}

impl Scorecard {
    /// Final STC result for a run
    #[must_use]
    pub fn to_result(&self, files_count: usize, branch: &str) -> StcResult {
        let stc_value = self.totals.congruence();
        StcResult {
            stc_value,
            coordination_requirements_total: self.totals.requirements,
            coordination_actuals_total: self.totals.actuals,
            missed_coordination_count: self.missed,
            unnecessary_coordination_count: self.unnecessary,
            congruent_coordination_count: self.congruent,
            coordination_efficiency: self.totals.efficiency(),
            contributors_count: self.contributors.len(),
            files_count,
            branch_analyzed: branch.to_string(),
            centrality_mode: self.mode,
            health: Health::from_value(stc_value),
        }
    }

    /// n×n grid of pair tags for heatmap rendering
    #[must_use]
    pub fn heatmap(&self) -> Heatmap {
        let n = self.contributors.len();
        let mut cells = vec![vec![HeatmapCell::None; n]; n];
        for p in &self.pairs {
            cells[p.u][p.v] = p.status.into();
            cells[p.v][p.u] = p.status.into();
        }
        Heatmap {
            contributors: self.contributors.clone(),
            cells,
        }
    }

    /// Per-contributor missed/required/actual counts, most missed first
    #[must_use]
    pub fn contributor_summaries(&self) -> Vec<ContributorSummary> {
        let n = self.contributors.len();
        let mut missed = vec![0usize; n];
        let mut required = vec![0usize; n];
        let mut actual = vec![0usize; n];
        for p in &self.pairs {
            for i in [p.u, p.v] {
                if p.status == CoordinationStatus::Missed {
                    missed[i] += 1;
                }
                if p.requirement > 0.0 {
                    required[i] += 1;
                }
                if p.actual > 0.0 {
                    actual[i] += 1;
                }
            }
        }
        let mut out: Vec<_> = (0..n)
            .map(|i| ContributorSummary {
                contributor_id: self.contributors[i].clone(),
                missed_coordination_count: missed[i],
                required_coordination: required[i],
                actual_coordination: actual[i],
            })
            .collect();
        out.sort_by(|a, b| {
            b.missed_coordination_count
                .cmp(&a.missed_coordination_count)
                .then_with(|| a.contributor_id.cmp(&b.contributor_id))
        });
        out
    }
}

/// Pairwise grid suitable for heatmap rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    /// Row/column labels
    pub contributors: Vec<String>,
    /// `cells[i][j]` tags the pair (i, j); the diagonal is `none`
    pub cells: Vec<Vec<HeatmapCell>>,
}

/// Compares requirement and actual coordination edge by edge
#[derive(Debug, Clone, Copy)]
pub struct StcScorer {
    tolerance: f64,
    basis: ScoreBasis,
}

impl Default for StcScorer {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl StcScorer {
    /// Scorer with explicit tolerance and basis
    #[must_use]
    pub fn new(tolerance: f64, basis: ScoreBasis) -> Self {
        Self { tolerance, basis }
    }

    /// Scorer from configuration
    #[must_use]
    pub fn from_config(cfg: &ScoringConfig) -> Self {
        Self::new(cfg.tolerance, cfg.basis)
    }

    /// Classify a gap against the tolerance
    #[must_use]
    pub fn classify(&self, gap: f64) -> CoordinationStatus {
        if gap < -self.tolerance {
            CoordinationStatus::Missed
        } else if gap > self.tolerance {
            CoordinationStatus::Unnecessary
        } else {
            CoordinationStatus::Congruent
        }
    }

    /// Score every pair that has an edge in either graph
    pub fn score(
        &self,
        requirement: &CollaborationGraph,
        actual: &CollaborationGraph,
        requirement_centrality: &CentralityReport,
        actual_centrality: &CentralityReport,
    ) -> Result<Scorecard> {
        if !requirement.same_nodes(actual) {
            return Err(CongruenceError::InvalidData(
                "requirement and actual graphs must share the same contributors".into(),
            ));
        }

        let keys: BTreeSet<(usize, usize)> = requirement
            .edges()
            .into_iter()
            .chain(actual.edges())
            .map(|(u, v, _)| (u, v))
            .collect();

        let req_max = requirement.max_weight();
        let act_max = actual.max_weight();
        let value = |graph: &CollaborationGraph, report: &CentralityReport, max: f64, u, v| match self.basis {
            ScoreBasis::Participation => report.participation.get(u, v),
            ScoreBasis::Weight if max > 0.0 => graph.weight(u, v) / max,
            ScoreBasis::Weight => 0.0,
        };

        let pairs: Vec<ScoredPair> = keys
            .into_iter()
            .map(|(u, v)| {
                let req = value(requirement, requirement_centrality, req_max, u, v);
                let act = value(actual, actual_centrality, act_max, u, v);
                let gap = act - req;
                ScoredPair {
                    u,
                    v,
                    requirement: req,
                    actual: act,
                    gap,
                    status: self.classify(gap),
                }
            })
            .collect();

        let count = |s| pairs.iter().filter(|p| p.status == s).count();
        let card = Scorecard {
            totals: PairTotals::from_pairs(&pairs),
            missed: count(CoordinationStatus::Missed),
            unnecessary: count(CoordinationStatus::Unnecessary),
            congruent: count(CoordinationStatus::Congruent),
            contributors: requirement.contributors().into_iter().map(String::from).collect(),
            mode: requirement_centrality.mode,
            pairs,
        };

        info!(
            pairs = card.pairs.len(),
            missed = card.missed,
            unnecessary = card.unnecessary,
            stc = card.totals.congruence(),
            "coordination scored"
        );
        Ok(card)
    }
}

/// Contributors ranked by normalized centrality on the requirement graph
#[must_use]
pub fn rank_contributors(graph: &CollaborationGraph, report: &CentralityReport) -> Vec<ContributorCentrality> {
    let mut order: Vec<usize> = (0..graph.node_count()).collect();
    order.sort_by(|&a, &b| {
        report.normalized_node_scores[b]
            .total_cmp(&report.normalized_node_scores[a])
            .then_with(|| graph.contributor(a).cmp(graph.contributor(b)))
    });
    order
        .into_iter()
        .enumerate()
        .map(|(pos, i)| ContributorCentrality {
            contributor_id: graph.contributor(i).to_string(),
            stc_value: report.normalized_node_scores[i],
            rank: pos + 1,
        })
        .collect()
}

/// One contributor's centrality next to their coordination and activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorComparison {
    /// Contributor id
    pub contributor_id: String,
    /// Functional role, unclassified when unassigned
    pub role: FunctionalRole,
    /// Normalized requirement-graph centrality
    pub stc_value: f64,
    /// 1 = most central
    pub rank: usize,
    /// Pairs involving this contributor classified missed
    pub missed_coordination_count: usize,
    /// Peers this contributor is required to coordinate with
    pub required_coordination: usize,
    /// Peers this contributor actually coordinates with
    pub actual_coordination: usize,
    /// Sum of the contributor's modification intensities
    pub total_modifications: f64,
    /// Files with a non-zero intensity
    pub files_modified: usize,
}

/// Selects rows of the contributor comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributorFilter {
    /// Only contributors holding this role
    pub role: Option<FunctionalRole>,
    /// Keep at most this many, after the role filter
    pub top_n: Option<usize>,
}

/// Join ranked centrality with coordination summaries and modification
/// activity, in rank order. Contributors absent from `matrix` report zero
/// activity.
#[must_use]
pub fn contributor_comparison(
    centrality: &[ContributorCentrality],
    summaries: &[ContributorSummary],
    matrix: &ContributionMatrix,
    roles: &BTreeMap<String, FunctionalRole>,
    filter: &ContributorFilter,
) -> Vec<ContributorComparison> {
    let by_id: HashMap<&str, &ContributorSummary> =
        summaries.iter().map(|s| (s.contributor_id.as_str(), s)).collect();
    let rows: HashMap<&str, usize> = matrix
        .contributors()
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let mut ranked: Vec<&ContributorCentrality> = centrality.iter().collect();
    ranked.sort_by_key(|c| c.rank);
    ranked
        .into_iter()
        .map(|c| {
            let id = c.contributor_id.as_str();
            let summary = by_id.get(id);
            let row = rows.get(id).copied();
            ContributorComparison {
                contributor_id: c.contributor_id.clone(),
                role: roles.get(id).copied().unwrap_or_default(),
                stc_value: c.stc_value,
                rank: c.rank,
                missed_coordination_count: summary.map_or(0, |s| s.missed_coordination_count),
                required_coordination: summary.map_or(0, |s| s.required_coordination),
                actual_coordination: summary.map_or(0, |s| s.actual_coordination),
                total_modifications: row.map_or(0.0, |r| matrix.total_modifications(r)),
                files_modified: row.map_or(0, |r| matrix.files_modified(r)),
            }
        })
        .filter(|row| filter.role.map_or(true, |r| row.role == r))
        .take(filter.top_n.unwrap_or(usize::MAX))
        .collect()
}
