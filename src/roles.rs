// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Multi-class congruence across functional roles
//!
//! Takes the scored pairs and asks how well each role combination
//! coordinates: developer with security, developer with ops, and so on.

use crate::error::{CongruenceError, Result};
use crate::requirement::RequirementGraph;
use crate::scorer::{PairTotals, ScoredPair, Scorecard};
use crate::types::{CoordinationPair, CoordinationStatus, FunctionalRole, Health};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

const ROLES: usize = FunctionalRole::ALL.len();

/// Symmetric role × role alignment, Σ min(req, act) / Σ req per cell
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleCoordinationMatrix {
    cells: [[f64; ROLES]; ROLES],
}

impl RoleCoordinationMatrix {
    /// Alignment between two roles
    #[must_use]
    pub fn get(&self, a: FunctionalRole, b: FunctionalRole) -> f64 {
        self.cells[a.index()][b.index()]
    }

    /// Rows in [`FunctionalRole::ALL`] order
    #[must_use]
    pub fn rows(&self) -> &[[f64; ROLES]; ROLES] {
        &self.cells
    }
}

/// Per-role contributor counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDistribution {
    /// Contributors per role
    pub counts: BTreeMap<FunctionalRole, usize>,
    /// All contributors
    pub total: usize,
}

impl RoleDistribution {
    /// Contributors holding `role`
    #[must_use]
    pub fn count(&self, role: FunctionalRole) -> usize {
        self.counts.get(&role).copied().unwrap_or(0)
    }
}

/// Role-level summary of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McStcReport {
    /// Congruence over inter-class pairs only
    pub mcstc_value: f64,
    /// Alignment across pairs with different roles
    pub inter_class_score: f64,
    /// Alignment across pairs sharing a role
    pub intra_class_score: f64,
    /// Developer × security cell
    pub developer_security_score: f64,
    /// Developer × ops cell
    pub developer_ops_score: f64,
    /// Security × ops cell
    pub security_ops_score: f64,
    /// Full matrix
    pub role_coordination_matrix: RoleCoordinationMatrix,
    /// Contributors per role after folding
    pub role_distribution: RoleDistribution,
    /// All pairs, highest impact first
    pub coordination_pairs: Vec<CoordinationPair>,
    /// Suggested follow-ups
    pub recommendations: Vec<String>,
    /// Label for `mcstc_value`
    pub health: Health,
}

impl McStcReport {
    /// Pairs passing `filter`
    #[must_use]
    pub fn pairs(&self, filter: &PairFilter) -> Vec<CoordinationPair> {
        filter.apply(&self.coordination_pairs)
    }
}

/// Selects ranked coordination pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairFilter {
    /// Keep at most this many, after the other filters
    pub top_n: Option<usize>,
    /// Only this status
    pub status: Option<CoordinationStatus>,
    /// Only pairs where either side has this role
    pub role: Option<FunctionalRole>,
    /// Only pairs with different roles
    pub inter_class_only: bool,
}

impl PairFilter {
    /// Filter `pairs`, keeping their order
    #[must_use]
    pub fn apply(&self, pairs: &[CoordinationPair]) -> Vec<CoordinationPair> {
        pairs
            .iter()
            .filter(|p| self.status.map_or(true, |s| p.status == s))
            .filter(|p| {
                self.role
                    .map_or(true, |r| p.contributor1_role == r || p.contributor2_role == r)
            })
            .filter(|p| !self.inter_class_only || p.is_inter_class)
            .take(self.top_n.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Builds an [`McStcReport`] from a scorecard and role assignments
#[derive(Debug, Clone)]
pub struct RoleCoordinationAggregator {
    roles_used: BTreeSet<FunctionalRole>,
}

impl Default for RoleCoordinationAggregator {
    fn default() -> Self {
        Self {
            roles_used: FunctionalRole::ALL.into_iter().collect(),
        }
    }
}

impl RoleCoordinationAggregator {
    /// Roles outside `roles_used` are folded into `unclassified`
    pub fn new(roles_used: impl IntoIterator<Item = FunctionalRole>) -> Result<Self> {
        let roles_used: BTreeSet<_> = roles_used.into_iter().collect();
        if roles_used.is_empty() {
            return Err(CongruenceError::Validation(
                "functional_roles_used must name at least one role".into(),
            ));
        }
        Ok(Self { roles_used })
    }

    /// Effective role of a contributor
    #[must_use]
    pub fn fold(&self, role: FunctionalRole) -> FunctionalRole {
        if self.roles_used.contains(&role) {
            role
        } else {
            FunctionalRole::Unclassified
        }
    }

    /// Aggregate `card` by role; unknown contributors are unclassified
    #[must_use]
    pub fn aggregate(
        &self,
        card: &Scorecard,
        roles: &BTreeMap<String, FunctionalRole>,
        requirement: &RequirementGraph,
    ) -> McStcReport {
        let role_of: Vec<FunctionalRole> = card
            .contributors
            .iter()
            .map(|c| self.fold(roles.get(c).copied().unwrap_or_default()))
            .collect();

        let mut distribution = RoleDistribution {
            total: role_of.len(),
            ..RoleDistribution::default()
        };
        for &r in &role_of {
            *distribution.counts.entry(r).or_default() += 1;
        }

        let mut buckets: [[Vec<&ScoredPair>; ROLES]; ROLES] = Default::default();
        let mut inter = Vec::new();
        let mut intra = Vec::new();
        for p in &card.pairs {
            let (a, b) = (role_of[p.u].index(), role_of[p.v].index());
            buckets[a.min(b)][a.max(b)].push(p);
            if a == b {
                intra.push(p);
            } else {
                inter.push(p);
            }
        }

        let mut matrix = RoleCoordinationMatrix::default();
        for a in 0..ROLES {
            for b in a..ROLES {
                let ratio = alignment(&PairTotals::from_pairs(buckets[a][b].iter().copied()));
                matrix.cells[a][b] = ratio;
                matrix.cells[b][a] = ratio;
            }
        }

        let inter_totals = PairTotals::from_pairs(inter.iter().copied());
        let mcstc_value = inter_totals.congruence();

        let mut coordination_pairs: Vec<CoordinationPair> = card
            .pairs
            .iter()
            .map(|p| CoordinationPair {
                contributor1: card.contributors[p.u].clone(),
                contributor1_role: role_of[p.u],
                contributor2: card.contributors[p.v].clone(),
                contributor2_role: role_of[p.v],
                requirement: p.requirement,
                actual: p.actual,
                gap: p.gap,
                impact_score: p.gap.abs() * p.requirement.max(p.actual),
                status: p.status,
                is_inter_class: role_of[p.u] != role_of[p.v],
                shared_files: requirement.shared_files(p.u, p.v).to_vec(),
            })
            .collect();
        coordination_pairs.sort_by(|a, b| {
            b.impact_score
                .total_cmp(&a.impact_score)
                .then_with(|| a.contributor1.cmp(&b.contributor1))
                .then_with(|| a.contributor2.cmp(&b.contributor2))
        });

        use FunctionalRole::{Developer, Ops, Security};
        let mut report = McStcReport {
            mcstc_value,
            inter_class_score: alignment(&inter_totals),
            intra_class_score: alignment(&PairTotals::from_pairs(intra.iter().copied())),
            developer_security_score: matrix.get(Developer, Security),
            developer_ops_score: matrix.get(Developer, Ops),
            security_ops_score: matrix.get(Security, Ops),
            role_coordination_matrix: matrix,
            role_distribution: distribution,
            coordination_pairs,
            recommendations: Vec::new(),
            health: Health::from_value(mcstc_value),
        };
        report.recommendations = recommendations(&report, card.missed);

        debug!(inter = inter.len(), intra = intra.len(), "role buckets filled");
        info!(
            mcstc = report.mcstc_value,
            dev_sec = report.developer_security_score,
            "role coordination aggregated"
        );
        report
    }
}

/// Σ min / Σ req, 0 when nothing is required
fn alignment(totals: &PairTotals) -> f64 {
    if totals.requirements <= 0.0 {
        0.0
    } else {
        totals.efficiency()
    }
}

fn recommendations(report: &McStcReport, missed: usize) -> Vec<String> {
    use FunctionalRole::{Developer, Ops, Security};
    let dist = &report.role_distribution;
    let mut out = Vec::new();

    if report.mcstc_value < 0.5 {
        out.push("Overall MC-STC score is low. Consider improving cross-functional coordination.".to_string());
    }
    if dist.count(Developer) > 0 && dist.count(Security) > 0 && report.developer_security_score < 0.6 {
        out.push("Developer-Security coordination needs improvement. Consider regular security reviews.".to_string());
    }
    if dist.count(Developer) > 0 && dist.count(Ops) > 0 && report.developer_ops_score < 0.6 {
        out.push("Developer-Ops coordination could be enhanced. Implement DevOps practices.".to_string());
    }
    if dist.count(Security) == 0 {
        out.push("No security personnel identified. Consider adding security expertise to the team.".to_string());
    }
    if dist.count(Ops) == 0 {
        out.push("No ops personnel identified. Consider adding operations expertise.".to_string());
    }
    if missed > 5 {
        out.push(format!(
            "High number of missed coordination opportunities ({missed}). Review communication channels."
        ));
    }
    out
}
