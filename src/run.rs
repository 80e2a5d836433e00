// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Analysis runs and the end-to-end pipeline
//!
//! A run moves `created → running → completed | failed` exactly once.
//! The result lives inside the `Completed` state, so a run can never be
//! completed and carry an error at the same time.

use crate::actual::{co_commit_events, ActualCoordinationExtractor};
use crate::centrality::{select_strategy, CentralityReport};
use crate::config::EngineConfig;
use crate::error::{CongruenceError, Result};
use crate::graph::{CollaborationGraph, GraphSnapshot};
use crate::input::InputBundle;
use crate::requirement::{RequirementGraph, RequirementGraphBuilder};
use crate::roles::{McStcReport, RoleCoordinationAggregator};
use crate::scorer::{rank_contributors, Heatmap, StcScorer};
use crate::types::{ContributorCentrality, ContributorSummary, FunctionalRole, StcResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

// ============================================================================
// Run configuration
// ============================================================================

/// Per-run options, validated when the run is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Force the sampling strategy regardless of graph size
    pub use_monte_carlo: bool,
    /// Trees sampled per component; engine default when unset
    pub monte_carlo_iterations: Option<usize>,
    /// Roles kept distinct in the role matrix
    pub functional_roles_used: Vec<FunctionalRole>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            use_monte_carlo: false,
            monte_carlo_iterations: None,
            functional_roles_used: FunctionalRole::ALL.to_vec(),
        }
    }
}

impl RunConfig {
    /// Check bounds against the engine settings
    pub fn validate(&self, engine: &EngineConfig) -> Result<()> {
        engine
            .monte_carlo
            .validate_iterations(self.iterations(engine))?;
        if self.functional_roles_used.is_empty() {
            return Err(CongruenceError::Validation(
                "functional_roles_used must name at least one role".into(),
            ));
        }
        Ok(())
    }

    /// Effective iteration count
    #[must_use]
    pub fn iterations(&self, engine: &EngineConfig) -> usize {
        self.monte_carlo_iterations
            .unwrap_or(engine.monte_carlo.default_iterations)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Both coordination graphs for a bundle
#[derive(Debug, Clone)]
pub struct GraphPair {
    /// Required coordination, with shared-file evidence
    pub requirement: RequirementGraph,
    /// Observed coordination over the same contributors
    pub actual: CollaborationGraph,
}

/// Build the requirement and actual graphs for `bundle`
pub fn build_graphs(bundle: &InputBundle, engine: &EngineConfig) -> Result<GraphPair> {
    let matrix = bundle
        .contribution_matrix()?
        .ok_or_else(|| CongruenceError::MissingRequirementData {
            project: bundle.project.clone(),
            branch: bundle.branch.clone(),
        })?;

    let mut builder = RequirementGraphBuilder::new(engine.requirement_kernel);
    if let Some(deps) = &bundle.dependencies {
        builder = builder.with_dependencies(deps)?;
    }
    let requirement = builder.build(&matrix)?;

    let mut events = bundle.events.clone();
    if engine.derive_co_commits {
        events.extend(co_commit_events(&matrix));
    }
    let actual = ActualCoordinationExtractor::new()
        .ignore_unknown_contributors(engine.ignore_unknown_contributors)
        .extract(&requirement.graph, &events)?;

    Ok(GraphPair {
        requirement,
        actual,
    })
}

/// Centrality reports for both graphs from one strategy
pub fn compute_centrality(
    graphs: &GraphPair,
    config: &RunConfig,
    engine: &EngineConfig,
) -> Result<(CentralityReport, CentralityReport)> {
    let strategy = select_strategy(
        engine,
        graphs.requirement.graph.node_count(),
        config.use_monte_carlo,
        config.iterations(engine),
    );
    info!(mode = %strategy.mode(), "centrality strategy selected");
    let requirement = strategy.compute(&graphs.requirement.graph)?;
    let actual = strategy.compute(&graphs.actual)?;
    Ok((requirement, actual))
}

/// Everything a completed run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Aggregate congruence
    pub result: StcResult,
    /// Role-level breakdown
    pub mcstc: McStcReport,
    /// Contributors by requirement-graph centrality
    pub centrality: Vec<ContributorCentrality>,
    /// Per-contributor missed/required/actual counts
    pub contributor_summaries: Vec<ContributorSummary>,
    /// Pairwise grid
    pub heatmap: Heatmap,
    /// Weighted spanning-tree count of the requirement graph
    pub requirement_tree_count: Option<f64>,
    /// Weighted spanning-tree count of the actual graph
    pub actual_tree_count: Option<f64>,
    /// Requirement graph as analysed
    pub requirement_graph: GraphSnapshot,
    /// Actual graph as analysed
    pub actual_graph: GraphSnapshot,
}

/// Run the whole pipeline on `bundle`
pub fn analyze(bundle: &InputBundle, config: &RunConfig, engine: &EngineConfig) -> Result<AnalysisOutcome> {
    let graphs = build_graphs(bundle, engine)?;
    analyze_graphs(bundle, &graphs, config, engine)
}

/// Centrality, scoring and role aggregation over already validated graphs
pub fn analyze_graphs(
    bundle: &InputBundle,
    graphs: &GraphPair,
    config: &RunConfig,
    engine: &EngineConfig,
) -> Result<AnalysisOutcome> {
    let (req_centrality, act_centrality) = compute_centrality(graphs, config, engine)?;

    let card = StcScorer::from_config(&engine.scoring).score(
        &graphs.requirement.graph,
        &graphs.actual,
        &req_centrality,
        &act_centrality,
    )?;
    let mcstc = RoleCoordinationAggregator::new(config.functional_roles_used.iter().copied())?
        .aggregate(&card, &bundle.roles, &graphs.requirement);

    Ok(AnalysisOutcome {
        result: card.to_result(graphs.requirement.files_count, &bundle.branch),
        centrality: rank_contributors(&graphs.requirement.graph, &req_centrality),
        contributor_summaries: card.contributor_summaries(),
        heatmap: card.heatmap(),
        requirement_tree_count: req_centrality.spanning_tree_count,
        actual_tree_count: act_centrality.spanning_tree_count,
        requirement_graph: graphs.requirement.graph.snapshot(),
        actual_graph: graphs.actual.snapshot(),
        mcstc,
    })
}

// ============================================================================
// Run lifecycle
// ============================================================================

/// Lifecycle state; terminal states carry their payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// Configured, not yet started
    Created,
    /// Computation in flight
    Running,
    /// Finished with a result
    Completed(Box<AnalysisOutcome>),
    /// Finished with an error
    Failed {
        /// Stable code of the error that ended the run
        #[serde(default)]
        error_code: String,
        /// What went wrong
        error_message: String,
    },
}

impl RunStatus {
    /// State name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed(_) => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    /// Completed or failed
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed { .. })
    }
}

/// One analysis of one project branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    /// Unique identifier
    pub id: Uuid,
    /// Project reference
    pub project: String,
    /// Branch reference
    pub branch: String,
    /// Options fixed at creation
    pub config: RunConfig,
    /// SHA-256 of the bundle the run was created for
    pub input_fingerprint: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// When the run entered `running`
    pub started_at: Option<DateTime<Utc>>,
    /// When the run reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
    /// Lifecycle state
    pub status: RunStatus,
}

impl AnalysisRun {
    /// Create a run for `bundle`. The configuration and any requirement
    /// data the bundle carries are validated here.
    pub fn create(bundle: &InputBundle, config: RunConfig, engine: &EngineConfig) -> Result<Self> {
        config.validate(engine)?;
        if bundle.has_requirement_data() {
            build_graphs(bundle, engine)?;
        }
        let run = Self {
            id: Uuid::new_v4(),
            project: bundle.project.clone(),
            branch: bundle.branch.clone(),
            config,
            input_fingerprint: bundle.fingerprint()?,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            status: RunStatus::Created,
        };
        info!(run = %run.id, project = %run.project, branch = %run.branch, "analysis run created");
        Ok(run)
    }

    /// Validate `bundle`, build both graphs and move to `running`.
    /// Fails without changing state unless the run is `created` and the
    /// bundle yields valid graphs under `engine`.
    pub fn begin(&mut self, bundle: &InputBundle, engine: &EngineConfig) -> Result<GraphPair> {
        match &self.status {
            RunStatus::Created => {}
            RunStatus::Completed(_) => return Err(CongruenceError::AlreadyCompleted(self.id)),
            other => {
                return Err(CongruenceError::InvalidTransition {
                    id: self.id,
                    state: other.name(),
                })
            }
        }
        if !bundle.has_requirement_data() {
            return Err(CongruenceError::MissingRequirementData {
                project: self.project.clone(),
                branch: self.branch.clone(),
            });
        }
        if bundle.fingerprint()? != self.input_fingerprint {
            return Err(CongruenceError::Validation(format!(
                "input does not match the bundle run {} was created for",
                self.id
            )));
        }
        let graphs = build_graphs(bundle, engine)?;

        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        info!(run = %self.id, "analysis run started");
        Ok(graphs)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.status == RunStatus::Running {
            Ok(())
        } else {
            Err(CongruenceError::InvalidTransition {
                id: self.id,
                state: self.status.name(),
            })
        }
    }

    /// `running → completed`
    pub fn complete(&mut self, outcome: AnalysisOutcome) -> Result<()> {
        self.ensure_running()?;
        info!(run = %self.id, stc = outcome.result.stc_value, "analysis run completed");
        self.finished_at = Some(Utc::now());
        self.status = RunStatus::Completed(Box::new(outcome));
        Ok(())
    }

    /// `running → failed`, keeping the error's code and message
    pub fn fail(&mut self, error: &CongruenceError) -> Result<()> {
        self.ensure_running()?;
        warn!(run = %self.id, code = error.code(), error = %error, "analysis run failed");
        self.finished_at = Some(Utc::now());
        self.status = RunStatus::Failed {
            error_code: error.code().to_string(),
            error_message: error.to_string(),
        };
        Ok(())
    }

    /// Apply the terminal transition for a finished computation
    pub fn finish(&mut self, outcome: Result<AnalysisOutcome>) -> Result<()> {
        match outcome {
            Ok(outcome) => self.complete(outcome),
            Err(e) => self.fail(&e),
        }
    }

    /// Start, compute and finish in one call. A computation error is
    /// recorded on the run and returned unchanged.
    pub fn execute(&mut self, bundle: &InputBundle, engine: &EngineConfig) -> Result<&AnalysisOutcome> {
        let graphs = self.begin(bundle, engine)?;
        match analyze_graphs(bundle, &graphs, &self.config, engine) {
            Ok(outcome) => {
                self.complete(outcome)?;
                self.outcome().ok_or(CongruenceError::InvalidTransition {
                    id: self.id,
                    state: self.status.name(),
                })
            }
            Err(e) => {
                self.fail(&e)?;
                Err(e)
            }
        }
    }

    /// Outcome, once completed
    #[must_use]
    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        match &self.status {
            RunStatus::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// STC result, once completed
    #[must_use]
    pub fn result(&self) -> Option<&StcResult> {
        self.outcome().map(|o| &o.result)
    }

    /// Error message, once failed
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Failed { error_message, .. } => Some(error_message),
            _ => None,
        }
    }

    /// Error code, once failed
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Failed { error_code, .. } => Some(error_code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CentralityMode, Health};

    fn bundle() -> InputBundle {
        serde_json::from_str(
            r#"{
                "project": "demo",
                "branch": "main",
                "contributors": ["alice", "bob", "carol"],
                "files": ["api.rs", "auth.rs", "deploy.sh"],
                "matrix": [[1, 1, 0], [1, 0, 1], [0, 1, 1]],
                "events": [
                    {"a": "alice", "b": "bob", "kind": "review"},
                    {"a": "bob", "b": "carol", "kind": "comment"},
                    {"a": "carol", "b": "alice", "kind": "comment"}
                ],
                "roles": {"alice": "developer", "bob": "security", "carol": "ops"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_analyze_matching_team_is_congruent() {
        let outcome = analyze(&bundle(), &RunConfig::default(), &EngineConfig::default()).unwrap();

        assert_eq!(outcome.result.centrality_mode, CentralityMode::Exact);
        assert!((outcome.result.stc_value - 1.0).abs() < 1e-9);
        assert_eq!(outcome.result.health, Health::Excellent);
        assert_eq!(outcome.result.contributors_count, 3);
        assert_eq!(outcome.result.files_count, 3);
        assert_eq!(outcome.mcstc.coordination_pairs.len(), 3);
        assert!(outcome.mcstc.coordination_pairs.iter().all(|p| p.shared_files.len() == 1));
        assert_eq!(outcome.requirement_tree_count.map(f64::round), Some(3.0));
    }

    #[test]
    fn test_create_rejects_iterations_below_minimum() {
        let config = RunConfig {
            use_monte_carlo: true,
            monte_carlo_iterations: Some(50),
            ..RunConfig::default()
        };
        let err = AnalysisRun::create(&bundle(), config, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, CongruenceError::Validation(_)));
    }

    #[test]
    fn test_lifecycle_completes_once() {
        let engine = EngineConfig::default();
        let b = bundle();
        let mut run = AnalysisRun::create(&b, RunConfig::default(), &engine).unwrap();
        assert_eq!(run.status.name(), "created");

        let stc = run.execute(&b, &engine).unwrap().result.stc_value;
        assert_eq!(run.status.name(), "completed");
        assert!(run.started_at.is_some() && run.finished_at.is_some());

        let before = run.clone();
        let err = run.begin(&b, &engine).unwrap_err();
        assert!(matches!(err, CongruenceError::AlreadyCompleted(id) if id == run.id));
        assert_eq!(run, before);
        assert_eq!(run.result().unwrap().stc_value, stc);
    }

    #[test]
    fn test_missing_requirement_data_keeps_run_created() {
        let engine = EngineConfig::default();
        let empty: InputBundle = serde_json::from_str(r#"{"project": "demo"}"#).unwrap();
        let mut run = AnalysisRun::create(&empty, RunConfig::default(), &engine).unwrap();

        let err = run.begin(&empty, &engine).unwrap_err();
        assert!(matches!(err, CongruenceError::MissingRequirementData { .. }));
        assert_eq!(run.status, RunStatus::Created);
    }

    #[test]
    fn test_running_and_failed_runs_cannot_restart() {
        let engine = EngineConfig::default();
        let b = bundle();
        let mut run = AnalysisRun::create(&b, RunConfig::default(), &engine).unwrap();
        run.begin(&b, &engine).unwrap();
        assert!(matches!(
            run.begin(&b, &engine),
            Err(CongruenceError::InvalidTransition { state: "running", .. })
        ));

        run.finish(Err(CongruenceError::Computation("singular".into()))).unwrap();
        assert_eq!(run.error_message(), Some("computation failed: singular"));
        assert_eq!(run.error_code(), Some("COMPUTATION_ERROR"));
        assert!(run.result().is_none());
        assert!(matches!(
            run.begin(&b, &engine),
            Err(CongruenceError::InvalidTransition { state: "failed", .. })
        ));
    }

    #[test]
    fn test_invalid_matrix_rejected_at_creation() {
        let engine = EngineConfig::default();
        let mut b = bundle();
        b.matrix = Some(crate::input::MatrixData::Dense(vec![
            vec![1.0, 0.0, 0.0],
            vec![-2.0, 0.0, 0.0],
            vec![0.0, 1.0, 1.0],
        ]));

        let err = AnalysisRun::create(&b, RunConfig::default(), &engine).unwrap_err();
        assert_eq!(err.code(), "INVALID_DATA");
    }

    #[test]
    fn test_invalid_events_keep_run_created() {
        // Created while unknown contributors were skipped, started under the strict default
        let lenient = EngineConfig {
            ignore_unknown_contributors: true,
            ..EngineConfig::default()
        };
        let strict = EngineConfig::default();
        let mut b = bundle();
        b.events.push(crate::types::CoordinationEvent::new("alice", "mallory", 1.0));
        let mut run = AnalysisRun::create(&b, RunConfig::default(), &lenient).unwrap();

        let err = run.begin(&b, &strict).unwrap_err();
        assert!(matches!(err, CongruenceError::InvalidData(ref m) if m.contains("mallory")));
        assert_eq!(run.status, RunStatus::Created);
        assert!(run.started_at.is_none());

        assert!(run.execute(&b, &lenient).is_ok());
    }

    #[test]
    fn test_failed_run_keeps_error_code() {
        let engine = EngineConfig::default();
        let b = bundle();
        let mut run = AnalysisRun::create(&b, RunConfig::default(), &engine).unwrap();
        run.begin(&b, &engine).unwrap();
        run.fail(&CongruenceError::InvalidData("bad cell".into())).unwrap();

        assert_eq!(run.error_code(), Some("INVALID_DATA"));
        let json = serde_json::to_string(&run.status).unwrap();
        assert!(json.contains(r#""error_code":"INVALID_DATA""#));
    }

    #[test]
    fn test_status_round_trips_through_json() {
        let engine = EngineConfig::default();
        let b = bundle();
        let mut run = AnalysisRun::create(&b, RunConfig::default(), &engine).unwrap();
        run.execute(&b, &engine).unwrap();

        let json = serde_json::to_string(&run).unwrap();
        assert!(json.contains(r#""state":"completed""#));
        let back: AnalysisRun = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, run.id);
        assert_eq!(back.status.name(), "completed");
        let (a, b) = (back.result().unwrap(), run.result().unwrap());
        assert!((a.stc_value - b.stc_value).abs() < 1e-12);
        assert_eq!(a.contributors_count, b.contributors_count);
    }
}
