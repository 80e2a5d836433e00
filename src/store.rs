// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! On-disk run history
//!
//! Layout under the data directory:
//!
//! ```text
//! runs.json                    all runs, oldest first
//! inputs/<fingerprint>.json    bundles runs were created for
//! ```

use crate::error::{CongruenceError, Result};
use crate::input::InputBundle;
use crate::roles::RoleDistribution;
use crate::run::AnalysisRun;
use crate::types::Health;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Run history of one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    /// Project reference
    pub project: String,
    /// Runs in any state
    pub total_analyses: usize,
    /// Runs that completed
    pub completed_analyses: usize,
    /// Runs that failed
    pub failed_analyses: usize,
    /// Mean STC over completed runs; 0 when none completed
    pub average_stc_value: f64,
    /// Mean MC-STC over completed runs; 0 when none completed
    pub average_mcstc_value: f64,
    /// MC-STC of the most recently finished completed run
    pub latest_mcstc_value: Option<f64>,
    /// Contributors per role in that run
    pub latest_role_distribution: Option<RoleDistribution>,
    /// Label for `average_mcstc_value`
    pub health: Health,
}

impl ProjectStats {
    /// One entry per project, by project name
    #[must_use]
    pub fn from_runs(runs: &[AnalysisRun]) -> Vec<Self> {
        let mut by_project: BTreeMap<&str, Vec<&AnalysisRun>> = BTreeMap::new();
        for run in runs {
            by_project.entry(run.project.as_str()).or_default().push(run);
        }
        by_project
            .into_iter()
            .map(|(project, runs)| Self::summarize(project, &runs))
            .collect()
    }

    fn summarize(project: &str, runs: &[&AnalysisRun]) -> Self {
        let completed: Vec<&AnalysisRun> = runs.iter().copied().filter(|r| r.outcome().is_some()).collect();
        let mean = |f: fn(&AnalysisRun) -> f64| {
            if completed.is_empty() {
                0.0
            } else {
                completed.iter().map(|&r| f(r)).sum::<f64>() / completed.len() as f64
            }
        };
        let average_mcstc_value = mean(|r| r.outcome().map_or(0.0, |o| o.mcstc.mcstc_value));
        let latest = completed
            .iter()
            .max_by_key(|r| (r.finished_at, r.created_at))
            .and_then(|r| r.outcome());

        Self {
            project: project.to_string(),
            total_analyses: runs.len(),
            completed_analyses: completed.len(),
            failed_analyses: runs.iter().filter(|r| r.error_message().is_some()).count(),
            average_stc_value: mean(|r| r.result().map_or(0.0, |res| res.stc_value)),
            average_mcstc_value,
            latest_mcstc_value: latest.map(|o| o.mcstc.mcstc_value),
            latest_role_distribution: latest.map(|o| o.mcstc.role_distribution.clone()),
            health: Health::from_value(average_mcstc_value),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RunFile {
    #[serde(default)]
    runs: Vec<AnalysisRun>,
}

/// JSON-file store for runs and their input bundles. Clones share one
/// write lock, so concurrent upserts within a process do not lose runs.
#[derive(Debug, Clone)]
pub struct RunStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl RunStore {
    /// Store rooted at `dir`; nothing is created until the first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Root directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn runs_path(&self) -> PathBuf {
        self.dir.join("runs.json")
    }

    fn input_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join("inputs").join(format!("{fingerprint}.json"))
    }

    /// All runs; empty when nothing has been saved yet
    pub fn load(&self) -> Result<Vec<AnalysisRun>> {
        let path = self.runs_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| CongruenceError::io(&path, e))?;
        let file: RunFile = serde_json::from_str(&content)?;
        Ok(file.runs)
    }

    /// Replace the stored runs
    pub fn save(&self, runs: &[AnalysisRun]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CongruenceError::io(&self.dir, e))?;
        let path = self.runs_path();
        let json = serde_json::to_string_pretty(&RunFile { runs: runs.to_vec() })?;
        fs::write(&path, json).map_err(|e| CongruenceError::io(&path, e))?;
        debug!(path = %path.display(), runs = runs.len(), "runs saved");
        Ok(())
    }

    /// Insert `run`, or replace the stored run with the same id
    pub fn upsert(&self, run: &AnalysisRun) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut runs = self.load()?;
        match runs.iter_mut().find(|r| r.id == run.id) {
            Some(existing) => *existing = run.clone(),
            None => runs.push(run.clone()),
        }
        self.save(&runs)
    }

    /// Find a run by full id or unique id prefix
    pub fn find(&self, id: &str) -> Result<AnalysisRun> {
        let mut matches: Vec<AnalysisRun> = self
            .load()?
            .into_iter()
            .filter(|r| r.id.to_string().starts_with(id))
            .collect();
        match matches.len() {
            0 => Err(CongruenceError::RunNotFound(id.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(CongruenceError::Validation(format!(
                "run id prefix '{id}' is ambiguous ({n} matches)"
            ))),
        }
    }

    /// Keep a copy of `bundle` under its fingerprint
    pub fn save_input(&self, bundle: &InputBundle) -> Result<String> {
        let fingerprint = bundle.fingerprint()?;
        let path = self.input_path(&fingerprint);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CongruenceError::io(parent, e))?;
        }
        fs::write(&path, serde_json::to_string_pretty(bundle)?)
            .map_err(|e| CongruenceError::io(&path, e))?;
        Ok(fingerprint)
    }

    /// Bundle stored under `fingerprint`
    pub fn load_input(&self, fingerprint: &str) -> Result<InputBundle> {
        InputBundle::load(&self.input_path(fingerprint))
    }

    /// Per-project statistics over every stored run
    pub fn project_stats(&self) -> Result<Vec<ProjectStats>> {
        Ok(ProjectStats::from_runs(&self.load()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::run::RunConfig;
    use tempfile::TempDir;

    fn bundle() -> InputBundle {
        serde_json::from_str(
            r#"{"project": "p", "contributors": ["a", "b"], "files": ["f"], "matrix": [[1], [1]],
                "events": [{"a": "a", "b": "b"}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path().join("missing"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_and_find() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());
        let engine = EngineConfig::default();
        let b = bundle();

        let mut run = AnalysisRun::create(&b, RunConfig::default(), &engine).unwrap();
        store.upsert(&run).unwrap();
        run.execute(&b, &engine).unwrap();
        store.upsert(&run).unwrap();

        let runs = store.load().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status.name(), "completed");

        let found = store.find(&run.id.to_string()[..8]).unwrap();
        assert_eq!(found.id, run.id);
        assert!(matches!(store.find("zzzz"), Err(CongruenceError::RunNotFound(_))));
    }

    #[test]
    fn test_inputs_are_kept_by_fingerprint() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());
        let b = bundle();

        let fingerprint = store.save_input(&b).unwrap();
        assert_eq!(fingerprint, b.fingerprint().unwrap());
        assert_eq!(store.load_input(&fingerprint).unwrap(), b);
    }

    #[test]
    fn test_project_stats() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());
        let engine = EngineConfig::default();
        let b = bundle();

        let mut first = AnalysisRun::create(&b, RunConfig::default(), &engine).unwrap();
        first.execute(&b, &engine).unwrap();
        let mut failed = AnalysisRun::create(&b, RunConfig::default(), &engine).unwrap();
        failed.begin(&b, &engine).unwrap();
        failed.fail(&CongruenceError::Computation("singular".into())).unwrap();
        let pending = AnalysisRun::create(&b, RunConfig::default(), &engine).unwrap();
        let mut other = b.clone();
        other.project = "q".into();
        let mut elsewhere = AnalysisRun::create(&other, RunConfig::default(), &engine).unwrap();
        elsewhere.execute(&other, &engine).unwrap();
        for run in [&first, &failed, &pending, &elsewhere] {
            store.upsert(run).unwrap();
        }

        let stats = store.project_stats().unwrap();
        assert_eq!(stats.len(), 2);
        let p = &stats[0];
        assert_eq!(p.project, "p");
        assert_eq!(p.total_analyses, 3);
        assert_eq!(p.completed_analyses, 1);
        assert_eq!(p.failed_analyses, 1);
        let mcstc = first.outcome().unwrap().mcstc.mcstc_value;
        assert!((p.average_mcstc_value - mcstc).abs() < 1e-12);
        assert_eq!(p.latest_mcstc_value, Some(mcstc));
        assert_eq!(p.latest_role_distribution.as_ref().map(|d| d.total), Some(2));
        assert_eq!(p.health, Health::from_value(mcstc));
        assert_eq!(stats[1].project, "q");
    }

    #[test]
    fn test_project_without_completed_runs() {
        let engine = EngineConfig::default();
        let run = AnalysisRun::create(&bundle(), RunConfig::default(), &engine).unwrap();
        let stats = ProjectStats::from_runs(&[run]);

        assert_eq!(stats[0].completed_analyses, 0);
        assert_eq!(stats[0].average_mcstc_value, 0.0);
        assert_eq!(stats[0].latest_mcstc_value, None);
        assert!(stats[0].latest_role_distribution.is_none());
        assert_eq!(stats[0].health, Health::Poor);
    }
}
