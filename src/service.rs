// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! In-process run registry with background execution
//!
//! The `running` state is the only guard against concurrent work on a
//! run: the transition happens under the write lock, so a second start
//! observes `running` and is rejected rather than queued.

use crate::config::EngineConfig;
use crate::error::{CongruenceError, Result};
use crate::input::InputBundle;
use crate::run::{analyze_graphs, AnalysisRun, GraphPair, RunConfig};
use crate::store::RunStore;
use crate::types::StcResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug)]
struct Entry {
    run: AnalysisRun,
    bundle: Arc<InputBundle>,
}

/// Creates, starts and tracks analysis runs
#[derive(Debug, Clone)]
pub struct AnalysisService {
    engine: Arc<EngineConfig>,
    runs: Arc<RwLock<HashMap<Uuid, Entry>>>,
    store: Option<RunStore>,
}

impl AnalysisService {
    /// Service with no persistence
    #[must_use]
    pub fn new(engine: EngineConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            runs: Arc::new(RwLock::new(HashMap::new())),
            store: None,
        }
    }

    /// Persist every transition to `store`
    #[must_use]
    pub fn with_store(mut self, store: RunStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Engine settings in use
    #[must_use]
    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Register a new run for `bundle`; the configuration is validated here
    pub fn create(&self, bundle: InputBundle, config: RunConfig) -> Result<Uuid> {
        let run = AnalysisRun::create(&bundle, config, &self.engine)?;
        let id = run.id;
        self.persist(&run, Some(&bundle))?;
        self.runs.write().insert(
            id,
            Entry {
                run,
                bundle: Arc::new(bundle),
            },
        );
        Ok(id)
    }

    /// Track an existing run (e.g. one loaded from a [`RunStore`])
    pub fn register(&self, run: AnalysisRun, bundle: InputBundle) -> Result<()> {
        let mut runs = self.runs.write();
        if runs.contains_key(&run.id) {
            return Err(CongruenceError::Validation(format!(
                "run {} is already registered",
                run.id
            )));
        }
        runs.insert(
            run.id,
            Entry {
                run,
                bundle: Arc::new(bundle),
            },
        );
        Ok(())
    }

    /// Validate the inputs of `id`, move it to `running` and hand back
    /// what the computation needs. A rejected run stays `created`.
    fn begin(&self, id: Uuid) -> Result<(Arc<InputBundle>, GraphPair, RunConfig)> {
        let (snapshot, bundle, graphs) = {
            let mut runs = self.runs.write();
            let entry = runs
                .get_mut(&id)
                .ok_or_else(|| CongruenceError::RunNotFound(id.to_string()))?;
            let graphs = entry.run.begin(&entry.bundle, &self.engine)?;
            (entry.run.clone(), Arc::clone(&entry.bundle), graphs)
        };
        self.persist(&snapshot, None)?;
        let config = snapshot.config;
        Ok((bundle, graphs, config))
    }

    fn record(&self, id: Uuid, transition: impl FnOnce(&mut AnalysisRun) -> Result<()>) -> Result<AnalysisRun> {
        let snapshot = {
            let mut runs = self.runs.write();
            let entry = runs
                .get_mut(&id)
                .ok_or_else(|| CongruenceError::RunNotFound(id.to_string()))?;
            transition(&mut entry.run)?;
            entry.run.clone()
        };
        self.persist(&snapshot, None)?;
        Ok(snapshot)
    }

    /// Run `id` to completion on the calling thread. A computation error
    /// is recorded on the run and returned unchanged.
    pub fn start(&self, id: Uuid) -> Result<StcResult> {
        let (bundle, graphs, config) = self.begin(id)?;
        match analyze_graphs(&bundle, &graphs, &config, &self.engine) {
            Ok(outcome) => {
                let result = outcome.result.clone();
                self.record(id, |run| run.complete(outcome))?;
                Ok(result)
            }
            Err(e) => {
                self.record(id, |run| run.fail(&e))?;
                Err(e)
            }
        }
    }

    /// Validate and move `id` to `running` now, then compute on the
    /// blocking pool. Errors from validation or the transition are
    /// returned immediately; errors from the computation end up in the
    /// run's `failed` state.
    pub fn start_background(&self, id: Uuid) -> Result<JoinHandle<()>> {
        let (bundle, graphs, config) = self.begin(id)?;
        let service = self.clone();

        Ok(tokio::task::spawn_blocking(move || {
            let outcome = analyze_graphs(&bundle, &graphs, &config, &service.engine);
            match service.record(id, |run| run.finish(outcome)) {
                Ok(run) => info!(run = %id, state = run.status.name(), "background analysis finished"),
                Err(e) => error!(run = %id, error = %e, "could not record analysis outcome"),
            }
        }))
    }

    /// Current state of `id`
    pub fn status(&self, id: Uuid) -> Result<AnalysisRun> {
        self.runs
            .read()
            .get(&id)
            .map(|e| e.run.clone())
            .ok_or_else(|| CongruenceError::RunNotFound(id.to_string()))
    }

    /// All runs, oldest first
    #[must_use]
    pub fn runs(&self) -> Vec<AnalysisRun> {
        let mut runs: Vec<_> = self.runs.read().values().map(|e| e.run.clone()).collect();
        runs.sort_by_key(|r| r.created_at);
        runs
    }

    fn persist(&self, run: &AnalysisRun, bundle: Option<&InputBundle>) -> Result<()> {
        if let Some(store) = &self.store {
            if let Some(bundle) = bundle {
                store.save_input(bundle)?;
            }
            store.upsert(run)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bundle() -> InputBundle {
        serde_json::from_str(
            r#"{"project": "svc", "contributors": ["a", "b", "c"], "files": ["x", "y"],
                "matrix": [[1, 0], [1, 1], [0, 1]],
                "events": [{"a": "a", "b": "b"}],
                "roles": {"a": "developer", "b": "security", "c": "ops"}}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_background_run_completes() {
        let service = AnalysisService::new(EngineConfig::default());
        let id = service.create(bundle(), RunConfig::default()).unwrap();

        let handle = service.start_background(id).unwrap();
        assert!(matches!(
            service.start_background(id),
            Err(CongruenceError::InvalidTransition { .. } | CongruenceError::AlreadyCompleted(_))
        ));
        handle.await.unwrap();

        let run = service.status(id).unwrap();
        assert_eq!(run.status.name(), "completed");
        // b-c is required but never happens
        assert_eq!(run.result().unwrap().missed_coordination_count, 1);
    }

    #[test]
    fn test_second_start_after_completion() {
        let service = AnalysisService::new(EngineConfig::default());
        let id = service.create(bundle(), RunConfig::default()).unwrap();

        let first = service.start(id).unwrap();
        let err = service.start(id).unwrap_err();
        assert!(matches!(err, CongruenceError::AlreadyCompleted(_)));
        assert_eq!(service.status(id).unwrap().result(), Some(&first));
    }

    #[test]
    fn test_unknown_run() {
        let service = AnalysisService::new(EngineConfig::default());
        let err = service.status(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.code(), "RUN_NOT_FOUND");
    }

    #[test]
    fn test_invalid_events_rejected_before_running() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());
        let lenient = AnalysisService::new(EngineConfig {
            ignore_unknown_contributors: true,
            ..EngineConfig::default()
        });
        let mut b = bundle();
        b.events.push(crate::types::CoordinationEvent::new("a", "zed", 1.0));
        let run = AnalysisRun::create(&b, RunConfig::default(), lenient.engine()).unwrap();
        let id = run.id;

        let strict = AnalysisService::new(EngineConfig::default()).with_store(store.clone());
        strict.register(run, b).unwrap();
        let err = strict.start(id).unwrap_err();
        assert_eq!(err.code(), "INVALID_DATA");
        assert!(err.to_string().contains("zed"));
        assert_eq!(strict.status(id).unwrap().status.name(), "created");
        assert!(store.find(&id.to_string()).is_err());
        assert!(strict.start_background(id).is_err());
    }

    #[test]
    fn test_transitions_are_persisted() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());
        let service = AnalysisService::new(EngineConfig::default()).with_store(store.clone());

        let id = service.create(bundle(), RunConfig::default()).unwrap();
        assert_eq!(store.find(&id.to_string()).unwrap().status.name(), "created");
        service.start(id).unwrap();

        let stored = store.find(&id.to_string()).unwrap();
        assert_eq!(stored.status.name(), "completed");
        assert_eq!(store.load_input(&stored.input_fingerprint).unwrap(), bundle());
        assert_eq!(service.runs().len(), 1);
    }
}
