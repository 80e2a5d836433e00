// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, then
//! `CONGRUENCE_*` environment variables (`__` separates nested keys, e.g.
//! `CONGRUENCE_ENGINE__EXACT_THRESHOLD=50`).

use crate::error::{CongruenceError, Result};
use crate::requirement::RequirementKernel;
use crate::scorer::ScoreBasis;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for persistent data (run store)
    pub data_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Analysis engine settings
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

/// Settings for the analysis pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Requirement weight kernel
    pub requirement_kernel: RequirementKernel,
    /// Largest graph (node count) the exact strategy handles
    pub exact_threshold: usize,
    /// Skip events naming contributors outside the modification matrix
    pub ignore_unknown_contributors: bool,
    /// Derive co-commit events from the modification matrix as well
    pub derive_co_commits: bool,
    /// Sampling settings
    pub monte_carlo: MonteCarloConfig,
    /// Pair classification settings
    pub scoring: ScoringConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            requirement_kernel: RequirementKernel::SharedFiles,
            exact_threshold: 300,
            ignore_unknown_contributors: false,
            derive_co_commits: false,
            monte_carlo: MonteCarloConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

/// Monte Carlo bounds and sampling knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Fewest iterations accepted
    pub min_iterations: usize,
    /// Most iterations accepted
    pub max_iterations: usize,
    /// Iterations used when a run does not say
    pub default_iterations: usize,
    /// Fixed RNG seed; random per computation when unset
    pub seed: Option<u64>,
    /// Sampling threads; 0 uses the global rayon pool
    pub threads: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            min_iterations: 100,
            max_iterations: 10_000,
            default_iterations: 1_000,
            seed: None,
            threads: 0,
        }
    }
}

impl MonteCarloConfig {
    /// Reject iteration counts outside `[min_iterations, max_iterations]`
    pub fn validate_iterations(&self, iterations: usize) -> Result<()> {
        if iterations < self.min_iterations {
            return Err(CongruenceError::Validation(format!(
                "Monte Carlo iterations must be at least {} (got {iterations})",
                self.min_iterations
            )));
        }
        if iterations > self.max_iterations {
            return Err(CongruenceError::Validation(format!(
                "Monte Carlo iterations cannot exceed {} (got {iterations})",
                self.max_iterations
            )));
        }
        Ok(())
    }
}

/// Pair classification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// |gap| at or below this is congruent
    pub tolerance: f64,
    /// Scale the pairwise comparison runs on
    pub basis: ScoreBasis,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            basis: ScoreBasis::Participation,
        }
    }
}

impl EngineConfig {
    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        let mc = &self.monte_carlo;
        if mc.min_iterations == 0 || mc.min_iterations > mc.max_iterations {
            return Err(CongruenceError::Validation(format!(
                "invalid Monte Carlo bounds [{}, {}]",
                mc.min_iterations, mc.max_iterations
            )));
        }
        mc.validate_iterations(mc.default_iterations)?;
        if !(0.0..1.0).contains(&self.scoring.tolerance) {
            return Err(CongruenceError::Validation(format!(
                "tolerance must be in [0, 1), got {}",
                self.scoring.tolerance
            )));
        }
        Ok(())
    }
}

/// Default data directory: `CONGRUENCE_DATA_DIR`, else the XDG data dir
#[must_use]
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CONGRUENCE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    directories::ProjectDirs::from("org", "hyperpolymath", "congruence")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".congruence")
        })
}

/// Load configuration: defaults, then `path` (if any), then the environment
pub fn load(path: Option<&Path>) -> Result<Config> {
    let defaults = config::Config::try_from(&Config::default()).map_err(config_error)?;
    let mut builder = config::Config::builder().add_source(defaults);
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("CONGRUENCE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );
    let cfg: Config = builder
        .build()
        .and_then(|c| c.try_deserialize::<Config>())
        .map_err(config_error)?;
    cfg.engine.validate()?;
    Ok(cfg)
}

fn config_error(e: config::ConfigError) -> CongruenceError {
    CongruenceError::Validation(format!("configuration: {e}"))
}
