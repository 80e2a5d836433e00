// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod analyze;
pub mod centrality;
pub mod completions;
pub mod config;
pub mod contributors;
pub mod export;
pub mod heatmap;
pub mod pairs;
pub mod run;

use crate::config::Config;
use crate::input::InputBundle;
use crate::run::RunConfig;
use crate::store::RunStore;
use crate::types::{CoordinationStatus, FunctionalRole, Health};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Effective configuration
    pub config: Config,
    /// Path the configuration was loaded from, if any
    pub config_path: Option<PathBuf>,
    /// Print machine-readable JSON instead of text
    pub json: bool,
    /// Colour status words
    pub color: bool,
}

impl CliContext {
    /// Run store in the configured data directory
    #[must_use]
    pub fn store(&self) -> RunStore {
        RunStore::new(&self.config.data_dir)
    }

    /// Pretty JSON to stdout
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("Failed to serialize output")?
        );
        Ok(())
    }

    /// Health label, coloured by band
    #[must_use]
    pub fn health(&self, health: Health) -> String {
        let text = health.to_string();
        if !self.color {
            return text;
        }
        match health {
            Health::Excellent | Health::Good => text.green().to_string(),
            Health::Fair => text.yellow().to_string(),
            Health::Poor => text.red().to_string(),
        }
    }

    /// Status word, coloured
    #[must_use]
    pub fn status(&self, status: CoordinationStatus) -> String {
        let text = status.to_string();
        if !self.color {
            return text;
        }
        match status {
            CoordinationStatus::Congruent => text.green().to_string(),
            CoordinationStatus::Missed => text.red().to_string(),
            CoordinationStatus::Unnecessary => text.yellow().to_string(),
        }
    }

    /// Section heading
    #[must_use]
    pub fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Run options shared by the analysing commands
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Force Monte Carlo
    pub monte_carlo: bool,
    /// Iterations override
    pub iterations: Option<usize>,
    /// Roles to keep distinct; all when empty
    pub roles: Vec<FunctionalRole>,
}

impl From<RunOptions> for RunConfig {
    fn from(opts: RunOptions) -> Self {
        let defaults = RunConfig::default();
        Self {
            use_monte_carlo: opts.monte_carlo,
            monte_carlo_iterations: opts.iterations,
            functional_roles_used: if opts.roles.is_empty() {
                defaults.functional_roles_used
            } else {
                opts.roles
            },
        }
    }
}

/// Load an input bundle with a readable error
pub fn load_bundle(path: &Path) -> Result<InputBundle> {
    InputBundle::load(path).with_context(|| format!("Failed to load input bundle {}", path.display()))
}
