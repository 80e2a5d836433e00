// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - inspect and initialise configuration

use super::CliContext;
use crate::config::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Config subcommand actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the data directory and config file in use
    Path,
    /// Write a default configuration file
    Init,
}

/// Run the config command
pub fn run(ctx: &CliContext, action: ConfigAction, output: Option<PathBuf>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            if ctx.json {
                return ctx.print_json(&ctx.config);
            }
            let text = toml::to_string_pretty(&ctx.config).context("Failed to render configuration")?;
            print!("{text}");
        }
        ConfigAction::Path => {
            println!("data_dir: {}", ctx.config.data_dir.display());
            match &ctx.config_path {
                Some(path) => println!("config:   {}", path.display()),
                None => println!("config:   (defaults and environment only)"),
            }
        }
        ConfigAction::Init => {
            let path = output.unwrap_or_else(|| ctx.config.data_dir.join("config.toml"));
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
            let text = toml::to_string_pretty(&Config::default())
                .context("Failed to render default configuration")?;
            fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
