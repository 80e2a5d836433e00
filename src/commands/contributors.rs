// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Contributors command - centrality next to coordination and activity

use super::{load_bundle, CliContext, RunOptions};
use crate::run::{analyze, RunConfig};
use crate::scorer::{contributor_comparison, ContributorFilter};
use anyhow::{Context, Result};
use std::path::Path;

/// Print the contributor comparison matching `filter`
pub fn run(ctx: &CliContext, input: &Path, opts: RunOptions, filter: &ContributorFilter) -> Result<()> {
    let bundle = load_bundle(input)?;
    let engine = &ctx.config.engine;
    let config = RunConfig::from(opts);
    config.validate(engine)?;

    let outcome = analyze(&bundle, &config, engine)?;
    let matrix = bundle
        .contribution_matrix()?
        .context("Input bundle has no modification matrix")?;
    let rows = contributor_comparison(
        &outcome.centrality,
        &outcome.contributor_summaries,
        &matrix,
        &bundle.roles,
        filter,
    );

    if ctx.json {
        return ctx.print_json(&rows);
    }
    if rows.is_empty() {
        println!("No contributors match.");
        return Ok(());
    }

    println!(
        "{:>4}  {:<24} {:<13} {:>7} {:>6} {:>5} {:>5} {:>9} {:>5}",
        "RANK", "CONTRIBUTOR", "ROLE", "STC", "MISSED", "REQ", "ACT", "MODS", "FILES"
    );
    for c in &rows {
        println!(
            "{:>4}  {:<24} {:<13} {:>7.4} {:>6} {:>5} {:>5} {:>9.1} {:>5}",
            c.rank,
            c.contributor_id,
            c.role.to_string(),
            c.stc_value,
            c.missed_coordination_count,
            c.required_coordination,
            c.actual_coordination,
            c.total_modifications,
            c.files_modified
        );
    }
    Ok(())
}
