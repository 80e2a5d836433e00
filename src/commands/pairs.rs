// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Pairs command - ranked contributor pairs by coordination impact

use super::{load_bundle, CliContext, RunOptions};
use crate::roles::PairFilter;
use crate::run::{analyze, RunConfig};
use anyhow::Result;
use std::path::Path;

/// Print coordination pairs matching `filter`
pub fn run(ctx: &CliContext, input: &Path, opts: RunOptions, filter: &PairFilter) -> Result<()> {
    let bundle = load_bundle(input)?;
    let engine = &ctx.config.engine;
    let config = RunConfig::from(opts);
    config.validate(engine)?;

    let outcome = analyze(&bundle, &config, engine)?;
    let pairs = outcome.mcstc.pairs(filter);

    if ctx.json {
        return ctx.print_json(&pairs);
    }
    if pairs.is_empty() {
        println!("No coordination pairs match.");
        return Ok(());
    }

    println!(
        "{:<28} {:<28} {:>7} {:>7} {:>7} {:>7}  STATUS",
        "CONTRIBUTOR 1", "CONTRIBUTOR 2", "REQ", "ACT", "GAP", "IMPACT"
    );
    for p in &pairs {
        println!(
            "{:<28} {:<28} {:>7.3} {:>7.3} {:>7.3} {:>7.3}  {}",
            format!("{}:{}", p.contributor1_role, p.contributor1),
            format!("{}:{}", p.contributor2_role, p.contributor2),
            p.requirement,
            p.actual,
            p.gap,
            p.impact_score,
            ctx.status(p.status)
        );
    }
    Ok(())
}
