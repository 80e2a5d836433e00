// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Analyze command - one-shot congruence analysis of an input bundle

use super::{load_bundle, CliContext, RunOptions};
use crate::run::{AnalysisOutcome, AnalysisRun};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Analyse `input`, optionally recording the run in the store
pub fn run(ctx: &CliContext, input: &Path, opts: RunOptions, save: bool) -> Result<()> {
    let bundle = load_bundle(input)?;
    let engine = &ctx.config.engine;
    let mut analysis = AnalysisRun::create(&bundle, opts.into(), engine)?;

    let executed = analysis.execute(&bundle, engine).map(|_| ());
    if save {
        let store = ctx.store();
        store.save_input(&bundle)?;
        store
            .upsert(&analysis)
            .with_context(|| format!("Failed to save run to {}", store.dir().display()))?;
        info!(run = %analysis.id, "run saved");
    }
    executed.with_context(|| format!("Analysis of {} failed", input.display()))?;

    let outcome = analysis
        .outcome()
        .context("Analysis finished without a result")?;
    if ctx.json {
        return ctx.print_json(&analysis);
    }
    print_summary(ctx, &analysis, outcome);
    Ok(())
}

/// Human-readable report for a completed run
pub fn print_summary(ctx: &CliContext, run: &AnalysisRun, outcome: &AnalysisOutcome) {
    let r = &outcome.result;
    let m = &outcome.mcstc;

    println!("{}", ctx.heading(&format!("Congruence: {} @ {}", run.project, r.branch_analyzed)));
    println!("{}", "=".repeat(60));
    println!("Run:            {}", run.id);
    println!("STC value:      {:.4} ({})", r.stc_value, ctx.health(r.health));
    println!("Efficiency:     {:.4}", r.coordination_efficiency);
    println!("Contributors:   {}", r.contributors_count);
    println!("Files:          {}", r.files_count);
    println!("Centrality:     {}", r.centrality_mode);
    println!(
        "Requirements:   {:.4}   Actuals: {:.4}",
        r.coordination_requirements_total, r.coordination_actuals_total
    );
    println!(
        "Pairs:          {} congruent, {} missed, {} unnecessary",
        r.congruent_coordination_count, r.missed_coordination_count, r.unnecessary_coordination_count
    );
    if let Some(count) = outcome.requirement_tree_count {
        println!("Spanning trees: {count:.4e} (requirement)");
    }

    println!();
    println!("{}", ctx.heading("Multi-class congruence"));
    println!("{}", "-".repeat(60));
    println!("MC-STC:         {:.4} ({})", m.mcstc_value, ctx.health(m.health));
    println!("Inter-class:    {:.4}", m.inter_class_score);
    println!("Intra-class:    {:.4}", m.intra_class_score);
    println!("Dev-Sec (2C):   {:.4}", m.developer_security_score);
    println!("Dev-Ops:        {:.4}", m.developer_ops_score);
    println!("Sec-Ops:        {:.4}", m.security_ops_score);

    if !m.recommendations.is_empty() {
        println!();
        println!("{}", ctx.heading("Recommendations"));
        for rec in &m.recommendations {
            println!("  - {rec}");
        }
    }
}
