// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Run commands - create, start and inspect stored analysis runs

use super::{load_bundle, CliContext, RunOptions};
use crate::run::AnalysisRun;
use crate::service::AnalysisService;
use anyhow::{Context, Result};
use std::path::Path;

/// Create a run for `input` without starting it
pub fn create(ctx: &CliContext, input: &Path, opts: RunOptions) -> Result<()> {
    let bundle = load_bundle(input)?;
    let service = AnalysisService::new(ctx.config.engine.clone()).with_store(ctx.store());
    let id = service.create(bundle, opts.into())?;

    if ctx.json {
        return ctx.print_json(&service.status(id)?);
    }
    println!("Created run {id}");
    println!("Start it with: congruence run start {id}");
    Ok(())
}

/// Start a stored run on the background worker and wait for it
pub fn start(ctx: &CliContext, id: &str) -> Result<()> {
    let store = ctx.store();
    let run = store.find(id)?;
    let bundle = store
        .load_input(&run.input_fingerprint)
        .with_context(|| format!("Input bundle for run {} is missing from the store", run.id))?;

    let service = AnalysisService::new(ctx.config.engine.clone()).with_store(store);
    let run_id = run.id;
    service.register(run, bundle)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let handle = service.start_background(run_id)?;
        if !ctx.json {
            println!("Run {run_id} is running...");
        }
        handle.await.context("Analysis worker panicked")?;
        Ok::<_, anyhow::Error>(())
    })?;

    let finished = service.status(run_id)?;
    if ctx.json {
        return ctx.print_json(&finished);
    }
    print_run(ctx, &finished);
    if let Some(message) = finished.error_message() {
        let code = finished.error_code().unwrap_or_default();
        anyhow::bail!("Run {run_id} failed [{code}]: {message}");
    }
    Ok(())
}

/// Show the current state of a stored run
pub fn status(ctx: &CliContext, id: &str) -> Result<()> {
    let run = ctx.store().find(id)?;
    if ctx.json {
        return ctx.print_json(&run);
    }
    print_run(ctx, &run);
    Ok(())
}

/// List stored runs
pub fn list(ctx: &CliContext) -> Result<()> {
    let runs = ctx.store().load()?;
    if ctx.json {
        return ctx.print_json(&runs);
    }
    if runs.is_empty() {
        println!("No analysis runs yet.");
        return Ok(());
    }
    println!("{:<36}  {:<10}  {:<20}  {:>7}  CREATED", "ID", "STATE", "PROJECT", "STC");
    for run in &runs {
        let stc = run
            .result()
            .map_or_else(|| "-".to_string(), |r| format!("{:.4}", r.stc_value));
        println!(
            "{:<36}  {:<10}  {:<20}  {:>7}  {}",
            run.id,
            run.status.name(),
            format!("{}@{}", run.project, run.branch),
            stc,
            run.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// Per-project statistics over stored runs
pub fn stats(ctx: &CliContext, project: Option<&str>) -> Result<()> {
    let stats: Vec<_> = ctx
        .store()
        .project_stats()?
        .into_iter()
        .filter(|s| project.map_or(true, |p| s.project == p))
        .collect();
    if ctx.json {
        return ctx.print_json(&stats);
    }
    if stats.is_empty() {
        println!("No analysis runs yet.");
        return Ok(());
    }
    println!(
        "{:<24} {:>6} {:>9} {:>6} {:>8} {:>9} {:>9}  HEALTH",
        "PROJECT", "TOTAL", "COMPLETED", "FAILED", "AVG STC", "AVG MCSTC", "LATEST"
    );
    for s in &stats {
        let latest = s
            .latest_mcstc_value
            .map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
        println!(
            "{:<24} {:>6} {:>9} {:>6} {:>8.4} {:>9.4} {:>9}  {}",
            s.project,
            s.total_analyses,
            s.completed_analyses,
            s.failed_analyses,
            s.average_stc_value,
            s.average_mcstc_value,
            latest,
            ctx.health(s.health)
        );
    }
    Ok(())
}

fn print_run(ctx: &CliContext, run: &AnalysisRun) {
    match run.outcome() {
        Some(outcome) => super::analyze::print_summary(ctx, run, outcome),
        None => {
            println!("Run:      {}", run.id);
            println!("Project:  {}@{}", run.project, run.branch);
            println!("State:    {}", run.status.name());
            if let Some(message) = run.error_message() {
                println!("Error:    {message}");
            }
            if let Some(code) = run.error_code().filter(|c| !c.is_empty()) {
                println!("Code:     {code}");
            }
        }
    }
}
