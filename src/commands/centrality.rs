// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Centrality command - spanning-tree statistics for one graph

use super::{load_bundle, CliContext, RunOptions};
use crate::centrality::select_strategy;
use crate::run::{build_graphs, RunConfig};
use crate::scorer::rank_contributors;
use crate::types::{CentralityMode, ContributorCentrality};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// Which coordination graph to inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GraphKind {
    /// Required coordination
    Requirement,
    /// Observed coordination
    Actual,
}

#[derive(Serialize)]
struct EdgeRow {
    contributor1: String,
    contributor2: String,
    weight: f64,
    participation: f64,
}

#[derive(Serialize)]
struct Report {
    mode: CentralityMode,
    spanning_tree_count: Option<f64>,
    log_forest_count: Option<f64>,
    component_count: usize,
    samples: Option<usize>,
    contributors: Vec<ContributorCentrality>,
    edges: Vec<EdgeRow>,
}

/// Print spanning-tree centrality for the selected graph
pub fn run(ctx: &CliContext, input: &Path, kind: GraphKind, opts: RunOptions, top: Option<usize>) -> Result<()> {
    let bundle = load_bundle(input)?;
    let engine = &ctx.config.engine;
    let config = RunConfig::from(opts);
    config.validate(engine)?;

    let graphs = build_graphs(&bundle, engine)?;
    let graph = match kind {
        GraphKind::Requirement => &graphs.requirement.graph,
        GraphKind::Actual => &graphs.actual,
    };
    let strategy = select_strategy(engine, graph.node_count(), config.use_monte_carlo, config.iterations(engine));
    let report = strategy.compute(graph)?;

    let mut edges: Vec<EdgeRow> = report
        .participation
        .iter()
        .map(|((u, v), p)| EdgeRow {
            contributor1: graph.contributor(u).to_string(),
            contributor2: graph.contributor(v).to_string(),
            weight: graph.weight(u, v),
            participation: p,
        })
        .collect();
    edges.sort_by(|a, b| b.participation.total_cmp(&a.participation));

    let mut contributors = rank_contributors(graph, &report);
    if let Some(n) = top {
        contributors.truncate(n);
        edges.truncate(n);
    }

    let out = Report {
        mode: report.mode,
        spanning_tree_count: report.spanning_tree_count,
        log_forest_count: report.log_forest_count,
        component_count: report.component_count,
        samples: report.samples,
        contributors,
        edges,
    };
    if ctx.json {
        return ctx.print_json(&out);
    }

    println!("Mode:           {}", out.mode);
    match out.spanning_tree_count {
        Some(count) => println!("Spanning trees: {count:.6e}"),
        None => println!("Spanning trees: (component too large to count)"),
    }
    println!("Components:     {}", out.component_count);
    if let Some(samples) = out.samples {
        println!("Samples:        {samples} per component");
    }
    println!();
    println!("{}", ctx.heading("Contributors"));
    for c in &out.contributors {
        println!("  {:>3}. {:<24} {:.4}", c.rank, c.contributor_id, c.stc_value);
    }
    println!();
    println!("{}", ctx.heading("Edges"));
    for e in &out.edges {
        println!(
            "  {:<20} -- {:<20} w={:<8.3} p={:.4}",
            e.contributor1, e.contributor2, e.weight, e.participation
        );
    }
    Ok(())
}
