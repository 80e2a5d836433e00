// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Heatmap command - pairwise coordination grid

use super::{load_bundle, CliContext, RunOptions};
use crate::run::{analyze, RunConfig};
use crate::scorer::Heatmap;
use crate::types::HeatmapCell;
use anyhow::Result;
use std::path::Path;

/// Print the contributor × contributor grid
pub fn run(ctx: &CliContext, input: &Path, opts: RunOptions) -> Result<()> {
    let bundle = load_bundle(input)?;
    let engine = &ctx.config.engine;
    let config = RunConfig::from(opts);
    config.validate(engine)?;

    let heatmap = analyze(&bundle, &config, engine)?.heatmap;
    if ctx.json {
        return ctx.print_json(&heatmap);
    }
    print!("{}", render(&heatmap));
    println!();
    println!("legend: = congruent, M missed, U unnecessary, . none");
    Ok(())
}

/// Plain-text grid, one row per contributor
#[must_use]
pub fn render(heatmap: &Heatmap) -> String {
    let width = heatmap
        .contributors
        .iter()
        .map(|c| c.chars().count())
        .max()
        .unwrap_or(0);
    let mut out = String::new();

    out.push_str(&format!("{:<width$} ", "#"));
    for i in 0..heatmap.contributors.len() {
        out.push_str(&format!("{:>3}", i + 1));
    }
    out.push('\n');

    for (i, row) in heatmap.cells.iter().enumerate() {
        out.push_str(&format!("{:<width$} ", heatmap.contributors[i]));
        for cell in row {
            let c = match cell {
                HeatmapCell::None => '.',
                HeatmapCell::Congruent => '=',
                HeatmapCell::Missed => 'M',
                HeatmapCell::Unnecessary => 'U',
            };
            out.push_str(&format!("{c:>3}"));
        }
        out.push_str(&format!("  {}\n", i + 1));
    }
    out
}
