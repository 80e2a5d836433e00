// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Export command - one coordination graph as Graphviz DOT or JSON

use super::centrality::GraphKind;
use super::{load_bundle, CliContext};
use crate::graph::GraphSnapshot;
use crate::run::build_graphs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Export encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Graphviz DOT (undirected, neato layout)
    #[value(alias = "graphviz")]
    Dot,
    /// Node list plus weighted edge list
    Json,
}

impl ExportFormat {
    /// Explicit choice, else the output file's extension, else DOT
    #[must_use]
    pub fn resolve(explicit: Option<Self>, output: Option<&Path>) -> Self {
        explicit
            .or_else(|| {
                let ext = output?.extension()?.to_str()?.to_ascii_lowercase();
                match ext.as_str() {
                    "json" => Some(Self::Json),
                    "dot" | "gv" => Some(Self::Dot),
                    _ => None,
                }
            })
            .unwrap_or(Self::Dot)
    }

    /// File extension appended to extensionless output paths
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Json => "json",
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    project: &'a str,
    graph: &'a str,
    #[serde(flatten)]
    snapshot: GraphSnapshot,
}

/// Run the export command
pub fn run(
    ctx: &CliContext,
    input: &Path,
    kind: GraphKind,
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
) -> Result<()> {
    let format = ExportFormat::resolve(format, output.as_deref());
    let bundle = load_bundle(input)?;
    let graphs = build_graphs(&bundle, &ctx.config.engine)?;
    let (graph, name) = match kind {
        GraphKind::Requirement => (&graphs.requirement.graph, "requirement"),
        GraphKind::Actual => (&graphs.actual, "actual"),
    };
    info!(graph = name, format = ?format, edges = graph.edge_count(), "exporting");

    if graph.edge_count() == 0 {
        warn!(graph = name, "graph has no edges");
    }

    let content = match format {
        ExportFormat::Dot => graph.to_dot(name),
        ExportFormat::Json => serde_json::to_string_pretty(&JsonExport {
            project: &bundle.project,
            graph: name,
            snapshot: graph.snapshot(),
        })?,
    };

    match output {
        Some(mut path) => {
            if path.extension().is_none() {
                path.set_extension(format.extension());
            }
            fs::write(&path, &content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !ctx.json {
                println!("{} graph written to {}", name, path.display());
            }
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }

    Ok(())
}
