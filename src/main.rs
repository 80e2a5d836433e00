// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Congruence CLI - socio-technical congruence for development teams

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use congruence::commands::{
    self, centrality::GraphKind, config::ConfigAction, export::ExportFormat, CliContext, RunOptions,
};
use congruence::roles::PairFilter;
use congruence::scorer::ContributorFilter;
use congruence::types::{CoordinationStatus, FunctionalRole};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "congruence")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "CONGRUENCE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Data directory override
    #[arg(long, env = "CONGRUENCE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the analysing commands
#[derive(clap::Args, Debug, Clone)]
struct AnalysisArgs {
    /// Input bundle (JSON)
    input: PathBuf,

    /// Use Monte Carlo sampling regardless of team size
    #[arg(long)]
    monte_carlo: bool,

    /// Monte Carlo iterations (bounded by configuration)
    #[arg(long)]
    iterations: Option<usize>,

    /// Functional roles to keep distinct (comma separated)
    #[arg(long, value_delimiter = ',')]
    roles: Vec<FunctionalRole>,
}

impl AnalysisArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            monte_carlo: self.monte_carlo,
            iterations: self.iterations,
            roles: self.roles.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse an input bundle and print the congruence report
    Analyze {
        #[command(flatten)]
        args: AnalysisArgs,

        /// Record the run in the data directory
        #[arg(long)]
        save: bool,
    },

    /// Spanning-tree centrality of one coordination graph
    Centrality {
        #[command(flatten)]
        args: AnalysisArgs,

        /// Graph to inspect
        #[arg(long, value_enum, default_value = "requirement")]
        graph: GraphKind,

        /// Show only the top N contributors and edges
        #[arg(long)]
        top: Option<usize>,
    },

    /// Ranked contributor pairs by coordination impact
    Pairs {
        #[command(flatten)]
        args: AnalysisArgs,

        /// Show only the top N pairs
        #[arg(long)]
        top: Option<usize>,

        /// Only pairs with this status (congruent, missed, unnecessary)
        #[arg(long)]
        status: Option<CoordinationStatus>,

        /// Only pairs involving this role
        #[arg(long)]
        role: Option<FunctionalRole>,

        /// Only pairs whose contributors hold different roles
        #[arg(long)]
        inter_class_only: bool,
    },

    /// Contributor centrality next to coordination and modification activity
    Contributors {
        #[command(flatten)]
        args: AnalysisArgs,

        /// Only contributors holding this role
        #[arg(long)]
        role: Option<FunctionalRole>,

        /// Show only the top N contributors by centrality
        #[arg(long)]
        top: Option<usize>,
    },

    /// Pairwise coordination grid
    Heatmap {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Export a coordination graph to various formats
    Export {
        /// Input bundle (JSON)
        input: PathBuf,

        /// Graph to export
        #[arg(long, value_enum, default_value = "requirement")]
        graph: GraphKind,

        /// Output format; inferred from the output extension when omitted
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage stored analysis runs
    Run {
        #[command(subcommand)]
        action: RunCommand,
    },

    /// Inspect or initialise configuration
    Config {
        /// Action: show, path, init
        #[arg(value_enum, default_value = "show")]
        action: ConfigAction,

        /// Target file for init
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum RunCommand {
    /// Create a run for an input bundle
    Create {
        #[command(flatten)]
        args: AnalysisArgs,
    },
    /// Start a created run and wait for it to finish
    Start {
        /// Run id or unique prefix
        id: String,
    },
    /// Show a run's state and result
    Status {
        /// Run id or unique prefix
        id: String,
    },
    /// List stored runs
    List,
    /// Per-project totals, averages and health of stored runs
    Stats {
        /// Only this project
        #[arg(long)]
        project: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = congruence::config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }

    // Initialize logging; RUST_LOG overrides the flags
    let log_level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CliContext {
        config,
        config_path: cli.config.clone(),
        json: cli.json,
        color: !cli.no_color && !cli.json,
    };

    // Execute command
    match cli.command {
        Commands::Analyze { args, save } => {
            commands::analyze::run(&ctx, &args.input, args.options(), save)
        }
        Commands::Centrality { args, graph, top } => {
            commands::centrality::run(&ctx, &args.input, graph, args.options(), top)
        }
        Commands::Pairs { args, top, status, role, inter_class_only } => {
            let filter = PairFilter {
                top_n: top,
                status,
                role,
                inter_class_only,
            };
            commands::pairs::run(&ctx, &args.input, args.options(), &filter)
        }
        Commands::Contributors { args, role, top } => {
            let filter = ContributorFilter { role, top_n: top };
            commands::contributors::run(&ctx, &args.input, args.options(), &filter)
        }
        Commands::Heatmap { args } => {
            commands::heatmap::run(&ctx, &args.input, args.options())
        }
        Commands::Export { input, graph, format, output } => {
            commands::export::run(&ctx, &input, graph, format, output)
        }
        Commands::Run { action } => match action {
            RunCommand::Create { args } => commands::run::create(&ctx, &args.input, args.options()),
            RunCommand::Start { id } => commands::run::start(&ctx, &id),
            RunCommand::Status { id } => commands::run::status(&ctx, &id),
            RunCommand::List => commands::run::list(&ctx),
            RunCommand::Stats { project } => commands::run::stats(&ctx, project.as_deref()),
        },
        Commands::Config { action, output } => {
            commands::config::run(&ctx, action, output)
        }
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command())
        }
    }
}
