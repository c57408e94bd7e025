//! # dispatch CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dispatch_cli::distance::{run_distance, DistanceArgs};
use dispatch_cli::rank::{run_rank, RankArgs};
use dispatch_cli::sla::{run_sla, SlaArgs};
use dispatch_cli::transitions::{run_transitions, TransitionsArgs};

/// Service dispatch operator tooling.
///
/// Offline distance, branch ranking, SLA evaluation, and the request
/// status transition table.
#[derive(Parser, Debug)]
#[command(name = "dispatch", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Great-circle distance between two LAT,LNG points.
    Distance(DistanceArgs),

    /// Rank branches from a JSON or YAML file by distance from a customer.
    Rank(RankArgs),

    /// Remaining minutes and expiry for an SLA deadline.
    Sla(SlaArgs),

    /// Print the (status, trigger) transition table.
    Transitions(TransitionsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Distance(args) => run_distance(&args),
        Commands::Rank(args) => run_rank(&args),
        Commands::Sla(args) => run_sla(&args),
        Commands::Transitions(args) => run_transitions(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
