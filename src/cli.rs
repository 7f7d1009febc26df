use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Gridmatch exact nearest-neighbour comparison-group matcher.
#[derive(Parser)]
#[command(
    name = "gridmatch",
    version,
    about = "Exact chunked nearest-neighbour matching of treatment rows to a comparison pool"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Match every treatment row to its nearest comparison-pool rows.
    Match(MatchArgs),
}

/// Arguments for the `match` subcommand.
#[derive(clap::Args)]
pub struct MatchArgs {
    /// Path to TOML configuration file (default: ./gridmatch.toml when present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the treatment feature table path from config.
    #[arg(long)]
    pub treatment: Option<PathBuf>,

    /// Override the comparison-pool feature table path from config.
    #[arg(long)]
    pub pool: Option<PathBuf>,

    /// Override output Parquet path from config.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override matches per treatment row: a positive integer or "all".
    #[arg(short = 'k', long = "n-matches")]
    pub n_matches: Option<String>,

    /// Override comparison-pool rows per chunk.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Override the distance metric name.
    #[arg(long)]
    pub metric: Option<String>,
}
