//! Resbench CLI - Command-line tools around a ResNet/ImageNet training pipeline
//!
//! This CLI provides a `resbench` command for summarizing training-log
//! throughput, generating batch-job manifests, and benchmarking input reads.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::types::{BenchCommand, GatherArgs, ManifestArgs};
use commands::{bench, gather, manifest};

/// Resbench CLI - Training throughput and input pipeline tooling
#[derive(Parser, Debug)]
#[command(
    name = "resbench",
    author,
    version,
    about = "Resbench - ResNet training throughput and input pipeline tooling",
    long_about = "Resbench summarizes training-log throughput, generates batch-job manifests,\nand compares raw file reads against a batched record pipeline."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file (overrides ~/.resbench/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize training-log throughput
    ///
    /// Scans every matching log for `global_step/sec` rates past warm-up and
    /// writes one `name,value` row per log.
    Gather(GatherArgs),

    /// Generate a batch-job manifest
    ///
    /// Writes the job submission document for a container-based training run.
    Manifest(ManifestArgs),

    /// Benchmark input reads
    ///
    /// Times raw shard reads or reads through the batched record pipeline.
    #[command(subcommand)]
    Bench(BenchCommand),
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let cli_config = config::load_config(args.config.as_deref())?;

    // Initialize tracing
    let level_name = args.log_level.as_deref().or(cli_config.log_level.as_deref()).unwrap_or("info");
    let level = match level_name {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Gather(gather_args) => gather::execute(gather_args, &cli_config.gather)?,
        Command::Manifest(manifest_args) => manifest::execute(manifest_args, &cli_config.manifest)?,
        Command::Bench(cmd) => bench::execute(cmd, &cli_config.bench)?,
    }

    Ok(())
}
