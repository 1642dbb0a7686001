//! Command type definitions shared between main.rs and the command modules.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct GatherArgs {
    /// Directory searched for training logs
    #[arg(short = 'd', long)]
    pub dir: Option<PathBuf>,

    /// File-name pattern of the training logs (default: *.stderr)
    #[arg(long)]
    pub pattern: Option<String>,

    /// Output table path (default: results.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// First step number considered past warm-up (default: 1)
    #[arg(long, alias = "warmup_steps")]
    pub warmup_steps: Option<u64>,

    /// Records per training step (default: 32)
    #[arg(long, alias = "batch_size")]
    pub batch_size: Option<u32>,

    /// Also print the results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    /// Docker image to use
    #[arg(long, alias = "docker_image")]
    pub docker_image: String,

    /// Name of the file to save the job spec to (default: job.json)
    #[arg(short, long)]
    pub filename: Option<PathBuf>,

    /// Pass --prefetch to the training script
    #[arg(long)]
    pub prefetch: bool,

    /// Mount the dataset container and read from the mount
    #[arg(long)]
    pub mount: bool,

    /// Mount the dataset container and copy it to local disk first
    #[arg(long, alias = "copy_to_local")]
    pub copy_to_local: bool,

    /// Dataset used to train ResNet (default: imagenet2012)
    #[arg(long)]
    pub dataset: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BenchCommand {
    /// Time sequential open-and-read of whole shard files
    Raw(RawBenchArgs),

    /// Time batch pulls from the record pipeline
    Pipeline(PipelineBenchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RawBenchArgs {
    /// Directory holding the train-NNNNN-of-01024 shards
    #[arg(long, alias = "data_dir")]
    pub data_dir: Option<PathBuf>,

    /// Number of files to read (default: 2000, capped at the shard count)
    #[arg(long, alias = "num_steps")]
    pub num_steps: Option<u64>,

    /// Output report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PipelineBenchArgs {
    /// Directory holding the train-NNNNN-of-01024 shards
    #[arg(long, alias = "data_dir")]
    pub data_dir: Option<PathBuf>,

    /// Records per batch (default: 32)
    #[arg(long, alias = "batch_size")]
    pub batch_size: Option<usize>,

    /// Number of batches to pull (default: 2000)
    #[arg(long, alias = "num_steps")]
    pub num_steps: Option<u64>,

    /// Leading batch pulls excluded from timing (default: 100)
    #[arg(long, alias = "warmup_steps")]
    pub warmup_steps: Option<u64>,

    /// Prefetch records and batches in the background
    #[arg(long)]
    pub prefetch: bool,

    /// Truncate to a batch count divisible by this many devices
    #[arg(long, alias = "num_gpus")]
    pub num_devices: Option<u64>,

    /// Output report as JSON
    #[arg(long)]
    pub json: bool,
}
