//! Input read benchmark command implementation.

use crate::commands::types::{BenchCommand, PipelineBenchArgs, RawBenchArgs};
use anyhow::{Context, Result};
use colored::Colorize;
use resbench_core::{
    epochs_for_steps, pipeline_benchmark, raw_read_benchmark, BenchConfig, BenchmarkReport, PipelineOptions,
};
use std::path::PathBuf;

const DEFAULT_NUM_STEPS: u64 = 2000;
const DEFAULT_WARMUP_STEPS: u64 = 100;

pub fn execute(cmd: BenchCommand, config: &BenchConfig) -> Result<()> {
    match cmd {
        BenchCommand::Raw(args) => raw(args, config),
        BenchCommand::Pipeline(args) => pipeline(args, config),
    }
}

fn data_dir(arg: Option<PathBuf>, config: &BenchConfig) -> Result<PathBuf> {
    arg.or_else(|| config.data_dir.clone())
        .context("No data directory given. Pass --data-dir or set bench.data_dir in the config file.")
}

fn raw(args: RawBenchArgs, config: &BenchConfig) -> Result<()> {
    let data_dir = data_dir(args.data_dir, config)?;
    let num_files = args.num_steps.or(config.num_steps).unwrap_or(DEFAULT_NUM_STEPS);

    let report = raw_read_benchmark(&data_dir, usize::try_from(num_files).unwrap_or(usize::MAX))?;
    print_report(&report, args.json)
}

fn pipeline(args: PipelineBenchArgs, config: &BenchConfig) -> Result<()> {
    let data_dir = data_dir(args.data_dir, config)?;
    let defaults = PipelineOptions::default();
    let batch_size = args.batch_size.or(config.batch_size).unwrap_or(defaults.batch_size);
    let num_steps = args.num_steps.or(config.num_steps).unwrap_or(DEFAULT_NUM_STEPS);
    let warmup_steps = args.warmup_steps.or(config.warmup_steps).unwrap_or(DEFAULT_WARMUP_STEPS);
    let examples_per_epoch = config.examples_per_epoch.unwrap_or(defaults.examples_per_epoch);

    let options = PipelineOptions {
        batch_size,
        num_epochs: epochs_for_steps(batch_size, num_steps, examples_per_epoch),
        prefetch: args.prefetch,
        num_devices: args.num_devices.or(config.num_devices),
        examples_per_epoch,
    };

    let report = pipeline_benchmark(&data_dir, &options, num_steps, warmup_steps)?;
    print_report(&report, args.json)
}

fn print_report(report: &BenchmarkReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("{:?} read benchmark", report.mode).bold().cyan());
    println!("  Items:   {}", report.items);
    println!("  Elapsed: {:.3}s", report.elapsed_secs);
    println!("  Rate:    {} {}", format!("{:.2}", report.rate).green().bold(), report.unit);
    println!();
    Ok(())
}
