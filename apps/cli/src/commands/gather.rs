//! Gather command implementation.

use crate::commands::types::GatherArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use resbench_core::{gather_results, write_results, ExtractOptions, GatherConfig, GatherOptions};
use tracing::info;

pub fn execute(args: GatherArgs, config: &GatherConfig) -> Result<()> {
    let defaults = GatherOptions::default();
    let options = GatherOptions {
        dir: args.dir.or_else(|| config.dir.clone()).unwrap_or(defaults.dir),
        pattern: args.pattern.or_else(|| config.pattern.clone()).unwrap_or(defaults.pattern),
        output: args.output.or_else(|| config.output.clone()).unwrap_or(defaults.output),
        extract: ExtractOptions {
            warmup_steps: args.warmup_steps.or(config.warmup_steps).unwrap_or(defaults.extract.warmup_steps),
            batch_size: args.batch_size.or(config.batch_size).unwrap_or(defaults.extract.batch_size),
        },
    };

    let table = gather_results(&options)?;
    write_results(&options.output, &table)
        .with_context(|| format!("Failed to write results to {}", options.output.display()))?;
    info!(path = %options.output.display(), rows = table.len(), "wrote results");

    if args.json {
        let map: serde_json::Map<String, serde_json::Value> =
            table.iter().map(|(name, value)| (name.to_string(), serde_json::json!(value))).collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Throughput ({} logs)", table.len()).bold().cyan());
    println!();
    if table.is_empty() {
        println!("  {}", format!("No logs matched {} in {}", options.pattern, options.dir.display()).dimmed());
    } else {
        println!("{:<40} {:>16}", "Name", "Records/sec");
        println!("{}", "─".repeat(57));
        for (name, value) in table.iter() {
            println!("{:<40} {:>16.2}", name.cyan(), value);
        }
    }
    println!();
    println!("  Wrote: {}", options.output.display().to_string().dimmed());
    println!();
    Ok(())
}
