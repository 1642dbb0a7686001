//! Manifest command implementation.

use crate::commands::types::ManifestArgs;
use crate::config::manifest_settings;
use anyhow::{Context, Result};
use colored::Colorize;
use resbench_core::{generate_job_spec, write_manifest, ManifestConfig, ManifestOptions};
use std::path::PathBuf;
use tracing::info;

pub fn execute(args: ManifestArgs, config: &ManifestConfig) -> Result<()> {
    let filename = args.filename.or_else(|| config.filename.clone()).unwrap_or_else(|| PathBuf::from("job.json"));
    let mut options = ManifestOptions::new(args.docker_image);
    options.prefetch = args.prefetch;
    options.mount = args.mount;
    options.copy_to_local = args.copy_to_local;
    if let Some(dataset) = args.dataset.or_else(|| config.dataset.clone()) {
        options.dataset = dataset;
    }

    info!("Creating manifest {} with {} image...", filename.display(), options.image);
    let spec = generate_job_spec(&options, &manifest_settings(config));
    write_manifest(&filename, &spec)
        .with_context(|| format!("Failed to write manifest to {}", filename.display()))?;
    info!("Done");

    println!("{} {}", "✓ Wrote manifest".green().bold(), filename.display().to_string().dimmed());
    Ok(())
}
