//! Read-throughput benchmarks: raw shard reads versus the batched pipeline.

use crate::error::{BenchError, BenchResult};
use crate::layout::shard_filenames;
use crate::pipeline::{input_pipeline, PipelineOptions};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMode {
    Raw,
    Pipeline,
}

impl BenchmarkMode {
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::Raw => "files/sec",
            Self::Pipeline => "records/sec",
        }
    }
}

/// Accumulated time spent on timed work and the number of items it produced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BenchmarkTiming {
    pub elapsed: Duration,
    pub items: u64,
}

impl BenchmarkTiming {
    pub fn record(&mut self, elapsed: Duration, items: u64) {
        self.elapsed += elapsed;
        self.items += items;
    }

    /// Items per second; 0.0 when nothing was timed.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if self.items == 0 || secs <= 0.0 {
            return 0.0;
        }
        self.items as f64 / secs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub mode: BenchmarkMode,
    pub items: u64,
    pub elapsed_secs: f64,
    pub rate: f64,
    pub unit: String,
}

impl BenchmarkReport {
    fn new(mode: BenchmarkMode, timing: &BenchmarkTiming) -> Self {
        Self {
            mode,
            items: timing.items,
            elapsed_secs: timing.elapsed.as_secs_f64(),
            rate: timing.rate(),
            unit: mode.unit().to_string(),
        }
    }
}

/// Open and fully read the first `num_files` shards, timing each file.
pub fn raw_read_benchmark(data_dir: &Path, num_files: usize) -> BenchResult<BenchmarkReport> {
    if !data_dir.is_dir() {
        return Err(BenchError::MissingDataDir(data_dir.to_path_buf()));
    }

    let mut timing = BenchmarkTiming::default();
    let mut buf = Vec::new();
    for path in shard_filenames(data_dir).iter().take(num_files) {
        let start = Instant::now();
        let bytes = read_file(path, &mut buf)?;
        timing.record(start.elapsed(), 1);
        debug!(path = %path.display(), bytes, "read shard");
    }

    let report = BenchmarkReport::new(BenchmarkMode::Raw, &timing);
    info!("Total read files per second: {}", report.rate);
    Ok(report)
}

fn read_file(path: &Path, buf: &mut Vec<u8>) -> BenchResult<usize> {
    buf.clear();
    let to_err = |source| BenchError::DataFile { path: path.to_path_buf(), source };
    let mut file = std::fs::File::open(path).map_err(to_err)?;
    file.read_to_end(buf).map_err(to_err)
}

/// Pull up to `num_steps` batches from the pipeline, timing each pull.
///
/// The first `warmup_steps` pulls are not timed. Running out of data ends the
/// loop early; the rate covers the records actually timed.
pub fn pipeline_benchmark(
    data_dir: &Path,
    options: &PipelineOptions,
    num_steps: u64,
    warmup_steps: u64,
) -> BenchResult<BenchmarkReport> {
    let mut pipeline = input_pipeline(data_dir, options)?;
    if warmup_steps >= num_steps {
        warn!(num_steps, warmup_steps, "every step is a warm-up step, nothing will be timed");
    }

    let mut timing = BenchmarkTiming::default();
    for step in 0..num_steps {
        let start = Instant::now();
        let Some(batch) = pipeline.next() else {
            info!(step, "input pipeline exhausted");
            break;
        };
        let batch = batch?;
        let elapsed = start.elapsed();
        if step >= warmup_steps {
            timing.record(elapsed, batch.len() as u64);
        }
    }

    let report = BenchmarkReport::new(BenchmarkMode::Pipeline, &timing);
    info!("Total read images per second: {}", report.rate);
    Ok(report)
}
