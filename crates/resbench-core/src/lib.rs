//! Resbench Core
//!
//! Auxiliary tooling around a ResNet/ImageNet training pipeline:
//! - Extracting steady-state throughput from training logs (`throughput`)
//! - Aggregating per-log results into a summary table (`results`)
//! - Building batch-job submission manifests (`manifest`)
//! - Benchmarking raw file reads against a batched record pipeline (`benchmark`)

pub mod benchmark;
pub mod config;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod pipeline;
pub mod records;
pub mod results;
pub mod throughput;

pub use benchmark::{pipeline_benchmark, raw_read_benchmark, BenchmarkMode, BenchmarkReport, BenchmarkTiming};
pub use config::{BenchConfig, ConfigError, GatherConfig, ManifestConfig, ResbenchConfig};
pub use error::{BenchError, BenchResult};
pub use layout::{shard_filename, shard_filenames, NUM_TRAIN_FILES, NUM_TRAIN_IMAGES};
pub use manifest::{build_command_line, generate_job_spec, to_manifest_json, write_manifest, JobSpec, ManifestOptions, ManifestSettings};
pub use pipeline::{epochs_for_steps, input_pipeline, Batch, InputPipeline, PipelineOptions};
pub use records::{Record, RecordReader, RecordWriter};
pub use results::{discover_logs, gather_results, result_name, write_results, GatherOptions, ThroughputTable};
pub use throughput::{extract_throughput, fetch_throughput_from_log, ExtractOptions};
