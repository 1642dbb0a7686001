//! Integration tests for the raw and pipeline read benchmarks.

mod common;

use common::write_shards;
use resbench_core::{
    input_pipeline, pipeline_benchmark, raw_read_benchmark, BenchError, BenchmarkMode, PipelineOptions,
};
use tempfile::TempDir;

#[test]
fn test_raw_benchmark_reads_requested_files() {
    let temp = TempDir::new().unwrap();
    write_shards(temp.path(), 3, 4, 64);

    let report = raw_read_benchmark(temp.path(), 3).unwrap();
    assert_eq!(report.mode, BenchmarkMode::Raw);
    assert_eq!(report.items, 3);
    assert_eq!(report.unit, "files/sec");
}

#[test]
fn test_raw_benchmark_missing_shard_is_fatal() {
    let temp = TempDir::new().unwrap();
    write_shards(temp.path(), 2, 1, 8);

    let err = raw_read_benchmark(temp.path(), 3).unwrap_err();
    match err {
        BenchError::DataFile { path, .. } => assert!(path.ends_with("train-00002-of-01024")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_pipeline_benchmark_stops_on_exhaustion() {
    let temp = TempDir::new().unwrap();
    // The benchmark walks all 1024 shard names, so create them all (empty ones are fine).
    write_shards(temp.path(), 1024, 0, 0);
    write_shards(temp.path(), 2, 5, 16);

    let options = PipelineOptions { batch_size: 4, prefetch: true, ..PipelineOptions::default() };
    let report = pipeline_benchmark(temp.path(), &options, 100, 0).unwrap();
    assert_eq!(report.mode, BenchmarkMode::Pipeline);
    // 10 records in batches of 4: 4 + 4 + 2.
    assert_eq!(report.items, 10);
}

#[test]
fn test_pipeline_warmup_steps_are_not_timed() {
    let temp = TempDir::new().unwrap();
    write_shards(temp.path(), 1024, 0, 0);
    write_shards(temp.path(), 1, 12, 8);

    let options = PipelineOptions { batch_size: 4, ..PipelineOptions::default() };
    let report = pipeline_benchmark(temp.path(), &options, 3, 1).unwrap();
    assert_eq!(report.items, 8);
}

#[test]
fn test_pipeline_missing_shard_is_fatal() {
    let temp = TempDir::new().unwrap();
    write_shards(temp.path(), 1, 2, 8);

    let options = PipelineOptions { batch_size: 2, ..PipelineOptions::default() };
    let mut pipeline = input_pipeline(temp.path(), &options).unwrap();
    assert_eq!(pipeline.next().unwrap().unwrap().len(), 2);
    assert!(matches!(pipeline.next().unwrap(), Err(BenchError::DataFile { .. })));
}
