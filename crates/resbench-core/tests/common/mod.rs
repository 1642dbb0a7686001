//! Shared fixtures for resbench-core integration tests.

#![allow(dead_code)]

use resbench_core::{shard_filename, RecordWriter};
use std::fs::File;
use std::path::Path;

/// A log with `warmup` warm-up rates followed by the given steady-state rates.
pub fn training_log(warmup_steps: u64, steady_rates: &[f64]) -> String {
    let mut lines = vec![
        "I1019 12:00:00 tensorflow: loss = 7.1, step = 0".to_string(),
        "I1019 12:00:05 tensorflow: global_step/sec: 0.5".to_string(),
        format!("I1019 12:00:10 tensorflow: loss = 6.9, step = {warmup_steps}"),
    ];
    for (i, rate) in steady_rates.iter().enumerate() {
        lines.push(format!("I1019 12:01:{i:02} tensorflow: global_step/sec: {rate}"));
        lines.push(format!("I1019 12:01:{i:02} tensorflow: loss = 5.0, step = {}", warmup_steps + 100 * (i as u64 + 1)));
    }
    lines.join("\n")
}

/// Write the first `shards` training shards under `dir`, each with `records` records of `size` bytes.
pub fn write_shards(dir: &Path, shards: usize, records: usize, size: usize) {
    for i in 0..shards {
        let mut writer = RecordWriter::new(File::create(shard_filename(dir, i)).unwrap());
        for r in 0..records {
            writer.write_record(&vec![(r % 251) as u8; size]).unwrap();
        }
        writer.into_inner().unwrap();
    }
}
