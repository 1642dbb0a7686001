//! Batched record pipeline over the training shards.
//!
//! Stages, in order:
//! 1. records read sequentially from every shard, the shard list repeated per epoch
//! 2. optional prefetch of one batch worth of records
//! 3. optional truncation so every device receives the same number of batches
//! 4. batching (a final partial batch is kept)
//! 5. optional prefetch of `batch_size` batches
//!
//! Prefetch stages run their upstream on a background thread feeding a bounded
//! channel. Exhaustion is the iterator returning `None`.

use crate::error::{BenchError, BenchResult};
use crate::layout::{shard_filenames, NUM_TRAIN_IMAGES};
use crate::records::{Record, RecordReader};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver};
use std::thread::JoinHandle;
use tracing::debug;

pub type Batch = Vec<Record>;

type RecordStream = Box<dyn Iterator<Item = BenchResult<Record>> + Send>;
type BatchStream = Box<dyn Iterator<Item = BenchResult<Batch>> + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub batch_size: usize,
    /// Passes over the shard list.
    pub num_epochs: u64,
    pub prefetch: bool,
    /// When set, truncate so the batch count is a multiple of this.
    pub num_devices: Option<u64>,
    /// Examples per epoch, used only for truncation.
    pub examples_per_epoch: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { batch_size: 32, num_epochs: 1, prefetch: false, num_devices: None, examples_per_epoch: NUM_TRAIN_IMAGES }
    }
}

impl PipelineOptions {
    fn validate(&self) -> BenchResult<()> {
        if self.batch_size == 0 {
            return Err(BenchError::InvalidConfig("batch_size must be >= 1".to_string()));
        }
        if self.num_epochs == 0 {
            return Err(BenchError::InvalidConfig("num_epochs must be >= 1".to_string()));
        }
        if self.num_devices == Some(0) {
            return Err(BenchError::InvalidConfig("num_devices must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Records kept after device truncation, if truncation applies.
    fn truncated_records(&self) -> Option<u64> {
        let devices = self.num_devices?;
        let batch = self.batch_size as u64;
        let total_examples = self.num_epochs.saturating_mul(self.examples_per_epoch);
        let total_batches = total_examples / batch / devices * devices;
        Some(total_batches.saturating_mul(batch))
    }
}

/// Epochs needed to serve `num_steps` batches, at least one.
pub fn epochs_for_steps(batch_size: usize, num_steps: u64, examples_per_epoch: u64) -> u64 {
    let records = (batch_size as u64).saturating_mul(num_steps);
    if examples_per_epoch == 0 {
        return 1;
    }
    records.div_ceil(examples_per_epoch).max(1)
}

/// Build the batch pipeline over the shards in `data_dir`.
pub fn input_pipeline(data_dir: &Path, options: &PipelineOptions) -> BenchResult<InputPipeline> {
    options.validate()?;
    if !data_dir.is_dir() {
        return Err(BenchError::MissingDataDir(data_dir.to_path_buf()));
    }
    pipeline_over(shard_filenames(data_dir), options)
}

pub(crate) fn pipeline_over(files: Vec<PathBuf>, options: &PipelineOptions) -> BenchResult<InputPipeline> {
    options.validate()?;
    debug!(
        files = files.len(),
        batch_size = options.batch_size,
        epochs = options.num_epochs,
        prefetch = options.prefetch,
        "building input pipeline"
    );

    let mut records: RecordStream = Box::new(ShardRecords::new(files, options.num_epochs));
    if options.prefetch {
        records = Box::new(Prefetch::spawn(records, options.batch_size)?);
    }
    if let Some(limit) = options.truncated_records() {
        debug!(limit, "truncating records to a device-divisible batch count");
        records = Box::new(records.take(usize::try_from(limit).unwrap_or(usize::MAX)));
    }

    let mut batches: BatchStream = Box::new(Batcher::new(records, options.batch_size));
    if options.prefetch {
        batches = Box::new(Prefetch::spawn(batches, options.batch_size)?);
    }

    Ok(InputPipeline { batches })
}

/// Iterator over record batches. `None` means the data ran out.
pub struct InputPipeline {
    batches: BatchStream,
}

impl Iterator for InputPipeline {
    type Item = BenchResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.batches.next()
    }
}

/// Records of every shard, in order, for each epoch.
struct ShardRecords {
    files: Vec<PathBuf>,
    epochs: u64,
    epoch: u64,
    index: usize,
    current: Option<RecordReader<BufReader<File>>>,
    failed: bool,
}

impl ShardRecords {
    fn new(files: Vec<PathBuf>, epochs: u64) -> Self {
        Self { files, epochs, epoch: 0, index: 0, current: None, failed: false }
    }

    fn open_next(&mut self) -> Option<BenchResult<()>> {
        if self.index >= self.files.len() {
            self.epoch += 1;
            self.index = 0;
        }
        if self.epoch >= self.epochs || self.files.is_empty() {
            return None;
        }
        let path = &self.files[self.index];
        self.index += 1;
        Some(RecordReader::open(path).map(|reader| self.current = Some(reader)))
    }
}

impl Iterator for ShardRecords {
    type Item = BenchResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(reader) = self.current.as_mut() {
                match reader.next() {
                    Some(Ok(record)) => return Some(Ok(record)),
                    Some(Err(e)) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }
            match self.open_next()? {
                Ok(()) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Groups records into batches of at most `size`.
struct Batcher<I> {
    inner: I,
    size: usize,
    done: bool,
}

impl<I> Batcher<I> {
    fn new(inner: I, size: usize) -> Self {
        Self { inner, size, done: false }
    }
}

impl<I: Iterator<Item = BenchResult<Record>>> Iterator for Batcher<I> {
    type Item = BenchResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.inner.next() {
                Some(Ok(record)) => batch.push(record),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if batch.is_empty() { None } else { Some(Ok(batch)) }
    }
}

/// Runs an iterator on a background thread, buffering up to `buffer` items.
///
/// The producer stops once the consumer is dropped.
struct Prefetch<T> {
    rx: Receiver<T>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Prefetch<T> {
    fn spawn<I>(inner: I, buffer: usize) -> BenchResult<Self>
    where
        I: Iterator<Item = T> + Send + 'static,
    {
        let (tx, rx) = sync_channel(buffer.max(1));
        let handle = std::thread::Builder::new().name("resbench-prefetch".to_string()).spawn(move || {
            for item in inner {
                if tx.send(item).is_err() {
                    break;
                }
            }
        })?;
        Ok(Self { rx, handle: Some(handle) })
    }
}

impl<T> Iterator for Prefetch<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if let Ok(item) = self.rx.recv() {
            return Some(item);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(panic) = handle.join() {
                std::panic::resume_unwind(panic);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordWriter;
    use tempfile::TempDir;

    fn write_shard(path: &Path, count: usize) {
        let mut writer = RecordWriter::new(File::create(path).unwrap());
        for i in 0..count {
            writer.write_record(format!("{}-{i}", path.display()).as_bytes()).unwrap();
        }
        writer.into_inner().unwrap();
    }

    fn shards(temp: &TempDir, counts: &[usize]) -> Vec<PathBuf> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let path = temp.path().join(format!("shard-{i}"));
                write_shard(&path, n);
                path
            })
            .collect()
    }

    fn batch_sizes(options: &PipelineOptions, files: Vec<PathBuf>) -> Vec<usize> {
        pipeline_over(files, options).unwrap().map(|b| b.unwrap().len()).collect()
    }

    #[test]
    fn test_batches_keep_final_partial_batch() {
        let temp = TempDir::new().unwrap();
        let files = shards(&temp, &[3, 4]);
        let options = PipelineOptions { batch_size: 3, ..PipelineOptions::default() };
        assert_eq!(batch_sizes(&options, files), vec![3, 3, 1]);
    }

    #[test]
    fn test_repeat_epochs_with_prefetch() {
        let temp = TempDir::new().unwrap();
        let files = shards(&temp, &[2, 2]);
        let options = PipelineOptions { batch_size: 4, num_epochs: 3, prefetch: true, ..PipelineOptions::default() };
        assert_eq!(batch_sizes(&options, files), vec![4, 4, 4]);
    }

    #[test]
    fn test_record_order_follows_shards() {
        let temp = TempDir::new().unwrap();
        let files = shards(&temp, &[2, 1]);
        let options = PipelineOptions { batch_size: 8, ..PipelineOptions::default() };
        let batch = pipeline_over(files.clone(), &options).unwrap().next().unwrap().unwrap();
        let expected: Vec<Record> = vec![
            format!("{}-0", files[0].display()).into_bytes(),
            format!("{}-1", files[0].display()).into_bytes(),
            format!("{}-0", files[1].display()).into_bytes(),
        ];
        assert_eq!(batch, expected);
    }

    #[test]
    fn test_device_truncation() {
        let temp = TempDir::new().unwrap();
        let files = shards(&temp, &[10]);
        // 10 examples / 2 per batch = 5 batches, rounded down to 4 for 2 devices.
        let options = PipelineOptions {
            batch_size: 2,
            num_devices: Some(2),
            examples_per_epoch: 10,
            ..PipelineOptions::default()
        };
        assert_eq!(batch_sizes(&options, files), vec![2, 2, 2, 2]);
    }

    #[test]
    fn test_missing_shard_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut files = shards(&temp, &[1]);
        files.push(temp.path().join("missing"));
        let options = PipelineOptions { batch_size: 4, prefetch: true, ..PipelineOptions::default() };

        let mut pipeline = pipeline_over(files, &options).unwrap();
        let err = pipeline.next().unwrap().unwrap_err();
        assert!(matches!(err, BenchError::DataFile { .. }));
        assert!(pipeline.next().is_none());
    }

    #[test]
    fn test_missing_data_dir() {
        let temp = TempDir::new().unwrap();
        let err = input_pipeline(&temp.path().join("nope"), &PipelineOptions::default()).err().unwrap();
        assert!(matches!(err, BenchError::MissingDataDir(_)));
    }

    #[test]
    fn test_invalid_options() {
        let options = PipelineOptions { batch_size: 0, ..PipelineOptions::default() };
        assert!(matches!(pipeline_over(Vec::new(), &options).err().unwrap(), BenchError::InvalidConfig(_)));
    }

    #[test]
    fn test_epochs_for_steps() {
        assert_eq!(epochs_for_steps(32, 2000, NUM_TRAIN_IMAGES), 1);
        assert_eq!(epochs_for_steps(10, 3, 10), 3);
        assert_eq!(epochs_for_steps(10, 3, 7), 5);
        assert_eq!(epochs_for_steps(10, 0, 7), 1);
    }
}
