use std::path::{Path, PathBuf};

/// Number of training shards in the data directory.
pub const NUM_TRAIN_FILES: usize = 1024;

/// Training examples in one ImageNet epoch.
pub const NUM_TRAIN_IMAGES: u64 = 1_281_167;

/// Path of training shard `index`, e.g. `train-00007-of-01024`.
#[must_use]
pub fn shard_filename(data_dir: &Path, index: usize) -> PathBuf {
    data_dir.join(format!("train-{index:05}-of-{NUM_TRAIN_FILES:05}"))
}

/// All training shard paths in order.
#[must_use]
pub fn shard_filenames(data_dir: &Path) -> Vec<PathBuf> {
    (0..NUM_TRAIN_FILES).map(|i| shard_filename(data_dir, i)).collect()
}
