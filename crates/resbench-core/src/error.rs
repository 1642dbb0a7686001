use std::path::PathBuf;
use thiserror::Error;

pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("cannot find the log file: {}", .0.display())]
    MissingLog(PathBuf),

    #[error("cannot find the throughput in the training log: {}", .0.display())]
    MetricNotFound(PathBuf),

    #[error("malformed global_step/sec value {value:?} in {}:{line}", .path.display())]
    MalformedRate { path: PathBuf, line: usize, value: String },

    #[error("data directory does not exist: {}", .0.display())]
    MissingDataDir(PathBuf),

    #[error("cannot read data file {}: {source}", .path.display())]
    DataFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record in {} at offset {offset}: {reason}", .path.display())]
    CorruptRecord { path: PathBuf, offset: u64, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
