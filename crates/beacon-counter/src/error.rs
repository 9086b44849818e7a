use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing the persisted event counter.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The counter file exists but could not be read.
    #[error("failed to read counter file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The counter file does not hold a decimal integer.
    #[error("counter file {} holds invalid contents: {contents:?}", .path.display())]
    Parse { path: PathBuf, contents: String },

    /// The new value could not be written.
    #[error("failed to write counter file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Incrementing the counter would exceed `u64::MAX`.
    #[error("event counter overflow")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
