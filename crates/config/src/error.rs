use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration problems. All of them are fatal before any work starts.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    #[display("unsupported configuration file format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// Sources could not be merged or deserialized.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    #[display("project identifier must not be empty")]
    MissingProject,
    #[display("max capacity {requested} exceeds the hard ceiling of {max}")]
    CapacityExceeded { requested: usize, max: usize },
    #[display("max capacity must be at least 1")]
    ZeroCapacity,
    #[display("thread count must be at least 1")]
    ZeroThreads,
    #[display("retry policy must allow at least 1 attempt")]
    ZeroAttempts,
}
