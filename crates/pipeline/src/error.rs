//! Pipeline Error Types
//!
//! Only run-level failures live here. Per-file problems (unreadable metadata,
//! exhausted upload retries) are recovered where they happen and surface in
//! the run [`Summary`](crate::Summary) instead.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A pipeline error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a run-level failure.
///
/// ### Operational Errors
/// - [`ErrorKind::Discovery`]
/// - [`ErrorKind::FolderCreation`]
/// - [`ErrorKind::Manifest`]
/// - [`ErrorKind::Staging`]
/// - [`ErrorKind::Cancelled`] - not really an error, the run was interrupted.
///
/// ### Dependency Errors
/// - [`ErrorKind::Configuration`]
/// - [`ErrorKind::Authentication`]
/// - [`ErrorKind::Project`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Settings could not be turned into a runnable pipeline.
    #[display("invalid configuration")]
    Configuration,
    /// The local root could not be walked.
    #[display("could not discover files under {}", _0.display())]
    Discovery(#[error(not(source))] PathBuf),
    /// Opening a session with the remote service failed.
    #[display("could not authenticate with the remote service")]
    Authentication,
    /// The target project could not be resolved.
    #[display("could not resolve project {_0}")]
    Project(#[error(not(source))] String),
    /// A remote container could not be created; fatal to the run.
    #[display("could not create remote folder {_0}")]
    FolderCreation(#[error(not(source))] String),
    /// A remote path was used before its parent was known, or cached twice.
    #[display("remote path cache invariant violated for {_0}")]
    CacheInvariant(#[error(not(source))] String),
    /// The per-run staging directory could not be created.
    #[display("could not prepare staging directory under {}", _0.display())]
    Staging(#[error(not(source))] PathBuf),
    /// The manifest file could not be created or written.
    #[display("could not write manifest {}", _0.display())]
    Manifest(#[error(not(source))] PathBuf),
    /// Upload workers went away before every job was handed over.
    #[display("upload queue closed unexpectedly")]
    Queue,
    /// An upload worker panicked; its reports are lost.
    #[display("upload worker stopped unexpectedly")]
    Worker,
    /// Cancellation was requested before uploading began.
    #[display("cancelled")]
    Cancelled,
}
