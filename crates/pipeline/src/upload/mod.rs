//! Concurrent, retrying upload of staged files.
//!
//! The coordinator enqueues [`UploadJob`]s into an [`UploadPool`]; each
//! worker stages the file under its computed name, stores it (retrying per
//! [`RetryPolicy`]) and removes the staged copy, then reports an
//! [`UploadOutcome`]. A failed file never stops its siblings.

mod job;
mod pool;
mod retry;
mod staging;
mod worker;

pub use self::job::{JobReport, UploadJob, UploadOutcome};
pub use self::pool::{PoolSettings, UploadPool};
pub use self::retry::RetryPolicy;
pub use self::staging::{StagedFile, Staging};
