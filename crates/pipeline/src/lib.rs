//! The ferry ingestion pipeline.
//!
//! A run has two phases that never overlap:
//!
//! 1. [Discovery](discover) walks the local tree and extracts metadata on a
//!    bounded worker pool, then every record is [deduplicated](deduplicate)
//!    and [sharded](shard).
//! 2. For every shard, the [`RemotePathCache`] creates the destination
//!    container (top-down, at most once per logical path), then the shard's
//!    files are either queued on the [`UploadPool`] or written to a
//!    [`ManifestWriter`].
//!
//! [`run`] drives both phases. Cancellation is cooperative and flows from a
//! single [`Canceller`] into every worker.

mod cache;
mod cancel;
mod context;
mod coordinator;
mod dedup;
mod discover;
pub mod error;
mod manifest;
mod record;
mod shard;
pub mod upload;

pub use crate::cache::RemotePathCache;
pub use crate::cancel::{Canceller, PipelineState};
pub use crate::context::Context;
pub use crate::coordinator::{Summary, run};
pub use crate::dedup::deduplicate;
pub use crate::discover::discover;
pub use crate::manifest::{ManifestWriter, header as manifest_header};
pub use crate::record::FileRecord;
pub use crate::shard::{Shard, folder_name, shard};
pub use crate::upload::UploadPool;
pub use ferry_config::MAX_CAPACITY;
