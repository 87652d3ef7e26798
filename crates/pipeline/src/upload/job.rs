use crate::record::FileRecord;
use ferry_remote::{Container, Handle, RemotePath};
use std::path::PathBuf;

/// One file to upload into an already materialized container.
#[derive(Debug, Clone)]
pub struct UploadJob {
    /// Logical path of the destination container.
    pub target: RemotePath,
    /// The destination container, resolved from the path cache.
    pub parent: Container,
    pub record: FileRecord,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { handle: Handle, attempts: u32 },
    /// Staged and logged, but not sent.
    DryRun,
    /// Terminal failure for this file; siblings are unaffected.
    Failed { reason: String, attempts: u32 },
    /// Stopped (or never started) because the run was cancelled.
    Cancelled { attempts: u32 },
}

impl UploadOutcome {
    /// Number of store calls made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Uploaded { attempts, .. } | Self::Failed { attempts, .. } | Self::Cancelled { attempts } => *attempts,
            Self::DryRun => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Uploaded { .. } | Self::DryRun)
    }
}

/// What happened to one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub source: PathBuf,
    /// Full logical path of the uploaded file.
    pub remote: String,
    pub outcome: UploadOutcome,
}

impl JobReport {
    pub(crate) fn new(job: &UploadJob, outcome: UploadOutcome) -> Self {
        Self {
            source: job.record.full_path().to_path_buf(),
            remote: format!("{}/{}", job.target, job.record.computed_name()),
            outcome,
        }
    }
}
