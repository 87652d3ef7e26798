use crate::upload::job::{JobReport, UploadJob, UploadOutcome};
use crate::upload::retry::RetryPolicy;
use crate::upload::staging::Staging;
use ferry_remote::{Descriptor, Session, StoreOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

/// State every worker of one pool shares.
pub(crate) struct Shared {
    pub queue: Mutex<UnboundedReceiver<UploadJob>>,
    pub staging: Staging,
    pub policy: RetryPolicy,
    pub token: CancellationToken,
    pub dry_run: bool,
    pub verbose: bool,
    /// Jobs enqueued but not yet reported.
    pub remaining: AtomicUsize,
}

/// Dequeue under the lock; processing happens after it is released.
///
/// Borrows only `shared`: a session is `Send` but not `Sync`.
async fn next_job(shared: &Shared) -> Option<UploadJob> {
    let mut queue = shared.queue.lock().await;
    if shared.token.is_cancelled() {
        return None;
    }
    tokio::select! {
        biased;
        _ = shared.token.cancelled() => None,
        job = queue.recv() => job,
    }
}

/// An upload worker and the session it owns for its whole life.
pub(crate) struct Worker {
    pub id: usize,
    pub session: Box<dyn Session>,
    pub shared: std::sync::Arc<Shared>,
}

impl Worker {
    /// Take jobs until the queue is closed and empty, or cancellation is
    /// requested.
    pub async fn run(mut self) -> Vec<JobReport> {
        let mut reports = Vec::new();
        while let Some(job) = next_job(&self.shared).await {
            let outcome = self.process(&job).await;
            let remaining = self.shared.remaining.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
            tracing::debug!(worker = self.id, remaining, "Job finished");
            reports.push(JobReport::new(&job, outcome));
        }
        tracing::debug!(worker = self.id, jobs = reports.len(), "Worker exiting");
        reports
    }

    async fn process(&mut self, job: &UploadJob) -> UploadOutcome {
        let shared = &self.shared;
        let source = job.record.full_path();
        let name = job.record.computed_name();
        let remote = format!("{}/{name}", job.target);
        job.record.log_destination(&remote, shared.verbose);

        if shared.token.is_cancelled() {
            return UploadOutcome::Cancelled { attempts: 0 };
        }
        // Removed when dropped, whichever way this function returns.
        let staged = match shared.staging.stage(source, name).await {
            Ok(staged) => staged,
            Err(e) => {
                tracing::error!(source = %source.display(), remote = %remote, "Could not stage file: {e}");
                return UploadOutcome::Failed { reason: format!("staging failed: {e}"), attempts: 0 };
            },
        };
        if shared.dry_run {
            return UploadOutcome::DryRun;
        }

        let mut attempts = 0;
        loop {
            if shared.token.is_cancelled() {
                return UploadOutcome::Cancelled { attempts };
            }
            attempts += 1;
            let descriptor = Descriptor::File {
                path: staged.path().to_path_buf(),
                name: name.to_string(),
                annotations: job.record.annotations().clone(),
            };
            match self.session.store(descriptor, &job.parent, StoreOptions::default()).await {
                Ok(handle) => {
                    tracing::debug!(remote = %remote, id = %handle.id, version = handle.version, attempts, "File uploaded");
                    return UploadOutcome::Uploaded { handle, attempts };
                },
                Err(e) => {
                    tracing::error!(source = %source.display(), remote = %remote, attempt = attempts, "Error uploading file: {e}");
                    if !e.is_retryable() || !shared.policy.allows_another(attempts) {
                        tracing::error!(source = %source.display(), remote = %remote, attempts, "Failed to upload file");
                        return UploadOutcome::Failed { reason: e.to_string(), attempts };
                    }
                    tracing::info!(source = %source.display(), "Retrying");
                    if !shared.policy.pause(&shared.token).await {
                        return UploadOutcome::Cancelled { attempts };
                    }
                },
            }
        }
    }
}
