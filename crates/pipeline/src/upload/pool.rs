use crate::error::{ErrorKind, Result};
use crate::upload::job::{JobReport, UploadJob, UploadOutcome};
use crate::upload::retry::RetryPolicy;
use crate::upload::staging::Staging;
use crate::upload::worker::{Shared, Worker};
use exn::ResultExt;
use ferry_remote::{Credentials, RemoteService};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Everything an [`UploadPool`] needs besides the remote service.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub size: usize,
    /// Parent of the per-run staging directory.
    pub staging_dir: PathBuf,
    pub policy: RetryPolicy,
    pub dry_run: bool,
    pub verbose: bool,
}

/// A fixed set of upload workers draining one shared FIFO queue.
///
/// Each worker authenticates once when the pool starts and keeps its
/// session until it exits. Jobs can be enqueued while workers are already
/// busy; [`finish`](Self::finish) closes the queue and waits for every
/// worker, so nothing is still in flight when it returns.
pub struct UploadPool {
    sender: UnboundedSender<UploadJob>,
    shared: Arc<Shared>,
    workers: JoinSet<Vec<JobReport>>,
    token: CancellationToken,
}

impl UploadPool {
    /// Authenticate `settings.size` sessions and start one worker per session.
    ///
    /// `token` is observed by every worker; the pool also stops on its own
    /// [`abort`](Self::abort) without cancelling `token`.
    ///
    /// # Errors
    /// - [`ErrorKind::Staging`] if the staging directory cannot be created.
    /// - [`ErrorKind::Authentication`] if any session is refused.
    pub async fn start(
        service: &dyn RemoteService,
        credentials: &Credentials,
        settings: PoolSettings,
        token: &CancellationToken,
    ) -> Result<Self> {
        let staging = Staging::new(&settings.staging_dir)?;
        let size = settings.size.max(1);
        let sessions = futures::future::try_join_all((0..size).map(|_| service.authenticate(credentials)))
            .await
            .or_raise(|| ErrorKind::Authentication)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let token = token.child_token();
        let shared = Arc::new(Shared {
            queue: Mutex::new(receiver),
            staging,
            policy: settings.policy,
            token: token.clone(),
            dry_run: settings.dry_run,
            verbose: settings.verbose,
            remaining: AtomicUsize::new(0),
        });
        let mut workers = JoinSet::new();
        for (id, session) in sessions.into_iter().enumerate() {
            let worker = Worker { id, session, shared: Arc::clone(&shared) };
            workers.spawn(worker.run());
        }
        tracing::info!(workers = size, service = service.name(), "Upload workers started");
        Ok(Self { sender, shared, workers, token })
    }

    /// Hand a job to the workers.
    pub fn enqueue(&self, job: UploadJob) -> Result<()> {
        self.shared.remaining.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(job).is_err() {
            self.shared.remaining.fetch_sub(1, Ordering::SeqCst);
            exn::bail!(ErrorKind::Queue);
        }
        Ok(())
    }

    /// Jobs enqueued and not yet finished.
    pub fn remaining(&self) -> usize {
        self.shared.remaining.load(Ordering::SeqCst)
    }

    /// Close the queue, wait for every worker, and report every job.
    ///
    /// Jobs still queued when the workers stopped (because of cancellation)
    /// are reported as [`UploadOutcome::Cancelled`].
    pub async fn finish(self) -> Result<Vec<JobReport>> {
        let Self { sender, shared, mut workers, .. } = self;
        drop(sender);

        let mut reports = Vec::new();
        let mut lost = false;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_reports) => reports.extend(worker_reports),
                Err(e) => {
                    tracing::error!("Upload worker failed: {e}");
                    lost = true;
                },
            }
        }

        let mut queue = shared.queue.lock().await;
        queue.close();
        while let Ok(job) = queue.try_recv() {
            shared.remaining.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(source = %job.record.full_path().display(), "Skipped");
            reports.push(JobReport::new(&job, UploadOutcome::Cancelled { attempts: 0 }));
        }
        if lost {
            exn::bail!(ErrorKind::Worker);
        }
        Ok(reports)
    }

    /// Stop taking jobs, let in-flight ones complete, and report.
    pub async fn abort(self) -> Result<Vec<JobReport>> {
        self.token.cancel();
        self.finish().await
    }
}
