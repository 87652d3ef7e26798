//! Drives one run from discovery to the last upload (or manifest row).

use crate::cache::RemotePathCache;
use crate::cancel::Canceller;
use crate::context::Context;
use crate::dedup::deduplicate;
use crate::discover::discover;
use crate::error::{ErrorKind, Result};
use crate::manifest::ManifestWriter;
use crate::shard::{Shard, shard};
use crate::upload::{JobReport, PoolSettings, UploadJob, UploadOutcome, UploadPool};
use exn::ResultExt;
use ferry_extract::Extractor;
use ferry_remote::{RemotePath, RemoteService, Session};
use std::path::PathBuf;

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Files discovered (after skipping empty ones).
    pub total: usize,
    /// One report per job that reached the upload pool.
    pub reports: Vec<JobReport>,
    /// Rows written; `None` unless the run only wrote a manifest.
    pub manifest_rows: Option<usize>,
    pub cancelled: bool,
}

impl Summary {
    pub fn uploaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, UploadOutcome::Uploaded { .. }))
    }

    /// Files that were staged but not sent because of a dry run.
    pub fn simulated(&self) -> usize {
        self.count(|outcome| matches!(outcome, UploadOutcome::DryRun))
    }

    /// Source paths of every file that ended in a terminal failure.
    pub fn failed(&self) -> Vec<&PathBuf> {
        self.reports
            .iter()
            .filter(|report| matches!(report.outcome, UploadOutcome::Failed { .. }))
            .map(|report| &report.source)
            .collect()
    }

    /// Files never attempted, or abandoned, because the run was cancelled.
    pub fn skipped(&self) -> usize {
        let cancelled = self.count(|outcome| matches!(outcome, UploadOutcome::Cancelled { .. }));
        let never_queued = match self.manifest_rows {
            Some(_) => 0,
            None => self.total.saturating_sub(self.reports.len()),
        };
        cancelled + never_queued
    }

    /// Process exit status: 130 when cancelled, 2 when any file failed.
    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            130
        } else if !self.failed().is_empty() {
            2
        } else {
            0
        }
    }

    pub fn log(&self) {
        tracing::info!(
            total = self.total,
            uploaded = self.uploaded(),
            simulated = self.simulated(),
            failed = self.failed().len(),
            skipped = self.skipped(),
            "Run finished"
        );
        for source in self.failed() {
            tracing::error!(source = %source.display(), "Not uploaded");
        }
        if self.cancelled {
            tracing::warn!("Run was cancelled before every file was processed");
        }
    }

    fn count(&self, predicate: impl Fn(&UploadOutcome) -> bool) -> usize {
        self.reports.iter().filter(|report| predicate(&report.outcome)).count()
    }
}

/// Run the whole pipeline.
///
/// Discovery and extraction finish before anything is sent. Files are then
/// deduplicated and sharded; every shard's container is created (top-down,
/// once per logical path) before its files are queued. In manifest mode the
/// containers are still created, so rows carry real parent identifiers, but
/// nothing is uploaded.
///
/// Per-file upload failures do not fail the run; they are listed in the
/// returned [`Summary`].
///
/// # Errors
/// - [`ErrorKind::Authentication`] / [`ErrorKind::Project`] if the remote
///   project cannot be reached.
/// - [`ErrorKind::Discovery`] if the local root cannot be walked.
/// - [`ErrorKind::FolderCreation`] if a container cannot be created. Uploads
///   already queued are allowed to finish first.
/// - [`ErrorKind::Manifest`] if the manifest cannot be written.
/// - [`ErrorKind::Cancelled`] if cancellation arrived before uploading began.
pub async fn run(ctx: &Context, service: &dyn RemoteService, extractor: &Extractor, canceller: &Canceller) -> Result<Summary> {
    if ctx.dry_run {
        tracing::warn!("Dry Run: nothing will be created or uploaded");
    }
    let mut session = service.authenticate(&ctx.credentials).await.or_raise(|| ErrorKind::Authentication)?;
    let project = session
        .get_project(&ctx.project)
        .await
        .or_raise(|| ErrorKind::Project(ctx.project.clone()))?;
    let base = RemotePath::root(project.id.clone())
        .join_all(&ctx.remote_prefix)
        .or_raise(|| ErrorKind::Configuration)?;
    tracing::info!(name = %project.name, id = %project.id, "Project");
    tracing::info!(path = %ctx.local_root.display(), "Local directory");
    tracing::info!(remote = %base, "Remote destination");
    tracing::info!(threads = ctx.threads, "Max threads");

    let mut records = discover(&ctx.local_root, ctx.threads, extractor, canceller).await?;
    let renamed = deduplicate(&mut records);
    if renamed > 0 {
        tracing::info!(renamed, "Renamed files with colliding names");
    }
    let total = records.len();
    let shards = shard(records, ctx.max_capacity);
    tracing::info!(total, "Total files");
    tracing::info!(total = shards.len(), "Total shards");
    if canceller.is_cancelled() {
        exn::bail!(ErrorKind::Cancelled);
    }

    let mut cache = RemotePathCache::new(project);
    let summary = if ctx.manifest_only {
        let manifest_rows = write_manifest(ctx, session.as_mut(), &mut cache, &base, &shards, canceller).await?;
        Summary {
            total,
            manifest_rows: Some(manifest_rows),
            ..Summary::default()
        }
    } else if total == 0 {
        tracing::info!("Nothing to upload");
        Summary::default()
    } else {
        let reports = upload(ctx, service, session.as_mut(), &mut cache, &base, shards, canceller).await?;
        Summary {
            total,
            reports,
            manifest_rows: None,
            cancelled: canceller.is_cancelled(),
        }
    };
    Ok(summary)
}

/// Logical path of the container `shard` is uploaded into.
fn shard_path(base: &RemotePath, shard: &Shard) -> Result<RemotePath> {
    match &shard.folder {
        Some(folder) => base.join(folder).or_raise(|| ErrorKind::FolderCreation(format!("{base}/{folder}"))),
        None => Ok(base.clone()),
    }
}

async fn write_manifest(
    ctx: &Context,
    session: &mut dyn Session,
    cache: &mut RemotePathCache,
    base: &RemotePath,
    shards: &[Shard],
    canceller: &Canceller,
) -> Result<usize> {
    let mut writer = ManifestWriter::create(&ctx.manifest_path)?;
    for shard in shards {
        if canceller.is_cancelled() {
            exn::bail!(ErrorKind::Cancelled);
        }
        let target = shard_path(base, shard)?;
        let parent = cache.materialize(session, &target, ctx.dry_run).await?;
        for record in &shard.records {
            record.log_destination(&format!("{target}/{}", record.computed_name()), ctx.verbose);
            writer.write(record, &parent)?;
        }
    }
    let rows = writer.finish()?;
    tracing::info!(path = %ctx.manifest_path.display(), rows, "Manifest written");
    Ok(rows)
}

async fn upload(
    ctx: &Context,
    service: &dyn RemoteService,
    session: &mut dyn Session,
    cache: &mut RemotePathCache,
    base: &RemotePath,
    shards: Vec<Shard>,
    canceller: &Canceller,
) -> Result<Vec<JobReport>> {
    let total: usize = shards.iter().map(|shard| shard.records.len()).sum();
    let settings = PoolSettings {
        size: ctx.threads.min(total),
        staging_dir: ctx.staging_dir.clone(),
        policy: ctx.retry,
        dry_run: ctx.dry_run,
        verbose: ctx.verbose,
    };
    let pool = UploadPool::start(service, &ctx.credentials, settings, canceller.token()).await?;

    let mut queued = 0;
    for shard in shards {
        if canceller.is_cancelled() {
            tracing::warn!(queued, "Stopped queueing uploads");
            break;
        }
        let parent = match shard_path(base, &shard) {
            Ok(target) => cache.materialize(session, &target, ctx.dry_run).await.map(|parent| (target, parent)),
            Err(e) => Err(e),
        };
        let (target, parent) = match parent {
            Ok(resolved) => resolved,
            Err(e) => {
                // In-flight uploads finish; nothing else is started.
                if let Err(abort) = pool.abort().await {
                    tracing::error!("Upload pool did not shut down cleanly: {abort}");
                }
                return Err(e);
            },
        };
        for record in shard.records {
            pool.enqueue(UploadJob { target: target.clone(), parent: parent.clone(), record })?;
            queued += 1;
        }
        tracing::debug!(queued, remaining = pool.remaining(), "Shard queued");
    }
    pool.finish().await
}
