//! Discovery and metadata extraction.
//!
//! The local tree is walked first, then every file is handed to the
//! [`Extractor`] on a bounded pool of blocking workers. Results come back in
//! discovery order, and the phase only returns once every file has been
//! processed (or the run was cancelled).

mod walk;

use crate::cancel::Canceller;
use crate::error::{ErrorKind, Result};
use crate::record::FileRecord;
use exn::ResultExt;
use ferry_extract::Extractor;
use futures::StreamExt;
use std::path::{Path, PathBuf};

/// Progress is logged every time this many files remain.
const PROGRESS_INTERVAL: usize = 1000;

/// Find every non-empty file under `root` and extract its metadata.
///
/// Unreadable sub-directories and files whose metadata cannot be extracted
/// are logged and otherwise ignored; only an unreadable `root` is fatal. The
/// extraction pool size is `min(threads, file count)`.
///
/// # Errors
/// - [`ErrorKind::Discovery`] if `root` is not a readable directory, or an
///   extraction worker panicked.
/// - [`ErrorKind::Cancelled`] if cancellation was requested before every
///   file was processed.
pub async fn discover(
    root: &Path,
    threads: usize,
    extractor: &Extractor,
    canceller: &Canceller,
) -> Result<Vec<FileRecord>> {
    let metadata = tokio::fs::metadata(root).await.or_raise(|| ErrorKind::Discovery(root.to_path_buf()))?;
    if !metadata.is_dir() {
        exn::bail!(ErrorKind::Discovery(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    let mut entries = Box::pin(walk::walk(root));
    while let Some(entry) = entries.next().await {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => tracing::warn!(path = %e.path.display(), "Could not read: {}", e.source),
        }
    }
    tracing::info!(total = paths.len(), "Files discovered");

    let total = paths.len();
    let workers = threads.min(total).max(1);
    tracing::debug!(workers, "Extracting metadata");
    let records: Vec<_> = futures::stream::iter(paths.into_iter().enumerate())
        .map(|(index, path)| {
            let remaining = total - index;
            if remaining % PROGRESS_INTERVAL == 0 {
                tracing::info!(remaining, "Extracting metadata");
            }
            let extractor = extractor.clone();
            tokio::task::spawn_blocking(move || extract_record(&extractor, path))
        })
        .buffered(workers)
        .take_until(canceller.cancelled())
        .collect()
        .await;

    if canceller.is_cancelled() {
        exn::bail!(ErrorKind::Cancelled);
    }
    records
        .into_iter()
        .map(|joined| joined.or_raise(|| ErrorKind::Discovery(root.to_path_buf())))
        .collect()
}

fn extract_record(extractor: &Extractor, path: PathBuf) -> FileRecord {
    let record = FileRecord::new(path);
    match extractor.extract(record.full_path(), record.original_name()) {
        Ok(Some(extraction)) => record.with_extraction(extraction),
        Ok(None) => record,
        Err(e) => {
            tracing::error!(path = %record.full_path().display(), "Could not extract metadata: {e}");
            record
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_extract::reader::StaticReader;
    use std::sync::Arc;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"contents").unwrap();
        path
    }

    #[tokio::test]
    async fn test_records_in_discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a/scan.dcm");
        touch(dir.path(), "a/notes.txt");
        let b = touch(dir.path(), "b/scan-2.dcm");
        std::fs::write(dir.path().join("empty.dcm"), b"").unwrap();
        let reader = StaticReader::default()
            .with_dataset(&a, [("PatientID", "P1"), ("StudyDate", "20200101"), ("Modality", "CT")])
            .with_dataset(&b, [("PatientID", "P-2"), ("StudyDate", "20210202")]);
        let extractor = Extractor::new(Arc::new(reader));

        let records = discover(dir.path(), 4, &extractor, &Canceller::new()).await.unwrap();
        let names: Vec<_> = records.iter().map(FileRecord::computed_name).collect();
        assert_eq!(names, vec!["notes.txt", "P1_20200101_scan.dcm", "P_2_20210202_scan_2.dcm"]);
        assert_eq!(records[1].annotations().len(), 3);
        assert!(records[0].annotations().is_empty());
    }

    #[tokio::test]
    async fn test_bad_file_keeps_original_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "corrupt.dcm");
        let extractor = Extractor::new(Arc::new(StaticReader::default()));
        let records = discover(dir.path(), 2, &extractor, &Canceller::new()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].computed_name(), "corrupt.dcm");
        assert!(records[0].annotations().is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Extractor::new(Arc::new(StaticReader::default()));
        let err = discover(&dir.path().join("missing"), 2, &extractor, &Canceller::new()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Discovery(_)));
    }

    #[tokio::test]
    async fn test_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Extractor::new(Arc::new(StaticReader::default()));
        let records = discover(dir.path(), 8, &extractor, &Canceller::new()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_discovery() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.txt");
        let extractor = Extractor::new(Arc::new(StaticReader::default()));
        let canceller = Canceller::new();
        canceller.request();
        let err = discover(dir.path(), 2, &extractor, &canceller).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Cancelled));
    }
}
