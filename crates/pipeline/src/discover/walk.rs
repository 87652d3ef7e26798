use async_stream::stream;
use futures::Stream;
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// A directory or entry that could not be read during the walk.
#[derive(Debug)]
pub struct WalkError {
    pub path: PathBuf,
    pub source: IoError,
}

/// Stream every non-empty regular file under `root`, in a stable order.
///
/// Within each directory, entries are visited by name; the files of a
/// directory come before the contents of its sub-directories. Empty files
/// are skipped, as are symbolic links to directories (to avoid cycles).
/// Unreadable entries are yielded as errors and the walk carries on.
pub(crate) fn walk(root: &Path) -> impl Stream<Item = Result<PathBuf, WalkError>> + '_ {
    let mut stack = vec![root.to_path_buf()];
    stream! {
        while let Some(current) = stack.pop() {
            let entries = match read_sorted(&current).await {
                Ok(entries) => entries,
                Err(source) => {
                    yield Err(WalkError { path: current, source });
                    continue;
                },
            };
            let mut descend = Vec::new();
            for path in entries {
                match classify(&path).await {
                    Ok(WalkEntry::File(file)) => yield Ok(file),
                    Ok(WalkEntry::Descend(dir)) => descend.push(dir),
                    Ok(WalkEntry::Skip) => {},
                    Err(source) => yield Err(WalkError { path, source }),
                }
            }
            // Popped in name order.
            stack.extend(descend.into_iter().rev());
        }
    }
}

async fn read_sorted(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    let mut entries = fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

async fn classify(path: &Path) -> Result<WalkEntry, IoError> {
    let link = fs::symlink_metadata(path).await?;
    let metadata = if link.file_type().is_symlink() {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_dir() => {
                tracing::debug!(path = %path.display(), "Skipping symlinked directory");
                return Ok(WalkEntry::Skip);
            },
            Ok(metadata) => metadata,
            // Dangling link.
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(WalkEntry::Skip),
            Err(e) => return Err(e),
        }
    } else {
        link
    };
    if metadata.is_dir() {
        return Ok(WalkEntry::Descend(path.to_path_buf()));
    }
    if !metadata.is_file() {
        return Ok(WalkEntry::Skip);
    }
    if metadata.len() == 0 {
        tracing::debug!(path = %path.display(), "Skipping empty file");
        return Ok(WalkEntry::Skip);
    }
    Ok(WalkEntry::File(path.to_path_buf()))
}
