//! Memoized remote containers, keyed by logical path.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use ferry_remote::{Container, Descriptor, RemotePath, Session, StoreOptions};
use std::collections::HashMap;

/// Remote containers created (or simulated) during this run.
///
/// Entries are immutable once inserted. A path can only be inserted once,
/// and only after its parent is present, so every container is known to
/// have been created strictly top-down.
#[derive(Debug)]
pub struct RemotePathCache {
    entries: HashMap<RemotePath, Container>,
}

impl RemotePathCache {
    /// Start a cache holding only the project root.
    pub fn new(project: Container) -> Self {
        let root = RemotePath::root(project.id.clone());
        Self { entries: HashMap::from([(root, project)]) }
    }

    pub fn get(&self, path: &RemotePath) -> Option<&Container> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &RemotePath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record the container at `path`.
    ///
    /// # Errors
    /// [`ErrorKind::CacheInvariant`] if `path` is already cached or its
    /// parent is not.
    pub fn insert(&mut self, path: RemotePath, container: Container) -> Result<()> {
        let parent_known = path.parent().is_some_and(|parent| self.entries.contains_key(&parent));
        if !parent_known || self.entries.contains_key(&path) {
            exn::bail!(ErrorKind::CacheInvariant(path.to_string()));
        }
        self.entries.insert(path, container);
        Ok(())
    }

    /// Make sure every segment of `path` exists remotely, creating missing
    /// ones from the top down, and return the container for `path` itself.
    ///
    /// In a dry run nothing is sent to `session`: a placeholder container is
    /// cached for every missing segment instead.
    ///
    /// # Errors
    /// - [`ErrorKind::FolderCreation`] if the remote service refused a
    ///   folder. Not retried.
    /// - [`ErrorKind::CacheInvariant`] if `path` belongs to another project.
    pub async fn materialize(&mut self, session: &mut dyn Session, path: &RemotePath, dry_run: bool) -> Result<Container> {
        for segment in path.lineage() {
            if self.contains(&segment) {
                continue;
            }
            let parent = segment
                .parent()
                .and_then(|parent| self.get(&parent).cloned())
                .ok_or_raise(|| ErrorKind::CacheInvariant(segment.to_string()))?;
            tracing::info!(remote = %segment, "Processing folder");
            let container = if dry_run {
                Container::placeholder(segment.name())
            } else {
                session
                    .store(Descriptor::folder(segment.name()), &parent, StoreOptions::default())
                    .await
                    .or_raise(|| ErrorKind::FolderCreation(segment.to_string()))?
                    .into()
            };
            tracing::debug!(remote = %segment, id = %container.id, "Folder ready");
            self.insert(segment, container)?;
        }
        self.get(path).cloned().ok_or_raise(|| ErrorKind::CacheInvariant(path.to_string()))
    }
}
