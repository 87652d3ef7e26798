//! Transient local copies of files under their upload name.
//!
//! The remote display name is taken from the uploaded file's name, so every
//! file is first copied into a per-run directory under its computed name.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use ferry_remote::path::validate_name;
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Per-run staging directory, removed (with anything left in it) on drop.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
}

impl Staging {
    /// Create a fresh staging directory under `base`.
    pub fn new(base: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("ferry-")
            .tempdir_in(base)
            .or_raise(|| ErrorKind::Staging(base.to_path_buf()))?;
        tracing::debug!(dir = %dir.path().display(), "Staging directory created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy `source` into staging as `name`.
    ///
    /// The returned guard deletes the copy when dropped, including when the
    /// copy itself fails part-way. `name` must be a single remote name
    /// segment; anything else is rejected before touching the filesystem.
    pub async fn stage(&self, source: &Path, name: &str) -> std::result::Result<StagedFile, IoError> {
        if validate_name(name).is_err() {
            return Err(IoError::new(IoErrorKind::InvalidInput, format!("invalid file name {name:?}")));
        }
        let staged = StagedFile { path: self.dir.path().join(name) };
        tokio::fs::copy(source, &staged.path).await?;
        Ok(staged)
    }
}

/// A staged copy, deleted on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {},
            Err(e) if e.kind() == IoErrorKind::NotFound => {},
            Err(e) => tracing::warn!(path = %self.path.display(), "Could not remove staged file: {e}"),
        }
    }
}
