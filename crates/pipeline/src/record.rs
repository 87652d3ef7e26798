use ferry_extract::Extraction;
use ferry_extract::models::Annotations;
use std::path::{Path, PathBuf};

/// One discovered file on its way to the remote store.
///
/// The computed name starts out as the original file name, is set at most
/// once by extraction, and is rewritten at most once more by deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    source_dir: PathBuf,
    original_name: String,
    full_path: PathBuf,
    computed_name: String,
    annotations: Annotations,
    renamed: bool,
}

impl FileRecord {
    /// Create a record for the file at `full_path`.
    ///
    /// Non UTF-8 file names are converted lossily.
    pub fn new(full_path: impl Into<PathBuf>) -> Self {
        let full_path = full_path.into();
        let original_name = full_path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        let source_dir = full_path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            source_dir,
            computed_name: original_name.clone(),
            original_name,
            full_path,
            annotations: Annotations::new(),
            renamed: false,
        }
    }

    /// Apply the result of metadata extraction.
    pub fn with_extraction(mut self, extraction: Extraction) -> Self {
        self.computed_name = extraction.computed_name;
        self.annotations = extraction.annotations;
        self
    }

    /// Replace the computed name to make it unique.
    pub(crate) fn rename(&mut self, name: String) {
        debug_assert!(!self.renamed, "record {} renamed twice", self.full_path.display());
        self.computed_name = name;
        self.renamed = true;
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn computed_name(&self) -> &str {
        &self.computed_name
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Log where this file is going, plus every annotation when `verbose`.
    pub(crate) fn log_destination(&self, remote: &str, verbose: bool) {
        tracing::info!(source = %self.full_path.display(), remote, "Processing file");
        if verbose {
            for (key, value) in &self.annotations {
                tracing::info!(remote, "{key}: {value}");
            }
        }
    }
}
