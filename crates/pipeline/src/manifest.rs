//! Tab-separated upload plan, written instead of uploading.
//!
//! Columns are `path`, `parent`, `name`, `forceVersion`, then every
//! annotation field in schema order. Absent annotations are left empty.

use crate::error::{ErrorKind, Result};
use crate::record::FileRecord;
use exn::ResultExt;
use ferry_extract::annotation_field_names;
use ferry_remote::Container;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const FIXED_COLUMNS: [&str; 4] = ["path", "parent", "name", "forceVersion"];
const FORCE_VERSION: &str = "True";

/// The manifest header row.
pub fn header() -> Vec<&'static str> {
    FIXED_COLUMNS.into_iter().chain(annotation_field_names()).collect()
}

pub struct ManifestWriter<W: Write> {
    writer: csv::Writer<W>,
    /// Used in error messages only.
    path: PathBuf,
    rows: usize,
}

impl ManifestWriter<File> {
    /// Create (or truncate) the manifest at `path` and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).or_raise(|| ErrorKind::Manifest(path.to_path_buf()))?;
        Self::new(file, path)
    }
}

impl<W: Write> ManifestWriter<W> {
    pub fn new(inner: W, path: &Path) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(inner);
        writer.write_record(header()).or_raise(|| ErrorKind::Manifest(path.to_path_buf()))?;
        Ok(Self { writer, path: path.to_path_buf(), rows: 0 })
    }

    /// Write the row for `record`, destined for `parent`.
    pub fn write(&mut self, record: &FileRecord, parent: &Container) -> Result<()> {
        let annotations = record.annotations();
        let mut row = vec![
            record.full_path().to_string_lossy().into_owned(),
            parent.id.clone(),
            record.computed_name().to_string(),
            FORCE_VERSION.to_string(),
        ];
        row.extend(annotation_field_names().map(|field| annotations.get(field).map(ToString::to_string).unwrap_or_default()));
        self.writer.write_record(&row).or_raise(|| ErrorKind::Manifest(self.path.clone()))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush everything and return the number of rows written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush().or_raise(|| ErrorKind::Manifest(self.path.clone()))?;
        Ok(self.rows)
    }
}
