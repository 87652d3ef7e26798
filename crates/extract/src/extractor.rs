//! Computed names and typed annotations for recognised files.

use crate::consts::{ANNOTATION_FIELDS, PATIENT_ID, RECOGNISED_EXTENSION, STUDY_DATE};
use crate::error::{ErrorKind, Result};
use crate::models::Annotations;
use crate::reader::{Dataset, ReaderHandle};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use tracing::instrument;

/// What extraction learned about one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Display name the file should be uploaded under.
    pub computed_name: String,
    pub annotations: Annotations,
}

/// Turns recognised files into an [`Extraction`].
#[derive(Clone)]
pub struct Extractor {
    reader: ReaderHandle,
}
impl Extractor {
    pub fn new(reader: ReaderHandle) -> Self {
        Self { reader }
    }

    /// Whether `file_name` carries the recognised extension (any case).
    ///
    /// # Examples
    ///
    /// ```
    /// use ferry_extract::Extractor;
    /// assert!(Extractor::is_recognised("scan.dcm"));
    /// assert!(Extractor::is_recognised("SCAN.DCM"));
    /// assert!(!Extractor::is_recognised("notes.txt"));
    /// assert!(!Extractor::is_recognised("dcm"));
    /// ```
    pub fn is_recognised(file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(RECOGNISED_EXTENSION))
    }

    /// Extract the computed name and annotations of a recognised file.
    ///
    /// Returns `Ok(None)` for files that are not in the recognised format;
    /// those keep their original name and carry no annotations.
    ///
    /// `-`, `/` and NUL in the computed name become `_`, so it is always a
    /// single path segment.
    ///
    /// Individual annotation fields that are absent or fail coercion are
    /// omitted (with a warning). The name components `PatientID` and
    /// `StudyDate` are mandatory: if either is missing the whole extraction
    /// fails.
    ///
    /// # Errors
    /// - [`ErrorKind::Unreadable`] if the dataset cannot be opened.
    /// - [`ErrorKind::MissingField`] if a name component is absent.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn extract(&self, path: &Path, original_name: &str) -> Result<Option<Extraction>> {
        if !Self::is_recognised(original_name) {
            return Ok(None);
        }
        let dataset = self.reader.open(path)?;
        let patient = name_component(dataset.as_ref(), PATIENT_ID)?;
        let study_date = name_component(dataset.as_ref(), STUDY_DATE)?;
        let computed_name = format!("{patient}_{study_date}_{original_name}").replace(['-', '/', '\0'], "_");
        Ok(Some(Extraction {
            computed_name,
            annotations: annotations(dataset.as_ref(), path),
        }))
    }
}

fn name_component(dataset: &dyn Dataset, field: &'static str) -> Result<String> {
    dataset.field(field).or_raise(|| ErrorKind::MissingField(field))?.ok_or_raise(|| ErrorKind::MissingField(field))
}

fn annotations(dataset: &dyn Dataset, path: &Path) -> Annotations {
    let mut annotations = Annotations::new();
    for (field, kind) in ANNOTATION_FIELDS {
        let raw = match dataset.field(field) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::warn!(path = %path.display(), field, "Field is empty");
                continue;
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), field, "Field not found: {e}");
                continue;
            },
        };
        match kind.coerce(field, &raw) {
            Ok(value) => {
                annotations.insert(field.to_string(), value);
            },
            Err(e) => tracing::warn!(path = %path.display(), field, "Could not parse: {e}"),
        }
    }
    annotations
}
