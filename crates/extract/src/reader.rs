//! Dataset access seam.
//!
//! The extractor never parses files itself. A [`DatasetReader`] opens a path
//! and hands back a [`Dataset`] from which named fields are read as text; the
//! [`Extractor`](crate::Extractor) owns coercion into typed annotations.

use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Shared, thread-safe handle to a dataset reader.
pub type ReaderHandle = Arc<dyn DatasetReader>;

/// Opens files as field-addressable datasets.
pub trait DatasetReader: Send + Sync {
    /// Open the file at `path`.
    ///
    /// Returns [`Unreadable`](crate::error::ErrorKind::Unreadable) if the
    /// file is missing, truncated, or not in the expected format.
    fn open(&self, path: &Path) -> Result<Box<dyn Dataset>>;
}

/// An opened dataset.
pub trait Dataset {
    /// Read the textual value of the field called `name`.
    ///
    /// - `Err(_)`: the field is absent or could not be decoded.
    /// - `Ok(None)`: the field is present but holds no value.
    /// - `Ok(Some(_))`: the raw value, with element padding removed.
    fn field(&self, name: &'static str) -> Result<Option<String>>;
}

#[cfg(any(test, feature = "mock"))]
pub use self::mock::StaticReader;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::{Dataset, DatasetReader};
    use crate::error::{ErrorKind, Result};
    use exn::OptionExt;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    /// In-memory dataset reader for testing.
    ///
    /// Datasets are registered against absolute file paths; opening any other
    /// path fails with [`ErrorKind::Unreadable`], which is exactly what a
    /// corrupt file looks like to the extractor.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use ferry_extract::reader::{DatasetReader, StaticReader};
    /// use std::path::Path;
    ///
    /// let reader = StaticReader::default().with_dataset("/data/scan.dcm", [("PatientID", "P-1")]);
    /// let dataset = reader.open(Path::new("/data/scan.dcm")).unwrap();
    /// assert_eq!(dataset.field("PatientID").unwrap().as_deref(), Some("P-1"));
    /// assert!(dataset.field("Modality").is_err());
    /// assert!(reader.open(Path::new("/data/other.dcm")).is_err());
    /// ```
    #[derive(Debug, Default, Clone)]
    pub struct StaticReader {
        datasets: HashMap<PathBuf, HashMap<String, String>>,
    }

    impl StaticReader {
        /// Register a dataset with the given fields.
        pub fn with_dataset<'a>(
            mut self,
            path: impl Into<PathBuf>,
            fields: impl IntoIterator<Item = (&'a str, &'a str)>,
        ) -> Self {
            let fields = fields.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            self.datasets.insert(path.into(), fields);
            self
        }
    }

    impl DatasetReader for StaticReader {
        fn open(&self, path: &Path) -> Result<Box<dyn Dataset>> {
            let fields = self
                .datasets
                .get(path)
                .cloned()
                .ok_or_raise(|| ErrorKind::Unreadable(path.to_path_buf()))?;
            Ok(Box::new(StaticDataset { fields }))
        }
    }

    struct StaticDataset {
        fields: HashMap<String, String>,
    }

    impl Dataset for StaticDataset {
        fn field(&self, name: &'static str) -> Result<Option<String>> {
            match self.fields.get(name) {
                Some(value) if value.trim().is_empty() => Ok(None),
                Some(value) => Ok(Some(value.clone())),
                None => exn::bail!(ErrorKind::MissingField(name)),
            }
        }
    }
}
