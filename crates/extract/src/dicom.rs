//! DICOM-backed [`DatasetReader`].

use crate::error::{ErrorKind, Result};
use crate::reader::{Dataset, DatasetReader};
use dicom_object::{DefaultDicomObject, open_file};
use exn::ResultExt;
use std::path::Path;

/// Reads DICOM Part 10 files via `dicom-object`.
///
/// The whole object is parsed into memory on [`open`](DatasetReader::open);
/// field access afterwards is a map lookup by attribute keyword.
#[derive(Debug, Default, Clone, Copy)]
pub struct DicomReader;

impl DatasetReader for DicomReader {
    fn open(&self, path: &Path) -> Result<Box<dyn Dataset>> {
        let object = open_file(path).or_raise(|| ErrorKind::Unreadable(path.to_path_buf()))?;
        Ok(Box::new(DicomDataset { object }))
    }
}

struct DicomDataset {
    object: DefaultDicomObject,
}

impl Dataset for DicomDataset {
    fn field(&self, name: &'static str) -> Result<Option<String>> {
        let element = self.object.element_by_name(name).or_raise(|| ErrorKind::MissingField(name))?;
        let value = element.to_str().or_raise(|| ErrorKind::ParseError {
            field: name,
            value: format!("{:?}", element.header()),
        })?;
        // Text values are padded to even length with spaces (or NUL for UIDs).
        let value = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        Ok((!value.is_empty()).then(|| value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_missing_file() {
        let err = DicomReader.open(Path::new("/definitely/not/here.dcm")).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Unreadable(_)));
    }

    #[test]
    fn test_open_garbage_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a DICOM preamble, not even close").unwrap();
        let err = DicomReader.open(file.path()).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Unreadable(_)));
    }
}
