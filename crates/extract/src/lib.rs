//! Metadata extraction for files about to be ingested.
//!
//! Every discovered file gets a display name. Files in the recognised
//! annotated-image format additionally get a computed name derived from the
//! patient and study they belong to, plus a fixed schema of typed annotations
//! (see [`ANNOTATION_FIELDS`]).
//!
//! Parsing is delegated to a [`DatasetReader`]; [`DicomReader`] is the
//! production implementation.

mod consts;
mod dicom;
pub mod error;
mod extractor;
pub mod models;
pub mod reader;

pub use crate::consts::{ANNOTATION_FIELDS, RECOGNISED_EXTENSION, annotation_field_names};
pub use crate::dicom::DicomReader;
pub use crate::extractor::{Extraction, Extractor};
pub use crate::reader::{Dataset, DatasetReader, ReaderHandle};
