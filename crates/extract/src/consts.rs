use crate::models::FieldType;

/// File extension (compared case-insensitively) of the annotated image format.
pub const RECOGNISED_EXTENSION: &str = "dcm";

/// Field holding the patient identifier; first component of the computed name.
pub const PATIENT_ID: &str = "PatientID";
/// Field holding the study date; second component of the computed name.
pub const STUDY_DATE: &str = "StudyDate";

/// The fixed annotation schema.
///
/// Order is significant: it is the column order of the manifest, and it must
/// stay stable between releases so that manifests remain comparable.
pub const ANNOTATION_FIELDS: [(&str, FieldType); 23] = [
    ("ContentDate", FieldType::Date),
    ("ContentTime", FieldType::Integer),
    ("DeviceSerialNumber", FieldType::String),
    ("InstanceNumber", FieldType::Integer),
    ("InstitutionName", FieldType::String),
    ("Manufacturer", FieldType::String),
    ("Modality", FieldType::String),
    ("PatientBirthDate", FieldType::Date),
    (PATIENT_ID, FieldType::String),
    ("PerformedProcedureStepID", FieldType::String),
    ("PerformedProcedureStepStartDate", FieldType::Date),
    ("PerformedProcedureStepStartTime", FieldType::String),
    ("SOPClassUID", FieldType::String),
    ("SOPInstanceUID", FieldType::String),
    ("SeriesDate", FieldType::Date),
    ("SeriesInstanceUID", FieldType::String),
    ("SeriesNumber", FieldType::Integer),
    ("SeriesTime", FieldType::Integer),
    ("SoftwareVersions", FieldType::String),
    (STUDY_DATE, FieldType::Date),
    ("StudyID", FieldType::String),
    ("StudyInstanceUID", FieldType::String),
    ("StudyTime", FieldType::Integer),
];

/// Iterate the annotation field names in schema order.
pub fn annotation_field_names() -> impl Iterator<Item = &'static str> {
    ANNOTATION_FIELDS.iter().map(|(name, _)| *name)
}
