use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use exn::{OptionExt, ResultExt};
use time::{Date, Month};

use crate::error::{ErrorKind, Result};

/// Annotations attached to a single file, keyed by schema field name.
pub type Annotations = BTreeMap<String, TypedValue>;

/// The type an annotation field is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    /// Calendar date, encoded in the dataset as `YYYYMMDD`.
    Date,
}
impl FieldType {
    /// Coerce the raw textual value of `field` into a [`TypedValue`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ferry_extract::models::{FieldType, TypedValue};
    ///
    /// let value = FieldType::Integer.coerce("InstanceNumber", " 42 ").unwrap();
    /// assert_eq!(value, TypedValue::Integer(42));
    /// assert!(FieldType::Date.coerce("StudyDate", "2020-01-01").is_err());
    /// ```
    pub fn coerce(self, field: &'static str, raw: &str) -> Result<TypedValue> {
        let trimmed = raw.trim();
        let parse_error = || ErrorKind::ParseError {
            field,
            value: raw.to_string(),
        };
        Ok(match self {
            Self::String => TypedValue::String(trimmed.to_string()),
            Self::Integer => TypedValue::Integer(trimmed.parse::<i64>().or_raise(parse_error)?),
            Self::Date => TypedValue::Date(parse_date(trimmed).ok_or_raise(parse_error)?),
        })
    }
}

fn parse_date(raw: &str) -> Option<Date> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = raw[0..4].parse::<i32>().ok()?;
    let month = Month::try_from(raw[4..6].parse::<u8>().ok()?).ok()?;
    let day = raw[6..8].parse::<u8>().ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// A single, typed annotation value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Date(Date),
}
impl Display for TypedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Integer(i) => write!(f, "{i}"),
            // `time` renders dates as YYYY-MM-DD.
            Self::Date(d) => write!(f, "{d}"),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TypedValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Date(d) => serializer.collect_str(d),
        }
    }
}
