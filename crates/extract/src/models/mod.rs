mod value;

pub use self::value::{Annotations, FieldType, TypedValue};
