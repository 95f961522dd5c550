//! Column values exchanged with the database.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;

/// One row: column name to value
pub type Row = HashMap<String, DbValue>;

/// Database value types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DbValue {
    /// Null value
    Null,
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// String value
    String(String),
    /// Boolean value
    Bool(bool),
    /// Binary data
    Bytes(Vec<u8>),
}

impl DbValue {
    /// Short name of the variant, used in conversion errors
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Whether the value is SQL `NULL`
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::ValueType {
            expected,
            found: format!("{} value {self:?}", self.kind()),
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for DbValue {
            fn from(v: $t) -> Self {
                Self::$variant(v.into())
            }
        })*
    };
}

impl_from!(
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    String => String,
    Vec<u8> => Bytes,
);

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Conversion from a column value back to a Rust type
pub trait FromValue: Sized {
    /// Convert `value`
    ///
    /// # Errors
    ///
    /// Returns `Error::ValueType` when the value has an incompatible type.
    fn from_value(value: &DbValue) -> Result<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &DbValue) -> Result<Self> {
        match value {
            DbValue::Int(v) => Ok(*v),
            DbValue::Bool(b) => Ok(Self::from(*b)),
            other => Err(other.mismatch("i64")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &DbValue) -> Result<Self> {
        let wide = i64::from_value(value).map_err(|_| value.mismatch("i32"))?;
        Self::try_from(wide).map_err(|_| value.mismatch("i32"))
    }
}

impl FromValue for f64 {
    fn from_value(value: &DbValue) -> Result<Self> {
        match value {
            DbValue::Float(v) => Ok(*v),
            #[allow(clippy::cast_precision_loss)]
            DbValue::Int(v) => Ok(*v as Self),
            other => Err(other.mismatch("f64")),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &DbValue) -> Result<Self> {
        match value {
            DbValue::Bool(b) => Ok(*b),
            DbValue::Int(v) => Ok(*v != 0),
            other => Err(other.mismatch("bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &DbValue) -> Result<Self> {
        match value {
            DbValue::String(s) => Ok(s.clone()),
            other => Err(other.mismatch("String")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &DbValue) -> Result<Self> {
        match value {
            DbValue::Bytes(b) => Ok(b.clone()),
            DbValue::String(s) => Ok(s.as_bytes().to_vec()),
            other => Err(other.mismatch("Vec<u8>")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &DbValue) -> Result<Self> {
        match value {
            DbValue::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_scalars() {
        assert_eq!(DbValue::from(7_i32), DbValue::Int(7));
        assert_eq!(DbValue::from("a"), DbValue::String("a".into()));
        assert_eq!(DbValue::from(None::<i64>), DbValue::Null);
        assert_eq!(DbValue::from(Some(1.5)), DbValue::Float(1.5));
    }

    #[test]
    fn test_sqlite_booleans_are_integers() {
        assert!(bool::from_value(&DbValue::Int(1)).unwrap());
        assert!(!bool::from_value(&DbValue::Int(0)).unwrap());
        assert_eq!(i64::from_value(&DbValue::Bool(true)).unwrap(), 1);
    }

    #[test]
    fn test_float_accepts_integers() {
        assert!((f64::from_value(&DbValue::Int(3)).unwrap() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_option_maps_null() {
        assert_eq!(Option::<String>::from_value(&DbValue::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_value(&DbValue::String("x".into())).unwrap(),
            Some("x".to_string())
        );
    }

    #[test]
    fn test_mismatch_is_reported() {
        let err = String::from_value(&DbValue::Int(1)).unwrap_err();
        assert!(matches!(err, Error::ValueType { expected: "String", .. }));
        assert!(i32::from_value(&DbValue::Int(i64::MAX)).is_err());
    }

    #[test]
    fn test_serializes_untagged() {
        let row = vec![DbValue::Int(1), DbValue::Null, DbValue::String("a".into())];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[1,null,"a"]"#);
    }
}
