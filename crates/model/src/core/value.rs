use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer, ser::Error as _};
use std::{borrow::Cow, fmt};

/// One cell of a result row after conversion.
///
/// Text-like cells (including binary payloads and textual dates) arrive as
/// `String`; timestamps keep their structure so every output format can
/// pick its own representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Timestamp(DateTime<Utc>),
    Int(i64),
    Uint(u64),
    /// Single-precision column values, kept narrow so they print in their
    /// shortest `f32` form (`1.1`, not `1.100000023841858`).
    Float32(f32),
    Float(f64),
    Boolean(bool),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

/// An ordered row of values, positionally aligned with the column list.
pub type Row = Vec<Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable text for the value, `None` for NULL.
    ///
    /// Binary payloads are decoded as UTF-8 with replacement characters.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::String(v) => Some(Cow::Borrowed(v)),
            Value::Timestamp(v) => Some(Cow::Owned(v.to_string())),
            Value::Int(v) => Some(Cow::Owned(v.to_string())),
            Value::Uint(v) => Some(Cow::Owned(v.to_string())),
            Value::Float32(v) => Some(Cow::Owned(v.to_string())),
            Value::Float(v) => Some(Cow::Owned(v.to_string())),
            Value::Boolean(v) => Some(Cow::Borrowed(if *v { "true" } else { "false" })),
            Value::Bytes(v) => Some(String::from_utf8_lossy(v)),
            Value::Json(v) => Some(Cow::Owned(v.to_string())),
        }
    }

    /// Replaces a binary payload by its text form. Other variants are returned as is.
    pub fn into_text_if_binary(self) -> Value {
        match self {
            Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(s) => Value::String(s),
                Err(err) => Value::String(String::from_utf8_lossy(err.as_bytes()).into_owned()),
            },
            other => other,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float32(_) | Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::String(v) => serializer.serialize_str(v),
            Value::Timestamp(v) => {
                serializer.serialize_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Uint(v) => serializer.serialize_u64(*v),
            Value::Float32(v) if v.is_finite() => serializer.serialize_f32(*v),
            Value::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::Float32(v) => Err(S::Error::custom(format!(
                "unsupported value: {v} cannot be represented in JSON"
            ))),
            Value::Float(v) => Err(S::Error::custom(format!(
                "unsupported value: {v} cannot be represented in JSON"
            ))),
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::Bytes(v) => serializer.serialize_str(&String::from_utf8_lossy(v)),
            Value::Json(v) => v.serialize(serializer),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_serializes_as_rfc3339() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let json = serde_json::to_string(&Value::Timestamp(ts)).unwrap();
        assert_eq!(json, "\"2024-03-09T14:05:00Z\"");
    }

    #[test]
    fn test_timestamp_text_form() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(
            Value::Timestamp(ts).as_text().unwrap(),
            "2024-03-09 14:05:00 UTC"
        );
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        assert!(serde_json::to_string(&Value::Float(f64::NAN)).is_err());
        assert!(serde_json::to_string(&Value::Float(f64::INFINITY)).is_err());
        assert_eq!(serde_json::to_string(&Value::Float(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn test_single_precision_keeps_short_form() {
        let value = Value::from(1.1f32);
        assert_eq!(serde_json::to_string(&value).unwrap(), "1.1");
        assert_eq!(value.to_string(), "1.1");
        assert_eq!(value.kind(), "float");
        assert!(serde_json::to_string(&Value::Float32(f32::NAN)).is_err());
    }

    #[test]
    fn test_bytes_serialize_as_text() {
        let value = Value::Bytes(b"a<b&c".to_vec());
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"a<b&c\"");
        assert_eq!(value.as_text().unwrap(), "a<b&c");
    }

    #[test]
    fn test_into_text_if_binary() {
        assert_eq!(
            Value::Bytes(vec![b'o', b'k']).into_text_if_binary(),
            Value::String("ok".into())
        );
        assert_eq!(
            Value::Bytes(vec![0xff]).into_text_if_binary(),
            Value::String("\u{fffd}".into())
        );
        assert_eq!(Value::Int(3).into_text_if_binary(), Value::Int(3));
    }

    #[test]
    fn test_null_has_no_text() {
        assert!(Value::Null.as_text().is_none());
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
