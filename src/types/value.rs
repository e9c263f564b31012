//! Decoded column values and bind parameters.

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

use crate::native::BlobId;

/// A single column value, also used for bind parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// SMALLINT, INTEGER and BIGINT without scale.
    Integer(i64),
    /// FLOAT, DOUBLE and scaled exact numerics.
    Double(f64),
    /// CHAR and VARCHAR decoded through the connection's encoding.
    String(String),
    /// Character data in the OCTETS character set, or raw bytes to bind.
    Binary(Bytes),
    /// DATE.
    Date(NaiveDate),
    /// TIME.
    Time(NaiveTime),
    /// TIMESTAMP (and DATE when dates decode as timestamps).
    Timestamp(NaiveDateTime),
    /// BLOB id; contents are read through the native client.
    Blob(BlobId),
}

impl Value {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to convert to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get the value as raw bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Try to get the value as a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            _ => None,
        }
    }

    /// Try to get the value as a time of day.
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Try to get the value as a timestamp.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Try to get the value as a blob id.
    pub fn as_blob(&self) -> Option<BlobId> {
        match self {
            Value::Blob(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Binary(b) => write!(f, "<BINARY: {} bytes>", b.len()),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Blob(id) => write!(f, "<BLOB: {}>", id),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
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

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
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

    #[test]
    fn test_value_null() {
        let val = Value::Null;
        assert!(val.is_null());
        assert_eq!(val.as_str(), None);
        assert_eq!(format!("{}", val), "NULL");
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_value_numbers() {
        let val = Value::from(42);
        assert_eq!(val.as_i64(), Some(42));
        assert_eq!(val.as_f64(), Some(42.0));

        let val = Value::Double(123.45);
        assert_eq!(val.as_i64(), None);
        assert_eq!(val.as_f64(), Some(123.45));
    }

    #[test]
    fn test_value_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 21).unwrap();
        let ts = date.and_hms_opt(12, 36, 5).unwrap();
        assert_eq!(Value::from(ts).as_date(), Some(date));
        assert_eq!(format!("{}", Value::Timestamp(ts)), "2024-10-21 12:36:05");
        assert_eq!(format!("{}", Value::Date(date)), "2024-10-21");
    }
}
