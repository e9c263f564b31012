//! Column metadata of a prepared statement.
//!
//! Built once from the native column descriptors when a statement is
//! prepared and shared read-only by every row it produces.

use crate::error::Result;
use crate::native::{ColumnDescriptor, RawValue};
use crate::options::{ConnectionOptions, KeyCase};

use super::encoding::EncodingStrategy;
use super::sql_type::SqlTypeKind;
use super::value::Value;

/// Fold an engine identifier to the host convention.
///
/// Trailing blanks are removed; the name is lower-cased unless it already
/// contains a lower-case letter (a quoted mixed-case identifier).
pub fn fold_identifier(name: &str) -> String {
    let name = name.trim_end();
    if name.chars().any(char::is_lowercase) {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

/// Description of one output column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    /// Column name.
    pub name: String,
    /// Column alias (equals the name when no alias was given).
    pub alias: String,
    /// Key used for row lookups.
    pub key: String,
    /// Owning table, empty for computed columns.
    pub table: String,
    /// Logical SQL type.
    pub kind: SqlTypeKind,
    /// Decimal scale (negative for fractional digits).
    pub scale: i16,
    /// Native subtype; the character set id for text columns.
    pub subtype: i16,
}

impl ColumnMetadata {
    /// Create metadata for a column whose key is its alias.
    pub fn new(name: impl Into<String>, alias: impl Into<String>, kind: SqlTypeKind) -> Self {
        let name = name.into();
        let alias = alias.into();
        Self {
            key: alias.clone(),
            name,
            alias,
            table: String::new(),
            kind,
            scale: 0,
            subtype: 0,
        }
    }

    /// Build from a native descriptor, applying the key options.
    pub fn from_descriptor(desc: &ColumnDescriptor, options: &ConnectionOptions) -> Result<Self> {
        let kind = SqlTypeKind::try_from_native(desc.type_code, desc.subtype)?;
        let name = desc.name.trim_end().to_string();
        let alias = desc.alias.trim_end().to_string();
        let raw_key = if options.alias_keys && !alias.is_empty() {
            &alias
        } else {
            &name
        };
        let key = match options.key_case {
            KeyCase::Preserve => raw_key.clone(),
            KeyCase::Lower => fold_identifier(raw_key),
        };
        Ok(Self {
            name,
            alias,
            key,
            table: desc.table.trim_end().to_string(),
            kind,
            scale: desc.scale,
            subtype: desc.subtype,
        })
    }

    /// Decode one native value of this column.
    pub fn decode(&self, raw: RawValue, encoding: &dyn EncodingStrategy, date_as_date: bool) -> Value {
        match raw {
            RawValue::Null => Value::Null,
            RawValue::Short(v) => self.unscale(v.into()),
            RawValue::Long(v) => self.unscale(v.into()),
            RawValue::Int64(v) => self.unscale(v),
            RawValue::Float(v) => Value::Double(v.into()),
            RawValue::Double(v) => Value::Double(v),
            RawValue::Text(bytes) => encoding.decode(bytes, self.subtype),
            RawValue::Date(d) if date_as_date => Value::Date(d),
            RawValue::Date(d) => Value::Timestamp(d.and_time(chrono::NaiveTime::MIN)),
            RawValue::Time(t) => Value::Time(t),
            RawValue::Timestamp(ts) => Value::Timestamp(ts),
            RawValue::Blob(id) => Value::Blob(id),
        }
    }

    fn unscale(&self, v: i64) -> Value {
        if self.scale == 0 {
            Value::Integer(v)
        } else {
            Value::Double(v as f64 / 10f64.powi(self.scale.unsigned_abs().into()))
        }
    }
}
