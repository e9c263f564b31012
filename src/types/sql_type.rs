//! Logical SQL types and the native type catalog.
//!
//! The native client reports column types as catalog field type codes plus
//! a subtype. Exact numerics (NUMERIC/DECIMAL) share the storage codes of
//! the integer family and are told apart by subtype only.

use std::fmt;

use indexmap::IndexMap;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::native::constants::*;
use crate::types::Value;

/// Base SQL type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlTypeKind {
    Bigint,
    Blob,
    Char,
    Date,
    Decimal,
    Double,
    Float,
    Integer,
    Numeric,
    Smallint,
    Time,
    Timestamp,
    Varchar,
}

impl SqlTypeKind {
    /// Every logical kind, in name order.
    pub const ALL: [SqlTypeKind; 13] = [
        SqlTypeKind::Bigint,
        SqlTypeKind::Blob,
        SqlTypeKind::Char,
        SqlTypeKind::Date,
        SqlTypeKind::Decimal,
        SqlTypeKind::Double,
        SqlTypeKind::Float,
        SqlTypeKind::Integer,
        SqlTypeKind::Numeric,
        SqlTypeKind::Smallint,
        SqlTypeKind::Time,
        SqlTypeKind::Timestamp,
        SqlTypeKind::Varchar,
    ];

    /// Map a native field type code and subtype to a logical kind.
    ///
    /// Returns `None` for codes outside the catalog.
    pub fn from_native(code: i16, subtype: i16) -> Option<Self> {
        let exact = |natural| match subtype {
            FB_SUBTYPE_NUMERIC => SqlTypeKind::Numeric,
            FB_SUBTYPE_DECIMAL => SqlTypeKind::Decimal,
            _ => natural,
        };
        let kind = match code {
            FB_TYPE_BIGINT => exact(SqlTypeKind::Bigint),
            FB_TYPE_INTEGER => exact(SqlTypeKind::Integer),
            FB_TYPE_SMALLINT => exact(SqlTypeKind::Smallint),
            FB_TYPE_BLOB => SqlTypeKind::Blob,
            FB_TYPE_CHAR => SqlTypeKind::Char,
            FB_TYPE_DATE => SqlTypeKind::Date,
            FB_TYPE_DOUBLE => SqlTypeKind::Double,
            FB_TYPE_FLOAT => SqlTypeKind::Float,
            FB_TYPE_TIME => SqlTypeKind::Time,
            FB_TYPE_TIMESTAMP => SqlTypeKind::Timestamp,
            FB_TYPE_VARCHAR => SqlTypeKind::Varchar,
            _ => return None,
        };
        Some(kind)
    }

    /// Fallible form of [`to_logical_type`] for data coming off the wire.
    pub fn try_from_native(code: i16, subtype: i16) -> Result<Self> {
        Self::from_native(code, subtype).ok_or(Error::UnmappedType { code, subtype })
    }

    /// SQL keyword for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            SqlTypeKind::Bigint => "BIGINT",
            SqlTypeKind::Blob => "BLOB",
            SqlTypeKind::Char => "CHAR",
            SqlTypeKind::Date => "DATE",
            SqlTypeKind::Decimal => "DECIMAL",
            SqlTypeKind::Double => "DOUBLE",
            SqlTypeKind::Float => "FLOAT",
            SqlTypeKind::Integer => "INTEGER",
            SqlTypeKind::Numeric => "NUMERIC",
            SqlTypeKind::Smallint => "SMALLINT",
            SqlTypeKind::Time => "TIME",
            SqlTypeKind::Timestamp => "TIMESTAMP",
            SqlTypeKind::Varchar => "VARCHAR",
        }
    }

    /// Whether values of this kind are character data.
    pub fn is_text(&self) -> bool {
        matches!(self, SqlTypeKind::Char | SqlTypeKind::Varchar)
    }

    /// Whether this kind carries precision and scale.
    pub fn is_exact_numeric(&self) -> bool {
        matches!(self, SqlTypeKind::Decimal | SqlTypeKind::Numeric)
    }
}

impl fmt::Display for SqlTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a native field type code and subtype to a logical kind.
///
/// # Panics
///
/// Panics when the pair is not in the type catalog. Every code the native
/// client defines is mapped, so an unmapped code is a programming error.
/// Use [`SqlTypeKind::try_from_native`] for untrusted input.
pub fn to_logical_type(code: i16, subtype: i16) -> SqlTypeKind {
    match SqlTypeKind::from_native(code, subtype) {
        Some(kind) => kind,
        None => panic!("unmapped native SQL type {} (subtype {})", code, subtype),
    }
}

/// Full SQL type of a table column.
///
/// Only the fields meaningful for `kind` are set: `length` for CHAR and
/// VARCHAR, `precision`/`scale` for DECIMAL and NUMERIC, `subtype` for BLOB.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlType {
    kind: SqlTypeKind,
    length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
    subtype: Option<i32>,
}

impl SqlType {
    /// A type with no attributes (dates, integers, floats...).
    pub fn simple(kind: SqlTypeKind) -> Self {
        Self {
            kind,
            length: None,
            precision: None,
            scale: None,
            subtype: None,
        }
    }

    /// CHAR(length).
    pub fn char(length: i32) -> Self {
        Self {
            length: Some(length),
            ..Self::simple(SqlTypeKind::Char)
        }
    }

    /// VARCHAR(length).
    pub fn varchar(length: i32) -> Self {
        Self {
            length: Some(length),
            ..Self::simple(SqlTypeKind::Varchar)
        }
    }

    /// DECIMAL(precision,scale).
    pub fn decimal(precision: i32, scale: i32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::simple(SqlTypeKind::Decimal)
        }
    }

    /// NUMERIC(precision,scale).
    pub fn numeric(precision: i32, scale: i32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::simple(SqlTypeKind::Numeric)
        }
    }

    /// BLOB SUB_TYPE subtype.
    pub fn blob(subtype: i32) -> Self {
        Self {
            subtype: Some(subtype),
            ..Self::simple(SqlTypeKind::Blob)
        }
    }

    /// Build from catalog attributes, keeping only those `kind` uses.
    pub fn from_catalog(
        kind: SqlTypeKind,
        length: Option<i32>,
        precision: Option<i32>,
        scale: Option<i32>,
        subtype: Option<i32>,
    ) -> Self {
        match kind {
            SqlTypeKind::Blob => Self {
                subtype,
                ..Self::simple(kind)
            },
            SqlTypeKind::Char | SqlTypeKind::Varchar => Self {
                length,
                ..Self::simple(kind)
            },
            SqlTypeKind::Decimal | SqlTypeKind::Numeric => Self {
                precision,
                scale,
                ..Self::simple(kind)
            },
            _ => Self::simple(kind),
        }
    }

    pub fn kind(&self) -> SqlTypeKind {
        self.kind
    }

    pub fn length(&self) -> Option<i32> {
        self.length
    }

    pub fn precision(&self) -> Option<i32> {
        self.precision
    }

    pub fn scale(&self) -> Option<i32> {
        self.scale
    }

    pub fn subtype(&self) -> Option<i32> {
        self.subtype
    }

    /// Column types of a table, keyed by column name in field order.
    ///
    /// Reads the system catalog in a private transaction.
    pub async fn for_table(connection: &Connection, table: &str) -> Result<IndexMap<String, SqlType>> {
        if table.is_empty() || table.chars().any(char::is_whitespace) {
            return Err(Error::InvalidTableName {
                name: table.to_string(),
            });
        }

        let sql = format!(
            "SELECT RF.RDB$FIELD_NAME, F.RDB$FIELD_TYPE, \
             F.RDB$FIELD_LENGTH, F.RDB$FIELD_PRECISION, \
             F.RDB$FIELD_SCALE * -1, F.RDB$FIELD_SUB_TYPE \
             FROM RDB$RELATION_FIELDS RF, RDB$FIELDS F \
             WHERE RF.RDB$RELATION_NAME = UPPER('{}') \
             AND RF.RDB$FIELD_SOURCE = F.RDB$FIELD_NAME \
             ORDER BY RF.RDB$FIELD_POSITION",
            table.replace('\'', "''")
        );

        let mut types = IndexMap::new();
        let transaction = connection.start_transaction().await?;
        let collected = connection
            .execute_each(&sql, &[], Some(&transaction), |row| {
                let int = |i: isize| row.get(i).and_then(Value::as_i64).map(|v| v as i32);
                let code = int(1).unwrap_or_default() as i16;
                let subtype = int(5);
                let kind = SqlTypeKind::try_from_native(code, subtype.unwrap_or_default() as i16)?;
                let name = row
                    .get(0isize)
                    .and_then(Value::as_str)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_default();
                types.insert(
                    name,
                    SqlType::from_catalog(kind, int(2), int(3), int(4), subtype),
                );
                Ok(())
            })
            .await;

        match collected {
            Ok(_) => {
                transaction.commit().await?;
                Ok(types)
            }
            Err(e) => {
                if let Err(rollback) = transaction.rollback().await {
                    tracing::warn!("rollback after catalog read failed: {}", rollback);
                }
                Err(e)
            }
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: Option<i32>| v.map(|v| v.to_string()).unwrap_or_default();
        match self.kind {
            SqlTypeKind::Decimal | SqlTypeKind::Numeric => write!(
                f,
                "{}({},{})",
                self.kind,
                opt(self.precision),
                opt(self.scale)
            ),
            SqlTypeKind::Blob => write!(f, "BLOB SUB_TYPE {}", opt(self.subtype)),
            SqlTypeKind::Char | SqlTypeKind::Varchar => {
                write!(f, "{}({})", self.kind, opt(self.length))
            }
            _ => write!(f, "{}", self.kind),
        }
    }
}
