//! Row type for query results.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::metadata::ColumnMetadata;
use super::sql_type::SqlTypeKind;
use super::value::Value;

/// Anything that can address a column of a [`Row`].
///
/// Integers are positions (signed ones count from the end when negative);
/// strings match the column key exactly.
pub trait ColumnIndex: fmt::Display {
    /// Resolve to a position within `columns`.
    fn resolve(&self, columns: &[ColumnMetadata]) -> Option<usize>;
}

impl ColumnIndex for usize {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Option<usize> {
        (*self < columns.len()).then_some(*self)
    }
}

impl ColumnIndex for isize {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Option<usize> {
        let index = if *self < 0 {
            columns.len().checked_sub(self.unsigned_abs())?
        } else {
            self.unsigned_abs()
        };
        index.resolve(columns)
    }
}

impl ColumnIndex for i32 {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Option<usize> {
        (*self as isize).resolve(columns)
    }
}

impl ColumnIndex for str {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Option<usize> {
        columns.iter().position(|c| c.key == self)
    }
}

impl ColumnIndex for String {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Option<usize> {
        self.as_str().resolve(columns)
    }
}

impl<T: ColumnIndex + ?Sized> ColumnIndex for &T {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Option<usize> {
        (**self).resolve(columns)
    }
}

/// One fetched row: an immutable snapshot, not a live cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column metadata shared with the statement.
    metadata: Arc<[ColumnMetadata]>,
    /// Column values in declaration order.
    values: Vec<Value>,
    /// 1-based position within the result set.
    number: u64,
}

impl Row {
    /// Create a row; the value count must match the metadata.
    pub fn new(metadata: Arc<[ColumnMetadata]>, values: Vec<Value>, number: u64) -> Result<Self> {
        if metadata.len() != values.len() {
            return Err(Error::RowShapeMismatch {
                values: values.len(),
                columns: metadata.len(),
            });
        }
        Ok(Self {
            metadata,
            values,
            number,
        })
    }

    /// Row number within its result set, starting at 1.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.metadata.len()
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column metadata.
    pub fn metadata(&self) -> &[ColumnMetadata] {
        &self.metadata
    }

    /// Get a value by position or key.
    pub fn get<I: ColumnIndex>(&self, index: I) -> Option<&Value> {
        index.resolve(&self.metadata).map(|i| &self.values[i])
    }

    /// Get a value, failing with `ColumnNotFound` on a miss.
    pub fn try_get<I: ColumnIndex>(&self, index: I) -> Result<&Value> {
        self.get(&index).ok_or_else(|| Error::column_not_found(&index))
    }

    /// Get a value or the supplied default when the column does not exist.
    pub fn fetch_or<I: ColumnIndex>(&self, index: I, default: Value) -> Value {
        self.get(index).cloned().unwrap_or(default)
    }

    /// Get a value or compute one from the missing index.
    pub fn fetch_or_else<I, F>(&self, index: I, fallback: F) -> Value
    where
        I: ColumnIndex,
        F: FnOnce(&I) -> Value,
    {
        match self.get(&index) {
            Some(v) => v.clone(),
            None => fallback(&index),
        }
    }

    fn column<I: ColumnIndex>(&self, index: I) -> Option<&ColumnMetadata> {
        index.resolve(&self.metadata).map(|i| &self.metadata[i])
    }

    /// Name of a column.
    pub fn column_name<I: ColumnIndex>(&self, index: I) -> Option<&str> {
        self.column(index).map(|c| c.name.as_str())
    }

    /// Alias of a column.
    pub fn column_alias<I: ColumnIndex>(&self, index: I) -> Option<&str> {
        self.column(index).map(|c| c.alias.as_str())
    }

    /// Owning table of a column.
    pub fn column_table<I: ColumnIndex>(&self, index: I) -> Option<&str> {
        self.column(index).map(|c| c.table.as_str())
    }

    /// Scale of a column.
    pub fn column_scale<I: ColumnIndex>(&self, index: I) -> Option<i16> {
        self.column(index).map(|c| c.scale)
    }

    /// Base SQL type of a column.
    pub fn base_type<I: ColumnIndex>(&self, index: I) -> Option<SqlTypeKind> {
        self.column(index).map(|c| c.kind)
    }

    /// Check whether a column has the given key.
    pub fn has_key(&self, key: &str) -> bool {
        self.metadata.iter().any(|c| c.key == key)
    }

    /// Check whether a column has the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.metadata.iter().any(|c| c.name == name)
    }

    /// Check whether a column has the given alias.
    pub fn has_alias(&self, alias: &str) -> bool {
        self.metadata.iter().any(|c| c.alias == alias)
    }

    /// Check whether any column holds the given value.
    pub fn has_value(&self, value: &Value) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Column keys in declaration order.
    pub fn keys(&self) -> Vec<&str> {
        self.metadata.iter().map(|c| c.key.as_str()).collect()
    }

    /// Column names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.metadata.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column aliases in declaration order.
    pub fn aliases(&self) -> Vec<&str> {
        self.metadata.iter().map(|c| c.alias.as_str()).collect()
    }

    /// Get all values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterate over `(key, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.metadata
            .iter()
            .map(|c| c.key.as_str())
            .zip(self.values.iter())
    }

    /// Pairs matching a predicate, in declaration order.
    pub fn select<F>(&self, mut predicate: F) -> Vec<(&str, &Value)>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.iter().filter(|(k, v)| predicate(k, v)).collect()
    }

    /// All `(key, value)` pairs, one per column.
    pub fn to_pairs(&self) -> Vec<(String, Value)> {
        self.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    /// Map of key to value in declaration order.
    ///
    /// Columns sharing a key (common in joins) collapse into one entry
    /// holding the last column's value, at the first column's position.
    pub fn to_map(&self) -> IndexMap<String, Value> {
        let mut map = IndexMap::with_capacity(self.values.len());
        for (k, v) in self.iter() {
            map.insert(k.to_string(), v.clone());
        }
        map
    }

    /// Values for several columns; misses become `None`.
    pub fn values_at<I: ColumnIndex>(&self, indexes: &[I]) -> Vec<Option<&Value>> {
        indexes.iter().map(|i| self.get(i)).collect()
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_metadata() -> Arc<[ColumnMetadata]> {
        let mut id = ColumnMetadata::new("ID", "ID", SqlTypeKind::Integer);
        id.table = "PEOPLE".to_string();
        let name = ColumnMetadata::new("NAME", "FULL_NAME", SqlTypeKind::Varchar);
        let mut price = ColumnMetadata::new("PRICE", "PRICE", SqlTypeKind::Decimal);
        price.scale = -2;
        vec![id, name, price].into()
    }

    fn make_row() -> Row {
        Row::new(
            make_metadata(),
            vec![
                Value::Integer(1),
                Value::String("Ada".to_string()),
                Value::Double(9.5),
            ],
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_row_access() {
        let row = make_row();
        assert_eq!(row.column_count(), 3);
        assert_eq!(row.len(), row.values().len());
        assert_eq!(row.get(0usize), Some(&Value::Integer(1)));
        assert_eq!(row.get("FULL_NAME"), Some(&Value::String("Ada".to_string())));
        // Keys are already folded; lookups are exact.
        assert_eq!(row.get("full_name"), None);
        assert_eq!(row.get("NAME"), None);
        assert_eq!(row.get(3usize), None);
    }

    #[test]
    fn test_negative_index() {
        let row = make_row();
        let last = row.column_count() as isize - 1;
        assert_eq!(row.get(-1isize), row.get(last));
        assert_eq!(row.get(-3), row.get(0));
        assert_eq!(row.get(-4), None);
        assert_eq!(row.column_name(-1), Some("PRICE"));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = Row::new(make_metadata(), vec![Value::Null], 1).unwrap_err();
        assert_eq!(
            err,
            Error::RowShapeMismatch {
                values: 1,
                columns: 3
            }
        );
    }

    #[test]
    fn test_fetch_variants() {
        let row = make_row();
        assert_eq!(row.fetch_or("ID", Value::Null), Value::Integer(1));
        assert_eq!(row.fetch_or("MISSING", Value::from("dflt")), Value::from("dflt"));
        assert_eq!(
            row.fetch_or_else("MISSING", |k| Value::String(format!("no {}", k))),
            Value::from("no MISSING")
        );
        assert_eq!(
            row.try_get("MISSING").unwrap_err(),
            Error::column_not_found("MISSING")
        );
        assert!(row.try_get(-1).is_ok());
    }

    #[test]
    fn test_column_introspection() {
        let row = make_row();
        assert_eq!(row.column_name(1), Some("NAME"));
        assert_eq!(row.column_alias(1), Some("FULL_NAME"));
        assert_eq!(row.column_table(0), Some("PEOPLE"));
        assert_eq!(row.column_scale("PRICE"), Some(-2));
        assert_eq!(row.base_type(2), Some(SqlTypeKind::Decimal));
        assert!(row.has_key("FULL_NAME"));
        assert!(row.has_column("NAME"));
        assert!(row.has_alias("FULL_NAME"));
        assert!(!row.has_alias("NAME"));
        assert!(row.has_value(&Value::Integer(1)));
    }

    #[test]
    fn test_enumeration_order() {
        let row = make_row();
        assert_eq!(row.keys(), vec!["ID", "FULL_NAME", "PRICE"]);
        assert_eq!(row.names(), vec!["ID", "NAME", "PRICE"]);
        assert_eq!(row.aliases(), vec!["ID", "FULL_NAME", "PRICE"]);
        let pairs = row.to_pairs();
        assert_eq!(pairs.len(), row.column_count());
        assert_eq!(pairs[2], ("PRICE".to_string(), Value::Double(9.5)));
        let keys: Vec<_> = row.to_map().keys().cloned().collect();
        assert_eq!(keys, vec!["ID", "FULL_NAME", "PRICE"]);
        let selected = row.select(|_, v| matches!(v, Value::Integer(_) | Value::Double(_)));
        assert_eq!(selected.len(), 2);
        assert_eq!(
            row.values_at(&["ID", "NOPE"]),
            vec![Some(&Value::Integer(1)), None]
        );
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let metadata: Arc<[ColumnMetadata]> = vec![
            ColumnMetadata::new("ID", "ID", SqlTypeKind::Integer),
            ColumnMetadata::new("NAME", "NAME", SqlTypeKind::Varchar),
            ColumnMetadata::new("ID", "ID", SqlTypeKind::Integer),
        ]
        .into();
        let row = Row::new(
            metadata,
            vec![Value::Integer(1), Value::from("x"), Value::Integer(2)],
            1,
        )
        .unwrap();
        let map = row.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get_index(0), Some((&"ID".to_string(), &Value::Integer(2))));
        // Positional access still reaches both.
        assert_eq!(row.get(0), Some(&Value::Integer(1)));
        assert_eq!(row.get("ID"), Some(&Value::Integer(1)));
    }
}
