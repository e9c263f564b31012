//! Column types, metadata, values and rows.

mod encoding;
mod metadata;
mod row;
mod sql_type;
mod value;

pub use encoding::{Charset, CharsetAware, EncodingStrategy, PassThrough, CHARACTER_SETS_SQL};
pub use metadata::{fold_identifier, ColumnMetadata};
pub use row::{ColumnIndex, Row};
pub use sql_type::{to_logical_type, SqlType, SqlTypeKind};
pub use value::Value;
