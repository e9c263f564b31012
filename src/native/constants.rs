//! Native client constants.
//!
//! Field type codes are the `RDB$FIELD_TYPE` values of the system catalog;
//! statement type codes are the `isc_info_sql_stmt_*` info items.

// Field types
pub const FB_TYPE_SMALLINT: i16 = 7;
pub const FB_TYPE_INTEGER: i16 = 8;
pub const FB_TYPE_FLOAT: i16 = 10;
pub const FB_TYPE_DATE: i16 = 12;
pub const FB_TYPE_TIME: i16 = 13;
pub const FB_TYPE_CHAR: i16 = 14;
pub const FB_TYPE_BIGINT: i16 = 16;
pub const FB_TYPE_DOUBLE: i16 = 27;
pub const FB_TYPE_TIMESTAMP: i16 = 35;
pub const FB_TYPE_VARCHAR: i16 = 37;
pub const FB_TYPE_BLOB: i16 = 261;

// Exact numeric subtypes for the integer family
pub const FB_SUBTYPE_NUMERIC: i16 = 1;
pub const FB_SUBTYPE_DECIMAL: i16 = 2;

// Statement types
pub const FB_STMT_SELECT: i32 = 1;
pub const FB_STMT_INSERT: i32 = 2;
pub const FB_STMT_UPDATE: i32 = 3;
pub const FB_STMT_DELETE: i32 = 4;
pub const FB_STMT_DDL: i32 = 5;
pub const FB_STMT_GET_SEGMENT: i32 = 6;
pub const FB_STMT_PUT_SEGMENT: i32 = 7;
pub const FB_STMT_EXEC_PROCEDURE: i32 = 8;
pub const FB_STMT_START_TRANS: i32 = 9;
pub const FB_STMT_COMMIT: i32 = 10;
pub const FB_STMT_ROLLBACK: i32 = 11;
pub const FB_STMT_SELECT_FOR_UPD: i32 = 12;
pub const FB_STMT_SET_GENERATOR: i32 = 13;
pub const FB_STMT_SAVEPOINT: i32 = 14;

// Character sets with fixed ids
pub const FB_CHARSET_NONE: i16 = 0;
pub const FB_CHARSET_OCTETS: i16 = 1;

/// Default SQL dialect for prepare.
pub const FB_DEFAULT_DIALECT: u16 = 3;
