//! Contract with the native Firebird client.
//!
//! The native client does the wire work: attaching, byte-level transaction
//! control, statement compilation and converting wire buffers into
//! [`RawValue`]s. This crate only reaches it through [`NativeClient`], so any
//! client library (or a scripted stand-in) can sit underneath.
//!
//! Every method is one request/response round trip. Implementations take
//! `&self` and must allow independent calls against different transactions
//! of the same connection; a single statement handle is never used
//! concurrently by this crate.

pub mod constants;

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::future::BoxFuture;
use std::fmt;

use crate::error::Result;
use crate::types::Value;

/// Native handle of an attached database connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(pub u32);

/// Native handle of a started transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle(pub u32);

/// Native handle of an allocated, prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementHandle(pub u32);

/// Blob id as stored in a row; segment I/O belongs to the native client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(pub u64);

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Output column as described by the native client.
///
/// `type_code` uses the system catalog field type numbering. For text
/// columns `subtype` carries the character set id.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name (may be blank-padded).
    pub name: String,
    /// Column alias (may be blank-padded).
    pub alias: String,
    /// Owning table, empty for expressions.
    pub table: String,
    /// Native field type code.
    pub type_code: i16,
    /// Native subtype (exact numeric flavour, blob subtype or charset id).
    pub subtype: i16,
    /// Decimal scale, negative for exact numerics with fractional digits.
    pub scale: i16,
}

/// Column value as produced by the native client, before core decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Short(i16),
    Long(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    /// CHAR or VARCHAR bytes in the column's character set.
    Text(Bytes),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Blob(BlobId),
}

/// Outcome of a native execute call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteReply {
    /// A cursor was opened and rows can be fetched.
    CursorOpened,
    /// Statement ran to completion; rows affected (0 for non-DML).
    Affected(u64),
}

/// Result of one native fetch call on an open cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFetch {
    /// A row is positioned and can be decoded.
    Row,
    /// The cursor has no more rows.
    Exhausted,
}

/// Minimum surface of the native client used by the statement core.
pub trait NativeClient: Send + Sync + fmt::Debug {
    /// Start a transaction spanning the given connections.
    fn start_transaction<'a>(
        &'a self,
        connections: &'a [ConnectionHandle],
    ) -> BoxFuture<'a, Result<TransactionHandle>>;

    /// Commit a transaction.
    fn commit(&self, transaction: TransactionHandle) -> BoxFuture<'_, Result<()>>;

    /// Roll back a transaction.
    fn rollback(&self, transaction: TransactionHandle) -> BoxFuture<'_, Result<()>>;

    /// Allocate and prepare a statement.
    fn prepare<'a>(
        &'a self,
        connection: ConnectionHandle,
        transaction: TransactionHandle,
        sql: &'a str,
        dialect: u16,
    ) -> BoxFuture<'a, Result<StatementHandle>>;

    /// Native statement type code of a prepared statement.
    fn describe_statement_type(&self, statement: StatementHandle) -> BoxFuture<'_, Result<i32>>;

    /// Output columns of a prepared statement, in select-list order.
    fn describe_output_columns(
        &self,
        statement: StatementHandle,
    ) -> BoxFuture<'_, Result<Vec<ColumnDescriptor>>>;

    /// Number of `?` placeholders reported by the prepare step.
    fn parameter_count(&self, statement: StatementHandle) -> BoxFuture<'_, Result<usize>>;

    /// Execute a prepared statement with bound values.
    fn execute<'a>(
        &'a self,
        statement: StatementHandle,
        transaction: TransactionHandle,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecuteReply>>;

    /// Advance the open cursor.
    fn fetch_next(&self, statement: StatementHandle) -> BoxFuture<'_, Result<NativeFetch>>;

    /// Values of the current row (cursor row or singleton output).
    fn decode_current_row(&self, statement: StatementHandle) -> BoxFuture<'_, Result<Vec<RawValue>>>;

    /// Close the open cursor, keeping the statement prepared.
    fn close_cursor(&self, statement: StatementHandle) -> BoxFuture<'_, Result<()>>;

    /// Drop the prepared statement.
    fn close_statement(&self, statement: StatementHandle) -> BoxFuture<'_, Result<()>>;

    /// Access plan text of a prepared statement.
    fn plan(&self, statement: StatementHandle) -> BoxFuture<'_, Result<String>>;
}
