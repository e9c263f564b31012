//! Firebird result materialization and statement lifecycle.
//!
//! This crate sits between a native Firebird client and application code.
//! It prepares statements, runs them in explicit or anonymous transactions,
//! caches prepared statements per SQL text, and turns native output buffers
//! into typed [`Row`]s keyed by column alias or name.
//!
//! The wire protocol is not implemented here: callers provide a
//! [`NativeClient`] that performs the round trips.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use firebird_core::{Connection, ConnectionHandle, ConnectionOptions, Execution, NativeClient, Result, Value};
//!
//! async fn demo(client: Arc<dyn NativeClient>) -> Result<()> {
//!     let conn = Connection::attach(client, ConnectionHandle(1), ConnectionOptions::new()).await?;
//!     let tx = conn.start_transaction().await?;
//!
//!     if let Execution::Affected(n) = conn
//!         .execute("UPDATE T SET X = ? WHERE ID = ?", &[Value::from(1), Value::from(7)], &tx)
//!         .await?
//!     {
//!         println!("{} rows updated", n);
//!     }
//!
//!     conn.execute_each("SELECT ID, NAME FROM T", &[], Some(&tx), |row| {
//!         println!("#{} {:?}", row.number(), row.get("NAME"));
//!         Ok(())
//!     })
//!     .await?;
//!
//!     tx.commit().await?;
//!     conn.close().await
//! }
//! ```

pub mod cache;
pub mod connection;
pub mod error;
pub mod native;
pub mod options;
pub mod procedure;
pub mod result_set;
pub mod statement;
pub mod transaction;
pub mod types;

// Re-export main types
pub use cache::StatementCache;
pub use connection::Connection;
pub use error::{Error, Result, NON_EXISTENT_DOMAIN_ERROR};
pub use native::{
    BlobId, ColumnDescriptor, ConnectionHandle, ExecuteReply, NativeClient, NativeFetch, RawValue,
    StatementHandle, TransactionHandle,
};
pub use options::{ConnectionOptions, EncodingMode, KeyCase};
pub use procedure::ProcedureCall;
pub use result_set::ResultSet;
pub use statement::{Execution, FetchStatus, Statement, StatementKind};
pub use transaction::Transaction;
pub use types::{
    fold_identifier, to_logical_type, Charset, CharsetAware, ColumnIndex, ColumnMetadata,
    EncodingStrategy, PassThrough, Row, SqlType, SqlTypeKind, Value,
};
