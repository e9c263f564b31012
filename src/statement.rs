//! Prepared statements.
//!
//! A [`Statement`] owns one native prepared-statement handle and gives every
//! statement kind the same execution entry point. The shape of the outcome
//! depends on the kind and is returned as an [`Execution`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::cache::StatementCache;
use crate::connection::{Connection, ConnectionContext};
use crate::error::{Error, Result};
use crate::native::constants::*;
use crate::native::{ExecuteReply, NativeFetch, StatementHandle};
use crate::result_set::ResultSet;
use crate::transaction::Transaction;
use crate::types::{ColumnMetadata, Row, Value};

/// Kind of a prepared statement, as classified by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    GetSegment,
    PutSegment,
    ExecProcedure,
    StartTransaction,
    Commit,
    Rollback,
    SelectForUpdate,
    SetGenerator,
    Savepoint,
}

impl StatementKind {
    /// Classify a native statement type code.
    pub fn from_code(code: i32) -> Option<Self> {
        let kind = match code {
            FB_STMT_SELECT => StatementKind::Select,
            FB_STMT_INSERT => StatementKind::Insert,
            FB_STMT_UPDATE => StatementKind::Update,
            FB_STMT_DELETE => StatementKind::Delete,
            FB_STMT_DDL => StatementKind::Ddl,
            FB_STMT_GET_SEGMENT => StatementKind::GetSegment,
            FB_STMT_PUT_SEGMENT => StatementKind::PutSegment,
            FB_STMT_EXEC_PROCEDURE => StatementKind::ExecProcedure,
            FB_STMT_START_TRANS => StatementKind::StartTransaction,
            FB_STMT_COMMIT => StatementKind::Commit,
            FB_STMT_ROLLBACK => StatementKind::Rollback,
            FB_STMT_SELECT_FOR_UPD => StatementKind::SelectForUpdate,
            FB_STMT_SET_GENERATOR => StatementKind::SetGenerator,
            FB_STMT_SAVEPOINT => StatementKind::Savepoint,
            _ => return None,
        };
        Some(kind)
    }

    /// Native statement type code.
    pub fn code(&self) -> i32 {
        match self {
            StatementKind::Select => FB_STMT_SELECT,
            StatementKind::Insert => FB_STMT_INSERT,
            StatementKind::Update => FB_STMT_UPDATE,
            StatementKind::Delete => FB_STMT_DELETE,
            StatementKind::Ddl => FB_STMT_DDL,
            StatementKind::GetSegment => FB_STMT_GET_SEGMENT,
            StatementKind::PutSegment => FB_STMT_PUT_SEGMENT,
            StatementKind::ExecProcedure => FB_STMT_EXEC_PROCEDURE,
            StatementKind::StartTransaction => FB_STMT_START_TRANS,
            StatementKind::Commit => FB_STMT_COMMIT,
            StatementKind::Rollback => FB_STMT_ROLLBACK,
            StatementKind::SelectForUpdate => FB_STMT_SELECT_FOR_UPD,
            StatementKind::SetGenerator => FB_STMT_SET_GENERATOR,
            StatementKind::Savepoint => FB_STMT_SAVEPOINT,
        }
    }

    /// Whether executing opens a server-side cursor.
    pub fn is_cursor(&self) -> bool {
        matches!(self, StatementKind::Select | StatementKind::SelectForUpdate)
    }

    /// Whether the statement can produce output columns.
    pub fn has_output(&self) -> bool {
        self.is_cursor() || *self == StatementKind::ExecProcedure
    }

    /// Whether execution reports an affected-row count.
    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete
        )
    }
}

/// Signal from one fetch step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// A row is positioned and more may follow.
    More,
    /// A singleton result; nothing follows it.
    One,
    /// The cursor is exhausted.
    Completed,
}

/// Outcome of executing a statement.
#[derive(Debug)]
pub enum Execution {
    /// The statement produced rows.
    Rows(ResultSet),
    /// INSERT, UPDATE or DELETE row count.
    Affected(u64),
    /// DDL and control statements.
    Done,
}

impl Execution {
    /// The result set, if the statement produced rows.
    pub fn into_result_set(self) -> Option<ResultSet> {
        match self {
            Execution::Rows(rs) => Some(rs),
            _ => None,
        }
    }

    /// Affected row count, if the statement was DML.
    pub fn affected(&self) -> Option<u64> {
        match self {
            Execution::Affected(n) => Some(*n),
            _ => None,
        }
    }

    /// Check if the statement produced rows.
    pub fn is_rows(&self) -> bool {
        matches!(self, Execution::Rows(_))
    }
}

/// A prepared statement.
///
/// Clones share the native handle. Closing any clone closes the handle for
/// all of them; further use fails with [`Error::StatementClosed`].
#[derive(Clone)]
pub struct Statement {
    inner: Arc<StatementInner>,
}

struct StatementInner {
    ctx: Arc<ConnectionContext>,
    handle: StatementHandle,
    sql: String,
    dialect: u16,
    kind: StatementKind,
    parameter_count: usize,
    metadata: Arc<[ColumnMetadata]>,
    closed: AtomicBool,
    /// Set while a result set is reading from this handle.
    busy: AtomicBool,
    /// Whether the handle is stored in the connection's cache.
    cached: AtomicBool,
}

impl Statement {
    /// Prepare an uncached statement owned by the caller.
    pub async fn prepare(connection: &Connection, transaction: &Transaction, sql: &str) -> Result<Self> {
        Self::prepare_in(connection.context(), transaction, sql).await
    }

    pub(crate) async fn prepare_in(
        ctx: &Arc<ConnectionContext>,
        transaction: &Transaction,
        sql: &str,
    ) -> Result<Self> {
        if !transaction.is_active() {
            return Err(Error::prepare("transaction is not active"));
        }
        let dialect = ctx.options.dialect;
        let handle = ctx
            .client
            .prepare(ctx.handle, transaction.handle(), sql, dialect)
            .await
            .map_err(Error::into_prepare)?;

        let described = Self::describe(ctx, handle).await.map_err(Error::into_prepare);
        let (kind, parameter_count, metadata) = match described {
            Ok(d) => d,
            Err(e) => {
                if let Err(close) = ctx.client.close_statement(handle).await {
                    tracing::warn!("failed to release statement after prepare error: {}", close);
                }
                return Err(e);
            }
        };
        tracing::debug!(
            stmt = handle.0,
            ?kind,
            params = parameter_count,
            columns = metadata.len(),
            "prepared: {}",
            sql
        );

        Ok(Self {
            inner: Arc::new(StatementInner {
                ctx: Arc::clone(ctx),
                handle,
                sql: sql.to_string(),
                dialect,
                kind,
                parameter_count,
                metadata,
                closed: AtomicBool::new(false),
                busy: AtomicBool::new(false),
                cached: AtomicBool::new(false),
            }),
        })
    }

    async fn describe(
        ctx: &ConnectionContext,
        handle: StatementHandle,
    ) -> Result<(StatementKind, usize, Arc<[ColumnMetadata]>)> {
        let code = ctx.client.describe_statement_type(handle).await?;
        let kind = StatementKind::from_code(code).ok_or(Error::UnknownStatementType { code })?;
        let parameter_count = ctx.client.parameter_count(handle).await?;
        let metadata = if kind.has_output() {
            ctx.client
                .describe_output_columns(handle)
                .await?
                .iter()
                .map(|desc| ColumnMetadata::from_descriptor(desc, &ctx.options))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };
        Ok((kind, parameter_count, metadata.into()))
    }

    /// SQL text.
    pub fn sql(&self) -> &str {
        &self.inner.sql
    }

    /// SQL dialect used at prepare.
    pub fn dialect(&self) -> u16 {
        self.inner.dialect
    }

    /// Statement kind.
    pub fn kind(&self) -> StatementKind {
        self.inner.kind
    }

    /// Number of `?` placeholders.
    pub fn parameter_count(&self) -> usize {
        self.inner.parameter_count
    }

    /// Output column metadata; empty for statements without output.
    pub fn metadata(&self) -> &[ColumnMetadata] {
        &self.inner.metadata
    }

    pub(crate) fn shared_metadata(&self) -> Arc<[ColumnMetadata]> {
        Arc::clone(&self.inner.metadata)
    }

    /// Native handle.
    pub fn handle(&self) -> StatementHandle {
        self.inner.handle
    }

    /// Whether the native handle is still open.
    pub fn is_prepared(&self) -> bool {
        !self.is_closed()
    }

    /// Whether the statement has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Whether the statement is held by the connection's statement cache.
    pub fn is_cached(&self) -> bool {
        self.inner.cached.load(Ordering::Acquire)
    }

    pub(crate) fn mark_cached(&self) {
        self.inner.cached.store(true, Ordering::Release);
    }

    /// Whether a result set is still reading from this statement.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Reserve an idle statement; false if it is already busy.
    pub(crate) fn try_claim(&self) -> bool {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release_claim(&self) {
        self.inner.busy.store(false, Ordering::Release);
    }

    /// Whether two handles refer to the same prepared statement.
    pub fn same_as(&self, other: &Statement) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn cache(&self) -> Option<StatementCache> {
        self.inner
            .ctx
            .cache
            .as_ref()
            .and_then(Weak::upgrade)
            .map(StatementCache::from_shared)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::StatementClosed {
                sql: self.inner.sql.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Execute with bound values.
    ///
    /// Statements with output columns yield [`Execution::Rows`] positioned
    /// before the first row; the result set does not own this statement or
    /// the transaction.
    pub async fn execute(&self, transaction: &Transaction, params: &[Value]) -> Result<Execution> {
        self.ensure_open()?;
        transaction.ensure_active()?;
        if params.len() != self.inner.parameter_count {
            return Err(Error::ParameterCount {
                expected: self.inner.parameter_count,
                actual: params.len(),
            });
        }

        // DDL may change the shape of any statement cached on this connection,
        // however the DDL statement itself was prepared.
        if self.inner.kind == StatementKind::Ddl {
            if let Some(cache) = self.cache() {
                if let Err(e) = cache.invalidate().await {
                    tracing::warn!("statement cache invalidation reported: {}", e);
                }
            }
        }

        tracing::debug!(stmt = self.inner.handle.0, tx = transaction.handle().0, "execute");
        let reply = self
            .inner
            .ctx
            .client
            .execute(self.inner.handle, transaction.handle(), params)
            .await?;

        let has_rows = !self.inner.metadata.is_empty();
        self.inner.busy.store(has_rows, Ordering::Release);
        if has_rows {
            return Ok(Execution::Rows(ResultSet::new(self.clone(), transaction.clone())));
        }
        if self.inner.kind.is_dml() {
            let affected = match reply {
                ExecuteReply::Affected(n) => n,
                ExecuteReply::CursorOpened => 0,
            };
            return Ok(Execution::Affected(affected));
        }
        Ok(Execution::Done)
    }

    /// Execute and pass each produced row to `callback`.
    ///
    /// The implicit result set is closed before returning, whether the
    /// iteration completes or the callback fails. Returns the affected row
    /// count for DML and `None` otherwise.
    pub async fn execute_each<F>(
        &self,
        transaction: &Transaction,
        params: &[Value],
        callback: F,
    ) -> Result<Option<u64>>
    where
        F: FnMut(Row) -> Result<()>,
    {
        match self.execute(transaction, params).await? {
            Execution::Rows(mut rs) => {
                rs.each(callback).await?;
                Ok(None)
            }
            Execution::Affected(n) => Ok(Some(n)),
            Execution::Done => Ok(None),
        }
    }

    /// Advance to the next row.
    pub async fn fetch(&self) -> Result<FetchStatus> {
        self.ensure_open()?;
        if self.inner.metadata.is_empty() {
            return Ok(FetchStatus::Completed);
        }
        if !self.inner.kind.is_cursor() {
            return Ok(FetchStatus::One);
        }
        let fetched = self
            .inner
            .ctx
            .client
            .fetch_next(self.inner.handle)
            .await
            .map_err(Error::into_fetch)?;
        tracing::trace!(stmt = self.inner.handle.0, ?fetched, "fetch");
        Ok(match fetched {
            NativeFetch::Row => FetchStatus::More,
            NativeFetch::Exhausted => FetchStatus::Completed,
        })
    }

    /// Decode the current row.
    pub async fn current_row(&self, transaction: &Transaction) -> Result<Vec<Value>> {
        self.ensure_open()?;
        transaction.ensure_active()?;
        let raw = self
            .inner
            .ctx
            .client
            .decode_current_row(self.inner.handle)
            .await
            .map_err(Error::into_fetch)?;
        let metadata = &self.inner.metadata;
        if raw.len() != metadata.len() {
            return Err(Error::RowShapeMismatch {
                values: raw.len(),
                columns: metadata.len(),
            });
        }
        let ctx = &self.inner.ctx;
        Ok(raw
            .into_iter()
            .zip(metadata.iter())
            .map(|(value, column)| {
                column.decode(value, ctx.encoding.as_ref(), ctx.options.date_as_date)
            })
            .collect())
    }

    /// Close the open cursor; the statement stays prepared and can be
    /// handed out again.
    pub async fn close_cursor(&self) -> Result<()> {
        self.inner.busy.store(false, Ordering::Release);
        if self.is_closed() || !self.inner.kind.is_cursor() {
            return Ok(());
        }
        self.inner.ctx.client.close_cursor(self.inner.handle).await
    }

    /// Release the native handle. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(stmt = self.inner.handle.0, "close statement");
        self.inner.ctx.client.close_statement(self.inner.handle).await
    }

    /// Access plan chosen by the engine.
    pub async fn plan(&self) -> Result<String> {
        self.ensure_open()?;
        let plan = self.inner.ctx.client.plan(self.inner.handle).await?;
        Ok(plan.trim().to_string())
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("handle", &self.inner.handle)
            .field("sql", &self.inner.sql)
            .field("kind", &self.inner.kind)
            .field("parameter_count", &self.inner.parameter_count)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for StatementInner {
    fn drop(&mut self) {
        if !*self.closed.get_mut() {
            tracing::debug!(stmt = self.handle.0, "statement dropped without close: {}", self.sql);
        }
    }
}
