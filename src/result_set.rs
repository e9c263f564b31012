//! Cursor over the rows produced by an executed statement.

use std::fmt;

use futures::Stream;

use crate::error::{Error, Result};
use crate::statement::{FetchStatus, Statement};
use crate::transaction::Transaction;
use crate::types::{Row, SqlTypeKind};

/// Rows produced by one execution of a [`Statement`].
///
/// A result set is active until the cursor is exhausted, the singleton row
/// of a procedure call has been read, a fetch fails, or [`ResultSet::close`]
/// is called. Once inactive it stays inactive and `fetch` returns `None`.
///
/// Result sets created by [`crate::Connection::execute_immediate`] own the
/// statement and the anonymous transaction they run in; those are released
/// when the set becomes inactive.
pub struct ResultSet {
    statement: Statement,
    transaction: Transaction,
    active: bool,
    row_count: u64,
    owns_statement: bool,
    owns_transaction: bool,
}

impl ResultSet {
    pub(crate) fn new(statement: Statement, transaction: Transaction) -> Self {
        Self {
            statement,
            transaction,
            active: true,
            row_count: 0,
            owns_statement: false,
            owns_transaction: false,
        }
    }

    /// Close the statement when the set is released.
    pub(crate) fn manage_statement(&mut self) {
        self.owns_statement = true;
    }

    /// Commit the transaction when the set is released.
    pub(crate) fn manage_transaction(&mut self) {
        self.owns_transaction = true;
    }

    /// Fetch the next row.
    ///
    /// Rows are numbered from 1. Returns `None` once the cursor is exhausted
    /// and on every call after that.
    pub async fn fetch(&mut self) -> Result<Option<Row>> {
        if !self.active {
            return Ok(None);
        }
        if let Err(e) = self.transaction.ensure_active() {
            return Err(self.abort(e).await);
        }

        let status = match self.statement.fetch().await {
            Ok(status) => status,
            Err(e) => return Err(self.abort(e).await),
        };
        match status {
            FetchStatus::More => {
                let row = match self.build_row(self.row_count + 1).await {
                    Ok(row) => row,
                    Err(e) => return Err(self.abort(e).await),
                };
                self.row_count += 1;
                Ok(Some(row))
            }
            FetchStatus::One => {
                let row = match self.build_row(1).await {
                    Ok(row) => row,
                    Err(e) => return Err(self.abort(e).await),
                };
                self.row_count = 1;
                self.release().await?;
                Ok(Some(row))
            }
            FetchStatus::Completed => {
                tracing::debug!(stmt = self.statement.handle().0, rows = self.row_count, "cursor exhausted");
                self.release().await?;
                Ok(None)
            }
        }
    }

    async fn build_row(&self, number: u64) -> Result<Row> {
        let values = self.statement.current_row(&self.transaction).await?;
        Row::new(self.statement.shared_metadata(), values, number)
    }

    /// Deactivate after a failed fetch or a fetch on an inactive transaction.
    ///
    /// An owned statement is released; an owned transaction is left active
    /// so the caller can roll it back through [`ResultSet::transaction`].
    async fn abort(&mut self, error: Error) -> Error {
        self.active = false;
        if let Err(e) = self.statement.close_cursor().await {
            tracing::warn!("failed to close cursor after fetch error: {}", e);
        }
        if self.owns_statement {
            if let Err(e) = self.statement.close().await {
                tracing::warn!("failed to close statement after fetch error: {}", e);
            }
        }
        error
    }

    async fn release(&mut self) -> Result<()> {
        self.active = false;
        let mut first = None;
        if let Err(e) = self.statement.close_cursor().await {
            first.get_or_insert(e);
        }
        if self.owns_statement {
            if let Err(e) = self.statement.close().await {
                first.get_or_insert(e);
            }
        }
        if self.owns_transaction && self.transaction.is_active() {
            if let Err(e) = self.transaction.commit().await {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Close the cursor and release owned resources.
    ///
    /// Closing an inactive set is a no-op. An owned transaction is committed,
    /// never rolled back.
    pub async fn close(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.release().await
    }

    /// Pass each remaining row to `callback`, then close.
    ///
    /// The set is closed exactly once whether iteration completes or the
    /// callback fails; the callback's error is returned first.
    pub async fn each<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(Row) -> Result<()>,
    {
        let outcome = loop {
            match self.fetch().await {
                Ok(Some(row)) => {
                    if let Err(e) = callback(row) {
                        break Err(e);
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        let closed = self.close().await;
        outcome.and(closed)
    }

    /// Collect every remaining row, then close.
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.each(|row| {
            rows.push(row);
            Ok(())
        })
        .await?;
        Ok(rows)
    }

    /// Convert into a stream of rows.
    pub fn into_stream(self) -> impl Stream<Item = Result<Row>> {
        use futures::stream;

        stream::unfold(Some(self), |state| async move {
            let mut rs = state?;
            match rs.fetch().await {
                Ok(Some(row)) => Some((Ok(row), Some(rs))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Number of rows fetched so far.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Whether the set can still produce rows.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the set has been exhausted or closed.
    pub fn is_exhausted(&self) -> bool {
        !self.active
    }

    /// SQL text of the statement.
    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    /// SQL dialect of the statement.
    pub fn dialect(&self) -> u16 {
        self.statement.dialect()
    }

    /// Statement producing the rows.
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Transaction the rows are read in.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Number of output columns.
    pub fn column_count(&self) -> usize {
        self.statement.metadata().len()
    }

    /// Column name at `index`, or `None` when out of range or negative.
    pub fn column_name(&self, index: isize) -> Option<&str> {
        self.column(index).map(|c| c.name.as_str())
    }

    /// Column alias at `index`, or `None` when out of range or negative.
    pub fn column_alias(&self, index: isize) -> Option<&str> {
        self.column(index).map(|c| c.alias.as_str())
    }

    /// Source table of the column at `index`, or `None` when out of range or negative.
    pub fn column_table(&self, index: isize) -> Option<&str> {
        self.column(index).map(|c| c.table.as_str())
    }

    /// Scale of the column at `index`, or `None` when out of range or negative.
    pub fn column_scale(&self, index: isize) -> Option<i16> {
        self.column(index).map(|c| c.scale)
    }

    /// Base type of the column at `index`, or `None` when out of range or negative.
    pub fn base_type(&self, index: isize) -> Option<SqlTypeKind> {
        self.column(index).map(|c| c.kind)
    }

    fn column(&self, index: isize) -> Option<&crate::types::ColumnMetadata> {
        let i = usize::try_from(index).ok()?;
        self.statement.metadata().get(i)
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("sql", &self.statement.sql())
            .field("active", &self.active)
            .field("row_count", &self.row_count)
            .finish()
    }
}

impl Drop for ResultSet {
    fn drop(&mut self) {
        if self.active {
            tracing::warn!(
                stmt = self.statement.handle().0,
                "result set dropped while active: {}",
                self.statement.sql()
            );
        }
    }
}
