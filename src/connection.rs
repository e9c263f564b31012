//! High-level Connection API.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;

use crate::cache::{CacheShared, StatementCache};
use crate::error::Result;
use crate::native::{ConnectionHandle, NativeClient};
use crate::options::{ConnectionOptions, EncodingMode};
use crate::procedure::ProcedureCall;
use crate::statement::{Execution, Statement};
use crate::transaction::Transaction;
use crate::types::{CharsetAware, EncodingStrategy, PassThrough, Row, SqlType, Value, CHARACTER_SETS_SQL};

/// State shared by a connection and every statement it prepares.
pub(crate) struct ConnectionContext {
    pub(crate) client: Arc<dyn NativeClient>,
    pub(crate) handle: ConnectionHandle,
    pub(crate) options: ConnectionOptions,
    pub(crate) encoding: Box<dyn EncodingStrategy>,
    /// The connection's statement cache, when enabled.
    pub(crate) cache: Option<Weak<CacheShared>>,
}

/// An attached Firebird database.
pub struct Connection {
    ctx: Arc<ConnectionContext>,
    cache: Option<StatementCache>,
}

impl Connection {
    /// Wrap an attached native connection.
    ///
    /// With [`EncodingMode::CharsetAware`] the character set catalog is read
    /// once here and used to decode every text column afterwards.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use firebird_core::{Connection, ConnectionHandle, ConnectionOptions, NativeClient};
    ///
    /// async fn run(client: Arc<dyn NativeClient>) -> firebird_core::Result<()> {
    ///     let conn = Connection::attach(client, ConnectionHandle(1), ConnectionOptions::new()).await?;
    ///     let mut rs = conn
    ///         .execute_immediate("SELECT * FROM RDB$DATABASE", &[])
    ///         .await?
    ///         .into_result_set()
    ///         .expect("query");
    ///     while let Some(row) = rs.fetch().await? {
    ///         println!("{:?}", row.to_map());
    ///     }
    ///     conn.close().await
    /// }
    /// ```
    pub async fn attach(
        client: Arc<dyn NativeClient>,
        handle: ConnectionHandle,
        options: ConnectionOptions,
    ) -> Result<Self> {
        let encoding: Box<dyn EncodingStrategy> = match options.encoding {
            EncodingMode::PassThrough => Box::new(PassThrough),
            EncodingMode::CharsetAware => {
                Box::new(Self::load_charsets(Arc::clone(&client), handle, &options).await?)
            }
        };
        tracing::debug!(conn = handle.0, ?options, "attached");
        Ok(Self::with_encoding(client, handle, options, encoding))
    }

    fn with_encoding(
        client: Arc<dyn NativeClient>,
        handle: ConnectionHandle,
        options: ConnectionOptions,
        encoding: Box<dyn EncodingStrategy>,
    ) -> Self {
        let cache = options.statement_cache.then(StatementCache::new);
        Self {
            ctx: Arc::new(ConnectionContext {
                client,
                handle,
                options,
                encoding,
                cache: cache.as_ref().map(StatementCache::downgrade),
            }),
            cache,
        }
    }

    async fn load_charsets(
        client: Arc<dyn NativeClient>,
        handle: ConnectionHandle,
        options: &ConnectionOptions,
    ) -> Result<CharsetAware> {
        let bootstrap = Self::with_encoding(
            client,
            handle,
            options.clone().with_statement_cache(false),
            Box::new(PassThrough),
        );
        let mut entries = Vec::new();
        bootstrap
            .execute_each(CHARACTER_SETS_SQL, &[], None, |row| {
                let name = row.get(0usize).and_then(Value::as_str).unwrap_or_default();
                match row.get(1usize).and_then(Value::as_i64).map(i16::try_from) {
                    Some(Ok(id)) => entries.push((name.trim_end().to_string(), id)),
                    Some(Err(_)) => tracing::warn!(charset = name.trim_end(), "character set id out of range"),
                    None => {}
                }
                Ok(())
            })
            .await?;
        let charsets = CharsetAware::new(entries);
        tracing::debug!(count = charsets.len(), "loaded character sets");
        Ok(charsets)
    }

    pub(crate) fn context(&self) -> &Arc<ConnectionContext> {
        &self.ctx
    }

    /// Native connection handle.
    pub fn handle(&self) -> ConnectionHandle {
        self.ctx.handle
    }

    /// Connection settings.
    pub fn options(&self) -> &ConnectionOptions {
        &self.ctx.options
    }

    /// Statement cache, when enabled.
    pub fn statement_cache(&self) -> Option<&StatementCache> {
        self.cache.as_ref()
    }

    /// Start a transaction on this connection.
    pub async fn start_transaction(&self) -> Result<Transaction> {
        Transaction::start(Arc::clone(&self.ctx.client), &[self.ctx.handle]).await
    }

    /// Prepare an uncached statement in a private, committed transaction.
    pub async fn create_statement(&self, sql: &str) -> Result<Statement> {
        let transaction = self.start_transaction().await?;
        match Statement::prepare_in(&self.ctx, &transaction, sql).await {
            Ok(statement) => {
                transaction.commit().await?;
                Ok(statement)
            }
            Err(e) => {
                if let Err(rb) = transaction.rollback().await {
                    tracing::warn!("rollback after failed prepare: {}", rb);
                }
                Err(e)
            }
        }
    }

    /// Prepare `sql`, reusing the cached statement when the cache is enabled.
    pub async fn prepare(&self, sql: &str, transaction: &Transaction) -> Result<Statement> {
        match &self.cache {
            Some(cache) => cache.get_or_prepare(self, transaction, sql).await,
            None => Statement::prepare_in(&self.ctx, transaction, sql).await,
        }
    }

    /// Execute `sql` in an existing transaction.
    pub async fn execute(&self, sql: &str, params: &[Value], transaction: &Transaction) -> Result<Execution> {
        self.run_in(sql, params, transaction).await
    }

    /// Execute `sql` in an anonymous transaction.
    ///
    /// Without rows the transaction is committed before returning, or rolled
    /// back on error. A returned result set owns the transaction and commits
    /// it when closed or exhausted.
    pub async fn execute_immediate(&self, sql: &str, params: &[Value]) -> Result<Execution> {
        let transaction = self.start_transaction().await?;
        match self.run_in(sql, params, &transaction).await {
            Ok(Execution::Rows(mut rs)) => {
                rs.manage_transaction();
                Ok(Execution::Rows(rs))
            }
            Ok(other) => {
                transaction.commit().await?;
                Ok(other)
            }
            Err(e) => {
                if let Err(rb) = transaction.rollback().await {
                    tracing::warn!("rollback after failed execute: {}", rb);
                }
                Err(e)
            }
        }
    }

    /// Execute and pass each produced row to `callback`.
    ///
    /// Runs in `transaction`, or in an anonymous one when `None`. The
    /// implicit result set is always closed before returning. Returns the
    /// affected row count for DML.
    pub async fn execute_each<F>(
        &self,
        sql: &str,
        params: &[Value],
        transaction: Option<&Transaction>,
        callback: F,
    ) -> Result<Option<u64>>
    where
        F: FnMut(Row) -> Result<()>,
    {
        let execution = match transaction {
            Some(tx) => self.run_in(sql, params, tx).await?,
            None => self.execute_immediate(sql, params).await?,
        };
        match execution {
            Execution::Rows(mut rs) => {
                let outcome = rs.each(callback).await;
                // A failed fetch leaves the anonymous transaction open.
                if outcome.is_err() && transaction.is_none() && rs.transaction().is_active() {
                    if let Err(rb) = rs.transaction().rollback().await {
                        tracing::warn!("rollback after failed fetch: {}", rb);
                    }
                }
                outcome.map(|_| None)
            }
            Execution::Affected(n) => Ok(Some(n)),
            Execution::Done => Ok(None),
        }
    }

    async fn run_in(&self, sql: &str, params: &[Value], transaction: &Transaction) -> Result<Execution> {
        let (statement, cached) = match &self.cache {
            Some(cache) => cache.checkout(&self.ctx, transaction, sql, true).await?,
            None => (Statement::prepare_in(&self.ctx, transaction, sql).await?, false),
        };
        let owned = !cached;

        match statement.execute(transaction, params).await {
            Ok(Execution::Rows(mut rs)) => {
                if owned {
                    rs.manage_statement();
                }
                Ok(Execution::Rows(rs))
            }
            Ok(other) => {
                if owned {
                    statement.close().await?;
                }
                Ok(other)
            }
            Err(e) => {
                if owned {
                    if let Err(close) = statement.close().await {
                        tracing::warn!("failed to close statement after execute error: {}", close);
                    }
                } else {
                    statement.release_claim();
                }
                Err(e)
            }
        }
    }

    /// Look up a stored procedure's input parameters.
    pub async fn prepare_call(&self, name: &str) -> Result<ProcedureCall<'_>> {
        ProcedureCall::new(self, name).await
    }

    /// Call a stored procedure once and return its outputs.
    pub async fn call_procedure(
        &self,
        name: &str,
        values: &HashMap<String, Value>,
        transaction: Option<&Transaction>,
    ) -> Result<IndexMap<String, Value>> {
        self.prepare_call(name).await?.execute(values, transaction).await
    }

    /// Declared column types of `table`, in column order.
    pub async fn sql_types_for_table(&self, table: &str) -> Result<IndexMap<String, SqlType>> {
        SqlType::for_table(self, table).await
    }

    /// Close all cached statements.
    pub async fn reset(&self) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.invalidate().await,
            None => Ok(()),
        }
    }

    /// Close all cached statements and release the connection.
    pub async fn close(self) -> Result<()> {
        self.reset().await?;
        tracing::debug!(conn = self.ctx.handle.0, "connection closed");
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("handle", &self.ctx.handle)
            .field("options", &self.ctx.options)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
