//! Per-connection cache of prepared statements keyed by SQL text.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;

use crate::connection::{Connection, ConnectionContext};
use crate::error::Result;
use crate::statement::{Statement, StatementKind};
use crate::transaction::Transaction;

#[derive(Default)]
pub(crate) struct CacheShared {
    entries: Mutex<HashMap<String, Statement>>,
}

/// Prepared statements reused across executions of the same SQL text.
///
/// DDL statements are never stored. Executing any DDL statement prepared on
/// the owning connection drops and closes every cached entry first, since a
/// schema change can alter the shape of any statement prepared before it.
///
/// An entry is handed to one result set at a time. While it is busy, the
/// connection prepares a private statement for the same SQL instead.
#[derive(Clone, Default)]
pub struct StatementCache {
    shared: Arc<CacheShared>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_shared(shared: Arc<CacheShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<CacheShared> {
        Arc::downgrade(&self.shared)
    }

    /// Return the cached statement for `sql`, preparing it on `connection`
    /// on a miss.
    pub async fn get_or_prepare(
        &self,
        connection: &Connection,
        transaction: &Transaction,
        sql: &str,
    ) -> Result<Statement> {
        Ok(self.checkout(connection.context(), transaction, sql, false).await?.0)
    }

    /// Like [`StatementCache::get_or_prepare`], also reporting whether the
    /// returned statement is the cached one.
    ///
    /// With `claim`, the cached statement is reserved for the caller's
    /// execution; when it is already reserved a private statement is
    /// prepared and returned uncached.
    pub(crate) async fn checkout(
        &self,
        ctx: &Arc<ConnectionContext>,
        transaction: &Transaction,
        sql: &str,
        claim: bool,
    ) -> Result<(Statement, bool)> {
        let mut entries = self.shared.entries.lock().await;
        let hit = entries.get(sql).map(|s| (s.clone(), s.is_prepared()));
        match hit {
            Some((statement, true)) => {
                if !claim || statement.try_claim() {
                    tracing::trace!(stmt = statement.handle().0, "statement cache hit");
                    return Ok((statement, true));
                }
                drop(entries);
                tracing::debug!(stmt = statement.handle().0, "cached statement busy, preparing a private one");
                let private = Statement::prepare_in(ctx, transaction, sql).await?;
                return Ok((private, false));
            }
            Some((_, false)) => {
                entries.remove(sql);
            }
            None => {}
        }

        let statement = Statement::prepare_in(ctx, transaction, sql).await?;
        if statement.kind() == StatementKind::Ddl {
            return Ok((statement, false));
        }
        if claim {
            statement.try_claim();
        }
        statement.mark_cached();
        entries.insert(sql.to_string(), statement.clone());
        Ok((statement, true))
    }

    /// Drop and close every cached statement.
    ///
    /// All entries are removed even if some fail to close; the first close
    /// error is returned.
    pub async fn invalidate(&self) -> Result<()> {
        let drained: Vec<Statement> = {
            let mut entries = self.shared.entries.lock().await;
            entries.drain().map(|(_, statement)| statement).collect()
        };
        if drained.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = drained.len(), "invalidating statement cache");

        let mut first = None;
        for statement in drained {
            if let Err(e) = statement.close().await {
                tracing::warn!("failed to close cached statement: {}", e);
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Number of cached statements.
    pub async fn len(&self) -> usize {
        self.shared.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a statement is cached for `sql`.
    pub async fn contains(&self, sql: &str) -> bool {
        self.shared.entries.lock().await.contains_key(sql)
    }
}

impl fmt::Debug for StatementCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementCache").finish_non_exhaustive()
    }
}
