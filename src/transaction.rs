//! Transaction handle shared by statements and result sets.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::native::{ConnectionHandle, NativeClient, TransactionHandle};

/// A started transaction spanning one or more connections.
///
/// Clones refer to the same transaction. Commit and rollback are
/// irreversible: afterwards every statement or result set bound to it fails
/// with [`Error::TransactionInactive`].
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TransactionInner>,
}

struct TransactionInner {
    client: Arc<dyn NativeClient>,
    handle: TransactionHandle,
    active: AtomicBool,
    connections: Mutex<Vec<ConnectionHandle>>,
}

impl Transaction {
    /// Start a transaction on the given connections.
    pub async fn start(client: Arc<dyn NativeClient>, connections: &[ConnectionHandle]) -> Result<Self> {
        let handle = client.start_transaction(connections).await?;
        tracing::debug!(tx = handle.0, "transaction started");
        Ok(Self {
            inner: Arc::new(TransactionInner {
                client,
                handle,
                active: AtomicBool::new(true),
                connections: Mutex::new(connections.to_vec()),
            }),
        })
    }

    /// Native handle.
    pub fn handle(&self) -> TransactionHandle {
        self.inner.handle
    }

    /// Whether the transaction can still be used.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Connections the transaction spans; empty once resolved.
    pub fn connections(&self) -> Vec<ConnectionHandle> {
        self.lock_connections().clone()
    }

    /// Whether the transaction spans the given connection.
    pub fn is_for(&self, connection: ConnectionHandle) -> bool {
        self.lock_connections().contains(&connection)
    }

    /// Whether two handles refer to the same transaction.
    pub fn same_as(&self, other: &Transaction) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Commit and deactivate.
    pub async fn commit(&self) -> Result<()> {
        self.ensure_active()?;
        self.inner.client.commit(self.inner.handle).await?;
        self.resolve();
        tracing::debug!(tx = self.inner.handle.0, "transaction committed");
        Ok(())
    }

    /// Roll back and deactivate.
    pub async fn rollback(&self) -> Result<()> {
        self.ensure_active()?;
        self.inner.client.rollback(self.inner.handle).await?;
        self.resolve();
        tracing::debug!(tx = self.inner.handle.0, "transaction rolled back");
        Ok(())
    }

    /// Fail with `TransactionInactive` once resolved.
    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::TransactionInactive)
        }
    }

    fn resolve(&self) {
        self.inner.active.store(false, Ordering::Release);
        self.lock_connections().clear();
    }

    fn lock_connections(&self) -> std::sync::MutexGuard<'_, Vec<ConnectionHandle>> {
        // The list is only ever replaced wholesale, so a poisoned guard is still consistent.
        self.inner
            .connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("handle", &self.inner.handle)
            .field("active", &self.is_active())
            .finish()
    }
}
